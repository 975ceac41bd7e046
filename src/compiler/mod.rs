//! Driver tying the stages together.
//!
//! Runs preprocessor, lexer, parser and code generator over a source file,
//! writes the assembly to a temporary file and hands it to the system
//! assembler and linker.
use std::{
    env,
    error::Error,
    fmt::Display,
    fs,
    path::{Path, PathBuf},
    process::{Command, Output},
};

use log::{debug, info};

use crate::{codegen, lexer, parser, preprocessor};

/// The input file could not be read.
#[derive(Debug)]
pub struct FileOpenError {
    pub path: PathBuf,
    pub source: std::io::Error,
}

impl Display for FileOpenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "could not open file '{}': {}", self.path.display(), self.source)
    }
}

impl Error for FileOpenError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// The external assembler or linker exited with a non-zero status.
#[derive(Debug)]
pub struct ToolchainError {
    pub tool: &'static str,
    pub stderr: String,
}

impl Display for ToolchainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.stderr.is_empty() {
            write!(f, "{} failed", self.tool)
        } else {
            write!(f, "{} failed: {}", self.tool, self.stderr)
        }
    }
}

impl Error for ToolchainError {}

/// One compilation from a source file to a linked executable.
pub struct Compiler {
    pub input: PathBuf,
    pub output: PathBuf,
    pub dump_ast: bool,
    pub dump_asm: bool,
}

impl Compiler {
    pub fn run(&self) -> Result<(), Box<dyn Error>> {
        println!("Compiling: {}", self.input.display());

        let source = fs::read_to_string(&self.input).map_err(|source| FileOpenError {
            path: self.input.clone(),
            source,
        })?;

        println!("  [1/5] Preprocessing...");
        let filename = self.input.to_string_lossy();
        let expanded = preprocessor::preprocess(&source, &filename)?;

        println!("  [2/5] Lexical analysis...");
        let tokens = lexer::tokenize(&expanded)?;

        println!("  [3/5] Parsing...");
        let ast = parser::parse(tokens)?;
        if self.dump_ast {
            println!("{ast:#?}");
        }

        println!("  [4/5] Code generation...");
        let assembly = codegen::generate(&ast)?;
        if self.dump_asm {
            println!("{assembly}");
        }

        println!("  [5/5] Linking...");
        let asm_file = temp_path("s");
        fs::write(&asm_file, &assembly)?;
        debug!("assembly written to '{}'", asm_file.display());

        let result = self.assemble_and_link(&asm_file);
        let _ = fs::remove_file(&asm_file);
        result?;

        println!("Success! Output: {}", self.output.display());
        Ok(())
    }

    fn assemble_and_link(&self, asm_file: &Path) -> Result<(), Box<dyn Error>> {
        let obj_file = temp_path("o");

        let result = self
            .assemble(asm_file, &obj_file)
            .and_then(|_| self.link(&obj_file));
        let _ = fs::remove_file(&obj_file);

        result
    }

    #[cfg(target_os = "macos")]
    fn assemble(&self, asm_file: &Path, obj_file: &Path) -> Result<(), Box<dyn Error>> {
        info!("assembling '{}'", asm_file.display());

        let output = Command::new("as")
            .args(["-arch", "x86_64"])
            .arg("-o")
            .arg(obj_file)
            .arg(asm_file)
            .output()?;

        check_tool("assembler", &output)
    }

    #[cfg(not(target_os = "macos"))]
    fn assemble(&self, asm_file: &Path, obj_file: &Path) -> Result<(), Box<dyn Error>> {
        info!("assembling '{}'", asm_file.display());

        let output = Command::new("as")
            .arg("-o")
            .arg(obj_file)
            .arg(asm_file)
            .output()?;

        check_tool("assembler", &output)
    }

    #[cfg(target_os = "macos")]
    fn link(&self, obj_file: &Path) -> Result<(), Box<dyn Error>> {
        info!("linking '{}'", self.output.display());

        let output = Command::new("ld")
            .args(["-arch", "x86_64", "-macosx_version_min", "10.13", "-lSystem"])
            .arg("-o")
            .arg(&self.output)
            .arg(obj_file)
            .output()?;

        check_tool("linker", &output)
    }

    #[cfg(not(target_os = "macos"))]
    fn link(&self, obj_file: &Path) -> Result<(), Box<dyn Error>> {
        info!("linking '{}'", self.output.display());

        let output = Command::new("ld")
            .args(["-dynamic-linker", "/lib64/ld-linux-x86-64.so.2"])
            .arg("-o")
            .arg(&self.output)
            .arg("/usr/lib/x86_64-linux-gnu/crt1.o")
            .arg("/usr/lib/x86_64-linux-gnu/crti.o")
            .arg(obj_file)
            .arg("-lc")
            .arg("/usr/lib/x86_64-linux-gnu/crtn.o")
            .output()?;

        check_tool("linker", &output)
    }
}

fn check_tool(tool: &'static str, output: &Output) -> Result<(), Box<dyn Error>> {
    if output.status.success() {
        return Ok(());
    }

    Err(Box::new(ToolchainError {
        tool,
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
    }))
}

fn temp_path(extension: &str) -> PathBuf {
    env::temp_dir().join(format!("sea_{}.{extension}", std::process::id()))
}
