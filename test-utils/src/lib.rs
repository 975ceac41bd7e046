use std::{
    error::Error,
    fs, io,
    path::{Path, PathBuf},
    process::{Command, Output},
    str,
};

const OUTPUT_PATH: &str = "./output";

pub struct Expected {
    pub exit_code: i32,
}

fn output_path(src_path: &Path) -> Result<PathBuf, io::Error> {
    fs::create_dir_all(OUTPUT_PATH)?;
    Ok(Path::new(OUTPUT_PATH).join(src_path.file_stem().unwrap()))
}

fn run_compiler(compiler: &Path, src_path: &Path, out_path: &Path) -> Result<Output, io::Error> {
    Command::new(compiler)
        .arg(src_path)
        .arg("-o")
        .arg(out_path)
        .output()
}

/// Compile `src_path`, run the produced executable and compare its exit code.
pub fn check_compilation(
    compiler: &Path,
    src_path: &Path,
    expected: Expected,
) -> Result<(), Box<dyn Error>> {
    let out_path = output_path(src_path)?;

    let compile_output = run_compiler(compiler, src_path, &out_path)?;
    let compile_stdout = str::from_utf8(&compile_output.stdout)?;
    let compile_stderr = str::from_utf8(&compile_output.stderr)?;

    println!("{compile_stdout}");
    assert!(compile_stderr.is_empty(), "{}", compile_stderr);
    assert!(
        compile_output.status.success(),
        "sea exited with status {:?}",
        compile_output.status.code()
    );

    let output = Command::new(&out_path).output()?;
    assert_eq!(
        output.status.code(),
        Some(expected.exit_code),
        "compiled program exited with status {:?}",
        output.status.code()
    );

    Ok(())
}

/// Compile `src_path` and assert that the compiler rejects it with a
/// diagnostic on stderr and without leaving an output binary behind.
pub fn check_failing_compilation(compiler: &Path, src_path: &Path) -> Result<(), Box<dyn Error>> {
    let out_path = output_path(src_path)?;

    let compile_output = run_compiler(compiler, src_path, &out_path)?;
    let compile_stderr = str::from_utf8(&compile_output.stderr)?;

    println!("{compile_output:?}");
    assert!(
        !compile_output.status.success(),
        "sea should exit with a non-zero status"
    );
    assert!(
        !compile_stderr.is_empty(),
        "expected a diagnostic on stderr"
    );
    assert!(!out_path.exists(), "no output binary should be produced");

    Ok(())
}
