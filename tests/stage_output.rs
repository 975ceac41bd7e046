#![cfg(all(target_arch = "x86_64", any(target_os = "linux", target_os = "macos")))]

use std::{error::Error, path::Path, process::Command, str};

const SRC_PATH: &str = "./demos/return42.c";

/// The driver narrates its five stages on stdout and keeps stderr quiet.
#[test]
fn stage_labels_on_stdout() -> Result<(), Box<dyn Error>> {
    std::fs::create_dir_all("./output")?;

    let output = Command::new(env!("CARGO_BIN_EXE_sea"))
        .arg(Path::new(SRC_PATH))
        .arg("-o")
        .arg("./output/stage_output")
        .output()?;

    let stdout = str::from_utf8(&output.stdout)?;
    for label in [
        "[1/5] Preprocessing",
        "[2/5] Lexical analysis",
        "[3/5] Parsing",
        "[4/5] Code generation",
        "[5/5] Linking",
    ] {
        assert!(stdout.contains(label), "missing stage label '{label}'");
    }
    assert!(stdout.contains("Success! Output:"));
    assert!(str::from_utf8(&output.stderr)?.is_empty());

    Ok(())
}

/// `--dump-asm` prints the generated assembly before assembling it.
#[test]
fn dump_asm_prints_assembly() -> Result<(), Box<dyn Error>> {
    std::fs::create_dir_all("./output")?;

    let output = Command::new(env!("CARGO_BIN_EXE_sea"))
        .arg(Path::new(SRC_PATH))
        .arg("-o")
        .arg("./output/stage_output_dump")
        .arg("--dump-asm")
        .output()?;

    let stdout = str::from_utf8(&output.stdout)?;
    assert!(stdout.contains("movq $42, %rax"));

    Ok(())
}
