#![cfg(all(target_arch = "x86_64", any(target_os = "linux", target_os = "macos")))]

use std::{error::Error, path::Path};

use test_utils::{check_compilation, Expected};

const SRC_PATH: &str = "./demos/declaration.c";
const EXPECTED: Expected = Expected { exit_code: 7 };

#[test]
fn compile_and_run_declaration() -> Result<(), Box<dyn Error>> {
    check_compilation(
        Path::new(env!("CARGO_BIN_EXE_sea")),
        Path::new(SRC_PATH),
        EXPECTED,
    )
}
