use std::{error::Error, path::Path};

use test_utils::check_failing_compilation;

const SRC_PATH: &str = "./demos/parse_error.c";

#[test]
fn reject_parse_error() -> Result<(), Box<dyn Error>> {
    check_failing_compilation(Path::new(env!("CARGO_BIN_EXE_sea")), Path::new(SRC_PATH))
}
