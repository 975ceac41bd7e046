//! # sea
//!
//! The sea compiler: turns a single-function C subset source file into a
//! native executable using the system assembler and linker.
mod cli;

use cli::Cli;
use sea_lang::compiler::Compiler;

fn main() {
    let args = Cli::init();

    simple_logger::init_with_level(args.verbosity.into()).unwrap();

    let compiler = Compiler {
        input: args.file,
        output: args.output,
        dump_ast: args.dump_ast,
        dump_asm: args.dump_asm,
    };

    if let Err(error) = compiler.run() {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}
