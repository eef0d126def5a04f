use clap::Parser;
use std::process::ExitCode;

use solscribe_cli::commands::{generate, GenerateArgs};
use solscribe_cli::common;

fn main() -> ExitCode {
    let args = GenerateArgs::parse();
    common::init_tracing();
    generate::run(args)
}
