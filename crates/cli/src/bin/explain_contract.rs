use clap::Parser;
use std::process::ExitCode;

use solscribe_cli::commands::{explain, ExplainArgs};
use solscribe_cli::common;

fn main() -> ExitCode {
    let args = ExplainArgs::parse();
    common::init_tracing();
    explain::run(args)
}
