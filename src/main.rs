use std::process::ExitCode;

use clap::Parser;

use easel::cli::{self, CliArgs};
use easel::logger;

fn main() -> ExitCode {
    logger::init();
    let args = CliArgs::parse();
    cli::run(args)
}
