//! VIS filter check from the UVIT bright star finder and ETC

use clap::Parser;
use filtercheck::runner;
use filtercheck::shared_args::TargetArgs;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "theia", about = "VIS filter check from the UVIT bright star finder and ETC")]
struct Args {
    #[command(flatten)]
    target: TargetArgs,
}

fn main() -> ExitCode {
    let args = Args::parse();
    runner::run(&args.target, filtercheck::theia::run)
}
