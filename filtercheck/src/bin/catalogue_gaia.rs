//! UV filter check from the GALEX merged catalogue

use clap::Parser;
use filtercheck::runner;
use filtercheck::shared_args::TargetArgs;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "catalogue_gaia", about = "UV filter check from the GALEX merged catalogue")]
struct Args {
    #[command(flatten)]
    target: TargetArgs,
}

fn main() -> ExitCode {
    let args = Args::parse();
    runner::run(&args.target, filtercheck::pipeline::catalogue::run)
}
