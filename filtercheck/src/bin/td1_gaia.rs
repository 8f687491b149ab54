//! UV filter check from the TD1 catalogue

use clap::Parser;
use filtercheck::runner;
use filtercheck::shared_args::TargetArgs;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "td1_gaia", about = "UV filter check from the TD1 catalogue")]
struct Args {
    #[command(flatten)]
    target: TargetArgs,
}

fn main() -> ExitCode {
    let args = Args::parse();
    runner::run(&args.target, filtercheck::pipeline::td1::run)
}
