//! UV filter check from GALEX GR6 sources on VizieR

use clap::Parser;
use filtercheck::runner;
use filtercheck::shared_args::TargetArgs;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "vizier_uvcheck", about = "UV filter check from GALEX GR6 sources on VizieR")]
struct Args {
    #[command(flatten)]
    target: TargetArgs,
}

fn main() -> ExitCode {
    let args = Args::parse();
    runner::run(&args.target, filtercheck::pipeline::vizier::run)
}
