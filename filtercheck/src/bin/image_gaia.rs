//! UV filter check from sources detected on GALEX intensity maps

use clap::Parser;
use filtercheck::runner;
use filtercheck::shared_args::TargetArgs;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "image_gaia", about = "UV filter check from sources detected on GALEX intensity maps")]
struct Args {
    #[command(flatten)]
    target: TargetArgs,
}

fn main() -> ExitCode {
    let args = Args::parse();
    runner::run(&args.target, filtercheck::pipeline::image::run)
}
