//! UV filter check from GALEX catalogue and images, with TD1 fallback
//!
//! ```bash
//! gaia uvit 07:36:51.396 +65:36:09.17 /data/field1
//! gaia --verbose sxt 12:12:12 -12:12:12
//! ```
//!
//! Writes `NUV_*.txt`/`FUV_*.txt`, `safe_NUV_filters.txt`,
//! `safe_FUV_filters.txt` and one PNG per intensity map.

use clap::Parser;
use filtercheck::runner;
use filtercheck::shared_args::TargetArgs;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "gaia", about = "UV filter check from GALEX catalogue and images, with TD1 fallback")]
struct Args {
    #[command(flatten)]
    target: TargetArgs,
}

fn main() -> ExitCode {
    let args = Args::parse();
    runner::run(&args.target, filtercheck::pipeline::merged::run)
}
