//! Process plumbing shared by the binaries: logging, the working
//! directory, `error.txt` and the exit status.

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use log::LevelFilter;
use skyquery::ServiceConfig;

use crate::error::{PipelineError, Result};
use crate::shared_args::{CheckContext, Target, TargetArgs};

pub const ERROR_FILE: &str = "error.txt";

/// Info by default, debug with `--verbose`; `RUST_LOG` still applies.
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

/// Validate the arguments into a context, preparing the working directory.
pub fn prepare(args: &TargetArgs) -> Result<CheckContext> {
    let work_dir = args.work_dir();
    fs::create_dir_all(&work_dir)?;
    // an empty error file marks a run in progress
    fs::write(work_dir.join(ERROR_FILE), "")?;

    let config = ServiceConfig::load_or_default(args.config.as_deref())?;
    let target = Target::parse(args.instrument, &args.ra, &args.dec)?;
    log::info!(
        "Checking {} at RA {} DEC {} ({})",
        target.instrument,
        target.ra,
        target.dec,
        target.position
    );
    Ok(CheckContext::new(target, config, &work_dir))
}

/// Print the failure and leave it in `error.txt`.
pub fn report_failure(work_dir: &Path, error: &PipelineError) {
    println!("\n{}\n", error);
    log::debug!("Check failed: {:?}", error);
    if let Err(e) = fs::write(work_dir.join(ERROR_FILE), error.to_string()) {
        log::error!("Could not write {}: {}", ERROR_FILE, e);
    }
}

/// Run one check, reporting a failure before handing it back.
pub fn run_check<F>(args: &TargetArgs, check: F) -> Result<()>
where
    F: FnOnce(&CheckContext) -> Result<()>,
{
    let outcome = prepare(args).and_then(|ctx| check(&ctx));
    if let Err(error) = &outcome {
        report_failure(&args.work_dir(), error);
    }
    outcome
}

/// Entry point of every binary: exit 0 on success, 1 on any failure.
pub fn run<F>(args: &TargetArgs, check: F) -> ExitCode
where
    F: FnOnce(&CheckContext) -> Result<()>,
{
    init_logging(args.verbose);
    match run_check(args, check) {
        Ok(()) => {
            println!("Done!\n");
            ExitCode::SUCCESS
        }
        Err(_) => ExitCode::FAILURE,
    }
}
