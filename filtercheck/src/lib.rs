//! UVIT filter safety checks.
//!
//! Each binary predicts the UVIT count rates of the brightest sources around
//! a pointing and declares which filters can be used without saturating the
//! detectors:
//!
//! - `gaia`: GALEX catalogue cross-checked against the intensity maps,
//!   falling back to TD1 when GALEX has no coverage
//! - `catalogue_gaia`: GALEX merged catalogue only
//! - `image_gaia`: sources detected on the GALEX intensity maps
//! - `td1_gaia`: TD1 catalogue only
//! - `vizier_uvcheck`: GALEX GR6 sources from VizieR
//! - `theia`: VIS filters from the UVIT bright star finder and ETC
//!
//! All of them take `<instrument> <RA> <DEC> [<working_dir>]`, write their
//! tables into the working directory and exit non-zero on failure, leaving
//! the reason in `error.txt`.

pub mod error;
pub mod image_proc;
pub mod pipeline;
pub mod render;
pub mod report;
pub mod runner;
pub mod shared_args;
pub mod theia;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use error::{PipelineError, Result};
pub use shared_args::{CheckContext, Target, TargetArgs};
