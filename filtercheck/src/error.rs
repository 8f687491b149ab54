//! Failures that end a check.
//!
//! The `Display` text of each variant is what the user sees on stdout and
//! finds in `error.txt`.

use std::path::PathBuf;
use thiserror::Error;

use skyquery::SkyQueryError;
use uvit_math::{CalibrationError, CoordinateError};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Coordinates(#[from] CoordinateError),

    #[error(transparent)]
    Calibration(#[from] CalibrationError),

    #[error(transparent)]
    Service(#[from] SkyQueryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// No GALEX tile covers the target. Carries the full notice.
    #[error("{0}")]
    ZeroTiles(String),

    #[error("Could not find the catalogue for this region.")]
    NoCatalogue,

    #[error("Could not find FUV and NUV GALEX images for \nthe coordinates provided")]
    NoImages,

    #[error("Cannot determine filter! exiting.")]
    UnknownFilter(String),

    #[error("The provided RA DEC values fell outside the GALEX image.")]
    OutsideImage,

    #[error("The galactic latitude is between -30 to 30. \nYour field cannot be checked using TD1 catalogue!")]
    GalacticPlane,

    #[error("No usable catalogue source within {0} arcsec of the target.")]
    EmptySelection(f64),

    #[error("No sources detected in {}", .0.display())]
    NoSources(PathBuf),

    #[error("BSWT listed no stars around the target.")]
    NoStars,

    #[error("No spectral type for B-V = {0}")]
    SpectralType(f64),

    #[error("Failed to render {}: {message}", .path.display())]
    Render { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
