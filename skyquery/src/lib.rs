//! Remote catalogue services and local catalogue files.
//!
//! Each module talks to exactly one service or file format:
//!
//! - [`galex`]: MAST GALEX GR6 tile search and product downloads
//! - [`vizier`]: VizieR cone search on the GALEX GR6 source catalogues (II/312)
//! - [`uvit_web`]: UVIT bright star finder (BSWT) and exposure time calculator
//! - [`fits`]: GALEX mcat tables, intensity maps and the TD1 catalogue
//!
//! All network access is blocking and goes through one [`http::HttpSession`].

pub mod config;
pub mod fits;
pub mod galex;
pub mod html;
pub mod http;
pub mod uvit_web;
pub mod vizier;

pub use config::ServiceConfig;
pub use http::HttpSession;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkyQueryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed table: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    #[error("FITS error: {0}")]
    Fits(#[from] fitsio::errors::Error),

    #[error("Incomplete FITS file. Check if Galex Servers are working properly.")]
    IncompleteFits(PathBuf),

    #[error("Could not find the catalogue file: {0}")]
    MissingCatalogue(String),

    #[error("Missing FITS header keyword {0}")]
    MissingKeyword(String),

    #[error("Unexpected response from {service}: {detail}")]
    Parse { service: &'static str, detail: String },

    #[error("The UVIT website is down!")]
    ServiceDown,

    #[error(transparent)]
    Wcs(#[from] uvit_math::wcs::WcsError),
}

pub type Result<T> = std::result::Result<T, SkyQueryError>;

impl SkyQueryError {
    pub(crate) fn parse(service: &'static str, detail: impl Into<String>) -> Self {
        SkyQueryError::Parse {
            service,
            detail: detail.into(),
        }
    }
}
