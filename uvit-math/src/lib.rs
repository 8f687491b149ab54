//! Calibration and source-selection math for UVIT filter safety checks.
//!
//! Everything in this crate is pure computation: sexagesimal coordinate
//! handling, the GALEX/TD1 to UVIT count-rate calibration, the filter-safety
//! classifier, source selection and the TAN projection used to locate
//! sources on GALEX intensity maps. Network and file access live in
//! `skyquery`.

pub mod calibration;
pub mod coordinates;
pub mod instrument;
pub mod safety;
pub mod selection;
pub mod spectral;
pub mod wcs;

pub use calibration::{Band, CalibrationError, CountRateRow, Td1Row};
pub use coordinates::{CoordinateError, SkyPosition};
pub use instrument::Instrument;
pub use safety::SafetyVerdict;
pub use selection::{CatalogSource, FluxSource};
