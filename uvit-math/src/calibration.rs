//! GALEX magnitude and TD1 flux to UVIT count-rate calibration.
//!
//! GALEX AB magnitudes are first mapped onto a bounded "corrected" magnitude
//! using a square-root calibration curve, then converted to count rates with
//! `rate = sensitivity * 10^((m1 - mg_c) * 0.4)`. TD1 fluxes use a linear
//! law against a fixed normalisation flux.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Above this magnitude the correction is the identity.
pub const UPPER_KNOT: f64 = 15.0;

/// Offset applied to the NUV-corrected magnitude when FUV data is absent.
pub const FUV_ABSENT_OFFSET: f64 = 1.65;

/// TD1 flux (erg/s/cm²/Å) producing the tabulated TD1 rates.
pub const TD1_FLUX_NORM: f64 = 2e-13;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("Magnitude is not a finite number: {0}")]
    NonFiniteMagnitude(f64),

    #[error("Flux must be positive and finite: {0}")]
    InvalidFlux(f64),
}

pub type Result<T> = std::result::Result<T, CalibrationError>;

/// Piecewise bounded correction `floor + sqrt(slope * m - offset)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectionCurve {
    pub floor: f64,
    pub slope: f64,
    pub offset: f64,
    pub lower_knot: f64,
}

pub const FUV_CURVE: CorrectionCurve = CorrectionCurve {
    floor: 5.371,
    slope: 20.0,
    offset: 210.2,
    lower_knot: 10.511,
};

pub const NUV_CURVE: CorrectionCurve = CorrectionCurve {
    floor: 2.634,
    slope: 26.316,
    offset: 245.329,
    lower_knot: 9.323,
};

impl CorrectionCurve {
    pub fn correct(&self, magnitude: f64) -> f64 {
        if magnitude <= self.lower_knot {
            self.floor
        } else if magnitude <= UPPER_KNOT {
            // slope * m - offset is positive past the lower knot
            self.floor + (self.slope * magnitude - self.offset).sqrt()
        } else {
            magnitude
        }
    }
}

/// A physical UVIT filter and its relative sensitivity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Filter {
    /// Name used in safety declarations.
    pub name: &'static str,
    /// Column name used in output tables.
    pub column: &'static str,
    pub sensitivity: f64,
}

const fn filter(name: &'static str, column: &'static str, sensitivity: f64) -> Filter {
    Filter {
        name,
        column,
        sensitivity,
    }
}

pub const FUV_FILTERS: [Filter; 4] = [
    filter("CaF2", "caf2", 1.0),
    filter("BaF2", "baf2", 0.85),
    filter("Sapphire", "sapphire", 0.63),
    filter("Silica", "silica", 0.22),
];

pub const NUV_FILTERS: [Filter; 5] = [
    filter("Silica", "silica", 1.0),
    filter("NUV-B4", "b4", 0.22),
    filter("NUV-B13", "b13", 0.27),
    filter("NUV-B15", "b15", 0.074),
    filter("NUV-N2", "n2", 0.055),
];

/// TD1 rates are counts/s at `TD1_FLUX_NORM`.
pub const TD1_FUV_FILTERS: [Filter; 4] = [
    filter("CaF2", "caf2", 74.5),
    filter("BaF2", "baf2", 60.0),
    filter("Sapphire", "sapphire", 50.0),
    filter("Silica", "silica", 17.3),
];

pub const TD1_NUV_FILTERS: [Filter; 5] = [
    filter("Silica", "silica", 955.0),
    filter("NUV-B4", "b4", 218.5),
    filter("NUV-B13", "b13", 275.8),
    filter("NUV-B15", "b15", 59.6),
    filter("NUV-N2", "n2", 50.6),
];

/// UVIT ultraviolet channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Band {
    Fuv,
    Nuv,
}

impl Band {
    pub fn label(&self) -> &'static str {
        match self {
            Band::Fuv => "FUV",
            Band::Nuv => "NUV",
        }
    }

    pub fn curve(&self) -> &'static CorrectionCurve {
        match self {
            Band::Fuv => &FUV_CURVE,
            Band::Nuv => &NUV_CURVE,
        }
    }

    /// Magnitude giving one count per second through a unit-sensitivity filter.
    pub fn m1(&self) -> f64 {
        match self {
            Band::Fuv => 18.22,
            Band::Nuv => 20.0,
        }
    }

    /// GALEX AB zero point for intensity-map counts per second.
    pub fn galex_zero_point(&self) -> f64 {
        match self {
            Band::Fuv => 18.82,
            Band::Nuv => 20.08,
        }
    }

    pub fn filters(&self) -> &'static [Filter] {
        match self {
            Band::Fuv => &FUV_FILTERS,
            Band::Nuv => &NUV_FILTERS,
        }
    }

    pub fn td1_filters(&self) -> &'static [Filter] {
        match self {
            Band::Fuv => &TD1_FUV_FILTERS,
            Band::Nuv => &TD1_NUV_FILTERS,
        }
    }

    /// TD1 catalogue column holding this band's flux.
    pub fn td1_flux_column(&self) -> &'static str {
        match self {
            Band::Fuv => "flux_1565_a",
            Band::Nuv => "flux_2365_a",
        }
    }

    /// Detector character in GALEX intensity-map names (`...-fd-int.fits.gz`).
    pub fn galex_detector(&self) -> char {
        match self {
            Band::Fuv => 'f',
            Band::Nuv => 'n',
        }
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Predicted count rates for one source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountRateRow {
    pub magnitude: f64,
    pub corrected_magnitude: f64,
    /// One rate per filter, in `Band::filters` order.
    pub rates: Vec<f64>,
}

/// Predicted count rates for the brightest TD1 source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Td1Row {
    pub flux: f64,
    pub rates: Vec<f64>,
}

/// `sensitivity * 10^((m1 - corrected) * 0.4)`
pub fn count_rate(sensitivity: f64, m1: f64, corrected_magnitude: f64) -> f64 {
    sensitivity * 10f64.powf((m1 - corrected_magnitude) * 0.4)
}

fn check_magnitude(magnitude: f64) -> Result<()> {
    if magnitude.is_finite() {
        Ok(())
    } else {
        Err(CalibrationError::NonFiniteMagnitude(magnitude))
    }
}

fn rates_for(band: Band, corrected: f64) -> Vec<f64> {
    band.filters()
        .iter()
        .map(|f| count_rate(f.sensitivity, band.m1(), corrected))
        .collect()
}

/// Count rates for a GALEX magnitude observed in the same band.
pub fn count_rates(band: Band, magnitude: f64) -> Result<CountRateRow> {
    check_magnitude(magnitude)?;
    let corrected = band.curve().correct(magnitude);
    Ok(CountRateRow {
        magnitude,
        corrected_magnitude: corrected,
        rates: rates_for(band, corrected),
    })
}

/// FUV count rates estimated from a NUV magnitude for fields without FUV data.
pub fn fuv_rates_from_nuv(nuv_magnitude: f64) -> Result<CountRateRow> {
    check_magnitude(nuv_magnitude)?;
    let corrected = NUV_CURVE.correct(nuv_magnitude) - FUV_ABSENT_OFFSET;
    Ok(CountRateRow {
        magnitude: nuv_magnitude,
        corrected_magnitude: corrected,
        rates: rates_for(Band::Fuv, corrected),
    })
}

/// Count rates from a TD1 flux.
pub fn td1_count_rates(band: Band, flux: f64) -> Result<Td1Row> {
    if !flux.is_finite() || flux < 0.0 {
        return Err(CalibrationError::InvalidFlux(flux));
    }
    let ratio = flux / TD1_FLUX_NORM;
    Ok(Td1Row {
        flux,
        rates: band
            .td1_filters()
            .iter()
            .map(|f| f.sensitivity * ratio)
            .collect(),
    })
}

/// GALEX intensity-map counts per second to AB magnitude.
pub fn cps_to_magnitude(band: Band, cps: f64) -> Result<f64> {
    if !cps.is_finite() || cps <= 0.0 {
        return Err(CalibrationError::InvalidFlux(cps));
    }
    Ok(-2.5 * cps.log10() + band.galex_zero_point())
}
