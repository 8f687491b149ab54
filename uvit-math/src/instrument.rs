//! AstroSat instruments and their search geometry.

use serde::{Deserialize, Serialize};

/// GALEX intensity-map pixel scale in arcseconds.
pub const GALEX_PIXEL_SCALE_ARCSEC: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Instrument {
    Uvit,
    Sxt,
    Czti,
    Laxpc,
}

impl Instrument {
    pub const ALL: [Instrument; 4] = [
        Instrument::Uvit,
        Instrument::Sxt,
        Instrument::Czti,
        Instrument::Laxpc,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Instrument::Uvit => "uvit",
            Instrument::Sxt => "sxt",
            Instrument::Czti => "czti",
            Instrument::Laxpc => "laxpc",
        }
    }

    /// Catalogue search radius in arcseconds.
    pub fn search_radius_arcsec(&self) -> f64 {
        match self {
            Instrument::Uvit => 1200.0,
            Instrument::Sxt => 1500.0,
            Instrument::Czti | Instrument::Laxpc => 1680.0,
        }
    }

    /// Half-width of the GALEX image window, in pixels.
    pub fn image_window_px(&self) -> usize {
        match self {
            Instrument::Uvit => 800,
            Instrument::Sxt => 1500,
            Instrument::Czti | Instrument::Laxpc => 1120,
        }
    }
}

impl std::fmt::Display for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Instrument {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Instrument::ALL
            .iter()
            .copied()
            .find(|i| i.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown instrument '{}', expected uvit, sxt, czti or laxpc", s))
    }
}
