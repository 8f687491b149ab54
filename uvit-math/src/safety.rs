//! Per-filter saturation checks.
//!
//! A filter is safe when no selected source is predicted above its count-rate
//! limit. Each UV band also has a grating, judged on the first filter's column
//! against the brightest source with a lower limit.

use crate::calibration::{Band, FUV_FILTERS, NUV_FILTERS};

/// Count-rate limit (counts/s) for the UV filters.
pub const UV_FILTER_LIMIT: f64 = 1500.0;
pub const FUV_GRATING_LIMIT: f64 = 892.0;
pub const NUV_GRATING_LIMIT: f64 = 1133.0;

/// Count-rate limit (counts/s) for the VIS filters.
pub const VIS_FILTER_LIMIT: f64 = 4800.0;
pub const VIS_FILTERS: [&str; 5] = ["VIS3", "VIS2", "VIS1", "ND1", "BK7"];

/// A grating evaluated against the first filter's rates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grating {
    pub name: &'static str,
    pub limit: f64,
}

pub fn grating_for(band: Band) -> Grating {
    match band {
        Band::Fuv => Grating {
            name: "FUV-grating",
            limit: FUV_GRATING_LIMIT,
        },
        Band::Nuv => Grating {
            name: "NUV-grating",
            limit: NUV_GRATING_LIMIT,
        },
    }
}

/// Ordered list of filters judged safe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyVerdict {
    pub label: Option<String>,
    pub safe: Vec<String>,
}

impl SafetyVerdict {
    pub fn is_safe(&self, filter: &str) -> bool {
        self.safe.iter().any(|f| f == filter)
    }

    /// Human readable declaration, e.g. `Safe filters in NUV: ['Silica', 'NUV-grating']`.
    pub fn declaration(&self) -> String {
        let names: Vec<String> = self.safe.iter().map(|f| format!("'{}'", f)).collect();
        match &self.label {
            Some(label) => format!("Safe filters in {}: [{}]", label, names.join(", ")),
            None => format!("Safe filters: [{}]", names.join(", ")),
        }
    }
}

fn column_max(rows: &[Vec<f64>], column: usize) -> f64 {
    rows.iter()
        .filter_map(|r| r.get(column).copied())
        .fold(f64::NEG_INFINITY, f64::max)
}

/// Threshold-and-reduce over each column of `rows`.
///
/// `rows[i][j]` is the rate of source `i` through `filters[j]`. The grating,
/// if any, is reported right after the first filter.
pub fn classify(
    label: Option<&str>,
    filters: &[&str],
    rows: &[Vec<f64>],
    limit: f64,
    grating: Option<Grating>,
) -> SafetyVerdict {
    let mut safe = Vec::new();

    for (column, name) in filters.iter().enumerate() {
        let peak = column_max(rows, column);
        if peak <= limit {
            safe.push(name.to_string());
        }
        if column == 0 {
            if let Some(grating) = grating {
                if peak <= grating.limit {
                    safe.push(grating.name.to_string());
                }
            }
        }
    }

    SafetyVerdict {
        label: label.map(str::to_string),
        safe,
    }
}

/// Classify the UV filters of `band` from per-source rate rows.
pub fn classify_band(band: Band, rows: &[Vec<f64>]) -> SafetyVerdict {
    let names: Vec<&str> = match band {
        Band::Fuv => FUV_FILTERS.iter().map(|f| f.name).collect(),
        Band::Nuv => NUV_FILTERS.iter().map(|f| f.name).collect(),
    };
    classify(
        Some(band.label()),
        &names,
        rows,
        UV_FILTER_LIMIT,
        Some(grating_for(band)),
    )
}

/// Classify the VIS filters; rows are in `VIS_FILTERS` order.
pub fn classify_vis(rows: &[Vec<f64>]) -> SafetyVerdict {
    classify(None, &VIS_FILTERS, rows, VIS_FILTER_LIMIT, None)
}
