//! B-V colour to main-sequence spectral type.
//!
//! Thresholds follow the intrinsic colour table of main-sequence stars; a
//! colour maps to the first type whose lower bound it reaches.

/// (lower B-V bound, spectral type), reddest first.
const COLOUR_TABLE: [(f64, &str); 40] = [
    (1.511, "M4"),
    (1.486, "M3"),
    (1.421, "M1"),
    (1.351, "M0"),
    (1.241, "K7"),
    (1.076, "K5"),
    (0.976, "K4"),
    (0.936, "K3"),
    (0.891, "K2"),
    (0.836, "K1"),
    (0.776, "K0"),
    (0.711, "G8"),
    (0.666, "G5"),
    (0.641, "G3"),
    (0.616, "G2"),
    (0.566, "G0"),
    (0.491, "F8"),
    (0.401, "F5"),
    (0.346, "F2"),
    (0.331, "F1"),
    (0.311, "F0"),
    (0.286, "A9"),
    (0.236, "A8"),
    (0.186, "A7"),
    (0.161, "A6"),
    (0.136, "A5"),
    (0.101, "A4"),
    (0.066, "A3"),
    (0.036, "A2"),
    (0.006, "A1"),
    (-0.039, "A0"),
    (-0.089, "B9"),
    (-0.119, "B8"),
    (-0.134, "B7"),
    (-0.149, "B6"),
    (-0.169, "B5"),
    (-0.189, "B4"),
    (-0.219, "B3"),
    (-0.249, "B2"),
    (-0.279, "B1"),
];

/// Bluest type, used below the last bound.
const BLUEST: &str = "B0";

/// Spectral type for a B-V colour, `None` for NaN.
pub fn spectral_type(b_minus_v: f64) -> Option<&'static str> {
    if b_minus_v.is_nan() {
        return None;
    }
    let found = COLOUR_TABLE
        .iter()
        .find(|(bound, _)| b_minus_v >= *bound)
        .map(|(_, sp)| *sp);
    Some(found.unwrap_or(BLUEST))
}

/// Split a type like `K5` into its class letter and subclass digit.
pub fn split_type(sp: &str) -> Option<(char, char)> {
    let mut chars = sp.chars();
    let class = chars.next()?;
    let subclass = chars.last()?;
    Some((class, subclass))
}
