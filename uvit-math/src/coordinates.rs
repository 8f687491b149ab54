//! Sky positions: sexagesimal parsing, formatting and spherical geometry.
//!
//! Right ascension is entered as `HH:MM:SS[.s]` and declination as
//! `[±]DD:MM:SS[.s]`. Both are stored in decimal degrees (ICRS/J2000).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Right ascension of the north galactic pole (J2000), degrees.
pub const NGP_RA_DEG: f64 = 192.859_48;
/// Declination of the north galactic pole (J2000), degrees.
pub const NGP_DEC_DEG: f64 = 27.128_25;

/// Fields with |b| up to this many degrees are treated as on the galactic plane.
pub const GALACTIC_PLANE_HALF_WIDTH_DEG: f64 = 30.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoordinateError {
    #[error("Check your RA DEC input.")]
    Format,

    #[error("Check your RA DEC input. ({0})")]
    Range(String),
}

pub type Result<T> = std::result::Result<T, CoordinateError>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyPosition {
    pub ra_deg: f64,
    pub dec_deg: f64,
}

/// Split a colon separated field into (negative, whole, minutes, seconds).
fn split_sexagesimal(s: &str) -> Result<(bool, f64, f64, f64)> {
    let s = s.trim();
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 3 {
        return Err(CoordinateError::Format);
    }

    let head = parts[0].trim();
    let negative = head.starts_with('-');
    let head = head.trim_start_matches(['+', '-']);

    let parse = |field: &str| -> Result<f64> {
        field
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or(CoordinateError::Format)
    };

    let whole = parse(head)?;
    let minutes = parse(parts[1])?;
    let seconds = parse(parts[2])?;

    if whole < 0.0 || !(0.0..60.0).contains(&minutes) || !(0.0..60.0).contains(&seconds) {
        return Err(CoordinateError::Range(s.to_string()));
    }

    Ok((negative, whole, minutes, seconds))
}

impl SkyPosition {
    pub fn new(ra_deg: f64, dec_deg: f64) -> Self {
        Self { ra_deg, dec_deg }
    }

    /// Parse a target from the command line strings.
    ///
    /// Both strings must contain exactly two `:` separators.
    pub fn from_sexagesimal(ra: &str, dec: &str) -> Result<Self> {
        if ra.matches(':').count() != 2 || dec.matches(':').count() != 2 {
            return Err(CoordinateError::Format);
        }

        let (ra_negative, hours, ra_min, ra_sec) = split_sexagesimal(ra)?;
        if ra_negative {
            return Err(CoordinateError::Range(ra.to_string()));
        }
        let ra_hours = hours + ra_min / 60.0 + ra_sec / 3600.0;
        if ra_hours >= 24.0 {
            return Err(CoordinateError::Range(ra.to_string()));
        }

        let (dec_negative, degrees, dec_min, dec_sec) = split_sexagesimal(dec)?;
        let magnitude = degrees + dec_min / 60.0 + dec_sec / 3600.0;
        if magnitude > 90.0 {
            return Err(CoordinateError::Range(dec.to_string()));
        }
        let dec_deg = if dec_negative { -magnitude } else { magnitude };

        Ok(Self::new(ra_hours * 15.0, dec_deg))
    }

    /// Great-circle separation in degrees (Vincenty formula).
    pub fn separation_deg(&self, other: &SkyPosition) -> f64 {
        let ra1 = self.ra_deg.to_radians();
        let dec1 = self.dec_deg.to_radians();
        let ra2 = other.ra_deg.to_radians();
        let dec2 = other.dec_deg.to_radians();

        let delta_ra = ra2 - ra1;
        let (sin_dra, cos_dra) = delta_ra.sin_cos();
        let (sin_d1, cos_d1) = dec1.sin_cos();
        let (sin_d2, cos_d2) = dec2.sin_cos();

        let num1 = cos_d2 * sin_dra;
        let num2 = cos_d1 * sin_d2 - sin_d1 * cos_d2 * cos_dra;
        let denom = sin_d1 * sin_d2 + cos_d1 * cos_d2 * cos_dra;

        (num1 * num1 + num2 * num2).sqrt().atan2(denom).to_degrees()
    }

    /// Great-circle separation in arcseconds.
    pub fn separation_arcsec(&self, other: &SkyPosition) -> f64 {
        self.separation_deg(other) * 3600.0
    }

    /// Galactic latitude b in degrees.
    pub fn galactic_latitude(&self) -> f64 {
        let dec = self.dec_deg.to_radians();
        let ngp_dec = NGP_DEC_DEG.to_radians();
        let d_ra = (self.ra_deg - NGP_RA_DEG).to_radians();

        let sin_b = dec.sin() * ngp_dec.sin() + dec.cos() * ngp_dec.cos() * d_ra.cos();
        sin_b.clamp(-1.0, 1.0).asin().to_degrees()
    }

    pub fn is_on_galactic_plane(&self) -> bool {
        self.galactic_latitude().abs() <= GALACTIC_PLANE_HALF_WIDTH_DEG
    }

    /// Right ascension as `HH:MM:SS.sss`.
    pub fn ra_hms(&self) -> String {
        const MS_PER_DAY: i64 = 24 * 3_600_000;
        let total = (self.ra_deg / 15.0 * 3_600_000.0).round() as i64;
        let total = total.rem_euclid(MS_PER_DAY);

        let hours = total / 3_600_000;
        let minutes = (total / 60_000) % 60;
        let millis = total % 60_000;
        format!(
            "{:02}:{:02}:{:02}.{:03}",
            hours,
            minutes,
            millis / 1000,
            millis % 1000
        )
    }

    /// Declination as `±DD:MM:SS.ss`.
    pub fn dec_dms(&self) -> String {
        let sign = if self.dec_deg < 0.0 { '-' } else { '+' };
        let total = (self.dec_deg.abs() * 360_000.0).round() as i64;

        let degrees = total / 360_000;
        let minutes = (total / 6000) % 60;
        let centis = total % 6000;
        format!(
            "{}{:02}:{:02}:{:02}.{:02}",
            sign,
            degrees,
            minutes,
            centis / 100,
            centis % 100
        )
    }
}

impl std::fmt::Display for SkyPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.ra_hms(), self.dec_dms())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_parse_basic() {
        let pos = SkyPosition::from_sexagesimal("10:30:00", "+20:00:00").unwrap();
        assert_relative_eq!(pos.ra_deg, 157.5, epsilon = 1e-12);
        assert_relative_eq!(pos.dec_deg, 20.0, epsilon = 1e-12);
    }

    #[test]
    fn test_negative_zero_degrees_keeps_sign() {
        let pos = SkyPosition::from_sexagesimal("00:00:00", "-00:30:00").unwrap();
        assert_relative_eq!(pos.dec_deg, -0.5, epsilon = 1e-12);
    }

    #[rstest]
    #[case("10:30", "+20:00:00")]
    #[case("10:30:00", "20")]
    #[case("10 30 00", "+20 00 00")]
    #[case("aa:30:00", "+20:00:00")]
    #[case("10:30:00", "+20:xx:00")]
    #[case("nan:00:00", "+10:00:00")]
    #[case("10:00:00", "NaN:00:00")]
    #[case("inf:00:00", "+10:00:00")]
    #[case("10:00:00", "-inf:00:00")]
    #[case("10:NaN:00", "+10:00:00")]
    #[case("10:00:00", "+10:00:infinity")]
    fn test_malformed_input(#[case] ra: &str, #[case] dec: &str) {
        assert_eq!(
            SkyPosition::from_sexagesimal(ra, dec),
            Err(CoordinateError::Format)
        );
    }

    #[rstest]
    #[case("24:00:00", "+20:00:00")]
    #[case("10:61:00", "+20:00:00")]
    #[case("10:30:00", "+91:00:00")]
    #[case("-01:00:00", "+20:00:00")]
    fn test_out_of_range(#[case] ra: &str, #[case] dec: &str) {
        assert!(matches!(
            SkyPosition::from_sexagesimal(ra, dec),
            Err(CoordinateError::Range(_))
        ));
    }

    #[test]
    fn test_error_message_matches_user_prompt() {
        assert_eq!(CoordinateError::Format.to_string(), "Check your RA DEC input.");
    }

    #[test]
    fn test_separation_along_meridian() {
        let a = SkyPosition::new(10.0, 0.0);
        let b = SkyPosition::new(10.0, 1.0);
        assert_relative_eq!(a.separation_deg(&b), 1.0, epsilon = 1e-10);
        assert_relative_eq!(a.separation_arcsec(&b), 3600.0, epsilon = 1e-6);
    }

    #[test]
    fn test_separation_antipodal_and_identical() {
        let a = SkyPosition::new(0.0, 0.0);
        let b = SkyPosition::new(180.0, 0.0);
        assert_relative_eq!(a.separation_deg(&b), 180.0, epsilon = 1e-10);
        assert_relative_eq!(a.separation_deg(&a), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_separation_shrinks_near_pole() {
        let a = SkyPosition::new(0.0, 89.0);
        let b = SkyPosition::new(180.0, 89.0);
        assert_relative_eq!(a.separation_deg(&b), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_galactic_latitude_at_pole() {
        let ngp = SkyPosition::new(NGP_RA_DEG, NGP_DEC_DEG);
        assert_relative_eq!(ngp.galactic_latitude(), 90.0, epsilon = 1e-5);
        assert!(!ngp.is_on_galactic_plane());
    }

    #[test]
    fn test_galactic_center_is_on_plane() {
        let gc = SkyPosition::new(266.404_99, -28.936_17);
        assert!(gc.galactic_latitude().abs() < 0.1);
        assert!(gc.is_on_galactic_plane());
    }

    #[test]
    fn test_formatting() {
        let pos = SkyPosition::from_sexagesimal("05:34:31.94", "+22:00:52.2").unwrap();
        assert_eq!(pos.ra_hms(), "05:34:31.940");
        assert_eq!(pos.dec_dms(), "+22:00:52.20");

        let south = SkyPosition::new(0.0, -0.5);
        assert_eq!(south.dec_dms(), "-00:30:00.00");
    }

    #[test]
    fn test_formatting_carries_rounded_seconds() {
        // 59.9999 s rounds up into the next minute and hour
        let pos = SkyPosition::new((1.0 - 0.0001 / 3600.0) * 15.0, 10.0 - 0.0001 / 3600.0);
        assert_eq!(pos.ra_hms(), "01:00:00.000");
        assert_eq!(pos.dec_dms(), "+10:00:00.00");
    }
}
