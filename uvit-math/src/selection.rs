//! Selection of the brightest catalogue sources around a target.

use crate::calibration::TD1_FLUX_NORM;
use crate::coordinates::SkyPosition;
use serde::Serialize;

/// Rows kept for catalogue and image tables.
pub const MAX_TABLE_ROWS: usize = 5;
/// Rows kept for the VIS check.
pub const MAX_VIS_ROWS: usize = 7;
/// GALEX null magnitude.
pub const MAGNITUDE_SENTINEL: i64 = -999;
/// Fainter GALEX sources are ignored.
pub const FAINT_LIMIT: f64 = 22.0;
/// Box half-width used to pre-filter the TD1 catalogue, degrees.
pub const TD1_BOX_HALF_WIDTH_DEG: f64 = 5.0;
/// Pairs of VIS stars closer than this are reported, arcseconds.
pub const PROXIMITY_ARCSEC: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CatalogSource {
    pub position: SkyPosition,
    pub magnitude: f64,
    /// NUV FWHM in degrees, where the catalogue provides it.
    pub fwhm_deg: Option<f64>,
}

impl CatalogSource {
    pub fn new(position: SkyPosition, magnitude: f64) -> Self {
        Self {
            position,
            magnitude,
            fwhm_deg: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FluxSource {
    pub position: SkyPosition,
    pub flux: f64,
}

/// GALEX magnitudes are usable when not null and not fainter than `FAINT_LIMIT`.
pub fn is_usable_magnitude(magnitude: f64) -> bool {
    magnitude.is_finite() && magnitude.trunc() as i64 != MAGNITUDE_SENTINEL && magnitude <= FAINT_LIMIT
}

/// Sort ascending by `key` and keep at most `limit` items.
pub fn smallest_by<T, F>(mut items: Vec<T>, limit: usize, key: F) -> Vec<T>
where
    F: Fn(&T) -> f64,
{
    items.sort_by(|a, b| key(a).total_cmp(&key(b)));
    items.truncate(limit);
    items
}

/// Sort descending by `key` and keep at most `limit` items.
pub fn largest_by<T, F>(mut items: Vec<T>, limit: usize, key: F) -> Vec<T>
where
    F: Fn(&T) -> f64,
{
    items.sort_by(|a, b| key(b).total_cmp(&key(a)));
    items.truncate(limit);
    items
}

/// The brightest usable sources within `radius_arcsec` of `target`.
///
/// Ties in magnitude are broken by RA, then DEC.
pub fn brightest_catalog_sources<I>(
    sources: I,
    target: &SkyPosition,
    radius_arcsec: f64,
    limit: usize,
) -> Vec<CatalogSource>
where
    I: IntoIterator<Item = CatalogSource>,
{
    let mut kept: Vec<CatalogSource> = sources
        .into_iter()
        .filter(|s| is_usable_magnitude(s.magnitude))
        .filter(|s| s.position.separation_arcsec(target) <= radius_arcsec)
        .collect();

    kept.sort_by(|a, b| {
        a.magnitude
            .total_cmp(&b.magnitude)
            .then(a.position.ra_deg.total_cmp(&b.position.ra_deg))
            .then(a.position.dec_deg.total_cmp(&b.position.dec_deg))
    });
    kept.truncate(limit);
    kept
}

fn in_box(position: &SkyPosition, target: &SkyPosition, half_width: f64) -> bool {
    let d_ra = (position.ra_deg - target.ra_deg + 540.0).rem_euclid(360.0) - 180.0;
    d_ra.abs() <= half_width && (position.dec_deg - target.dec_deg).abs() <= half_width
}

/// Highest TD1 flux within `radius_arcsec` of `target`.
///
/// Falls back to `TD1_FLUX_NORM` when nothing is in range.
pub fn brightest_td1_flux(sources: &[FluxSource], target: &SkyPosition, radius_arcsec: f64) -> f64 {
    let peak = sources
        .iter()
        .filter(|s| s.flux.is_finite())
        .filter(|s| in_box(&s.position, target, TD1_BOX_HALF_WIDTH_DEG))
        .filter(|s| s.position.separation_arcsec(target) <= radius_arcsec)
        .map(|s| s.flux)
        .fold(None, |best: Option<f64>, f| Some(best.map_or(f, |b| b.max(f))));

    match peak {
        Some(flux) => flux,
        None => {
            log::info!("No TD1 source within {} arcsec, using normalisation flux", radius_arcsec);
            TD1_FLUX_NORM
        }
    }
}

/// Number of unordered pairs separated by less than `limit_arcsec`.
pub fn close_pairs(positions: &[SkyPosition], limit_arcsec: f64) -> usize {
    let mut count = 0;
    for (i, a) in positions.iter().enumerate() {
        for b in &positions[i + 1..] {
            if a.separation_arcsec(b) < limit_arcsec {
                count += 1;
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(ra: f64, dec: f64, magnitude: f64) -> CatalogSource {
        CatalogSource::new(SkyPosition::new(ra, dec), magnitude)
    }

    #[test]
    fn test_usable_magnitudes() {
        assert!(is_usable_magnitude(14.2));
        assert!(is_usable_magnitude(22.0));
        assert!(!is_usable_magnitude(22.01));
        assert!(!is_usable_magnitude(-999.0));
        assert!(!is_usable_magnitude(-999.5));
        assert!(!is_usable_magnitude(f64::NAN));
    }

    #[test]
    fn test_top_five_sorted_and_bounded() {
        let target = SkyPosition::new(150.0, 2.0);
        let sources: Vec<CatalogSource> = (0..12)
            .map(|i| source(150.0 + i as f64 * 0.001, 2.0, 20.0 - i as f64 * 0.5))
            .collect();

        let top = brightest_catalog_sources(sources, &target, 1200.0, MAX_TABLE_ROWS);
        assert_eq!(top.len(), 5);
        for pair in top.windows(2) {
            assert!(pair[0].magnitude <= pair[1].magnitude);
        }
        assert_eq!(top[0].magnitude, 14.5);
    }

    #[test]
    fn test_radius_and_sentinels_are_excluded() {
        let target = SkyPosition::new(10.0, -5.0);
        let sources = vec![
            source(10.0, -5.0, -999.0),
            source(10.0, -5.0 + 0.5, 12.0), // 1800 arcsec away
            source(10.0, -5.0 + 0.1, 17.0),
            source(10.0, -5.0, 23.0),
        ];
        let top = brightest_catalog_sources(sources, &target, 1200.0, MAX_TABLE_ROWS);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].magnitude, 17.0);
    }

    #[test]
    fn test_ties_break_on_ra_then_dec() {
        let target = SkyPosition::new(10.0, 10.0);
        let sources = vec![
            source(10.002, 10.0, 15.0),
            source(10.001, 10.001, 15.0),
            source(10.001, 10.0, 15.0),
        ];
        let top = brightest_catalog_sources(sources, &target, 1200.0, MAX_TABLE_ROWS);
        assert_eq!(top[0].position, SkyPosition::new(10.001, 10.0));
        assert_eq!(top[1].position, SkyPosition::new(10.001, 10.001));
        assert_eq!(top[2].position, SkyPosition::new(10.002, 10.0));
    }

    #[test]
    fn test_td1_brightest_flux() {
        let target = SkyPosition::new(359.99, 0.0);
        let sources = vec![
            FluxSource { position: SkyPosition::new(0.05, 0.0), flux: 3e-12 },
            FluxSource { position: SkyPosition::new(359.9, 0.05), flux: 1e-12 },
            FluxSource { position: SkyPosition::new(200.0, 0.0), flux: 9e-10 },
        ];
        assert_eq!(brightest_td1_flux(&sources, &target, 1680.0), 3e-12);
    }

    #[test]
    fn test_td1_empty_field_uses_norm() {
        let target = SkyPosition::new(100.0, 60.0);
        let sources = vec![FluxSource { position: SkyPosition::new(110.0, 60.0), flux: 1e-11 }];
        assert_eq!(brightest_td1_flux(&sources, &target, 1200.0), TD1_FLUX_NORM);
    }

    #[test]
    fn test_largest_by_descending() {
        let fluxes = vec![3.0, 9.0, 1.0, 7.0, 5.0, 8.0, 2.0];
        let top = largest_by(fluxes, MAX_TABLE_ROWS, |f| *f);
        assert_eq!(top, vec![9.0, 8.0, 7.0, 5.0, 3.0]);

        let vis = smallest_by(vec![9.1, 6.2, 8.0], MAX_VIS_ROWS, |m| *m);
        assert_eq!(vis, vec![6.2, 8.0, 9.1]);
    }

    #[test]
    fn test_close_pairs() {
        let positions = vec![
            SkyPosition::new(50.0, 10.0),
            SkyPosition::new(50.0, 10.0 + 5.0 / 3600.0),
            SkyPosition::new(50.0, 10.0 + 9.0 / 3600.0),
            SkyPosition::new(51.0, 10.0),
        ];
        // (0,1), (0,2) and (1,2) are all within 10 arcsec
        assert_eq!(close_pairs(&positions, PROXIMITY_ARCSEC), 3);
        assert_eq!(close_pairs(&positions[2..], PROXIMITY_ARCSEC), 0);
    }
}
