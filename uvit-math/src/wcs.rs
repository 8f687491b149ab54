//! Gnomonic (TAN) world coordinate system for GALEX intensity maps.
//!
//! Pixel coordinates here are 0-based: the centre of the first pixel is
//! (0, 0), so FITS `CRPIX` values are shifted by one.

use crate::coordinates::SkyPosition;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WcsError {
    #[error("WCS linear transform is singular")]
    Singular,

    #[error("Position is more than 90 degrees from the tangent point")]
    BehindTangentPlane,
}

pub type Result<T> = std::result::Result<T, WcsError>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TanWcs {
    /// Reference sky position (CRVAL1, CRVAL2) in degrees.
    pub crval: [f64; 2],
    /// Reference pixel (CRPIX1, CRPIX2), FITS 1-based.
    pub crpix: [f64; 2],
    /// Linear transform CDi_j in degrees per pixel.
    pub cd: [[f64; 2]; 2],
    inverse: [[f64; 2]; 2],
}

impl TanWcs {
    pub fn from_cd(crval: [f64; 2], crpix: [f64; 2], cd: [[f64; 2]; 2]) -> Result<Self> {
        let det = cd[0][0] * cd[1][1] - cd[0][1] * cd[1][0];
        if det == 0.0 || !det.is_finite() {
            return Err(WcsError::Singular);
        }
        let inverse = [
            [cd[1][1] / det, -cd[0][1] / det],
            [-cd[1][0] / det, cd[0][0] / det],
        ];
        Ok(Self {
            crval,
            crpix,
            cd,
            inverse,
        })
    }

    /// Build from CDELTi and the CROTA2 rotation (degrees).
    pub fn from_cdelt(
        crval: [f64; 2],
        crpix: [f64; 2],
        cdelt: [f64; 2],
        crota_deg: f64,
    ) -> Result<Self> {
        let (sin_r, cos_r) = crota_deg.to_radians().sin_cos();
        let cd = [
            [cdelt[0] * cos_r, -cdelt[1] * sin_r],
            [cdelt[0] * sin_r, cdelt[1] * cos_r],
        ];
        Self::from_cd(crval, crpix, cd)
    }

    /// Sky position of a 0-based pixel coordinate.
    pub fn pixel_to_world(&self, x: f64, y: f64) -> SkyPosition {
        let dx = x + 1.0 - self.crpix[0];
        let dy = y + 1.0 - self.crpix[1];
        let xi = (self.cd[0][0] * dx + self.cd[0][1] * dy).to_radians();
        let eta = (self.cd[1][0] * dx + self.cd[1][1] * dy).to_radians();

        let ra0 = self.crval[0].to_radians();
        let (sin_d0, cos_d0) = self.crval[1].to_radians().sin_cos();

        let denom = cos_d0 - eta * sin_d0;
        let ra = ra0 + xi.atan2(denom);
        let dec = (sin_d0 + eta * cos_d0).atan2((xi * xi + denom * denom).sqrt());

        SkyPosition::new(ra.to_degrees().rem_euclid(360.0), dec.to_degrees())
    }

    /// 0-based pixel coordinate of a sky position.
    pub fn world_to_pixel(&self, position: &SkyPosition) -> Result<(f64, f64)> {
        let d_ra = (position.ra_deg - self.crval[0]).to_radians();
        let (sin_d, cos_d) = position.dec_deg.to_radians().sin_cos();
        let (sin_d0, cos_d0) = self.crval[1].to_radians().sin_cos();

        let cos_c = sin_d0 * sin_d + cos_d0 * cos_d * d_ra.cos();
        if cos_c <= 0.0 {
            return Err(WcsError::BehindTangentPlane);
        }

        let xi = (cos_d * d_ra.sin() / cos_c).to_degrees();
        let eta = ((cos_d0 * sin_d - sin_d0 * cos_d * d_ra.cos()) / cos_c).to_degrees();

        let dx = self.inverse[0][0] * xi + self.inverse[0][1] * eta;
        let dy = self.inverse[1][0] * xi + self.inverse[1][1] * eta;

        Ok((dx + self.crpix[0] - 1.0, dy + self.crpix[1] - 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const GALEX_SCALE: f64 = 1.5 / 3600.0;

    fn galex_like() -> TanWcs {
        TanWcs::from_cdelt(
            [150.1, 2.2],
            [1921.0, 1921.0],
            [-GALEX_SCALE, GALEX_SCALE],
            0.0,
        )
        .unwrap()
    }

    #[test]
    fn test_reference_pixel_maps_to_crval() {
        let wcs = galex_like();
        let pos = wcs.pixel_to_world(1920.0, 1920.0);
        assert_relative_eq!(pos.ra_deg, 150.1, epsilon = 1e-10);
        assert_relative_eq!(pos.dec_deg, 2.2, epsilon = 1e-10);

        let (x, y) = wcs.world_to_pixel(&SkyPosition::new(150.1, 2.2)).unwrap();
        assert_relative_eq!(x, 1920.0, epsilon = 1e-8);
        assert_relative_eq!(y, 1920.0, epsilon = 1e-8);
    }

    #[test]
    fn test_ra_decreases_along_x() {
        let wcs = galex_like();
        let left = wcs.pixel_to_world(1000.0, 1920.0);
        let right = wcs.pixel_to_world(1100.0, 1920.0);
        assert!(right.ra_deg < left.ra_deg);

        let up = wcs.pixel_to_world(1920.0, 2000.0);
        assert!(up.dec_deg > 2.2);
    }

    #[test]
    fn test_pixel_world_inverse() {
        let wcs = TanWcs::from_cdelt([10.0, -60.0], [100.0, 80.0], [-GALEX_SCALE, GALEX_SCALE], 12.0)
            .unwrap();
        for &(x, y) in &[(0.0, 0.0), (250.5, 17.0), (3000.0, 3500.0)] {
            let sky = wcs.pixel_to_world(x, y);
            let (bx, by) = wcs.world_to_pixel(&sky).unwrap();
            assert_relative_eq!(bx, x, epsilon = 1e-6);
            assert_relative_eq!(by, y, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_pixel_offsets_match_scale_near_centre() {
        let wcs = galex_like();
        let a = wcs.pixel_to_world(1920.0, 1920.0);
        let b = wcs.pixel_to_world(1920.0, 1930.0);
        assert_relative_eq!(a.separation_arcsec(&b), 15.0, max_relative = 1e-6);
    }

    #[test]
    fn test_far_side_is_rejected() {
        let wcs = galex_like();
        assert_eq!(
            wcs.world_to_pixel(&SkyPosition::new(330.1, -2.2)),
            Err(WcsError::BehindTangentPlane)
        );
    }

    #[test]
    fn test_singular_transform() {
        assert_eq!(
            TanWcs::from_cdelt([0.0, 0.0], [1.0, 1.0], [0.0, 1.0], 0.0),
            Err(WcsError::Singular)
        );
    }
}
