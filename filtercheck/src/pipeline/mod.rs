//! The filter checks, one module per binary.
//!
//! Every check takes a prepared [`CheckContext`] and returns once its
//! tables and safety declarations have been printed and written to the
//! working directory. Helpers here cover the GALEX steps the checks share:
//! tile lookup, product downloads and intensity map windows.

pub mod catalogue;
pub mod image;
pub mod merged;
pub mod td1;
pub mod vizier;

use std::path::{Path, PathBuf};

use skyquery::fits::{IntensityMap, McatTable};
use skyquery::galex::{detector_band, GalexClient, TileProducts};
use skyquery::http::file_name_from_url;
use uvit_math::selection::{brightest_catalog_sources, MAX_TABLE_ROWS};
use uvit_math::{Band, CatalogSource};

use crate::error::{PipelineError, Result};
use crate::image_proc::{field_window, Detection, Window};
use crate::render::{png_name, render_marked};
use crate::report::{write_zero_tiles, zero_tiles_notice, BandTable};
use crate::shared_args::CheckContext;

/// Products of the first GALEX tile covering the target, or `None` when no
/// tile does.
pub fn locate_tile(
    ctx: &CheckContext,
    galex: &GalexClient,
    radius_deg: f64,
) -> Result<Option<TileProducts>> {
    let target = &ctx.target;
    match galex.find_first_tile(&target.ra, &target.dec, radius_deg)? {
        Some(tile_url) => {
            log::info!("Found GALEX tile {}", tile_url);
            Ok(Some(galex.tile_products(&tile_url)?))
        }
        None => {
            log::warn!("No GALEX tile within {} deg of the target", radius_deg);
            Ok(None)
        }
    }
}

/// Record that no tile covers the target and fail the check.
pub fn no_tiles(ctx: &CheckContext) -> Result<()> {
    let notice = zero_tiles_notice(ctx.target.position.is_on_galactic_plane());
    write_zero_tiles(&ctx.work_dir, &notice)?;
    Err(PipelineError::ZeroTiles(notice))
}

/// Download the first merged catalogue of the tile.
pub fn download_catalogue(
    ctx: &CheckContext,
    galex: &GalexClient,
    products: &TileProducts,
) -> Result<PathBuf> {
    let url = products
        .catalogues
        .first()
        .ok_or(PipelineError::NoCatalogue)?;
    Ok(galex.download_product(url, &ctx.work_dir)?)
}

/// Downloaded intensity maps by detector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BandMaps {
    pub nuv: Option<PathBuf>,
    pub fuv: Option<PathBuf>,
}

impl BandMaps {
    /// Sort map paths by the detector letter in their names.
    pub fn from_paths<I>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut maps = Self::default();
        for path in paths {
            let name = file_name(&path);
            match detector_band(&name) {
                Some(Band::Nuv) => maps.nuv = Some(path),
                Some(Band::Fuv) => maps.fuv = Some(path),
                None => {
                    log::error!("Unrecognised detector in {}", name);
                    return Err(PipelineError::UnknownFilter(name));
                }
            }
        }
        Ok(maps)
    }

    pub fn is_empty(&self) -> bool {
        self.nuv.is_none() && self.fuv.is_none()
    }

    pub fn get(&self, band: Band) -> Option<&Path> {
        match band {
            Band::Nuv => self.nuv.as_deref(),
            Band::Fuv => self.fuv.as_deref(),
        }
    }
}

/// Download every intensity map of the tile.
pub fn download_maps(
    ctx: &CheckContext,
    galex: &GalexClient,
    products: &TileProducts,
) -> Result<BandMaps> {
    // the detector is checked before anything is fetched
    for url in &products.intensity_maps {
        let name = file_name_from_url(url).unwrap_or_default();
        if detector_band(&name).is_none() {
            return Err(PipelineError::UnknownFilter(name));
        }
    }
    let paths = products
        .intensity_maps
        .iter()
        .map(|url| galex.download_product(url, &ctx.work_dir))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    BandMaps::from_paths(paths)
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// An intensity map read from disk with the masked window around the target.
pub struct FieldImage {
    pub path: PathBuf,
    pub map: IntensityMap,
    pub window: Window,
}

impl FieldImage {
    pub fn load(ctx: &CheckContext, path: &Path) -> Result<Self> {
        let map = IntensityMap::read(path)?;
        let radius = ctx.target.instrument.image_window_px();
        let window = field_window(&map.data, &map.wcs, &ctx.target.position, radius)?;
        Ok(Self {
            path: path.to_path_buf(),
            map,
            window,
        })
    }

    /// Save the window as a PNG next to the map with `detections` marked.
    pub fn save_marked(&self, ctx: &CheckContext, detections: &[Detection]) -> Result<PathBuf> {
        let markers: Vec<(f64, f64)> = detections.iter().map(|d| (d.x, d.y)).collect();
        let png = ctx.path(&png_name(&file_name(&self.path)));
        render_marked(&self.window, &markers, &png)
    }
}

/// The brightest catalogue sources per band.
///
/// When the tile has no FUV exposure the NUV sources stand in for FUV.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogueSelection {
    pub nuv: Vec<CatalogSource>,
    pub fuv: Vec<CatalogSource>,
    pub fuv_absent: bool,
}

impl CatalogueSelection {
    pub fn select(ctx: &CheckContext, mcat: &McatTable) -> Result<Self> {
        let target = &ctx.target.position;
        let radius = ctx.target.search_radius_arcsec();

        let nuv = brightest_catalog_sources(mcat.nuv_sources(), target, radius, MAX_TABLE_ROWS);
        let fuv_absent = mcat.fuv_absent();
        let fuv = if fuv_absent {
            nuv.clone()
        } else {
            brightest_catalog_sources(mcat.fuv_sources(), target, radius, MAX_TABLE_ROWS)
        };

        if nuv.is_empty() {
            return Err(PipelineError::EmptySelection(radius));
        }
        log::info!("Selected {} NUV and {} FUV sources", nuv.len(), fuv.len());
        Ok(Self {
            nuv,
            fuv,
            fuv_absent,
        })
    }

    pub fn sources(&self, band: Band) -> &[CatalogSource] {
        match band {
            Band::Nuv => &self.nuv,
            Band::Fuv => &self.fuv,
        }
    }

    /// NUV and FUV count rate tables from the catalogue magnitudes.
    pub fn tables(&self) -> Result<(BandTable, BandTable)> {
        let nuv = BandTable::from_magnitudes(Band::Nuv, &self.nuv)?;
        let fuv = if self.fuv_absent {
            BandTable::fuv_from_nuv(&self.nuv)?
        } else {
            BandTable::from_magnitudes(Band::Fuv, &self.fuv)?
        };
        Ok((nuv, fuv))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;
    use rstest::rstest;
    use skyquery::ServiceConfig;
    use tempfile::TempDir;
    use uvit_math::Instrument;

    use crate::image_proc::forced_photometry;
    use crate::shared_args::Target;
    use crate::test_fixtures::write_intensity_map;

    fn context() -> CheckContext {
        let target = Target::parse(Instrument::Uvit, "07:36:51.396", "+65:36:09.17").unwrap();
        CheckContext::new(target, ServiceConfig::default(), Path::new("/tmp"))
    }

    #[test]
    fn test_band_maps_from_paths() {
        let maps = BandMaps::from_paths(vec![
            PathBuf::from("/w/MISDR1_24278_0266_0001-fd-int.fits.gz"),
            PathBuf::from("/w/MISDR1_24278_0266_0001-nd-int.fits.gz"),
        ])
        .unwrap();
        assert_eq!(
            maps.get(Band::Nuv),
            Some(Path::new("/w/MISDR1_24278_0266_0001-nd-int.fits.gz"))
        );
        assert!(maps.fuv.is_some());
        assert!(!maps.is_empty());
    }

    #[rstest]
    #[case("AIS_101_0001_sg24-xd-int.fits.gz")]
    #[case("short")]
    fn test_band_maps_unknown_detector(#[case] name: &str) {
        let result = BandMaps::from_paths(vec![PathBuf::from(name)]);
        assert!(matches!(result, Err(PipelineError::UnknownFilter(n)) if n == name));
    }

    #[test]
    fn test_empty_band_maps() {
        assert!(BandMaps::from_paths(Vec::new()).unwrap().is_empty());
    }

    fn mcat(fuv_mag: Vec<f64>) -> McatTable {
        let centre = context().target.position;
        McatTable {
            ra: vec![centre.ra_deg, centre.ra_deg + 0.01, centre.ra_deg, 10.0],
            dec: vec![centre.dec_deg, centre.dec_deg, centre.dec_deg + 0.01, 10.0],
            nuv_mag: vec![17.0, 14.0, -999.0, 9.0],
            fuv_mag,
            nuv_fwhm: vec![0.001, 0.002, 0.001, 0.001],
        }
    }

    #[test]
    fn test_selection_with_fuv() {
        let ctx = context();
        let selection = CatalogueSelection::select(&ctx, &mcat(vec![19.0, 18.0, 16.0, 12.0])).unwrap();
        assert!(!selection.fuv_absent);
        // the 9 mag NUV source at (10, 10) is far outside the field
        assert_eq!(
            selection.nuv.iter().map(|s| s.magnitude).collect::<Vec<_>>(),
            vec![14.0, 17.0]
        );
        assert_eq!(selection.nuv[0].fwhm_deg, Some(0.002));
        assert_eq!(
            selection.sources(Band::Fuv).iter().map(|s| s.magnitude).collect::<Vec<_>>(),
            vec![16.0, 18.0, 19.0]
        );

        let (nuv, fuv) = selection.tables().unwrap();
        assert_eq!(nuv.rows.len(), 2);
        assert_eq!(fuv.magnitudes(), vec![16.0, 18.0, 19.0]);
    }

    #[test]
    fn test_selection_without_fuv() {
        let ctx = context();
        let selection = CatalogueSelection::select(&ctx, &mcat(vec![-999.0; 4])).unwrap();
        assert!(selection.fuv_absent);
        assert_eq!(selection.fuv, selection.nuv);

        let (_, fuv) = selection.tables().unwrap();
        assert_eq!(fuv.band, Band::Fuv);
        assert_eq!(fuv.magnitudes(), vec![14.0, 17.0]);
    }

    #[test]
    fn test_selection_without_nearby_sources_fails() {
        let ctx = context();
        let far = McatTable {
            ra: vec![10.0, 10.01],
            dec: vec![10.0, 10.0],
            nuv_mag: vec![9.0, 12.0],
            fuv_mag: vec![10.0, 13.0],
            nuv_fwhm: vec![0.001, 0.001],
        };
        assert!(matches!(
            CatalogueSelection::select(&ctx, &far),
            Err(PipelineError::EmptySelection(r)) if r == 1200.0
        ));

        let unusable = McatTable {
            nuv_mag: vec![-999.0, 23.5, -999.0, -999.0],
            ..mcat(vec![19.0, 18.0, 16.0, 12.0])
        };
        assert!(CatalogueSelection::select(&ctx, &unusable).is_err());
    }

    #[test]
    fn test_field_image_forced_photometry() {
        let dir = TempDir::new().unwrap();
        let ctx = CheckContext::new(context().target, ServiceConfig::default(), dir.path());
        let centre = ctx.target.position;

        let mut data = Array2::<f64>::zeros((81, 81));
        data[[40, 40]] = 6.0;
        data[[40, 41]] = 2.0;
        data[[20, 60]] = 3.0;
        let path = dir.path().join("MISDR1_24278_0266_0001-nd-int.fits.gz");
        write_intensity_map(&path, &data, [centre.ra_deg, centre.dec_deg]);

        let field = FieldImage::load(&ctx, &path).unwrap();
        let radius = ctx.target.instrument.image_window_px();
        assert_eq!(field.window.data.dim(), (2 * radius, 2 * radius));

        let other = field.map.wcs.pixel_to_world(60.0, 20.0);
        let measured =
            forced_photometry(&field.window, &field.map.wcs, &[centre, other]).unwrap();
        assert_relative_eq!(measured[0].flux, 8.0, epsilon = 1e-9);
        assert_relative_eq!(measured[1].flux, 3.0, epsilon = 1e-9);
        assert_relative_eq!(measured[1].position.ra_deg, other.ra_deg, epsilon = 1e-9);
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name(Path::new("/a/b/x-nd-int.fits.gz")), "x-nd-int.fits.gz");
    }
}
