//! Merged check: catalogue rates cross-checked against forced photometry on
//! the intensity maps.
//!
//! The catalogue is trusted unless an image magnitude is more than
//! [`MAGNITUDE_DIFF_LIMIT`] fainter than its catalogue magnitude, or a source
//! is wider than [`FWHM_LIMIT_DEG`]; both point at a saturated or blended
//! catalogue entry. Without GALEX coverage the check falls back to TD1.

use std::path::Path;

use skyquery::fits::{McatTable, Td1Catalogue};
use skyquery::galex::GalexClient;
use skyquery::HttpSession;
use uvit_math::calibration::cps_to_magnitude;
use uvit_math::{Band, CatalogSource};

use crate::error::{PipelineError, Result};
use crate::image_proc::forced_photometry;
use crate::report::{
    note_fuv_absent, publish_band, table_file_name, write_zero_tiles, BandTable,
    ZERO_TILES_TD1_FALLBACK,
};
use crate::shared_args::CheckContext;

use super::{
    download_catalogue, download_maps, file_name, locate_tile, td1, BandMaps, CatalogueSelection,
    FieldImage,
};

pub const MAGNITUDE_DIFF_LIMIT: f64 = 1.2;
pub const FWHM_LIMIT_DEG: f64 = 0.0043;

/// Whether the image photometry should replace the catalogue magnitudes.
pub fn prefer_image(catalogue: &[CatalogSource], image_magnitudes: &[f64]) -> bool {
    let fainter_on_image = catalogue
        .iter()
        .zip(image_magnitudes)
        .any(|(source, image)| image - source.magnitude > MAGNITUDE_DIFF_LIMIT);
    let extended = catalogue
        .iter()
        .any(|source| source.fwhm_deg.is_some_and(|fwhm| fwhm > FWHM_LIMIT_DEG));
    fainter_on_image || extended
}

/// Image magnitudes at the catalogue positions, `None` where the box is empty.
fn forced_magnitudes(
    ctx: &CheckContext,
    band: Band,
    path: &Path,
    sources: &[CatalogSource],
) -> Result<Vec<Option<f64>>> {
    let field = FieldImage::load(ctx, path)?;
    let positions: Vec<_> = sources.iter().map(|s| s.position).collect();
    let measured = forced_photometry(&field.window, &field.map.wcs, &positions)?;
    field.save_marked(ctx, &measured)?;

    Ok(measured
        .iter()
        .map(|d| cps_to_magnitude(band, d.flux).ok())
        .collect())
}

/// Catalogue sources with their magnitudes replaced, if every one was measured.
fn with_magnitudes(sources: &[CatalogSource], magnitudes: &[Option<f64>]) -> Option<Vec<CatalogSource>> {
    sources
        .iter()
        .zip(magnitudes)
        .map(|(source, magnitude)| {
            magnitude.map(|m| CatalogSource {
                magnitude: m,
                ..*source
            })
        })
        .collect()
}

/// Rate tables from the image photometry.
struct ImageTables {
    nuv_magnitudes: Vec<f64>,
    nuv: BandTable,
    fuv: BandTable,
}

fn image_tables(
    ctx: &CheckContext,
    maps: &BandMaps,
    selection: &CatalogueSelection,
) -> Result<Option<ImageTables>> {
    let Some(nuv_map) = maps.get(Band::Nuv) else {
        log::info!("No NUV intensity map, keeping catalogue magnitudes");
        return Ok(None);
    };

    let nuv_measured = forced_magnitudes(ctx, Band::Nuv, nuv_map, &selection.nuv)?;
    let Some(nuv_sources) = with_magnitudes(&selection.nuv, &nuv_measured) else {
        log::warn!("Some NUV sources have no flux on the image, keeping catalogue magnitudes");
        return Ok(None);
    };

    let fuv = match maps.get(Band::Fuv) {
        Some(fuv_map) => {
            let fuv_measured = forced_magnitudes(ctx, Band::Fuv, fuv_map, &selection.fuv)?;
            match with_magnitudes(&selection.fuv, &fuv_measured) {
                Some(fuv_sources) => BandTable::from_magnitudes(Band::Fuv, &fuv_sources)?,
                None => {
                    log::warn!("Some FUV sources have no flux on the image, keeping catalogue magnitudes");
                    return Ok(None);
                }
            }
        }
        None => BandTable::fuv_from_nuv(&nuv_sources)?,
    };

    Ok(Some(ImageTables {
        nuv_magnitudes: nuv_sources.iter().map(|s| s.magnitude).collect(),
        nuv: BandTable::from_magnitudes(Band::Nuv, &nuv_sources)?,
        fuv,
    }))
}

/// TD1 rates for a field GALEX never observed. The check still fails so
/// that the missing GALEX coverage shows in the exit status.
fn td1_fallback(ctx: &CheckContext) -> Result<()> {
    write_zero_tiles(&ctx.work_dir, ZERO_TILES_TD1_FALLBACK)?;
    if ctx.target.position.is_on_galactic_plane() {
        println!("\n\n{}\n\n", ZERO_TILES_TD1_FALLBACK);
        return Err(PipelineError::GalacticPlane);
    }
    let catalogue = Td1Catalogue::read(ctx.td1_catalogue_path())?;
    td1::estimate(ctx, &catalogue)?;
    Err(PipelineError::ZeroTiles(ZERO_TILES_TD1_FALLBACK.to_string()))
}

pub fn run(ctx: &CheckContext) -> Result<()> {
    let session = HttpSession::new(&ctx.config)?;
    let galex = GalexClient::new(&session, &ctx.config);

    let Some(products) = locate_tile(ctx, &galex, ctx.config.catalogue_tile_radius_deg)? else {
        return td1_fallback(ctx);
    };

    let catalogue = download_catalogue(ctx, &galex, &products)?;
    let catalogue_name = file_name(&catalogue);
    let mcat = McatTable::read(&catalogue)?;

    let selection = CatalogueSelection::select(ctx, &mcat)?;
    if selection.fuv_absent {
        note_fuv_absent(&ctx.work_dir)?;
    }
    let (catalogue_nuv, catalogue_fuv) = selection.tables()?;

    let maps = download_maps(ctx, &galex, &products)?;
    let (nuv, fuv) = match image_tables(ctx, &maps, &selection)? {
        Some(image) if prefer_image(&selection.nuv, &image.nuv_magnitudes) => {
            log::info!("Catalogue and image magnitudes disagree, using image photometry");
            (image.nuv, image.fuv)
        }
        _ => (catalogue_nuv, catalogue_fuv),
    };

    publish_band(&ctx.work_dir, &nuv, &table_file_name(Band::Nuv, &catalogue_name))?;
    publish_band(&ctx.work_dir, &fuv, &table_file_name(Band::Fuv, &catalogue_name))?;
    Ok(())
}
