//! Image check: rates from sources detected directly on the GALEX
//! intensity maps, for fields where the catalogue is not trusted.

use std::path::Path;

use skyquery::galex::GalexClient;
use skyquery::HttpSession;
use uvit_math::calibration::cps_to_magnitude;
use uvit_math::selection::MAX_TABLE_ROWS;
use uvit_math::{Band, CatalogSource};

use crate::error::{PipelineError, Result};
use crate::image_proc::{brightest_detections, BlobDetector, Detection};
use crate::report::{note_fuv_absent, publish_band, table_file_name, BandTable};
use crate::shared_args::CheckContext;

use super::{download_maps, file_name, locate_tile, no_tiles, FieldImage};

/// Detections with a usable flux as magnitudes in `band`.
pub fn detected_sources(band: Band, detections: &[Detection]) -> Vec<CatalogSource> {
    detections
        .iter()
        .filter_map(|d| match cps_to_magnitude(band, d.flux) {
            Ok(magnitude) => Some(CatalogSource::new(d.position, magnitude)),
            Err(e) => {
                log::warn!("Dropping {} detection at {}: {}", band, d.position, e);
                None
            }
        })
        .collect()
}

fn measure(
    ctx: &CheckContext,
    band: Band,
    path: &Path,
    detector: &BlobDetector,
) -> Result<Vec<CatalogSource>> {
    let field = FieldImage::load(ctx, path)?;
    let detections = brightest_detections(&field.window, &field.map.wcs, detector, MAX_TABLE_ROWS);
    if detections.is_empty() {
        return Err(PipelineError::NoSources(path.to_path_buf()));
    }
    field.save_marked(ctx, &detections)?;
    Ok(detected_sources(band, &detections))
}

pub fn run(ctx: &CheckContext) -> Result<()> {
    let session = HttpSession::new(&ctx.config)?;
    let galex = GalexClient::new(&session, &ctx.config);

    let Some(products) = locate_tile(ctx, &galex, ctx.config.image_tile_radius_deg)? else {
        return no_tiles(ctx);
    };
    let maps = download_maps(ctx, &galex, &products)?;
    if maps.is_empty() {
        return Err(PipelineError::NoImages);
    }

    let detector = BlobDetector::default();
    let dir = &ctx.work_dir;

    let mut nuv_sources = None;
    if let Some(path) = maps.get(Band::Nuv) {
        let sources = measure(ctx, Band::Nuv, path, &detector)?;
        let table = BandTable::from_magnitudes(Band::Nuv, &sources)?;
        publish_band(dir, &table, &table_file_name(Band::Nuv, &file_name(path)))?;
        nuv_sources = Some((path, sources));
    }

    match (maps.get(Band::Fuv), nuv_sources) {
        (Some(path), _) => {
            let sources = measure(ctx, Band::Fuv, path, &detector)?;
            let table = BandTable::from_magnitudes(Band::Fuv, &sources)?;
            publish_band(dir, &table, &table_file_name(Band::Fuv, &file_name(path)))?;
        }
        (None, Some((nuv_path, sources))) => {
            note_fuv_absent(dir)?;
            let table = BandTable::fuv_from_nuv(&sources)?;
            publish_band(dir, &table, &table_file_name(Band::Fuv, &file_name(nuv_path)))?;
        }
        (None, None) => {}
    }
    Ok(())
}
