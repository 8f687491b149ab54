//! VizieR check: rates from the GALEX GR6 source catalogues (II/312).

use skyquery::vizier::{VizierClient, VizierRow};
use skyquery::HttpSession;
use uvit_math::selection::{smallest_by, MAX_TABLE_ROWS};
use uvit_math::{Band, CatalogSource};

use crate::error::{PipelineError, Result};
use crate::report::{publish_band, table_file_name, BandTable};
use crate::shared_args::CheckContext;

const TABLE_STEM: &str = "vizier";

/// The brightest rows with a magnitude in `band`.
pub fn brightest_in_band(rows: &[VizierRow], band: Band) -> Vec<CatalogSource> {
    let sources: Vec<CatalogSource> = rows
        .iter()
        .filter_map(|row| {
            let magnitude = match band {
                Band::Fuv => row.fuv,
                Band::Nuv => row.nuv,
            };
            magnitude.map(|m| CatalogSource::new(row.position, m))
        })
        .collect();
    smallest_by(sources, MAX_TABLE_ROWS, |s| s.magnitude)
}

pub fn run(ctx: &CheckContext) -> Result<()> {
    let session = HttpSession::new(&ctx.config)?;
    let vizier = VizierClient::new(&session, &ctx.config);

    let rows = vizier.cone_search(&ctx.target.position, ctx.target.search_radius_arcsec())?;
    if rows.is_empty() {
        return Err(PipelineError::NoCatalogue);
    }

    for band in [Band::Fuv, Band::Nuv] {
        let sources = brightest_in_band(&rows, band);
        let table = BandTable::from_magnitudes(band, &sources)?;
        publish_band(&ctx.work_dir, &table, &table_file_name(band, TABLE_STEM))?;
    }
    Ok(())
}
