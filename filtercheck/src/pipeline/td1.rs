//! TD1 check: rates from the brightest TD1 source near the target.
//!
//! TD1 is too shallow to be trusted near the Galactic plane, so those
//! fields are refused.

use std::fs;

use skyquery::fits::Td1Catalogue;
use uvit_math::selection::brightest_td1_flux;
use uvit_math::Band;

use crate::error::{PipelineError, Result};
use crate::report::{publish_td1, Td1Table, GALACTIC_PLANE_FILE};
use crate::shared_args::CheckContext;

/// Publish the NUV and FUV TD1 tables for the target.
pub fn estimate(ctx: &CheckContext, catalogue: &Td1Catalogue) -> Result<()> {
    let radius = ctx.target.search_radius_arcsec();
    for band in [Band::Nuv, Band::Fuv] {
        let flux = brightest_td1_flux(&catalogue.sources(band), &ctx.target.position, radius);
        log::debug!("Brightest TD1 {} flux {:e}", band, flux);
        let table = Td1Table::new(band, flux)?;
        publish_td1(&ctx.work_dir, &table)?;
    }
    Ok(())
}

pub fn run(ctx: &CheckContext) -> Result<()> {
    let catalogue = Td1Catalogue::read(ctx.td1_catalogue_path())?;

    if ctx.target.position.is_on_galactic_plane() {
        let warning = PipelineError::GalacticPlane;
        fs::write(ctx.path(GALACTIC_PLANE_FILE), warning.to_string())?;
        return Err(warning);
    }
    estimate(ctx, &catalogue)
}
