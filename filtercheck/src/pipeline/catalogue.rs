//! Catalogue check: rates from the GALEX merged catalogue of the first
//! tile, with the selected sources marked on the tile's intensity maps.

use skyquery::fits::McatTable;
use skyquery::galex::GalexClient;
use skyquery::HttpSession;
use uvit_math::Band;

use crate::error::{PipelineError, Result};
use crate::image_proc::forced_photometry;
use crate::report::{note_fuv_absent, publish_band, table_file_name};
use crate::shared_args::CheckContext;

use super::{
    download_catalogue, download_maps, file_name, locate_tile, no_tiles, CatalogueSelection,
    FieldImage,
};

pub fn run(ctx: &CheckContext) -> Result<()> {
    let session = HttpSession::new(&ctx.config)?;
    let galex = GalexClient::new(&session, &ctx.config);

    let Some(products) = locate_tile(ctx, &galex, ctx.config.catalogue_tile_radius_deg)? else {
        return no_tiles(ctx);
    };

    let catalogue = download_catalogue(ctx, &galex, &products)?;
    let catalogue_name = file_name(&catalogue);
    let mcat = McatTable::read(&catalogue)?;

    let selection = CatalogueSelection::select(ctx, &mcat)?;
    if selection.fuv_absent {
        note_fuv_absent(&ctx.work_dir)?;
    }
    let (nuv, fuv) = selection.tables()?;
    publish_band(&ctx.work_dir, &nuv, &table_file_name(Band::Nuv, &catalogue_name))?;
    publish_band(&ctx.work_dir, &fuv, &table_file_name(Band::Fuv, &catalogue_name))?;

    let maps = download_maps(ctx, &galex, &products)?;
    if maps.is_empty() {
        return Err(PipelineError::NoImages);
    }
    for band in [Band::Nuv, Band::Fuv] {
        if let Some(path) = maps.get(band) {
            mark_catalogue_sources(ctx, &selection, band, path)?;
        }
    }
    Ok(())
}

fn mark_catalogue_sources(
    ctx: &CheckContext,
    selection: &CatalogueSelection,
    band: Band,
    path: &std::path::Path,
) -> Result<()> {
    let field = FieldImage::load(ctx, path)?;
    let positions: Vec<_> = selection.sources(band).iter().map(|s| s.position).collect();
    let marked = forced_photometry(&field.window, &field.map.wcs, &positions)?;
    field.save_marked(ctx, &marked)?;
    Ok(())
}
