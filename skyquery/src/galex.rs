//! GALEX GR6 tile search on MAST.
//!
//! The tile list is an ASP.NET form. Every search first loads the form to
//! pick up a fresh `__VIEWSTATE`/`__EVENTVALIDATION` pair and the session
//! cookie, then posts the search with those values. The first tile of the
//! result grid links to a download page listing the tile products.

use std::path::{Path, PathBuf};

use reqwest::Url;
use uvit_math::Band;

use crate::config::ServiceConfig;
use crate::html;
use crate::http::{file_name_from_url, validate_gzip, HttpSession};
use crate::{Result, SkyQueryError};

/// Anchor id of the first tile in the search results grid.
pub const FIRST_TILE_LINK_ID: &str = "_ctl10_TileGrid_imgLink_0";

const CATALOGUE_SUFFIX: &str = "mcat.fits.gz";
const INTENSITY_MAP_SUFFIX: &str = "int.fits.gz";

/// Downloadable products of one tile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileProducts {
    /// Merged catalogue (`*-xd-mcat.fits.gz`) links.
    pub catalogues: Vec<String>,
    /// Intensity map (`*-fd-int.fits.gz`, `*-nd-int.fits.gz`) links.
    pub intensity_maps: Vec<String>,
}

/// Split the download page links into catalogues and intensity maps.
pub fn classify_products<I, S>(links: I) -> TileProducts
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut products = TileProducts::default();
    for link in links {
        let link = link.as_ref();
        if link.ends_with(CATALOGUE_SUFFIX) {
            products.catalogues.push(link.to_string());
        } else if link.ends_with(INTENSITY_MAP_SUFFIX) {
            products.intensity_maps.push(link.to_string());
        }
    }
    products
}

/// Detector of an intensity map from its file name, e.g. `..._0001-nd-int.fits.gz`.
pub fn detector_band(file_name: &str) -> Option<Band> {
    // detector letter is the 14th character from the end
    match file_name.chars().rev().nth(13)?.to_ascii_lowercase() {
        'f' => Some(Band::Fuv),
        'n' => Some(Band::Nuv),
        _ => None,
    }
}

/// Absolute URL for a link found on a MAST page. `base` is treated as a
/// directory whether or not it ends in `/`.
pub fn resolve_link(base: &str, href: &str) -> Result<String> {
    let directory = if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    };
    Url::parse(&directory)
        .and_then(|base| base.join(href.trim()))
        .map(String::from)
        .map_err(|e| SkyQueryError::parse("MAST", format!("{} against {}: {}", href, base, e)))
}

/// Search form payload built from the freshly scraped hidden fields.
pub fn build_search_form(
    hidden: &[(String, String)],
    ra: &str,
    dec: &str,
    radius_deg: f64,
) -> Result<Vec<(String, String)>> {
    let has_field = |name: &str| hidden.iter().any(|(n, _)| n == name);
    for required in ["__VIEWSTATE", "__EVENTVALIDATION"] {
        if !has_field(required) {
            return Err(SkyQueryError::parse(
                "MAST",
                format!("tile search form has no {}", required),
            ));
        }
    }

    let mut form: Vec<(String, String)> = hidden.to_vec();
    for event_field in ["__EVENTTARGET", "__EVENTARGUMENT"] {
        if !has_field(event_field) {
            form.push((event_field.to_string(), String::new()));
        }
    }

    let fields = [
        ("_ctl10:txtTargetName", String::new()),
        ("_ctl10:resolverDropList", "SIMBAD".to_string()),
        ("_ctl10:txtRadius", format!("{}", radius_deg)),
        ("_ctl10:txtRA", ra.replace(':', "+")),
        ("_ctl10:txtDec", dec.replace(':', "+")),
        ("_ctl10:btnSearch", "Search".to_string()),
    ];
    form.extend(fields.into_iter().map(|(k, v)| (k.to_string(), v)));
    Ok(form)
}

pub struct GalexClient<'a> {
    session: &'a HttpSession,
    config: &'a ServiceConfig,
}

impl<'a> GalexClient<'a> {
    pub fn new(session: &'a HttpSession, config: &'a ServiceConfig) -> Self {
        Self { session, config }
    }

    /// Download page URL of the first tile covering the target, if any.
    pub fn find_first_tile(&self, ra: &str, dec: &str, radius_deg: f64) -> Result<Option<String>> {
        let search_url = &self.config.mast_tile_search_url;

        let form_page = self.session.get_text(search_url)?;
        let hidden = html::hidden_inputs(&form_page);
        log::debug!("Scraped {} hidden fields from the MAST form", hidden.len());

        let form = build_search_form(&hidden, ra, dec, radius_deg)?;
        let results = self.session.post_form(search_url, &form, Some(search_url))?;

        html::href_by_id(&results, FIRST_TILE_LINK_ID)
            .map(|href| resolve_link(&self.config.mast_base_url, &href))
            .transpose()
    }

    pub fn tile_products(&self, tile_url: &str) -> Result<TileProducts> {
        let page = self.session.get_text(tile_url)?;
        let links = html::hrefs(&page)
            .into_iter()
            .filter_map(|href| match resolve_link(&self.config.mast_base_url, &href) {
                Ok(url) => Some(url),
                Err(e) => {
                    log::debug!("Skipping link: {}", e);
                    None
                }
            });
        let products = classify_products(links);
        log::info!(
            "Tile has {} catalogue(s) and {} intensity map(s)",
            products.catalogues.len(),
            products.intensity_maps.len()
        );
        Ok(products)
    }

    /// Download a gzipped FITS product into `dir` and check it decompresses.
    pub fn download_product(&self, url: &str, dir: &Path) -> Result<PathBuf> {
        let name = file_name_from_url(url)
            .ok_or_else(|| SkyQueryError::parse("MAST", format!("no file name in {}", url)))?;
        let path = dir.join(name);
        self.session.download(url, &path)?;
        validate_gzip(&path)?;
        Ok(path)
    }
}
