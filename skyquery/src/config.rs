//! Service endpoints and request parameters.
//!
//! Defaults point at the public services. A JSON file can override any
//! subset of fields, e.g. to use a VizieR mirror:
//!
//! ```json
//! { "vizier_url": "https://vizier.iucaa.in/viz-bin/asu-tsv" }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// MAST GALEX GR6 tile search form.
    pub mast_tile_search_url: String,
    /// Prefix joined with the relative tile links returned by the search.
    pub mast_base_url: String,
    /// Tile search radius for catalogue based checks, degrees.
    pub catalogue_tile_radius_deg: f64,
    /// Tile search radius for image only checks, degrees.
    pub image_tile_radius_deg: f64,

    /// VizieR ASU-TSV endpoint.
    pub vizier_url: String,
    /// VizieR tables searched and stacked.
    pub vizier_tables: Vec<String>,

    /// UVIT bright star finder landing page, used as a liveness check.
    pub bswt_page_url: String,
    pub bswt_url: String,
    pub etc_url: String,

    /// Local TD1 catalogue, relative to the working directory.
    pub td1_catalogue: String,

    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            mast_tile_search_url: "http://galex.stsci.edu/GR6/?page=tilelist&survey=allsurveys"
                .to_string(),
            mast_base_url: "http://galex.stsci.edu/GR6".to_string(),
            catalogue_tile_radius_deg: 0.001,
            image_tile_radius_deg: 0.0001,
            vizier_url: "https://vizier.cds.unistra.fr/viz-bin/asu-tsv".to_string(),
            vizier_tables: vec!["II/312/ais".to_string(), "II/312/mis".to_string()],
            bswt_page_url: "https://uvit.iiap.res.in/Software/bswt".to_string(),
            bswt_url: "https://uvit.iiap.res.in/cgi-bin/bswt.pl".to_string(),
            etc_url: "https://uvit.iiap.res.in/cgi-bin/etc.pl".to_string(),
            td1_catalogue: "td1_catalogue.fits".to_string(),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:45.0) Gecko/20100101 Firefox/45.0"
                .to_string(),
            timeout_secs: 300,
        }
    }
}

impl ServiceConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, std::io::Error> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    /// Defaults, or the file at `path` layered over them.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, std::io::Error> {
        match path {
            Some(p) => {
                log::info!("Loading service configuration from {}", p.display());
                Self::load_from_file(p)
            }
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_override_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("services.json");
        std::fs::write(&path, r#"{ "timeout_secs": 30, "vizier_tables": ["II/312/ais"] }"#)
            .unwrap();

        let config = ServiceConfig::load_from_file(&path).unwrap();
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.vizier_tables, vec!["II/312/ais"]);
        assert_eq!(config.etc_url, ServiceConfig::default().etc_url);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("services.json");
        let mut config = ServiceConfig::default();
        config.catalogue_tile_radius_deg = 0.4;
        config.save_to_file(&path).unwrap();

        assert_eq!(ServiceConfig::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_json_is_invalid_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = ServiceConfig::load_from_file(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_no_path_gives_defaults() {
        assert_eq!(
            ServiceConfig::load_or_default(None).unwrap(),
            ServiceConfig::default()
        );
    }
}
