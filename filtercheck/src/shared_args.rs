use clap::Args;
use std::path::{Path, PathBuf};

use skyquery::ServiceConfig;
use uvit_math::{Instrument, SkyPosition};

use crate::error::Result;

/// Arguments common to every check: `<instrument> <RA> <DEC> [<working_dir>]`
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Payload the field is checked for: uvit, sxt, czti or laxpc
    pub instrument: Instrument,

    /// Right ascension, HH:MM:SS.s
    #[arg(allow_hyphen_values = true)]
    pub ra: String,

    /// Declination, ±DD:MM:SS.s
    #[arg(allow_hyphen_values = true)]
    pub dec: String,

    /// Directory for downloads and reports (defaults to the current directory)
    pub working_dir: Option<PathBuf>,

    /// JSON file overriding the service endpoints
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl TargetArgs {
    pub fn work_dir(&self) -> PathBuf {
        self.working_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// The field being checked, as typed by the user and as parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub instrument: Instrument,
    pub ra: String,
    pub dec: String,
    pub position: SkyPosition,
}

impl Target {
    pub fn parse(instrument: Instrument, ra: &str, dec: &str) -> Result<Self> {
        let position = SkyPosition::from_sexagesimal(ra, dec)?;
        Ok(Self {
            instrument,
            ra: ra.trim().to_string(),
            dec: dec.trim().to_string(),
            position,
        })
    }

    /// Catalogue search radius for this instrument, arcsec.
    pub fn search_radius_arcsec(&self) -> f64 {
        self.instrument.search_radius_arcsec()
    }
}

/// Everything a check needs besides network access.
#[derive(Debug, Clone)]
pub struct CheckContext {
    pub target: Target,
    pub config: ServiceConfig,
    pub work_dir: PathBuf,
}

impl CheckContext {
    pub fn new(target: Target, config: ServiceConfig, work_dir: &Path) -> Self {
        Self {
            target,
            config,
            work_dir: work_dir.to_path_buf(),
        }
    }

    /// Path of an output or download inside the working directory.
    pub fn path(&self, name: &str) -> PathBuf {
        self.work_dir.join(name)
    }

    pub fn td1_catalogue_path(&self) -> PathBuf {
        self.path(&self.config.td1_catalogue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        target: TargetArgs,
    }

    #[test]
    fn test_negative_declination_is_positional() {
        let cli = TestCli::parse_from(["gaia", "uvit", "12:12:12", "-12:12:12"]);
        assert_eq!(cli.target.instrument, Instrument::Uvit);
        assert_eq!(cli.target.dec, "-12:12:12");
        assert_eq!(cli.target.work_dir(), PathBuf::from("."));
        assert!(!cli.target.verbose);
    }

    #[test]
    fn test_working_dir_and_flags() {
        let cli = TestCli::parse_from([
            "gaia",
            "--verbose",
            "sxt",
            "07:36:51.396",
            "+65:36:09.17",
            "/tmp/field",
            "--config",
            "services.json",
        ]);
        assert_eq!(cli.target.instrument, Instrument::Sxt);
        assert_eq!(cli.target.work_dir(), PathBuf::from("/tmp/field"));
        assert_eq!(cli.target.config, Some(PathBuf::from("services.json")));
        assert!(cli.target.verbose);
    }

    #[test]
    fn test_unknown_instrument_rejected() {
        assert!(TestCli::try_parse_from(["gaia", "hubble", "1:2:3", "4:5:6"]).is_err());
    }

    #[test]
    fn test_target_parse() {
        let target = Target::parse(Instrument::Czti, "12:00:00", "-30:00:00").unwrap();
        assert_eq!(target.position.ra_deg, 180.0);
        assert_eq!(target.position.dec_deg, -30.0);
        assert_eq!(target.search_radius_arcsec(), 1680.0);
        assert!(Target::parse(Instrument::Uvit, "12:00", "-30:00:00").is_err());
    }

    #[test]
    fn test_context_paths() {
        let target = Target::parse(Instrument::Uvit, "12:00:00", "10:00:00").unwrap();
        let ctx = CheckContext::new(target, ServiceConfig::default(), Path::new("/data/run"));
        assert_eq!(ctx.path("error.txt"), PathBuf::from("/data/run/error.txt"));
        assert_eq!(
            ctx.td1_catalogue_path(),
            PathBuf::from("/data/run/td1_catalogue.fits")
        );
    }
}
