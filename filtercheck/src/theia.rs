//! VIS filter check.
//!
//! The UVIT bright star finder (BSWT) lists the bright stars around the
//! pointing. The seven brightest are typed from their B-V colour and run
//! through the exposure time calculator, whose VIS count rates decide which
//! VIS filters are safe. Close pairs of bright stars are flagged because the
//! ETC treats every star as isolated.

use std::fs;

use skyquery::uvit_web::{bswt_coords, BswtStar, UvitWebClient, VisRates};
use skyquery::HttpSession;
use uvit_math::safety::{classify_vis, SafetyVerdict};
use uvit_math::selection::{close_pairs, MAX_VIS_ROWS, PROXIMITY_ARCSEC};
use uvit_math::spectral::{spectral_type, split_type};
use uvit_math::Instrument;

use crate::error::{PipelineError, Result};
use crate::shared_args::CheckContext;

pub const TABLE_HEADER: &str = "ra_hms\tdec_dms\tmag\tB-V\tSpecType\tVIS3\tVIS2\tVIS1\tND1\tBK7";

/// A bright star with its ETC rates.
#[derive(Debug, Clone, PartialEq)]
pub struct VisStar {
    pub star: BswtStar,
    pub spectral_type: &'static str,
    pub rates: VisRates,
}

impl VisStar {
    fn row(&self) -> String {
        let mut cells = vec![
            self.star.position.ra_hms(),
            self.star.position.dec_dms(),
            number(self.star.magnitude),
            number(self.star.b_minus_v),
            self.spectral_type.to_string(),
        ];
        cells.extend(self.rates.as_row().into_iter().map(number));
        cells.join("\t")
    }
}

// shortest form that keeps a decimal point, `14000.0` rather than `14000`
fn number(value: f64) -> String {
    format!("{:?}", value)
}

/// The brightest stars by V magnitude, ties broken by colour then position.
pub fn brightest_stars(mut stars: Vec<BswtStar>) -> Vec<BswtStar> {
    stars.sort_by(|a, b| {
        a.magnitude
            .total_cmp(&b.magnitude)
            .then(a.b_minus_v.total_cmp(&b.b_minus_v))
            .then(a.position.ra_deg.total_cmp(&b.position.ra_deg))
            .then(a.position.dec_deg.total_cmp(&b.position.dec_deg))
    });
    stars.truncate(MAX_VIS_ROWS);
    stars
}

/// `uvit_RA_12:12:12_DEC_-12:12:12.dat`
pub fn report_file_name(instrument: Instrument, ra: &str, dec: &str) -> String {
    format!("{}_RA_{}_DEC_{}.dat", instrument, ra, dec)
}

/// The result of a VIS check.
#[derive(Debug, Clone, PartialEq)]
pub struct VisReport {
    pub stars: Vec<VisStar>,
    pub verdict: SafetyVerdict,
    pub close_pairs: usize,
}

impl VisReport {
    pub fn new(stars: Vec<VisStar>) -> Self {
        let rows: Vec<Vec<f64>> = stars.iter().map(|s| s.rates.as_row()).collect();
        let positions: Vec<_> = stars.iter().map(|s| s.star.position).collect();
        Self {
            verdict: classify_vis(&rows),
            close_pairs: close_pairs(&positions, PROXIMITY_ARCSEC),
            stars,
        }
    }

    pub fn rows(&self) -> Vec<String> {
        self.stars.iter().map(VisStar::row).collect()
    }

    pub fn proximity_warning(&self) -> Option<String> {
        (self.close_pairs > 0).then(|| {
            format!(
                "\nWARNING! there exists {} pair of stars which are closer than\n{} arcseconds!",
                self.close_pairs, PROXIMITY_ARCSEC
            )
        })
    }

    /// Contents of the `.dat` report.
    pub fn to_dat(&self) -> String {
        let mut out = format!("#{}\n", TABLE_HEADER);
        for row in self.rows() {
            out.push_str(&row);
            out.push('\n');
        }
        out.push_str(&format!("\n\n{}\n", self.verdict.declaration()));
        if let Some(warning) = self.proximity_warning() {
            out.push_str(&warning);
        }
        out
    }

    pub fn print(&self, instrument: Instrument, coords: &str) {
        println!("\nPayload: {}, Coordinates: {}\n", instrument, coords);
        println!("\n\nTable of results");
        println!("#########################\n");
        println!("{}\n", TABLE_HEADER);
        for row in self.rows() {
            println!("{}", row);
        }
        println!("\n\n{}\n", self.verdict.declaration());
        if let Some(warning) = self.proximity_warning() {
            println!("{}", warning);
        }
    }
}

fn with_rates(web: &UvitWebClient, star: BswtStar) -> Result<VisStar> {
    let sp = spectral_type(star.b_minus_v).ok_or(PipelineError::SpectralType(star.b_minus_v))?;
    let (class, subclass) = split_type(sp).ok_or(PipelineError::SpectralType(star.b_minus_v))?;
    let rates = web.vis_rates(star.magnitude, class, subclass)?;
    Ok(VisStar {
        star,
        spectral_type: sp,
        rates,
    })
}

pub fn run(ctx: &CheckContext) -> Result<()> {
    let session = HttpSession::new(&ctx.config)?;
    let web = UvitWebClient::new(&session, &ctx.config);
    web.check_alive()?;

    let target = &ctx.target;
    let listed = web.bright_stars(&target.ra, &target.dec, target.instrument.name())?;
    if listed.is_empty() {
        return Err(PipelineError::NoStars);
    }

    let stars = brightest_stars(listed)
        .into_iter()
        .map(|star| with_rates(&web, star))
        .collect::<Result<Vec<_>>>()?;

    let report = VisReport::new(stars);
    report.print(target.instrument, &bswt_coords(&target.ra, &target.dec));

    let name = report_file_name(target.instrument, &target.ra, &target.dec);
    fs::write(ctx.path(&name), report.to_dat())?;
    log::info!("Wrote {}", name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uvit_math::SkyPosition;

    fn star(ra: f64, dec: f64, magnitude: f64) -> BswtStar {
        BswtStar {
            position: SkyPosition::new(ra, dec),
            magnitude,
            b_minus_v: 0.45,
        }
    }

    fn vis(star: BswtStar, vis3: f64) -> VisStar {
        VisStar {
            star,
            spectral_type: "F5",
            rates: VisRates {
                vis3,
                vis2: 523.1,
                vis1: 80.0,
                nd1: 12.5,
                bk7: 6000.0,
            },
        }
    }

    #[test]
    fn test_brightest_stars_keeps_seven() {
        let stars: Vec<_> = (0..10).map(|i| star(10.0 + i as f64, 5.0, 9.0 - i as f64 * 0.1)).collect();
        let kept = brightest_stars(stars);
        assert_eq!(kept.len(), MAX_VIS_ROWS);
        assert!(kept.windows(2).all(|w| w[0].magnitude <= w[1].magnitude));
        assert_eq!(kept[0].position.ra_deg, 19.0);
    }

    #[test]
    fn test_report_verdict_and_rows() {
        let report = VisReport::new(vec![
            vis(star(183.0512, -12.2011, 7.12), 14000.0),
            vis(star(183.2, -12.4, 8.9), 300.0),
        ]);
        assert_eq!(report.verdict.declaration(), "Safe filters: ['VIS2', 'VIS1', 'ND1']");
        assert_eq!(report.close_pairs, 0);
        assert!(report.proximity_warning().is_none());

        let row = &report.rows()[0];
        let cells: Vec<&str> = row.split('\t').collect();
        assert_eq!(cells.len(), 10);
        assert_eq!(&cells[2..], &["7.12", "0.45", "F5", "14000.0", "523.1", "80.0", "12.5", "6000.0"]);
    }

    #[test]
    fn test_close_pair_warning_in_dat() {
        let report = VisReport::new(vec![
            vis(star(100.0, 20.0, 7.0), 10.0),
            vis(star(100.0, 20.001, 7.5), 10.0),
        ]);
        assert_eq!(report.close_pairs, 1);
        let dat = report.to_dat();
        assert!(dat.starts_with("#ra_hms\tdec_dms\tmag\tB-V\tSpecType\tVIS3\tVIS2\tVIS1\tND1\tBK7\n"));
        assert!(dat.contains("\n\nSafe filters: ['VIS3', 'VIS2', 'VIS1', 'ND1']\n"));
        assert!(dat.ends_with("closer than\n10 arcseconds!"));
    }

    #[test]
    fn test_report_file_name() {
        assert_eq!(
            report_file_name(Instrument::Uvit, "12:12:12", "-12:12:12"),
            "uvit_RA_12:12:12_DEC_-12:12:12.dat"
        );
    }
}
