//! UVIT bright star finder (BSWT) and exposure time calculator (ETC).
//!
//! BSWT returns a `<pre>` listing of the bright stars around a pointing.
//! The ETC is queried once per star with the star's V magnitude and
//! spectral type; the VIS count rates are read out of its `aux` table.

use uvit_math::SkyPosition;

use crate::config::ServiceConfig;
use crate::html;
use crate::http::HttpSession;
use crate::{Result, SkyQueryError};

const BSWT_HEADER_LINES: usize = 3;
const ETC_TABLE_ID: &str = "aux";

/// One star of the BSWT listing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BswtStar {
    pub position: SkyPosition,
    /// V magnitude.
    pub magnitude: f64,
    pub b_minus_v: f64,
}

/// ETC count rates of one star through the VIS filters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VisRates {
    pub vis3: f64,
    pub vis2: f64,
    pub vis1: f64,
    pub nd1: f64,
    pub bk7: f64,
}

impl VisRates {
    /// Rates in `VIS3, VIS2, VIS1, ND1, BK7` order.
    pub fn as_row(&self) -> Vec<f64> {
        vec![self.vis3, self.vis2, self.vis1, self.nd1, self.bk7]
    }
}

/// Parse an ETC count rate cell such as `523.1` or `1.40 x 10+04`.
pub fn parse_etc_value(cell: &str) -> Option<f64> {
    let tokens: Vec<&str> = cell.split_whitespace().collect();
    match tokens.as_slice() {
        [value] => value.parse().ok(),
        [mantissa, "x", power] => {
            let mantissa: f64 = mantissa.parse().ok()?;
            let exponent: i32 = power.strip_prefix("10")?.parse().ok()?;
            Some(mantissa * 10f64.powi(exponent))
        }
        _ => None,
    }
}

/// Stars of the BSWT `<pre>` listing after its header lines.
pub fn parse_bswt_listing(listing: &str) -> Vec<BswtStar> {
    listing
        .lines()
        .skip(BSWT_HEADER_LINES)
        .filter_map(|line| {
            let fields: Vec<f64> = line
                .split_whitespace()
                .map(str::parse::<f64>)
                .collect::<std::result::Result<_, _>>()
                .ok()?;
            if fields.len() < 4 {
                return None;
            }
            Some(BswtStar {
                position: SkyPosition::new(fields[0], fields[1]),
                magnitude: fields[2],
                b_minus_v: fields[3],
            })
        })
        .collect()
}

/// VIS rates from the ETC `aux` table rows.
pub fn parse_etc_aux(rows: &[Vec<String>]) -> Result<VisRates> {
    let lookup = |label: &str| -> Result<f64> {
        let row = rows
            .iter()
            .find(|cells| cells.first().map(|c| c.as_str()) == Some(label))
            .ok_or_else(|| SkyQueryError::parse("ETC", format!("no {} row", label)))?;
        let cell = row
            .get(1)
            .ok_or_else(|| SkyQueryError::parse("ETC", format!("{} row has no value", label)))?;
        parse_etc_value(cell)
            .ok_or_else(|| SkyQueryError::parse("ETC", format!("bad {} value {:?}", label, cell)))
    };

    Ok(VisRates {
        vis3: lookup("VIS 3")?,
        vis2: lookup("VIS 2")?,
        vis1: lookup("VIS 1")?,
        nd1: lookup("VIS ND1")?,
        bk7: lookup("VIS BK-7")?,
    })
}

/// ETC form for a main sequence star of the given class and subclass.
fn etc_form(magnitude: f64, class: char, subclass: char) -> Vec<(String, String)> {
    let fixed = [
        ("src_type", "star"),
        ("sptype3", "V"),
        ("bbodytemp", "6000.0"),
        ("galaxyclass", "sc"),
        ("agnclass", "seyfert2"),
        ("plaw_index", "-1.0"),
        ("fluxval", "2.0"),
        ("flatspec_unit", "cgs"),
        ("redshift", "0.00"),
        ("ftype", "usemag"),
        ("mag_band", "v"),
        ("coords", "11 00 00.00, -16 00 00.0"),
        ("ctype", "equatorial"),
        ("ra", "0"),
        ("dec", "0"),
        ("rv", "3.1"),
        ("ebv", "0.0"),
        ("nh", "1.00"),
        ("distance", "0.45"),
        ("av", "1.0"),
        ("ext_mode", "rvebv"),
        ("dc", "25"),
        ("calc", "et"),
        ("snr", "5.0"),
        ("et", "1800"),
    ];

    let mut form: Vec<(String, String)> = fixed
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    form.push(("sptype1".to_string(), class.to_string()));
    form.push(("sptype2".to_string(), subclass.to_string()));
    form.push(("src_mag".to_string(), format!("{}", magnitude)));
    form
}

pub struct UvitWebClient<'a> {
    session: &'a HttpSession,
    config: &'a ServiceConfig,
}

impl<'a> UvitWebClient<'a> {
    pub fn new(session: &'a HttpSession, config: &'a ServiceConfig) -> Self {
        Self { session, config }
    }

    pub fn check_alive(&self) -> Result<()> {
        match self.session.status(&self.config.bswt_page_url) {
            Ok(200) => Ok(()),
            Ok(status) => {
                log::warn!("BSWT page answered with status {}", status);
                Err(SkyQueryError::ServiceDown)
            }
            Err(e) => {
                log::warn!("BSWT page unreachable: {}", e);
                Err(SkyQueryError::ServiceDown)
            }
        }
    }

    /// Bright stars around the sexagesimal pointing for `instrument`.
    pub fn bright_stars(&self, ra: &str, dec: &str, instrument: &str) -> Result<Vec<BswtStar>> {
        let form = vec![
            ("coord_type".to_string(), "eq".to_string()),
            ("coords".to_string(), bswt_coords(ra, dec)),
            ("source".to_string(), String::new()),
            ("prinst".to_string(), instrument.to_string()),
        ];
        let page = self.session.post_form(&self.config.bswt_url, &form, None)?;
        let listing = html::first_pre(&page)
            .ok_or_else(|| SkyQueryError::parse("BSWT", "no <pre> listing in response"))?;
        let stars = parse_bswt_listing(&listing);
        log::info!("BSWT listed {} stars", stars.len());
        Ok(stars)
    }

    /// VIS count rates for a star of V magnitude `magnitude` and the given
    /// spectral class and subclass, e.g. `('K', '5')`.
    pub fn vis_rates(&self, magnitude: f64, class: char, subclass: char) -> Result<VisRates> {
        let form = etc_form(magnitude, class, subclass);
        let page = self.session.post_form(&self.config.etc_url, &form, None)?;
        let rows = html::table_rows_by_id(&page, ETC_TABLE_ID)
            .ok_or_else(|| SkyQueryError::parse("ETC", "no aux table in response"))?;
        let rates = parse_etc_aux(&rows)?;
        log::debug!(
            "ETC {}{} V={}: {:?}",
            class,
            subclass,
            magnitude,
            rates
        );
        Ok(rates)
    }
}

/// The `coords` field of the BSWT form, e.g. `12 12 12, -12 12 12`.
pub fn bswt_coords(ra: &str, dec: &str) -> String {
    format!("{}, {}", ra.replace(':', " "), dec.replace(':', " "))
}
