//! VizieR cone search on the GALEX GR6 source catalogues.
//!
//! Results are fetched from the ASU-TSV endpoint, one request per table,
//! and stacked. A TSV response is a run of `#` comment lines followed by a
//! header row, a units row, a dashes row and the data rows. Several tables
//! in one response are separated by blank lines.

use uvit_math::SkyPosition;

use crate::config::ServiceConfig;
use crate::http::HttpSession;
use crate::{Result, SkyQueryError};

const OUTPUT_COLUMNS: &str = "RAJ2000,DEJ2000,FUV,NUV";

/// One GALEX source from II/312. Magnitudes are `None` when the catalogue
/// has no detection in that band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VizierRow {
    pub position: SkyPosition,
    pub fuv: Option<f64>,
    pub nuv: Option<f64>,
}

fn parse_optional(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        None
    } else {
        cell.parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

const HEADER_MARKER: &str = "RAJ2000";

/// Positions of the columns we read in one table block.
struct Columns {
    ra: usize,
    dec: usize,
    fuv: usize,
    nuv: usize,
}

impl Columns {
    fn from_header(header: &csv::StringRecord) -> Result<Self> {
        let index = |name: &str| {
            header.iter().position(|h| h == name).ok_or_else(|| {
                SkyQueryError::parse("VizieR", format!("no {} column in response", name))
            })
        };
        Ok(Self {
            ra: index("RAJ2000")?,
            dec: index("DEJ2000")?,
            fuv: index("FUV")?,
            nuv: index("NUV")?,
        })
    }

    fn row(&self, record: &csv::StringRecord) -> Option<VizierRow> {
        let cell = |i: usize| parse_optional(record.get(i).unwrap_or(""));
        Some(VizierRow {
            position: SkyPosition::new(cell(self.ra)?, cell(self.dec)?),
            fuv: cell(self.fuv),
            nuv: cell(self.nuv),
        })
    }
}

/// Parse every table block of an ASU-TSV response.
pub fn parse_tsv(text: &str) -> Result<Vec<VizierRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .comment(Some(b'#'))
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    let mut columns: Option<Columns> = None;
    // units and dashes records still to skip after a header
    let mut preamble = 0;

    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        if record.iter().any(|cell| cell == HEADER_MARKER) {
            columns = Some(Columns::from_header(&record)?);
            preamble = 2;
            continue;
        }
        if preamble > 0 {
            preamble -= 1;
            continue;
        }

        let Some(block) = &columns else {
            return Err(SkyQueryError::parse("VizieR", "data before the table header"));
        };
        match block.row(&record) {
            Some(row) => rows.push(row),
            None => log::debug!("Skipping VizieR row without a position: {:?}", record),
        }
    }

    Ok(rows)
}

pub struct VizierClient<'a> {
    session: &'a HttpSession,
    config: &'a ServiceConfig,
}

impl<'a> VizierClient<'a> {
    pub fn new(session: &'a HttpSession, config: &'a ServiceConfig) -> Self {
        Self { session, config }
    }

    /// All sources within `radius_arcsec` of `target`, stacked over the
    /// configured tables (AIS and MIS by default).
    pub fn cone_search(&self, target: &SkyPosition, radius_arcsec: f64) -> Result<Vec<VizierRow>> {
        let centre = format!("{:.6} {:+.6}", target.ra_deg, target.dec_deg);
        let mut stacked = Vec::new();

        for table in &self.config.vizier_tables {
            let query = [
                ("-source", table.clone()),
                ("-c", centre.clone()),
                ("-c.rs", format!("{}", radius_arcsec)),
                ("-out", OUTPUT_COLUMNS.to_string()),
                ("-oc.form", "dec".to_string()),
                ("-out.max", "unlimited".to_string()),
            ];
            let body = self
                .session
                .get_text_with_query(&self.config.vizier_url, &query)?;
            let rows = parse_tsv(&body)?;
            log::info!("VizieR {} returned {} sources", table, rows.len());
            stacked.extend(rows);
        }

        Ok(stacked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AIS_RESPONSE: &str = "\
#
#   VizieR Astronomical Server vizier.cds.unistra.fr
#Title: GALEX-DR5 (GR5) sources from AIS and MIS (Bianchi+ 2011)
#Table\tII/312/ais
#Name: II/312/ais
#Column\tRAJ2000\t(F10.6)\tRight ascension (FK5, Equinox=J2000.0)
RAJ2000\tDEJ2000\tFUV\tNUV
deg\tdeg\tmag\tmag
----------\t----------\t------\t------
114.215177\t+65.602546\t\t17.231
114.210254\t+65.610118\t19.845\t18.002
114.198400\t+65.590001\t21.102\t
";

    #[test]
    fn test_parse_ais_table() {
        let rows = parse_tsv(AIS_RESPONSE).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].position, SkyPosition::new(114.215177, 65.602546));
        assert_eq!(rows[0].fuv, None);
        assert_eq!(rows[0].nuv, Some(17.231));
        assert_eq!(rows[1].fuv, Some(19.845));
        assert_eq!(rows[2].nuv, None);
    }

    #[test]
    fn test_parse_two_blocks_with_reordered_columns() {
        let text = format!(
            "{}\n#Table\tII/312/mis\nNUV\tFUV\tRAJ2000\tDEJ2000\nmag\tmag\tdeg\tdeg\n---\t---\t---\t---\n16.5\t18.1\t10.0\t-20.0\n",
            AIS_RESPONSE
        );
        let rows = parse_tsv(&text).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[3].position, SkyPosition::new(10.0, -20.0));
        assert_eq!(rows[3].nuv, Some(16.5));
        assert_eq!(rows[3].fuv, Some(18.1));
    }

    #[test]
    fn test_empty_response() {
        assert!(parse_tsv("#\n# No table found\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_rows_before_header_are_rejected() {
        let text = "114.2\t65.6\t\t17.2\n";
        assert!(matches!(parse_tsv(text), Err(SkyQueryError::Parse { .. })));
    }

    #[test]
    fn test_missing_column_is_parse_error() {
        let text = "RAJ2000\tDEJ2000\tNUV\ndeg\tdeg\tmag\n---\t---\t---\n1\t2\t3\n";
        assert!(matches!(parse_tsv(text), Err(SkyQueryError::Parse { .. })));
    }
}
