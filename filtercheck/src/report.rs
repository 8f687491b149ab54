//! Result tables, safety declarations and the files they are saved to.
//!
//! Tables go to stdout as aligned text and to the working directory as CSV.
//! Rates are written with two decimals, TD1 rates with one.

use std::fs;
use std::path::Path;

use uvit_math::calibration::{count_rates, fuv_rates_from_nuv, td1_count_rates};
use uvit_math::safety::{classify_band, SafetyVerdict};
use uvit_math::selection::CatalogSource;
use uvit_math::{Band, CountRateRow, SkyPosition, Td1Row};

use crate::error::Result;

pub const FUV_ABSENT_FILE: &str = "absent_FUV.txt";
pub const ZERO_TILES_FILE: &str = "zero_tiles.txt";
pub const GALACTIC_PLANE_FILE: &str = "gal_plane_warning.txt";

pub const FUV_ABSENT_NOTICE: &str =
    "\nFUV observations seem to be absent! Using M_fuv = M_nuv - 1.65.";
pub const GALACTIC_PLANE_NOTE: &str = "Your field lies on the Galactic plane.\n";
pub const ZERO_TILES_MANUAL_CHECK: &str = "0 Galex tiles found. Galex observations around\nthe given target is not available. Please follow\nthe mandatory check document.";
pub const ZERO_TILES_TD1_FALLBACK: &str = "0 Galex tiles found. Galex observations around\nthe given target is not available. Using TD1\ncatalogue to estimate UVIT count rates.";

/// `safe_NUV_filters.txt` / `safe_FUV_filters.txt`
pub fn safe_filters_file(band: Band) -> String {
    format!("safe_{}_filters.txt", band.label())
}

/// CSV name for a band derived from a GALEX product name,
/// e.g. `NUV_AIS_1-xd-mcat-nd-int.txt`.
pub fn table_file_name(band: Band, product: &str) -> String {
    let suffix = format!("-{}d-int.txt", band.galex_detector());
    let stem = product.strip_suffix(".fits.gz").unwrap_or(product);
    format!("{}_{}{}", band.label(), stem, suffix)
}

/// CSV name of the TD1 tables, `NUV_td1-nd-int.txt` / `FUV_td1-fd-int.txt`.
pub fn td1_table_file_name(band: Band) -> String {
    format!("{}_td1-{}d-int.txt", band.label(), band.galex_detector())
}

/// Right-aligned columns under a dashed rule.
pub fn format_table(header: &[String], rows: &[Vec<String>]) -> String {
    let widths: Vec<usize> = header
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .filter_map(|r| r.get(i))
                .map(String::len)
                .chain(std::iter::once(h.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:>width$}", c, width = w))
            .collect::<Vec<_>>()
            .join(" ")
    };

    let mut out = vec![line(header)];
    out.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join(" "),
    );
    out.extend(rows.iter().map(|r| line(r)));
    out.join("\n")
}

fn write_csv(path: &Path, header: &[String], rows: &[Vec<String>]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// One numbered source of a band table.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    pub position: SkyPosition,
    pub rates: CountRateRow,
}

/// Count rates of the selected sources in one band.
#[derive(Debug, Clone, PartialEq)]
pub struct BandTable {
    pub band: Band,
    pub rows: Vec<SourceRow>,
}

impl BandTable {
    /// Rates from magnitudes measured in `band`.
    pub fn from_magnitudes(band: Band, sources: &[CatalogSource]) -> Result<Self> {
        let rows = sources
            .iter()
            .map(|s| {
                Ok(SourceRow {
                    position: s.position,
                    rates: count_rates(band, s.magnitude)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { band, rows })
    }

    /// FUV rates estimated from NUV magnitudes.
    pub fn fuv_from_nuv(sources: &[CatalogSource]) -> Result<Self> {
        let rows = sources
            .iter()
            .map(|s| {
                Ok(SourceRow {
                    position: s.position,
                    rates: fuv_rates_from_nuv(s.magnitude)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            band: Band::Fuv,
            rows,
        })
    }

    pub fn magnitudes(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.rates.magnitude).collect()
    }

    pub fn rate_rows(&self) -> Vec<Vec<f64>> {
        self.rows.iter().map(|r| r.rates.rates.clone()).collect()
    }

    pub fn verdict(&self) -> SafetyVerdict {
        classify_band(self.band, &self.rate_rows())
    }

    fn header(&self) -> Vec<String> {
        ["sl_no", "ra_hms", "dec_dms", "Mag", "Mag_corrected"]
            .iter()
            .map(|s| s.to_string())
            .chain(self.band.filters().iter().map(|f| f.column.to_string()))
            .collect()
    }

    fn cells(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let mut cells = vec![
                    (i + 1).to_string(),
                    row.position.ra_hms(),
                    row.position.dec_dms(),
                    format!("{:.2}", row.rates.magnitude),
                    format!("{:.2}", row.rates.corrected_magnitude),
                ];
                cells.extend(row.rates.rates.iter().map(|r| format!("{:.2}", r)));
                cells
            })
            .collect()
    }
}

/// Count rates of the brightest TD1 source in one band.
#[derive(Debug, Clone, PartialEq)]
pub struct Td1Table {
    pub band: Band,
    pub row: Td1Row,
}

impl Td1Table {
    pub fn new(band: Band, flux: f64) -> Result<Self> {
        Ok(Self {
            band,
            row: td1_count_rates(band, flux)?,
        })
    }

    pub fn verdict(&self) -> SafetyVerdict {
        classify_band(self.band, &[self.row.rates.clone()])
    }

    fn header(&self) -> Vec<String> {
        std::iter::once(self.band.td1_flux_column().to_string())
            .chain(self.band.td1_filters().iter().map(|f| f.column.to_string()))
            .collect()
    }

    fn cells(&self) -> Vec<Vec<String>> {
        let mut row = vec![format!("{:e}", self.row.flux)];
        row.extend(self.row.rates.iter().map(|r| format!("{:.1}", r)));
        vec![row]
    }
}

fn console_heading(band: Band) -> String {
    match band {
        Band::Nuv => "\n\n### NUV\n".to_string(),
        Band::Fuv => "\n### FUV \n".to_string(),
    }
}

fn publish(
    dir: &Path,
    band: Band,
    header: &[String],
    cells: &[Vec<String>],
    csv_name: &str,
    verdict: &SafetyVerdict,
) -> Result<()> {
    println!("{}\n{}\n", console_heading(band), format_table(header, cells));
    let declaration = verdict.declaration();
    println!("\n\n{}\n", declaration);

    write_csv(&dir.join(csv_name), header, cells)?;
    fs::write(dir.join(safe_filters_file(band)), &declaration)?;
    log::info!("Wrote {} and {}", csv_name, safe_filters_file(band));
    Ok(())
}

/// Print a band table with its verdict and save both.
pub fn publish_band(dir: &Path, table: &BandTable, csv_name: &str) -> Result<SafetyVerdict> {
    let verdict = table.verdict();
    publish(
        dir,
        table.band,
        &table.header(),
        &table.cells(),
        csv_name,
        &verdict,
    )?;
    Ok(verdict)
}

pub fn publish_td1(dir: &Path, table: &Td1Table) -> Result<SafetyVerdict> {
    let verdict = table.verdict();
    publish(
        dir,
        table.band,
        &table.header(),
        &table.cells(),
        &td1_table_file_name(table.band),
        &verdict,
    )?;
    Ok(verdict)
}

/// Announce the NUV based FUV estimate and leave the notice on disk.
pub fn note_fuv_absent(dir: &Path) -> Result<()> {
    println!("{}", FUV_ABSENT_NOTICE);
    fs::write(dir.join(FUV_ABSENT_FILE), FUV_ABSENT_NOTICE)?;
    Ok(())
}

/// Zero tiles notice for the checks that cannot fall back to TD1.
pub fn zero_tiles_notice(on_galactic_plane: bool) -> String {
    let prefix = if on_galactic_plane {
        GALACTIC_PLANE_NOTE
    } else {
        ""
    };
    format!("{}{}", prefix, ZERO_TILES_MANUAL_CHECK)
}

pub fn write_zero_tiles(dir: &Path, notice: &str) -> Result<()> {
    fs::write(dir.join(ZERO_TILES_FILE), notice)?;
    Ok(())
}
