//! Readers for the FITS products used by the filter checks.
//!
//! GALEX products are opened directly from their `.fits.gz` downloads;
//! cfitsio decompresses them in memory. Image arrays keep the FITS row order,
//! so `data[[y, x]]` is the pixel at 0-based FITS coordinate (x, y).

use std::path::Path;

use fitsio::hdu::FitsHdu;
use fitsio::FitsFile;
use ndarray::{Array2, ArrayD, Ix2};
use uvit_math::selection::{CatalogSource, FluxSource};
use uvit_math::wcs::TanWcs;
use uvit_math::{Band, SkyPosition};

use crate::{Result, SkyQueryError};

fn open_product(path: &Path) -> Result<FitsFile> {
    FitsFile::open(path).map_err(|e| {
        log::warn!("Could not open {}: {}", path.display(), e);
        SkyQueryError::IncompleteFits(path.to_path_buf())
    })
}

/// Read a table column as f64, falling back to the upper-case column name.
fn read_f64_column(hdu: &FitsHdu, fptr: &mut FitsFile, name: &str) -> Result<Vec<f64>> {
    match hdu.read_col::<f64>(fptr, name) {
        Ok(values) => Ok(values),
        Err(first) => {
            let upper = name.to_ascii_uppercase();
            hdu.read_col::<f64>(fptr, &upper).map_err(|_| {
                log::debug!("Column {} not readable: {}", name, first);
                SkyQueryError::Fits(first)
            })
        }
    }
}

fn read_key_f64(hdu: &FitsHdu, fptr: &mut FitsFile, key: &str) -> Option<f64> {
    hdu.read_key::<f64>(fptr, key).ok()
}

/// TAN WCS from CRVAL/CRPIX and either a CD matrix or CDELT (+ CROTA2).
pub fn read_wcs(hdu: &FitsHdu, fptr: &mut FitsFile) -> Result<TanWcs> {
    let mut required = |key: &str| {
        read_key_f64(hdu, fptr, key).ok_or_else(|| SkyQueryError::MissingKeyword(key.to_string()))
    };
    let crval = [required("CRVAL1")?, required("CRVAL2")?];
    let crpix = [required("CRPIX1")?, required("CRPIX2")?];

    let cd = ["CD1_1", "CD1_2", "CD2_1", "CD2_2"].map(|k| read_key_f64(hdu, fptr, k));
    if let [Some(a), Some(b), Some(c), Some(d)] = cd {
        return Ok(TanWcs::from_cd(crval, crpix, [[a, b], [c, d]])?);
    }

    let cdelt1 = read_key_f64(hdu, fptr, "CDELT1")
        .ok_or_else(|| SkyQueryError::MissingKeyword("CDELT1".to_string()))?;
    let cdelt2 = read_key_f64(hdu, fptr, "CDELT2")
        .ok_or_else(|| SkyQueryError::MissingKeyword("CDELT2".to_string()))?;
    let crota = read_key_f64(hdu, fptr, "CROTA2").unwrap_or(0.0);

    Ok(TanWcs::from_cdelt(crval, crpix, [cdelt1, cdelt2], crota)?)
}

/// GALEX merged catalogue (`*-xd-mcat.fits.gz`), first extension.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct McatTable {
    pub ra: Vec<f64>,
    pub dec: Vec<f64>,
    pub nuv_mag: Vec<f64>,
    pub fuv_mag: Vec<f64>,
    /// NUV FWHM in degrees.
    pub nuv_fwhm: Vec<f64>,
}

impl McatTable {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut fptr = open_product(path)?;
        let hdu = fptr
            .hdu(1)
            .map_err(|_| SkyQueryError::IncompleteFits(path.to_path_buf()))?;

        let table = Self {
            ra: read_f64_column(&hdu, &mut fptr, "alpha_j2000_merged")?,
            dec: read_f64_column(&hdu, &mut fptr, "delta_j2000_merged")?,
            nuv_mag: read_f64_column(&hdu, &mut fptr, "nuv_mag")?,
            fuv_mag: read_f64_column(&hdu, &mut fptr, "fuv_mag")?,
            nuv_fwhm: read_f64_column(&hdu, &mut fptr, "nuv_fwhm_world")?,
        };
        log::info!("Read {} sources from {}", table.len(), path.display());
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.ra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ra.is_empty()
    }

    fn position(&self, i: usize) -> SkyPosition {
        SkyPosition::new(self.ra[i], self.dec[i])
    }

    pub fn nuv_sources(&self) -> Vec<CatalogSource> {
        (0..self.len())
            .map(|i| CatalogSource {
                position: self.position(i),
                magnitude: self.nuv_mag[i],
                fwhm_deg: self.nuv_fwhm.get(i).copied(),
            })
            .collect()
    }

    pub fn fuv_sources(&self) -> Vec<CatalogSource> {
        (0..self.len())
            .map(|i| CatalogSource::new(self.position(i), self.fuv_mag[i]))
            .collect()
    }

    /// Tiles without FUV exposure carry a single placeholder value in every row.
    pub fn fuv_absent(&self) -> bool {
        match self.fuv_mag.first() {
            Some(first) => self.fuv_mag.iter().all(|m| m == first),
            None => true,
        }
    }
}

/// The TD1 ultraviolet catalogue.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Td1Catalogue {
    pub ra: Vec<f64>,
    pub dec: Vec<f64>,
    /// 2365 Å flux.
    pub nuv_flux: Vec<f64>,
    /// 1565 Å flux.
    pub fuv_flux: Vec<f64>,
}

impl Td1Catalogue {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            return Err(SkyQueryError::MissingCatalogue(name));
        }

        let mut fptr = FitsFile::open(path)?;
        let hdu = fptr.hdu(1)?;
        let catalogue = Self {
            ra: read_f64_column(&hdu, &mut fptr, "ra")?,
            dec: read_f64_column(&hdu, &mut fptr, "dec")?,
            nuv_flux: read_f64_column(&hdu, &mut fptr, Band::Nuv.td1_flux_column())?,
            fuv_flux: read_f64_column(&hdu, &mut fptr, Band::Fuv.td1_flux_column())?,
        };
        log::info!("Read {} TD1 sources", catalogue.ra.len());
        Ok(catalogue)
    }

    pub fn sources(&self, band: Band) -> Vec<FluxSource> {
        let fluxes = match band {
            Band::Fuv => &self.fuv_flux,
            Band::Nuv => &self.nuv_flux,
        };
        self.ra
            .iter()
            .zip(&self.dec)
            .zip(fluxes)
            .map(|((&ra, &dec), &flux)| FluxSource {
                position: SkyPosition::new(ra, dec),
                flux,
            })
            .collect()
    }
}

/// A GALEX intensity map (counts/s/pixel) with its WCS.
#[derive(Debug, Clone)]
pub struct IntensityMap {
    pub data: Array2<f64>,
    pub wcs: TanWcs,
}

impl IntensityMap {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut fptr = open_product(path)?;
        let hdu = fptr
            .primary_hdu()
            .map_err(|_| SkyQueryError::IncompleteFits(path.to_path_buf()))?;

        let raw: ArrayD<f64> = hdu.read_image(&mut fptr).map_err(|e| {
            log::warn!("Could not read image data from {}: {}", path.display(), e);
            SkyQueryError::IncompleteFits(path.to_path_buf())
        })?;
        let data = raw.into_dimensionality::<Ix2>().map_err(|e| {
            SkyQueryError::parse("GALEX", format!("intensity map is not 2-D: {}", e))
        })?;
        let wcs = read_wcs(&hdu, &mut fptr)?;

        let (height, width) = data.dim();
        log::debug!("Intensity map {} is {}x{}", path.display(), width, height);
        Ok(Self { data, wcs })
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use super::*;
    use fitsio::images::{ImageDescription, ImageType};
    use fitsio::tables::{ColumnDataType, ColumnDescription};
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    pub fn write_table(path: &Path, columns: &[(&str, Vec<f64>)]) {
        let mut fptr = FitsFile::create(path).open().unwrap();
        let descriptions: Vec<_> = columns
            .iter()
            .map(|(name, _)| {
                ColumnDescription::new(*name)
                    .with_type(ColumnDataType::Double)
                    .create()
                    .unwrap()
            })
            .collect();
        let hdu = fptr.create_table("CATALOG".to_string(), &descriptions).unwrap();
        for (name, values) in columns {
            hdu.write_col(&mut fptr, *name, values).unwrap();
        }
    }

    /// Write `data` as a float image with a GALEX-like TAN header.
    pub fn write_image(path: &Path, data: &Array2<f64>, crval: [f64; 2]) {
        let (height, width) = data.dim();
        let description = ImageDescription {
            data_type: ImageType::Double,
            dimensions: &[height, width],
        };
        let mut fptr = FitsFile::create(path)
            .with_custom_primary(&description)
            .open()
            .unwrap();
        let hdu = fptr.primary_hdu().unwrap();
        let flat: Vec<f64> = data.iter().copied().collect();
        hdu.write_image(&mut fptr, &flat).unwrap();

        hdu.write_key(&mut fptr, "CTYPE1", "RA---TAN".to_string()).unwrap();
        hdu.write_key(&mut fptr, "CTYPE2", "DEC--TAN".to_string()).unwrap();
        hdu.write_key(&mut fptr, "CRVAL1", crval[0]).unwrap();
        hdu.write_key(&mut fptr, "CRVAL2", crval[1]).unwrap();
        hdu.write_key(&mut fptr, "CRPIX1", (width as f64 + 1.0) / 2.0).unwrap();
        hdu.write_key(&mut fptr, "CRPIX2", (height as f64 + 1.0) / 2.0).unwrap();
        hdu.write_key(&mut fptr, "CDELT1", -1.5 / 3600.0).unwrap();
        hdu.write_key(&mut fptr, "CDELT2", 1.5 / 3600.0).unwrap();
    }

    pub fn gzip_file(src: &Path, dest: &Path) {
        let bytes = std::fs::read(src).unwrap();
        let mut encoder =
            GzEncoder::new(std::fs::File::create(dest).unwrap(), Compression::default());
        encoder.write_all(&bytes).unwrap();
        encoder.finish().unwrap();
    }
}
