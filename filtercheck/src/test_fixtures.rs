//! FITS products written on the fly for the pipeline tests.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use fitsio::images::{ImageDescription, ImageType};
use fitsio::tables::{ColumnDataType, ColumnDescription};
use fitsio::FitsFile;
use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::Array2;

/// GALEX intensity map pixel size, degrees.
pub const PIXEL_DEG: f64 = 1.5 / 3600.0;

/// `td1_catalogue.fits` with the given rows.
pub fn write_td1(path: &Path, ra: Vec<f64>, dec: Vec<f64>, nuv: Vec<f64>, fuv: Vec<f64>) {
    let columns = [
        ("ra", ra),
        ("dec", dec),
        ("flux_2365_a", nuv),
        ("flux_1565_a", fuv),
    ];
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
    let hdu = fptr.create_table("TD1".to_string(), &descriptions).unwrap();
    for (name, values) in &columns {
        hdu.write_col(&mut fptr, *name, values).unwrap();
    }
}

/// A gzipped intensity map centred on `crval` with 1.5" pixels.
pub fn write_intensity_map(path: &Path, data: &Array2<f64>, crval: [f64; 2]) {
    let plain = path.with_extension("plain");
    let (height, width) = data.dim();
    {
        let description = ImageDescription {
            data_type: ImageType::Double,
            dimensions: &[height, width],
        };
        let mut fptr = FitsFile::create(&plain)
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
        hdu.write_key(&mut fptr, "CDELT1", -PIXEL_DEG).unwrap();
        hdu.write_key(&mut fptr, "CDELT2", PIXEL_DEG).unwrap();
    }

    let bytes = fs::read(&plain).unwrap();
    let mut encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    encoder.write_all(&bytes).unwrap();
    encoder.finish().unwrap();
    fs::remove_file(&plain).unwrap();
}
