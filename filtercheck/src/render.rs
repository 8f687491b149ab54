//! PNG diagnostics: the masked field window in log greyscale with the
//! selected sources circled and numbered.

use std::error::Error;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use plotters::prelude::*;

use crate::error::{PipelineError, Result};
use crate::image_proc::Window;

pub const TITLE: &str = "Detected bright sources marked";

const TITLE_HEIGHT: u32 = 60;
const MIN_MARKER_RADIUS: i32 = 6;

/// `..._0001-nd-int.fits.gz` becomes `..._0001-nd-int.png`.
pub fn png_name(product: &str) -> String {
    match product.strip_suffix(".fits.gz") {
        Some(stem) => format!("{}.png", stem),
        None => format!("{}.png", product),
    }
}

/// Logarithmic grey levels between the faintest positive pixel and the
/// brightest one. Zero and negative pixels are black.
pub fn log_stretch(data: &Array2<f64>) -> Array2<u8> {
    let positive = data.iter().copied().filter(|v| *v > 0.0 && v.is_finite());
    let (lo, hi) = positive.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() {
        return Array2::zeros(data.dim());
    }

    let (log_lo, log_hi) = (lo.ln(), hi.ln());
    let span = log_hi - log_lo;
    data.mapv(|v| {
        if v <= 0.0 || !v.is_finite() {
            0
        } else if span <= 0.0 {
            255
        } else {
            (255.0 * (v.ln() - log_lo) / span).round().clamp(0.0, 255.0) as u8
        }
    })
}

/// Canvas position of a window pixel; the first row is drawn at the bottom.
pub fn canvas_point(height: usize, x: f64, y: f64) -> (i32, i32) {
    (x.round() as i32, height as i32 - 1 - y.round() as i32)
}

fn marker_radius(side: usize) -> i32 {
    ((side / 60) as i32).max(MIN_MARKER_RADIUS)
}

fn draw(
    window: &Window,
    markers: &[(f64, f64)],
    path: &Path,
) -> std::result::Result<(), Box<dyn Error>> {
    let (height, width) = window.data.dim();
    let root = BitMapBackend::new(path, (width as u32, height as u32 + TITLE_HEIGHT))
        .into_drawing_area();
    root.fill(&WHITE)?;
    let image_area = root.titled(TITLE, ("sans-serif", 30))?;

    let grey = log_stretch(&window.data);
    for ((row, col), &g) in grey.indexed_iter() {
        let (x, y) = canvas_point(height, col as f64, row as f64);
        image_area.draw_pixel((x, y), &RGBColor(g, g, g))?;
    }

    let radius = marker_radius(width.max(height));
    for (i, &(x, y)) in markers.iter().enumerate() {
        let centre = canvas_point(height, x, y);
        image_area.draw(&Circle::new(centre, radius, RED.mix(0.2).filled()))?;
        image_area.draw(&Text::new(
            format!("{}", i + 1),
            (centre.0 + radius, centre.1 - radius),
            ("sans-serif", 20).into_font().color(&RED),
        ))?;
    }

    root.present()?;
    Ok(())
}

/// Render `window` with `markers` (window pixels) numbered from 1.
pub fn render_marked(window: &Window, markers: &[(f64, f64)], path: &Path) -> Result<PathBuf> {
    draw(window, markers, path).map_err(|e| PipelineError::Render {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    log::info!("Saved {}", path.display());
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rstest::rstest;

    #[rstest]
    #[case("MISDR1_24278_0266_0001-nd-int.fits.gz", "MISDR1_24278_0266_0001-nd-int.png")]
    #[case("AIS_001-fd-int.fits.gz", "AIS_001-fd-int.png")]
    #[case("plain", "plain.png")]
    fn test_png_name(#[case] product: &str, #[case] expected: &str) {
        assert_eq!(png_name(product), expected);
    }

    #[test]
    fn test_log_stretch_range() {
        let data = array![[0.0, 1.0], [10.0, 100.0]];
        let grey = log_stretch(&data);
        assert_eq!(grey[[0, 0]], 0);
        assert_eq!(grey[[0, 1]], 0);
        assert_eq!(grey[[1, 0]], 128);
        assert_eq!(grey[[1, 1]], 255);
    }

    #[test]
    fn test_log_stretch_negative_and_flat() {
        let grey = log_stretch(&array![[-5.0, 0.0], [0.0, 0.0]]);
        assert!(grey.iter().all(|&g| g == 0));

        let grey = log_stretch(&array![[2.0, 2.0], [0.0, -1.0]]);
        assert_eq!(grey[[0, 0]], 255);
        assert_eq!(grey[[1, 1]], 0);
    }

    #[test]
    fn test_canvas_point_flips_rows() {
        assert_eq!(canvas_point(100, 0.0, 0.0), (0, 99));
        assert_eq!(canvas_point(100, 10.4, 99.0), (10, 0));
    }
}
