//! Intensity map processing: the circular field window, Laplacian of
//! Gaussian blob detection and 7x7 box photometry.
//!
//! Window arrays are indexed `[[row, col]]` like the FITS image they are cut
//! from. Pixel positions are 0-based `(x, y)` = `(col, row)`.

use ndarray::Array2;
use uvit_math::selection::largest_by;
use uvit_math::wcs::TanWcs;
use uvit_math::SkyPosition;

use crate::error::{PipelineError, Result};

/// Half width of the photometry box; the box is `2 * BOX_HALF + 1` pixels.
pub const BOX_HALF: isize = 3;

/// A square cut of an intensity map centred on the target.
#[derive(Debug, Clone)]
pub struct Window {
    pub data: Array2<f64>,
    /// Image pixel of `data[[0, 0]]`, may be negative.
    pub origin_x: isize,
    pub origin_y: isize,
    pub radius: usize,
}

impl Window {
    /// Cut a `2 * radius` square centred on `centre`, zero outside the image.
    pub fn extract(image: &Array2<f64>, centre: (isize, isize), radius: usize) -> Self {
        let side = 2 * radius;
        let r = radius as isize;
        let origin_x = centre.0 - r;
        let origin_y = centre.1 - r;
        let (height, width) = image.dim();

        let data = Array2::from_shape_fn((side, side), |(row, col)| {
            let y = origin_y + row as isize;
            let x = origin_x + col as isize;
            if x >= 0 && y >= 0 && (x as usize) < width && (y as usize) < height {
                image[[y as usize, x as usize]]
            } else {
                0.0
            }
        });

        Self {
            data,
            origin_x,
            origin_y,
            radius,
        }
    }

    /// Zero every pixel farther than `radius` from the window centre.
    pub fn apply_circular_mask(&mut self) {
        let r = self.radius as isize;
        let limit = r * r;
        for ((row, col), value) in self.data.indexed_iter_mut() {
            let dy = row as isize - r;
            let dx = col as isize - r;
            if dx * dx + dy * dy > limit {
                *value = 0.0;
            }
        }
    }

    pub fn to_window(&self, x: f64, y: f64) -> (f64, f64) {
        (x - self.origin_x as f64, y - self.origin_y as f64)
    }

    pub fn to_image(&self, x: f64, y: f64) -> (f64, f64) {
        (x + self.origin_x as f64, y + self.origin_y as f64)
    }
}

/// Nearest image pixel of the target, which must fall on the image.
pub fn target_pixel(wcs: &TanWcs, target: &SkyPosition, dims: (usize, usize)) -> Result<(isize, isize)> {
    let (x, y) = wcs
        .world_to_pixel(target)
        .map_err(|_| PipelineError::OutsideImage)?;
    if !x.is_finite() || !y.is_finite() {
        return Err(PipelineError::OutsideImage);
    }

    let (height, width) = dims;
    let (px, py) = (x.round() as isize, y.round() as isize);
    if px < 0 || py < 0 || px as usize >= width || py as usize >= height {
        log::warn!("Target maps to pixel ({}, {}) of a {}x{} image", px, py, width, height);
        return Err(PipelineError::OutsideImage);
    }
    Ok((px, py))
}

/// Masked window around the target.
pub fn field_window(
    image: &Array2<f64>,
    wcs: &TanWcs,
    target: &SkyPosition,
    radius: usize,
) -> Result<Window> {
    let centre = target_pixel(wcs, target, image.dim())?;
    let mut window = Window::extract(image, centre, radius);
    window.apply_circular_mask();
    log::debug!(
        "Window origin ({}, {}), side {}",
        window.origin_x,
        window.origin_y,
        2 * radius
    );
    Ok(window)
}

/// Sum of the 7x7 box centred on the pixel nearest `(x, y)`, clipped at the edges.
pub fn box_flux(data: &Array2<f64>, x: f64, y: f64) -> f64 {
    let (height, width) = data.dim();
    if !x.is_finite() || !y.is_finite() {
        return 0.0;
    }
    let cx = x.round() as isize;
    let cy = y.round() as isize;

    let mut sum = 0.0;
    for row in (cy - BOX_HALF)..=(cy + BOX_HALF) {
        if row < 0 || row as usize >= height {
            continue;
        }
        for col in (cx - BOX_HALF)..=(cx + BOX_HALF) {
            if col < 0 || col as usize >= width {
                continue;
            }
            sum += data[[row as usize, col as usize]];
        }
    }
    sum
}

fn gaussian_taps(sigma: f64) -> (Vec<f64>, Vec<f64>) {
    let radius = (4.0 * sigma + 0.5) as isize;
    let mut g: Vec<f64> = (-radius..=radius)
        .map(|t| (-((t * t) as f64) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f64 = g.iter().sum();
    g.iter_mut().for_each(|v| *v /= sum);

    let s2 = sigma * sigma;
    let mut g2: Vec<f64> = (-radius..=radius)
        .zip(&g)
        .map(|(t, &v)| ((t * t) as f64 / (s2 * s2) - 1.0 / s2) * v)
        .collect();
    // second derivative taps must sum to zero so flat regions give no response
    let mean = g2.iter().sum::<f64>() / g2.len() as f64;
    g2.iter_mut().for_each(|v| *v -= mean);

    (g, g2)
}

fn convolve_rows(image: &Array2<f64>, taps: &[f64]) -> Array2<f64> {
    let (height, width) = image.dim();
    let half = (taps.len() / 2) as isize;
    Array2::from_shape_fn((height, width), |(row, col)| {
        taps.iter()
            .enumerate()
            .filter_map(|(k, w)| {
                let c = col as isize + k as isize - half;
                (c >= 0 && (c as usize) < width).then(|| w * image[[row, c as usize]])
            })
            .sum()
    })
}

fn convolve_cols(image: &Array2<f64>, taps: &[f64]) -> Array2<f64> {
    let (height, width) = image.dim();
    let half = (taps.len() / 2) as isize;
    Array2::from_shape_fn((height, width), |(row, col)| {
        taps.iter()
            .enumerate()
            .filter_map(|(k, w)| {
                let r = row as isize + k as isize - half;
                (r >= 0 && (r as usize) < height).then(|| w * image[[r as usize, col]])
            })
            .sum()
    })
}

/// Scale normalised Laplacian of Gaussian, `-sigma^2 * LoG(image)`, so that
/// bright blobs give positive peaks.
pub fn log_response(image: &Array2<f64>, sigma: f64) -> Array2<f64> {
    let (g, g2) = gaussian_taps(sigma);
    let dxx = convolve_cols(&convolve_rows(image, &g2), &g);
    let dyy = convolve_cols(&convolve_rows(image, &g), &g2);
    let scale = -sigma * sigma;
    (dxx + dyy).mapv(|v| v * scale)
}

/// A detected blob in window pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blob {
    pub x: f64,
    pub y: f64,
    pub sigma: f64,
    pub response: f64,
}

impl Blob {
    pub fn radius(&self) -> f64 {
        self.sigma * std::f64::consts::SQRT_2
    }

    fn overlaps(&self, other: &Blob) -> bool {
        let d = ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt();
        d < self.radius() + other.radius()
    }
}

/// Local maxima over position and scale with a positive response.
fn scale_space_peaks(cube: &[Array2<f64>], sigmas: &[f64]) -> Vec<Blob> {
    let mut peaks = Vec::new();
    let Some(first) = cube.first() else {
        return peaks;
    };
    let (height, width) = first.dim();

    for (s, layer) in cube.iter().enumerate() {
        let s_lo = s.saturating_sub(1);
        let s_hi = (s + 1).min(cube.len() - 1);
        for ((row, col), &value) in layer.indexed_iter() {
            if value <= 0.0 {
                continue;
            }
            let r_lo = row.saturating_sub(1);
            let r_hi = (row + 1).min(height - 1);
            let c_lo = col.saturating_sub(1);
            let c_hi = (col + 1).min(width - 1);

            let is_peak = (s_lo..=s_hi).all(|ns| {
                (r_lo..=r_hi).all(|nr| (c_lo..=c_hi).all(|nc| cube[ns][[nr, nc]] <= value))
            });
            if is_peak {
                peaks.push(Blob {
                    x: col as f64,
                    y: row as f64,
                    sigma: sigmas[s],
                    response: value,
                });
            }
        }
    }
    peaks
}

/// Drop any blob that overlaps a larger (or equally large, stronger) one.
fn prune_overlapping(mut blobs: Vec<Blob>) -> Vec<Blob> {
    blobs.sort_by(|a, b| {
        b.sigma
            .total_cmp(&a.sigma)
            .then(b.response.total_cmp(&a.response))
    });
    let mut kept: Vec<Blob> = Vec::new();
    for blob in blobs {
        if !kept.iter().any(|k| k.overlaps(&blob)) {
            kept.push(blob);
        }
    }
    kept
}

/// Laplacian of Gaussian blob finder with an adaptive threshold.
///
/// The image is scaled to a peak of 0.99. Starting at `start_threshold`, the
/// threshold is halved until at least `min_blobs` are found or it drops
/// below `threshold_floor`.
#[derive(Debug, Clone, PartialEq)]
pub struct BlobDetector {
    pub sigmas: Vec<f64>,
    pub start_threshold: f64,
    pub min_blobs: usize,
    pub threshold_floor: f64,
}

impl Default for BlobDetector {
    fn default() -> Self {
        Self {
            sigmas: vec![1.5, 5.0],
            start_threshold: 0.5,
            min_blobs: 10,
            threshold_floor: 1e-4,
        }
    }
}

impl BlobDetector {
    pub fn detect(&self, image: &Array2<f64>) -> Vec<Blob> {
        let peak = image.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if peak.is_nan() || peak <= 0.0 {
            log::warn!("Image has no positive pixels, nothing to detect");
            return Vec::new();
        }
        let scaled = image.mapv(|v| v * 0.99 / peak);

        let cube: Vec<Array2<f64>> = self
            .sigmas
            .iter()
            .map(|&sigma| log_response(&scaled, sigma))
            .collect();
        let peaks = scale_space_peaks(&cube, &self.sigmas);

        let mut threshold = self.start_threshold;
        loop {
            let candidates: Vec<Blob> = peaks
                .iter()
                .copied()
                .filter(|b| b.response > threshold)
                .collect();
            let blobs = prune_overlapping(candidates);
            if blobs.len() >= self.min_blobs || threshold < self.threshold_floor {
                log::debug!("{} blobs at threshold {:e}", blobs.len(), threshold);
                return blobs;
            }
            threshold /= 2.0;
        }
    }
}

/// A source measured on an intensity map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub position: SkyPosition,
    /// Window pixel of the source.
    pub x: f64,
    pub y: f64,
    /// 7x7 box sum, counts/s.
    pub flux: f64,
}

/// The `limit` detected blobs with the largest box flux.
pub fn brightest_detections(
    window: &Window,
    wcs: &TanWcs,
    detector: &BlobDetector,
    limit: usize,
) -> Vec<Detection> {
    let detections: Vec<Detection> = detector
        .detect(&window.data)
        .into_iter()
        .map(|blob| {
            let (ix, iy) = window.to_image(blob.x, blob.y);
            Detection {
                position: wcs.pixel_to_world(ix, iy),
                x: blob.x,
                y: blob.y,
                flux: box_flux(&window.data, blob.x, blob.y),
            }
        })
        .collect();

    largest_by(detections, limit, |d| d.flux)
}

/// Box flux at each catalogue position.
pub fn forced_photometry(
    window: &Window,
    wcs: &TanWcs,
    positions: &[SkyPosition],
) -> Result<Vec<Detection>> {
    positions
        .iter()
        .map(|position| {
            let (ix, iy) = wcs.world_to_pixel(position).map_err(|e| {
                log::warn!("Catalogue source {} off the tangent plane: {}", position, e);
                PipelineError::OutsideImage
            })?;
            let (x, y) = window.to_window(ix, iy);
            Ok(Detection {
                position: *position,
                x,
                y,
                flux: box_flux(&window.data, x, y),
            })
        })
        .collect()
}
