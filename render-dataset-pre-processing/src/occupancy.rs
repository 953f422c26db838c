/// Foreground occupancy measurement for rendered views.
use constants::{FOREGROUND_ALPHA_CUTOFF, FOREGROUND_COLOR_TOLERANCE};
use image::DynamicImage;
use std::path::PathBuf;

/// Occupancy statistics aggregated over one model's views.
#[derive(Debug, Clone, Copy)]
pub struct ModelOccupancy {
    /// Mean foreground ratio across readable views.
    pub mean: f64,
    /// Views that contributed to the mean.
    pub views: usize,
    /// Views that could not be read.
    pub failed: usize,
}

/// Fraction of pixels classified as foreground in a single view.
///
/// Renders use a transparent background film, so the alpha channel is the
/// primary signal. Images without alpha fall back to a colour difference
/// against the mean border colour.
pub fn image_occupancy(image: &DynamicImage) -> f64 {
    if image.color().has_alpha() {
        alpha_occupancy(image)
    } else {
        color_occupancy(image)
    }
}

fn alpha_occupancy(image: &DynamicImage) -> f64 {
    let rgba = image.to_rgba8();
    let total = rgba.width() as u64 * rgba.height() as u64;
    if total == 0 {
        return 0.0;
    }

    let foreground = rgba
        .pixels()
        .filter(|pixel| pixel.0[3] > FOREGROUND_ALPHA_CUTOFF)
        .count() as u64;

    foreground as f64 / total as f64
}

fn color_occupancy(image: &DynamicImage) -> f64 {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    let total = width as u64 * height as u64;
    if total == 0 {
        return 0.0;
    }

    // Estimate the background as the mean of the border pixels.
    let mut sums = [0u64; 3];
    let mut samples = 0u64;
    for (x, y, pixel) in rgb.enumerate_pixels() {
        if x == 0 || y == 0 || x == width - 1 || y == height - 1 {
            for c in 0..3 {
                sums[c] += pixel.0[c] as u64;
            }
            samples += 1;
        }
    }
    let background = [
        (sums[0] / samples) as i32,
        (sums[1] / samples) as i32,
        (sums[2] / samples) as i32,
    ];

    let tolerance = FOREGROUND_COLOR_TOLERANCE as i32;
    let foreground = rgb
        .pixels()
        .filter(|pixel| {
            (0..3).any(|c| (pixel.0[c] as i32 - background[c]).abs() > tolerance)
        })
        .count() as u64;

    foreground as f64 / total as f64
}

/// Mean occupancy over a model's views. Unreadable views are warned and
/// excluded from the mean rather than failing the model outright.
pub fn model_occupancy(view_paths: &[PathBuf]) -> ModelOccupancy {
    let mut sum = 0.0;
    let mut views = 0usize;
    let mut failed = 0usize;

    for path in view_paths {
        match image::open(path) {
            Ok(image) => {
                sum += image_occupancy(&image);
                views += 1;
            }
            Err(err) => {
                eprintln!("Warning: unreadable view {}: {}", path.display(), err);
                failed += 1;
            }
        }
    }

    ModelOccupancy {
        mean: if views > 0 { sum / views as f64 } else { 0.0 },
        views,
        failed,
    }
}
