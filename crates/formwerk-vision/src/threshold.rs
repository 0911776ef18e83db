// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Binarization: global Otsu thresholding and local-mean adaptive
// thresholding over imageproc's integral image.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::contrast::otsu_level;
use imageproc::definitions::Image;
use imageproc::integral_image::{integral_image, sum_image_pixels};
use tracing::debug;

/// Which side of the threshold becomes foreground (255).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Bright pixels become 255: paper stays white, ink goes black.
    Bright,
    /// Dark pixels become 255: ink is foreground.
    Dark,
}

/// Binarize with an automatically chosen (Otsu) global threshold.
///
/// An image with a single intensity has no foreground under either
/// polarity and comes back all zero.
pub fn otsu_binarize(gray: &GrayImage, polarity: Polarity) -> GrayImage {
    let (width, height) = gray.dimensions();
    if is_uniform(gray) {
        return GrayImage::new(width, height);
    }

    let level = otsu_level(gray);
    debug!(level, ?polarity, "Otsu threshold computed");

    ImageBuffer::from_fn(width, height, |x, y| {
        let bright = gray.get_pixel(x, y).0[0] > level;
        let on = match polarity {
            Polarity::Bright => bright,
            Polarity::Dark => !bright,
        };
        Luma([if on { 255u8 } else { 0u8 }])
    })
}

/// Local-mean adaptive threshold with ink as foreground.
///
/// For each pixel the threshold is the mean intensity within a `radius`
/// neighbourhood minus `offset`. Pixels darker than their local threshold
/// become 255, everything else 0.
pub fn adaptive_binarize(gray: &GrayImage, radius: u32, offset: i32) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return GrayImage::new(width, height);
    }
    let integral: Image<Luma<u64>> = integral_image::<_, u64>(gray);

    ImageBuffer::from_fn(width, height, |x, y| {
        let local_mean = window_mean(&integral, (width, height), x, y, radius);
        let threshold = (local_mean.round() as i32).saturating_sub(offset).clamp(0, 255);
        let ink = (gray.get_pixel(x, y).0[0] as i32) < threshold;
        Luma([if ink { 255u8 } else { 0u8 }])
    })
}

/// Mean of the `2 * radius + 1` square around `(x, y)`, clipped to the image.
fn window_mean(
    integral: &Image<Luma<u64>>,
    (width, height): (u32, u32),
    x: u32,
    y: u32,
    radius: u32,
) -> f64 {
    let left = x.saturating_sub(radius);
    let top = y.saturating_sub(radius);
    let right = x.saturating_add(radius).min(width - 1);
    let bottom = y.saturating_add(radius).min(height - 1);

    let [sum] = sum_image_pixels(integral, left, top, right, bottom);
    let count = (right - left + 1) as u64 * (bottom - top + 1) as u64;
    sum as f64 / count as f64
}

/// Fraction of non-zero pixels.
pub fn foreground_fraction(binary: &GrayImage) -> f64 {
    let total = binary.width() as u64 * binary.height() as u64;
    if total == 0 {
        return 0.0;
    }
    let on = binary.pixels().filter(|p| p.0[0] != 0).count() as u64;
    on as f64 / total as f64
}

fn is_uniform(gray: &GrayImage) -> bool {
    let mut pixels = gray.pixels();
    match pixels.next() {
        Some(first) => pixels.all(|p| p == first),
        None => true,
    }
}
