// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Anisotropic scale-space filter for word blobs.

use std::f64::consts::PI;

use image::GrayImage;
use imageproc::filter::Kernel as FilterKernel;

/// A square filter kernel, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    size: usize,
    weights: Vec<f64>,
}

impl Kernel {
    /// The word-shaped kernel: a second-derivative-of-Gaussian response
    /// stretched `theta` times wider than tall, normalised to sum to one.
    ///
    /// `size` must be odd.
    pub fn anisotropic(size: usize, sigma: f64, theta: f64) -> Self {
        let half = (size / 2) as f64;
        let sigma_y = sigma;
        let sigma_x = sigma * theta;

        let mut weights = Vec::with_capacity(size * size);
        for row in 0..size {
            let y = row as f64 - half;
            for col in 0..size {
                let x = col as f64 - half;
                let envelope = (-x * x / (2.0 * sigma_x) - y * y / (2.0 * sigma_y)).exp();
                let x_term = (x * x - sigma_x * sigma_x) / (2.0 * PI * sigma_x.powi(5) * sigma_y);
                let y_term = (y * y - sigma_y * sigma_y) / (2.0 * PI * sigma_y.powi(5) * sigma_x);
                weights.push((x_term + y_term) * envelope);
            }
        }

        let total: f64 = weights.iter().sum();
        if total != 0.0 {
            weights.iter_mut().for_each(|w| *w /= total);
        }
        Self { size, weights }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn weight(&self, col: usize, row: usize) -> f64 {
        self.weights[row * self.size + col]
    }

    /// Correlate `image` with the kernel, replicating edge pixels and
    /// saturating the result to `0..=255`.
    pub fn apply(&self, image: &GrayImage) -> GrayImage {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 || self.size == 0 {
            return GrayImage::new(w, h);
        }
        let side = self.size as u32;
        FilterKernel::new(&self.weights, side, side)
            .filter(image, |out: &mut u8, acc: f64| *out = acc.round().clamp(0.0, 255.0) as u8)
    }
}
