// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Morphology with rectangular structuring elements, on imageproc masks.
//
// The anchor of a `k`-long side sits at `k / 2`, so even sizes reach one
// pixel further back than forward. Pixels outside the image take no part:
// dilation never grows in from the edge and erosion never eats in from it.

use image::{GrayImage, Luma};
use imageproc::morphology::{Mask, grayscale_close, grayscale_dilate, grayscale_erode};

/// Longest rectangle side a mask can hold.
pub const MAX_SIDE: u32 = 511;

/// A solid `width × height` element, each side clamped to `1..=MAX_SIDE`.
pub fn rect_mask(width: u32, height: u32) -> Mask {
    let (w, h) = (width.clamp(1, MAX_SIDE), height.clamp(1, MAX_SIDE));
    let solid = GrayImage::from_pixel(w, h, Luma([255u8]));
    Mask::from_image(&solid, (w / 2) as u8, (h / 2) as u8)
}

/// Dilate with a `width × height` rectangle.
pub fn dilate_rect(image: &GrayImage, width: u32, height: u32) -> GrayImage {
    grayscale_dilate(image, &rect_mask(width, height))
}

/// Erode with a `width × height` rectangle.
pub fn erode_rect(image: &GrayImage, width: u32, height: u32) -> GrayImage {
    grayscale_erode(image, &rect_mask(width, height))
}

/// Closing: dilation then erosion with the same rectangle.
pub fn close_rect(image: &GrayImage, width: u32, height: u32) -> GrayImage {
    grayscale_close(image, &rect_mask(width, height))
}

/// Pixel-wise maximum of two equally sized images.
pub fn union(a: &GrayImage, b: &GrayImage) -> GrayImage {
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        Luma([a.get_pixel(x, y).0[0].max(b.get_pixel(x, y).0[0])])
    })
}
