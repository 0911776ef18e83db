// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Synthetic fixtures shared by the unit tests.

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::markers::dictionary::{Dictionary, render_marker};

/// A 4×4 family whose only set corner bit is the top-left one, so every id
/// reads differently in each orientation.
pub(crate) fn dictionary() -> Dictionary {
    Dictionary {
        name: "test_4x4".into(),
        marker_size: 4,
        max_correction_bits: 0,
        codes: vec![1057, 579, 8337, 18693],
    }
}

pub(crate) fn paste_gray(canvas: &mut GrayImage, patch: &GrayImage, x: u32, y: u32) {
    for (px, py, p) in patch.enumerate_pixels() {
        canvas.put_pixel(x + px, y + py, *p);
    }
}

pub(crate) fn paste_rgb(canvas: &mut RgbImage, patch: &GrayImage, x: u32, y: u32) {
    for (px, py, p) in patch.enumerate_pixels() {
        let v = p.0[0];
        canvas.put_pixel(x + px, y + py, Rgb([v, v, v]));
    }
}

/// Page size of [`synthetic_page`].
pub(crate) const PAGE_W: u32 = 640;
pub(crate) const PAGE_H: u32 = 840;

/// A white 640×840 page with markers 0..=3 in the TL, TR, BR, BL corners
/// (60 px each, 20 px from the edges) and a checkbox drawn at
/// x 220..300, y 320..400.
///
/// Aligned to 600×800 the marker outer corners land on the page corners
/// and the checkbox moves to roughly x 200..280, y 300..380.
pub(crate) fn synthetic_page(checked: bool) -> RgbImage {
    let dict = dictionary();
    let mut page = RgbImage::from_pixel(PAGE_W, PAGE_H, Rgb([255, 255, 255]));
    let spots = [(0u32, 20u32, 20u32), (1, 560, 20), (2, 560, 760), (3, 20, 760)];
    for (id, x, y) in spots {
        if let Some(marker) = render_marker(&dict, id, 10) {
            paste_rgb(&mut page, &marker, x, y);
        }
    }

    for inset in 0..3 {
        draw_hollow_rect_mut(
            &mut page,
            Rect::at(220 + inset, 320 + inset).of_size(80 - 2 * inset as u32, 80 - 2 * inset as u32),
            Rgb([0, 0, 0]),
        );
    }
    if checked {
        draw_filled_rect_mut(&mut page, Rect::at(235, 335).of_size(50, 50), Rgb([0, 0, 0]));
    }
    page
}

/// A 100×100 white crop with a 3 px box outline at 10..90 whose interior
/// is filled over the left `fill` fraction of its width.
pub(crate) fn checkbox_crop(fill: f64) -> GrayImage {
    let mut crop = GrayImage::from_pixel(100, 100, Luma([255u8]));
    for inset in 0..3 {
        draw_hollow_rect_mut(
            &mut crop,
            Rect::at(10 + inset, 10 + inset).of_size(80 - 2 * inset as u32, 80 - 2 * inset as u32),
            Luma([0u8]),
        );
    }
    let inner = 74.0;
    let width = (inner * fill).round() as u32;
    if width > 0 {
        draw_filled_rect_mut(&mut crop, Rect::at(13, 13).of_size(width, 74), Luma([0u8]));
    }
    crop
}

/// Word-like ink blobs on white: `(x, y, width, height)` rectangles.
pub(crate) fn blobs(width: u32, height: u32, rects: &[(i32, i32, u32, u32)]) -> RgbImage {
    let mut img = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    for &(x, y, w, h) in rects {
        draw_filled_rect_mut(&mut img, Rect::at(x, y).of_size(w, h), Rgb([0, 0, 0]));
    }
    img
}
