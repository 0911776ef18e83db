// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Diagnostic drawing on an aligned page. Nothing here feeds back into
// detection; callers draw on a copy they intend to save or show.

use image::imageops::grayscale;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_cross_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use formwerk_core::{BBox, MarkerMap};

use crate::pipeline::LocatedRegion;
use crate::region::crop_box;
use crate::segment::{WordBox, weighted_centroid};
use crate::threshold::{Polarity, otsu_binarize};

pub const MARKER_COLOUR: Rgb<u8> = Rgb([0, 160, 0]);
pub const REGION_COLOUR: Rgb<u8> = Rgb([0, 64, 255]);
pub const WORD_COLOUR: Rgb<u8> = Rgb([220, 0, 0]);

fn outline(canvas: &mut RgbImage, bbox: BBox, colour: Rgb<u8>) {
    if bbox.is_empty() {
        return;
    }
    let rect = Rect::at(bbox.x, bbox.y).of_size(bbox.width as u32, bbox.height as u32);
    draw_hollow_rect_mut(canvas, rect, colour);
}

/// Outline each marker's quad and cross its centre.
pub fn draw_markers(canvas: &mut RgbImage, markers: &MarkerMap) {
    for marker in markers.iter() {
        let c = marker.corners;
        for i in 0..4 {
            let (a, b) = (c[i], c[(i + 1) % 4]);
            draw_line_segment_mut(canvas, (a.x, a.y), (b.x, b.y), MARKER_COLOUR);
        }
        draw_cross_mut(canvas, MARKER_COLOUR, marker.center.x, marker.center.y);
    }
}

/// Outline located region boxes.
pub fn draw_regions(canvas: &mut RgbImage, regions: &[LocatedRegion]) {
    for region in regions {
        outline(canvas, region.bbox, REGION_COLOUR);
    }
}

/// Outline word boxes found in a crop whose top-left sits at `origin` on
/// `canvas`, and cross each word's ink centroid.
pub fn draw_word_boxes(canvas: &mut RgbImage, origin: (i32, i32), words: &[WordBox]) {
    let (ox, oy) = origin;
    let placed: Vec<BBox> = words
        .iter()
        .map(|w| BBox::new(w.bbox.x + ox, w.bbox.y + oy, w.bbox.width, w.bbox.height))
        .collect();

    // Centroids come from the untouched page, before any outline is drawn.
    let centroids: Vec<Option<(i32, i32)>> = placed
        .iter()
        .map(|&bbox| {
            let word = crop_box(&*canvas, bbox)?;
            let ink = otsu_binarize(&grayscale(&word), Polarity::Dark);
            let (cx, cy) = weighted_centroid(&ink)?;
            Some((bbox.x.max(0) + cx as i32, bbox.y.max(0) + cy as i32))
        })
        .collect();

    for (bbox, centroid) in placed.into_iter().zip(centroids) {
        outline(canvas, bbox, WORD_COLOUR);
        if let Some((x, y)) = centroid {
            draw_cross_mut(canvas, WORD_COLOUR, x, y);
        }
    }
}
