// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scale-space word segmentation.
//
// Pipeline for one colour crop:
//   1. Grayscale, Otsu threshold with ink as foreground.
//   2. Close rule lines inside the page-edge band.
//   3. Inpaint the thresholded image under those lines.
//   4. Dilate, then filter with the anisotropic word kernel.
//   5. Otsu again, take outer contours as word boxes.
//   6. Group the boxes into lines and sort for reading.

pub mod kernel;
pub mod lines;

use image::imageops::grayscale;
use image::{GrayImage, Luma, RgbImage};
use imageproc::contours::{BorderType, find_contours};
use tracing::{debug, instrument};

use formwerk_core::BBox;
use formwerk_core::config::SegmentationConfig;

use crate::contours::bounding_box;
use crate::inpaint::inpaint;
use crate::morphology::{close_rect, dilate_rect, union};
use crate::region::crop_box;
use crate::threshold::{Polarity, otsu_binarize};

pub use kernel::Kernel;
pub use lines::{dbscan, group_lines, line_distance};

/// One word on a text crop, in reading order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordBox {
    /// Padded box, clipped to the crop.
    pub bbox: BBox,
    /// Zero-based line number, top to bottom.
    pub line: usize,
}

impl WordBox {
    pub fn pad(&self, px: i32) -> Self {
        Self {
            bbox: self.bbox.pad(px),
            ..*self
        }
    }

    pub fn clamp(&self, max_width: u32, max_height: u32) -> Self {
        Self {
            bbox: self.bbox.clamp(max_width, max_height),
            ..*self
        }
    }

    pub fn area(&self) -> i64 {
        self.bbox.area()
    }

    pub fn corners(&self) -> [formwerk_core::Point; 4] {
        self.bbox.corners()
    }

    /// Copy this word out of `image`. `None` if it lies outside.
    pub fn crop(&self, image: &RgbImage) -> Option<RgbImage> {
        crop_box(image, self.bbox)
    }
}

/// Splits a text crop into word boxes.
#[derive(Debug, Clone)]
pub struct WordSegmenter {
    config: SegmentationConfig,
    kernel: Kernel,
}

impl Default for WordSegmenter {
    fn default() -> Self {
        Self::new(SegmentationConfig::default())
    }
}

impl WordSegmenter {
    pub fn new(config: SegmentationConfig) -> Self {
        let kernel = Kernel::anisotropic(config.kernel_size, config.sigma, config.theta);
        Self { config, kernel }
    }

    /// Word boxes in reading order. A crop with no ink gives an empty list.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn segment(&self, image: &RgbImage) -> Vec<WordBox> {
        self.segment_lines(image)
            .into_iter()
            .enumerate()
            .flat_map(|(line, boxes)| boxes.into_iter().map(move |bbox| WordBox { bbox, line }))
            .collect()
    }

    /// Word boxes grouped per line, lines top to bottom.
    pub fn segment_lines(&self, image: &RgbImage) -> Vec<Vec<BBox>> {
        let boxes = self.word_boxes(image);
        if boxes.is_empty() {
            return Vec::new();
        }
        let lines = group_lines(
            &boxes,
            self.config.max_line_distance,
            self.config.min_words_per_line,
        );
        debug!(words = boxes.len(), lines = lines.len(), "Words grouped into lines");
        lines
    }

    /// Unordered, padded word boxes.
    pub fn word_boxes(&self, image: &RgbImage) -> Vec<BBox> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Vec::new();
        }
        let gray = grayscale(image);
        let ink = otsu_binarize(&gray, Polarity::Dark);

        let rules = self.border_rules(&ink);
        let cleaned = inpaint(&ink, &rules, self.config.inpaint_radius);
        let dilated = dilate_rect(&cleaned, self.config.dilation, self.config.dilation);
        let response = self.kernel.apply(&dilated);
        let blobs = otsu_binarize(&response, Polarity::Bright);

        let contours = find_contours::<i32>(&blobs);
        let boxes: Vec<BBox> = contours
            .iter()
            .filter(|c| c.parent.is_none() && c.border_type == BorderType::Outer)
            .map(|c| bounding_box(&c.points))
            .filter(|b| b.area() >= self.config.min_area)
            .map(|b| b.pad(self.config.padding_px).clamp(w, h))
            .filter(|b| !b.is_empty())
            .collect();

        debug!(contours = contours.len(), words = boxes.len(), "Word candidates");
        boxes
    }

    /// Ink inside the page-edge band, with horizontal and vertical rule
    /// lines closed up.
    fn border_rules(&self, ink: &GrayImage) -> GrayImage {
        let (w, h) = ink.dimensions();
        let band = self.config.border_px;
        let border = GrayImage::from_fn(w, h, |x, y| {
            let in_band = x < band || y < band || x + band >= w || y + band >= h;
            if in_band { *ink.get_pixel(x, y) } else { Luma([0u8]) }
        });

        let k = self.config.line_px;
        let horizontal = close_rect(&border, k, 1);
        let vertical = close_rect(&border, 1, k);
        union(&horizontal, &vertical)
    }
}

/// Intensity-weighted centroid of a grayscale word crop, rounded, relative
/// to the crop. `None` for an all-black crop.
pub fn weighted_centroid(gray: &GrayImage) -> Option<(u32, u32)> {
    let (mut total, mut sx, mut sy) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y, p) in gray.enumerate_pixels() {
        let v = p.0[0] as f64;
        total += v;
        sx += v * x as f64;
        sy += v * y as f64;
    }
    if total == 0.0 {
        return None;
    }
    Some(((sx / total).round() as u32, (sy / total).round() as u32))
}
