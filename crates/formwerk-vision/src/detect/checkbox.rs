// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Checkbox classification.

use image::imageops::grayscale;
use image::{GrayImage, RgbImage};
use tracing::debug;

use formwerk_core::config::{CheckboxConfig, ContourConfig};
use formwerk_core::{BBox, FieldValue, RegionKind, Result};

use crate::contours::{bounding_box, extract_contours};
use crate::reader::FieldReader;
use crate::region::crop_box;
use crate::threshold::foreground_fraction;

/// Decides whether a checkbox crop is ticked or filled.
///
/// The widest contour is taken to be the box outline. Its interior, inset
/// to stay clear of the stroke, is checked when too little of it is paper.
#[derive(Debug, Clone, Default)]
pub struct CheckboxDetector {
    contours: ContourConfig,
    config: CheckboxConfig,
}

impl CheckboxDetector {
    pub fn new(contours: ContourConfig, config: CheckboxConfig) -> Self {
        Self { contours, config }
    }

    pub fn is_checked(&self, gray: &GrayImage) -> bool {
        let set = extract_contours(gray, &self.contours);
        let Some(outline) = set
            .contours
            .iter()
            .map(|c| bounding_box(&c.points))
            .max_by_key(BBox::area)
        else {
            debug!("No contour in checkbox crop");
            return false;
        };

        let dx = (outline.width as f64 * self.config.horizontal_indent) as i32;
        let dy = (outline.height as f64 * self.config.vertical_indent) as i32;
        let interior = BBox::from_edges(
            outline.x + dx,
            outline.y + dy,
            outline.right() - dx,
            outline.bottom() - dy,
        );

        let Some(inside) = crop_box(&set.binary, interior) else {
            debug!(?outline, "Checkbox interior is empty");
            return false;
        };

        let paper = foreground_fraction(&inside);
        let checked = paper < self.config.fill_threshold;
        debug!(?outline, paper, checked, "Checkbox classified");
        checked
    }
}

impl FieldReader for CheckboxDetector {
    fn kind(&self) -> RegionKind {
        RegionKind::Checkbox
    }

    fn read(&self, crop: &RgbImage) -> Result<FieldValue> {
        Ok(FieldValue::Flag(self.is_checked(&grayscale(crop))))
    }
}
