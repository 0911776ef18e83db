// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Hand-drawn encirclement classification.

use std::f64::consts::PI;

use image::imageops::grayscale;
use image::{GrayImage, RgbImage};
use imageproc::point::Point;
use tracing::debug;

use formwerk_core::config::{ContourConfig, EncirclementConfig};
use formwerk_core::{FieldValue, RegionKind, Result};

use crate::contours::{
    bounding_box, extract_contours, hull, polygon_area, polygon_centroid, polygon_perimeter,
};
use crate::reader::FieldReader;

/// Decides whether an option has been circled.
///
/// Only outermost contours near the crop centre are considered. Each is
/// replaced by its convex hull and must be round enough for its aspect
/// ratio and large enough to surround the option.
#[derive(Debug, Clone, Default)]
pub struct EncirclementDetector {
    contours: ContourConfig,
    config: EncirclementConfig,
}

impl EncirclementDetector {
    pub fn new(contours: ContourConfig, config: EncirclementConfig) -> Self {
        Self { contours, config }
    }

    pub fn is_encircled(&self, gray: &GrayImage) -> bool {
        let (w, h) = gray.dimensions();
        let crop_area = w as f64 * h as f64;
        if crop_area == 0.0 {
            return false;
        }

        let set = extract_contours(gray, &self.contours);
        let largest = set
            .top_level()
            .filter_map(|contour| self.candidate_area(&contour.points, w, h))
            .reduce(f64::max);

        let Some(area) = largest else {
            debug!("No encirclement candidate");
            return false;
        };
        let fraction = area / crop_area;
        let encircled = (self.config.min_area..=self.config.max_area).contains(&fraction);
        debug!(fraction, encircled, "Encirclement classified");
        encircled
    }

    /// Hull area of a contour that is centred, large and round enough to
    /// count as a circling stroke in a `w × h` crop.
    ///
    /// Edge contours often trace a stroke out and back, which encloses no
    /// area, so every test runs on the convex hull.
    fn candidate_area(&self, points: &[Point<i32>], w: u32, h: u32) -> Option<f64> {
        let outline = hull(points);
        let (mx, my) = polygon_centroid(&outline)?;
        let (cx, cy) = (w as f64 / 2.0, h as f64 / 2.0);
        let gate = w.min(h) as f64 / self.config.centroid_gate_divisor;
        if ((mx - cx).powi(2) + (my - cy).powi(2)).sqrt() > gate {
            return None;
        }

        let area = polygon_area(&outline);
        let bbox = bounding_box(&outline);
        if (bbox.area() as f64) < self.config.min_bbox_fraction * w as f64 * h as f64 {
            return None;
        }
        self.is_round_enough(area, polygon_perimeter(&outline), bbox.width, bbox.height)
            .then_some(area)
    }

    /// Circularity `4πA/P²` against a bar that drops as the shape gets more
    /// elongated.
    fn is_round_enough(&self, area: f64, perimeter: f64, width: i32, height: i32) -> bool {
        if perimeter <= 0.0 || width <= 0 || height <= 0 {
            return false;
        }
        let circularity = 4.0 * PI * area / (perimeter * perimeter);
        let (long, short) = (width.max(height) as f64, width.min(height) as f64);
        let aspect = long / short;
        let required = (self.config.circularity_base - self.config.circularity_slope * (aspect - 1.0))
            .max(self.config.circularity_floor);
        circularity > required
    }
}

impl FieldReader for EncirclementDetector {
    fn kind(&self) -> RegionKind {
        RegionKind::Encirclement
    }

    fn read(&self, crop: &RgbImage) -> Result<FieldValue> {
        Ok(FieldValue::Flag(self.is_encircled(&grayscale(crop))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    /// Black where the normalised elliptical radius lies in `[lo, hi]`.
    fn ellipse_ring(w: u32, h: u32, a: f64, b: f64, lo: f64, hi: f64) -> GrayImage {
        let (cx, cy) = (w as f64 / 2.0, h as f64 / 2.0);
        GrayImage::from_fn(w, h, |x, y| {
            let (dx, dy) = ((x as f64 - cx) / a, (y as f64 - cy) / b);
            let r = (dx * dx + dy * dy).sqrt();
            Luma([if (lo..=hi).contains(&r) { 0u8 } else { 255u8 }])
        })
    }

    #[test]
    fn large_circle_is_encircled() {
        let crop = ellipse_ring(200, 200, 72.0, 72.0, 0.97, 1.03);
        assert!(EncirclementDetector::default().is_encircled(&crop));
    }

    #[test]
    fn small_circle_is_not_encircled() {
        let crop = ellipse_ring(200, 200, 25.0, 25.0, 0.92, 1.08);
        assert!(!EncirclementDetector::default().is_encircled(&crop));
    }

    #[test]
    fn elongated_loop_passes_the_relaxed_bar() {
        let crop = ellipse_ring(200, 100, 80.0, 32.0, 0.94, 1.06);
        assert!(EncirclementDetector::default().is_encircled(&crop));
    }

    #[test]
    fn loop_filling_more_than_max_area_is_rejected() {
        let crop = ellipse_ring(200, 200, 72.0, 72.0, 0.97, 1.03);
        let config = EncirclementConfig {
            max_area: 0.30,
            ..EncirclementConfig::default()
        };
        let d = EncirclementDetector::new(ContourConfig::default(), config);
        assert!(!d.is_encircled(&crop));
    }

    /// A circle traced out and back, the way an edge contour follows a stroke.
    fn doubled_back_circle(cx: f64, cy: f64, r: f64) -> Vec<Point<i32>> {
        let forward: Vec<Point<i32>> = (0..72)
            .map(|i| {
                let t = i as f64 * 5.0f64.to_radians();
                Point::new((cx + r * t.cos()).round() as i32, (cy + r * t.sin()).round() as i32)
            })
            .collect();
        let back = forward.iter().rev().skip(1).copied();
        forward.iter().copied().chain(back).collect()
    }

    #[test]
    fn gate_uses_the_hull_of_a_doubled_back_trace() {
        let d = EncirclementDetector::default();
        let trace = doubled_back_circle(100.0, 100.0, 72.0);
        assert!(polygon_centroid(&trace).is_none());
        let area = d.candidate_area(&trace, 200, 200).expect("candidate");
        assert!((area / (PI * 72.0 * 72.0) - 1.0).abs() < 0.05, "{area}");

        let off = doubled_back_circle(60.0, 60.0, 50.0);
        assert!(d.candidate_area(&off, 300, 300).is_none());
    }

    #[test]
    fn off_centre_circle_is_ignored() {
        let mut crop = GrayImage::from_pixel(300, 300, Luma([255u8]));
        let ring = ellipse_ring(120, 120, 50.0, 50.0, 0.95, 1.05);
        for (x, y, p) in ring.enumerate_pixels() {
            crop.put_pixel(x, y, *p);
        }
        assert!(!EncirclementDetector::default().is_encircled(&crop));
    }

    #[test]
    fn straight_stroke_is_not_encircled() {
        let crop = GrayImage::from_fn(200, 200, |_, y| {
            Luma([if (98..102).contains(&y) { 0u8 } else { 255u8 }])
        });
        assert!(!EncirclementDetector::default().is_encircled(&crop));
    }

    #[test]
    fn blank_crop_is_not_encircled() {
        let crop = GrayImage::from_pixel(80, 80, Luma([255u8]));
        assert!(!EncirclementDetector::default().is_encircled(&crop));
    }

    #[test]
    fn roundness_bar_relaxes_with_aspect_ratio() {
        let d = EncirclementDetector::default();
        // Circularity 0.8: too low for a round shape, enough at aspect 2.
        let area = 0.8 / (4.0 * PI);
        assert!(!d.is_round_enough(area, 1.0, 10, 10));
        assert!(d.is_round_enough(area, 1.0, 20, 10));
        assert!(!d.is_round_enough(1.0, 0.0, 10, 10));
    }
}
