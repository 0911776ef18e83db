// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contour extraction shared by the mark detectors, plus the polygon
// measurements they are built from.

use image::GrayImage;
use imageproc::contours::{BorderType, Contour, find_contours};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometry::{arc_length, contour_area, convex_hull, oriented_contour_area};
use imageproc::point::Point;
use tracing::debug;

use formwerk_core::BBox;
use formwerk_core::config::ContourConfig;

use crate::threshold::{Polarity, otsu_binarize};

/// Output of [`extract_contours`].
#[derive(Debug, Clone)]
pub struct ContourSet {
    /// The Otsu-binarized crop: paper 255, ink 0.
    pub binary: GrayImage,
    /// Every contour traced from the edge map of `binary`.
    pub contours: Vec<Contour<i32>>,
}

impl ContourSet {
    /// Contours that are not nested inside another contour.
    pub fn top_level(&self) -> impl Iterator<Item = &Contour<i32>> {
        self.contours
            .iter()
            .filter(|c| c.parent.is_none() && c.border_type == BorderType::Outer)
    }
}

/// Binarize, blur lightly, run Canny and trace every contour.
pub fn extract_contours(gray: &GrayImage, config: &ContourConfig) -> ContourSet {
    let binary = otsu_binarize(gray, Polarity::Bright);
    let blurred = gaussian_blur_f32(&binary, config.blur_sigma);
    let edges = canny(&blurred, config.canny_low, config.canny_high);
    let contours = find_contours::<i32>(&edges);
    debug!(count = contours.len(), "Contours extracted");
    ContourSet { binary, contours }
}

// -- Polygon measurements -----------------------------------------------------

/// Tight bounding box of a point set, counting both end pixels.
pub fn bounding_box(points: &[Point<i32>]) -> BBox {
    let Some(first) = points.first() else {
        return BBox::default();
    };
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    BBox::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1)
}

/// Area enclosed by a closed polygon.
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    contour_area(points)
}

/// Perimeter of a closed polygon.
pub fn polygon_perimeter(points: &[Point<i32>]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    arc_length(points, true)
}

/// Area centroid of a closed polygon, `None` when it encloses no area.
pub fn polygon_centroid(points: &[Point<i32>]) -> Option<(f64, f64)> {
    let area = oriented_contour_area(points);
    if area.abs() < f64::EPSILON {
        return None;
    }
    let n = points.len();
    let (mut cx, mut cy) = (0.0f64, 0.0f64);
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let cross = a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64;
        cx += (a.x + b.x) as f64 * cross;
        cy += (a.y + b.y) as f64 * cross;
    }
    Some((cx / (6.0 * area), cy / (6.0 * area)))
}

/// Convex hull of a point set.
pub fn hull(points: &[Point<i32>]) -> Vec<Point<i32>> {
    if points.len() < 3 {
        return points.to_vec();
    }
    convex_hull(points)
}
