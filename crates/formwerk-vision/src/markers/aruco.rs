// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Square binary fiducial detector.
//
// Candidates come from the outer contours of an adaptively thresholded
// image. Each candidate is fitted with a quadrilateral, rectified into a
// small patch, read cell by cell and matched against the dictionary in all
// four orientations.

use std::collections::BTreeMap;

use image::{GrayImage, Luma};
use imageproc::contours::{BorderType, find_contours};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use imageproc::point::Point;
use rayon::prelude::*;
use tracing::{debug, instrument, warn};

use formwerk_core::config::MarkerConfig;
use formwerk_core::{DetectedMarker, PointF, Result};

use super::MarkerDetector;
use super::dictionary::{Dictionary, Matcher};
use crate::contours::{hull, polygon_area, polygon_perimeter};
use crate::threshold::adaptive_binarize;

/// Shortest accepted quad side, in pixels.
const MIN_SIDE_PX: f64 = 4.0;

/// Cell means closer together than this carry no readable pattern.
const MIN_CELL_CONTRAST: f64 = 30.0;

/// Detector for one marker dictionary.
#[derive(Debug, Clone)]
pub struct ArucoDetector {
    matcher: Matcher,
    config: MarkerConfig,
}

/// A fitted candidate outline, corners clockwise from the one with the
/// smallest polar angle.
#[derive(Debug, Clone, Copy)]
struct Quad {
    corners: [PointF; 4],
    area: f64,
}

impl ArucoDetector {
    /// Build a detector. The Hamming limit comes from `config.max_hamming`
    /// when set, otherwise from the dictionary.
    pub fn new(dictionary: &Dictionary, config: MarkerConfig) -> Result<Self> {
        dictionary.validate()?;
        let max_hamming = config
            .max_hamming
            .unwrap_or(dictionary.max_correction_bits);
        Ok(Self {
            matcher: Matcher::new(dictionary, max_hamming),
            config,
        })
    }

    fn candidates(&self, gray: &GrayImage) -> Vec<Quad> {
        let binary = adaptive_binarize(
            gray,
            self.config.threshold_radius,
            self.config.threshold_offset,
        );
        let contours = find_contours::<i32>(&binary);

        let quads: Vec<Quad> = contours
            .iter()
            .filter(|c| c.border_type == BorderType::Outer)
            .filter(|c| polygon_perimeter(&c.points) >= self.config.min_perimeter)
            .filter_map(|c| fit_quad(&c.points, self.config.min_quad_fill))
            .collect();

        debug!(contours = contours.len(), quads = quads.len(), "Marker candidates");
        quads
    }

    /// Rectify a candidate and read its inner bits. `None` when the patch
    /// has no contrast or its border is not black.
    fn read_bits(&self, gray: &GrayImage, quad: &Quad) -> Option<u64> {
        let n = self.matcher.marker_size();
        let cells = n + 2;
        let cell_px = self.config.sample_cell_px;
        let side = (cells * cell_px) as f32;

        let src = quad.corners.map(|p| (p.x, p.y));
        let dst = [(0.0, 0.0), (side, 0.0), (side, side), (0.0, side)];
        let projection = Projection::from_control_points(src, dst)?;

        let mut patch = GrayImage::new(cells * cell_px, cells * cell_px);
        warp_into(
            gray,
            &projection,
            Interpolation::Bilinear,
            Luma([255u8]),
            &mut patch,
        );

        let means = cell_means(&patch, cells, cell_px);
        let threshold = cell_threshold(&means)?;
        let black = |cx: u32, cy: u32| means[(cy * cells + cx) as usize] < threshold;

        let mut border_black = 0u32;
        let mut border_total = 0u32;
        for cy in 0..cells {
            for cx in 0..cells {
                if cx == 0 || cy == 0 || cx == cells - 1 || cy == cells - 1 {
                    border_total += 1;
                    if black(cx, cy) {
                        border_black += 1;
                    }
                }
            }
        }
        if (border_black as f64 / border_total as f64) < self.config.min_border_score {
            return None;
        }

        let mut code = 0u64;
        for y in 0..n {
            for x in 0..n {
                if black(x + 1, y + 1) {
                    code |= 1u64 << (y * n + x);
                }
            }
        }
        Some(code)
    }

    fn decode(&self, gray: &GrayImage, quad: &Quad) -> Option<(DetectedMarker, f64)> {
        let code = self.read_bits(gray, quad)?;
        let found = self.matcher.match_code(code)?;

        // observed = rotate(code, r): the marker's own top-left sits at
        // patch corner r.
        let r = found.rotation as usize;
        let corners = [0, 1, 2, 3].map(|i| quad.corners[(i + r) % 4]);
        Some((
            DetectedMarker {
                id: found.id,
                corners,
            },
            quad.area,
        ))
    }
}

impl MarkerDetector for ArucoDetector {
    #[instrument(skip_all, fields(width = gray.width(), height = gray.height()))]
    fn detect(&self, gray: &GrayImage) -> Vec<DetectedMarker> {
        let quads = self.candidates(gray);

        let decoded: Vec<(DetectedMarker, f64)> = quads
            .par_iter()
            .filter_map(|quad| self.decode(gray, quad))
            .collect();

        let mut best: BTreeMap<u32, (DetectedMarker, f64)> = BTreeMap::new();
        for (marker, area) in decoded {
            match best.get(&marker.id) {
                Some((_, kept)) if *kept >= area => {
                    warn!(id = marker.id, "Smaller duplicate marker discarded");
                }
                Some(_) => {
                    warn!(id = marker.id, "Duplicate marker replaced by a larger one");
                    best.insert(marker.id, (marker, area));
                }
                None => {
                    best.insert(marker.id, (marker, area));
                }
            }
        }

        debug!(decoded = best.len(), "Markers decoded");
        best.into_values().map(|(marker, _)| marker).collect()
    }
}

// -- Quad fitting -------------------------------------------------------------

/// Fit a quadrilateral to a contour through its convex hull.
fn fit_quad(points: &[Point<i32>], min_fill: f64) -> Option<Quad> {
    let hull = hull(points);
    if hull.len() < 4 {
        return None;
    }

    let n = hull.len() as f64;
    let (sx, sy) = hull
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x as f64, sy + p.y as f64));
    let (cx, cy) = (sx / n, sy / n);

    let dist2 = |a: &Point<i32>, bx: f64, by: f64| {
        let (dx, dy) = (a.x as f64 - bx, a.y as f64 - by);
        dx * dx + dy * dy
    };

    let p0 = *hull
        .iter()
        .max_by(|a, b| dist2(*a, cx, cy).total_cmp(&dist2(*b, cx, cy)))?;
    let p2 = *hull.iter().max_by(|a, b| {
        dist2(*a, p0.x as f64, p0.y as f64).total_cmp(&dist2(*b, p0.x as f64, p0.y as f64))
    })?;

    let side = |p: &Point<i32>| {
        (p2.x - p0.x) as f64 * (p.y - p0.y) as f64 - (p2.y - p0.y) as f64 * (p.x - p0.x) as f64
    };
    let p1 = *hull.iter().max_by(|a, b| side(*a).total_cmp(&side(*b)))?;
    let p3 = *hull.iter().min_by(|a, b| side(*a).total_cmp(&side(*b)))?;
    if side(&p1) <= 0.0 || side(&p3) >= 0.0 {
        return None;
    }

    let outline = [p0, p1, p2, p3];
    let quad_area = polygon_area(&outline);
    let hull_area = polygon_area(&hull);
    if hull_area <= 0.0 || quad_area / hull_area < min_fill {
        return None;
    }
    for i in 0..4 {
        let (a, b) = (outline[i], outline[(i + 1) % 4]);
        if dist2(&a, b.x as f64, b.y as f64).sqrt() < MIN_SIDE_PX {
            return None;
        }
    }

    Some(Quad {
        corners: order_clockwise(outline),
        area: quad_area,
    })
}

/// Sort by polar angle around the centre. With y pointing down, ascending
/// angle runs clockwise on screen starting from the upper-left quadrant.
fn order_clockwise(points: [Point<i32>; 4]) -> [PointF; 4] {
    let cx = points.iter().map(|p| p.x as f32).sum::<f32>() / 4.0;
    let cy = points.iter().map(|p| p.y as f32).sum::<f32>() / 4.0;
    let mut corners = points.map(|p| PointF::new(p.x as f32, p.y as f32));
    corners.sort_by(|a, b| {
        (a.y - cy)
            .atan2(a.x - cx)
            .total_cmp(&(b.y - cy).atan2(b.x - cx))
    });
    corners
}

// -- Cell sampling ------------------------------------------------------------

/// Mean intensity of the central half of every cell, row-major.
fn cell_means(patch: &GrayImage, cells: u32, cell_px: u32) -> Vec<f64> {
    let margin = cell_px / 4;
    let mut means = Vec::with_capacity((cells * cells) as usize);
    for cy in 0..cells {
        for cx in 0..cells {
            let (x0, y0) = (cx * cell_px + margin, cy * cell_px + margin);
            let (x1, y1) = ((cx + 1) * cell_px - margin, (cy + 1) * cell_px - margin);
            let mut sum = 0u64;
            let mut count = 0u64;
            for y in y0..y1.max(y0 + 1) {
                for x in x0..x1.max(x0 + 1) {
                    sum += patch.get_pixel(x, y).0[0] as u64;
                    count += 1;
                }
            }
            means.push(sum as f64 / count as f64);
        }
    }
    means
}

/// Otsu split of the cell means. `None` when the cells are too uniform to
/// separate black from white.
fn cell_threshold(means: &[f64]) -> Option<f64> {
    let mut sorted = means.to_vec();
    sorted.sort_by(f64::total_cmp);
    let (lo, hi) = (*sorted.first()?, *sorted.last()?);
    if hi - lo < MIN_CELL_CONTRAST {
        return None;
    }

    let total: f64 = sorted.iter().sum();
    let count = sorted.len() as f64;
    let mut best = (f64::MIN, (lo + hi) / 2.0);
    let mut low_sum = 0.0;
    for k in 1..sorted.len() {
        low_sum += sorted[k - 1];
        if sorted[k] == sorted[k - 1] {
            continue;
        }
        let w0 = k as f64 / count;
        let w1 = 1.0 - w0;
        let m0 = low_sum / k as f64;
        let m1 = (total - low_sum) / (count - k as f64);
        let between = w0 * w1 * (m0 - m1) * (m0 - m1);
        if between > best.0 {
            best = (between, (sorted[k - 1] + sorted[k]) / 2.0);
        }
    }
    Some(best.1)
}
