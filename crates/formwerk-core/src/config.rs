// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration. Every heuristic threshold used by the detectors is
// a named field here, with the calibrated value as its default.

use serde::{Deserialize, Serialize};

use crate::error::{FormwerkError, Result};

/// Settings for one complete document pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub alignment: AlignmentConfig,
    pub markers: MarkerConfig,
    pub contours: ContourConfig,
    pub checkbox: CheckboxConfig,
    pub encirclement: EncirclementConfig,
    pub segmentation: SegmentationConfig,
    pub text: TextConfig,
    /// Read regions on the rayon thread pool.
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            alignment: AlignmentConfig::default(),
            markers: MarkerConfig::default(),
            contours: ContourConfig::default(),
            checkbox: CheckboxConfig::default(),
            encirclement: EncirclementConfig::default(),
            segmentation: SegmentationConfig::default(),
            text: TextConfig::default(),
            parallel: true,
        }
    }
}

/// Largest window radius for adaptive marker thresholding.
pub const MAX_THRESHOLD_RADIUS: u32 = 1024;

/// Largest side of a morphology structuring element.
pub const MAX_ELEMENT_PX: u32 = 511;

impl PipelineConfig {
    /// Reject settings the detectors cannot run with.
    pub fn validate(&self) -> Result<()> {
        let a = &self.alignment.marker_ids;
        for i in 0..a.len() {
            for j in (i + 1)..a.len() {
                if a[i] == a[j] {
                    return invalid(format!("alignment marker id {} listed twice", a[i]));
                }
            }
        }

        let m = &self.markers;
        if !(1..=MAX_THRESHOLD_RADIUS).contains(&m.threshold_radius) {
            return invalid(format!(
                "markers.threshold_radius must lie in 1..={MAX_THRESHOLD_RADIUS}, got {}",
                m.threshold_radius
            ));
        }
        if m.sample_cell_px < 2 {
            return invalid("markers.sample_cell_px must be at least 2");
        }
        unit("markers.min_quad_fill", m.min_quad_fill)?;
        unit("markers.min_border_score", m.min_border_score)?;

        let c = &self.contours;
        if c.blur_sigma <= 0.0 {
            return invalid("contours.blur_sigma must be positive");
        }
        if c.canny_low > c.canny_high {
            return invalid("contours.canny_low must not exceed contours.canny_high");
        }

        let cb = &self.checkbox;
        if !(0.0..0.5).contains(&cb.horizontal_indent) || !(0.0..0.5).contains(&cb.vertical_indent)
        {
            return invalid("checkbox indents must lie in [0, 0.5)");
        }
        unit("checkbox.fill_threshold", cb.fill_threshold)?;

        let e = &self.encirclement;
        if e.centroid_gate_divisor <= 0.0 {
            return invalid("encirclement.centroid_gate_divisor must be positive");
        }
        unit("encirclement.min_bbox_fraction", e.min_bbox_fraction)?;
        unit("encirclement.min_area", e.min_area)?;
        unit("encirclement.max_area", e.max_area)?;
        if e.min_area > e.max_area {
            return invalid("encirclement.min_area must not exceed encirclement.max_area");
        }

        let s = &self.segmentation;
        if s.kernel_size % 2 == 0 {
            return invalid(format!(
                "segmentation.kernel_size must be odd, got {}",
                s.kernel_size
            ));
        }
        if s.sigma <= 0.0 || s.theta <= 0.0 {
            return invalid("segmentation.sigma and segmentation.theta must be positive");
        }
        unit("segmentation.max_line_distance", s.max_line_distance)?;
        if s.line_px > MAX_ELEMENT_PX || s.dilation > MAX_ELEMENT_PX {
            return invalid(format!(
                "segmentation.line_px and segmentation.dilation must not exceed {MAX_ELEMENT_PX}"
            ));
        }
        if s.min_words_per_line == 0 {
            return invalid("segmentation.min_words_per_line must be at least 1");
        }

        if let Some(min) = self.text.min_confidence {
            unit("text.min_confidence", min)?;
        }

        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> Result<()> {
    Err(FormwerkError::InvalidConfig(msg.into()))
}

fn unit(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        invalid(format!("{name} must lie in [0, 1], got {value}"))
    }
}

/// Which markers pin the page corners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    /// The four alignment marker ids. Their order does not matter: page
    /// corners are assigned from marker positions.
    pub marker_ids: [u32; 4],
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            marker_ids: [100, 101, 102, 103],
        }
    }
}

/// Square fiducial detection and decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    /// Radius of the local-mean window used for adaptive thresholding.
    pub threshold_radius: u32,
    /// Subtracted from the local mean before comparing.
    pub threshold_offset: i32,
    /// Candidate outlines shorter than this (px) are ignored.
    pub min_perimeter: f64,
    /// Minimum ratio of fitted-quad area to convex-hull area.
    pub min_quad_fill: f64,
    /// Fraction of border cells that must read black.
    pub min_border_score: f64,
    /// Pixels per cell when rectifying a candidate for decoding.
    pub sample_cell_px: u32,
    /// Overrides the dictionary's own error-correction limit.
    pub max_hamming: Option<u8>,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            threshold_radius: 15,
            threshold_offset: 7,
            min_perimeter: 40.0,
            min_quad_fill: 0.85,
            min_border_score: 0.85,
            sample_cell_px: 8,
            max_hamming: None,
        }
    }
}

/// Shared contour extraction used by the mark detectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourConfig {
    /// Gaussian sigma applied to the binary crop before edge detection.
    pub blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
}

impl Default for ContourConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 0.8,
            canny_low: 100.0,
            canny_high: 200.0,
        }
    }
}

/// Checkbox classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckboxConfig {
    /// Fraction of the box width skipped on the left and right.
    pub horizontal_indent: f64,
    /// Fraction of the box height skipped on the top and bottom.
    pub vertical_indent: f64,
    /// The box is checked when the paper-coloured fraction of its interior
    /// falls below this.
    pub fill_threshold: f64,
}

impl Default for CheckboxConfig {
    fn default() -> Self {
        Self {
            horizontal_indent: 0.20,
            vertical_indent: 0.20,
            fill_threshold: 0.85,
        }
    }
}

/// Hand-drawn encirclement classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncirclementConfig {
    /// Contours whose centroid is farther than `min(w, h) / divisor` from
    /// the crop centre are ignored.
    pub centroid_gate_divisor: f64,
    /// Minimum bounding-box area as a fraction of the crop.
    pub min_bbox_fraction: f64,
    /// Accepted hull-area range as a fraction of the crop.
    pub min_area: f64,
    pub max_area: f64,
    /// Circularity required of a round shape (aspect ratio 1).
    pub circularity_base: f64,
    /// Circularity required however elongated the shape is.
    pub circularity_floor: f64,
    /// How much each unit of aspect ratio above 1 relaxes the requirement.
    pub circularity_slope: f64,
}

impl Default for EncirclementConfig {
    fn default() -> Self {
        Self {
            centroid_gate_divisor: 3.0,
            min_bbox_fraction: 0.20,
            min_area: 0.15,
            max_area: 0.90,
            circularity_base: 0.95,
            circularity_floor: 0.60,
            circularity_slope: 0.20,
        }
    }
}

/// Scale-space word segmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Side of the anisotropic filter kernel; must be odd.
    pub kernel_size: usize,
    /// Vertical scale of the filter.
    pub sigma: f64,
    /// Approximate width/height ratio of a word.
    pub theta: f64,
    /// Side of the square dilation applied before filtering.
    pub dilation: u32,
    /// Word boxes smaller than this (px²) are dropped.
    pub min_area: i64,
    /// Length of the structuring elements that consolidate rule lines.
    pub line_px: u32,
    /// Width of the page-edge band searched for rule lines.
    pub border_px: u32,
    /// Margin added around every word box.
    pub padding_px: i32,
    /// Neighbourhood radius used when filling removed rule lines.
    pub inpaint_radius: u32,
    /// Largest `1 - IoU` of vertical extents for two words to share a line.
    pub max_line_distance: f64,
    /// Clusters with fewer words are discarded as noise.
    pub min_words_per_line: usize,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            kernel_size: 25,
            sigma: 15.0,
            theta: 7.0,
            dilation: 2,
            min_area: 100,
            line_px: 15,
            border_px: 10,
            padding_px: 5,
            inpaint_radius: 3,
            max_line_distance: 0.7,
            min_words_per_line: 1,
        }
    }
}

/// Transcription of text regions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// Drop recognised words below this confidence. Off by default.
    pub min_confidence: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn even_kernel_is_rejected() {
        let mut config = PipelineConfig::default();
        config.segmentation.kernel_size = 24;
        assert!(matches!(
            config.validate(),
            Err(FormwerkError::InvalidConfig(_))
        ));
    }

    #[test]
    fn inverted_area_bounds_are_rejected() {
        let mut config = PipelineConfig::default();
        config.encirclement.min_area = 0.9;
        config.encirclement.max_area = 0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn threshold_radius_is_bounded() {
        let mut config = PipelineConfig::default();
        config.markers.threshold_radius = MAX_THRESHOLD_RADIUS;
        assert!(config.validate().is_ok());
        config.markers.threshold_radius = u32::MAX;
        assert!(matches!(
            config.validate(),
            Err(FormwerkError::InvalidConfig(_))
        ));
        config.markers.threshold_radius = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_structuring_elements_are_rejected() {
        let mut config = PipelineConfig::default();
        config.segmentation.line_px = MAX_ELEMENT_PX + 1;
        assert!(config.validate().is_err());
        config.segmentation.line_px = 15;
        config.segmentation.dilation = 4096;
        assert!(config.validate().is_err());
    }

    #[test]
    fn duplicate_alignment_ids_are_rejected() {
        let mut config = PipelineConfig::default();
        config.alignment.marker_ids = [1, 2, 2, 3];
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"checkbox": {"fill_threshold": 0.7}, "parallel": false}"#)
                .expect("parse");
        assert_eq!(config.checkbox.fill_threshold, 0.7);
        assert_eq!(config.checkbox.horizontal_indent, 0.20);
        assert_eq!(config.segmentation.kernel_size, 25);
        assert!(!config.parallel);
    }
}
