// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fiducial marker location.
//
// A `MarkerDetector` turns a grayscale image into raw detections; the
// locator turns those into a `MarkerMap` keyed by id, with each marker's
// centre derived from its corners.

pub mod aruco;
pub mod dictionary;

use image::{GrayImage, RgbImage};
use image::imageops::grayscale;
use tracing::{debug, info, instrument, warn};

use formwerk_core::{DetectedMarker, FormwerkError, Marker, MarkerMap, Result};

pub use aruco::ArucoDetector;
pub use dictionary::{Dictionary, Match, Matcher, render_marker, rotate_code};

/// A backend that finds square fiducials in an image.
///
/// Implementations report each marker's corners in the marker's own
/// TL, TR, BR, BL order and return an empty list when nothing is found.
pub trait MarkerDetector: Send + Sync {
    fn detect(&self, gray: &GrayImage) -> Vec<DetectedMarker>;
}

/// Detect every marker in `image` and index them by id.
///
/// Fails with [`FormwerkError::NoMarkersFound`] when the detector reports
/// nothing. If a backend reports an id twice the first detection wins.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn locate_markers(image: &RgbImage, detector: &dyn MarkerDetector) -> Result<MarkerMap> {
    let gray = grayscale(image);
    let detections = detector.detect(&gray);
    debug!(count = detections.len(), "Raw marker detections");

    if detections.is_empty() {
        return Err(FormwerkError::NoMarkersFound);
    }

    let mut map = MarkerMap::new();
    for detection in &detections {
        if map.contains(detection.id) {
            warn!(id = detection.id, "Duplicate marker id ignored");
            continue;
        }
        map.insert(Marker::from_detection(detection));
    }

    info!(markers = map.len(), "Markers located");
    Ok(map)
}
