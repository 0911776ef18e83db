// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// formwerk-vision: image analysis for the Formwerk form reader.
//
// Provides fiducial marker detection and page alignment, region cropping,
// checkbox and encirclement classification, word segmentation for text
// regions, and the per-document pipeline that ties them together.

pub mod align;
pub mod contours;
pub mod detect;
pub mod inpaint;
pub mod markers;
pub mod morphology;
pub mod overlay;
pub mod pipeline;
pub mod reader;
pub mod recognize;
pub mod region;
pub mod segment;
pub mod threshold;

#[cfg(test)]
mod testutil;

// Re-export the primary types so callers can use `formwerk_vision::FormProcessor` etc.
pub use align::FiducialAligner;
pub use detect::{CheckboxDetector, EncirclementDetector};
pub use markers::{ArucoDetector, Dictionary, MarkerDetector, locate_markers};
pub use pipeline::{CancelToken, FormProcessor, LocatedRegion, ProcessedPage};
pub use reader::FieldReader;
pub use recognize::{Recognition, TextReader, WordRecognizer};
pub use segment::{WordBox, WordSegmenter};

#[cfg(feature = "ocr")]
pub use recognize::{OcrModels, OcrsRecognizer};
