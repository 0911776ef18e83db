// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Formwerk.

use thiserror::Error;

/// Why the fiducial alignment step could not produce a normalised page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlignmentFailure {
    #[error("alignment markers not found: {0:?}")]
    MissingMarkers(Vec<u32>),

    #[error("page corners could not be assigned to distinct alignment markers")]
    AmbiguousRoles,

    #[error("alignment markers span a degenerate quadrilateral")]
    DegenerateTransform,
}

/// Top-level error type for all Formwerk operations.
#[derive(Debug, Error)]
pub enum FormwerkError {
    // -- Marker / alignment errors --
    #[error("no fiducial markers found in image")]
    NoMarkersFound,

    #[error("required markers missing: {0:?}")]
    MissingMarker(Vec<u32>),

    #[error("alignment failed: {0}")]
    AlignmentFailed(AlignmentFailure),

    // -- Region errors --
    #[error("region '{region}' references markers that were not found: {missing:?}")]
    MarkerResolutionFailed { region: String, missing: Vec<u32> },

    #[error("region '{region}' has no extent inside the page")]
    DegenerateRegion { region: String },

    // -- Input errors --
    #[error("invalid template: {0}")]
    InvalidTemplate(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("OCR failed: {0}")]
    OcrError(String),

    #[error("processing cancelled")]
    Cancelled,

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<AlignmentFailure> for FormwerkError {
    fn from(failure: AlignmentFailure) -> Self {
        Self::AlignmentFailed(failure)
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FormwerkError>;
