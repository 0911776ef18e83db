// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Choosing the word recogniser for text regions.
//
// Builds with the `ocr` feature use the `ocrs` engine. Without it, text
// regions fail individually and show up in the report's failures, while
// checkbox and encirclement regions are still read.

use std::path::Path;
use std::sync::Arc;

use image::RgbImage;

use formwerk_core::{FormwerkError, Result};
use formwerk_vision::{Recognition, WordRecognizer};

/// Stands in for OCR when no engine is loaded.
pub struct Unavailable;

impl WordRecognizer for Unavailable {
    fn recognize(&self, _word: &RgbImage) -> Result<Recognition> {
        Err(FormwerkError::OcrError(
            "this build has no OCR support; rebuild with `--features ocr`".into(),
        ))
    }
}

/// The recogniser for this build. `models` overrides the model directory.
#[cfg(feature = "ocr")]
pub fn build(models: Option<&Path>) -> Result<Arc<dyn WordRecognizer>> {
    use formwerk_vision::{OcrModels, OcrsRecognizer};

    let models = models.map(OcrModels::from_dir).unwrap_or_default();
    Ok(Arc::new(OcrsRecognizer::new(&models)?))
}

/// The recogniser for this build. `models` overrides the model directory.
#[cfg(not(feature = "ocr"))]
pub fn build(models: Option<&Path>) -> Result<Arc<dyn WordRecognizer>> {
    if models.is_some() {
        tracing::warn!("--models ignored: built without the `ocr` feature");
    }
    Ok(Arc::new(Unavailable))
}
