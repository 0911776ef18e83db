// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Word recognition backed by the `ocrs` engine.
//
// # Feature Gate
//
// Only built with the `ocr` feature:
//
// ```toml
// formwerk-vision = { path = "crates/formwerk-vision", features = ["ocr"] }
// ```
//
// # Model Setup
//
// The engine needs `text-detection.rten` and `text-recognition.rten`. Running
// `ocrs-cli` once downloads both into `$XDG_CACHE_HOME/ocrs` (usually
// `~/.cache/ocrs`), which is where `OcrModels::default()` looks.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use image::RgbImage;
use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
use rten::Model;
use tracing::{debug, info, instrument};

use formwerk_core::{FormwerkError, Result};

use super::{Recognition, WordRecognizer};

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// `$XDG_CACHE_HOME/ocrs`, falling back to `~/.cache/ocrs`.
fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Where to find the two model files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrModels {
    pub detection: PathBuf,
    pub recognition: PathBuf,
}

impl Default for OcrModels {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrModels {
    /// Both models inside `dir`, under their usual file names.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection: dir.join(DETECTION_MODEL_FILENAME),
            recognition: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (what, path) in [("detection", &self.detection), ("recognition", &self.recognition)] {
            if !path.exists() {
                return Err(FormwerkError::OcrError(format!(
                    "{what} model not found at {}; run `ocrs-cli` once to download models",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// [`WordRecognizer`] over an `ocrs` engine.
///
/// `ocrs` reports no score, so confidence is 1.0 for any non-empty result
/// and 0.0 for an empty one.
pub struct OcrsRecognizer {
    engine: Mutex<OcrEngine>,
}

impl OcrsRecognizer {
    /// Load both models. This is the slow part; build one recogniser and
    /// reuse it.
    #[instrument(skip_all, fields(
        detection = %models.detection.display(),
        recognition = %models.recognition.display(),
    ))]
    pub fn new(models: &OcrModels) -> Result<Self> {
        models.validate()?;

        let load = |path: &Path| {
            Model::load_file(path).map_err(|err| {
                FormwerkError::OcrError(format!("failed to load model from {}: {err}", path.display()))
            })
        };
        info!("Loading OCR models");
        let detection_model = load(&models.detection)?;
        let recognition_model = load(&models.recognition)?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| FormwerkError::OcrError(format!("failed to initialise OCR engine: {err}")))?;

        info!("OCR engine ready");
        Ok(Self {
            engine: Mutex::new(engine),
        })
    }
}

impl WordRecognizer for OcrsRecognizer {
    fn recognize(&self, word: &RgbImage) -> Result<Recognition> {
        let (width, height) = word.dimensions();
        let source = ImageSource::from_bytes(word.as_raw(), (width, height)).map_err(|err| {
            FormwerkError::OcrError(format!("failed to create image source ({width}x{height}): {err}"))
        })?;

        let engine = self
            .engine
            .lock()
            .map_err(|_| FormwerkError::OcrError("OCR engine lock poisoned".into()))?;
        let input = engine
            .prepare_input(source)
            .map_err(|err| FormwerkError::OcrError(format!("OCR preprocessing failed: {err}")))?;
        let text = engine
            .get_text(&input)
            .map_err(|err| FormwerkError::OcrError(format!("OCR recognition failed: {err}")))?;

        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        debug!(%text, "Word recognised");
        let confidence = if text.is_empty() { 0.0 } else { 1.0 };
        Ok(Recognition { text, confidence })
    }
}
