// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transcription of text regions, one segmented word at a time.
//
// The recogniser itself is a seam: anything implementing `WordRecognizer`
// can be plugged in. With the `ocr` feature, `OcrsRecognizer` adapts the
// pure-Rust `ocrs` engine.

#[cfg(feature = "ocr")]
pub mod ocr;

use std::sync::Arc;

use image::RgbImage;
use tracing::{debug, instrument};

use formwerk_core::config::TextConfig;
use formwerk_core::{FieldValue, RegionKind, Result};

use crate::reader::FieldReader;
use crate::segment::WordSegmenter;

#[cfg(feature = "ocr")]
pub use ocr::{OcrModels, OcrsRecognizer};

/// A transcribed word.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub text: String,
    /// In `[0, 1]`.
    pub confidence: f64,
}

/// Turns one word image into text.
pub trait WordRecognizer: Send + Sync {
    fn recognize(&self, word: &RgbImage) -> Result<Recognition>;
}

/// Reads a text region: segment into words, transcribe each, join with
/// single spaces in reading order.
pub struct TextReader {
    segmenter: WordSegmenter,
    recognizer: Arc<dyn WordRecognizer>,
    config: TextConfig,
}

impl TextReader {
    pub fn new(
        segmenter: WordSegmenter,
        recognizer: Arc<dyn WordRecognizer>,
        config: TextConfig,
    ) -> Self {
        Self {
            segmenter,
            recognizer,
            config,
        }
    }

    #[instrument(skip_all, fields(width = crop.width(), height = crop.height()))]
    pub fn transcribe(&self, crop: &RgbImage) -> Result<String> {
        let words = self.segmenter.segment(crop);
        let mut parts = Vec::with_capacity(words.len());

        for word in &words {
            let Some(image) = word.crop(crop) else {
                continue;
            };
            let recognition = self.recognizer.recognize(&image)?;
            if let Some(min) = self.config.min_confidence {
                if recognition.confidence < min {
                    debug!(
                        text = %recognition.text,
                        confidence = recognition.confidence,
                        "Low-confidence word dropped"
                    );
                    continue;
                }
            }
            let text = recognition.text.trim();
            if !text.is_empty() {
                parts.push(text.to_owned());
            }
        }

        debug!(words = words.len(), kept = parts.len(), "Text region transcribed");
        Ok(parts.join(" "))
    }
}

impl FieldReader for TextReader {
    fn kind(&self) -> RegionKind {
        RegionKind::Text
    }

    fn read(&self, crop: &RgbImage) -> Result<FieldValue> {
        self.transcribe(crop).map(FieldValue::Text)
    }
}
