// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Loading the inputs of one run from disk. Everything handed on to the
// pipeline has already been parsed and validated here.

use std::path::Path;

use image::RgbImage;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use formwerk_core::{FormwerkError, PipelineConfig, Result, Template};
use formwerk_vision::Dictionary;

fn read_json<T: DeserializeOwned>(
    path: &Path,
    invalid: impl FnOnce(String) -> FormwerkError,
) -> Result<T> {
    let data = std::fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|err| invalid(format!("{}: {err}", path.display())))
}

/// Parse and validate a form template.
pub fn load_template(path: &Path) -> Result<Template> {
    let template: Template = read_json(path, FormwerkError::InvalidTemplate)?;
    template.validate()?;
    info!(
        form = %template.form_type,
        regions = template.regions.len(),
        "Template loaded"
    );
    Ok(template)
}

/// Parse and validate a marker dictionary.
pub fn load_dictionary(path: &Path) -> Result<Dictionary> {
    let dictionary: Dictionary = read_json(path, FormwerkError::InvalidConfig)?;
    dictionary.validate()?;
    debug!(
        name = %dictionary.name,
        markers = dictionary.codes.len(),
        "Dictionary loaded"
    );
    Ok(dictionary)
}

/// The pipeline configuration at `path`, or the defaults.
///
/// Fields missing from the file keep their default values.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let config = match path {
        Some(path) => read_json(path, FormwerkError::InvalidConfig)?,
        None => PipelineConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

/// Decode a captured page into RGB.
pub fn load_image(path: &Path) -> Result<RgbImage> {
    let image = image::open(path)
        .map_err(|err| FormwerkError::ImageError(format!("{}: {err}", path.display())))?
        .to_rgb8();
    debug!(width = image.width(), height = image.height(), "Image loaded");
    Ok(image)
}

/// Write an annotated page. The format follows the file extension.
pub fn save_image(image: &RgbImage, path: &Path) -> Result<()> {
    image
        .save(path)
        .map_err(|err| FormwerkError::ImageError(format!("{}: {err}", path.display())))?;
    info!(path = %path.display(), "Overlay written");
    Ok(())
}
