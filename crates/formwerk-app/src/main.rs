// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Formwerk: fiducial-aligned field extraction from photographed paper forms.
//
// Entry point. Initialises logging, loads the template, dictionary,
// configuration and page photo, runs the pipeline and prints the report.

mod services;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use formwerk_core::human_errors::humanize_error;
use formwerk_core::{RegionKind, Result, Template};
use formwerk_vision::overlay::{draw_markers, draw_regions, draw_word_boxes};
use formwerk_vision::region::crop_box;
use formwerk_vision::{
    ArucoDetector, CancelToken, FormProcessor, ProcessedPage, WordRecognizer, WordSegmenter,
};

use services::loaders;
use services::recognizer::{self, Unavailable};

/// Read the marks and handwriting on a photographed form.
#[derive(Debug, Parser)]
#[command(name = "formwerk", version, about)]
struct Args {
    /// Form template (JSON).
    #[arg(long)]
    template: PathBuf,

    /// Fiducial marker dictionary (JSON).
    #[arg(long)]
    dictionary: PathBuf,

    /// Photo or scan of the filled-in page.
    #[arg(long)]
    image: PathBuf,

    /// Pipeline configuration (JSON). Defaults apply to anything omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the aligned page with markers, regions and words drawn on it.
    #[arg(long)]
    overlay: Option<PathBuf>,

    /// Directory holding the OCR models.
    #[arg(long)]
    models: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "Form could not be read");
            let human = humanize_error(&err);
            eprintln!("{}\n{}", human.message, human.suggestion);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<String> {
    let template = loaders::load_template(&args.template)?;
    let dictionary = loaders::load_dictionary(&args.dictionary)?;
    let config = loaders::load_config(args.config.as_deref())?;
    let image = loaders::load_image(&args.image)?;

    let detector = ArucoDetector::new(&dictionary, config.markers.clone())?;
    let recognizer = recognizer_for(&template, args)?;
    let processor = FormProcessor::new(config, Box::new(detector), recognizer)?;

    let processed = processor.process_page(&image, &template, &CancelToken::new())?;
    info!(
        read = processed.report.values.len(),
        failed = processed.report.failures.len(),
        "Form read"
    );

    if let Some(path) = &args.overlay {
        let segmenter = WordSegmenter::new(processor.config().segmentation.clone());
        let annotated = annotate(&processed, &template, &segmenter);
        loaders::save_image(&annotated, path)?;
    }

    Ok(serde_json::to_string_pretty(&processed.report)?)
}

/// Model loading is slow and may fail, so only do it when some region
/// actually needs text.
fn recognizer_for(template: &Template, args: &Args) -> Result<Arc<dyn WordRecognizer>> {
    if template.regions.iter().any(|r| r.kind == RegionKind::Text) {
        recognizer::build(args.models.as_deref())
    } else {
        Ok(Arc::new(Unavailable))
    }
}

fn annotate(
    processed: &ProcessedPage,
    template: &Template,
    segmenter: &WordSegmenter,
) -> image::RgbImage {
    let mut canvas = processed.page.clone();

    for located in &processed.regions {
        let is_text = template
            .regions
            .iter()
            .any(|r| r.name == located.name && r.kind == RegionKind::Text);
        if !is_text {
            continue;
        }
        if let Some(crop) = crop_box(&processed.page, located.bbox) {
            let words = segmenter.segment(&crop);
            let origin = (located.bbox.x.max(0), located.bbox.y.max(0));
            draw_word_boxes(&mut canvas, origin, &words);
        }
    }

    if let Some(markers) = &processed.markers {
        draw_markers(&mut canvas, markers);
    }
    draw_regions(&mut canvas, &processed.regions);
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn optional_flags_default_to_none() {
        let args = Args::try_parse_from([
            "formwerk",
            "--template",
            "t.json",
            "--dictionary",
            "d.json",
            "--image",
            "page.jpg",
        ])
        .expect("args");
        assert_eq!(args.template, PathBuf::from("t.json"));
        assert!(args.config.is_none() && args.overlay.is_none() && args.models.is_none());
    }

    #[test]
    fn image_is_required() {
        assert!(
            Args::try_parse_from(["formwerk", "--template", "t.json", "--dictionary", "d.json"])
                .is_err()
        );
    }
}
