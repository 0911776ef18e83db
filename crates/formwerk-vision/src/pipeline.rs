// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-document orchestration: align the page, locate region markers, then
// read every region with the reader for its kind.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use image::RgbImage;
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use formwerk_core::{
    BBox, FieldValue, FormReport, FormwerkError, GeometryMode, MarkerMap, PipelineConfig, Region,
    RegionFailure, RegionKind, Result, Template,
};

use crate::align::FiducialAligner;
use crate::detect::{CheckboxDetector, EncirclementDetector};
use crate::markers::{MarkerDetector, locate_markers};
use crate::reader::FieldReader;
use crate::recognize::{TextReader, WordRecognizer};
use crate::region::crop_region;
use crate::segment::WordSegmenter;

/// Shared flag for stopping a document part-way through.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A region's box on the aligned page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedRegion {
    pub name: String,
    pub bbox: BBox,
}

/// Everything one pass produced, for callers that want more than values.
#[derive(Debug, Clone)]
pub struct ProcessedPage {
    /// The rectified page.
    pub page: RgbImage,
    /// Markers found on the rectified page, for marker-based templates.
    pub markers: Option<MarkerMap>,
    /// Regions that were located, in template order.
    pub regions: Vec<LocatedRegion>,
    pub report: FormReport,
}

/// Reads filled-in forms against a template.
pub struct FormProcessor {
    config: PipelineConfig,
    detector: Box<dyn MarkerDetector>,
    aligner: FiducialAligner,
    checkbox: Box<dyn FieldReader>,
    encirclement: Box<dyn FieldReader>,
    text: Box<dyn FieldReader>,
}

impl FormProcessor {
    /// Build a processor with the standard readers for every region kind.
    pub fn new(
        config: PipelineConfig,
        detector: Box<dyn MarkerDetector>,
        recognizer: Arc<dyn WordRecognizer>,
    ) -> Result<Self> {
        config.validate()?;

        let checkbox = CheckboxDetector::new(config.contours.clone(), config.checkbox.clone());
        let encirclement =
            EncirclementDetector::new(config.contours.clone(), config.encirclement.clone());
        let text = TextReader::new(
            WordSegmenter::new(config.segmentation.clone()),
            recognizer,
            config.text.clone(),
        );

        Ok(Self {
            aligner: FiducialAligner::new(&config.alignment),
            config,
            detector,
            checkbox: Box::new(checkbox),
            encirclement: Box::new(encirclement),
            text: Box::new(text),
        })
    }

    /// Replace the reader for `reader.kind()`.
    pub fn with_reader(mut self, reader: Box<dyn FieldReader>) -> Self {
        match reader.kind() {
            RegionKind::Checkbox => self.checkbox = reader,
            RegionKind::Encirclement => self.encirclement = reader,
            RegionKind::Text => self.text = reader,
        }
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn reader(&self, kind: RegionKind) -> &dyn FieldReader {
        match kind {
            RegionKind::Checkbox => self.checkbox.as_ref(),
            RegionKind::Encirclement => self.encirclement.as_ref(),
            RegionKind::Text => self.text.as_ref(),
        }
    }

    /// Read every region of `template` from a captured page.
    pub fn process(&self, image: &RgbImage, template: &Template) -> Result<FormReport> {
        self.process_page(image, template, &CancelToken::new())
            .map(|page| page.report)
    }

    /// Like [`process`](Self::process), checking `cancel` before each region.
    pub fn process_with_cancel(
        &self,
        image: &RgbImage,
        template: &Template,
        cancel: &CancelToken,
    ) -> Result<FormReport> {
        self.process_page(image, template, cancel)
            .map(|page| page.report)
    }

    /// Full pass, keeping the rectified page and located boxes.
    ///
    /// Alignment and marker lookup failures abort the document. A region
    /// that cannot be located or read is recorded in the report's failures
    /// and the remaining regions are still read.
    #[instrument(skip_all, fields(
        form = %template.form_type,
        regions = template.regions.len(),
        width = image.width(),
        height = image.height(),
    ))]
    pub fn process_page(
        &self,
        image: &RgbImage,
        template: &Template,
        cancel: &CancelToken,
    ) -> Result<ProcessedPage> {
        if cancel.is_cancelled() {
            return Err(FormwerkError::Cancelled);
        }

        let page = self.aligner.align(
            image,
            self.detector.as_ref(),
            template.page_length,
            template.page_width,
        )?;

        let markers = match template.geometry_mode {
            GeometryMode::Markers => Some(locate_markers(&page, self.detector.as_ref())?),
            GeometryMode::Coordinates => None,
        };

        let read_one = |region: &Region| -> Result<(BBox, FieldValue)> {
            if cancel.is_cancelled() {
                return Err(FormwerkError::Cancelled);
            }
            self.locate_and_read(&page, region, markers.as_ref())
        };

        let outcomes: Vec<Result<(BBox, FieldValue)>> = if self.config.parallel {
            template.regions.par_iter().map(read_one).collect()
        } else {
            template.regions.iter().map(read_one).collect()
        };

        let mut report = FormReport::default();
        let mut regions = Vec::with_capacity(outcomes.len());
        for (region, outcome) in template.regions.iter().zip(outcomes) {
            match outcome {
                Ok((bbox, value)) => {
                    debug!(region = %region.name, ?value, "Region read");
                    regions.push(LocatedRegion {
                        name: region.name.clone(),
                        bbox,
                    });
                    report.values.insert(region.name.clone(), value);
                }
                Err(FormwerkError::Cancelled) => {
                    info!("Processing cancelled");
                    return Err(FormwerkError::Cancelled);
                }
                Err(err) => {
                    warn!(region = %region.name, error = %err, "Region skipped");
                    report.failures.push(RegionFailure {
                        region: region.name.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        info!(
            read = report.values.len(),
            failed = report.failures.len(),
            "Document processed"
        );
        Ok(ProcessedPage {
            page,
            markers,
            regions,
            report,
        })
    }

    /// Read one region from an already aligned page.
    pub fn read_region(
        &self,
        page: &RgbImage,
        region: &Region,
        markers: Option<&MarkerMap>,
    ) -> Result<FieldValue> {
        self.locate_and_read(page, region, markers)
            .map(|(_, value)| value)
    }

    fn locate_and_read(
        &self,
        page: &RgbImage,
        region: &Region,
        markers: Option<&MarkerMap>,
    ) -> Result<(BBox, FieldValue)> {
        let (bbox, crop) = crop_region(page, region, markers)?;
        let value = self.reader(region.kind).read(&crop)?;
        Ok((bbox, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::ArucoDetector;
    use crate::recognize::Recognition;
    use crate::testutil::{dictionary, synthetic_page};
    use formwerk_core::config::AlignmentConfig;
    use formwerk_core::{AlignmentFailure, DetectedMarker, PointF, RegionGeometry};
    use image::Rgb;
    use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
    use imageproc::rect::Rect;

    struct Fixed(Vec<DetectedMarker>);

    impl MarkerDetector for Fixed {
        fn detect(&self, _gray: &image::GrayImage) -> Vec<DetectedMarker> {
            self.0.clone()
        }
    }

    struct Echo;

    impl WordRecognizer for Echo {
        fn recognize(&self, word: &RgbImage) -> Result<Recognition> {
            Ok(Recognition {
                text: format!("{}x{}", word.width(), word.height()),
                confidence: 1.0,
            })
        }
    }

    /// A reader that returns the same value for every region.
    struct Constant(RegionKind, FieldValue);

    impl FieldReader for Constant {
        fn kind(&self) -> RegionKind {
            self.0
        }

        fn read(&self, _crop: &RgbImage) -> Result<FieldValue> {
            Ok(self.1.clone())
        }
    }

    fn config(parallel: bool) -> PipelineConfig {
        PipelineConfig {
            alignment: AlignmentConfig {
                marker_ids: [0, 1, 2, 3],
            },
            parallel,
            ..PipelineConfig::default()
        }
    }

    fn square(id: u32, cx: f32, cy: f32) -> DetectedMarker {
        DetectedMarker {
            id,
            corners: [
                PointF::new(cx - 5.0, cy - 5.0),
                PointF::new(cx + 5.0, cy - 5.0),
                PointF::new(cx + 5.0, cy + 5.0),
                PointF::new(cx - 5.0, cy + 5.0),
            ],
        }
    }

    /// Markers whose outer corners sit exactly on a 600×800 page's corners,
    /// plus region markers 10..=13 around x 90..210, y 290..410.
    fn identity_markers() -> Vec<DetectedMarker> {
        vec![
            square(0, 5.0, 5.0),
            square(1, 595.0, 5.0),
            square(2, 595.0, 795.0),
            square(3, 5.0, 795.0),
            square(10, 90.0, 350.0),
            square(11, 210.0, 350.0),
            square(12, 150.0, 290.0),
            square(13, 150.0, 410.0),
        ]
    }

    fn page_with_box(checked: bool) -> RgbImage {
        let mut page = RgbImage::from_pixel(600, 800, Rgb([255, 255, 255]));
        for inset in 0..3 {
            draw_hollow_rect_mut(
                &mut page,
                Rect::at(110 + inset, 310 + inset).of_size(80 - 2 * inset as u32, 80 - 2 * inset as u32),
                Rgb([0, 0, 0]),
            );
        }
        if checked {
            draw_filled_rect_mut(&mut page, Rect::at(125, 325).of_size(50, 50), Rgb([0, 0, 0]));
        }
        page
    }

    fn region(name: &str, kind: RegionKind, geometry: RegionGeometry) -> Region {
        Region {
            name: name.into(),
            kind,
            geometry,
        }
    }

    fn marker_template(regions: Vec<Region>) -> Template {
        Template {
            form_type: "test".into(),
            form_title: "Test form".into(),
            page_length: 600,
            page_width: 800,
            geometry_mode: GeometryMode::Markers,
            regions,
        }
    }

    fn stub_processor(parallel: bool) -> FormProcessor {
        FormProcessor::new(
            config(parallel),
            Box::new(Fixed(identity_markers())),
            Arc::new(Echo),
        )
        .expect("processor")
    }

    fn boxed() -> RegionGeometry {
        RegionGeometry::Markers {
            left: 10,
            right: 11,
            top: 12,
            bottom: 13,
        }
    }

    #[test]
    fn marker_regions_are_read_and_missing_markers_recorded() {
        let template = marker_template(vec![
            region("agree", RegionKind::Checkbox, boxed()),
            region(
                "orphan",
                RegionKind::Checkbox,
                RegionGeometry::Markers {
                    left: 10,
                    right: 11,
                    top: 12,
                    bottom: 99,
                },
            ),
        ]);

        for parallel in [true, false] {
            let report = stub_processor(parallel)
                .process(&page_with_box(true), &template)
                .expect("report");
            assert_eq!(report.get("agree"), Some(&FieldValue::Flag(true)));
            assert!(report.get("orphan").is_none());
            assert_eq!(report.failures.len(), 1);
            assert_eq!(report.failures[0].region, "orphan");
            assert!(report.failures[0].error.contains("99"));
        }
    }

    #[test]
    fn unchecked_box_reads_false() {
        let template = marker_template(vec![region("agree", RegionKind::Checkbox, boxed())]);
        let report = stub_processor(true)
            .process(&page_with_box(false), &template)
            .expect("report");
        assert_eq!(report.get("agree"), Some(&FieldValue::Flag(false)));
    }

    #[test]
    fn text_regions_use_the_recogniser() {
        let mut page = page_with_box(false);
        draw_filled_rect_mut(&mut page, Rect::at(300, 600).of_size(120, 20), Rgb([0, 0, 0]));
        let template = Template {
            geometry_mode: GeometryMode::Coordinates,
            regions: vec![
                region(
                    "name",
                    RegionKind::Text,
                    RegionGeometry::Coordinates {
                        x1: 260,
                        y1: 560,
                        x2: 480,
                        y2: 660,
                    },
                ),
                region(
                    "empty",
                    RegionKind::Text,
                    RegionGeometry::Coordinates {
                        x1: 300,
                        y1: 100,
                        x2: 500,
                        y2: 200,
                    },
                ),
            ],
            ..marker_template(Vec::new())
        };
        let report = stub_processor(true).process(&page, &template).expect("report");
        let name = report.get("name").and_then(FieldValue::as_text).expect("text");
        assert!(!name.is_empty() && !name.contains(' '), "{name}");
        assert_eq!(report.get("empty"), Some(&FieldValue::Text(String::new())));
    }

    #[test]
    fn readers_can_be_swapped_per_kind() {
        let processor = stub_processor(false).with_reader(Box::new(Constant(
            RegionKind::Encirclement,
            FieldValue::Flag(true),
        )));
        let template = marker_template(vec![region("circled", RegionKind::Encirclement, boxed())]);
        let report = processor.process(&page_with_box(false), &template).expect("report");
        assert_eq!(report.get("circled"), Some(&FieldValue::Flag(true)));
    }

    #[test]
    fn cancelled_token_stops_the_document() {
        let token = CancelToken::new();
        token.cancel();
        let template = marker_template(vec![region("agree", RegionKind::Checkbox, boxed())]);
        assert!(matches!(
            stub_processor(true).process_with_cancel(&page_with_box(true), &template, &token),
            Err(FormwerkError::Cancelled)
        ));
    }

    #[test]
    fn missing_alignment_marker_fails_the_document() {
        let markers: Vec<DetectedMarker> = identity_markers()
            .into_iter()
            .filter(|m| m.id != 2)
            .collect();
        let processor =
            FormProcessor::new(config(true), Box::new(Fixed(markers)), Arc::new(Echo)).expect("processor");
        let template = marker_template(vec![region("agree", RegionKind::Checkbox, boxed())]);
        assert!(matches!(
            processor.process(&page_with_box(true), &template),
            Err(FormwerkError::AlignmentFailed(AlignmentFailure::MissingMarkers(_)))
        ));
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let mut bad = config(true);
        bad.segmentation.kernel_size = 10;
        assert!(matches!(
            FormProcessor::new(bad, Box::new(Fixed(Vec::new())), Arc::new(Echo)),
            Err(FormwerkError::InvalidConfig(_))
        ));
    }

    #[test]
    fn read_region_on_an_aligned_page() {
        let processor = stub_processor(false);
        let r = region(
            "agree",
            RegionKind::Checkbox,
            RegionGeometry::Coordinates {
                x1: 100,
                y1: 300,
                x2: 200,
                y2: 400,
            },
        );
        let value = processor
            .read_region(&page_with_box(true), &r, None)
            .expect("value");
        assert_eq!(value, FieldValue::Flag(true));
    }

    #[test]
    fn synthetic_photo_end_to_end() {
        let detector = ArucoDetector::new(&dictionary(), config(true).markers).expect("detector");
        let processor =
            FormProcessor::new(config(true), Box::new(detector), Arc::new(Echo)).expect("processor");
        let template = Template {
            geometry_mode: GeometryMode::Coordinates,
            regions: vec![region(
                "agree",
                RegionKind::Checkbox,
                RegionGeometry::Coordinates {
                    x1: 190,
                    y1: 290,
                    x2: 290,
                    y2: 390,
                },
            )],
            ..marker_template(Vec::new())
        };

        let checked = processor.process(&synthetic_page(true), &template).expect("checked");
        assert_eq!(checked.get("agree"), Some(&FieldValue::Flag(true)));

        let unchecked = processor
            .process_page(&synthetic_page(false), &template, &CancelToken::new())
            .expect("unchecked");
        assert_eq!(unchecked.report.get("agree"), Some(&FieldValue::Flag(false)));
        assert_eq!(unchecked.page.dimensions(), (600, 800));
        assert_eq!(unchecked.regions[0].bbox, BBox::from_edges(190, 290, 290, 390));
        assert!(unchecked.markers.is_none());
    }
}
