// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Formwerk: page geometry, fiducial markers, form
// templates and extracted field values.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{FormwerkError, Result};

/// Integer pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Sub-pixel coordinate, as reported by marker detection.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointF {
    pub x: f32,
    pub y: f32,
}

impl PointF {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Round to the nearest pixel.
    pub fn round(self) -> Point {
        Point::new(self.x.round() as i32, self.y.round() as i32)
    }
}

/// Axis-aligned box in image pixel space.
///
/// `x`/`y` is the top-left corner. The box covers `x..x + width` and
/// `y..y + height`. Padding can push the origin negative; [`BBox::clamp`]
/// brings it back inside an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BBox {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a box from its left, top, right and bottom edges.
    pub const fn from_edges(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self::new(left, top, right - left, bottom - top)
    }

    /// `(left, top, right, bottom)`.
    pub const fn edges(&self) -> (i32, i32, i32, i32) {
        (self.x, self.y, self.right(), self.bottom())
    }

    pub const fn right(&self) -> i32 {
        self.x + self.width
    }

    pub const fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// True when the box covers no pixels.
    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub const fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    /// Grow the box by `px` on every side.
    pub const fn pad(&self, px: i32) -> Self {
        Self::new(
            self.x - px,
            self.y - px,
            self.width + 2 * px,
            self.height + 2 * px,
        )
    }

    /// Intersect the box with a `max_width × max_height` image.
    ///
    /// The result never has negative extent; a box entirely outside the
    /// image collapses to zero width or height.
    pub fn clamp(&self, max_width: u32, max_height: u32) -> Self {
        let max_w = max_width.min(i32::MAX as u32) as i32;
        let max_h = max_height.min(i32::MAX as u32) as i32;

        let left = self.x.clamp(0, max_w);
        let top = self.y.clamp(0, max_h);
        let right = self.right().clamp(0, max_w);
        let bottom = self.bottom().clamp(0, max_h);

        Self::new(left, top, (right - left).max(0), (bottom - top).max(0))
    }

    /// Corners in TL, TR, BR, BL order.
    pub const fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.x, self.y),
            Point::new(self.right(), self.y),
            Point::new(self.right(), self.bottom()),
            Point::new(self.x, self.bottom()),
        ]
    }

    /// Horizontal centre.
    pub fn center_x(&self) -> f64 {
        self.x as f64 + self.width as f64 / 2.0
    }

    /// Vertical centre.
    pub fn center_y(&self) -> f64 {
        self.y as f64 + self.height as f64 / 2.0
    }

    /// Intersection-over-union of the two boxes' vertical extents.
    ///
    /// Spans that only touch, or do not meet at all, score zero.
    pub fn vertical_iou(&self, other: &BBox) -> f64 {
        if self.y > other.bottom() || other.y > self.bottom() {
            return 0.0;
        }
        let intersection = (self.bottom().min(other.bottom()) - self.y.max(other.y)) as f64;
        let union = (self.height + other.height) as f64 - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        (intersection / union).clamp(0.0, 1.0)
    }
}

// -- Fiducial markers ---------------------------------------------------------

/// A marker as reported by a detection backend: id plus four corners in
/// the marker's own TL, TR, BR, BL order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectedMarker {
    pub id: u32,
    pub corners: [PointF; 4],
}

/// A located fiducial marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: u32,
    /// Mean of the four corners, rounded to whole pixels.
    pub center: Point,
    /// TL, TR, BR, BL in the marker's own orientation.
    pub corners: [PointF; 4],
}

impl Marker {
    pub fn from_detection(detection: &DetectedMarker) -> Self {
        let (sx, sy) = detection
            .corners
            .iter()
            .fold((0.0f32, 0.0f32), |(sx, sy), p| (sx + p.x, sy + p.y));
        Self {
            id: detection.id,
            center: PointF::new(sx / 4.0, sy / 4.0).round(),
            corners: detection.corners,
        }
    }

    /// Corners rounded to whole pixels.
    pub fn corners_rounded(&self) -> [Point; 4] {
        self.corners.map(PointF::round)
    }
}

/// Lookup from marker id to located marker, ordered by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerMap {
    markers: BTreeMap<u32, Marker>,
}

impl MarkerMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, marker: Marker) -> Option<Marker> {
        self.markers.insert(marker.id, marker)
    }

    pub fn get(&self, id: u32) -> Option<&Marker> {
        self.markers.get(&id)
    }

    pub fn center(&self, id: u32) -> Option<Point> {
        self.markers.get(&id).map(|m| m.center)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.markers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.markers.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.markers.values()
    }

    /// Ids from `ids` that are not present, in the order given.
    pub fn missing(&self, ids: &[u32]) -> Vec<u32> {
        ids.iter().copied().filter(|id| !self.contains(*id)).collect()
    }

    /// Fail with [`FormwerkError::MissingMarker`] unless every id is present.
    pub fn require(&self, ids: &[u32]) -> Result<()> {
        let missing = self.missing(ids);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(FormwerkError::MissingMarker(missing))
        }
    }
}

impl FromIterator<Marker> for MarkerMap {
    fn from_iter<I: IntoIterator<Item = Marker>>(iter: I) -> Self {
        Self {
            markers: iter.into_iter().map(|m| (m.id, m)).collect(),
        }
    }
}

// -- Templates ----------------------------------------------------------------

/// What a region holds, which decides how it is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionKind {
    /// Handwritten or printed words, transcribed to a string.
    Text,
    /// A box that is either ticked/filled or left empty.
    Checkbox,
    /// An option that is either circled by hand or not.
    Encirclement,
}

impl std::fmt::Display for RegionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Checkbox => "checkbox",
            Self::Encirclement => "encirclement",
        })
    }
}

/// Where a region sits on the normalised page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionGeometry {
    /// Literal page coordinates, `x1 < x2` and `y1 < y2`.
    Coordinates { x1: i32, y1: i32, x2: i32, y2: i32 },
    /// Marker ids whose centres bound the region: the two horizontal
    /// markers give the x-extent, the two vertical markers the y-extent.
    Markers {
        left: u32,
        right: u32,
        top: u32,
        bottom: u32,
    },
}

impl RegionGeometry {
    /// Marker ids referenced by this geometry, if any.
    pub fn marker_ids(&self) -> Option<[u32; 4]> {
        match *self {
            Self::Coordinates { .. } => None,
            Self::Markers {
                left,
                right,
                top,
                bottom,
            } => Some([left, right, top, bottom]),
        }
    }

    pub fn mode(&self) -> GeometryMode {
        match self {
            Self::Coordinates { .. } => GeometryMode::Coordinates,
            Self::Markers { .. } => GeometryMode::Markers,
        }
    }
}

/// Template-wide switch between literal coordinates and marker references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryMode {
    Coordinates,
    #[default]
    Markers,
}

/// One named field of a form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub kind: RegionKind,
    pub geometry: RegionGeometry,
}

/// A form layout: normalised page size plus the regions to read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub form_type: String,
    #[serde(default)]
    pub form_title: String,
    /// Width of the normalised page in pixels.
    #[serde(alias = "length")]
    pub page_length: u32,
    /// Height of the normalised page in pixels.
    #[serde(alias = "width")]
    pub page_width: u32,
    #[serde(default)]
    pub geometry_mode: GeometryMode,
    pub regions: Vec<Region>,
}

impl Template {
    /// Check the invariants the pipeline relies on.
    pub fn validate(&self) -> Result<()> {
        if self.page_length == 0 || self.page_width == 0 {
            return Err(FormwerkError::InvalidTemplate(format!(
                "page size must be positive, got {}x{}",
                self.page_length, self.page_width
            )));
        }

        let mut names = HashSet::with_capacity(self.regions.len());
        for region in &self.regions {
            if !names.insert(region.name.as_str()) {
                return Err(FormwerkError::InvalidTemplate(format!(
                    "duplicate region name '{}'",
                    region.name
                )));
            }

            if region.geometry.mode() != self.geometry_mode {
                return Err(FormwerkError::InvalidTemplate(format!(
                    "region '{}' uses {:?} geometry in a {:?} template",
                    region.name,
                    region.geometry.mode(),
                    self.geometry_mode
                )));
            }

            if let RegionGeometry::Coordinates { x1, y1, x2, y2 } = region.geometry {
                if x1 >= x2 || y1 >= y2 {
                    return Err(FormwerkError::InvalidTemplate(format!(
                        "region '{}' coordinates must satisfy x1 < x2 and y1 < y2, got [{x1}, {y1}, {x2}, {y2}]",
                        region.name
                    )));
                }
            }
        }

        Ok(())
    }

    /// Every marker id referenced by any region, sorted and deduplicated.
    pub fn referenced_markers(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self
            .regions
            .iter()
            .filter_map(|r| r.geometry.marker_ids())
            .flatten()
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

// -- Results ------------------------------------------------------------------

/// The value read from one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Checkbox ticked / option circled.
    Flag(bool),
    /// Transcribed text.
    Text(String),
}

impl FieldValue {
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(flag) => Some(*flag),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Flag(_) => None,
            Self::Text(text) => Some(text),
        }
    }
}

/// A region that could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionFailure {
    pub region: String,
    pub error: String,
}

/// Everything extracted from one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormReport {
    pub values: BTreeMap<String, FieldValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<RegionFailure>,
}

impl FormReport {
    pub fn get(&self, region: &str) -> Option<&FieldValue> {
        self.values.get(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_never_goes_negative() {
        let b = BBox::new(-5, -5, 20, 20).clamp(10, 10);
        assert_eq!(b, BBox::new(0, 0, 10, 10));

        let outside = BBox::new(50, 50, 10, 10).clamp(10, 10);
        assert!(outside.width >= 0 && outside.height >= 0);
        assert!(outside.is_empty());
    }

    #[test]
    fn pad_inflates_symmetrically() {
        let b = BBox::new(10, 20, 30, 40).pad(5);
        assert_eq!(b, BBox::new(5, 15, 40, 50));
        assert_eq!(b.area(), 2000);
    }

    #[test]
    fn edges_round_trip() {
        let b = BBox::from_edges(3, 4, 30, 40);
        assert_eq!(b.edges(), (3, 4, 30, 40));
        assert_eq!(b.corners()[2], Point::new(30, 40));
    }

    #[test]
    fn vertical_iou_of_disjoint_and_identical_spans() {
        let a = BBox::new(0, 0, 10, 10);
        let b = BBox::new(50, 0, 10, 10);
        let c = BBox::new(0, 30, 10, 10);
        assert!((a.vertical_iou(&b) - 1.0).abs() < 1e-9);
        assert_eq!(a.vertical_iou(&c), 0.0);
    }

    #[test]
    fn marker_center_is_rounded_corner_mean() {
        let m = Marker::from_detection(&DetectedMarker {
            id: 7,
            corners: [
                PointF::new(10.0, 10.0),
                PointF::new(21.0, 10.0),
                PointF::new(21.0, 21.0),
                PointF::new(10.0, 21.0),
            ],
        });
        assert_eq!(m.center, Point::new(16, 16));
    }

    #[test]
    fn require_reports_missing_ids() {
        let map: MarkerMap = [1u32, 3]
            .into_iter()
            .map(|id| Marker {
                id,
                center: Point::default(),
                corners: [PointF::default(); 4],
            })
            .collect();
        assert!(map.require(&[1, 3]).is_ok());
        match map.require(&[1, 2, 3, 4]) {
            Err(FormwerkError::MissingMarker(ids)) => assert_eq!(ids, vec![2, 4]),
            other => panic!("unexpected {other:?}"),
        }
    }

    fn region(name: &str, geometry: RegionGeometry) -> Region {
        Region {
            name: name.into(),
            kind: RegionKind::Checkbox,
            geometry,
        }
    }

    #[test]
    fn validate_rejects_inverted_coordinates_and_duplicates() {
        let mut template = Template {
            form_type: "intake".into(),
            form_title: "Intake".into(),
            page_length: 1700,
            page_width: 2200,
            geometry_mode: GeometryMode::Coordinates,
            regions: vec![region(
                "a",
                RegionGeometry::Coordinates {
                    x1: 10,
                    y1: 10,
                    x2: 5,
                    y2: 20,
                },
            )],
        };
        assert!(matches!(
            template.validate(),
            Err(FormwerkError::InvalidTemplate(_))
        ));

        template.regions = vec![
            region(
                "a",
                RegionGeometry::Coordinates {
                    x1: 0,
                    y1: 0,
                    x2: 5,
                    y2: 5,
                },
            ),
            region(
                "a",
                RegionGeometry::Coordinates {
                    x1: 0,
                    y1: 0,
                    x2: 5,
                    y2: 5,
                },
            ),
        ];
        assert!(template.validate().is_err());
    }

    #[test]
    fn validate_rejects_mixed_geometry() {
        let template = Template {
            form_type: String::new(),
            form_title: String::new(),
            page_length: 100,
            page_width: 100,
            geometry_mode: GeometryMode::Coordinates,
            regions: vec![region(
                "a",
                RegionGeometry::Markers {
                    left: 1,
                    right: 2,
                    top: 3,
                    bottom: 4,
                },
            )],
        };
        assert!(template.validate().is_err());
    }

    #[test]
    fn template_parses_from_json() {
        let json = r#"{
            "form_type": "survey",
            "form_title": "Household survey",
            "length": 1700,
            "width": 2200,
            "geometry_mode": "markers",
            "regions": [
                {"name": "consent", "kind": "checkbox",
                 "geometry": {"markers": {"left": 200, "right": 201, "top": 300, "bottom": 301}}},
                {"name": "name", "kind": "text",
                 "geometry": {"markers": {"left": 202, "right": 203, "top": 302, "bottom": 303}}}
            ]
        }"#;
        let template: Template = serde_json::from_str(json).expect("parse");
        assert_eq!(template.page_length, 1700);
        assert_eq!(template.regions[1].kind, RegionKind::Text);
        assert!(template.validate().is_ok());
        assert_eq!(
            template.referenced_markers(),
            vec![200, 201, 202, 203, 300, 301, 302, 303]
        );
    }

    #[test]
    fn field_values_serialize_untagged() {
        let mut report = FormReport::default();
        report.values.insert("agree".into(), FieldValue::Flag(true));
        report
            .values
            .insert("name".into(), FieldValue::Text("Ada Lovelace".into()));
        let json = serde_json::to_string(&report).expect("serialize");
        assert_eq!(json, r#"{"values":{"agree":true,"name":"Ada Lovelace"}}"#);
    }
}
