// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fiducial alignment: rectify a photographed page into the template's
// canonical rectangle using the four corner markers.

use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use tracing::{debug, info, instrument, warn};

use formwerk_core::config::AlignmentConfig;
use formwerk_core::{AlignmentFailure, FormwerkError, Marker, MarkerMap, PointF, Result};

use crate::markers::{MarkerDetector, locate_markers};

/// The four alignment markers, by the page corner each one pins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CornerMarkers {
    pub top_left: Marker,
    pub top_right: Marker,
    pub bottom_right: Marker,
    pub bottom_left: Marker,
}

impl CornerMarkers {
    /// The corner of each marker nearest its page corner, in TL, TR, BR, BL
    /// order.
    pub fn outer_corners(&self) -> [PointF; 4] {
        [
            self.top_left.corners[0],
            self.top_right.corners[1],
            self.bottom_right.corners[2],
            self.bottom_left.corners[3],
        ]
    }
}

/// Maps a captured page onto a `page_length × page_width` canvas.
#[derive(Debug, Clone)]
pub struct FiducialAligner {
    marker_ids: [u32; 4],
}

impl FiducialAligner {
    pub fn new(config: &AlignmentConfig) -> Self {
        Self {
            marker_ids: config.marker_ids,
        }
    }

    pub fn marker_ids(&self) -> [u32; 4] {
        self.marker_ids
    }

    /// Detect the alignment markers in `image` and rectify it.
    ///
    /// An image with no markers at all fails the same way as one missing
    /// some of them: [`AlignmentFailure::MissingMarkers`].
    #[instrument(skip(self, image, detector), fields(width = image.width(), height = image.height()))]
    pub fn align(
        &self,
        image: &RgbImage,
        detector: &dyn MarkerDetector,
        page_length: u32,
        page_width: u32,
    ) -> Result<RgbImage> {
        let markers = match locate_markers(image, detector) {
            Ok(markers) => markers,
            Err(FormwerkError::NoMarkersFound) => {
                return Err(AlignmentFailure::MissingMarkers(self.marker_ids.to_vec()).into());
            }
            Err(other) => return Err(other),
        };
        self.align_with_markers(image, &markers, page_length, page_width)
    }

    /// Rectify `image` using markers that were already located in it.
    pub fn align_with_markers(
        &self,
        image: &RgbImage,
        markers: &MarkerMap,
        page_length: u32,
        page_width: u32,
    ) -> Result<RgbImage> {
        if page_length == 0 || page_width == 0 {
            return Err(FormwerkError::InvalidTemplate(format!(
                "page size must be positive, got {page_length}x{page_width}"
            )));
        }

        let corners = self.assign_roles(markers)?;
        let src = corners.outer_corners().map(|p| (p.x, p.y));
        let (l, w) = (page_length as f32, page_width as f32);
        let dst = [(0.0, 0.0), (l, 0.0), (l, w), (0.0, w)];
        debug!(?src, "Alignment source corners");

        let Some(projection) = Projection::from_control_points(src, dst) else {
            warn!("Alignment markers do not define a projective transform");
            return Err(AlignmentFailure::DegenerateTransform.into());
        };

        let mut output = RgbImage::new(page_length, page_width);
        warp_into(
            image,
            &projection,
            Interpolation::Bilinear,
            Rgb([255u8, 255, 255]),
            &mut output,
        );

        info!(page_length, page_width, "Page aligned");
        Ok(output)
    }

    /// Decide which alignment marker pins which page corner.
    ///
    /// Smallest `x + y` is top-left and largest is bottom-right; of the
    /// other two the one further right is top-right. Ties make the
    /// assignment ambiguous.
    pub fn assign_roles(&self, markers: &MarkerMap) -> Result<CornerMarkers> {
        let missing = markers.missing(&self.marker_ids);
        if !missing.is_empty() {
            warn!(?missing, "Alignment markers missing");
            return Err(AlignmentFailure::MissingMarkers(missing).into());
        }

        let found: Vec<Marker> = self
            .marker_ids
            .iter()
            .filter_map(|&id| markers.get(id).copied())
            .collect();
        let sum = |m: &Marker| m.center.x as i64 + m.center.y as i64;

        let tl = unique_extreme(&found, |a, b| sum(a) < sum(b))
            .ok_or(AlignmentFailure::AmbiguousRoles)?;
        let br = unique_extreme(&found, |a, b| sum(a) > sum(b))
            .ok_or(AlignmentFailure::AmbiguousRoles)?;
        if tl == br {
            return Err(AlignmentFailure::AmbiguousRoles.into());
        }

        let rest: Vec<Marker> = found
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != tl && *i != br)
            .map(|(_, m)| *m)
            .collect();
        let (tr, bl) = match rest[0].center.x.cmp(&rest[1].center.x) {
            std::cmp::Ordering::Greater => (rest[0], rest[1]),
            std::cmp::Ordering::Less => (rest[1], rest[0]),
            std::cmp::Ordering::Equal => return Err(AlignmentFailure::AmbiguousRoles.into()),
        };

        Ok(CornerMarkers {
            top_left: found[tl],
            top_right: tr,
            bottom_right: found[br],
            bottom_left: bl,
        })
    }
}

/// Index of the element that beats every other under `better`, or `None`
/// when the best value is shared.
fn unique_extreme(items: &[Marker], better: impl Fn(&Marker, &Marker) -> bool) -> Option<usize> {
    let mut best = 0;
    for i in 1..items.len() {
        if better(&items[i], &items[best]) {
            best = i;
        }
    }
    let shared = items
        .iter()
        .enumerate()
        .any(|(i, m)| i != best && !better(&items[best], m));
    (!shared).then_some(best)
}
