// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Region location and cropping on the aligned page.

use image::imageops::crop_imm;
use image::{GenericImageView, ImageBuffer, Pixel};
use tracing::debug;

use formwerk_core::{BBox, FormwerkError, MarkerMap, Region, RegionGeometry, Result};

/// Resolve a region's geometry to a box on the aligned page.
///
/// Literal coordinates come back unchanged. Marker geometry takes the
/// x-extent from the min/max centre x of the left and right markers, and
/// the y-extent from the min/max centre y of the top and bottom markers.
/// `markers` is only consulted for marker geometry.
pub fn locate_region(region: &Region, markers: Option<&MarkerMap>) -> Result<BBox> {
    match region.geometry {
        RegionGeometry::Coordinates { x1, y1, x2, y2 } => Ok(BBox::from_edges(x1, y1, x2, y2)),
        RegionGeometry::Markers {
            left,
            right,
            top,
            bottom,
        } => {
            let ids = [left, right, top, bottom];
            let unresolved = |missing: Vec<u32>| FormwerkError::MarkerResolutionFailed {
                region: region.name.clone(),
                missing,
            };
            let Some(map) = markers else {
                return Err(unresolved(ids.to_vec()));
            };
            let missing = map.missing(&ids);
            if !missing.is_empty() {
                return Err(unresolved(missing));
            }

            let centre = |id: u32| map.center(id).ok_or_else(|| unresolved(vec![id]));
            let (l, r) = (centre(left)?, centre(right)?);
            let (t, b) = (centre(top)?, centre(bottom)?);

            let bbox = BBox::from_edges(l.x.min(r.x), t.y.min(b.y), l.x.max(r.x), t.y.max(b.y));
            debug!(region = %region.name, ?bbox, "Region resolved from markers");
            Ok(bbox)
        }
    }
}

/// Copy the part of `image` under `bbox`, clipped to the image.
///
/// Returns `None` when nothing of the box lies inside the image.
pub fn crop_box<I, P>(image: &I, bbox: BBox) -> Option<ImageBuffer<P, Vec<P::Subpixel>>>
where
    I: GenericImageView<Pixel = P> + 'static,
    P: Pixel + 'static,
{
    let (w, h) = image.dimensions();
    let clipped = bbox.clamp(w, h);
    if clipped.is_empty() {
        return None;
    }
    Some(
        crop_imm(
            image,
            clipped.x as u32,
            clipped.y as u32,
            clipped.width as u32,
            clipped.height as u32,
        )
        .to_image(),
    )
}

/// Locate `region` and crop it, failing with
/// [`FormwerkError::DegenerateRegion`] when the box misses the page.
pub fn crop_region<I, P>(
    image: &I,
    region: &Region,
    markers: Option<&MarkerMap>,
) -> Result<(BBox, ImageBuffer<P, Vec<P::Subpixel>>)>
where
    I: GenericImageView<Pixel = P> + 'static,
    P: Pixel + 'static,
{
    let bbox = locate_region(region, markers)?;
    let crop = crop_box(image, bbox).ok_or_else(|| FormwerkError::DegenerateRegion {
        region: region.name.clone(),
    })?;
    Ok((bbox, crop))
}
