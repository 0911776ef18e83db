// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Mask-driven inpainting.
//
// Masked pixels are filled from the outside in. Each round fills every
// masked pixel that touches known content with the distance-weighted mean
// of the known pixels within `radius`, then treats those pixels as known
// for the next round.

use image::{GrayImage, Luma};
use tracing::debug;

/// Fill the pixels where `mask` is non-zero from their surroundings.
///
/// `mask` must have the same dimensions as `image`. Pixels outside the mask
/// are copied unchanged. A mask covering the whole image leaves it as is.
pub fn inpaint(image: &GrayImage, mask: &GrayImage, radius: u32) -> GrayImage {
    let (w, h) = image.dimensions();
    let mut out = image.clone();
    let mut known: Vec<bool> = mask.pixels().map(|p| p.0[0] == 0).collect();
    let r = radius.max(1) as i64;

    let mut pending: Vec<(u32, u32)> = (0..h)
        .flat_map(|y| (0..w).map(move |x| (x, y)))
        .filter(|&(x, y)| !known[(y * w + x) as usize])
        .collect();

    let mut rounds = 0u32;
    while !pending.is_empty() {
        let mut filled = Vec::new();
        let mut still = Vec::new();

        for &(x, y) in &pending {
            let mut weight_sum = 0.0f64;
            let mut value_sum = 0.0f64;
            for dy in -r..=r {
                for dx in -r..=r {
                    let (nx, ny) = (x as i64 + dx, y as i64 + dy);
                    if (dx == 0 && dy == 0) || nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64
                    {
                        continue;
                    }
                    let dist2 = (dx * dx + dy * dy) as f64;
                    if dist2 > (r * r) as f64 || !known[(ny as u32 * w + nx as u32) as usize] {
                        continue;
                    }
                    let weight = 1.0 / dist2;
                    weight_sum += weight;
                    value_sum += weight * out.get_pixel(nx as u32, ny as u32).0[0] as f64;
                }
            }
            if weight_sum > 0.0 {
                filled.push((x, y, (value_sum / weight_sum).round().clamp(0.0, 255.0) as u8));
            } else {
                still.push((x, y));
            }
        }

        if filled.is_empty() {
            break;
        }
        for (x, y, value) in filled {
            out.put_pixel(x, y, Luma([value]));
            known[(y * w + x) as usize] = true;
        }
        pending = still;
        rounds += 1;
    }

    debug!(rounds, unfilled = pending.len(), "Inpainting finished");
    out
}
