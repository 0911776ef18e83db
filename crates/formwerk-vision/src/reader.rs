// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The per-kind region reading strategy.

use image::RgbImage;

use formwerk_core::{FieldValue, RegionKind, Result};

/// Reads one kind of region from its colour crop.
///
/// Implementations are pure: the same crop always yields the same value,
/// and "nothing there" is a value (an unchecked box, an empty string),
/// never an error.
pub trait FieldReader: Send + Sync {
    /// The region kind this reader handles.
    fn kind(&self) -> RegionKind;

    fn read(&self, crop: &RgbImage) -> Result<FieldValue>;
}
