// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Mark detectors: boolean classifiers over a grayscale crop, built on the
// shared contour primitive in `crate::contours`.

pub mod checkbox;
pub mod encirclement;

pub use checkbox::CheckboxDetector;
pub use encirclement::EncirclementDetector;
