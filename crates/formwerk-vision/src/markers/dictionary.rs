// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Marker dictionaries, rotation-aware code matching and marker rendering.
//
// Codes store the inner `n × n` cells row-major (`idx = y * n + x`) with a
// black cell read as 1. The one-cell black border is implicit.

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

use formwerk_core::{FormwerkError, Result};

/// A family of square binary markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dictionary {
    pub name: String,
    /// Inner cells per side, excluding the border.
    pub marker_size: u32,
    /// Largest Hamming distance the family tolerates while staying unique.
    #[serde(default)]
    pub max_correction_bits: u8,
    /// Code for each id; the id is the index.
    pub codes: Vec<u64>,
}

impl Dictionary {
    /// Number of data bits per marker.
    pub fn bit_count(&self) -> u32 {
        self.marker_size.saturating_mul(self.marker_size)
    }

    /// Reject dictionaries the detector cannot decode.
    pub fn validate(&self) -> Result<()> {
        if !(2..=8).contains(&self.marker_size) {
            return Err(FormwerkError::InvalidConfig(format!(
                "dictionary '{}': marker_size must be between 2 and 8, got {}",
                self.name, self.marker_size
            )));
        }
        if self.codes.is_empty() {
            return Err(FormwerkError::InvalidConfig(format!(
                "dictionary '{}' has no codes",
                self.name
            )));
        }
        if self.bit_count() < 64 {
            let limit = 1u64 << self.bit_count();
            if let Some(pos) = self.codes.iter().position(|&c| c >= limit) {
                return Err(FormwerkError::InvalidConfig(format!(
                    "dictionary '{}': code for id {pos} does not fit {} bits",
                    self.name,
                    self.bit_count()
                )));
            }
        }
        Ok(())
    }

    pub fn code(&self, id: u32) -> Option<u64> {
        self.codes.get(id as usize).copied()
    }
}

/// Rotate a code clockwise by `rot` quarter turns.
///
/// One quarter turn moves the top-left cell to the top-right.
pub fn rotate_code(code: u64, n: usize, rot: u8) -> u64 {
    let rot = rot & 3;
    if rot == 0 {
        return code;
    }

    let mut out = 0u64;
    for y in 0..n {
        for x in 0..n {
            let (sx, sy) = match rot {
                1 => (y, n - 1 - x),
                2 => (n - 1 - x, n - 1 - y),
                _ => (n - 1 - y, x),
            };
            out |= ((code >> (sy * n + sx)) & 1) << (y * n + x);
        }
    }
    out
}

/// A dictionary match for an observed code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub id: u32,
    /// Quarter turns such that `observed == rotate_code(code, n, rotation)`.
    pub rotation: u8,
    pub hamming: u8,
}

/// Brute-force matcher over every id and rotation.
#[derive(Debug, Clone)]
pub struct Matcher {
    marker_size: u32,
    max_hamming: u8,
    rotated: Vec<[u64; 4]>,
}

impl Matcher {
    pub fn new(dict: &Dictionary, max_hamming: u8) -> Self {
        let n = dict.marker_size as usize;
        let rotated = dict
            .codes
            .iter()
            .map(|&code| [0u8, 1, 2, 3].map(|r| rotate_code(code, n, r)))
            .collect();
        Self {
            marker_size: dict.marker_size,
            max_hamming,
            rotated,
        }
    }

    pub fn marker_size(&self) -> u32 {
        self.marker_size
    }

    /// Closest id and rotation within the Hamming limit. Ties keep the
    /// lowest id and rotation.
    pub fn match_code(&self, observed: u64) -> Option<Match> {
        let mut best: Option<Match> = None;
        for (id, rots) in self.rotated.iter().enumerate() {
            for (rot, &candidate) in rots.iter().enumerate() {
                let hamming = (observed ^ candidate).count_ones() as u8;
                if hamming > self.max_hamming {
                    continue;
                }
                if best.is_none_or(|b| hamming < b.hamming) {
                    best = Some(Match {
                        id: id as u32,
                        rotation: rot as u8,
                        hamming,
                    });
                    if hamming == 0 {
                        return best;
                    }
                }
            }
        }
        best
    }
}

/// Draw marker `id` with `cell_px` pixels per cell, border included.
///
/// Returns `None` when the dictionary has no such id.
pub fn render_marker(dict: &Dictionary, id: u32, cell_px: u32) -> Option<GrayImage> {
    let code = dict.code(id)?;
    let n = dict.marker_size;
    let side = (n + 2) * cell_px;

    Some(GrayImage::from_fn(side, side, |x, y| {
        let (cx, cy) = (x / cell_px, y / cell_px);
        let black = if cx == 0 || cy == 0 || cx == n + 1 || cy == n + 1 {
            true
        } else {
            let idx = (cy - 1) * n + (cx - 1);
            (code >> idx) & 1 == 1
        };
        Luma([if black { 0u8 } else { 255u8 }])
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::dictionary;

    #[test]
    fn four_quarter_turns_are_identity() {
        let code = 0xbeef;
        let r = (0..4).fold(code, |c, _| rotate_code(c, 4, 1));
        assert_eq!(r, code);
        assert_eq!(rotate_code(rotate_code(code, 4, 1), 4, 1), rotate_code(code, 4, 2));
    }

    #[test]
    fn quarter_turn_moves_top_left_to_top_right() {
        assert_eq!(rotate_code(1, 4, 1), 1 << 3);
        assert_eq!(rotate_code(1, 4, 2), 1 << 15);
        assert_eq!(rotate_code(1, 4, 3), 1 << 12);
    }

    #[test]
    fn matcher_recovers_id_and_rotation() {
        let dict = dictionary();
        let matcher = Matcher::new(&dict, 0);
        let observed = rotate_code(dict.codes[2], 4, 3);
        let m = matcher.match_code(observed).expect("match");
        assert_eq!((m.id, m.rotation, m.hamming), (2, 3, 0));
    }

    #[test]
    fn matcher_tolerates_flipped_bits_within_limit() {
        let dict = dictionary();
        let observed = dict.codes[1] ^ (1 << 14);
        assert!(Matcher::new(&dict, 0).match_code(observed).is_none());
        let m = Matcher::new(&dict, 1).match_code(observed).expect("match");
        assert_eq!((m.id, m.hamming), (1, 1));
    }

    #[test]
    fn rendered_marker_has_black_border_and_code_bits() {
        let dict = dictionary();
        let img = render_marker(&dict, 0, 10).expect("id 0 exists");
        assert_eq!(img.dimensions(), (60, 60));
        assert_eq!(img.get_pixel(5, 30).0[0], 0);
        // Inner cell (0, 0) is bit 0, set in code 0.
        assert_eq!(img.get_pixel(15, 15).0[0], 0);
        // Inner cell (1, 0) is bit 1, clear in code 0.
        assert_eq!(img.get_pixel(25, 15).0[0], 255);
        assert!(render_marker(&dict, 99, 10).is_none());
    }

    #[test]
    fn validate_rejects_oversized_codes() {
        let mut dict = dictionary();
        assert!(dict.validate().is_ok());
        dict.codes.push(1 << 16);
        assert!(dict.validate().is_err());
        dict.marker_size = 9;
        assert!(dict.validate().is_err());
    }

    #[test]
    fn huge_marker_size_is_rejected_without_overflow() {
        let mut dict = dictionary();
        dict.marker_size = 70_000;
        assert!(matches!(dict.validate(), Err(FormwerkError::InvalidConfig(_))));
        assert_eq!(dict.bit_count(), u32::MAX);
    }

    #[test]
    fn dictionary_parses_from_json() {
        let dict: Dictionary = serde_json::from_str(
            r#"{"name": "tiny", "marker_size": 4, "max_correction_bits": 1, "codes": [1057, 579]}"#,
        )
        .expect("parse");
        assert_eq!(dict.code(1), Some(579));
        assert_eq!(dict.bit_count(), 16);
    }
}
