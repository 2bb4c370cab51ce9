// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Absolute-tolerance comparison of flat float sequences.
//!
//! [`Tensor`](crate::Tensor) equality is exact. These helpers exist for
//! oracle-style checks against reference data, where transcendental
//! activations make bit-exact agreement unreasonable.

/// First element that differs by more than the tolerance.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Mismatch {
    pub index: usize,
    pub expected: f32,
    pub actual: f32,
}

impl std::fmt::Display for Mismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "element {}: expected {}, got {} (diff {})",
            self.index,
            self.expected,
            self.actual,
            (self.expected - self.actual).abs()
        )
    }
}

/// Returns the first position where `|expected - actual| > tol`.
///
/// A length difference is reported at the first index past the shorter
/// sequence, with `NaN` standing in for the missing value. NaN never
/// compares within tolerance.
pub fn first_mismatch(expected: &[f32], actual: &[f32], tol: f32) -> Option<Mismatch> {
    let n = expected.len().max(actual.len());
    (0..n).find_map(|i| {
        let e = expected.get(i).copied().unwrap_or(f32::NAN);
        let a = actual.get(i).copied().unwrap_or(f32::NAN);
        let within = (e - a).abs() <= tol;
        (!within).then_some(Mismatch {
            index: i,
            expected: e,
            actual: a,
        })
    })
}

/// Returns `true` if both sequences have equal length and agree within `tol`.
pub fn approx_eq(expected: &[f32], actual: &[f32], tol: f32) -> bool {
    first_mismatch(expected, actual, tol).is_none()
}

/// Largest absolute element-wise difference, or `None` on a length mismatch.
pub fn max_abs_diff(expected: &[f32], actual: &[f32]) -> Option<f32> {
    if expected.len() != actual.len() {
        return None;
    }
    Some(
        expected
            .iter()
            .zip(actual)
            .map(|(e, a)| (e - a).abs())
            .fold(0.0, f32::max),
    )
}
