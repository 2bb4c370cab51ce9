// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Comparison of network outputs against stored reference tensors.

use crate::RuntimeError;
use std::collections::HashMap;
use tensor_core::{compare, Tensor};

/// Outcome of a successful reference check.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ReferenceReport {
    /// `(output name, largest absolute difference)` for every compared output.
    pub compared: Vec<(String, f32)>,
    pub tolerance: f32,
}

impl ReferenceReport {
    /// Largest difference across all compared outputs.
    pub fn max_abs_diff(&self) -> f32 {
        self.compared.iter().map(|(_, d)| *d).fold(0.0, f32::max)
    }
}

/// Compares `outputs` against `reference` within an absolute tolerance.
///
/// With a single output and a single reference tensor the two are compared
/// whatever their names. Otherwise outputs are matched to reference tensors
/// by name; reference tensors that name no output are skipped with a
/// warning.
///
/// # Errors
/// [`RuntimeError::ReferenceMismatch`] on the first element outside the
/// tolerance or a size difference, [`RuntimeError::InputMismatch`] if no
/// output could be paired with a reference tensor.
pub fn compare_with_reference(
    outputs: &[(String, Tensor)],
    reference: &HashMap<String, Tensor>,
    tolerance: f32,
) -> Result<ReferenceReport, RuntimeError> {
    let pairs: Vec<(&str, &Tensor, &Tensor)> = match (outputs, reference.len()) {
        ([(name, actual)], 1) => reference
            .values()
            .map(|expected| (name.as_str(), expected, actual))
            .collect(),
        _ => {
            for key in reference.keys() {
                if !outputs.iter().any(|(n, _)| n == key) {
                    tracing::warn!(tensor = %key, "reference tensor matches no output");
                }
            }
            outputs
                .iter()
                .filter_map(|(name, actual)| {
                    reference.get(name).map(|e| (name.as_str(), e, actual))
                })
                .collect()
        }
    };

    if pairs.is_empty() {
        return Err(RuntimeError::InputMismatch {
            name: "reference".into(),
            detail: "no reference tensor matches a network output".into(),
        });
    }

    let mut compared = Vec::with_capacity(pairs.len());
    for (name, expected, actual) in pairs {
        if let Some(m) = compare::first_mismatch(expected.as_slice(), actual.as_slice(), tolerance) {
            return Err(RuntimeError::ReferenceMismatch {
                output: name.to_string(),
                index: m.index,
                expected: m.expected,
                actual: m.actual,
                tolerance,
            });
        }
        let diff = compare::max_abs_diff(expected.as_slice(), actual.as_slice()).unwrap_or(0.0);
        tracing::debug!(output = %name, max_abs_diff = diff, "output matches reference");
        compared.push((name.to_string(), diff));
    }

    Ok(ReferenceReport {
        compared,
        tolerance,
    })
}
