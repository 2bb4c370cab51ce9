// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Local response normalization across channels.

use crate::{Tensor, TensorError, TensorView};

/// LRN attributes. `size` is the channel window `n`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LrnAttrs {
    pub alpha: f32,
    pub beta: f32,
    #[serde(default = "default_bias")]
    pub bias: f32,
    pub size: usize,
}

fn default_bias() -> f32 {
    1.0
}

impl Default for LrnAttrs {
    fn default() -> Self {
        Self {
            alpha: 1e-4,
            beta: 0.75,
            bias: default_bias(),
            size: 5,
        }
    }
}

/// `out = x / (bias + alpha / n * sum(x[c']^2))^beta`, where `c'` spans
/// `max(0, c - n/2) ..= min(C - 1, c + n/2)` at the same spatial position.
///
/// # Errors
/// Returns [`TensorError::UnsupportedRank`] unless the input is rank 3 or 4,
/// [`TensorError::ShapeMismatch`] if input and output shapes differ and
/// [`TensorError::InvalidAttribute`] for a zero window.
pub fn lrn(input: &TensorView<'_>, attrs: &LrnAttrs, output: &mut Tensor) -> Result<(), TensorError> {
    let shape = input.shape();
    if !(3..=4).contains(&shape.rank()) {
        return Err(TensorError::UnsupportedRank {
            op: "lrn",
            expected: "3 or 4",
            actual: shape.rank(),
        });
    }
    if shape != output.shape() {
        return Err(TensorError::ShapeMismatch {
            op: "lrn",
            lhs: shape.clone(),
            rhs: output.shape().clone(),
        });
    }
    if attrs.size == 0 {
        return Err(TensorError::InvalidAttribute {
            op: "lrn",
            detail: "window size must be at least 1".into(),
        });
    }

    let channels = shape.channels();
    let half = attrs.size / 2;
    let scale = attrs.alpha / attrs.size as f32;
    let plane = shape.spatial_elements();

    for b in 0..shape.batch() {
        for c in 0..channels {
            let from = c.saturating_sub(half);
            let to = (c + half).min(channels - 1);
            let src = input.channel(b, c);
            let dst = output.channel_mut(b, c);
            for p in 0..plane {
                let mut sum = 0.0f32;
                for c2 in from..=to {
                    let v = input.channel(b, c2)[p];
                    sum += v * v;
                }
                dst[p] = src[p] / (attrs.bias + scale * sum).powf(attrs.beta);
            }
        }
    }
    Ok(())
}
