// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Softmax activation operation.

use crate::{Tensor, TensorError, TensorView};

/// Computes softmax per row of a `(batch, features)` tensor:
/// `output[i] = exp(x[i] - max) / sum(exp(x - max))`.
///
/// Subtracting the row maximum before exponentiation keeps large logits
/// from overflowing.
///
/// # Errors
/// Returns [`TensorError::UnsupportedRank`] unless the input is rank 2, and
/// [`TensorError::ShapeMismatch`] if input and output shapes differ.
pub fn softmax(input: &TensorView<'_>, output: &mut Tensor) -> Result<(), TensorError> {
    if input.shape().rank() != 2 {
        return Err(TensorError::UnsupportedRank {
            op: "softmax",
            expected: "2",
            actual: input.shape().rank(),
        });
    }
    if input.shape() != output.shape() {
        return Err(TensorError::ShapeMismatch {
            op: "softmax",
            lhs: input.shape().clone(),
            rhs: output.shape().clone(),
        });
    }

    let row_len = input.shape().dims()[1];
    let src = input.as_slice();
    let dst = output.as_slice_mut();

    for (row_src, row_dst) in src.chunks_exact(row_len).zip(dst.chunks_exact_mut(row_len)) {
        let max_val = row_src.iter().copied().fold(f32::NEG_INFINITY, f32::max);

        let mut sum = 0.0f32;
        for (d, &s) in row_dst.iter_mut().zip(row_src) {
            let e = (s - max_val).exp();
            *d = e;
            sum += e;
        }

        if sum > 0.0 {
            let inv_sum = 1.0 / sum;
            for d in row_dst.iter_mut() {
                *d *= inv_sum;
            }
        }
    }

    Ok(())
}
