// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Fully connected (dense) layer.

use crate::{Shape, Tensor, TensorError, TensorView};

/// Output shape `(batch, out)` for an input `(batch, in)` and kernel `(out, in)`.
pub fn fully_connected_output_shape(input: &Shape, kernel: &Shape) -> Result<Shape, TensorError> {
    for s in [input, kernel] {
        if s.rank() != 2 {
            return Err(TensorError::UnsupportedRank {
                op: "fully_connected",
                expected: "2",
                actual: s.rank(),
            });
        }
    }
    if input.dims()[1] != kernel.dims()[1] {
        return Err(TensorError::ShapeMismatch {
            op: "fully_connected",
            lhs: input.clone(),
            rhs: kernel.clone(),
        });
    }
    Ok(Shape::matrix(input.dims()[0], kernel.dims()[0]))
}

/// `out[b][i] = sum_j input[b][j] * kernel[i][j] (+ bias[i])`.
///
/// The kernel is stored `(out, in)` row-major; each output sums its inputs
/// in ascending order and adds the bias last.
///
/// # Errors
/// Returns [`TensorError::UnsupportedRank`] unless input, kernel and output
/// are rank 2, and [`TensorError::ShapeMismatch`] on any extent disagreement.
pub fn fully_connected(
    input: &TensorView<'_>,
    kernel: &TensorView<'_>,
    bias: Option<&TensorView<'_>>,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    let expected = fully_connected_output_shape(input.shape(), kernel.shape())?;
    if output.shape() != &expected {
        return Err(TensorError::ShapeMismatch {
            op: "fully_connected",
            lhs: expected,
            rhs: output.shape().clone(),
        });
    }
    let (batch, n_in) = (input.shape().dims()[0], input.shape().dims()[1]);
    let n_out = kernel.shape().dims()[0];
    if let Some(b) = bias {
        if b.shape().num_elements() != n_out {
            return Err(TensorError::ShapeMismatch {
                op: "fully_connected_bias",
                lhs: kernel.shape().clone(),
                rhs: b.shape().clone(),
            });
        }
    }

    let x = input.as_slice();
    let w = kernel.as_slice();
    let bias = bias.map(|b| b.as_slice());
    let dst = output.as_slice_mut();
    for b in 0..batch {
        dense_row(
            &x[b * n_in..(b + 1) * n_in],
            w,
            bias,
            &mut dst[b * n_out..(b + 1) * n_out],
        );
    }
    Ok(())
}

/// One batch row of a dense layer.
pub fn dense_row(x: &[f32], w: &[f32], bias: Option<&[f32]>, out: &mut [f32]) {
    let n_in = x.len();
    for (i, o) in out.iter_mut().enumerate() {
        let row = &w[i * n_in..(i + 1) * n_in];
        let mut acc = 0.0f32;
        for (&xj, &wj) in x.iter().zip(row) {
            acc += xj * wj;
        }
        if let Some(bias) = bias {
            acc += bias[i];
        }
        *o = acc;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: &[f32], b: &[f32], tol: f32) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < tol)
    }

    /// Transposes an `(rows, cols)` row-major buffer.
    fn transpose(v: &[f32], rows: usize, cols: usize) -> Vec<f32> {
        let mut t = vec![0.0; v.len()];
        for r in 0..rows {
            for c in 0..cols {
                t[c * rows + r] = v[r * cols + c];
            }
        }
        t
    }

    #[test]
    fn test_fully_connected_fixture() {
        let input = Tensor::from_f32(Shape::matrix(1, 6), &[-2.0, 4.0, 1.0, 8.0, -5.0, 0.0]).unwrap();
        // Fixture weights are listed input-major; the kernel is output-major.
        let in_major = [
            -0.5, 0.2, -0.3, 0.1, -0.1, -1.0, -0.9, 0.4, 0.8, 0.5, -0.1, -0.4, -0.4, -0.9, -0.9,
            -0.8, -0.3, 0.5, 0.7, -0.9, -0.3, 0.4, 0.9, -0.7,
        ];
        let kernel = Tensor::from_vec(Shape::matrix(4, 6), transpose(&in_major, 6, 4)).unwrap();
        let bias = Tensor::from_f32(Shape::vector(4), &[6.0, -3.0, 0.0, 1.0]).unwrap();

        let mut out = Tensor::zeros(Shape::matrix(1, 4));
        fully_connected(&input.view(), &kernel.view(), Some(&bias.view()), &mut out).unwrap();
        assert!(approx_eq(
            out.as_slice(),
            &[5.6999, -16.6, -13.8, 0.0999],
            1e-3
        ));
    }

    #[test]
    fn test_fully_connected_batched_no_bias() {
        let input = Tensor::from_f32(Shape::matrix(2, 2), &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let kernel = Tensor::from_f32(Shape::matrix(3, 2), &[1.0, 0.0, 0.0, 1.0, 1.0, 1.0]).unwrap();
        let mut out = Tensor::zeros(Shape::matrix(2, 3));
        fully_connected(&input.view(), &kernel.view(), None, &mut out).unwrap();
        assert_eq!(out.as_slice(), &[1.0, 2.0, 3.0, 3.0, 4.0, 7.0]);
    }

    #[test]
    fn test_fully_connected_rejects_rank() {
        let input = Tensor::zeros(Shape::nchw(1, 1, 2, 2));
        let kernel = Tensor::zeros(Shape::matrix(2, 4));
        let mut out = Tensor::zeros(Shape::matrix(1, 2));
        let r = fully_connected(&input.view(), &kernel.view(), None, &mut out);
        assert!(matches!(r, Err(TensorError::UnsupportedRank { .. })));
    }

    #[test]
    fn test_fully_connected_inner_dim_mismatch() {
        let r = fully_connected_output_shape(&Shape::matrix(1, 3), &Shape::matrix(2, 4));
        assert!(matches!(r, Err(TensorError::ShapeMismatch { .. })));
    }
}
