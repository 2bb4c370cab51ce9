// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Inference-mode batch normalization.

use crate::{Tensor, TensorError, TensorView};

/// Default variance epsilon.
pub const DEFAULT_EPSILON: f32 = 1e-5;

/// Borrowed per-channel statistics and affine parameters.
#[derive(Debug, Clone, Copy)]
pub struct BatchNormParams<'a> {
    pub gamma: &'a [f32],
    pub beta: &'a [f32],
    pub mean: &'a [f32],
    pub variance: &'a [f32],
    pub epsilon: f32,
}

/// `out = gamma * (x - mean) / sqrt(var + eps) + beta`, per channel.
///
/// Channels are axis 1; rank 2, 3 and 4 inputs are supported.
///
/// # Errors
/// Returns [`TensorError::UnsupportedRank`] for other ranks,
/// [`TensorError::ShapeMismatch`] if input and output shapes differ and
/// [`TensorError::InvalidAttribute`] if a parameter slice does not hold one
/// value per channel.
pub fn batch_norm(
    input: &TensorView<'_>,
    params: &BatchNormParams<'_>,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    let shape = input.shape();
    if !(2..=4).contains(&shape.rank()) {
        return Err(TensorError::UnsupportedRank {
            op: "batch_norm",
            expected: "2, 3 or 4",
            actual: shape.rank(),
        });
    }
    if shape != output.shape() {
        return Err(TensorError::ShapeMismatch {
            op: "batch_norm",
            lhs: shape.clone(),
            rhs: output.shape().clone(),
        });
    }
    let channels = shape.channels();
    for (name, p) in [
        ("gamma", params.gamma),
        ("beta", params.beta),
        ("mean", params.mean),
        ("variance", params.variance),
    ] {
        if p.len() != channels {
            return Err(TensorError::InvalidAttribute {
                op: "batch_norm",
                detail: format!("{name} has {} values for {channels} channels", p.len()),
            });
        }
    }

    for b in 0..shape.batch() {
        for c in 0..channels {
            let denom = (params.variance[c] + params.epsilon).sqrt();
            let (g, beta, mean) = (params.gamma[c], params.beta[c], params.mean[c]);
            let src = input.channel(b, c);
            for (o, &x) in output.channel_mut(b, c).iter_mut().zip(src) {
                *o = g * (x - mean) / denom + beta;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Shape;

    fn approx_eq(a: &[f32], b: &[f32], tol: f32) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < tol)
    }

    #[test]
    fn test_batch_norm_unit_params() {
        let input = Tensor::from_f32(Shape::nchw(1, 1, 1, 3), &[-1.0, 0.0, 1.0]).unwrap();
        let params = BatchNormParams {
            gamma: &[1.0],
            beta: &[0.0],
            mean: &[0.0],
            variance: &[1.0],
            epsilon: DEFAULT_EPSILON,
        };
        let mut out = Tensor::zeros(input.shape().clone());
        batch_norm(&input.view(), &params, &mut out).unwrap();
        assert!(approx_eq(out.as_slice(), &[-0.999995, 0.0, 0.999995], 1e-5));
    }

    #[test]
    fn test_batch_norm_affine() {
        let data: Vec<f32> = (1..=9).map(|x| x as f32).collect();
        let input = Tensor::from_vec(Shape::nchw(1, 1, 3, 3), data).unwrap();
        let params = BatchNormParams {
            gamma: &[1.5],
            beta: &[1.1],
            mean: &[3.0],
            variance: &[0.9],
            epsilon: DEFAULT_EPSILON,
        };
        let mut out = Tensor::zeros(input.shape().clone());
        batch_norm(&input.view(), &params, &mut out).unwrap();
        assert!(approx_eq(
            out.as_slice(),
            &[
                -2.0622602, -0.48113, 1.1, 2.68113, 4.26226, 5.84339, 7.42452, 9.0056505,
                10.586781
            ],
            1e-5
        ));
    }

    #[test]
    fn test_batch_norm_per_channel() {
        let input = Tensor::from_f32(Shape::matrix(1, 2), &[2.0, 2.0]).unwrap();
        let params = BatchNormParams {
            gamma: &[1.0, 2.0],
            beta: &[0.0, 1.0],
            mean: &[1.0, 0.0],
            variance: &[1.0, 4.0],
            epsilon: 0.0,
        };
        let mut out = Tensor::zeros(input.shape().clone());
        batch_norm(&input.view(), &params, &mut out).unwrap();
        assert_eq!(out.as_slice(), &[1.0, 3.0]);
    }

    #[test]
    fn test_batch_norm_param_length() {
        let input = Tensor::zeros(Shape::nchw(1, 2, 2, 2));
        let params = BatchNormParams {
            gamma: &[1.0],
            beta: &[0.0, 0.0],
            mean: &[0.0, 0.0],
            variance: &[1.0, 1.0],
            epsilon: DEFAULT_EPSILON,
        };
        let mut out = Tensor::zeros(input.shape().clone());
        let r = batch_norm(&input.view(), &params, &mut out);
        assert!(matches!(r, Err(TensorError::InvalidAttribute { .. })));
    }
}
