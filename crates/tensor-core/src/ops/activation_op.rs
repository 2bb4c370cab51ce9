// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Element-wise, shape-preserving activations.

use crate::{Tensor, TensorError, TensorView};

fn check_same_shape(
    op: &'static str,
    input: &TensorView<'_>,
    output: &Tensor,
) -> Result<(), TensorError> {
    if input.shape() != output.shape() {
        return Err(TensorError::ShapeMismatch {
            op,
            lhs: input.shape().clone(),
            rhs: output.shape().clone(),
        });
    }
    Ok(())
}

/// Applies `f` to every element of `input`, writing into `output`.
fn map_elementwise(
    op: &'static str,
    input: &TensorView<'_>,
    output: &mut Tensor,
    f: impl Fn(f32) -> f32,
) -> Result<(), TensorError> {
    check_same_shape(op, input, output)?;
    for (d, &x) in output.as_slice_mut().iter_mut().zip(input.as_slice()) {
        *d = f(x);
    }
    Ok(())
}

/// Copies the input unchanged.
pub fn identity(input: &TensorView<'_>, output: &mut Tensor) -> Result<(), TensorError> {
    check_same_shape("identity", input, output)?;
    output.as_slice_mut().copy_from_slice(input.as_slice());
    Ok(())
}

/// `max(0, x)`.
pub fn relu(input: &TensorView<'_>, output: &mut Tensor) -> Result<(), TensorError> {
    map_elementwise("relu", input, output, |x| if x > 0.0 { x } else { 0.0 })
}

/// `x` for positive inputs, `alpha * x` otherwise.
pub fn leaky_relu(
    input: &TensorView<'_>,
    alpha: f32,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    map_elementwise("leaky_relu", input, output, |x| {
        if x > 0.0 {
            x
        } else {
            alpha * x
        }
    })
}

/// Leaky ReLU with a per-element slope tensor of the input's shape.
pub fn prelu(
    input: &TensorView<'_>,
    slope: &TensorView<'_>,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    check_same_shape("prelu", input, output)?;
    if slope.shape() != input.shape() {
        return Err(TensorError::ShapeMismatch {
            op: "prelu",
            lhs: input.shape().clone(),
            rhs: slope.shape().clone(),
        });
    }
    let dst = output.as_slice_mut();
    for ((d, &x), &a) in dst.iter_mut().zip(input.as_slice()).zip(slope.as_slice()) {
        *d = if x > 0.0 { x } else { a * x };
    }
    Ok(())
}

/// `min(max(x, low), high)`.
pub fn clip(
    input: &TensorView<'_>,
    low: f32,
    high: f32,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    if low > high {
        return Err(TensorError::InvalidAttribute {
            op: "clip",
            detail: format!("lower bound {low} exceeds upper bound {high}"),
        });
    }
    map_elementwise("clip", input, output, |x| x.max(low).min(high))
}

/// `1 / (1 + exp(-x))`.
pub fn sigmoid(input: &TensorView<'_>, output: &mut Tensor) -> Result<(), TensorError> {
    map_elementwise("sigmoid", input, output, |x| 1.0 / (1.0 + (-x).exp()))
}

/// Hyperbolic tangent.
pub fn tanh(input: &TensorView<'_>, output: &mut Tensor) -> Result<(), TensorError> {
    map_elementwise("tanh", input, output, f32::tanh)
}
