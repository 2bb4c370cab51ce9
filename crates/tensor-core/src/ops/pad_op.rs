// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Explicit constant padding and flattening.

use crate::tensor::write_interior;
use crate::{Padding, Shape, Tensor, TensorError, TensorView};

/// Writes `input` into the interior of `output` and fills the border with `value`.
///
/// `output` must have shape `input.shape().expand_with_padding(padding)`.
/// Padding on an axis the input does not have is rejected, never dropped.
pub fn pad(
    input: &TensorView<'_>,
    padding: &Padding,
    value: f32,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    let expected = input.shape().expand_with_padding(padding)?;
    if output.shape() != &expected {
        return Err(TensorError::ShapeMismatch {
            op: "pad",
            lhs: expected,
            rhs: output.shape().clone(),
        });
    }
    output.fill(value);
    let dst_shape = output.shape().clone();
    write_interior(
        input.shape(),
        input.as_slice(),
        padding,
        &dst_shape,
        output.as_slice_mut(),
    );
    Ok(())
}

/// `(b, ...)` to `(b, product of the rest)`.
pub fn flatten_output_shape(input: &Shape) -> Shape {
    let batch = input.batch();
    Shape::matrix(batch, input.num_elements() / batch)
}

/// Copies `input` unchanged into a `(batch, features)` output.
pub fn flatten(input: &TensorView<'_>, output: &mut Tensor) -> Result<(), TensorError> {
    let expected = flatten_output_shape(input.shape());
    if output.shape() != &expected {
        return Err(TensorError::ShapeMismatch {
            op: "flatten",
            lhs: expected,
            rhs: output.shape().clone(),
        });
    }
    output.as_slice_mut().copy_from_slice(input.as_slice());
    Ok(())
}
