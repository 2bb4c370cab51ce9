// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Element-wise addition, used for residual joins.

use crate::{Tensor, TensorError, TensorView};

/// `output[i] = a[i] + b[i]`. All three shapes must be equal.
pub fn add(a: &TensorView<'_>, b: &TensorView<'_>, output: &mut Tensor) -> Result<(), TensorError> {
    for other in [b.shape(), output.shape()] {
        if a.shape() != other {
            return Err(TensorError::ShapeMismatch {
                op: "add",
                lhs: a.shape().clone(),
                rhs: other.clone(),
            });
        }
    }
    let dst = output.as_slice_mut();
    for ((d, &x), &y) in dst.iter_mut().zip(a.as_slice()).zip(b.as_slice()) {
        *d = x + y;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Shape;

    #[test]
    fn test_add() {
        let a = Tensor::from_f32(Shape::nchw(1, 1, 2, 2), &[1.0, -2.0, 3.5, 0.0]).unwrap();
        let b = Tensor::from_f32(Shape::nchw(1, 1, 2, 2), &[4.0, 2.0, -0.5, 7.0]).unwrap();
        let mut out = Tensor::zeros(a.shape().clone());
        add(&a.view(), &b.view(), &mut out).unwrap();
        assert_eq!(out.as_slice(), &[5.0, 0.0, 3.0, 7.0]);
    }

    #[test]
    fn test_add_shape_mismatch() {
        let a = Tensor::zeros(Shape::matrix(1, 4));
        let b = Tensor::zeros(Shape::matrix(2, 2));
        let mut out = Tensor::zeros(Shape::matrix(1, 4));
        assert!(add(&a.view(), &b.view(), &mut out).is_err());
    }
}
