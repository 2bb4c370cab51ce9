// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-side spatial padding.

use crate::TensorError;

/// Padding amounts for the spatial axes of a tensor.
///
/// 2-D padding uses all four sides. 1-D padding lives on the width axis
/// (`left` = begin, `right` = end) with `top` and `bottom` at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Padding {
    pub top: usize,
    pub left: usize,
    pub bottom: usize,
    pub right: usize,
}

impl Padding {
    /// 2-D padding.
    pub fn new(top: usize, left: usize, bottom: usize, right: usize) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    /// 1-D padding on the width axis.
    pub fn one_d(begin: usize, end: usize) -> Self {
        Self {
            top: 0,
            left: begin,
            bottom: 0,
            right: end,
        }
    }

    /// Same amount on every side.
    pub fn uniform(amount: usize) -> Self {
        Self::new(amount, amount, amount, amount)
    }

    /// No padding.
    pub fn none() -> Self {
        Self::default()
    }

    /// Builds padding from a list of 0, 2 or 4 values.
    ///
    /// Two values are `[begin, end]` on the width axis; four values are
    /// `[top, left, bottom, right]` (begin values for each axis first, then
    /// end values).
    pub fn from_slice(values: &[usize]) -> Result<Self, TensorError> {
        match *values {
            [] => Ok(Self::none()),
            [begin, end] => Ok(Self::one_d(begin, end)),
            [top, left, bottom, right] => Ok(Self::new(top, left, bottom, right)),
            _ => Err(TensorError::InvalidAttribute {
                op: "padding",
                detail: format!("expected 0, 2 or 4 values, got {}", values.len()),
            }),
        }
    }

    /// Returns `true` if no side is padded.
    pub fn is_zero(&self) -> bool {
        self.top == 0 && self.left == 0 && self.bottom == 0 && self.right == 0
    }

    /// Returns the four sides in `[top, left, bottom, right]` order.
    pub fn as_array(&self) -> [usize; 4] {
        [self.top, self.left, self.bottom, self.right]
    }
}
