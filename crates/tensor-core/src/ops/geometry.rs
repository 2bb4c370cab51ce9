// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Sliding-window geometry shared by convolution and pooling.

use crate::{Padding, TensorError};

/// Number of spatial axes a windowed operator works over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpatialRank {
    /// Rank-3 tensors `(batch, channels, width)`.
    OneD,
    /// Rank-4 tensors `(batch, channels, height, width)`.
    TwoD,
}

impl SpatialRank {
    /// Resolves the spatial rank from a tensor rank.
    pub fn from_tensor_rank(op: &'static str, rank: usize) -> Result<Self, TensorError> {
        match rank {
            3 => Ok(Self::OneD),
            4 => Ok(Self::TwoD),
            actual => Err(TensorError::UnsupportedRank {
                op,
                expected: "3 or 4",
                actual,
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneD => "1d",
            Self::TwoD => "2d",
        }
    }
}

/// Geometry of one single-channel window pass (one input plane to one
/// output plane).
///
/// 1-D planes are expressed with `in_h = k_h = out_h = 1` and zero
/// vertical padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct PlaneGeometry {
    pub in_h: usize,
    pub in_w: usize,
    pub k_h: usize,
    pub k_w: usize,
    pub stride_h: usize,
    pub stride_w: usize,
    pub pad_top: usize,
    pub pad_left: usize,
    /// Horizontal dilation; vertical dilation is always 1.
    pub dilation: usize,
    pub out_h: usize,
    pub out_w: usize,
}

impl PlaneGeometry {
    /// Computes the output plane for the given input plane and window.
    pub fn resolve(
        op: &'static str,
        (in_h, in_w): (usize, usize),
        (k_h, k_w): (usize, usize),
        (stride_h, stride_w): (usize, usize),
        padding: &Padding,
        dilation: usize,
    ) -> Result<Self, TensorError> {
        if stride_h == 0 || stride_w == 0 || dilation == 0 {
            return Err(TensorError::InvalidAttribute {
                op,
                detail: format!(
                    "stride ({stride_h}, {stride_w}) and dilation {dilation} must be at least 1"
                ),
            });
        }
        let out_h = output_extent(op, in_h, padding.top, padding.bottom, k_h, stride_h, 1)?;
        let out_w =
            output_extent(op, in_w, padding.left, padding.right, k_w, stride_w, dilation)?;
        Ok(Self {
            in_h,
            in_w,
            k_h,
            k_w,
            stride_h,
            stride_w,
            pad_top: padding.top,
            pad_left: padding.left,
            dilation,
            out_h,
            out_w,
        })
    }

    pub fn in_plane(&self) -> usize {
        self.in_h * self.in_w
    }

    pub fn out_plane(&self) -> usize {
        self.out_h * self.out_w
    }

    pub fn kernel_plane(&self) -> usize {
        self.k_h * self.k_w
    }

    /// In-bounds input row range `[start, end)` for output row `o_r`, and
    /// the kernel row matching `start`.
    pub fn row_window(&self, o_r: usize) -> (usize, usize, usize) {
        clamp_window(o_r * self.stride_h, self.pad_top, self.k_h, self.in_h)
    }

    /// In-bounds input column range for output column `o_c` (dilation 1).
    pub fn col_window(&self, o_c: usize) -> (usize, usize, usize) {
        clamp_window(o_c * self.stride_w, self.pad_left, self.k_w, self.in_w)
    }
}

/// `floor((input + pad_begin + pad_end - dilation*(kernel-1) - 1) / stride) + 1`.
pub fn output_extent(
    op: &'static str,
    input: usize,
    pad_begin: usize,
    pad_end: usize,
    kernel: usize,
    stride: usize,
    dilation: usize,
) -> Result<usize, TensorError> {
    let padded = input + pad_begin + pad_end;
    let span = dilation * (kernel.max(1) - 1) + 1;
    if kernel == 0 || span > padded {
        return Err(TensorError::InvalidAttribute {
            op,
            detail: format!(
                "window of {kernel} (dilation {dilation}) does not fit padded extent {padded}"
            ),
        });
    }
    Ok((padded - span) / stride + 1)
}

/// Clamps a window starting at padded position `origin` to the input.
///
/// Returns `(first_input, end_input, first_kernel_tap)`.
fn clamp_window(origin: usize, pad: usize, kernel: usize, input: usize) -> (usize, usize, usize) {
    let skip = pad.saturating_sub(origin);
    let start = (origin + skip) - pad;
    let end = (origin + kernel).saturating_sub(pad).min(input);
    (start, end.max(start), skip)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_extent() {
        assert_eq!(output_extent("t", 5, 1, 1, 3, 1, 1).unwrap(), 5);
        assert_eq!(output_extent("t", 11, 0, 0, 3, 2, 1).unwrap(), 5);
        assert_eq!(output_extent("t", 6, 1, 3, 3, 3, 1).unwrap(), 3);
        assert_eq!(output_extent("t", 10, 0, 0, 3, 1, 2).unwrap(), 6);
        assert!(output_extent("t", 2, 0, 0, 3, 1, 1).is_err());
    }

    #[test]
    fn test_clamp_window() {
        // Origin 0 with padding 2 and kernel 5 over 5 inputs: taps 2..5 hit inputs 0..3.
        assert_eq!(clamp_window(0, 2, 5, 5), (0, 3, 2));
        assert_eq!(clamp_window(4, 2, 5, 5), (2, 5, 0));
        assert_eq!(clamp_window(3, 0, 3, 10), (3, 6, 0));
    }

    #[test]
    fn test_resolve_rejects_zero_stride() {
        let r = PlaneGeometry::resolve("t", (4, 4), (3, 3), (0, 1), &Padding::none(), 1);
        assert!(matches!(r, Err(TensorError::InvalidAttribute { .. })));
    }
}
