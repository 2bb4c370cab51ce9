// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Max, average and global pooling over 1-D and 2-D inputs.
//!
//! Windows are clamped to the input, so padded cells never contribute to a
//! maximum or a sum. Every side of the padding must be smaller than the
//! window on its axis, which guarantees at least one in-bounds cell.
//! A NaN anywhere in a max window makes that output NaN.

use super::geometry::{PlaneGeometry, SpatialRank};
use crate::{Padding, Shape, Tensor, TensorError, TensorView};

/// Scalar attributes of a windowed pooling operator.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PoolAttrs {
    /// `(height, width)` window. 1-D pooling uses only the width.
    pub kernel: (usize, usize),
    pub stride: (usize, usize),
    pub padding: Padding,
}

impl PoolAttrs {
    /// Square window with matching stride and no padding.
    pub fn square(size: usize) -> Self {
        Self {
            kernel: (size, size),
            stride: (size, size),
            padding: Padding::none(),
        }
    }
}

/// Resolved shape information for one pooling instance.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolLayout {
    pub spatial: SpatialRank,
    pub batch: usize,
    pub channels: usize,
    pub geometry: PlaneGeometry,
    pub output_shape: Shape,
}

impl PoolLayout {
    pub fn resolve(input: &Shape, attrs: &PoolAttrs) -> Result<Self, TensorError> {
        let spatial = SpatialRank::from_tensor_rank("pool", input.rank())?;
        let p = &attrs.padding;
        let (kernel, stride) = match spatial {
            SpatialRank::TwoD => (attrs.kernel, attrs.stride),
            SpatialRank::OneD => {
                if p.top != 0 || p.bottom != 0 {
                    return Err(TensorError::InvalidAttribute {
                        op: "pool",
                        detail: "1-D pooling cannot pad the height axis".into(),
                    });
                }
                ((1, attrs.kernel.1), (1, attrs.stride.1))
            }
        };
        if p.top >= kernel.0 || p.bottom >= kernel.0 || p.left >= kernel.1 || p.right >= kernel.1
        {
            return Err(TensorError::InvalidAttribute {
                op: "pool",
                detail: format!(
                    "padding {:?} must be smaller than the {}x{} window",
                    p.as_array(),
                    kernel.0,
                    kernel.1
                ),
            });
        }

        let geometry = PlaneGeometry::resolve(
            "pool",
            (input.height(), input.width()),
            kernel,
            stride,
            p,
            1,
        )?;
        let output_shape = match spatial {
            SpatialRank::TwoD => Shape::nchw(
                input.batch(),
                input.channels(),
                geometry.out_h,
                geometry.out_w,
            ),
            SpatialRank::OneD => Shape::ncw(input.batch(), input.channels(), geometry.out_w),
        };
        Ok(Self {
            spatial,
            batch: input.batch(),
            channels: input.channels(),
            geometry,
            output_shape,
        })
    }
}

/// Computes the output shape of a windowed pooling operator.
pub fn pool_output_shape(input: &Shape, attrs: &PoolAttrs) -> Result<Shape, TensorError> {
    PoolLayout::resolve(input, attrs).map(|l| l.output_shape)
}

/// Output shape of a global pooling operator: spatial axes collapse to 1.
pub fn global_pool_output_shape(input: &Shape) -> Result<Shape, TensorError> {
    match SpatialRank::from_tensor_rank("global_pool", input.rank())? {
        SpatialRank::TwoD => Ok(Shape::nchw(input.batch(), input.channels(), 1, 1)),
        SpatialRank::OneD => Ok(Shape::ncw(input.batch(), input.channels(), 1)),
    }
}

fn check_output(op: &'static str, expected: &Shape, output: &Tensor) -> Result<(), TensorError> {
    if output.shape() != expected {
        return Err(TensorError::ShapeMismatch {
            op,
            lhs: expected.clone(),
            rhs: output.shape().clone(),
        });
    }
    Ok(())
}

fn check_bias(op: &'static str, channels: usize, bias: Option<&TensorView<'_>>) -> Result<(), TensorError> {
    match bias {
        Some(b) if b.shape().num_elements() != channels => Err(TensorError::InvalidAttribute {
            op,
            detail: format!(
                "bias has {} elements for {channels} channels",
                b.shape().num_elements()
            ),
        }),
        _ => Ok(()),
    }
}

/// Max pooling. Padded cells are ignored.
pub fn max_pool(
    input: &TensorView<'_>,
    attrs: &PoolAttrs,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    let layout = PoolLayout::resolve(input.shape(), attrs)?;
    check_output("max_pool", &layout.output_shape, output)?;
    for b in 0..layout.batch {
        for c in 0..layout.channels {
            max_pool_plane(&layout.geometry, input.channel(b, c), output.channel_mut(b, c));
        }
    }
    Ok(())
}

/// Average pooling.
///
/// With `count_include_pad` the divisor is the full window area; otherwise
/// it is the number of in-bounds cells. `bias`, when present, holds one
/// value per channel and is added after averaging.
pub fn avg_pool(
    input: &TensorView<'_>,
    attrs: &PoolAttrs,
    count_include_pad: bool,
    bias: Option<&TensorView<'_>>,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    let layout = PoolLayout::resolve(input.shape(), attrs)?;
    check_output("avg_pool", &layout.output_shape, output)?;
    check_bias("avg_pool", layout.channels, bias)?;
    let bias = bias.map(|b| b.as_slice());
    for b in 0..layout.batch {
        for c in 0..layout.channels {
            avg_pool_plane(
                &layout.geometry,
                count_include_pad,
                bias.map(|v| v[c]),
                input.channel(b, c),
                output.channel_mut(b, c),
            );
        }
    }
    Ok(())
}

/// Running maximum that propagates NaN.
#[inline]
pub fn nan_max(m: f32, v: f32) -> f32 {
    if v > m || v.is_nan() {
        v
    } else {
        m
    }
}

/// Max pooling of one plane.
pub fn max_pool_plane(geom: &PlaneGeometry, input: &[f32], out: &mut [f32]) {
    for o_r in 0..geom.out_h {
        let (r0, r1, _) = geom.row_window(o_r);
        for o_c in 0..geom.out_w {
            let (c0, c1, _) = geom.col_window(o_c);
            let mut m = f32::NEG_INFINITY;
            for r in r0..r1 {
                for &v in &input[r * geom.in_w + c0..r * geom.in_w + c1] {
                    m = nan_max(m, v);
                }
            }
            out[o_r * geom.out_w + o_c] = m;
        }
    }
}

/// Average pooling of one plane.
pub fn avg_pool_plane(
    geom: &PlaneGeometry,
    count_include_pad: bool,
    bias: Option<f32>,
    input: &[f32],
    out: &mut [f32],
) {
    let area = geom.kernel_plane() as f32;
    for o_r in 0..geom.out_h {
        let (r0, r1, _) = geom.row_window(o_r);
        for o_c in 0..geom.out_w {
            let (c0, c1, _) = geom.col_window(o_c);
            let mut sum = 0.0f32;
            for r in r0..r1 {
                for &v in &input[r * geom.in_w + c0..r * geom.in_w + c1] {
                    sum += v;
                }
            }
            let divisor = if count_include_pad {
                area
            } else {
                ((r1 - r0) * (c1 - c0)) as f32
            };
            let mut avg = sum / divisor;
            if let Some(bias) = bias {
                avg += bias;
            }
            out[o_r * geom.out_w + o_c] = avg;
        }
    }
}

/// Mean over all spatial positions of each channel.
pub fn global_avg_pool(input: &TensorView<'_>, output: &mut Tensor) -> Result<(), TensorError> {
    let shape = global_pool_output_shape(input.shape())?;
    check_output("global_avg_pool", &shape, output)?;
    let n = input.shape().spatial_elements() as f32;
    for b in 0..shape.batch() {
        for c in 0..shape.channels() {
            let sum: f32 = input.channel(b, c).iter().sum();
            output.channel_mut(b, c)[0] = sum / n;
        }
    }
    Ok(())
}

/// Maximum over all spatial positions of each channel.
pub fn global_max_pool(input: &TensorView<'_>, output: &mut Tensor) -> Result<(), TensorError> {
    let shape = global_pool_output_shape(input.shape())?;
    check_output("global_max_pool", &shape, output)?;
    for b in 0..shape.batch() {
        for c in 0..shape.channels() {
            let m = input
                .channel(b, c)
                .iter()
                .copied()
                .fold(f32::NEG_INFINITY, nan_max);
            output.channel_mut(b, c)[0] = m;
        }
    }
    Ok(())
}
