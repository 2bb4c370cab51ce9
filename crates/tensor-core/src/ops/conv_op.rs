// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Grouped, strided, padded convolution (1-D and 2-D).
//!
//! The operator is decomposed into single-channel passes: for every output
//! channel the group's first input channel is convolved straight into the
//! output plane, and each further input channel is convolved into a scratch
//! plane that is then accumulated. The single-channel primitive is what the
//! specialized kernels reimplement per static fact combination.
//!
//! Padding is handled by boundary-aware indexing: window taps that land in
//! the padding are skipped. This produces the same numbers as convolving an
//! explicitly padded copy.

use super::geometry::{PlaneGeometry, SpatialRank};
use crate::{Padding, Shape, Tensor, TensorError, TensorView};

/// Scalar attributes of a convolution.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConvAttrs {
    /// `(vertical, horizontal)` stride. 1-D convolutions use only the second.
    pub stride: (usize, usize),
    pub padding: Padding,
    /// Horizontal dilation, 1-D only.
    pub dilation: usize,
    pub groups: usize,
}

impl Default for ConvAttrs {
    fn default() -> Self {
        Self {
            stride: (1, 1),
            padding: Padding::none(),
            dilation: 1,
            groups: 1,
        }
    }
}

/// Fully resolved shape information for one convolution instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvLayout {
    pub spatial: SpatialRank,
    pub batch: usize,
    pub in_channels: usize,
    pub out_channels: usize,
    pub groups: usize,
    pub in_per_group: usize,
    pub out_per_group: usize,
    pub geometry: PlaneGeometry,
    pub output_shape: Shape,
}

impl ConvLayout {
    /// Validates input, kernel and bias shapes against `attrs`.
    pub fn resolve(
        input: &Shape,
        kernel: &Shape,
        bias: Option<&Shape>,
        attrs: &ConvAttrs,
    ) -> Result<Self, TensorError> {
        let spatial = SpatialRank::from_tensor_rank("conv", input.rank())?;
        if kernel.rank() != input.rank() {
            return Err(TensorError::ShapeMismatch {
                op: "conv",
                lhs: input.clone(),
                rhs: kernel.clone(),
            });
        }

        let groups = attrs.groups;
        let in_channels = input.channels();
        let out_channels = kernel.batch();
        if groups == 0 || in_channels % groups != 0 || out_channels % groups != 0 {
            return Err(TensorError::InvalidAttribute {
                op: "conv",
                detail: format!(
                    "group count {groups} must divide {in_channels} input and {out_channels} output channels"
                ),
            });
        }
        let in_per_group = in_channels / groups;
        if kernel.channels() != in_per_group {
            return Err(TensorError::ShapeMismatch {
                op: "conv",
                lhs: input.clone(),
                rhs: kernel.clone(),
            });
        }
        if let Some(bias) = bias {
            if bias.num_elements() != out_channels {
                return Err(TensorError::ShapeMismatch {
                    op: "conv_bias",
                    lhs: kernel.clone(),
                    rhs: bias.clone(),
                });
            }
        }

        let (stride, dilation) = match spatial {
            SpatialRank::TwoD if attrs.dilation != 1 => {
                return Err(TensorError::InvalidAttribute {
                    op: "conv",
                    detail: format!("dilation {} is only supported in 1-D", attrs.dilation),
                })
            }
            SpatialRank::TwoD => (attrs.stride, 1),
            SpatialRank::OneD => {
                if attrs.padding.top != 0 || attrs.padding.bottom != 0 {
                    return Err(TensorError::InvalidAttribute {
                        op: "conv",
                        detail: "1-D convolution cannot pad the height axis".into(),
                    });
                }
                ((1, attrs.stride.1), attrs.dilation)
            }
        };

        let geometry = PlaneGeometry::resolve(
            "conv",
            (input.height(), input.width()),
            (kernel.height(), kernel.width()),
            stride,
            &attrs.padding,
            dilation,
        )?;

        let output_shape = match spatial {
            SpatialRank::TwoD => {
                Shape::nchw(input.batch(), out_channels, geometry.out_h, geometry.out_w)
            }
            SpatialRank::OneD => Shape::ncw(input.batch(), out_channels, geometry.out_w),
        };

        Ok(Self {
            spatial,
            batch: input.batch(),
            in_channels,
            out_channels,
            groups,
            in_per_group,
            out_per_group: out_channels / groups,
            geometry,
            output_shape,
        })
    }

    /// Scratch elements needed by [`conv`]: one output plane when a group
    /// has more than one input channel, otherwise none.
    pub fn scratch_len(&self) -> usize {
        if self.in_per_group > 1 {
            self.geometry.out_plane()
        } else {
            0
        }
    }
}

/// Computes the output shape of a convolution.
pub fn conv_output_shape(
    input: &Shape,
    kernel: &Shape,
    attrs: &ConvAttrs,
) -> Result<Shape, TensorError> {
    ConvLayout::resolve(input, kernel, None, attrs).map(|l| l.output_shape)
}

/// Runs a convolution.
///
/// * `kernel`: `(out_c, in_c / groups, kH, kW)`, or `(out_c, in_c / groups, kW)` in 1-D.
/// * `bias`: one value per output channel.
/// * `scratch`: caller-owned buffer of at least [`ConvLayout::scratch_len`] elements.
///
/// In 2-D the bias is added once per output element after all input
/// channels are accumulated. In 1-D each input-channel pass adds
/// `bias / in_channels_per_group`, reproducing the reference fixtures.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if `output` does not have the
/// computed shape, [`TensorError::ScratchTooSmall`] if `scratch` cannot hold
/// an output plane, and any validation error of [`ConvLayout::resolve`].
pub fn conv(
    input: &TensorView<'_>,
    kernel: &TensorView<'_>,
    bias: Option<&TensorView<'_>>,
    attrs: &ConvAttrs,
    scratch: &mut [f32],
    output: &mut Tensor,
) -> Result<(), TensorError> {
    let layout = ConvLayout::resolve(
        input.shape(),
        kernel.shape(),
        bias.map(|b| b.shape()),
        attrs,
    )?;
    if output.shape() != &layout.output_shape {
        return Err(TensorError::ShapeMismatch {
            op: "conv",
            lhs: layout.output_shape,
            rhs: output.shape().clone(),
        });
    }
    let required = layout.scratch_len();
    if scratch.len() < required {
        return Err(TensorError::ScratchTooSmall {
            op: "conv",
            required,
            actual: scratch.len(),
        });
    }

    let geom = layout.geometry;
    let k_plane = geom.kernel_plane();
    let weights = kernel.as_slice();
    let bias = bias.map(|b| b.as_slice());
    let tmp = &mut scratch[..required];

    for b in 0..layout.batch {
        for g in 0..layout.groups {
            let first_in = g * layout.in_per_group;
            for i in g * layout.out_per_group..(g + 1) * layout.out_per_group {
                let pass_bias = match (layout.spatial, bias) {
                    (SpatialRank::OneD, Some(bias)) => bias[i] / layout.in_per_group as f32,
                    _ => 0.0,
                };
                let out = output.channel_mut(b, i);
                let k0 = i * layout.in_per_group * k_plane;

                conv_plane(
                    &geom,
                    input.channel(b, first_in),
                    &weights[k0..k0 + k_plane],
                    pass_bias,
                    out,
                );
                for j in 1..layout.in_per_group {
                    let kj = k0 + j * k_plane;
                    conv_plane(
                        &geom,
                        input.channel(b, first_in + j),
                        &weights[kj..kj + k_plane],
                        pass_bias,
                        tmp,
                    );
                    accumulate(out, tmp);
                }

                if let (SpatialRank::TwoD, Some(bias)) = (layout.spatial, bias) {
                    out.iter_mut().for_each(|v| *v += bias[i]);
                }
            }
        }
    }
    Ok(())
}

/// Single-channel convolution of one input plane into one output plane.
///
/// Taps that fall into the padding are skipped. `pass_bias` is added to
/// every output element after its window sum.
pub fn conv_plane(
    geom: &PlaneGeometry,
    input: &[f32],
    kernel: &[f32],
    pass_bias: f32,
    out: &mut [f32],
) {
    let (pad_top, pad_left) = (geom.pad_top as isize, geom.pad_left as isize);
    let (in_h, in_w) = (geom.in_h as isize, geom.in_w as isize);
    for o_r in 0..geom.out_h {
        let row0 = (o_r * geom.stride_h) as isize - pad_top;
        for o_c in 0..geom.out_w {
            let col0 = (o_c * geom.stride_w) as isize - pad_left;
            let mut pixel = 0.0f32;
            for kr in 0..geom.k_h {
                let r = row0 + kr as isize;
                if r < 0 || r >= in_h {
                    continue;
                }
                let in_row = r as usize * geom.in_w;
                let k_row = kr * geom.k_w;
                for kc in 0..geom.k_w {
                    let c = col0 + (kc * geom.dilation) as isize;
                    if c < 0 || c >= in_w {
                        continue;
                    }
                    pixel += kernel[k_row + kc] * input[in_row + c as usize];
                }
            }
            out[o_r * geom.out_w + o_c] = pixel + pass_bias;
        }
    }
}

/// Element-wise `dst[i] += src[i]` over one channel window.
pub fn accumulate(dst: &mut [f32], src: &[f32]) {
    for (d, &s) in dst.iter_mut().zip(src) {
        *d += s;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: &[f32], b: &[f32], tol: f32) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < tol)
    }

    fn run_conv(
        input: &Tensor,
        kernel: &Tensor,
        bias: Option<&Tensor>,
        attrs: &ConvAttrs,
    ) -> Tensor {
        let layout = ConvLayout::resolve(
            input.shape(),
            kernel.shape(),
            bias.map(|b| b.shape()),
            attrs,
        )
        .unwrap();
        let mut scratch = vec![0.0; layout.scratch_len()];
        let mut out = Tensor::zeros(layout.output_shape.clone());
        let bias_view = bias.map(|b| b.view());
        conv(
            &input.view(),
            &kernel.view(),
            bias_view.as_ref(),
            attrs,
            &mut scratch,
            &mut out,
        )
        .unwrap();
        out
    }

    fn t(shape: Shape, v: &[f32]) -> Tensor {
        Tensor::from_f32(shape, v).unwrap()
    }

    #[test]
    fn test_conv1d_strided_with_bias() {
        let input = t(
            Shape::ncw(1, 1, 11),
            &[-9.0, 0.0, 3.0, -5.0, -10.0, 7.0, 3.0, -2.0, -2.0, 3.0, 4.0],
        );
        let kernel = t(Shape::ncw(1, 1, 3), &[2.0, -1.0, 0.0]);
        let bias = t(Shape::vector(1), &[-2.0]);
        let attrs = ConvAttrs {
            stride: (1, 2),
            ..Default::default()
        };
        let out = run_conv(&input, &kernel, Some(&bias), &attrs);
        assert_eq!(out.shape(), &Shape::ncw(1, 1, 5));
        assert_eq!(out.as_slice(), &[-20.0, 9.0, -29.0, 6.0, -9.0]);
    }

    #[test]
    fn test_conv2d_3x3_same_padding() {
        let input = t(
            Shape::nchw(1, 1, 4, 3),
            &[-5.0, -4.0, -5.0, -6.0, 5.0, -10.0, 8.0, 9.0, -3.0, 0.0, -9.0, -1.0],
        );
        let kernel = t(
            Shape::nchw(1, 1, 3, 3),
            &[-5.0, -1.0, -3.0, 10.0, 3.0, 0.0, 4.0, -6.0, 6.0],
        );
        let attrs = ConvAttrs {
            padding: Padding::uniform(1),
            ..Default::default()
        };
        let out = run_conv(&input, &kernel, None, &attrs);
        assert_eq!(
            out.as_slice(),
            &[51.0, -176.0, 25.0, 5.0, -41.0, 99.0, -39.0, 210.0, 36.0, -35.0, -67.0, -135.0]
        );
    }

    #[test]
    fn test_conv2d_zero_kernel_gives_zeros() {
        let input = t(
            Shape::nchw(1, 1, 4, 3),
            &[-5.0, -4.0, -5.0, -6.0, 5.0, -10.0, 8.0, 9.0, -3.0, 0.0, -9.0, -1.0],
        );
        let kernel = Tensor::zeros(Shape::nchw(1, 1, 3, 3));
        let attrs = ConvAttrs {
            padding: Padding::uniform(1),
            ..Default::default()
        };
        let out = run_conv(&input, &kernel, None, &attrs);
        assert_eq!(out, Tensor::zeros(Shape::nchw(1, 1, 4, 3)));
    }

    #[test]
    fn test_conv2d_ramp_all_ones() {
        let ramp: Vec<f32> = (0..25).map(|x| x as f32).collect();
        let input = t(Shape::nchw(1, 1, 5, 5), &ramp);
        let kernel = Tensor::full(Shape::nchw(1, 1, 3, 3), 1.0);
        let attrs = ConvAttrs {
            padding: Padding::uniform(1),
            ..Default::default()
        };
        let out = run_conv(&input, &kernel, None, &attrs);
        assert_eq!(
            out.as_slice(),
            &[
                12.0, 21.0, 27.0, 33.0, 24.0, 33.0, 54.0, 63.0, 72.0, 51.0, 63.0, 99.0, 108.0,
                117.0, 81.0, 93.0, 144.0, 153.0, 162.0, 111.0, 72.0, 111.0, 117.0, 123.0, 84.0
            ]
        );
    }

    fn asymmetric_input() -> Tensor {
        t(
            Shape::nchw(1, 1, 8, 6),
            &[
                8.0, 9.0, 9.0, 6.0, -10.0, 10.0, 10.0, -8.0, 2.0, 6.0, -3.0, -8.0, 9.0, 0.0, 7.0,
                10.0, -7.0, 5.0, -8.0, 2.0, -8.0, 9.0, -3.0, -5.0, -2.0, 5.0, -4.0, -1.0, 5.0,
                -1.0, -7.0, -6.0, 1.0, -8.0, 9.0, -6.0, -2.0, -4.0, -10.0, 6.0, -10.0, -2.0,
                2.0, 5.0, 1.0, -7.0, 3.0, -1.0,
            ],
        )
    }

    #[test]
    fn test_conv2d_asymmetric_padding() {
        let kernel = t(Shape::nchw(1, 1, 1, 3), &[-3.0, -1.0, 0.0]);
        let attrs = ConvAttrs {
            padding: Padding::new(0, 1, 2, 3),
            ..Default::default()
        };
        let out = run_conv(&asymmetric_input(), &kernel, None, &attrs);
        assert_eq!(out.shape(), &Shape::nchw(1, 1, 10, 8));
        let mut expected = vec![
            -8.0, -33.0, -36.0, -33.0, -8.0, 20.0, -30.0, 0.0, //
            -10.0, -22.0, 22.0, -12.0, -15.0, 17.0, 24.0, 0.0, //
            -9.0, -27.0, -7.0, -31.0, -23.0, 16.0, -15.0, 0.0, //
            8.0, 22.0, 2.0, 15.0, -24.0, 14.0, 15.0, 0.0, //
            2.0, 1.0, -11.0, 13.0, -2.0, -14.0, 3.0, 0.0, //
            7.0, 27.0, 17.0, 5.0, 15.0, -21.0, 18.0, 0.0, //
            2.0, 10.0, 22.0, 24.0, -8.0, 32.0, 6.0, 0.0, //
            -2.0, -11.0, -16.0, 4.0, 18.0, -8.0, 3.0, 0.0,
        ];
        expected.extend([0.0; 16]);
        assert_eq!(out.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_conv2d_asymmetric_padding_strided() {
        let kernel = t(Shape::nchw(1, 1, 1, 3), &[-3.0, -1.0, 0.0]);
        let attrs = ConvAttrs {
            stride: (2, 3),
            padding: Padding::new(0, 1, 2, 3),
            ..Default::default()
        };
        let out = run_conv(&asymmetric_input(), &kernel, None, &attrs);
        assert_eq!(out.shape(), &Shape::nchw(1, 1, 5, 3));
        assert_eq!(
            out.as_slice(),
            &[-8.0, -33.0, -30.0, -9.0, -31.0, -15.0, 2.0, 13.0, 3.0, 2.0, 24.0, 6.0, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_conv2d_strided_bias() {
        let input = t(
            Shape::nchw(1, 1, 7, 5),
            &[
                4.0, 13.0, 13.0, -2.0, 6.0, -7.0, 15.0, -11.0, -9.0, -15.0, -8.0, -3.0, 2.0, 6.0,
                -9.0, 1.0, -8.0, 13.0, -6.0, -7.0, -6.0, -6.0, 13.0, 13.0, 8.0, -15.0, 14.0,
                -12.0, 8.0, 1.0, 3.0, 6.0, 7.0, -12.0, 2.0,
            ],
        );
        let kernel = t(
            Shape::nchw(1, 1, 5, 3),
            &[
                -3.0, -4.0, 1.0, -5.0, 5.0, 2.0, 1.0, 2.0, -1.0, -1.0, 1.0, -4.0, -4.0, -2.0, 5.0,
            ],
        );
        let bias = t(Shape::vector(1), &[0.4]);
        let attrs = ConvAttrs {
            stride: (3, 2),
            padding: Padding::new(1, 2, 4, 0),
            ..Default::default()
        };
        let out = run_conv(&input, &kernel, Some(&bias), &attrs);
        assert_eq!(out.shape(), &Shape::nchw(1, 1, 3, 3));
        assert!(approx_eq(
            out.as_slice(),
            &[52.4, 179.4, -111.6, 75.4, 76.4, -94.6, -8.6, 6.4, -85.6],
            1e-4
        ));
    }

    #[test]
    fn test_multi_channel_accumulation() {
        // Two input channels, one output channel: output = conv(ch0) + conv(ch1) + bias.
        let input = t(
            Shape::nchw(1, 2, 2, 2),
            &[1.0, 2.0, 3.0, 4.0, 10.0, 20.0, 30.0, 40.0],
        );
        let kernel = t(Shape::nchw(1, 2, 1, 1), &[1.0, 0.5]);
        let bias = t(Shape::vector(1), &[1.0]);
        let out = run_conv(&input, &kernel, Some(&bias), &ConvAttrs::default());
        assert_eq!(out.as_slice(), &[7.0, 13.0, 19.0, 25.0]);
    }

    #[test]
    fn test_grouped_depthwise() {
        let input = t(Shape::nchw(1, 2, 1, 3), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let kernel = t(Shape::nchw(2, 1, 1, 2), &[1.0, 1.0, 1.0, -1.0]);
        let attrs = ConvAttrs {
            groups: 2,
            ..Default::default()
        };
        let out = run_conv(&input, &kernel, None, &attrs);
        assert_eq!(out.shape(), &Shape::nchw(1, 2, 1, 2));
        assert_eq!(out.as_slice(), &[3.0, 5.0, -1.0, -1.0]);
    }

    #[test]
    fn test_conv1d_bias_folded_per_input_channel() {
        // Two input channels: each pass adds bias / 2.
        let input = t(Shape::ncw(1, 2, 3), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let kernel = t(Shape::ncw(1, 2, 1), &[1.0, 1.0]);
        let bias = t(Shape::vector(1), &[3.0]);
        let out = run_conv(&input, &kernel, Some(&bias), &ConvAttrs::default());
        assert_eq!(out.as_slice(), &[8.0, 10.0, 12.0]);
    }

    #[test]
    fn test_conv1d_dilation() {
        let input = t(Shape::ncw(1, 1, 6), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let kernel = t(Shape::ncw(1, 1, 2), &[1.0, 10.0]);
        let attrs = ConvAttrs {
            dilation: 2,
            ..Default::default()
        };
        let out = run_conv(&input, &kernel, None, &attrs);
        assert_eq!(out.as_slice(), &[31.0, 42.0, 53.0, 64.0]);
    }

    #[test]
    fn test_explicit_padding_matches_boundary_indexing() {
        let input = asymmetric_input();
        let kernel = t(
            Shape::nchw(1, 1, 3, 3),
            &[0.5, -1.25, 2.0, 0.75, 1.5, -0.5, 3.0, -2.0, 0.25],
        );
        let padding = Padding::new(2, 1, 0, 2);
        let padded_attrs = ConvAttrs {
            padding,
            stride: (2, 1),
            ..Default::default()
        };
        let implicit = run_conv(&input, &kernel, None, &padded_attrs);

        let explicit_input = input.expand_with_padding(&padding, 0.0).unwrap();
        let plain_attrs = ConvAttrs {
            stride: (2, 1),
            ..Default::default()
        };
        let explicit = run_conv(&explicit_input, &kernel, None, &plain_attrs);
        assert_eq!(implicit, explicit);
    }

    #[test]
    fn test_rejects_bad_groups() {
        let input = Tensor::zeros(Shape::nchw(1, 3, 4, 4));
        let kernel = Tensor::zeros(Shape::nchw(4, 1, 3, 3));
        let attrs = ConvAttrs {
            groups: 2,
            ..Default::default()
        };
        let r = ConvLayout::resolve(input.shape(), kernel.shape(), None, &attrs);
        assert!(matches!(r, Err(TensorError::InvalidAttribute { .. })));
    }

    #[test]
    fn test_rejects_unsupported_rank() {
        let r = conv_output_shape(
            &Shape::matrix(1, 4),
            &Shape::matrix(1, 4),
            &ConvAttrs::default(),
        );
        assert!(matches!(r, Err(TensorError::UnsupportedRank { .. })));
    }

    #[test]
    fn test_output_shape_mismatch() {
        let input = Tensor::zeros(Shape::nchw(1, 1, 4, 4));
        let kernel = Tensor::zeros(Shape::nchw(1, 1, 3, 3));
        let mut out = Tensor::zeros(Shape::nchw(1, 1, 4, 4));
        let r = conv(
            &input.view(),
            &kernel.view(),
            None,
            &ConvAttrs::default(),
            &mut [],
            &mut out,
        );
        assert!(matches!(r, Err(TensorError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_scratch_too_small() {
        let input = Tensor::zeros(Shape::nchw(1, 2, 4, 4));
        let kernel = Tensor::zeros(Shape::nchw(1, 2, 3, 3));
        let mut out = Tensor::zeros(Shape::nchw(1, 1, 2, 2));
        let r = conv(
            &input.view(),
            &kernel.view(),
            None,
            &ConvAttrs::default(),
            &mut [0.0; 3],
            &mut out,
        );
        assert!(matches!(
            r,
            Err(TensorError::ScratchTooSmall {
                required: 4,
                actual: 3,
                ..
            })
        ));
    }
}
