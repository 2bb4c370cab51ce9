// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Const-generic specialized kernels.
//!
//! Each kernel is monomorphized over the static facts that the generic
//! kernel branches on (`PADDED`, `BIAS`, `GROUPED`, `INCLUDE_PAD`, and the
//! 1-D bias folding). Those branches fold away at compile time; what remains
//! is the generic loop nest with its bounds read from [`BakedConstants`].
//!
//! Every kernel visits elements and accumulates in exactly the order of its
//! generic counterpart, so outputs are bit-identical. Padded planes reuse
//! the generic boundary-aware plane routines directly.

use crate::{BakedConstants, KernelVariant};
use model_ir::Operator;
use tensor_core::ops::geometry::{PlaneGeometry, SpatialRank};
use tensor_core::ops::{accumulate, avg_pool_plane, conv_plane, max_pool_plane, nan_max};
use tensor_core::{Tensor, TensorError, TensorView};

/// A kernel bound to one plan unit.
///
/// Receives the unit's operator (for its parameter tensors), its baked
/// constants, the input views, the shared scratch buffer and the output.
pub type KernelFn = fn(
    &Operator,
    &BakedConstants,
    &[TensorView<'_>],
    &mut [f32],
    &mut Tensor,
) -> Result<(), TensorError>;

/// Resolves the monomorphized kernel for a variant.
pub fn resolve(variant: &KernelVariant) -> KernelFn {
    match *variant {
        KernelVariant::Conv {
            rank,
            padded,
            bias,
            grouped,
        } => match (rank, padded) {
            (SpatialRank::OneD, false) => conv_with::<true, false>(bias, grouped),
            (SpatialRank::OneD, true) => conv_with::<true, true>(bias, grouped),
            (SpatialRank::TwoD, false) => conv_with::<false, false>(bias, grouped),
            (SpatialRank::TwoD, true) => conv_with::<false, true>(bias, grouped),
        },
        KernelVariant::MaxPool { padded: false, .. } => max_pool::<false>,
        KernelVariant::MaxPool { padded: true, .. } => max_pool::<true>,
        KernelVariant::AvgPool {
            padded,
            include_pad,
            bias,
            ..
        } => match padded {
            false => avg_pool_with::<false>(include_pad, bias),
            true => avg_pool_with::<true>(include_pad, bias),
        },
        KernelVariant::Dense { bias: false } => dense::<false>,
        KernelVariant::Dense { bias: true } => dense::<true>,
        KernelVariant::Direct { .. } => generic,
    }
}

fn conv_with<const ONE_D: bool, const PADDED: bool>(bias: bool, grouped: bool) -> KernelFn {
    match (bias, grouped) {
        (false, false) => conv::<ONE_D, PADDED, false, false>,
        (false, true) => conv::<ONE_D, PADDED, false, true>,
        (true, false) => conv::<ONE_D, PADDED, true, false>,
        (true, true) => conv::<ONE_D, PADDED, true, true>,
    }
}

fn avg_pool_with<const PADDED: bool>(include_pad: bool, bias: bool) -> KernelFn {
    match (include_pad, bias) {
        (false, false) => avg_pool::<PADDED, false, false>,
        (false, true) => avg_pool::<PADDED, false, true>,
        (true, false) => avg_pool::<PADDED, true, false>,
        (true, true) => avg_pool::<PADDED, true, true>,
    }
}

/// Runs the operator's generic kernel.
pub fn generic(
    op: &Operator,
    _constants: &BakedConstants,
    inputs: &[TensorView<'_>],
    scratch: &mut [f32],
    output: &mut Tensor,
) -> Result<(), TensorError> {
    op.run(inputs, scratch, output)
}

// ── Convolution ────────────────────────────────────────────────────

/// Convolution specialized on spatial rank, padding, bias and grouping.
pub fn conv<const ONE_D: bool, const PADDED: bool, const BIAS: bool, const GROUPED: bool>(
    op: &Operator,
    c: &BakedConstants,
    inputs: &[TensorView<'_>],
    scratch: &mut [f32],
    output: &mut Tensor,
) -> Result<(), TensorError> {
    let Operator::Conv { kernel, bias, .. } = op else {
        return Err(bound_to("conv", op));
    };
    check_io("conv", c, inputs, scratch, output)?;
    let geom = window("conv", c)?;
    check_facts("conv", c, PADDED, GROUPED)?;
    let bias = bias_slice::<BIAS>("conv", bias.as_ref())?;

    let x = &inputs[0];
    let k_plane = geom.kernel_plane();
    let weights = kernel.as_slice();
    let (in_per_group, out_per_group) = (c.in_per_group, c.out_per_group);
    let groups = if GROUPED { c.groups } else { 1 };
    let tmp = &mut scratch[..c.scratch_len];

    for b in 0..c.batch {
        for g in 0..groups {
            let first_in = g * in_per_group;
            for i in g * out_per_group..(g + 1) * out_per_group {
                let pass_bias = if ONE_D && BIAS {
                    bias[i] / in_per_group as f32
                } else {
                    0.0
                };
                let out = output.channel_mut(b, i);
                let k0 = i * in_per_group * k_plane;

                conv_plane_fixed::<PADDED>(
                    geom,
                    x.channel(b, first_in),
                    &weights[k0..k0 + k_plane],
                    pass_bias,
                    out,
                );
                for j in 1..in_per_group {
                    let kj = k0 + j * k_plane;
                    conv_plane_fixed::<PADDED>(
                        geom,
                        x.channel(b, first_in + j),
                        &weights[kj..kj + k_plane],
                        pass_bias,
                        tmp,
                    );
                    accumulate(out, tmp);
                }

                if BIAS && !ONE_D {
                    out.iter_mut().for_each(|v| *v += bias[i]);
                }
            }
        }
    }
    Ok(())
}

#[inline(always)]
fn conv_plane_fixed<const PADDED: bool>(
    geom: &PlaneGeometry,
    input: &[f32],
    kernel: &[f32],
    pass_bias: f32,
    out: &mut [f32],
) {
    if PADDED {
        conv_plane(geom, input, kernel, pass_bias, out);
        return;
    }
    // Unpadded windows always lie inside the input.
    for o_r in 0..geom.out_h {
        let row0 = o_r * geom.stride_h;
        for o_c in 0..geom.out_w {
            let col0 = o_c * geom.stride_w;
            let mut pixel = 0.0f32;
            for kr in 0..geom.k_h {
                let in_row = &input[(row0 + kr) * geom.in_w..];
                let k_row = &kernel[kr * geom.k_w..(kr + 1) * geom.k_w];
                for (kc, &w) in k_row.iter().enumerate() {
                    pixel += w * in_row[col0 + kc * geom.dilation];
                }
            }
            out[o_r * geom.out_w + o_c] = pixel + pass_bias;
        }
    }
}

// ── Pooling ────────────────────────────────────────────────────────

/// Max pooling specialized on padding.
pub fn max_pool<const PADDED: bool>(
    op: &Operator,
    c: &BakedConstants,
    inputs: &[TensorView<'_>],
    scratch: &mut [f32],
    output: &mut Tensor,
) -> Result<(), TensorError> {
    let Operator::MaxPool { .. } = op else {
        return Err(bound_to("max_pool", op));
    };
    check_io("max_pool", c, inputs, scratch, output)?;
    let geom = window("max_pool", c)?;
    check_facts("max_pool", c, PADDED, false)?;

    let x = &inputs[0];
    for b in 0..c.batch {
        for ch in 0..c.in_channels {
            let (src, dst) = (x.channel(b, ch), output.channel_mut(b, ch));
            if PADDED {
                max_pool_plane(geom, src, dst);
                continue;
            }
            for o_r in 0..geom.out_h {
                let r0 = o_r * geom.stride_h;
                for o_c in 0..geom.out_w {
                    let c0 = o_c * geom.stride_w;
                    let mut m = f32::NEG_INFINITY;
                    for r in r0..r0 + geom.k_h {
                        let start = r * geom.in_w + c0;
                        for &v in &src[start..start + geom.k_w] {
                            m = nan_max(m, v);
                        }
                    }
                    dst[o_r * geom.out_w + o_c] = m;
                }
            }
        }
    }
    Ok(())
}

/// Average pooling specialized on padding, divisor mode and bias.
pub fn avg_pool<const PADDED: bool, const INCLUDE_PAD: bool, const BIAS: bool>(
    op: &Operator,
    c: &BakedConstants,
    inputs: &[TensorView<'_>],
    scratch: &mut [f32],
    output: &mut Tensor,
) -> Result<(), TensorError> {
    let Operator::AvgPool { bias, .. } = op else {
        return Err(bound_to("avg_pool", op));
    };
    check_io("avg_pool", c, inputs, scratch, output)?;
    let geom = window("avg_pool", c)?;
    check_facts("avg_pool", c, PADDED, false)?;
    let bias = bias_slice::<BIAS>("avg_pool", bias.as_ref())?;
    if BIAS && bias.len() != c.in_channels {
        return Err(TensorError::InvalidAttribute {
            op: "avg_pool",
            detail: format!("bias has {} elements for {} channels", bias.len(), c.in_channels),
        });
    }

    let x = &inputs[0];
    let area = geom.kernel_plane() as f32;
    for b in 0..c.batch {
        for ch in 0..c.in_channels {
            let (src, dst) = (x.channel(b, ch), output.channel_mut(b, ch));
            if PADDED {
                let bias = if BIAS { Some(bias[ch]) } else { None };
                avg_pool_plane(geom, INCLUDE_PAD, bias, src, dst);
                continue;
            }
            // Without padding every window is full, so both divisor modes
            // divide by the window area.
            for o_r in 0..geom.out_h {
                let r0 = o_r * geom.stride_h;
                for o_c in 0..geom.out_w {
                    let c0 = o_c * geom.stride_w;
                    let mut sum = 0.0f32;
                    for r in r0..r0 + geom.k_h {
                        let start = r * geom.in_w + c0;
                        for &v in &src[start..start + geom.k_w] {
                            sum += v;
                        }
                    }
                    let mut avg = sum / area;
                    if BIAS {
                        avg += bias[ch];
                    }
                    dst[o_r * geom.out_w + o_c] = avg;
                }
            }
        }
    }
    Ok(())
}

// ── Dense ──────────────────────────────────────────────────────────

/// Fully connected layer specialized on bias.
pub fn dense<const BIAS: bool>(
    op: &Operator,
    c: &BakedConstants,
    inputs: &[TensorView<'_>],
    scratch: &mut [f32],
    output: &mut Tensor,
) -> Result<(), TensorError> {
    let Operator::FullyConnected { kernel, bias } = op else {
        return Err(bound_to("fully_connected", op));
    };
    check_io("fully_connected", c, inputs, scratch, output)?;
    let bias = bias_slice::<BIAS>("fully_connected", bias.as_ref())?;

    let (n_in, n_out) = (c.in_channels, c.out_channels);
    let w = kernel.as_slice();
    if w.len() != n_in * n_out || (BIAS && bias.len() != n_out) {
        return Err(TensorError::ShapeMismatch {
            op: "fully_connected",
            lhs: c.output_shape.clone(),
            rhs: kernel.shape().clone(),
        });
    }
    let x = inputs[0].as_slice();
    let dst = output.as_slice_mut();
    for (x_row, out_row) in x.chunks_exact(n_in).zip(dst.chunks_exact_mut(n_out)) {
        for (i, o) in out_row.iter_mut().enumerate() {
            let w_row = &w[i * n_in..(i + 1) * n_in];
            let mut acc = 0.0f32;
            for (&xj, &wj) in x_row.iter().zip(w_row) {
                acc += xj * wj;
            }
            if BIAS {
                acc += bias[i];
            }
            *o = acc;
        }
    }
    Ok(())
}

// ── Shared checks ──────────────────────────────────────────────────

fn bound_to(kernel: &'static str, op: &Operator) -> TensorError {
    TensorError::InvalidAttribute {
        op: kernel,
        detail: format!("specialized kernel bound to a {} node", op.kind()),
    }
}

/// Inputs, output and scratch must match the baked constants.
fn check_io(
    op: &'static str,
    c: &BakedConstants,
    inputs: &[TensorView<'_>],
    scratch: &[f32],
    output: &Tensor,
) -> Result<(), TensorError> {
    if inputs.len() != c.input_shapes.len() {
        return Err(TensorError::InvalidAttribute {
            op,
            detail: format!(
                "expected {} inputs, got {}",
                c.input_shapes.len(),
                inputs.len()
            ),
        });
    }
    for (view, baked) in inputs.iter().zip(&c.input_shapes) {
        if view.shape() != baked {
            return Err(TensorError::ShapeMismatch {
                op,
                lhs: baked.clone(),
                rhs: view.shape().clone(),
            });
        }
    }
    if output.shape() != &c.output_shape {
        return Err(TensorError::ShapeMismatch {
            op,
            lhs: c.output_shape.clone(),
            rhs: output.shape().clone(),
        });
    }
    if scratch.len() < c.scratch_len {
        return Err(TensorError::ScratchTooSmall {
            op,
            required: c.scratch_len,
            actual: scratch.len(),
        });
    }
    Ok(())
}

fn window<'c>(op: &'static str, c: &'c BakedConstants) -> Result<&'c PlaneGeometry, TensorError> {
    c.window.as_ref().ok_or_else(|| TensorError::InvalidAttribute {
        op,
        detail: "no window geometry baked for a windowed kernel".into(),
    })
}

/// The constants must agree with the facts the kernel was compiled for.
fn check_facts(
    op: &'static str,
    c: &BakedConstants,
    padded: bool,
    grouped: bool,
) -> Result<(), TensorError> {
    let has_padding = c.padding != [0; 4];
    if has_padding != padded || (c.groups > 1) != grouped {
        return Err(TensorError::InvalidAttribute {
            op,
            detail: format!(
                "constants (padding {:?}, groups {}) disagree with the kernel variant",
                c.padding, c.groups
            ),
        });
    }
    Ok(())
}

fn bias_slice<'a, const BIAS: bool>(
    op: &'static str,
    bias: Option<&'a Tensor>,
) -> Result<&'a [f32], TensorError> {
    match (BIAS, bias) {
        (true, Some(b)) => Ok(b.as_slice()),
        (true, None) => Err(TensorError::InvalidAttribute {
            op,
            detail: "bias variant bound to a node without bias".into(),
        }),
        (false, _) => Ok(&[]),
    }
}
