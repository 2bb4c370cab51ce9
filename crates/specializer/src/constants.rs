// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Shape-derived constants baked into each plan unit.

use model_ir::Operator;
use serde::Serialize;
use tensor_core::ops::geometry::PlaneGeometry;
use tensor_core::ops::{ConvLayout, PoolLayout};
use tensor_core::{Shape, TensorError};

/// Every shape-derived value a specialized kernel reads.
///
/// Specialized kernels never re-derive geometry from attributes: loop
/// bounds, window extents and channel counts all come from here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BakedConstants {
    pub input_shapes: Vec<Shape>,
    pub output_shape: Shape,
    /// Window geometry of convolution and pooling: input and output plane
    /// extents, kernel, stride, leading padding and dilation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<PlaneGeometry>,
    /// `[top, left, bottom, right]`.
    pub padding: [usize; 4],
    pub batch: usize,
    /// Input channels, or input features of a dense layer.
    pub in_channels: usize,
    /// Output channels, or output features of a dense layer.
    pub out_channels: usize,
    pub groups: usize,
    pub in_per_group: usize,
    pub out_per_group: usize,
    pub scratch_len: usize,
}

impl BakedConstants {
    /// Derives the constants of `op` for the given input shapes.
    pub fn resolve(op: &Operator, inputs: &[&Shape]) -> Result<Self, TensorError> {
        let output_shape = op.output_shape(inputs)?;
        let x = inputs[0];
        let mut constants = Self {
            input_shapes: inputs.iter().map(|s| (*s).clone()).collect(),
            batch: x.batch(),
            in_channels: x.channels(),
            out_channels: output_shape.channels(),
            groups: 1,
            in_per_group: 0,
            out_per_group: 0,
            window: None,
            padding: [0; 4],
            scratch_len: op.scratch_len(inputs)?,
            output_shape,
        };
        constants.in_per_group = constants.in_channels;
        constants.out_per_group = constants.out_channels;

        match op {
            Operator::Conv {
                attrs,
                kernel,
                bias,
            } => {
                let layout =
                    ConvLayout::resolve(x, kernel.shape(), bias.as_ref().map(|b| b.shape()), attrs)?;
                constants.window = Some(layout.geometry);
                constants.padding = attrs.padding.as_array();
                constants.groups = layout.groups;
                constants.in_per_group = layout.in_per_group;
                constants.out_per_group = layout.out_per_group;
            }
            Operator::MaxPool { attrs } | Operator::AvgPool { attrs, .. } => {
                let layout = PoolLayout::resolve(x, attrs)?;
                constants.window = Some(layout.geometry);
                constants.padding = attrs.padding.as_array();
            }
            Operator::Pad { padding, .. } => constants.padding = padding.as_array(),
            _ => {}
        }
        Ok(constants)
    }
}
