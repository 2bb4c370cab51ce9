// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Static facts: the per-instance properties that select a kernel variant.
//!
//! A fact is anything the generic kernel branches on that is fixed once the
//! graph is built. Facts are derived from the operator's attributes and
//! parameters plus the input shape; they never depend on tensor values.

use model_ir::Operator;
use serde::Serialize;
use tensor_core::ops::geometry::SpatialRank;
use tensor_core::{Shape, TensorError};

/// Static facts resolved for one operator instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct StaticFacts {
    /// Spatial rank of windowed operators; `None` for everything else.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spatial: Option<SpatialRank>,
    /// Any side of the padding is non-zero.
    pub padded: bool,
    /// A bias tensor is present.
    pub bias: bool,
    /// Convolution with more than one group.
    pub grouped: bool,
    /// Average pooling divisor mode; `None` for other operators.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count_include_pad: Option<bool>,
}

impl StaticFacts {
    /// Resolves the facts of `op` applied to an input of shape `input`.
    ///
    /// # Errors
    /// Returns [`TensorError::UnsupportedRank`] if a windowed operator
    /// receives an input that is neither 1-D nor 2-D.
    pub fn resolve(op: &Operator, input: &Shape) -> Result<Self, TensorError> {
        let facts = match op {
            Operator::Conv {
                attrs,
                kernel: _,
                bias,
            } => Self {
                spatial: Some(SpatialRank::from_tensor_rank("conv", input.rank())?),
                padded: !attrs.padding.is_zero(),
                bias: bias.is_some(),
                grouped: attrs.groups > 1,
                count_include_pad: None,
            },
            Operator::MaxPool { attrs } => Self {
                spatial: Some(SpatialRank::from_tensor_rank("max_pool", input.rank())?),
                padded: !attrs.padding.is_zero(),
                ..Self::default()
            },
            Operator::AvgPool {
                attrs,
                count_include_pad,
                bias,
            } => Self {
                spatial: Some(SpatialRank::from_tensor_rank("avg_pool", input.rank())?),
                padded: !attrs.padding.is_zero(),
                bias: bias.is_some(),
                count_include_pad: Some(*count_include_pad),
                ..Self::default()
            },
            Operator::GlobalAvgPool | Operator::GlobalMaxPool => Self {
                spatial: Some(SpatialRank::from_tensor_rank("global_pool", input.rank())?),
                ..Self::default()
            },
            Operator::FullyConnected { bias, .. } => Self {
                bias: bias.is_some(),
                ..Self::default()
            },
            Operator::Pad { padding, .. } => Self {
                padded: !padding.is_zero(),
                ..Self::default()
            },
            _ => Self::default(),
        };
        Ok(facts)
    }
}
