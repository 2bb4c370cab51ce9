// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Generic operator kernels.
//!
//! Each kernel reads borrowed [`TensorView`](crate::TensorView)s and writes
//! into a pre-allocated output [`Tensor`](crate::Tensor) whose shape must
//! already match. Kernels that need temporary storage take a caller-owned
//! scratch slice instead of allocating.

mod activation_op;
mod add_op;
mod batch_norm_op;
mod conv_op;
mod fully_connected_op;
pub mod geometry;
mod lrn_op;
mod pad_op;
mod pooling_op;
mod softmax_op;

pub use activation_op::{clip, identity, leaky_relu, prelu, relu, sigmoid, tanh};
pub use add_op::add;
pub use batch_norm_op::{batch_norm, BatchNormParams, DEFAULT_EPSILON};
pub use conv_op::{accumulate, conv, conv_output_shape, conv_plane, ConvAttrs, ConvLayout};
pub use fully_connected_op::{dense_row, fully_connected, fully_connected_output_shape};
pub use geometry::{output_extent, PlaneGeometry, SpatialRank};
pub use lrn_op::{lrn, LrnAttrs};
pub use pad_op::{flatten, flatten_output_shape, pad};
pub use pooling_op::{
    avg_pool, avg_pool_plane, global_avg_pool, global_max_pool, global_pool_output_shape,
    max_pool, max_pool_plane, nan_max, pool_output_shape, PoolAttrs, PoolLayout,
};
pub use softmax_op::softmax;
