// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Shapes, tensors and the generic operator kernels of the CNN runtime.
//!
//! This crate provides:
//! - [`Shape`]: rank 1 to 6 extents with canonical `(batch, channels, height, width)` accessors.
//! - [`Tensor`]: an owned, row-major `f32` buffer, and [`TensorView`], its borrowed form.
//! - [`Padding`]: per-side spatial padding.
//! - [`ops`]: convolution, pooling, fully connected, batch normalization and
//!   the activation family.
//! - [`compare`]: absolute-tolerance comparison for reference checks.
//!
//! # Design Goals
//! - Kernels never allocate: outputs and scratch are supplied by the caller.
//! - Every element is visited in a fixed order, so results are reproducible
//!   bit for bit.
//! - Clean error types via `thiserror`.

pub mod compare;
mod error;
pub mod ops;
mod padding;
mod shape;
mod tensor;

pub use error::TensorError;
pub use padding::Padding;
pub use shape::{Shape, MAX_RANK};
pub use tensor::{Tensor, TensorView};
