// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tensor operations.
//!
//! Every variant describes a construction-time or graph-wiring defect.
//! Kernels return these instead of terminating so they stay testable; the
//! top-level executor decides to abort.

use crate::Shape;

/// Errors that can occur during tensor operations.
#[derive(Debug, thiserror::Error)]
pub enum TensorError {
    /// The provided buffer length does not match the element count of the shape.
    #[error("buffer size mismatch: expected {expected} elements, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Two tensors have incompatible shapes for the requested operation.
    #[error("incompatible shapes for {op}: {lhs} vs {rhs}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Shape,
        rhs: Shape,
    },

    /// The operation does not support tensors of this rank.
    #[error("unsupported rank for {op}: expected {expected}, got {actual}")]
    UnsupportedRank {
        op: &'static str,
        expected: &'static str,
        actual: usize,
    },

    /// A shape was built from invalid extents (zero, or rank out of range).
    #[error("invalid shape {dims:?}: {detail}")]
    InvalidShape { dims: Vec<usize>, detail: String },

    /// An operator attribute is inconsistent with its inputs.
    #[error("invalid attribute for {op}: {detail}")]
    InvalidAttribute { op: &'static str, detail: String },

    /// The caller-provided scratch buffer cannot hold one output plane.
    #[error("scratch buffer too small for {op}: need {required} elements, got {actual}")]
    ScratchTooSmall {
        op: &'static str,
        required: usize,
        actual: usize,
    },
}
