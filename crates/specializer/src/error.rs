// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for kernel specialization.

use tensor_core::TensorError;

/// Errors that can occur while building or checking a specialization plan.
#[derive(Debug, thiserror::Error)]
pub enum SpecializeError {
    /// The model graph has no nodes.
    #[error("cannot specialize an empty model graph")]
    EmptyGraph,

    /// A node's operator does not match the kernel it was bound to, or has
    /// no specialized form for its inputs.
    #[error("node '{node}': operator {op} cannot be specialized: {detail}")]
    UnsupportedOperator {
        node: String,
        op: String,
        detail: String,
    },

    /// Shape resolution failed while deriving static facts or constants.
    #[error("node '{node}': {source}")]
    Tensor {
        node: String,
        #[source]
        source: TensorError,
    },

    /// A finished plan violates one of its structural invariants.
    #[error("plan '{strategy}' is invalid: {detail}")]
    PlanInvalid { strategy: String, detail: String },
}
