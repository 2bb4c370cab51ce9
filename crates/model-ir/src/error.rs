// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for model loading and graph construction.

use tensor_core::TensorError;

/// Errors that can occur when building or loading a model graph.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The model manifest or a tensor file could not be read.
    #[error("failed to read manifest: {0}")]
    ManifestRead(#[from] std::io::Error),

    /// The manifest JSON is malformed.
    #[error("failed to parse manifest: {0}")]
    ManifestParse(#[from] serde_json::Error),

    /// A weight tensor referenced in the manifest was not found in the SafeTensors file.
    #[error("weight tensor not found: {name}")]
    WeightNotFound { name: String },

    /// The SafeTensors file could not be opened, mapped or parsed.
    #[error("failed to load SafeTensors: {0}")]
    SafeTensors(String),

    /// A stored tensor uses an element type other than `f32`.
    #[error("tensor '{name}' has unsupported dtype {dtype}")]
    UnsupportedDType { name: String, dtype: String },

    /// A node definition is invalid (unknown op, bad attributes, shape error).
    #[error("invalid node '{node}': {detail}")]
    InvalidNode { node: String, detail: String },

    /// The graph contains a cycle, dangling reference or is otherwise malformed.
    #[error("invalid model graph: {0}")]
    InvalidGraph(String),

    /// A parameter tensor could not be constructed.
    #[error(transparent)]
    Tensor(#[from] TensorError),
}

impl ModelError {
    /// Returns `true` for I/O and format failures a caller may retry or
    /// report, `false` for defects in the graph itself.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ManifestRead(_)
                | Self::ManifestParse(_)
                | Self::WeightNotFound { .. }
                | Self::SafeTensors(_)
                | Self::UnsupportedDType { .. }
        )
    }

    pub(crate) fn node(node: &str, detail: impl std::fmt::Display) -> Self {
        Self::InvalidNode {
            node: node.to_string(),
            detail: detail.to_string(),
        }
    }
}
