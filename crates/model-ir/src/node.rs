// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Graph nodes.
//!
//! A [`Node`] binds an [`Operator`] to named activation values: the names of
//! the tensors it consumes and the name of the tensor it produces. Nodes are
//! immutable once the graph is validated.

use crate::{OpKind, Operator};

/// A single operator instance in the model graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Unique identifier (e.g., `"conv1"`).
    pub name: String,
    /// Position in execution order, assigned by validation.
    pub id: usize,
    pub op: Operator,
    /// Names of the activation values this node reads, in operand order.
    pub inputs: Vec<String>,
    /// Name of the activation value this node writes.
    pub output: String,
}

impl Node {
    /// Creates a single-input node whose output value shares its name.
    pub fn new(name: impl Into<String>, op: Operator, input: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            output: name.clone(),
            name,
            id: 0,
            op,
            inputs: vec![input.into()],
        }
    }

    /// Creates a node with explicit inputs and output.
    pub fn with_io(
        name: impl Into<String>,
        op: Operator,
        inputs: Vec<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            id: 0,
            op,
            inputs,
            output: output.into(),
        }
    }

    pub fn kind(&self) -> OpKind {
        self.op.kind()
    }

    /// Returns a concise summary string for display.
    pub fn summary(&self) -> String {
        let weight_kb = self.op.weight_bytes() as f64 / 1024.0;
        format!(
            "[{}] {} ({}) {} -> {}, weights: {:.1} KB",
            self.id,
            self.name,
            self.kind(),
            self.inputs.join(", "),
            self.output,
            weight_kb,
        )
    }
}
