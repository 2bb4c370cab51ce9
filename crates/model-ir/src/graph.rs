// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Model graph: the network as a DAG of operator nodes.
//!
//! # Type-State Pattern
//!
//! The graph transitions through states enforced at compile time:
//!
//! ```text
//! ModelGraph<Loaded>     — nodes parsed, not yet checked.
//!       │  .validate()
//!       ▼
//! ModelGraph<Validated>  — topologically ordered, every shape inferred.
//! ```
//!
//! The specializer and the engine only accept validated graphs. The marker
//! types are `PhantomData`, so the transition has no runtime cost.

use crate::{ModelError, Node};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use tensor_core::Shape;

// ── Type-state markers ─────────────────────────────────────────────

/// Marker: graph has been built but not validated.
#[derive(Debug, Clone)]
pub struct Loaded;

/// Marker: graph has been validated and is ready for specialization.
#[derive(Debug, Clone)]
pub struct Validated;

/// Sealed trait for graph states.
pub trait GraphState: fmt::Debug + Clone {}
impl GraphState for Loaded {}
impl GraphState for Validated {}

/// A named graph input with its declared shape.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GraphInput {
    pub name: String,
    pub shape: Shape,
}

impl GraphInput {
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }
}

// ── ModelGraph ─────────────────────────────────────────────────────

/// The complete model.
///
/// The generic parameter `S` encodes the validation state at compile time.
#[derive(Debug, Clone)]
pub struct ModelGraph<S: GraphState = Loaded> {
    /// Human-readable model name (e.g., `"lenet"`).
    pub name: String,
    pub inputs: Vec<GraphInput>,
    /// Operator nodes; in execution order once validated.
    pub nodes: Vec<Node>,
    /// Names of the values returned to the caller.
    pub outputs: Vec<String>,
    /// Inferred shape of every value, filled by validation.
    shapes: HashMap<String, Shape>,
    _state: std::marker::PhantomData<S>,
}

// ── Loaded state ───────────────────────────────────────────────────

impl ModelGraph<Loaded> {
    /// Creates a new graph in the `Loaded` state.
    pub fn new(
        name: impl Into<String>,
        inputs: Vec<GraphInput>,
        nodes: Vec<Node>,
        outputs: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            inputs,
            nodes,
            outputs,
            shapes: HashMap::new(),
            _state: std::marker::PhantomData,
        }
    }

    /// Validates the graph and transitions to the `Validated` state.
    ///
    /// # Checks
    /// - At least one input, node and output exist.
    /// - Value names are unique (graph inputs and node outputs share one namespace).
    /// - Every node input refers to a defined value and the graph is acyclic.
    ///   Nodes are reordered topologically, keeping declaration order among
    ///   independent nodes, and ids are renumbered to execution order.
    /// - Every node's output shape can be inferred from its inputs.
    /// - Every graph output refers to a defined value.
    pub fn validate(self) -> Result<ModelGraph<Validated>, ModelError> {
        if self.inputs.is_empty() {
            return Err(ModelError::InvalidGraph("graph declares no inputs".into()));
        }
        if self.nodes.is_empty() {
            return Err(ModelError::InvalidGraph(
                "model graph contains no nodes".into(),
            ));
        }
        if self.outputs.is_empty() {
            return Err(ModelError::InvalidGraph("graph declares no outputs".into()));
        }

        // Unique value names.
        let mut defined = HashSet::new();
        for input in &self.inputs {
            if !defined.insert(input.name.as_str()) {
                return Err(ModelError::InvalidGraph(format!(
                    "duplicate graph input '{}'",
                    input.name
                )));
            }
        }
        let mut producer = HashMap::new();
        let mut names = HashSet::new();
        for (i, node) in self.nodes.iter().enumerate() {
            if !names.insert(node.name.as_str()) {
                return Err(ModelError::node(&node.name, "duplicate node name"));
            }
            if !defined.insert(node.output.as_str()) {
                return Err(ModelError::node(
                    &node.name,
                    format!("value '{}' is defined more than once", node.output),
                ));
            }
            producer.insert(node.output.as_str(), i);
        }
        for node in &self.nodes {
            if let Some(missing) = node.inputs.iter().find(|n| !defined.contains(n.as_str())) {
                return Err(ModelError::node(
                    &node.name,
                    format!("input '{missing}' is not defined"),
                ));
            }
        }

        let order = topological_order(&self.nodes, &producer)?;

        let mut nodes: Vec<Option<Node>> = self.nodes.into_iter().map(Some).collect();
        let mut ordered = Vec::with_capacity(nodes.len());
        for (id, i) in order.into_iter().enumerate() {
            if let Some(mut node) = nodes[i].take() {
                node.id = id;
                ordered.push(node);
            }
        }

        // Shape inference in execution order.
        let mut shapes: HashMap<String, Shape> = self
            .inputs
            .iter()
            .map(|i| (i.name.clone(), i.shape.clone()))
            .collect();
        for node in &ordered {
            let in_shapes: Vec<&Shape> = node
                .inputs
                .iter()
                .filter_map(|n| shapes.get(n))
                .collect();
            let out = node
                .op
                .output_shape(&in_shapes)
                .map_err(|e| ModelError::node(&node.name, e))?;
            tracing::debug!(node = %node.name, op = %node.kind(), shape = %out, "inferred output shape");
            shapes.insert(node.output.clone(), out);
        }

        for out in &self.outputs {
            if !shapes.contains_key(out) {
                return Err(ModelError::InvalidGraph(format!(
                    "graph output '{out}' is not defined"
                )));
            }
        }

        Ok(ModelGraph {
            name: self.name,
            inputs: self.inputs,
            nodes: ordered,
            outputs: self.outputs,
            shapes,
            _state: std::marker::PhantomData,
        })
    }
}

/// Kahn's algorithm, preferring the lowest declaration index among ready nodes.
fn topological_order(
    nodes: &[Node],
    producer: &HashMap<&str, usize>,
) -> Result<Vec<usize>, ModelError> {
    let n = nodes.len();
    let mut indegree = vec![0usize; n];
    let mut consumers: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, node) in nodes.iter().enumerate() {
        for input in &node.inputs {
            if let Some(&p) = producer.get(input.as_str()) {
                indegree[i] += 1;
                consumers[p].push(i);
            }
        }
    }

    let mut ready: BTreeSet<usize> =
        (0..n).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(i) = ready.pop_first() {
        order.push(i);
        for &c in &consumers[i] {
            indegree[c] -= 1;
            if indegree[c] == 0 {
                ready.insert(c);
            }
        }
    }

    if order.len() != n {
        let stuck: Vec<&str> = (0..n)
            .filter(|&i| indegree[i] > 0)
            .map(|i| nodes[i].name.as_str())
            .collect();
        return Err(ModelError::InvalidGraph(format!(
            "graph contains a cycle through {stuck:?}"
        )));
    }
    Ok(order)
}

// ── Validated state ────────────────────────────────────────────────

impl ModelGraph<Validated> {
    /// Returns the total number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Returns an iterator over the nodes in execution order.
    pub fn iter_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Returns a reference to a node by execution index.
    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    /// Inferred shape of a value (graph input or node output).
    pub fn shape_of(&self, value: &str) -> Option<&Shape> {
        self.shapes.get(value)
    }

    /// Input shapes of `node`, in operand order.
    pub fn input_shapes(&self, node: &Node) -> Vec<&Shape> {
        node.inputs
            .iter()
            .filter_map(|n| self.shapes.get(n))
            .collect()
    }

    /// Output shape of `node`.
    pub fn output_shape(&self, node: &Node) -> Option<&Shape> {
        self.shapes.get(&node.output)
    }

    /// For every value, the index of the last node that reads it.
    ///
    /// Values never read by a node are absent.
    pub fn last_uses(&self) -> HashMap<String, usize> {
        let mut last = HashMap::new();
        for node in &self.nodes {
            for input in &node.inputs {
                last.insert(input.clone(), node.id);
            }
        }
        last
    }

    /// Returns the total memory held by parameter tensors in bytes.
    pub fn total_weight_bytes(&self) -> usize {
        self.nodes.iter().map(|n| n.op.weight_bytes()).sum()
    }

    /// Largest single activation produced by a node, in bytes.
    pub fn max_activation_bytes(&self) -> usize {
        self.nodes
            .iter()
            .filter_map(|n| self.shapes.get(&n.output))
            .map(|s| s.num_elements() * std::mem::size_of::<f32>())
            .max()
            .unwrap_or(0)
    }

    /// Returns a summary string describing the model.
    pub fn summary(&self) -> String {
        let total_weight_kb = self.total_weight_bytes() as f64 / 1024.0;
        let max_act_kb = self.max_activation_bytes() as f64 / 1024.0;
        format!(
            "Model '{}': {} nodes, {:.1} KB weights, largest activation {:.1} KB",
            self.name,
            self.num_nodes(),
            total_weight_kb,
            max_act_kb,
        )
    }
}

// ── Shared implementations ─────────────────────────────────────────

impl<S: GraphState> fmt::Display for ModelGraph<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ModelGraph '{}' ({} nodes):", self.name, self.nodes.len())?;
        for input in &self.inputs {
            writeln!(f, "  input {} {}", input.name, input.shape)?;
        }
        for node in &self.nodes {
            match self.shapes.get(&node.output) {
                Some(shape) => writeln!(f, "  {} {}", node.summary(), shape)?,
                None => writeln!(f, "  {}", node.summary())?,
            }
        }
        Ok(())
    }
}
