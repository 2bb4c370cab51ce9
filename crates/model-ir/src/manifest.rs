// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! JSON model manifest parsing.
//!
//! The manifest (`model.json`) describes the network topology and maps each
//! node's parameter roles to tensor names in the SafeTensors file.
//!
//! # Format
//! ```json
//! {
//!   "name": "lenet",
//!   "inputs": [{ "name": "data", "shape": [1, 1, 28, 28] }],
//!   "outputs": ["prob"],
//!   "nodes": [
//!     {
//!       "name": "conv1",
//!       "op": "conv",
//!       "inputs": ["data"],
//!       "weights": { "kernel": "conv1.weight", "bias": "conv1.bias" },
//!       "attrs": { "stride": [1, 1], "padding": [0, 0, 0, 0] }
//!     },
//!     ...
//!   ]
//! }
//! ```
//!
//! `output` defaults to the node name. `outputs` defaults to the output of
//! the last node.

use crate::{GraphInput, ModelError, Node, OpKind, Operator};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tensor_core::ops::{ConvAttrs, LrnAttrs, PoolAttrs, DEFAULT_EPSILON};
use tensor_core::{Padding, Tensor};

/// Top-level model manifest, deserialized from `model.json`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModelManifest {
    /// Human-readable model name.
    pub name: String,
    pub inputs: Vec<GraphInput>,
    #[serde(default)]
    pub outputs: Vec<String>,
    pub nodes: Vec<ManifestNode>,
}

/// A single node entry in the manifest.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ManifestNode {
    pub name: String,
    /// Op type string (e.g., `"conv"`, `"AveragePool"`).
    pub op: String,
    pub inputs: Vec<String>,
    #[serde(default)]
    pub output: Option<String>,
    /// Parameter role (`"kernel"`, `"bias"`, `"gamma"`, ...) to tensor name.
    #[serde(default)]
    pub weights: BTreeMap<String, String>,
    #[serde(default)]
    pub attrs: ManifestAttrs,
}

/// Scalar attributes. Each op reads the fields it needs and ignores the rest.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManifestAttrs {
    /// Window size: one value (square) or `[h, w]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel: Option<Vec<usize>>,
    /// One value (both axes) or `[h, w]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stride: Option<Vec<usize>>,
    /// 0, 2 or 4 values; see [`Padding::from_slice`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<Vec<usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dilation: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count_include_pad: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epsilon: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beta: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bias: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axis: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f32>,
}

impl ModelManifest {
    /// Loads a manifest from a JSON file path.
    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        let content = std::fs::read_to_string(path)?;
        let manifest: Self = serde_json::from_str(&content)?;
        Ok(manifest)
    }

    /// Parses a manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let manifest: Self = serde_json::from_str(json)?;
        Ok(manifest)
    }

    /// Validates that the manifest is internally consistent.
    ///
    /// Checks:
    /// - At least one input and one node are defined.
    /// - All op strings are recognised.
    /// - No duplicate node names.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.inputs.is_empty() {
            return Err(ModelError::InvalidGraph(
                "manifest declares no inputs".into(),
            ));
        }
        if self.nodes.is_empty() {
            return Err(ModelError::InvalidGraph(
                "manifest contains no nodes".into(),
            ));
        }

        let mut seen_names = std::collections::HashSet::new();
        for node in &self.nodes {
            if !seen_names.insert(&node.name) {
                return Err(ModelError::node(&node.name, "duplicate node name"));
            }
            if OpKind::from_str_loose(&node.op).is_none() {
                return Err(ModelError::node(
                    &node.name,
                    format!("unrecognised op '{}'", node.op),
                ));
            }
        }
        Ok(())
    }

    /// Returns the number of distinct weight tensor names across all nodes.
    pub fn total_weight_count(&self) -> usize {
        let mut unique = std::collections::HashSet::new();
        for node in &self.nodes {
            for w in node.weights.values() {
                unique.insert(w.as_str());
            }
        }
        unique.len()
    }

    /// Graph outputs, defaulting to the last node's output.
    pub fn resolved_outputs(&self) -> Vec<String> {
        if !self.outputs.is_empty() {
            return self.outputs.clone();
        }
        self.nodes.last().map(|n| vec![n.output_name()]).unwrap_or_default()
    }
}

impl ManifestNode {
    /// Output value name, defaulting to the node name.
    pub fn output_name(&self) -> String {
        self.output.clone().unwrap_or_else(|| self.name.clone())
    }

    /// Builds the graph node, moving its parameter tensors out of `weights`.
    pub fn build(&self, weights: &mut HashMap<String, Tensor>) -> Result<Node, ModelError> {
        let kind = OpKind::from_str_loose(&self.op)
            .ok_or_else(|| ModelError::node(&self.name, format!("unrecognised op '{}'", self.op)))?;
        let a = &self.attrs;

        let op = match kind {
            OpKind::Conv => Operator::Conv {
                attrs: ConvAttrs {
                    stride: self.pair("stride", &a.stride, (1, 1))?,
                    padding: self.padding()?,
                    dilation: a.dilation.unwrap_or(1),
                    groups: a.groups.unwrap_or(1),
                },
                kernel: self.take(weights, "kernel")?,
                bias: self.take_optional(weights, "bias")?,
            },
            OpKind::MaxPool => Operator::MaxPool {
                attrs: self.pool_attrs()?,
            },
            OpKind::AvgPool => Operator::AvgPool {
                attrs: self.pool_attrs()?,
                count_include_pad: a.count_include_pad.unwrap_or(false),
                bias: self.take_optional(weights, "bias")?,
            },
            OpKind::GlobalAvgPool => Operator::GlobalAvgPool,
            OpKind::GlobalMaxPool => Operator::GlobalMaxPool,
            OpKind::FullyConnected => Operator::FullyConnected {
                kernel: self.take(weights, "kernel")?,
                bias: self.take_optional(weights, "bias")?,
            },
            OpKind::BatchNorm => Operator::BatchNorm {
                gamma: self.take(weights, "gamma")?,
                beta: self.take(weights, "beta")?,
                mean: self.take(weights, "mean")?,
                variance: self.take(weights, "variance")?,
                epsilon: a.epsilon.unwrap_or(DEFAULT_EPSILON),
            },
            OpKind::Identity => Operator::Identity,
            OpKind::Relu => Operator::Relu,
            OpKind::LeakyRelu => Operator::LeakyRelu {
                alpha: a.alpha.unwrap_or(0.01),
            },
            OpKind::PRelu => Operator::PRelu {
                slope: self.take(weights, "slope")?,
            },
            OpKind::Clip => Operator::Clip {
                low: a.min.unwrap_or(f32::NEG_INFINITY),
                high: a.max.unwrap_or(f32::INFINITY),
            },
            OpKind::Sigmoid => Operator::Sigmoid,
            OpKind::Tanh => Operator::Tanh,
            OpKind::Softmax => Operator::Softmax,
            OpKind::Lrn => {
                let defaults = LrnAttrs::default();
                Operator::Lrn {
                    attrs: LrnAttrs {
                        alpha: a.alpha.unwrap_or(defaults.alpha),
                        beta: a.beta.unwrap_or(defaults.beta),
                        bias: a.bias.unwrap_or(defaults.bias),
                        size: a.size.unwrap_or(defaults.size),
                    },
                }
            }
            OpKind::Add => Operator::Add,
            OpKind::Concat => Operator::Concat {
                axis: a.axis.unwrap_or(1),
            },
            OpKind::Flatten => Operator::Flatten,
            OpKind::Pad => Operator::Pad {
                padding: self.padding()?,
                value: a.value.unwrap_or(0.0),
            },
        };

        Ok(Node::with_io(
            self.name.clone(),
            op,
            self.inputs.clone(),
            self.output_name(),
        ))
    }

    /// Parameter tensor names this node references, in role order.
    pub fn weight_names(&self) -> impl Iterator<Item = &str> {
        self.weights.values().map(String::as_str)
    }

    fn pool_attrs(&self) -> Result<PoolAttrs, ModelError> {
        let kernel = match &self.attrs.kernel {
            Some(_) => self.pair("kernel", &self.attrs.kernel, (1, 1))?,
            None => return Err(ModelError::node(&self.name, "pooling requires 'kernel'")),
        };
        Ok(PoolAttrs {
            kernel,
            stride: self.pair("stride", &self.attrs.stride, kernel)?,
            padding: self.padding()?,
        })
    }

    fn padding(&self) -> Result<Padding, ModelError> {
        let values = self.attrs.padding.as_deref().unwrap_or(&[]);
        Padding::from_slice(values).map_err(|e| ModelError::node(&self.name, e))
    }

    fn pair(
        &self,
        attr: &str,
        values: &Option<Vec<usize>>,
        default: (usize, usize),
    ) -> Result<(usize, usize), ModelError> {
        match values.as_deref() {
            None => Ok(default),
            Some([v]) => Ok((*v, *v)),
            Some([h, w]) => Ok((*h, *w)),
            Some(other) => Err(ModelError::node(
                &self.name,
                format!("'{attr}' takes 1 or 2 values, got {}", other.len()),
            )),
        }
    }

    fn take_optional(
        &self,
        weights: &mut HashMap<String, Tensor>,
        role: &str,
    ) -> Result<Option<Tensor>, ModelError> {
        match self.weights.get(role) {
            None => Ok(None),
            Some(name) => weights
                .remove(name)
                .map(Some)
                .ok_or_else(|| ModelError::WeightNotFound { name: name.clone() }),
        }
    }

    fn take(
        &self,
        weights: &mut HashMap<String, Tensor>,
        role: &str,
    ) -> Result<Tensor, ModelError> {
        self.take_optional(weights, role)?.ok_or_else(|| {
            ModelError::node(&self.name, format!("missing '{role}' weight"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::Shape;

    fn sample_manifest_json() -> &'static str {
        r#"{
            "name": "tiny",
            "inputs": [{ "name": "data", "shape": [1, 1, 6, 6] }],
            "nodes": [
                {
                    "name": "conv1", "op": "Conv", "inputs": ["data"],
                    "weights": { "kernel": "conv1.weight", "bias": "conv1.bias" },
                    "attrs": { "padding": [1, 1, 1, 1] }
                },
                { "name": "relu1", "op": "relu", "inputs": ["conv1"] },
                {
                    "name": "pool1", "op": "AveragePool", "inputs": ["relu1"],
                    "attrs": { "kernel": [2, 2], "count_include_pad": true }
                },
                { "name": "gap", "op": "GlobalMaxPool", "inputs": ["pool1"] }
            ]
        }"#
    }

    fn sample_weights() -> HashMap<String, Tensor> {
        let mut w = HashMap::new();
        w.insert(
            "conv1.weight".to_string(),
            Tensor::full(Shape::nchw(2, 1, 3, 3), 1.0),
        );
        w.insert("conv1.bias".to_string(), Tensor::zeros(Shape::vector(2)));
        w
    }

    #[test]
    fn test_parse_manifest() {
        let m = ModelManifest::from_json(sample_manifest_json()).unwrap();
        assert_eq!(m.name, "tiny");
        assert_eq!(m.nodes.len(), 4);
        assert_eq!(m.inputs[0].shape, Shape::nchw(1, 1, 6, 6));
        assert_eq!(m.resolved_outputs(), vec!["gap".to_string()]);
        assert_eq!(m.total_weight_count(), 2);
    }

    #[test]
    fn test_validate_ok() {
        let m = ModelManifest::from_json(sample_manifest_json()).unwrap();
        m.validate().unwrap();
    }

    #[test]
    fn test_validate_empty_nodes() {
        let json = r#"{ "name": "empty", "inputs": [{ "name": "x", "shape": [1, 4] }], "nodes": [] }"#;
        let m = ModelManifest::from_json(json).unwrap();
        assert!(m.validate().is_err());
    }

    #[test]
    fn test_validate_bad_op() {
        let json = r#"{
            "name": "bad", "inputs": [{ "name": "x", "shape": [1, 4] }],
            "nodes": [{ "name": "n0", "op": "attention", "inputs": ["x"] }]
        }"#;
        let m = ModelManifest::from_json(json).unwrap();
        assert!(matches!(m.validate(), Err(ModelError::InvalidNode { .. })));
    }

    #[test]
    fn test_validate_duplicate_names() {
        let json = r#"{
            "name": "dup", "inputs": [{ "name": "x", "shape": [1, 4] }],
            "nodes": [
                { "name": "n0", "op": "relu", "inputs": ["x"] },
                { "name": "n0", "op": "relu", "inputs": ["x"], "output": "y" }
            ]
        }"#;
        let m = ModelManifest::from_json(json).unwrap();
        assert!(m.validate().is_err());
    }

    #[test]
    fn test_unknown_attribute_rejected() {
        let json = r#"{
            "name": "x", "inputs": [{ "name": "x", "shape": [1, 4] }],
            "nodes": [{ "name": "n0", "op": "relu", "inputs": ["x"], "attrs": { "strides": [2] } }]
        }"#;
        assert!(matches!(
            ModelManifest::from_json(json),
            Err(ModelError::ManifestParse(_))
        ));
    }

    #[test]
    fn test_build_nodes() {
        let m = ModelManifest::from_json(sample_manifest_json()).unwrap();
        let mut weights = sample_weights();
        let conv = m.nodes[0].build(&mut weights).unwrap();
        match &conv.op {
            Operator::Conv { attrs, bias, .. } => {
                assert_eq!(attrs.padding, Padding::uniform(1));
                assert_eq!(attrs.stride, (1, 1));
                assert!(bias.is_some());
            }
            other => panic!("expected conv, got {other:?}"),
        }
        assert!(weights.is_empty());

        let pool = m.nodes[2].build(&mut weights).unwrap();
        match pool.op {
            Operator::AvgPool {
                attrs,
                count_include_pad,
                bias,
            } => {
                assert_eq!(attrs.kernel, (2, 2));
                // Stride defaults to the window.
                assert_eq!(attrs.stride, (2, 2));
                assert!(count_include_pad);
                assert!(bias.is_none());
            }
            other => panic!("expected avg pool, got {other:?}"),
        }
    }

    #[test]
    fn test_build_missing_weight() {
        let m = ModelManifest::from_json(sample_manifest_json()).unwrap();
        let r = m.nodes[0].build(&mut HashMap::new());
        assert!(matches!(r, Err(ModelError::WeightNotFound { .. })));
    }

    #[test]
    fn test_bad_padding_arity() {
        let json = r#"{
            "name": "x", "inputs": [{ "name": "x", "shape": [1, 1, 4, 4] }],
            "nodes": [{ "name": "p", "op": "max_pool", "inputs": ["x"], "attrs": { "kernel": [2], "padding": [1, 1, 1] } }]
        }"#;
        let m = ModelManifest::from_json(json).unwrap();
        let r = m.nodes[0].build(&mut HashMap::new());
        assert!(matches!(r, Err(ModelError::InvalidNode { .. })));
    }

    #[test]
    fn test_serde_roundtrip() {
        let m = ModelManifest::from_json(sample_manifest_json()).unwrap();
        let json = serde_json::to_string_pretty(&m).unwrap();
        let back = ModelManifest::from_json(&json).unwrap();
        assert_eq!(back.name, m.name);
        assert_eq!(back.nodes.len(), m.nodes.len());
    }
}
