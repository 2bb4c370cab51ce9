// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Model loading from manifest + SafeTensors files.
//!
//! The loader reads a model directory containing:
//! - `model.json`: the topology manifest (see [`ModelManifest`]).
//! - `model.safetensors`: parameter tensors in HuggingFace SafeTensors format.
//!
//! The weight file is memory-mapped and only the tensors the manifest
//! references are copied out. Every parameter becomes an owned [`Tensor`]
//! handed to its operator at construction, so the mapping is dropped as soon
//! as loading finishes.
//!
//! The same conversion backs [`read_tensor_file`], which reads input and
//! reference data for a run.

use crate::{graph, ModelError, ModelGraph, ModelManifest};
use safetensors::{Dtype, SafeTensors};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tensor_core::{Shape, Tensor};

/// Default manifest filename.
pub const MANIFEST_FILE: &str = "model.json";

/// Default SafeTensors filename.
pub const WEIGHTS_FILE: &str = "model.safetensors";

/// Loads a model from disk into a validated [`ModelGraph`].
///
/// # Example
/// ```no_run
/// use model_ir::ModelLoader;
/// use std::path::Path;
///
/// let graph = ModelLoader::load(Path::new("./models/lenet")).unwrap();
/// println!("Loaded {} nodes", graph.num_nodes());
/// ```
pub struct ModelLoader;

impl ModelLoader {
    /// Loads and validates a model from the given directory.
    ///
    /// Steps:
    /// 1. Parse `model.json` and validate it.
    /// 2. Memory-map `model.safetensors` and convert the referenced tensors.
    /// 3. Build one [`Node`](crate::Node) per manifest entry.
    /// 4. Construct and validate the [`ModelGraph`].
    pub fn load(model_dir: &Path) -> Result<ModelGraph<graph::Validated>, ModelError> {
        let manifest = ModelManifest::from_file(&model_dir.join(MANIFEST_FILE))?;
        manifest.validate()?;

        let wanted: HashSet<&str> = manifest
            .nodes
            .iter()
            .flat_map(|n| n.weight_names())
            .collect();
        let weights = read_tensors_filtered(&model_dir.join(WEIGHTS_FILE), |name| {
            wanted.contains(name)
        })?;
        tracing::info!(
            model = %manifest.name,
            tensors = weights.len(),
            "loaded parameter tensors"
        );

        Self::from_manifest_and_weights(&manifest, weights)
    }

    /// Builds a model from a manifest and already loaded parameter tensors.
    ///
    /// Useful for testing without actual SafeTensors files.
    pub fn from_manifest_and_weights(
        manifest: &ModelManifest,
        mut weights: HashMap<String, Tensor>,
    ) -> Result<ModelGraph<graph::Validated>, ModelError> {
        manifest.validate()?;
        let nodes = manifest
            .nodes
            .iter()
            .map(|n| n.build(&mut weights))
            .collect::<Result<Vec<_>, _>>()?;
        if !weights.is_empty() {
            tracing::warn!(unused = weights.len(), "parameter tensors not referenced by any node");
        }
        let graph = ModelGraph::new(
            manifest.name.clone(),
            manifest.inputs.clone(),
            nodes,
            manifest.resolved_outputs(),
        );
        graph.validate()
    }
}

/// Reads every tensor of a SafeTensors file as owned `f32` tensors.
///
/// Used for network inputs and reference outputs.
pub fn read_tensor_file(path: &Path) -> Result<HashMap<String, Tensor>, ModelError> {
    read_tensors_filtered(path, |_| true)
}

/// Writes tensors to a SafeTensors file in little-endian `f32`.
pub fn write_tensor_file(path: &Path, tensors: &[(&str, &Tensor)]) -> Result<(), ModelError> {
    let bytes: Vec<Vec<u8>> = tensors
        .iter()
        .map(|(_, t)| t.as_slice().iter().flat_map(|v| v.to_le_bytes()).collect())
        .collect();
    let views = tensors
        .iter()
        .zip(&bytes)
        .map(|((name, t), data)| {
            safetensors::tensor::TensorView::new(Dtype::F32, t.shape().dims().to_vec(), data)
                .map(|view| (name.to_string(), view))
                .map_err(|e| ModelError::SafeTensors(format!("cannot encode '{name}': {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    safetensors::serialize_to_file(views, &None, path)
        .map_err(|e| ModelError::SafeTensors(format!("cannot write '{}': {e}", path.display())))
}

fn read_tensors_filtered(
    path: &Path,
    keep: impl Fn(&str) -> bool,
) -> Result<HashMap<String, Tensor>, ModelError> {
    let file = std::fs::File::open(path).map_err(|e| {
        ModelError::SafeTensors(format!("cannot open '{}': {e}", path.display()))
    })?;

    // SAFETY: the mapping is read-only and dropped before this function
    // returns; every tensor is copied into an owned buffer.
    let mmap = unsafe { memmap2::Mmap::map(&file) }
        .map_err(|e| ModelError::SafeTensors(format!("mmap failed: {e}")))?;

    let tensors = SafeTensors::deserialize(&mmap)
        .map_err(|e| ModelError::SafeTensors(format!("SafeTensors parse error: {e}")))?;

    let mut out = HashMap::new();
    for (name, view) in tensors.tensors() {
        if !keep(&name) {
            continue;
        }
        let tensor = tensor_from_view(&name, &view)?;
        out.insert(name, tensor);
    }
    Ok(out)
}

/// Converts one stored tensor to an owned [`Tensor`].
///
/// Only `F32` is accepted. A zero-rank scalar becomes a one-element vector.
fn tensor_from_view(
    name: &str,
    view: &safetensors::tensor::TensorView<'_>,
) -> Result<Tensor, ModelError> {
    if view.dtype() != Dtype::F32 {
        return Err(ModelError::UnsupportedDType {
            name: name.to_string(),
            dtype: format!("{:?}", view.dtype()),
        });
    }
    let dims = if view.shape().is_empty() {
        vec![1]
    } else {
        view.shape().to_vec()
    };
    let shape = Shape::try_new(dims)?;
    let data = view
        .data()
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    Ok(Tensor::from_vec(shape, data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ModelManifest;

    fn sample_manifest() -> ModelManifest {
        let json = r#"{
            "name": "fc-net",
            "inputs": [{ "name": "x", "shape": [1, 3] }],
            "outputs": ["out"],
            "nodes": [
                {
                    "name": "fc", "op": "fully_connected", "inputs": ["x"],
                    "weights": { "kernel": "fc.weight", "bias": "fc.bias" }
                },
                { "name": "out", "op": "sigmoid", "inputs": ["fc"] }
            ]
        }"#;
        ModelManifest::from_json(json).unwrap()
    }

    fn sample_weights() -> HashMap<String, Tensor> {
        let mut w = HashMap::new();
        w.insert(
            "fc.weight".into(),
            Tensor::from_f32(Shape::matrix(2, 3), &[1.0, 0.0, -1.0, 0.5, 0.5, 0.5]).unwrap(),
        );
        w.insert(
            "fc.bias".into(),
            Tensor::from_f32(Shape::vector(2), &[0.0, 1.0]).unwrap(),
        );
        w
    }

    fn temp_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("model-ir-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_build_from_manifest_and_weights() {
        let graph =
            ModelLoader::from_manifest_and_weights(&sample_manifest(), sample_weights()).unwrap();
        assert_eq!(graph.num_nodes(), 2);
        assert_eq!(graph.name, "fc-net");
        assert_eq!(graph.shape_of("out"), Some(&Shape::matrix(1, 2)));
        assert_eq!(graph.total_weight_bytes(), 8 * 4);
    }

    #[test]
    fn test_missing_weight_tensor() {
        let result = ModelLoader::from_manifest_and_weights(&sample_manifest(), HashMap::new());
        assert!(matches!(result, Err(ModelError::WeightNotFound { .. })));
    }

    #[test]
    fn test_tensor_file_roundtrip() {
        let dir = temp_dir("roundtrip");
        let path = dir.join("t.safetensors");
        let a = Tensor::from_f32(Shape::nchw(1, 1, 2, 2), &[1.5, -2.0, 0.0, 3.25]).unwrap();
        let b = Tensor::from_f32(Shape::vector(3), &[7.0, 8.0, 9.0]).unwrap();
        write_tensor_file(&path, &[("a", &a), ("b", &b)]).unwrap();

        let back = read_tensor_file(&path).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back["a"], a);
        assert_eq!(back["b"], b);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_from_directory() {
        let dir = temp_dir("load");
        std::fs::write(
            dir.join(MANIFEST_FILE),
            serde_json::to_string(&sample_manifest()).unwrap(),
        )
        .unwrap();
        let weights = sample_weights();
        let entries: Vec<(&str, &Tensor)> =
            weights.iter().map(|(k, v)| (k.as_str(), v)).collect();
        write_tensor_file(&dir.join(WEIGHTS_FILE), &entries).unwrap();

        let graph = ModelLoader::load(&dir).unwrap();
        assert_eq!(graph.num_nodes(), 2);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_rejects_non_f32() {
        let dir = temp_dir("dtype");
        let path = dir.join("i.safetensors");
        let data = [1u8, 2, 3, 4];
        let view = safetensors::tensor::TensorView::new(Dtype::U8, vec![4], &data).unwrap();
        safetensors::serialize_to_file(vec![("ids".to_string(), view)], &None, &path).unwrap();

        let r = read_tensor_file(&path);
        assert!(matches!(r, Err(ModelError::UnsupportedDType { .. })));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_file_is_recoverable() {
        let r = read_tensor_file(Path::new("/nonexistent/x.safetensors"));
        let err = r.unwrap_err();
        assert!(err.is_recoverable());
    }
}
