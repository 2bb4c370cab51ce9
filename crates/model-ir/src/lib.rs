// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # model-ir
//!
//! The intermediate representation of a convolutional network: what the
//! runtime executes and what the specializer inspects.
//!
//! - [`Operator`]: a closed enum of operator variants, each owning its
//!   parameter tensors, dispatched by a single `match`.
//! - [`Node`]: an operator bound to named input and output values.
//! - [`ModelGraph`]: the network as a DAG, with a **type-state pattern**
//!   (`Loaded` → `Validated`); validation orders nodes and infers shapes.
//! - [`ModelLoader`]: loads models from a JSON manifest + SafeTensors weights.
//! - [`ModelManifest`]: the JSON model descriptor.
//!
//! # Supported Model Format
//! A model is stored as:
//! - `model.json`: topology, attributes and weight mapping.
//! - `model.safetensors`: `f32` parameter tensors.
//!
//! # Example
//! ```no_run
//! use model_ir::ModelLoader;
//! use std::path::Path;
//!
//! let graph = ModelLoader::load(Path::new("./models/lenet")).unwrap();
//! println!("{}", graph.summary());
//! for node in graph.iter_nodes() {
//!     println!("  {}", node.summary());
//! }
//! ```

mod error;
pub mod graph;
mod loader;
pub mod manifest;
mod node;
mod operator;

pub use error::ModelError;
pub use graph::{GraphInput, ModelGraph};
pub use loader::{read_tensor_file, write_tensor_file, ModelLoader, MANIFEST_FILE, WEIGHTS_FILE};
pub use manifest::ModelManifest;
pub use node::Node;
pub use operator::{OpKind, Operator};
