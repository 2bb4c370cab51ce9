// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # runtime
//!
//! The execution engine that runs a CNN node by node.
//!
//! The runtime takes:
//! - A validated `ModelGraph` from `model-ir`.
//! - A `SpecializationPlan` from `specializer`, built by the strategy named
//!   in [`RuntimeConfig::mode`].
//!
//! And executes the model sequentially on a single thread, feeding every
//! node from a value table, releasing activations after their last reader
//! and collecting per-node timing.
//!
//! # Type-State Pipeline
//! The runtime enforces a type-safe pipeline:
//! ```text
//! InferenceEngine<Idle> → InferenceEngine<Planned> → InferenceEngine<Ready>
//! ```
//! Transitions are compile-time checked.
//!
//! # Fatal errors
//! Graph, plan and kernel defects are fatal (see [`RuntimeError::is_fatal`]).
//! Binaries route results through [`abort_on_fatal`], which logs and aborts
//! the process on them.

mod config;
mod engine;
mod error;
mod metrics;
mod reference;

pub use config::RuntimeConfig;
pub use engine::{EngineState, Idle, InferenceEngine, InferenceOutput, Planned, Ready};
pub use error::{abort_on_fatal, RuntimeError};
pub use metrics::{InferenceMetrics, NodeMetrics};
pub use reference::{compare_with_reference, ReferenceReport};
