// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The core inference engine with type-state–enforced pipeline.
//!
//! ```text
//! InferenceEngine<Idle>
//!     │  .load_model() / .with_graph()
//!     ▼
//! InferenceEngine<Planned>
//!     │  .prepare()
//!     ▼
//! InferenceEngine<Ready>
//!     │  .run()
//!     ▼
//!   InferenceOutput
//! ```
//!
//! Each state transition consumes the old value and returns a new one,
//! making invalid state sequences a compile error. The data a state needs
//! lives in the state itself, so a `Ready` engine always has its graph,
//! plan and scratch buffer.

use crate::{InferenceMetrics, RuntimeConfig, RuntimeError};
use model_ir::{graph::Validated, ModelGraph, ModelLoader};
use specializer::SpecializationPlan;
use std::collections::HashMap;
use std::time::Instant;
use tensor_core::{Tensor, TensorView};

// ── Type-state markers ─────────────────────────────────────────

/// Engine is created but no model is loaded.
#[derive(Debug)]
pub struct Idle;

/// Model is loaded and a specialization plan has been generated.
#[derive(Debug)]
pub struct Planned {
    graph: ModelGraph<Validated>,
    plan: SpecializationPlan,
}

/// Engine is ready to run inference.
#[derive(Debug)]
pub struct Ready {
    graph: ModelGraph<Validated>,
    plan: SpecializationPlan,
    scratch: Vec<f32>,
    last_uses: HashMap<String, usize>,
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Idle {}
    impl Sealed for super::Planned {}
    impl Sealed for super::Ready {}
}

/// Sealed trait for engine states.
pub trait EngineState: sealed::Sealed + std::fmt::Debug {}
impl EngineState for Idle {}
impl EngineState for Planned {}
impl EngineState for Ready {}

// ── Inference output ───────────────────────────────────────────

/// The result of a single inference run.
#[derive(Debug)]
pub struct InferenceOutput {
    /// Graph outputs, in declaration order.
    pub outputs: Vec<(String, Tensor)>,
    /// Every other value, when `keep_intermediates` is set.
    pub intermediates: HashMap<String, Tensor>,
    pub metrics: InferenceMetrics,
}

impl InferenceOutput {
    /// Looks up an output by value name.
    pub fn output(&self, name: &str) -> Option<&Tensor> {
        self.outputs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }

    /// The first declared output.
    pub fn primary(&self) -> Option<&Tensor> {
        self.outputs.first().map(|(_, t)| t)
    }
}

// ── Engine ─────────────────────────────────────────────────────

/// The primary inference engine.
///
/// `S` is a type-state marker that enforces the pipeline ordering at
/// compile time. You cannot call `.run()` on an `Idle` engine or
/// `.load_model()` on a `Ready` engine; the compiler catches it.
///
/// # Example
/// ```no_run
/// use runtime::{InferenceEngine, RuntimeConfig};
/// use std::collections::HashMap;
///
/// # fn example(inputs: HashMap<String, tensor_core::Tensor>) -> Result<(), runtime::RuntimeError> {
/// let mut engine = InferenceEngine::new(RuntimeConfig::default())
///     .load_model()?
///     .prepare();
/// let output = engine.run(inputs)?;
/// println!("{}", output.metrics.summary());
/// # Ok(())
/// # }
/// ```
pub struct InferenceEngine<S: EngineState = Idle> {
    config: RuntimeConfig,
    state: S,
}

// ── Idle → Planned ─────────────────────────────────────────────

impl InferenceEngine<Idle> {
    /// Creates a new engine from the given configuration.
    pub fn new(config: RuntimeConfig) -> Self {
        tracing::info!(mode = %config.mode, "engine created");
        Self { config, state: Idle }
    }

    /// Loads the model at `config.model_path` and plans it.
    ///
    /// Steps:
    /// 1. Load and validate the model graph.
    /// 2. Select the strategy named by `config.mode`.
    /// 3. Generate and validate the specialization plan.
    pub fn load_model(self) -> Result<InferenceEngine<Planned>, RuntimeError> {
        let graph = ModelLoader::load(&self.config.model_path)?;
        self.with_graph(graph)
    }

    /// Plans an already validated graph.
    pub fn with_graph(
        self,
        graph: ModelGraph<Validated>,
    ) -> Result<InferenceEngine<Planned>, RuntimeError> {
        tracing::info!("{}", graph.summary());
        let strategy = self.config.create_strategy()?;
        tracing::info!("using strategy: {}", strategy.name());

        let plan = strategy.plan(&graph)?;
        Self::from_graph_and_plan(self.config, graph, plan)
    }

    /// Pairs a graph with a pre-built plan, checking that they agree.
    pub fn from_graph_and_plan(
        config: RuntimeConfig,
        graph: ModelGraph<Validated>,
        plan: SpecializationPlan,
    ) -> Result<InferenceEngine<Planned>, RuntimeError> {
        plan.validate()
            .and_then(|()| plan.check_nodes(graph.nodes.iter()))
            .map_err(|e| RuntimeError::InvalidPlan(format!("plan validation failed: {e}")))?;
        tracing::info!("{}", plan.summary().trim_end());

        Ok(InferenceEngine {
            config,
            state: Planned { graph, plan },
        })
    }
}

// ── Planned → Ready ────────────────────────────────────────────

impl InferenceEngine<Planned> {
    /// Returns a reference to the specialization plan.
    pub fn plan(&self) -> &SpecializationPlan {
        &self.state.plan
    }

    /// Returns a reference to the model graph.
    pub fn graph(&self) -> &ModelGraph<Validated> {
        &self.state.graph
    }

    /// Allocates the shared scratch buffer and records value lifetimes.
    /// Transitions to the `Ready` state.
    pub fn prepare(self) -> InferenceEngine<Ready> {
        let Planned { graph, plan } = self.state;
        let scratch = vec![0.0; plan.scratch_len];
        let last_uses = graph.last_uses();
        tracing::info!(scratch_elements = scratch.len(), "engine ready");

        InferenceEngine {
            config: self.config,
            state: Ready {
                graph,
                plan,
                scratch,
                last_uses,
            },
        }
    }
}

// ── Ready: run inference ───────────────────────────────────────

impl InferenceEngine<Ready> {
    /// Returns the specialization plan.
    pub fn plan(&self) -> &SpecializationPlan {
        &self.state.plan
    }

    /// Returns the model graph.
    pub fn graph(&self) -> &ModelGraph<Validated> {
        &self.state.graph
    }

    /// Runs the network on a single-input graph.
    pub fn run_single(&mut self, input: Tensor) -> Result<InferenceOutput, RuntimeError> {
        let name = match self.state.graph.inputs.as_slice() {
            [only] => only.name.clone(),
            inputs => {
                return Err(RuntimeError::InputMismatch {
                    name: "<single>".into(),
                    detail: format!("graph declares {} inputs, expected exactly 1", inputs.len()),
                })
            }
        };
        self.run(HashMap::from([(name, input)]))
    }

    /// Runs inference on named input tensors.
    ///
    /// Nodes execute in plan order. Each node reads its operands from the
    /// value table and writes a freshly shaped output. A value is dropped
    /// right after its last consumer runs, unless it is a graph output or
    /// `keep_intermediates` is set.
    ///
    /// # Errors
    /// [`RuntimeError::InputMismatch`] for a missing or mis-shaped input,
    /// [`RuntimeError::ExecutionError`] if a kernel fails. Both are fatal.
    pub fn run(
        &mut self,
        mut inputs: HashMap<String, Tensor>,
    ) -> Result<InferenceOutput, RuntimeError> {
        let run_start = Instant::now();
        let Ready {
            graph,
            plan,
            scratch,
            last_uses,
        } = &mut self.state;
        let keep_all = self.config.keep_intermediates;
        let profiling = self.config.enable_profiling;
        let mut metrics = InferenceMetrics::new(plan.strategy_name.clone());

        let mut values: HashMap<String, Tensor> = HashMap::new();
        let mut live_bytes = 0usize;
        for declared in &graph.inputs {
            let tensor = inputs
                .remove(&declared.name)
                .ok_or_else(|| RuntimeError::InputMismatch {
                    name: declared.name.clone(),
                    detail: "no tensor supplied".into(),
                })?;
            if tensor.shape() != &declared.shape {
                return Err(RuntimeError::InputMismatch {
                    name: declared.name.clone(),
                    detail: format!(
                        "expected shape {}, got {}",
                        declared.shape,
                        tensor.shape()
                    ),
                });
            }
            live_bytes += byte_size(&tensor);
            values.insert(declared.name.clone(), tensor);
        }
        if !inputs.is_empty() {
            tracing::warn!(unused = inputs.len(), "ignoring tensors that are not graph inputs");
        }
        metrics.observe_live_bytes(live_bytes);

        tracing::debug!(nodes = graph.num_nodes(), "starting inference");

        for (node, unit) in graph.iter_nodes().zip(&plan.units) {
            let mut output = Tensor::zeros(unit.constants.output_shape.clone());
            let start = Instant::now();
            {
                let views = node
                    .inputs
                    .iter()
                    .map(|name| {
                        values.get(name).map(Tensor::view).ok_or_else(|| {
                            RuntimeError::InvalidPlan(format!(
                                "value '{name}' read by '{}' is not available",
                                node.name
                            ))
                        })
                    })
                    .collect::<Result<Vec<TensorView<'_>>, _>>()?;
                unit.execute(node, &views, scratch, &mut output)
                    .map_err(|source| RuntimeError::ExecutionError {
                        node: node.name.clone(),
                        source,
                    })?;
            }
            let elapsed = start.elapsed();

            let out_bytes = byte_size(&output);
            live_bytes += out_bytes;
            metrics.observe_live_bytes(live_bytes);
            metrics.record_node(&node.name, &unit.kernel_name, elapsed, out_bytes, profiling);
            tracing::debug!(
                node = %node.name,
                kernel = %unit.kernel_name,
                shape = %output.shape(),
                elapsed_us = elapsed.as_micros() as u64,
                "node executed"
            );
            values.insert(node.output.clone(), output);

            if keep_all {
                continue;
            }
            let releasable = node
                .inputs
                .iter()
                .filter(|v| last_uses.get(*v) == Some(&node.id))
                .chain(std::iter::once(&node.output).filter(|v| !last_uses.contains_key(*v)));
            for value in releasable {
                if graph.outputs.contains(value) {
                    continue;
                }
                if let Some(t) = values.remove(value) {
                    live_bytes -= byte_size(&t);
                    tracing::trace!(value = %value, "released");
                }
            }
        }

        let mut outputs = Vec::with_capacity(graph.outputs.len());
        for name in &graph.outputs {
            let tensor = values.remove(name).ok_or_else(|| {
                RuntimeError::InvalidPlan(format!("output '{name}' was never produced"))
            })?;
            outputs.push((name.clone(), tensor));
        }

        metrics.finalise(run_start.elapsed());
        tracing::info!("{}", metrics.summary());

        Ok(InferenceOutput {
            outputs,
            intermediates: if keep_all { values } else { HashMap::new() },
            metrics,
        })
    }
}

fn byte_size(t: &Tensor) -> usize {
    t.shape().num_elements() * std::mem::size_of::<f32>()
}

impl<S: EngineState> std::fmt::Debug for InferenceEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("state", &std::any::type_name::<S>())
            .field("mode", &self.config.mode)
            .field("model_path", &self.config.model_path)
            .finish()
    }
}
