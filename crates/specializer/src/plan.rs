// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Specialization plan data structures.

use crate::kernels::KernelFn;
use crate::{BakedConstants, KernelVariant, SpecializeError, StaticFacts};
use model_ir::{Node, OpKind};
use serde::Serialize;
use std::fmt;
use tensor_core::{Tensor, TensorError, TensorView};

/// One operator instance with its facts, chosen variant and constants.
#[derive(Clone, Serialize)]
pub struct SpecializedUnit {
    /// Execution index of the node this unit runs.
    pub node_index: usize,
    pub node_name: String,
    pub op: OpKind,
    pub facts: StaticFacts,
    pub variant: KernelVariant,
    /// Symbol name of the variant, for code generators.
    pub kernel_name: String,
    pub constants: BakedConstants,
    /// Kernel resolved at plan time. Not part of the serialized plan.
    #[serde(skip)]
    kernel: KernelFn,
}

impl SpecializedUnit {
    /// Runs this unit's kernel for `node`.
    pub fn execute(
        &self,
        node: &Node,
        inputs: &[TensorView<'_>],
        scratch: &mut [f32],
        output: &mut Tensor,
    ) -> Result<(), TensorError> {
        (self.kernel)(&node.op, &self.constants, inputs, scratch, output)
    }

    /// The resolved kernel.
    pub fn kernel(&self) -> KernelFn {
        self.kernel
    }
}

impl fmt::Debug for SpecializedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecializedUnit")
            .field("node_index", &self.node_index)
            .field("node_name", &self.node_name)
            .field("op", &self.op)
            .field("facts", &self.facts)
            .field("variant", &self.variant)
            .field("constants", &self.constants)
            .finish_non_exhaustive()
    }
}

/// A complete specialization plan: one unit per node, in execution order.
#[derive(Debug, Clone, Serialize)]
pub struct SpecializationPlan {
    /// Name of the strategy that produced this plan.
    pub strategy_name: String,
    pub model_name: String,
    pub units: Vec<SpecializedUnit>,
    /// Scratch elements the engine must allocate: the maximum over units.
    pub scratch_len: usize,
}

impl SpecializationPlan {
    /// Returns the number of units in the plan.
    pub fn num_units(&self) -> usize {
        self.units.len()
    }

    /// Number of units that run a dedicated specialized kernel.
    pub fn num_specialized(&self) -> usize {
        self.units
            .iter()
            .filter(|u| u.variant.is_specialized())
            .count()
    }

    /// Validates the plan invariants:
    /// - At least one unit.
    /// - Units are indexed `0..n` in order.
    /// - Each unit's variant is the one its facts select.
    /// - The plan scratch covers every unit.
    pub fn validate(&self) -> Result<(), SpecializeError> {
        let invalid = |detail: String| SpecializeError::PlanInvalid {
            strategy: self.strategy_name.clone(),
            detail,
        };

        if self.units.is_empty() {
            return Err(invalid("plan contains no units".into()));
        }

        for (i, unit) in self.units.iter().enumerate() {
            if unit.node_index != i {
                return Err(invalid(format!(
                    "unit '{}' has index {}, expected {i}",
                    unit.node_name, unit.node_index
                )));
            }
            if KernelVariant::select(unit.op, &unit.facts) != Some(unit.variant) {
                return Err(invalid(format!(
                    "unit '{}' runs {} which its facts do not select",
                    unit.node_name, unit.variant
                )));
            }
            if unit.constants.scratch_len > self.scratch_len {
                return Err(invalid(format!(
                    "unit '{}' needs {} scratch elements, plan reserves {}",
                    unit.node_name, unit.constants.scratch_len, self.scratch_len
                )));
            }
        }
        Ok(())
    }

    /// Checks that the plan was built for this node sequence.
    pub fn check_nodes<'a>(
        &self,
        nodes: impl ExactSizeIterator<Item = &'a Node>,
    ) -> Result<(), SpecializeError> {
        if nodes.len() != self.units.len() {
            return Err(SpecializeError::PlanInvalid {
                strategy: self.strategy_name.clone(),
                detail: format!(
                    "plan has {} units for {} nodes",
                    self.units.len(),
                    nodes.len()
                ),
            });
        }
        for (unit, node) in self.units.iter().zip(nodes) {
            if unit.node_name != node.name || unit.op != node.kind() {
                return Err(SpecializeError::PlanInvalid {
                    strategy: self.strategy_name.clone(),
                    detail: format!(
                        "unit '{}' ({}) does not match node '{}' ({})",
                        unit.node_name,
                        unit.op,
                        node.name,
                        node.kind()
                    ),
                });
            }
        }
        Ok(())
    }

    /// Returns a human-readable summary of the plan.
    pub fn summary(&self) -> String {
        let mut s = format!(
            "Plan '{}' for '{}': {} units ({} specialized), scratch {} elements\n",
            self.strategy_name,
            self.model_name,
            self.num_units(),
            self.num_specialized(),
            self.scratch_len,
        );
        for unit in &self.units {
            s.push_str(&format!(
                "  [{:>3}] {:<20} {:<16} -> {} {}\n",
                unit.node_index,
                unit.node_name,
                unit.op.as_str(),
                unit.kernel_name,
                unit.constants.output_shape,
            ));
        }
        s
    }
}

/// Builder for constructing plans unit by unit.
pub struct PlanBuilder {
    strategy_name: String,
    model_name: String,
    units: Vec<SpecializedUnit>,
    scratch_len: usize,
}

impl PlanBuilder {
    pub fn new(strategy_name: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            strategy_name: strategy_name.into(),
            model_name: model_name.into(),
            units: Vec::new(),
            scratch_len: 0,
        }
    }

    /// Appends a unit for `node`, bound to `kernel`.
    pub fn add_unit(
        &mut self,
        node: &Node,
        facts: StaticFacts,
        variant: KernelVariant,
        constants: BakedConstants,
        kernel: KernelFn,
    ) {
        self.scratch_len = self.scratch_len.max(constants.scratch_len);
        self.units.push(SpecializedUnit {
            node_index: self.units.len(),
            node_name: node.name.clone(),
            op: node.kind(),
            facts,
            kernel_name: variant.name(),
            variant,
            constants,
            kernel,
        });
    }

    /// Consumes the builder and returns the finished plan.
    pub fn build(self) -> SpecializationPlan {
        SpecializationPlan {
            strategy_name: self.strategy_name,
            model_name: self.model_name,
            units: self.units,
            scratch_len: self.scratch_len,
        }
    }
}
