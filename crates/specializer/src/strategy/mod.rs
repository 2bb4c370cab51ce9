// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`SpecializationStrategy`] trait and strategy implementations.

pub mod generic;
pub mod specialized;

use crate::kernels::KernelFn;
use crate::plan::PlanBuilder;
use crate::{BakedConstants, KernelVariant, SpecializationPlan, SpecializeError, StaticFacts};
use model_ir::{graph::Validated, ModelGraph};

pub use generic::GenericStrategy;
pub use specialized::StaticStrategy;

/// Trait for specialization strategies.
///
/// Every strategy resolves the same facts, variants and constants for a
/// graph; strategies differ only in which kernel each unit is bound to.
/// Strategies are purely algorithmic, with no I/O.
pub trait SpecializationStrategy: Send + Sync {
    /// Human-readable name of this strategy.
    fn name(&self) -> &str;

    /// Produces a specialization plan for the given model.
    fn plan(&self, graph: &ModelGraph<Validated>) -> Result<SpecializationPlan, SpecializeError>;
}

/// Looks up a strategy by its configuration name (`"generic"` or `"static"`).
pub fn strategy_by_name(name: &str) -> Option<Box<dyn SpecializationStrategy>> {
    match name {
        "generic" => Some(Box::new(GenericStrategy::new())),
        "static" | "specialized" => Some(Box::new(StaticStrategy::new())),
        _ => None,
    }
}

/// Resolves one unit per node and binds it to the kernel `bind` returns.
pub(crate) fn build_plan(
    strategy: &str,
    graph: &ModelGraph<Validated>,
    bind: impl Fn(&KernelVariant) -> KernelFn,
) -> Result<SpecializationPlan, SpecializeError> {
    if graph.num_nodes() == 0 {
        return Err(SpecializeError::EmptyGraph);
    }

    let mut builder = PlanBuilder::new(strategy, graph.name.clone());
    for node in graph.iter_nodes() {
        let shapes = graph.input_shapes(node);
        let tensor_err = |source| SpecializeError::Tensor {
            node: node.name.clone(),
            source,
        };
        let unsupported = |detail: &str| SpecializeError::UnsupportedOperator {
            node: node.name.clone(),
            op: node.kind().to_string(),
            detail: detail.to_string(),
        };

        let input = shapes
            .first()
            .ok_or_else(|| unsupported("node has no resolved input shape"))?;
        let facts = StaticFacts::resolve(&node.op, input).map_err(tensor_err)?;
        let variant = KernelVariant::select(node.kind(), &facts)
            .ok_or_else(|| unsupported("static facts are incomplete"))?;
        let constants = BakedConstants::resolve(&node.op, &shapes).map_err(tensor_err)?;

        tracing::debug!(node = %node.name, kernel = %variant, "unit planned");
        builder.add_unit(node, facts, variant, constants, bind(&variant));
    }

    let plan = builder.build();
    plan.validate()?;
    tracing::info!(
        strategy,
        units = plan.num_units(),
        specialized = plan.num_specialized(),
        scratch = plan.scratch_len,
        "specialization plan built"
    );
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_by_name() {
        assert_eq!(strategy_by_name("generic").unwrap().name(), "generic");
        assert_eq!(strategy_by_name("static").unwrap().name(), "static");
        assert!(strategy_by_name("fast").is_none());
    }
}
