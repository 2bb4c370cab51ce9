// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Static strategy: binds each unit to its monomorphized kernel.
//!
//! Kernel selection happens once, here. At execution time the engine calls
//! the bound function pointer without inspecting facts again.

use crate::kernels;
use crate::strategy::{build_plan, SpecializationStrategy};
use crate::{SpecializationPlan, SpecializeError};
use model_ir::{graph::Validated, ModelGraph};

/// Binds every unit to the const-generic kernel its variant names.
#[derive(Debug, Clone, Default)]
pub struct StaticStrategy;

impl StaticStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl SpecializationStrategy for StaticStrategy {
    fn name(&self) -> &str {
        "static"
    }

    fn plan(&self, graph: &ModelGraph<Validated>) -> Result<SpecializationPlan, SpecializeError> {
        build_plan(self.name(), graph, kernels::resolve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::small_cnn;
    use crate::KernelVariant;
    use tensor_core::ops::geometry::SpatialRank;

    #[test]
    fn test_static_plan_variants() {
        let graph = small_cnn();
        let plan = StaticStrategy::new().plan(&graph).unwrap();
        assert_eq!(plan.strategy_name, "static");

        let names: Vec<&str> = plan.units.iter().map(|u| u.kernel_name.as_str()).collect();
        assert_eq!(
            names,
            ["conv2d_pad_bias", "relu", "max_pool2d", "flatten", "dense_bias", "softmax"]
        );
        assert_eq!(
            plan.units[0].variant,
            KernelVariant::Conv {
                rank: SpatialRank::TwoD,
                padded: true,
                bias: true,
                grouped: false,
            }
        );
        assert_eq!(plan.num_specialized(), 3);
    }

    #[test]
    fn test_plan_scratch_is_max_over_units() {
        let graph = small_cnn();
        let plan = StaticStrategy::new().plan(&graph).unwrap();
        let max = plan
            .units
            .iter()
            .map(|u| u.constants.scratch_len)
            .max()
            .unwrap();
        assert_eq!(plan.scratch_len, max);
    }

    #[test]
    fn test_plan_matches_graph_nodes() {
        let graph = small_cnn();
        let plan = StaticStrategy::new().plan(&graph).unwrap();
        plan.check_nodes(graph.iter_nodes().collect::<Vec<_>>().into_iter())
            .unwrap();
    }
}
