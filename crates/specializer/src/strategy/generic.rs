// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Generic strategy.
//!
//! Resolves facts, variants and constants like any other strategy, but binds
//! every unit to the operator's generic kernel. This is the reference path
//! that specialized execution is compared against.

use crate::kernels;
use crate::strategy::{build_plan, SpecializationStrategy};
use crate::{SpecializationPlan, SpecializeError};
use model_ir::{graph::Validated, ModelGraph};

/// Runs every node through its generic kernel.
#[derive(Debug, Clone, Default)]
pub struct GenericStrategy;

impl GenericStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl SpecializationStrategy for GenericStrategy {
    fn name(&self) -> &str {
        "generic"
    }

    fn plan(&self, graph: &ModelGraph<Validated>) -> Result<SpecializationPlan, SpecializeError> {
        build_plan(self.name(), graph, |_| kernels::generic)
    }
}
