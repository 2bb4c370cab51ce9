// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # specializer
//!
//! The static specialization contract. For every node of a validated
//! `ModelGraph` this crate:
//!
//! 1. resolves its [`StaticFacts`] (padding, bias, grouping, spatial rank,
//!    average-pool divisor mode),
//! 2. selects exactly one [`KernelVariant`] from a closed menu,
//! 3. bakes every shape-derived value into [`BakedConstants`], and
//! 4. binds a kernel function once, at plan time.
//!
//! The resulting [`SpecializationPlan`] is both executable (each unit holds
//! a monomorphized function pointer) and serializable, so it can be handed
//! to an external code generator as JSON.
//!
//! # Strategies
//!
//! | Strategy | Kernel bound to each unit |
//! |---|---|
//! | [`GenericStrategy`] | The operator's generic kernel |
//! | [`StaticStrategy`] | The const-generic kernel named by the variant |
//!
//! Specialization changes code shape, never results: both strategies
//! produce bit-identical outputs.
//!
//! # Example
//! ```no_run
//! use model_ir::ModelLoader;
//! use specializer::{SpecializationStrategy, StaticStrategy};
//! use std::path::Path;
//!
//! let graph = ModelLoader::load(Path::new("./models/lenet")).unwrap();
//! let plan = StaticStrategy::new().plan(&graph).unwrap();
//! println!("{}", plan.summary());
//! ```

mod constants;
mod error;
mod facts;
pub mod kernels;
mod plan;
pub mod strategy;
mod variant;

pub use constants::BakedConstants;
pub use error::SpecializeError;
pub use facts::StaticFacts;
pub use kernels::KernelFn;
pub use plan::{PlanBuilder, SpecializationPlan, SpecializedUnit};
pub use strategy::{strategy_by_name, GenericStrategy, SpecializationStrategy, StaticStrategy};
pub use variant::KernelVariant;
