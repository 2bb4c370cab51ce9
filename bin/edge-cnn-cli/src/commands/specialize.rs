// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `edge-cnn specialize` command: emit the specialization plan as JSON.
//!
//! The JSON lists, per node, the resolved static facts, the selected
//! kernel variant and every baked constant. An external code generator
//! can consume it without linking this crate.

use anyhow::Context;
use runtime::{abort_on_fatal, InferenceEngine, RuntimeConfig};
use std::path::PathBuf;

pub fn execute(config: RuntimeConfig, out: Option<PathBuf>) -> anyhow::Result<()> {
    let planned = abort_on_fatal(InferenceEngine::new(config).load_model())
        .context("failed to plan model")?;
    let plan = planned.plan();
    let json = serde_json::to_string_pretty(plan).context("failed to serialise plan")?;

    match out {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("failed to write '{}'", path.display()))?;
            tracing::info!(path = %path.display(), units = plan.num_units(), "plan written");
            eprintln!(
                "Wrote {} units ({} specialized) to {}",
                plan.num_units(),
                plan.num_specialized(),
                path.display()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}
