// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `edge-cnn inspect` command: display model structure and kernel selection.
//!
//! Loads the manifest and weights, then prints every node with its output
//! shape, parameter size and the kernel the static strategy binds to it.

use anyhow::Context;
use runtime::RuntimeConfig;
use specializer::{SpecializationStrategy, StaticStrategy};

pub fn execute(config: RuntimeConfig) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║              edge-cnn · Model Inspector              ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let model = &config.model_path;
    let graph = model_ir::ModelLoader::load(model)
        .with_context(|| format!("failed to load model from '{}'", model.display()))?;
    let plan = StaticStrategy::new()
        .plan(&graph)
        .context("failed to build specialization plan")?;

    // ── Summary ────────────────────────────────────────────────
    println!("  Model: {}", graph.name);
    for input in &graph.inputs {
        println!("  Input: {} {}", input.name, input.shape);
    }
    println!("  Outputs: {}", graph.outputs.join(", "));
    println!("  Nodes: {}", graph.num_nodes());
    println!(
        "  Total weights: {:.1} KB",
        graph.total_weight_bytes() as f64 / 1024.0
    );
    println!(
        "  Largest activation: {:.1} KB",
        graph.max_activation_bytes() as f64 / 1024.0
    );
    println!("  Scratch: {} elements", plan.scratch_len);
    println!();

    // ── Per-Node Detail ────────────────────────────────────────
    println!(
        "  {:<4} {:<20} {:<16} {:<18} {:>10}  {}",
        "Idx", "Name", "Op", "Output", "Weights", "Kernel",
    );
    println!("  {}", "-".repeat(92));

    for (node, unit) in graph.iter_nodes().zip(&plan.units) {
        let shape = graph
            .output_shape(node)
            .map(ToString::to_string)
            .unwrap_or_else(|| "?".into());
        println!(
            "  {:<4} {:<20} {:<16} {:<18} {:>7.1} KB  {}",
            node.id,
            super::truncate(&node.name, 20),
            node.kind().as_str(),
            shape,
            node.op.weight_bytes() as f64 / 1024.0,
            unit.kernel_name,
        );
    }
    println!();
    println!(
        "  {} of {} nodes run a specialized kernel.",
        plan.num_specialized(),
        plan.num_units()
    );
    println!();
    Ok(())
}
