// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `edge-cnn run` command: execute inference on tensors from a file.
//!
//! Demonstrates the full type-state pipeline:
//! ```text
//! InferenceEngine<Idle> → load_model → <Planned> → prepare → <Ready> → run
//! ```
//!
//! Every runtime result passes through [`runtime::abort_on_fatal`]: model,
//! plan and kernel defects abort the process, while missing files and
//! reference mismatches are reported as ordinary errors.

use anyhow::Context;
use runtime::{abort_on_fatal, compare_with_reference, InferenceEngine, RuntimeConfig};
use std::collections::HashMap;
use std::path::PathBuf;
use tensor_core::Tensor;

pub fn execute(
    config: RuntimeConfig,
    input: PathBuf,
    reference: Option<PathBuf>,
    save: Option<PathBuf>,
) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║            edge-cnn · Inference Runner               ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    println!("  Config:");
    println!("   Model:     {}", config.model_path.display());
    println!("   Mode:      {}", config.mode);
    println!("   Input:     {}", input.display());
    if let Some(r) = &reference {
        println!("   Reference: {} (tolerance {})", r.display(), config.reference_tolerance);
    }
    println!();

    let tolerance = config.reference_tolerance;

    // ── Type-State Pipeline ────────────────────────────────────
    //
    // Step 1: Idle → Planned (load model + build specialization plan).
    println!("  [1/3] Loading model and building specialization plan...");
    let planned = abort_on_fatal(InferenceEngine::new(config).load_model())
        .context("failed to load model")?;
    println!("        {}", planned.graph().summary());
    println!(
        "        {} of {} nodes specialized",
        planned.plan().num_specialized(),
        planned.plan().num_units()
    );
    println!();

    // Step 2: Planned → Ready (allocate scratch, compute value lifetimes).
    println!("  [2/3] Preparing engine...");
    let mut ready = planned.prepare();
    println!();

    // Step 3: Ready → Run.
    println!("  [3/3] Running inference...");
    let tensors = model_ir::read_tensor_file(&input)
        .with_context(|| format!("failed to read inputs from '{}'", input.display()))?;
    let inputs = bind_inputs(ready.graph(), tensors);
    let output = abort_on_fatal(ready.run(inputs))?;
    println!();

    println!("  Outputs:");
    for (name, tensor) in &output.outputs {
        print_output(name, tensor);
    }
    println!();
    println!("  Metrics:");
    println!("   {}", output.metrics.summary());
    println!();

    if let Some(path) = save {
        let entries: Vec<(&str, &Tensor)> = output
            .outputs
            .iter()
            .map(|(n, t)| (n.as_str(), t))
            .collect();
        model_ir::write_tensor_file(&path, &entries)
            .with_context(|| format!("failed to write outputs to '{}'", path.display()))?;
        println!("  Outputs written to {}", path.display());
    }

    if let Some(path) = reference {
        let expected = model_ir::read_tensor_file(&path)
            .with_context(|| format!("failed to read reference '{}'", path.display()))?;
        let report = abort_on_fatal(compare_with_reference(&output.outputs, &expected, tolerance))?;
        println!(
            "  Reference check passed: {} output(s), max |diff| {:.3e} (tolerance {})",
            report.compared.len(),
            report.max_abs_diff(),
            report.tolerance
        );
    }

    Ok(())
}

/// Names the tensors of an input file after the graph inputs.
///
/// A file holding one tensor feeds a single-input graph whatever the
/// tensor is called. Otherwise tensors are matched by name and the engine
/// reports anything missing.
fn bind_inputs(
    graph: &model_ir::ModelGraph<model_ir::graph::Validated>,
    mut tensors: HashMap<String, Tensor>,
) -> HashMap<String, Tensor> {
    if let ([declared], 1) = (graph.inputs.as_slice(), tensors.len()) {
        if !tensors.contains_key(&declared.name) {
            if let Some((stored, tensor)) = tensors.drain().next() {
                tracing::info!(stored = %stored, input = %declared.name, "binding sole tensor to graph input");
                return HashMap::from([(declared.name.clone(), tensor)]);
            }
        }
    }
    tensors
}

fn print_output(name: &str, tensor: &Tensor) {
    let values = tensor.as_slice();
    let head: Vec<String> = values.iter().take(10).map(|v| format!("{v:.5}")).collect();
    println!(
        "   {:<16} {} [{}{}]",
        super::truncate(name, 16),
        tensor.shape(),
        head.join(", "),
        if values.len() > 10 { ", ..." } else { "" }
    );
    let best = values
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1));
    if let Some((index, value)) = best {
        println!("   {:<16} argmax {index} ({value:.5})", "");
    }
}
