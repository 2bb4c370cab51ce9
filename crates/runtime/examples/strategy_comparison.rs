// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Example: Compare generic and static execution on a synthetic CNN.
//!
//! Demonstrates the core value proposition of the runtime: the static
//! strategy binds a specialized kernel to every convolution, pooling and
//! dense node at plan time, and still produces exactly the same output as
//! the generic kernels.
//!
//! ```bash
//! cargo run -p runtime --example strategy_comparison
//! ```

use model_ir::{graph::Validated, GraphInput, ModelGraph, Node, Operator};
use runtime::{InferenceEngine, RuntimeConfig};
use tensor_core::ops::{ConvAttrs, PoolAttrs};
use tensor_core::{Padding, Shape, Tensor};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing.
    tracing_subscriber::fmt().with_env_filter("info").init();

    let graph = build_graph(16, 32)?;
    println!("{}\n", graph.summary());

    let input = ramp(Shape::nchw(1, 3, 32, 32))?;
    let mut results = Vec::new();

    for mode in ["generic", "static"] {
        let config = RuntimeConfig {
            mode: mode.into(),
            ..Default::default()
        };
        let mut engine = InferenceEngine::new(config)
            .with_graph(graph.clone())?
            .prepare();
        println!("{}", engine.plan().summary());

        // Warm up once, then time a handful of runs.
        engine.run_single(input.clone())?;
        let mut best = std::time::Duration::MAX;
        let mut output = None;
        for _ in 0..10 {
            let out = engine.run_single(input.clone())?;
            best = best.min(out.metrics.total_duration);
            output = Some(out);
        }
        if let Some(out) = output {
            println!("  {}", out.metrics.summary());
            println!("  best of 10: {:.3}ms\n", best.as_secs_f64() * 1000.0);
            results.push((mode, out));
        }
    }

    if let [(_, generic), (_, fast)] = results.as_slice() {
        let same = generic.primary() == fast.primary();
        println!("Outputs bit-identical: {same}");
    }
    Ok(())
}

/// Builds a small VGG-style network with one grouped convolution.
fn build_graph(
    channels: usize,
    size: usize,
) -> Result<ModelGraph<Validated>, Box<dyn std::error::Error>> {
    let conv = |out_c: usize, in_c: usize, groups: usize| Operator::Conv {
        attrs: ConvAttrs {
            padding: Padding::uniform(1),
            groups,
            ..Default::default()
        },
        kernel: Tensor::full(
            Shape::nchw(out_c, in_c / groups, 3, 3),
            1.0 / (9 * in_c) as f32,
        ),
        bias: Some(Tensor::full(Shape::vector(out_c), 0.01)),
    };
    let pool = || Operator::MaxPool {
        attrs: PoolAttrs::square(2),
    };
    let flat = channels * (size / 4) * (size / 4);

    let graph = ModelGraph::new(
        "vgg-like",
        vec![GraphInput::new("data", Shape::nchw(1, 3, size, size))],
        vec![
            Node::new("conv1", conv(channels, 3, 1), "data"),
            Node::new("relu1", Operator::Relu, "conv1"),
            Node::new("pool1", pool(), "relu1"),
            Node::new("conv2", conv(channels, channels, 4), "pool1"),
            Node::new("relu2", Operator::Relu, "conv2"),
            Node::new("pool2", pool(), "relu2"),
            Node::new("flat", Operator::Flatten, "pool2"),
            Node::new(
                "fc",
                Operator::FullyConnected {
                    kernel: Tensor::full(Shape::matrix(10, flat), 1.0 / flat as f32),
                    bias: None,
                },
                "flat",
            ),
            Node::new("prob", Operator::Softmax, "fc"),
        ],
        vec!["prob".into()],
    )
    .validate()?;
    Ok(graph)
}

fn ramp(shape: Shape) -> Result<Tensor, tensor_core::TensorError> {
    let data = (0..shape.num_elements())
        .map(|i| (i % 17) as f32 / 17.0 - 0.5)
        .collect();
    Tensor::from_vec(shape, data)
}
