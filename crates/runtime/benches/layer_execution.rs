// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for per-layer kernels and whole-network runs, generic
//! against specialized.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use model_ir::{graph::Validated, GraphInput, ModelGraph, Node, Operator};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use runtime::{InferenceEngine, RuntimeConfig};
use specializer::{kernels, BakedConstants, KernelVariant, StaticFacts};
use tensor_core::ops::{ConvAttrs, PoolAttrs};
use tensor_core::{Padding, Shape, Tensor};

fn random_tensor(rng: &mut StdRng, shape: Shape) -> Tensor {
    let data = (0..shape.num_elements())
        .map(|_| rng.gen_range(-1.0f32..1.0))
        .collect();
    Tensor::from_vec(shape, data).unwrap()
}

fn layer_cases(rng: &mut StdRng) -> Vec<(&'static str, Operator, Tensor)> {
    let input = random_tensor(rng, Shape::nchw(1, 16, 32, 32));
    vec![
        (
            "conv3x3_pad_bias",
            Operator::Conv {
                attrs: ConvAttrs {
                    padding: Padding::uniform(1),
                    ..Default::default()
                },
                kernel: random_tensor(rng, Shape::nchw(16, 16, 3, 3)),
                bias: Some(random_tensor(rng, Shape::vector(16))),
            },
            input.clone(),
        ),
        (
            "conv3x3_depthwise",
            Operator::Conv {
                attrs: ConvAttrs {
                    groups: 16,
                    ..Default::default()
                },
                kernel: random_tensor(rng, Shape::nchw(16, 1, 3, 3)),
                bias: None,
            },
            input.clone(),
        ),
        (
            "max_pool2x2",
            Operator::MaxPool {
                attrs: PoolAttrs::square(2),
            },
            input.clone(),
        ),
        (
            "avg_pool3x3_pad",
            Operator::AvgPool {
                attrs: PoolAttrs {
                    kernel: (3, 3),
                    stride: (1, 1),
                    padding: Padding::uniform(1),
                },
                count_include_pad: false,
                bias: None,
            },
            input,
        ),
        (
            "dense_bias",
            Operator::FullyConnected {
                kernel: random_tensor(rng, Shape::matrix(64, 256)),
                bias: Some(random_tensor(rng, Shape::vector(64))),
            },
            random_tensor(rng, Shape::matrix(1, 256)),
        ),
    ]
}

fn bench_single_layer_execution(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let mut group = c.benchmark_group("layer");

    for (name, op, input) in layer_cases(&mut rng) {
        let facts = StaticFacts::resolve(&op, input.shape()).unwrap();
        let variant = KernelVariant::select(op.kind(), &facts).unwrap();
        let constants = BakedConstants::resolve(&op, &[input.shape()]).unwrap();
        let mut scratch = vec![0.0; constants.scratch_len];
        let mut output = Tensor::zeros(constants.output_shape.clone());

        group.bench_function(BenchmarkId::new("generic", name), |b| {
            b.iter(|| {
                op.run(&[input.view()], &mut scratch, &mut output).unwrap();
                black_box(output.as_slice());
            })
        });

        let kernel = kernels::resolve(&variant);
        group.bench_function(BenchmarkId::new(variant.name(), name), |b| {
            b.iter(|| {
                kernel(&op, &constants, &[input.view()], &mut scratch, &mut output).unwrap();
                black_box(output.as_slice());
            })
        });
    }
    group.finish();
}

/// conv → relu → pool → conv → relu → pool → flatten → fc → softmax.
fn lenet_like(rng: &mut StdRng) -> ModelGraph<Validated> {
    let conv = |rng: &mut StdRng, out_c, in_c| Operator::Conv {
        attrs: ConvAttrs {
            padding: Padding::uniform(2),
            ..Default::default()
        },
        kernel: random_tensor(rng, Shape::nchw(out_c, in_c, 5, 5)),
        bias: Some(random_tensor(rng, Shape::vector(out_c))),
    };
    let pool = || Operator::MaxPool {
        attrs: PoolAttrs::square(2),
    };
    ModelGraph::new(
        "lenet-like",
        vec![GraphInput::new("data", Shape::nchw(1, 1, 28, 28))],
        vec![
            Node::new("conv1", conv(rng, 8, 1), "data"),
            Node::new("relu1", Operator::Relu, "conv1"),
            Node::new("pool1", pool(), "relu1"),
            Node::new("conv2", conv(rng, 16, 8), "pool1"),
            Node::new("relu2", Operator::Relu, "conv2"),
            Node::new("pool2", pool(), "relu2"),
            Node::new("flat", Operator::Flatten, "pool2"),
            Node::new(
                "fc",
                Operator::FullyConnected {
                    kernel: random_tensor(rng, Shape::matrix(10, 16 * 7 * 7)),
                    bias: Some(random_tensor(rng, Shape::vector(10))),
                },
                "flat",
            ),
            Node::new("prob", Operator::Softmax, "fc"),
        ],
        vec!["prob".into()],
    )
    .validate()
    .unwrap()
}

fn bench_network_execution(c: &mut Criterion) {
    let mut group = c.benchmark_group("network");

    for mode in ["generic", "static"] {
        let mut rng = StdRng::seed_from_u64(7);
        let graph = lenet_like(&mut rng);
        let input = random_tensor(&mut rng, Shape::nchw(1, 1, 28, 28));
        let config = RuntimeConfig {
            mode: mode.into(),
            enable_profiling: false,
            ..Default::default()
        };
        let mut engine = InferenceEngine::new(config)
            .with_graph(graph)
            .unwrap()
            .prepare();

        group.bench_function(BenchmarkId::new("lenet_like", mode), |b| {
            b.iter(|| black_box(engine.run_single(input.clone()).unwrap()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_single_layer_execution, bench_network_execution);
criterion_main!(benches);
