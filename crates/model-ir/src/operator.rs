// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The closed set of operators a graph node can perform.
//!
//! Each [`Operator`] variant carries its scalar attributes and exclusively
//! owns its parameter tensors. Dispatch is a single `match` in
//! [`Operator::run`]; there are no trait objects.

use tensor_core::ops::{self, BatchNormParams, ConvAttrs, ConvLayout, LrnAttrs, PoolAttrs};
use tensor_core::{Padding, Shape, Tensor, TensorError, TensorView};

// ── OpKind ─────────────────────────────────────────────────────────

/// The kind of computation an operator performs, without its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Conv,
    MaxPool,
    AvgPool,
    GlobalAvgPool,
    GlobalMaxPool,
    FullyConnected,
    BatchNorm,
    Identity,
    Relu,
    LeakyRelu,
    #[serde(rename = "prelu")]
    PRelu,
    Clip,
    Sigmoid,
    Tanh,
    Softmax,
    Lrn,
    Add,
    Concat,
    Flatten,
    Pad,
}

impl OpKind {
    /// Parses an op kind from a manifest string.
    ///
    /// Case and underscores are ignored, and common ONNX-style aliases
    /// (`"Gemm"`, `"AveragePool"`, `"BatchNormalization"`) are accepted.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        let key: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "conv" | "convolution" | "conv1d" | "conv2d" => Some(Self::Conv),
            "maxpool" | "maxpooling" => Some(Self::MaxPool),
            "avgpool" | "averagepool" | "averagepooling" => Some(Self::AvgPool),
            "globalavgpool" | "globalaveragepool" => Some(Self::GlobalAvgPool),
            "globalmaxpool" => Some(Self::GlobalMaxPool),
            "fullyconnected" | "fc" | "gemm" | "dense" | "linear" => Some(Self::FullyConnected),
            "batchnorm" | "batchnormalization" | "bn" => Some(Self::BatchNorm),
            "identity" | "dropout" => Some(Self::Identity),
            "relu" => Some(Self::Relu),
            "leakyrelu" => Some(Self::LeakyRelu),
            "prelu" | "parameterizedrelu" => Some(Self::PRelu),
            "clip" => Some(Self::Clip),
            "sigmoid" => Some(Self::Sigmoid),
            "tanh" => Some(Self::Tanh),
            "softmax" => Some(Self::Softmax),
            "lrn" | "localresponsenormalization" => Some(Self::Lrn),
            "add" | "sum" => Some(Self::Add),
            "concat" | "concatenate" => Some(Self::Concat),
            "flatten" => Some(Self::Flatten),
            "pad" => Some(Self::Pad),
            _ => None,
        }
    }

    /// Returns the canonical snake_case label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conv => "conv",
            Self::MaxPool => "max_pool",
            Self::AvgPool => "avg_pool",
            Self::GlobalAvgPool => "global_avg_pool",
            Self::GlobalMaxPool => "global_max_pool",
            Self::FullyConnected => "fully_connected",
            Self::BatchNorm => "batch_norm",
            Self::Identity => "identity",
            Self::Relu => "relu",
            Self::LeakyRelu => "leaky_relu",
            Self::PRelu => "prelu",
            Self::Clip => "clip",
            Self::Sigmoid => "sigmoid",
            Self::Tanh => "tanh",
            Self::Softmax => "softmax",
            Self::Lrn => "lrn",
            Self::Add => "add",
            Self::Concat => "concat",
            Self::Flatten => "flatten",
            Self::Pad => "pad",
        }
    }
}

impl std::fmt::Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Operator ───────────────────────────────────────────────────────

/// A fully parameterized operator instance.
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    Conv {
        attrs: ConvAttrs,
        kernel: Tensor,
        bias: Option<Tensor>,
    },
    MaxPool {
        attrs: PoolAttrs,
    },
    AvgPool {
        attrs: PoolAttrs,
        count_include_pad: bool,
        bias: Option<Tensor>,
    },
    GlobalAvgPool,
    GlobalMaxPool,
    FullyConnected {
        kernel: Tensor,
        bias: Option<Tensor>,
    },
    BatchNorm {
        gamma: Tensor,
        beta: Tensor,
        mean: Tensor,
        variance: Tensor,
        epsilon: f32,
    },
    Identity,
    Relu,
    LeakyRelu {
        alpha: f32,
    },
    PRelu {
        slope: Tensor,
    },
    Clip {
        low: f32,
        high: f32,
    },
    Sigmoid,
    Tanh,
    Softmax,
    Lrn {
        attrs: LrnAttrs,
    },
    Add,
    Concat {
        axis: usize,
    },
    Flatten,
    Pad {
        padding: Padding,
        value: f32,
    },
}

impl Operator {
    pub fn kind(&self) -> OpKind {
        match self {
            Self::Conv { .. } => OpKind::Conv,
            Self::MaxPool { .. } => OpKind::MaxPool,
            Self::AvgPool { .. } => OpKind::AvgPool,
            Self::GlobalAvgPool => OpKind::GlobalAvgPool,
            Self::GlobalMaxPool => OpKind::GlobalMaxPool,
            Self::FullyConnected { .. } => OpKind::FullyConnected,
            Self::BatchNorm { .. } => OpKind::BatchNorm,
            Self::Identity => OpKind::Identity,
            Self::Relu => OpKind::Relu,
            Self::LeakyRelu { .. } => OpKind::LeakyRelu,
            Self::PRelu { .. } => OpKind::PRelu,
            Self::Clip { .. } => OpKind::Clip,
            Self::Sigmoid => OpKind::Sigmoid,
            Self::Tanh => OpKind::Tanh,
            Self::Softmax => OpKind::Softmax,
            Self::Lrn { .. } => OpKind::Lrn,
            Self::Add => OpKind::Add,
            Self::Concat { .. } => OpKind::Concat,
            Self::Flatten => OpKind::Flatten,
            Self::Pad { .. } => OpKind::Pad,
        }
    }

    /// Number of activation inputs: `(min, max)`. `Concat` is variadic.
    pub fn arity(&self) -> (usize, usize) {
        match self {
            Self::Add => (2, 2),
            Self::Concat { .. } => (1, usize::MAX),
            _ => (1, 1),
        }
    }

    /// Parameter tensors owned by this operator, with their roles.
    pub fn parameters(&self) -> Vec<(&'static str, &Tensor)> {
        let mut params = Vec::new();
        match self {
            Self::Conv { kernel, bias, .. } | Self::FullyConnected { kernel, bias } => {
                params.push(("kernel", kernel));
                if let Some(b) = bias {
                    params.push(("bias", b));
                }
            }
            Self::AvgPool { bias: Some(b), .. } => params.push(("bias", b)),
            Self::BatchNorm {
                gamma,
                beta,
                mean,
                variance,
                ..
            } => {
                params.push(("gamma", gamma));
                params.push(("beta", beta));
                params.push(("mean", mean));
                params.push(("variance", variance));
            }
            Self::PRelu { slope } => params.push(("slope", slope)),
            _ => {}
        }
        params
    }

    /// Bytes held by parameter tensors.
    pub fn weight_bytes(&self) -> usize {
        self.parameters()
            .iter()
            .map(|(_, t)| t.shape().num_elements() * std::mem::size_of::<f32>())
            .sum()
    }

    fn check_arity(&self, n: usize) -> Result<(), TensorError> {
        let (min, max) = self.arity();
        if n < min || n > max {
            return Err(TensorError::InvalidAttribute {
                op: self.kind().as_str(),
                detail: format!("expected {min}..={max} inputs, got {n}"),
            });
        }
        Ok(())
    }

    /// Infers the output shape from the input shapes.
    pub fn output_shape(&self, inputs: &[&Shape]) -> Result<Shape, TensorError> {
        self.check_arity(inputs.len())?;
        let x = inputs[0];
        match self {
            Self::Conv {
                attrs,
                kernel,
                bias,
            } => ConvLayout::resolve(x, kernel.shape(), bias.as_ref().map(|b| b.shape()), attrs)
                .map(|l| l.output_shape),
            Self::MaxPool { attrs } | Self::AvgPool { attrs, .. } => {
                ops::pool_output_shape(x, attrs)
            }
            Self::GlobalAvgPool | Self::GlobalMaxPool => ops::global_pool_output_shape(x),
            Self::FullyConnected { kernel, .. } => {
                ops::fully_connected_output_shape(x, kernel.shape())
            }
            Self::Softmax => {
                require_rank("softmax", x, &[2])?;
                Ok(x.clone())
            }
            Self::BatchNorm { .. } => {
                require_rank("batch_norm", x, &[2, 3, 4])?;
                Ok(x.clone())
            }
            Self::Lrn { .. } => {
                require_rank("lrn", x, &[3, 4])?;
                Ok(x.clone())
            }
            Self::PRelu { slope } => {
                if slope.shape() != x {
                    return Err(TensorError::ShapeMismatch {
                        op: "prelu",
                        lhs: x.clone(),
                        rhs: slope.shape().clone(),
                    });
                }
                Ok(x.clone())
            }
            Self::Identity
            | Self::Relu
            | Self::LeakyRelu { .. }
            | Self::Clip { .. }
            | Self::Sigmoid
            | Self::Tanh => Ok(x.clone()),
            Self::Add => {
                if inputs[1] != x {
                    return Err(TensorError::ShapeMismatch {
                        op: "add",
                        lhs: x.clone(),
                        rhs: inputs[1].clone(),
                    });
                }
                Ok(x.clone())
            }
            Self::Concat { axis } => Shape::concatenate(inputs, *axis),
            Self::Flatten => Ok(ops::flatten_output_shape(x)),
            Self::Pad { padding, .. } => x.expand_with_padding(padding),
        }
    }

    /// Scratch elements [`run`](Self::run) needs for these input shapes.
    pub fn scratch_len(&self, inputs: &[&Shape]) -> Result<usize, TensorError> {
        match self {
            Self::Conv {
                attrs,
                kernel,
                bias,
            } => {
                self.check_arity(inputs.len())?;
                ConvLayout::resolve(
                    inputs[0],
                    kernel.shape(),
                    bias.as_ref().map(|b| b.shape()),
                    attrs,
                )
                .map(|l| l.scratch_len())
            }
            _ => Ok(0),
        }
    }

    /// Executes the operator. `output` must already have the inferred shape.
    ///
    /// Repeated calls with the same inputs produce identical outputs.
    pub fn run(
        &self,
        inputs: &[TensorView<'_>],
        scratch: &mut [f32],
        output: &mut Tensor,
    ) -> Result<(), TensorError> {
        self.check_arity(inputs.len())?;
        let x = &inputs[0];
        match self {
            Self::Conv {
                attrs,
                kernel,
                bias,
            } => {
                let bias = bias.as_ref().map(|b| b.view());
                ops::conv(x, &kernel.view(), bias.as_ref(), attrs, scratch, output)
            }
            Self::MaxPool { attrs } => ops::max_pool(x, attrs, output),
            Self::AvgPool {
                attrs,
                count_include_pad,
                bias,
            } => {
                let bias = bias.as_ref().map(|b| b.view());
                ops::avg_pool(x, attrs, *count_include_pad, bias.as_ref(), output)
            }
            Self::GlobalAvgPool => ops::global_avg_pool(x, output),
            Self::GlobalMaxPool => ops::global_max_pool(x, output),
            Self::FullyConnected { kernel, bias } => {
                let bias = bias.as_ref().map(|b| b.view());
                ops::fully_connected(x, &kernel.view(), bias.as_ref(), output)
            }
            Self::BatchNorm {
                gamma,
                beta,
                mean,
                variance,
                epsilon,
            } => {
                let params = BatchNormParams {
                    gamma: gamma.as_slice(),
                    beta: beta.as_slice(),
                    mean: mean.as_slice(),
                    variance: variance.as_slice(),
                    epsilon: *epsilon,
                };
                ops::batch_norm(x, &params, output)
            }
            Self::Identity => ops::identity(x, output),
            Self::Relu => ops::relu(x, output),
            Self::LeakyRelu { alpha } => ops::leaky_relu(x, *alpha, output),
            Self::PRelu { slope } => ops::prelu(x, &slope.view(), output),
            Self::Clip { low, high } => ops::clip(x, *low, *high, output),
            Self::Sigmoid => ops::sigmoid(x, output),
            Self::Tanh => ops::tanh(x, output),
            Self::Softmax => ops::softmax(x, output),
            Self::Lrn { attrs } => ops::lrn(x, attrs, output),
            Self::Add => ops::add(x, &inputs[1], output),
            Self::Concat { axis } => {
                let refs: Vec<&TensorView<'_>> = inputs.iter().collect();
                output.concatenate_from(&refs, *axis)
            }
            Self::Flatten => ops::flatten(x, output),
            Self::Pad { padding, value } => ops::pad(x, padding, *value, output),
        }
    }
}

fn require_rank(op: &'static str, shape: &Shape, allowed: &'static [usize]) -> Result<(), TensorError> {
    if allowed.contains(&shape.rank()) {
        return Ok(());
    }
    let expected = match allowed {
        [2] => "2",
        [3, 4] => "3 or 4",
        _ => "2, 3 or 4",
    };
    Err(TensorError::UnsupportedRank {
        op,
        expected,
        actual: shape.rank(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conv_op(bias: bool) -> Operator {
        Operator::Conv {
            attrs: ConvAttrs {
                padding: Padding::uniform(1),
                ..Default::default()
            },
            kernel: Tensor::full(Shape::nchw(2, 3, 3, 3), 1.0),
            bias: bias.then(|| Tensor::zeros(Shape::vector(2))),
        }
    }

    #[test]
    fn test_op_kind_from_str() {
        assert_eq!(OpKind::from_str_loose("Conv"), Some(OpKind::Conv));
        assert_eq!(OpKind::from_str_loose("AveragePool"), Some(OpKind::AvgPool));
        assert_eq!(OpKind::from_str_loose("max_pool"), Some(OpKind::MaxPool));
        assert_eq!(OpKind::from_str_loose("Gemm"), Some(OpKind::FullyConnected));
        assert_eq!(
            OpKind::from_str_loose("BatchNormalization"),
            Some(OpKind::BatchNorm)
        );
        assert_eq!(OpKind::from_str_loose("GlobalAveragePool"), Some(OpKind::GlobalAvgPool));
        assert_eq!(OpKind::from_str_loose("attention"), None);
    }

    #[test]
    fn test_op_kind_display_roundtrip() {
        for kind in [OpKind::Conv, OpKind::GlobalMaxPool, OpKind::PRelu, OpKind::Lrn] {
            assert_eq!(OpKind::from_str_loose(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_conv_output_shape_and_scratch() {
        let op = conv_op(true);
        let input = Shape::nchw(1, 3, 8, 8);
        assert_eq!(op.output_shape(&[&input]).unwrap(), Shape::nchw(1, 2, 8, 8));
        assert_eq!(op.scratch_len(&[&input]).unwrap(), 64);
        assert_eq!(op.parameters().len(), 2);
        assert_eq!(conv_op(false).parameters().len(), 1);
    }

    #[test]
    fn test_run_is_stateless() {
        let op = conv_op(true);
        let data: Vec<f32> = (0..3 * 16).map(|i| (i % 5) as f32 - 2.0).collect();
        let input = Tensor::from_vec(Shape::nchw(1, 3, 4, 4), data).unwrap();
        let shape = op.output_shape(&[input.shape()]).unwrap();
        let mut scratch = vec![0.0; op.scratch_len(&[input.shape()]).unwrap()];

        let mut first = Tensor::zeros(shape.clone());
        op.run(&[input.view()], &mut scratch, &mut first).unwrap();
        let mut second = Tensor::zeros(shape);
        op.run(&[input.view()], &mut scratch, &mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_arity_checked() {
        let a = Tensor::zeros(Shape::matrix(1, 2));
        let mut out = Tensor::zeros(Shape::matrix(1, 2));
        let r = Operator::Add.run(&[a.view()], &mut [], &mut out);
        assert!(matches!(r, Err(TensorError::InvalidAttribute { .. })));
    }

    #[test]
    fn test_concat_output_shape() {
        let op = Operator::Concat { axis: 1 };
        let a = Shape::nchw(1, 2, 3, 3);
        let b = Shape::nchw(1, 4, 3, 3);
        assert_eq!(op.output_shape(&[&a, &b]).unwrap(), Shape::nchw(1, 6, 3, 3));
    }

    #[test]
    fn test_softmax_rank_checked_at_inference() {
        let r = Operator::Softmax.output_shape(&[&Shape::nchw(1, 10, 1, 1)]);
        assert!(matches!(r, Err(TensorError::UnsupportedRank { .. })));
    }

    #[test]
    fn test_pad_shape_inference() {
        let op = |padding| Operator::Pad { padding, value: 0.0 };
        assert_eq!(
            op(Padding::uniform(1))
                .output_shape(&[&Shape::new(vec![1, 1, 2, 2, 2])])
                .unwrap(),
            Shape::new(vec![1, 1, 2, 4, 4])
        );
        let r = op(Padding::new(2, 0, 2, 0)).output_shape(&[&Shape::ncw(1, 1, 3)]);
        assert!(matches!(r, Err(TensorError::InvalidAttribute { op: "pad", .. })));
        let r = op(Padding::uniform(1)).output_shape(&[&Shape::matrix(1, 3)]);
        assert!(matches!(r, Err(TensorError::UnsupportedRank { .. })));
    }

    #[test]
    fn test_weight_bytes() {
        let op = conv_op(true);
        assert_eq!(op.weight_bytes(), (2 * 3 * 3 * 3 + 2) * 4);
    }
}
