// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the inference runtime, and the fatal-error boundary.

/// Errors that can occur during inference execution.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The specialization plan is invalid or inconsistent with the model.
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    /// A kernel failed while executing a node.
    #[error("execution error in node '{node}': {source}")]
    ExecutionError {
        node: String,
        #[source]
        source: tensor_core::TensorError,
    },

    /// A network input is missing or does not have its declared shape.
    #[error("input '{name}': {detail}")]
    InputMismatch { name: String, detail: String },

    /// An output differs from its reference beyond the tolerance.
    #[error(
        "output '{output}' differs from reference at element {index}: \
         expected {expected}, got {actual} (tolerance {tolerance})"
    )]
    ReferenceMismatch {
        output: String,
        index: usize,
        expected: f32,
        actual: f32,
        tolerance: f32,
    },

    /// Model loading failed.
    #[error("model error: {0}")]
    ModelError(#[from] model_ir::ModelError),

    /// Plan construction failed.
    #[error("specialization error: {0}")]
    SpecializeError(#[from] specializer::SpecializeError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl RuntimeError {
    /// Whether this error reflects a defect in the model, plan or kernel
    /// wiring rather than in the environment.
    ///
    /// Fatal errors must not be retried; [`abort_on_fatal`] terminates the
    /// process on them. I/O, configuration and reference verdicts are
    /// recoverable and are returned to the caller.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::InvalidPlan(_)
            | Self::ExecutionError { .. }
            | Self::InputMismatch { .. }
            | Self::SpecializeError(_) => true,
            Self::ModelError(e) => !e.is_recoverable(),
            Self::ReferenceMismatch { .. } | Self::ConfigError(_) => false,
        }
    }
}

/// Top-level boundary for runtime results.
///
/// Logs and aborts the process if `result` holds a fatal error; otherwise
/// returns it unchanged.
pub fn abort_on_fatal<T>(result: Result<T, RuntimeError>) -> Result<T, RuntimeError> {
    match result {
        Err(e) if e.is_fatal() => {
            tracing::error!(error = %e, "fatal runtime error, aborting");
            std::process::abort()
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::{Shape, TensorError};

    #[test]
    fn test_execution_error_is_fatal() {
        let e = RuntimeError::ExecutionError {
            node: "conv1".into(),
            source: TensorError::ShapeMismatch {
                op: "conv",
                lhs: Shape::vector(1),
                rhs: Shape::vector(2),
            },
        };
        assert!(e.is_fatal());
        assert!(e.to_string().contains("conv1"));
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(!RuntimeError::ConfigError("bad".into()).is_fatal());
        let io = model_ir::ModelError::ManifestRead(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "gone",
        ));
        assert!(!RuntimeError::from(io).is_fatal());
        let mismatch = RuntimeError::ReferenceMismatch {
            output: "prob".into(),
            index: 3,
            expected: 1.0,
            actual: 2.0,
            tolerance: 1e-3,
        };
        assert!(!mismatch.is_fatal());
    }

    #[test]
    fn test_graph_defect_is_fatal() {
        let e = RuntimeError::from(model_ir::ModelError::InvalidGraph("cycle".into()));
        assert!(e.is_fatal());
    }

    #[test]
    fn test_abort_on_fatal_passes_through_recoverable() {
        let ok: Result<u8, RuntimeError> = Ok(7);
        assert_eq!(abort_on_fatal(ok).unwrap(), 7);
        let r: Result<u8, RuntimeError> = Err(RuntimeError::ConfigError("x".into()));
        assert!(matches!(
            abort_on_fatal(r),
            Err(RuntimeError::ConfigError(_))
        ));
    }
}
