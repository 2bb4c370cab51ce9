// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Inference profiling metrics.
//!
//! [`InferenceMetrics`] collects per-node timing and the peak activation
//! footprint of a run. Comparing the metrics of a `generic` and a `static`
//! run of the same model shows what specialization buys.

use std::time::Duration;

/// Metrics for a single node's execution.
#[derive(Debug, Clone, serde::Serialize)]
pub struct NodeMetrics {
    pub node_name: String,
    /// Name of the kernel variant that ran.
    pub kernel: String,
    /// Time spent in the kernel.
    pub compute_duration: Duration,
    /// Size of the node's output tensor in bytes.
    pub output_bytes: usize,
}

/// Aggregate metrics for a complete inference run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct InferenceMetrics {
    /// Strategy the plan was built with.
    pub strategy: String,
    /// Total wall-clock time for the inference run.
    pub total_duration: Duration,
    /// Total time spent inside kernels.
    pub total_compute_duration: Duration,
    /// Largest sum of live activation bytes at any point of the run.
    pub peak_live_bytes: usize,
    /// Per-node metrics, empty unless profiling is enabled.
    pub node_metrics: Vec<NodeMetrics>,
    /// Number of nodes executed.
    pub nodes_executed: usize,
}

impl InferenceMetrics {
    /// Creates an empty metrics container.
    pub fn new(strategy: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            total_duration: Duration::ZERO,
            total_compute_duration: Duration::ZERO,
            peak_live_bytes: 0,
            node_metrics: Vec::new(),
            nodes_executed: 0,
        }
    }

    /// Records one executed node. Per-node detail is kept only when
    /// `detailed` is set.
    pub fn record_node(
        &mut self,
        name: &str,
        kernel: &str,
        compute: Duration,
        output_bytes: usize,
        detailed: bool,
    ) {
        self.total_compute_duration += compute;
        self.nodes_executed += 1;
        if detailed {
            self.node_metrics.push(NodeMetrics {
                node_name: name.to_string(),
                kernel: kernel.to_string(),
                compute_duration: compute,
                output_bytes,
            });
        }
    }

    /// Tracks the live activation footprint.
    pub fn observe_live_bytes(&mut self, live: usize) {
        self.peak_live_bytes = self.peak_live_bytes.max(live);
    }

    /// Finalises metrics with the total wall-clock time.
    pub fn finalise(&mut self, total: Duration) {
        self.total_duration = total;
    }

    /// The node with the longest compute time, if profiled.
    pub fn slowest_node(&self) -> Option<&NodeMetrics> {
        self.node_metrics.iter().max_by_key(|m| m.compute_duration)
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        let peak_kb = self.peak_live_bytes as f64 / 1024.0;
        let mut s = format!(
            "Inference ({}): {:.3}ms total, {} nodes, {:.3}ms in kernels, peak {:.1} KB live",
            self.strategy,
            self.total_duration.as_secs_f64() * 1000.0,
            self.nodes_executed,
            self.total_compute_duration.as_secs_f64() * 1000.0,
            peak_kb,
        );
        if let Some(slow) = self.slowest_node() {
            s.push_str(&format!(
                ", slowest '{}' [{}] {:.3}ms",
                slow.node_name,
                slow.kernel,
                slow.compute_duration.as_secs_f64() * 1000.0
            ));
        }
        s
    }
}
