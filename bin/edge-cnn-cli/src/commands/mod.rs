// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommand implementations and shared setup.

pub mod inspect;
pub mod run;
pub mod specialize;

use anyhow::Context;
use runtime::RuntimeConfig;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Installs the global `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level follows the `-v` count.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Reads the TOML config if one was given, else the defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<RuntimeConfig> {
    match path {
        Some(p) => RuntimeConfig::from_file(p)
            .with_context(|| format!("failed to load config '{}'", p.display())),
        None => Ok(RuntimeConfig::default()),
    }
}

/// Applies command-line flags on top of the loaded configuration.
pub fn override_config(
    mut config: RuntimeConfig,
    model: Option<PathBuf>,
    mode: Option<String>,
    tolerance: Option<f32>,
) -> RuntimeConfig {
    if let Some(model) = model {
        config.model_path = model;
    }
    if let Some(mode) = mode {
        config.mode = mode;
    }
    if let Some(tolerance) = tolerance {
        config.reference_tolerance = tolerance;
    }
    tracing::debug!(?config, "effective configuration");
    config
}

/// Truncates a string to `max_len` with ellipsis if needed.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_config() {
        let base = RuntimeConfig::default();
        let c = override_config(base, Some("m".into()), Some("generic".into()), Some(0.5));
        assert_eq!(c.model_path, PathBuf::from("m"));
        assert_eq!(c.mode, "generic");
        assert!((c.reference_tolerance - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_override_keeps_unset_fields() {
        let base = RuntimeConfig {
            mode: "generic".into(),
            ..Default::default()
        };
        let c = override_config(base, None, None, None);
        assert_eq!(c.mode, "generic");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("conv1", 10), "conv1");
        assert_eq!(truncate("a_very_long_node_name", 10), "a_very_...");
    }
}
