// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Runtime configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! model_path = "./models/lenet"
//! mode = "static"
//! enable_profiling = true
//! reference_tolerance = 0.001
//! keep_intermediates = false
//! ```

use specializer::{strategy_by_name, SpecializationStrategy};
use std::path::{Path, PathBuf};

/// Configuration for the inference runtime.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RuntimeConfig {
    /// Path to the model directory.
    pub model_path: PathBuf,
    /// Execution mode: `"generic"` or `"static"`.
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Whether to record per-node timing metrics.
    #[serde(default = "default_true")]
    pub enable_profiling: bool,
    /// Absolute tolerance for comparing outputs against reference data.
    #[serde(default = "default_tolerance")]
    pub reference_tolerance: f32,
    /// Keep every intermediate value instead of releasing it after its
    /// last consumer.
    #[serde(default)]
    pub keep_intermediates: bool,
}

fn default_mode() -> String {
    "static".to_string()
}

fn default_true() -> bool {
    true
}

fn default_tolerance() -> f32 {
    1e-3
}

impl RuntimeConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, super::RuntimeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            super::RuntimeError::ConfigError(format!(
                "cannot read config '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, super::RuntimeError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| {
            super::RuntimeError::ConfigError(format!("TOML parse error: {e}"))
        })?;
        config.check()?;
        Ok(config)
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, super::RuntimeError> {
        toml::to_string_pretty(self).map_err(|e| {
            super::RuntimeError::ConfigError(format!("TOML serialise error: {e}"))
        })
    }

    /// Creates the specialization strategy selected by `mode`.
    pub fn create_strategy(&self) -> Result<Box<dyn SpecializationStrategy>, super::RuntimeError> {
        strategy_by_name(&self.mode.to_lowercase()).ok_or_else(|| {
            super::RuntimeError::ConfigError(format!(
                "unknown mode '{}'; expected 'generic' or 'static'",
                self.mode
            ))
        })
    }

    fn check(&self) -> Result<(), super::RuntimeError> {
        if self.reference_tolerance.is_nan() || self.reference_tolerance < 0.0 {
            return Err(super::RuntimeError::ConfigError(format!(
                "reference_tolerance must be a non-negative number, got {}",
                self.reference_tolerance
            )));
        }
        Ok(())
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("./models/lenet"),
            mode: default_mode(),
            enable_profiling: true,
            reference_tolerance: default_tolerance(),
            keep_intermediates: false,
        }
    }
}
