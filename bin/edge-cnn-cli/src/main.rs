// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # edge-cnn
//!
//! Command-line interface for the edge-cnn-rt runtime.
//!
//! ## Usage
//! ```bash
//! # Run inference and check the result against a reference
//! edge-cnn run --model ./models/lenet --input digit.safetensors --reference prob.safetensors
//!
//! # Inspect model structure and the kernels the static strategy selects
//! edge-cnn inspect --model ./models/lenet
//!
//! # Emit the specialization plan as JSON for a code generator
//! edge-cnn specialize --model ./models/lenet --out lenet.plan.json
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "edge-cnn",
    about = "CNN inference runtime with static kernel specialization",
    version,
    author
)]
struct Cli {
    /// Path to a TOML configuration file. Command-line flags override it.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run inference on a model with inputs read from a SafeTensors file.
    Run {
        /// Path to the model directory.
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// SafeTensors file holding the network inputs.
        #[arg(short, long)]
        input: PathBuf,

        /// SafeTensors file with expected outputs to compare against.
        #[arg(short, long)]
        reference: Option<PathBuf>,

        /// Execution mode: generic or static.
        #[arg(long)]
        mode: Option<String>,

        /// Absolute tolerance for the reference comparison.
        #[arg(long)]
        tolerance: Option<f32>,

        /// Write the network outputs to this SafeTensors file.
        #[arg(short, long)]
        save: Option<PathBuf>,
    },

    /// Inspect a model: print the node graph, shapes and selected kernels.
    Inspect {
        /// Path to the model directory.
        #[arg(short, long)]
        model: Option<PathBuf>,
    },

    /// Build the specialization plan and print it as JSON.
    Specialize {
        /// Path to the model directory.
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Execution mode: generic or static.
        #[arg(long)]
        mode: Option<String>,

        /// Write the plan here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging based on verbosity.
    commands::init_tracing(cli.verbose);

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            model,
            input,
            reference,
            mode,
            tolerance,
            save,
        } => {
            let config = commands::override_config(config, model, mode, tolerance);
            commands::run::execute(config, input, reference, save)
        }
        Commands::Inspect { model } => {
            commands::inspect::execute(commands::override_config(config, model, None, None))
        }
        Commands::Specialize { model, mode, out } => {
            commands::specialize::execute(commands::override_config(config, model, mode, None), out)
        }
    }
}
