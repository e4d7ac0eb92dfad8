#![recursion_limit = "256"]

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::prelude::*;
use clap::Parser;

use deepsense_rl::config::AppConfig;
use deepsense_rl::model::DeepSense;
use deepsense_rl::{InferBackend, TrainBackend};

/// Inspect a DeepSense model: layer table, parameter counts, checkpoints.
#[derive(Parser)]
#[command(name = "deepsense", about = "Inspect a DeepSense Q-network")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the checkpoint save directory
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Model name (scopes the checkpoint directory)
    #[arg(long)]
    name: Option<String>,

    /// Restore the latest checkpoint before inspecting
    #[arg(long)]
    load: bool,

    /// Save a checkpoint tagged with this step after inspecting
    #[arg(long)]
    save_step: Option<usize>,

    /// Print a default config file and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", AppConfig::default_toml());
        return Ok(());
    }

    let mut config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    if let Some(dir) = cli.save_dir {
        config.checkpoint.save_dir = dir;
    }

    let device = Default::default();
    let mut model: DeepSense<TrainBackend> = DeepSense::new(
        config.model.clone(),
        config.checkpoint.clone(),
        cli.name.as_deref(),
        device,
    )?;

    // Materialize parameters with a single zero row.
    let probe = Tensor::<InferBackend, 2>::zeros(
        [1, config.model.flat_input_len()],
        &Default::default(),
    );
    model.build_model(probe, false, false)?;

    if cli.load {
        if model.load_model()? {
            println!("restored latest checkpoint from {}", model.model_dir().display());
        } else {
            println!("no checkpoint in {}, using fresh parameters", model.model_dir().display());
        }
    }

    println!("model '{}' ({})", model.name(), model.model_dir().display());
    println!(
        "input: {} splits x {} timesteps x {} channels -> {} actions",
        config.model.split_size,
        config.model.window_size,
        config.model.num_channels,
        config.model.num_actions
    );

    let weights = model.weights()?;
    for (name, data) in weights.iter() {
        let count: usize = data.shape.iter().product();
        println!("  {name:<44} {:?} ({count})", data.shape);
    }
    println!("total parameters: {}", weights.total_params());

    if let Some(step) = cli.save_step {
        let path = model.save_model(step)?;
        println!("saved checkpoint to {}", path.display());
    }

    Ok(())
}
