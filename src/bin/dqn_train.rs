//! Train a DQN agent on CartPole from a hyperparameter file.
//!
//! ```text
//! dqn-train --config configs/cartpole.toml --checkpoint-dir checkpoints
//! ```

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::error;
use tracing_subscriber::EnvFilter;

use dqn_core::checkpoint::{CheckpointSink, FileCheckpointSink, MemorySink};
use dqn_core::config::HyperParams;
use dqn_core::env::{CartPole, Environment};
use dqn_core::episode::EpisodeLoop;
use dqn_core::network::NeuralNetwork;
use dqn_core::Result;

#[derive(Parser, Debug)]
#[command(name = "dqn-train")]
#[command(about = "Train a Deep Q-Network agent on CartPole", version)]
struct Cli {
    /// Hyperparameter file (.toml or .json)
    #[arg(short, long)]
    config: PathBuf,

    /// Directory for checkpoints; kept in memory only when omitted
    #[arg(long)]
    checkpoint_dir: Option<PathBuf>,

    /// Override the trial index from the config
    #[arg(long)]
    trial: Option<u64>,

    /// Write the JSON run summary here instead of stdout
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "dqn-train failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut params = HyperParams::from_path(&cli.config)?;
    if let Some(trial) = cli.trial {
        params.trial = trial;
    }

    match &cli.checkpoint_dir {
        Some(dir) => train(cli, params, FileCheckpointSink::new(dir)?),
        None => train(cli, params, MemorySink::new()),
    }
}

fn train<S: CheckpointSink<NeuralNetwork>>(cli: &Cli, params: HyperParams, sink: S) -> Result<()> {
    let env = CartPole::new(params.run_seed());

    let mut layer_sizes = vec![env.observation_dim()];
    layer_sizes.extend(params.hidden_layers.iter().copied());
    layer_sizes.push(env.num_actions());

    let mut init_rng = StdRng::seed_from_u64(params.run_seed());
    let network = NeuralNetwork::new_using(&layer_sizes, &mut init_rng)?;

    let mut run = EpisodeLoop::new(params, env, network, sink)?;
    let summary = run.run()?;

    let json = serde_json::to_string_pretty(&summary)?;
    match &cli.summary {
        Some(path) => fs::write(path, json)?,
        None => println!("{}", json),
    }
    Ok(())
}
