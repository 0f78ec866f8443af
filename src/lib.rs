//! # dqn-core - Deep Q-Network Training Core
//!
//! The training loop of a DQN agent: experience replay, epsilon-greedy
//! exploration, a periodically synchronized target network and the optimize
//! step, with optional Double-DQN targets and gradient clipping.
//!
//! ## Key Features
//!
//! - **Replay**: fixed-capacity FIFO transition buffer with uniform, duplicate-free sampling
//! - **Exploration**: exponential or linear epsilon decay driven by one explicit step counter
//! - **Target network**: whole-snapshot synchronization on a fixed step interval
//! - **Optimize step**: standard or Double-DQN TD targets, MSE or Huber loss, value or norm clipping
//! - **Persistence**: bincode checkpoints of (θ, step counter, episode index)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dqn_core::checkpoint::MemorySink;
//! use dqn_core::config::HyperParams;
//! use dqn_core::env::{CartPole, Environment};
//! use dqn_core::episode::EpisodeLoop;
//! use dqn_core::network::NeuralNetwork;
//!
//! let params = HyperParams { episodes: 10, double: true, ..HyperParams::default() };
//! let env = CartPole::new(params.run_seed());
//! let network = NeuralNetwork::new(&[env.observation_dim(), 128, 128, env.num_actions()]).unwrap();
//!
//! let mut run = EpisodeLoop::new(params, env, network, MemorySink::new()).unwrap();
//! let summary = run.run().unwrap();
//! println!("mean reward: {:?}", summary.mean_reward_last_100);
//! ```
//!
//! ## Module Organization
//!
//! - [`checkpoint`] - Checkpoint records and persistence sinks
//! - [`config`] - Hyperparameter set, loading and validation
//! - [`env`] - Environment interface and the CartPole reference task
//! - [`episode`] - Episode loop orchestrating interaction, training and syncs
//! - [`error`] - Error types and result handling
//! - [`exploration`] - Epsilon schedule and the global step counter
//! - [`loss`] - TD regression losses
//! - [`metrics`] - Training histories and run summary
//! - [`network`] - Q-network interface and the MLP implementation
//! - [`optimizer`] - Optimizers and gradient clipping
//! - [`policy`] - Epsilon-greedy action selection
//! - [`replay_buffer`] - Experience replay
//! - [`target`] - Target network manager
//! - [`trainer`] - The optimize step

pub mod checkpoint;
pub mod config;
pub mod env;
pub mod episode;
pub mod error;
pub mod exploration;
pub mod loss;
pub mod metrics;
pub mod network;
pub mod optimizer;
pub mod policy;
pub mod replay_buffer;
pub mod target;
pub mod trainer;

pub use error::{DqnError, Result};

#[cfg(test)]
mod tests;
