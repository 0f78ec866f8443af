//! # Episode Loop
//!
//! Drives `episodes` full episodes. Per environment step the loop asks the
//! policy for an action (which advances the global step counter), steps the
//! environment, stores the transition, then runs the optimize step when the
//! counter is a multiple of `train_interval` and syncs the target network
//! when it is a multiple of `target_update_interval`, in that order. Every
//! `save_interval` finished episodes a checkpoint goes to the sink.
//!
//! Everything runs on the calling thread; a run can only be stopped between
//! steps, and the first fatal error ends it.

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info, warn};

use crate::checkpoint::{Checkpoint, CheckpointSink};
use crate::config::HyperParams;
use crate::env::{validate_observation, validate_outcome, Environment};
use crate::error::{DqnError, Result};
use crate::exploration::{EpsilonSchedule, StepCounter};
use crate::metrics::{MetricsTracker, RunSummary};
use crate::network::QNetwork;
use crate::policy::EpsilonGreedy;
use crate::replay_buffer::Transition;
use crate::trainer::Trainer;

const METRICS_HISTORY: usize = 1000;

/// Outcome of one finished episode
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EpisodeReport {
    /// 1-based episode number
    pub episode: usize,
    pub reward: f32,
    pub length: usize,
    /// Ended by `max_episode_steps` rather than by the environment
    pub truncated: bool,
}

pub struct EpisodeLoop<E, N: QNetwork, S> {
    params: HyperParams,
    env: E,
    trainer: Trainer<N>,
    policy: EpsilonGreedy,
    sink: S,
    counter: StepCounter,
    episode: usize,
    checkpoints: usize,
    metrics: MetricsTracker,
    rng: StdRng,
}

impl<E, N, S> EpisodeLoop<E, N, S>
where
    E: Environment,
    N: QNetwork,
    S: CheckpointSink<N>,
{
    /// Validates `params` and the network/environment shapes before anything runs.
    pub fn new(params: HyperParams, env: E, network: N, sink: S) -> Result<Self> {
        params.validate()?;
        if network.input_dim() != env.observation_dim() {
            return Err(DqnError::configuration(
                "network",
                format!(
                    "network expects {} inputs, environment observes {}",
                    network.input_dim(),
                    env.observation_dim()
                ),
            ));
        }
        if network.num_actions() != env.num_actions() {
            return Err(DqnError::configuration(
                "network",
                format!(
                    "network scores {} actions, environment has {}",
                    network.num_actions(),
                    env.num_actions()
                ),
            ));
        }

        let trainer = Trainer::new(network, &params);
        let policy = EpsilonGreedy::new(EpsilonSchedule::from(&params.eps));
        let rng = StdRng::seed_from_u64(params.run_seed());

        Ok(EpisodeLoop {
            params,
            env,
            trainer,
            policy,
            sink,
            counter: StepCounter::new(),
            episode: 0,
            checkpoints: 0,
            metrics: MetricsTracker::new(METRICS_HISTORY),
            rng,
        })
    }

    /// Continue from a saved checkpoint: restores θ (and θ⁻), the step counter and episode index.
    pub fn resume(&mut self, checkpoint: Checkpoint<N>) -> Result<()> {
        self.trainer.restore(checkpoint.network, checkpoint.global_step)?;
        self.counter = StepCounter::starting_at(checkpoint.global_step);
        self.episode = checkpoint.episode;
        info!(
            episode = self.episode,
            global_step = checkpoint.global_step,
            "resumed from checkpoint"
        );
        Ok(())
    }

    /// Run the remaining episodes
    pub fn run(&mut self) -> Result<RunSummary> {
        info!(
            trial = self.params.trial,
            episodes = self.params.episodes,
            double = self.params.double,
            "starting training run"
        );
        while self.episode < self.params.episodes {
            if let Err(e) = self.run_episode() {
                error!(episode = self.episode + 1, global_step = self.counter.get(), error = %e, "training run aborted");
                return Err(e);
            }
        }
        let summary = self.summary();
        info!(
            global_step = summary.global_step,
            optimize_steps = summary.optimize_steps,
            target_syncs = summary.target_syncs,
            "training run finished"
        );
        Ok(summary)
    }

    /// Play one full episode, training and syncing on their intervals
    pub fn run_episode(&mut self) -> Result<EpisodeReport> {
        let observation_dim = self.env.observation_dim();
        let mut state = self.env.reset()?;
        validate_observation(&state, observation_dim)?;

        let mut total_reward = 0.0;
        let mut length = 0;
        let truncated = loop {
            let choice = self
                .policy
                .act(self.trainer.online(), state.view(), &mut self.counter, &mut self.rng)?;
            let outcome = self.env.step(choice.action)?;
            validate_outcome(&outcome, observation_dim)?;

            length += 1;
            total_reward += outcome.reward;
            let truncated = !outcome.done
                && self.params.max_episode_steps.map_or(false, |limit| length >= limit);

            self.trainer.push_transition(Transition {
                state,
                action: choice.action,
                reward: outcome.reward,
                next_state: outcome.next_state.clone(),
                done: outcome.done,
            });
            self.on_step()?;

            if outcome.done || truncated {
                break truncated;
            }
            state = outcome.next_state;
        };

        self.episode += 1;
        let epsilon = self.policy.current_epsilon(&self.counter);
        self.metrics.record_episode(total_reward, length, epsilon);
        if truncated {
            warn!(episode = self.episode, length, "episode truncated at max_episode_steps");
        }
        info!(
            episode = self.episode,
            reward = total_reward,
            length,
            epsilon,
            global_step = self.counter.get(),
            "episode finished"
        );

        if self.episode % self.params.save_interval == 0 {
            self.save_checkpoint()?;
        }

        Ok(EpisodeReport {
            episode: self.episode,
            reward: total_reward,
            length,
            truncated,
        })
    }

    /// Interval checks against the post-increment step count
    fn on_step(&mut self) -> Result<()> {
        if self.counter.is_multiple_of(self.params.train_interval) {
            if let Some(stats) = self.trainer.optimize(&mut self.rng)? {
                self.metrics.record_optimize(stats.loss, stats.grad_norm);
            }
        }
        if self.counter.is_multiple_of(self.params.target_update_interval) {
            self.trainer.sync_target(self.counter.get());
        }
        Ok(())
    }

    fn save_checkpoint(&mut self) -> Result<()> {
        let checkpoint = Checkpoint {
            trial: self.params.trial,
            episode: self.episode,
            global_step: self.counter.get(),
            network: self.trainer.online().clone(),
        };
        self.sink.save(&checkpoint)?;
        self.checkpoints += 1;
        Ok(())
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            trial: self.params.trial,
            episodes: self.episode,
            global_step: self.counter.get(),
            optimize_steps: self.trainer.optimize_steps(),
            target_syncs: self.trainer.target().sync_count(),
            checkpoints: self.checkpoints,
            final_epsilon: self.policy.current_epsilon(&self.counter),
            mean_reward_last_100: self.metrics.mean_reward(100),
            episode_rewards: self.metrics.episode_rewards().to_vec(),
        }
    }

    /// Greedy Q-values of the online network for `state`
    pub fn q_values(&self, state: &Array1<f32>) -> Array1<f32> {
        self.trainer.online().forward(state.view())
    }

    pub fn params(&self) -> &HyperParams {
        &self.params
    }

    pub fn trainer(&self) -> &Trainer<N> {
        &self.trainer
    }

    pub fn counter(&self) -> StepCounter {
        self.counter
    }

    pub fn episode(&self) -> usize {
        self.episode
    }

    pub fn metrics(&self) -> &MetricsTracker {
        &self.metrics
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn env(&self) -> &E {
        &self.env
    }
}
