use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Bounded training histories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingMetrics {
    /// Loss values of performed optimize steps
    pub losses: VecDeque<f32>,

    /// Pre-clip gradient norms
    pub gradient_norms: VecDeque<f32>,

    /// Rewards per episode
    pub episode_rewards: VecDeque<f32>,

    /// Episode lengths
    pub episode_lengths: VecDeque<usize>,

    /// Epsilon at the end of each episode
    pub epsilons: VecDeque<f32>,
}

impl TrainingMetrics {
    pub fn new(history_size: usize) -> Self {
        TrainingMetrics {
            losses: VecDeque::with_capacity(history_size),
            gradient_norms: VecDeque::with_capacity(history_size),
            episode_rewards: VecDeque::with_capacity(history_size),
            episode_lengths: VecDeque::with_capacity(history_size),
            epsilons: VecDeque::with_capacity(history_size),
        }
    }
}

fn push_bounded<T>(history: &mut VecDeque<T>, value: T, limit: usize) {
    if history.len() >= limit {
        history.pop_front();
    }
    history.push_back(value);
}

/// Tracks metrics during training
pub struct MetricsTracker {
    metrics: TrainingMetrics,
    history_size: usize,
    all_episode_rewards: Vec<f32>,
}

impl MetricsTracker {
    pub fn new(history_size: usize) -> Self {
        let history_size = history_size.max(1);
        MetricsTracker {
            metrics: TrainingMetrics::new(history_size),
            history_size,
            all_episode_rewards: Vec::new(),
        }
    }

    pub fn record_optimize(&mut self, loss: f32, grad_norm: f32) {
        push_bounded(&mut self.metrics.losses, loss, self.history_size);
        push_bounded(&mut self.metrics.gradient_norms, grad_norm, self.history_size);
    }

    pub fn record_episode(&mut self, reward: f32, length: usize, epsilon: f32) {
        push_bounded(&mut self.metrics.episode_rewards, reward, self.history_size);
        push_bounded(&mut self.metrics.episode_lengths, length, self.history_size);
        push_bounded(&mut self.metrics.epsilons, epsilon, self.history_size);
        self.all_episode_rewards.push(reward);
    }

    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    /// Every episode reward of the run, in order
    pub fn episode_rewards(&self) -> &[f32] {
        &self.all_episode_rewards
    }

    /// Mean reward over the last `window` episodes
    pub fn mean_reward(&self, window: usize) -> Option<f32> {
        let n = self.all_episode_rewards.len().min(window);
        if n == 0 {
            return None;
        }
        let recent = &self.all_episode_rewards[self.all_episode_rewards.len() - n..];
        Some(recent.iter().sum::<f32>() / n as f32)
    }

    /// Mean of the recorded losses still in history
    pub fn mean_loss(&self) -> Option<f32> {
        if self.metrics.losses.is_empty() {
            return None;
        }
        Some(self.metrics.losses.iter().sum::<f32>() / self.metrics.losses.len() as f32)
    }
}

/// End-of-run report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub trial: u64,
    pub episodes: usize,
    pub global_step: u64,
    pub optimize_steps: usize,
    pub target_syncs: usize,
    pub checkpoints: usize,
    pub final_epsilon: f32,
    pub mean_reward_last_100: Option<f32>,
    pub episode_rewards: Vec<f32>,
}
