//! # Hyperparameter Configuration
//!
//! A run is fixed by one immutable [`HyperParams`] value, loaded once at
//! process start from a TOML or JSON file and validated before any training
//! occurs.
//!
//! ```toml
//! batch_size = 32
//! gamma = 0.99
//! lr = 0.001
//! grad_clip = 1.0
//! replay_capacity = 10000
//! target_update_interval = 1000
//! train_interval = 1
//! episodes = 200
//! double = true
//! save_interval = 50
//! trial = 0
//!
//! [eps]
//! start = 1.0
//! end = 0.05
//! decay = 1000.0
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DqnError, Result};

/// Shape of the epsilon decay curve
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DecayKind {
    /// `end + (start - end) * exp(-step / decay)`
    #[default]
    Exponential,
    /// `end + (start - end) * max(1 - step / decay, 0)`
    Linear,
}

/// Loss applied between Q(s, a) and the TD target
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LossKind {
    #[default]
    Mse,
    Huber,
}

/// How `grad_clip` is interpreted
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClipMode {
    /// Clamp every gradient element to `[-grad_clip, grad_clip]`
    #[default]
    Value,
    /// Rescale all gradients so their global L2 norm is at most `grad_clip`
    Norm,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    #[default]
    Adam,
    Sgd,
}

/// Exploration schedule parameters (`eps.*`)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpsilonConfig {
    pub start: f32,
    pub end: f32,
    pub decay: f32,
    pub kind: DecayKind,
}

impl Default for EpsilonConfig {
    fn default() -> Self {
        EpsilonConfig {
            start: 1.0,
            end: 0.05,
            decay: 1000.0,
            kind: DecayKind::Exponential,
        }
    }
}

/// Immutable hyperparameter set for one training run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HyperParams {
    /// Transitions sampled per optimize() call
    pub batch_size: usize,
    /// TD discount factor
    pub gamma: f32,
    /// Optimizer step size
    pub lr: f32,
    /// Gradient clipping threshold applied before each update
    pub grad_clip: f32,
    pub eps: EpsilonConfig,
    /// Transition buffer max size
    pub replay_capacity: usize,
    /// Environment steps between target-network syncs
    pub target_update_interval: u64,
    /// Environment steps between optimize() invocations
    pub train_interval: u64,
    pub episodes: usize,
    /// Use the Double DQN target rule
    pub double: bool,
    /// Episodes between checkpoint handoffs
    pub save_interval: usize,
    pub trial: u64,

    pub loss: LossKind,
    pub clip_mode: ClipMode,
    pub optimizer: OptimizerKind,
    pub hidden_layers: Vec<usize>,
    pub seed: u64,
    pub max_episode_steps: Option<usize>,
}

impl Default for HyperParams {
    fn default() -> Self {
        HyperParams {
            batch_size: 32,
            gamma: 0.99,
            lr: 1e-3,
            grad_clip: 1.0,
            eps: EpsilonConfig::default(),
            replay_capacity: 10_000,
            target_update_interval: 1000,
            train_interval: 1,
            episodes: 200,
            double: false,
            save_interval: 50,
            trial: 0,
            loss: LossKind::Mse,
            clip_mode: ClipMode::Value,
            optimizer: OptimizerKind::Adam,
            hidden_layers: vec![128, 128],
            seed: 0,
            max_episode_steps: None,
        }
    }
}

impl HyperParams {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let params: HyperParams = toml::from_str(source)?;
        params.validate()?;
        Ok(params)
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(source: &str) -> Result<Self> {
        let params: HyperParams = serde_json::from_str(source)
            .map_err(|e| DqnError::configuration("config", e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Load from a `.toml` or `.json` file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&source),
            Some("toml") | None => Self::from_toml_str(&source),
            Some(other) => Err(DqnError::configuration(
                "config",
                format!("unsupported config extension '.{}'", other),
            )),
        }
    }

    /// Seed for the run RNG; distinct trials of one config explore differently
    pub fn run_seed(&self) -> u64 {
        self.seed.wrapping_add(self.trial)
    }

    /// Reject values the training core cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(DqnError::configuration("batch_size", "must be greater than 0"));
        }
        if self.replay_capacity == 0 {
            return Err(DqnError::configuration("replay_capacity", "must be greater than 0"));
        }
        if self.batch_size > self.replay_capacity {
            return Err(DqnError::configuration(
                "batch_size",
                format!(
                    "{} exceeds replay_capacity {}",
                    self.batch_size, self.replay_capacity
                ),
            ));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(DqnError::configuration("gamma", "must be within [0, 1]"));
        }
        if !self.lr.is_finite() || self.lr <= 0.0 {
            return Err(DqnError::configuration("lr", "must be finite and positive"));
        }
        if !self.grad_clip.is_finite() || self.grad_clip <= 0.0 {
            return Err(DqnError::configuration("grad_clip", "must be finite and positive"));
        }
        if !(0.0..=1.0).contains(&self.eps.start) {
            return Err(DqnError::configuration("eps.start", "must be within [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.eps.end) {
            return Err(DqnError::configuration("eps.end", "must be within [0, 1]"));
        }
        if self.eps.end > self.eps.start {
            return Err(DqnError::configuration(
                "eps.end",
                format!("{} is greater than eps.start {}", self.eps.end, self.eps.start),
            ));
        }
        if !self.eps.decay.is_finite() || self.eps.decay <= 0.0 {
            return Err(DqnError::configuration("eps.decay", "must be finite and positive"));
        }
        if self.train_interval == 0 {
            return Err(DqnError::configuration("train_interval", "must be greater than 0"));
        }
        if self.target_update_interval == 0 {
            return Err(DqnError::configuration(
                "target_update_interval",
                "must be greater than 0",
            ));
        }
        if self.save_interval == 0 {
            return Err(DqnError::configuration("save_interval", "must be greater than 0"));
        }
        if self.episodes == 0 {
            return Err(DqnError::configuration("episodes", "must be greater than 0"));
        }
        if self.hidden_layers.iter().any(|&width| width == 0) {
            return Err(DqnError::configuration("hidden_layers", "widths must be greater than 0"));
        }
        if self.max_episode_steps == Some(0) {
            return Err(DqnError::configuration("max_episode_steps", "must be greater than 0"));
        }
        Ok(())
    }
}
