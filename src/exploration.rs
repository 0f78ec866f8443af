//! # Exploration Schedule
//!
//! Epsilon is a pure function of the global step count. The count itself
//! lives in a [`StepCounter`] that the episode loop owns and lends to the
//! policy and the interval checks; there is no hidden global.

use serde::{Deserialize, Serialize};

use crate::config::{DecayKind, EpsilonConfig};

/// Global environment-interaction counter.
///
/// Incremented exactly once per environment step; never decremented.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCounter {
    steps: u64,
}

impl StepCounter {
    pub fn new() -> Self {
        StepCounter { steps: 0 }
    }

    /// Resume from a checkpointed count
    pub fn starting_at(steps: u64) -> Self {
        StepCounter { steps }
    }

    pub fn get(&self) -> u64 {
        self.steps
    }

    /// Advance by one and return the new count
    pub fn increment(&mut self) -> u64 {
        self.steps += 1;
        self.steps
    }

    /// True when the current count is a positive multiple of `interval`
    pub fn is_multiple_of(&self, interval: u64) -> bool {
        interval > 0 && self.steps > 0 && self.steps % interval == 0
    }
}

/// Decaying epsilon schedule
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpsilonSchedule {
    pub start: f32,
    pub end: f32,
    pub decay: f32,
    pub kind: DecayKind,
}

impl EpsilonSchedule {
    pub fn exponential(start: f32, end: f32, decay: f32) -> Self {
        EpsilonSchedule { start, end, decay, kind: DecayKind::Exponential }
    }

    pub fn linear(start: f32, end: f32, decay: f32) -> Self {
        EpsilonSchedule { start, end, decay, kind: DecayKind::Linear }
    }

    pub fn epsilon(&self, step: u64) -> f32 {
        let step = step as f64;
        let decay = self.decay as f64;
        let progress = match self.kind {
            DecayKind::Exponential => (-step / decay).exp(),
            DecayKind::Linear => (1.0 - step / decay).max(0.0),
        };
        let eps = self.end as f64 + (self.start as f64 - self.end as f64) * progress;
        eps as f32
    }
}

impl From<&EpsilonConfig> for EpsilonSchedule {
    fn from(config: &EpsilonConfig) -> Self {
        EpsilonSchedule {
            start: config.start,
            end: config.end,
            decay: config.decay,
            kind: config.kind,
        }
    }
}
