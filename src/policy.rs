//! # Agent Policy
//!
//! Epsilon-greedy action selection over the online network. Each call to
//! [`EpsilonGreedy::act`] reads epsilon for the current step, advances the
//! shared [`StepCounter`] by one, then draws `r ∈ [0, 1)`: below epsilon a
//! uniformly random action is taken, otherwise the greedy one.

use ndarray::ArrayView1;
use rand::Rng;

use crate::error::{DqnError, Result};
use crate::exploration::{EpsilonSchedule, StepCounter};
use crate::network::QNetwork;

/// Index of the largest value; ties go to the lowest index and NaN never wins.
///
/// Returns `None` for an empty slice or one holding only NaN.
pub fn greedy_action(q_values: ArrayView1<f32>) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &value) in q_values.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        match best {
            Some((_, best_value)) if value <= best_value => {}
            _ => best = Some((index, value)),
        }
    }
    best.map(|(index, _)| index)
}

/// Which branch produced an action
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionSource {
    Explore,
    Exploit,
}

/// Action chosen for one environment interaction
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActionChoice {
    pub action: usize,
    pub epsilon: f32,
    pub source: ActionSource,
}

#[derive(Clone, Debug)]
pub struct EpsilonGreedy {
    schedule: EpsilonSchedule,
}

impl EpsilonGreedy {
    pub fn new(schedule: EpsilonSchedule) -> Self {
        EpsilonGreedy { schedule }
    }

    pub fn schedule(&self) -> &EpsilonSchedule {
        &self.schedule
    }

    /// Epsilon the next call to `act` will use
    pub fn current_epsilon(&self, counter: &StepCounter) -> f32 {
        self.schedule.epsilon(counter.get())
    }

    pub fn act<N, R>(
        &self,
        network: &N,
        state: ArrayView1<f32>,
        counter: &mut StepCounter,
        rng: &mut R,
    ) -> Result<ActionChoice>
    where
        N: QNetwork,
        R: Rng + ?Sized,
    {
        let num_actions = network.num_actions();
        if num_actions == 0 {
            return Err(DqnError::configuration("num_actions", "action space is empty"));
        }
        if state.len() != network.input_dim() {
            return Err(DqnError::dimension_mismatch(
                format!("state of length {}", network.input_dim()),
                format!("{}", state.len()),
            ));
        }

        let epsilon = self.schedule.epsilon(counter.get());
        counter.increment();

        if rng.gen::<f32>() < epsilon {
            return Ok(ActionChoice {
                action: rng.gen_range(0..num_actions),
                epsilon,
                source: ActionSource::Explore,
            });
        }

        let q_values = network.forward(state);
        let action = greedy_action(q_values.view())
            .ok_or_else(|| DqnError::numeric("no finite Q-value to act on"))?;
        Ok(ActionChoice {
            action,
            epsilon,
            source: ActionSource::Exploit,
        })
    }
}
