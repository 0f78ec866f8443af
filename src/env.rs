//! # Environments
//!
//! The training core drives any [`Environment`]: `reset() -> state` and
//! `step(action) -> (next_state, reward, done)`. [`CartPole`] is bundled as
//! the reference classic-control task.

use ndarray::{array, Array1};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Uniform};

use crate::error::{DqnError, Result};

/// Response to one environment step
#[derive(Clone, Debug, PartialEq)]
pub struct StepOutcome {
    pub next_state: Array1<f32>,
    pub reward: f32,
    pub done: bool,
}

/// Episodic environment with a discrete action space
pub trait Environment {
    /// Length of every state vector
    fn observation_dim(&self) -> usize;

    fn num_actions(&self) -> usize;

    fn reset(&mut self) -> Result<Array1<f32>>;

    fn step(&mut self, action: usize) -> Result<StepOutcome>;
}

/// Reject observations of the wrong length or with non-finite entries
pub fn validate_observation(state: &Array1<f32>, expected_dim: usize) -> Result<()> {
    if state.len() != expected_dim {
        return Err(DqnError::environment(format!(
            "observation has length {}, expected {}",
            state.len(),
            expected_dim
        )));
    }
    if !state.iter().all(|v| v.is_finite()) {
        return Err(DqnError::environment("observation contains NaN or infinite values"));
    }
    Ok(())
}

/// Reject malformed step responses
pub fn validate_outcome(outcome: &StepOutcome, expected_dim: usize) -> Result<()> {
    validate_observation(&outcome.next_state, expected_dim)?;
    if !outcome.reward.is_finite() {
        return Err(DqnError::environment(format!("reward {} is not finite", outcome.reward)));
    }
    Ok(())
}

/// Classic cart-pole balancing task: reward 1 per step, terminate when the
/// pole falls past ~12 degrees, the cart leaves the track, or 500 steps pass.
pub struct CartPole {
    x: f32,
    x_dot: f32,
    theta: f32,
    theta_dot: f32,
    steps: usize,
    done: bool,
    max_steps: usize,
    rng: StdRng,
}

impl CartPole {
    const GRAVITY: f32 = 9.8;
    const MASS_CART: f32 = 1.0;
    const MASS_POLE: f32 = 0.1;
    const HALF_LENGTH: f32 = 0.5;
    const FORCE_MAG: f32 = 10.0;
    const TAU: f32 = 0.02;
    const X_THRESHOLD: f32 = 2.4;
    const THETA_THRESHOLD: f32 = 12.0 * 2.0 * std::f32::consts::PI / 360.0;

    pub fn new(seed: u64) -> Self {
        CartPole {
            x: 0.0,
            x_dot: 0.0,
            theta: 0.0,
            theta_dot: 0.0,
            steps: 0,
            done: true,
            max_steps: 500,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    fn state(&self) -> Array1<f32> {
        array![self.x, self.x_dot, self.theta, self.theta_dot]
    }
}

impl Environment for CartPole {
    fn observation_dim(&self) -> usize {
        4
    }

    fn num_actions(&self) -> usize {
        2
    }

    fn reset(&mut self) -> Result<Array1<f32>> {
        let init = Uniform::new(-0.05_f32, 0.05);
        self.x = init.sample(&mut self.rng);
        self.x_dot = init.sample(&mut self.rng);
        self.theta = init.sample(&mut self.rng);
        self.theta_dot = init.sample(&mut self.rng);
        self.steps = 0;
        self.done = false;
        Ok(self.state())
    }

    fn step(&mut self, action: usize) -> Result<StepOutcome> {
        if action >= 2 {
            return Err(DqnError::environment(format!("invalid action {} for CartPole", action)));
        }
        if self.done {
            return Err(DqnError::environment("step called on a finished episode; call reset first"));
        }

        let force = if action == 1 { Self::FORCE_MAG } else { -Self::FORCE_MAG };
        let cos_theta = self.theta.cos();
        let sin_theta = self.theta.sin();
        let total_mass = Self::MASS_CART + Self::MASS_POLE;
        let pole_mass_length = Self::MASS_POLE * Self::HALF_LENGTH;

        let temp = (force + pole_mass_length * self.theta_dot * self.theta_dot * sin_theta) / total_mass;
        let theta_acc = (Self::GRAVITY * sin_theta - cos_theta * temp)
            / (Self::HALF_LENGTH * (4.0 / 3.0 - Self::MASS_POLE * cos_theta * cos_theta / total_mass));
        let x_acc = temp - pole_mass_length * theta_acc * cos_theta / total_mass;

        // Euler integration
        self.x += Self::TAU * self.x_dot;
        self.x_dot += Self::TAU * x_acc;
        self.theta += Self::TAU * self.theta_dot;
        self.theta_dot += Self::TAU * theta_acc;
        self.steps += 1;

        self.done = self.x.abs() > Self::X_THRESHOLD
            || self.theta.abs() > Self::THETA_THRESHOLD
            || self.steps >= self.max_steps;

        Ok(StepOutcome {
            next_state: self.state(),
            reward: 1.0,
            done: self.done,
        })
    }
}
