pub mod test_episode;
pub mod test_loss;
pub mod test_target;

use ndarray::{array, Array1, Array2};

use crate::env::{Environment, StepOutcome};
use crate::error::Result;
use crate::network::{Activation, Layer, NeuralNetwork};
use crate::replay_buffer::Transition;

/// Single linear layer: Q(s) = s · W + b
pub fn linear_network(weights: Array2<f32>, biases: Array1<f32>) -> NeuralNetwork {
    let layer = Layer::from_parameters(weights, biases, Activation::Linear).unwrap();
    NeuralNetwork::from_layers(vec![layer]).unwrap()
}

/// Transition whose reward doubles as an identifier
pub fn transition(id: usize) -> Transition {
    Transition {
        state: array![id as f32, 1.0],
        action: id % 2,
        reward: id as f32,
        next_state: array![id as f32 + 1.0, 1.0],
        done: false,
    }
}

/// Two-feature, two-action environment whose episodes last exactly `length` steps
pub struct FixedEnv {
    pub length: usize,
    pub t: usize,
    pub resets: usize,
}

impl FixedEnv {
    pub fn new(length: usize) -> Self {
        FixedEnv { length, t: 0, resets: 0 }
    }
}

impl Environment for FixedEnv {
    fn observation_dim(&self) -> usize {
        2
    }

    fn num_actions(&self) -> usize {
        2
    }

    fn reset(&mut self) -> Result<Array1<f32>> {
        self.t = 0;
        self.resets += 1;
        Ok(array![0.0, 1.0])
    }

    fn step(&mut self, action: usize) -> Result<StepOutcome> {
        self.t += 1;
        Ok(StepOutcome {
            next_state: array![self.t as f32 / 10.0, 1.0],
            reward: if action == 1 { 1.0 } else { 0.5 },
            done: self.t >= self.length,
        })
    }
}

/// Environment that returns a NaN observation on its `fail_at`-th step
pub struct BrokenEnv {
    pub fail_at: usize,
    pub t: usize,
}

impl Environment for BrokenEnv {
    fn observation_dim(&self) -> usize {
        2
    }

    fn num_actions(&self) -> usize {
        2
    }

    fn reset(&mut self) -> Result<Array1<f32>> {
        Ok(array![0.0, 0.0])
    }

    fn step(&mut self, _action: usize) -> Result<StepOutcome> {
        self.t += 1;
        let next_state = if self.t >= self.fail_at {
            array![f32::NAN, 0.0]
        } else {
            array![0.1, 0.0]
        };
        Ok(StepOutcome { next_state, reward: 0.0, done: false })
    }
}
