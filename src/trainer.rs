//! # Trainer
//!
//! One optimize step: sample a minibatch, evaluate Q(s, a; θ), build TD
//! targets with the configured rule, backpropagate the loss through the
//! chosen-action outputs only, clip, and apply a single update.
//!
//! TD targets are plain arrays computed from forward passes, so no gradient
//! ever flows through them.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::Rng;
use tracing::debug;

use crate::config::HyperParams;
use crate::error::{DqnError, Result};
use crate::loss::{Loss, LossFunction};
use crate::network::QNetwork;
use crate::optimizer::{GradientClipper, OptimizerWrapper};
use crate::policy::greedy_action;
use crate::replay_buffer::{ReplayBuffer, Transition, TransitionBatch};
use crate::target::TargetNetwork;

/// `y = r + γ · max_a' Q(s', a'; θ⁻)`, or `y = r` on terminal transitions.
pub fn standard_targets(
    rewards: ArrayView1<f32>,
    dones: ArrayView1<f32>,
    next_q_target: ArrayView2<f32>,
    gamma: f32,
) -> Array1<f32> {
    Array1::from_shape_fn(rewards.len(), |i| {
        if dones[i] > 0.5 {
            rewards[i]
        } else {
            let max_next_q = next_q_target
                .row(i)
                .iter()
                .fold(f32::NEG_INFINITY, |max, &val| max.max(val));
            rewards[i] + gamma * max_next_q
        }
    })
}

/// `a* = argmax_a' Q(s', a'; θ)`, `y = r + γ · Q(s', a*; θ⁻)`, or `y = r` on terminal transitions.
pub fn double_targets(
    rewards: ArrayView1<f32>,
    dones: ArrayView1<f32>,
    next_q_online: ArrayView2<f32>,
    next_q_target: ArrayView2<f32>,
    gamma: f32,
) -> Result<Array1<f32>> {
    let mut targets = Array1::zeros(rewards.len());
    for i in 0..rewards.len() {
        targets[i] = if dones[i] > 0.5 {
            rewards[i]
        } else {
            let best_action = greedy_action(next_q_online.row(i)).ok_or_else(|| {
                DqnError::numeric(format!("online network produced no finite Q-value for next state {}", i))
            })?;
            rewards[i] + gamma * next_q_target[[i, best_action]]
        };
    }
    Ok(targets)
}

/// TD target rule, fixed once at construction from the `double` flag
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetRule {
    Standard,
    Double,
}

impl TargetRule {
    pub fn from_double(double: bool) -> Self {
        if double {
            TargetRule::Double
        } else {
            TargetRule::Standard
        }
    }

    pub fn compute<N: QNetwork>(
        &self,
        batch: &TransitionBatch,
        online: &N,
        target: &N,
        gamma: f32,
    ) -> Result<Array1<f32>> {
        let next_q_target = target.forward_batch(batch.next_states.view());
        match self {
            TargetRule::Standard => Ok(standard_targets(
                batch.rewards.view(),
                batch.dones.view(),
                next_q_target.view(),
                gamma,
            )),
            TargetRule::Double => {
                let next_q_online = online.forward_batch(batch.next_states.view());
                double_targets(
                    batch.rewards.view(),
                    batch.dones.view(),
                    next_q_online.view(),
                    next_q_target.view(),
                    gamma,
                )
            }
        }
    }
}

/// Diagnostics from one performed optimize step
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OptimizeStats {
    pub loss: f32,
    /// Global gradient norm before clipping
    pub grad_norm: f32,
    /// Mean Q(s, a; θ) over the batch before the update
    pub mean_q: f32,
}

pub struct Trainer<N: QNetwork> {
    online: N,
    target: TargetNetwork<N>,
    replay: ReplayBuffer,
    optimizer: OptimizerWrapper,
    clipper: GradientClipper,
    loss: LossFunction,
    rule: TargetRule,
    batch_size: usize,
    gamma: f32,
    learning_rate: f32,
    optimize_steps: usize,
}

impl<N: QNetwork> Trainer<N> {
    /// Wire a trainer from validated hyperparameters; θ⁻ starts equal to θ.
    pub fn new(online: N, params: &HyperParams) -> Self {
        let target = TargetNetwork::new(&online);
        Trainer {
            online,
            target,
            replay: ReplayBuffer::new(params.replay_capacity),
            optimizer: OptimizerWrapper::from_kind(params.optimizer),
            clipper: GradientClipper::from_mode(params.clip_mode, params.grad_clip),
            loss: LossFunction::from(params.loss),
            rule: TargetRule::from_double(params.double),
            batch_size: params.batch_size,
            gamma: params.gamma,
            learning_rate: params.lr,
            optimize_steps: 0,
        }
    }

    pub fn with_optimizer(mut self, optimizer: OptimizerWrapper) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn with_clipper(mut self, clipper: GradientClipper) -> Self {
        self.clipper = clipper;
        self
    }

    pub fn push_transition(&mut self, transition: Transition) {
        self.replay.push(transition);
    }

    /// Perform one gradient step, or none when the buffer is below `batch_size`.
    pub fn optimize<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Option<OptimizeStats>> {
        let batch = match self.replay.sample(self.batch_size, rng) {
            Ok(transitions) => TransitionBatch::from_transitions(&transitions)?,
            Err(DqnError::InsufficientData { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        let num_actions = self.online.num_actions();
        if let Some(&action) = batch.actions.iter().find(|&&a| a >= num_actions) {
            return Err(DqnError::dimension_mismatch(
                format!("action index below {}", num_actions),
                format!("{}", action),
            ));
        }
        if batch.states.ncols() != self.online.input_dim() {
            return Err(DqnError::dimension_mismatch(
                format!("{} state features", self.online.input_dim()),
                format!("{}", batch.states.ncols()),
            ));
        }

        let q_all = self.online.forward_batch(batch.states.view());
        let current_q = Array1::from_shape_fn(batch.len(), |i| q_all[[i, batch.actions[i]]]);

        let targets = self.rule.compute(&batch, &self.online, self.target.network(), self.gamma)?;
        if !targets.iter().all(|y| y.is_finite()) {
            return Err(DqnError::numeric("non-finite TD target"));
        }

        let loss = self.loss.compute(current_q.view(), targets.view());
        if !loss.is_finite() {
            return Err(DqnError::numeric(format!("loss is {}", loss)));
        }

        // Only the chosen-action column carries error
        let loss_grad = self.loss.gradient(current_q.view(), targets.view());
        let mut output_errors = Array2::zeros(q_all.dim());
        for (i, &action) in batch.actions.iter().enumerate() {
            output_errors[[i, action]] = loss_grad[i];
        }

        let mut gradients = self.online.backward(batch.states.view(), output_errors.view())?;
        if !gradients.is_finite() {
            return Err(DqnError::numeric("non-finite gradient"));
        }
        let grad_norm = gradients.global_norm();
        self.clipper.clip(&mut gradients);

        self.online
            .apply_update(&gradients, &mut self.optimizer, self.learning_rate)?;
        self.target.mark_stale();
        self.optimize_steps += 1;

        let stats = OptimizeStats {
            loss,
            grad_norm,
            mean_q: current_q.mean().unwrap_or(0.0),
        };
        debug!(
            step = self.optimize_steps,
            loss = stats.loss,
            grad_norm = stats.grad_norm,
            mean_q = stats.mean_q,
            "optimize step"
        );
        Ok(Some(stats))
    }

    /// Copy θ into θ⁻
    pub fn sync_target(&mut self, step: u64) {
        self.target.sync(&self.online, step);
    }

    /// Replace θ with restored parameters and resynchronize θ⁻ to them
    pub fn restore(&mut self, network: N, step: u64) -> Result<()> {
        if network.input_dim() != self.online.input_dim() || network.num_actions() != self.online.num_actions() {
            return Err(DqnError::dimension_mismatch(
                format!("network {}→{}", self.online.input_dim(), self.online.num_actions()),
                format!("{}→{}", network.input_dim(), network.num_actions()),
            ));
        }
        self.online = network;
        self.target.sync(&self.online, step);
        Ok(())
    }

    pub fn online(&self) -> &N {
        &self.online
    }

    /// Direct access to θ; the target is considered stale afterwards
    pub fn online_mut(&mut self) -> &mut N {
        self.target.mark_stale();
        &mut self.online
    }

    pub fn target(&self) -> &TargetNetwork<N> {
        &self.target
    }

    pub fn replay(&self) -> &ReplayBuffer {
        &self.replay
    }

    pub fn rule(&self) -> TargetRule {
        self.rule
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn optimize_steps(&self) -> usize {
        self.optimize_steps
    }
}
