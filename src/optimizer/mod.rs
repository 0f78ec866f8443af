pub mod gradient_clipper;

use ndarray::{Array1, Array2, Zip};
use serde::{Deserialize, Serialize};

use crate::config::OptimizerKind;

pub use gradient_clipper::GradientClipper;

/// Parameter update rule.
///
/// `layer` identifies the parameter slot so stateful optimizers can keep
/// per-layer moments; `begin_step` is called once before each full update.
pub trait Optimizer {
    fn begin_step(&mut self) {}
    fn update_weights(&mut self, layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32);
    fn update_biases(&mut self, layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32);
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum OptimizerWrapper {
    SGD(SGD),
    Adam(Adam),
}

impl OptimizerWrapper {
    pub fn from_kind(kind: OptimizerKind) -> Self {
        match kind {
            OptimizerKind::Sgd => OptimizerWrapper::SGD(SGD::new()),
            OptimizerKind::Adam => OptimizerWrapper::Adam(Adam::default()),
        }
    }
}

impl Optimizer for OptimizerWrapper {
    fn begin_step(&mut self) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.begin_step(),
            OptimizerWrapper::Adam(optimizer) => optimizer.begin_step(),
        }
    }

    fn update_weights(&mut self, layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.update_weights(layer, weights, gradients, learning_rate),
            OptimizerWrapper::Adam(optimizer) => optimizer.update_weights(layer, weights, gradients, learning_rate),
        }
    }

    fn update_biases(&mut self, layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.update_biases(layer, biases, gradients, learning_rate),
            OptimizerWrapper::Adam(optimizer) => optimizer.update_biases(layer, biases, gradients, learning_rate),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SGD;

impl SGD {
    pub fn new() -> SGD {
        SGD
    }
}

impl Optimizer for SGD {
    fn update_weights(&mut self, _layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        weights.zip_mut_with(gradients, |w, &g| *w -= learning_rate * g);
    }

    fn update_biases(&mut self, _layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        biases.zip_mut_with(gradients, |b, &g| *b -= learning_rate * g);
    }
}

/// First and second moment estimates for one parameter tensor
#[derive(Serialize, Deserialize, Clone, Debug)]
struct Moments<A> {
    m: A,
    v: A,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Adam {
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    weight_moments: Vec<Option<Moments<Array2<f32>>>>,
    bias_moments: Vec<Option<Moments<Array1<f32>>>>,
    pub t: i32,
}

impl Adam {
    pub fn new(beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Adam {
            beta1,
            beta2,
            epsilon,
            weight_moments: Vec::new(),
            bias_moments: Vec::new(),
            t: 0,
        }
    }

    fn bias_corrections(&self) -> (f32, f32) {
        let t = self.t.max(1);
        (1.0 - self.beta1.powi(t), 1.0 - self.beta2.powi(t))
    }
}

/// Fetch the moments for `layer`, (re)creating them when missing or mis-shaped
fn slot<'a, A: Clone>(
    slots: &'a mut Vec<Option<Moments<A>>>,
    layer: usize,
    fits: impl Fn(&A) -> bool,
    zeros: impl Fn() -> A,
) -> &'a mut Moments<A> {
    if slots.len() <= layer {
        slots.resize(layer + 1, None);
    }
    let entry = &mut slots[layer];
    if !entry.as_ref().map(|m| fits(&m.m)).unwrap_or(false) {
        *entry = None;
    }
    entry.get_or_insert_with(|| Moments { m: zeros(), v: zeros() })
}

impl Default for Adam {
    fn default() -> Self {
        Self::new(0.9, 0.999, 1e-8)
    }
}

impl Optimizer for Adam {
    fn begin_step(&mut self) {
        self.t += 1;
    }

    fn update_weights(&mut self, layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        let (beta1, beta2, epsilon) = (self.beta1, self.beta2, self.epsilon);
        let (correction1, correction2) = self.bias_corrections();
        let dim = weights.dim();
        let moments = slot(&mut self.weight_moments, layer, |m| m.dim() == dim, || Array2::zeros(dim));

        moments.m.zip_mut_with(gradients, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
        moments.v.zip_mut_with(gradients, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

        Zip::from(weights)
            .and(&moments.m)
            .and(&moments.v)
            .for_each(|w, &m, &v| {
                let m_hat = m / correction1;
                let v_hat = v / correction2;
                *w -= learning_rate * m_hat / (v_hat.sqrt() + epsilon);
            });
    }

    fn update_biases(&mut self, layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        let (beta1, beta2, epsilon) = (self.beta1, self.beta2, self.epsilon);
        let (correction1, correction2) = self.bias_corrections();
        let len = biases.len();
        let moments = slot(&mut self.bias_moments, layer, |m| m.len() == len, || Array1::zeros(len));

        moments.m.zip_mut_with(gradients, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
        moments.v.zip_mut_with(gradients, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

        Zip::from(biases)
            .and(&moments.m)
            .and(&moments.v)
            .for_each(|b, &m, &v| {
                let m_hat = m / correction1;
                let v_hat = v / correction2;
                *b -= learning_rate * m_hat / (v_hat.sqrt() + epsilon);
            });
    }
}
