use ndarray::{Array1, ArrayView1, Zip};

use crate::config::LossKind;

/// Regression loss between chosen-action Q estimates and fixed TD targets.
///
/// Both methods average over the batch; `gradient` is d loss / d prediction.
pub trait Loss: Send + Sync {
    fn compute(&self, predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> f32;

    fn gradient(&self, predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> Array1<f32>;
}

/// Mean squared error: `mean((p - y)^2)`
#[derive(Clone, Copy, Debug, Default)]
pub struct MeanSquaredError;

impl Loss for MeanSquaredError {
    fn compute(&self, predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> f32 {
        let n = predictions.len().max(1) as f32;
        let mut total = 0.0;
        Zip::from(&predictions).and(&targets).for_each(|&p, &y| {
            let diff = p - y;
            total += diff * diff;
        });
        total / n
    }

    fn gradient(&self, predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> Array1<f32> {
        let n = predictions.len().max(1) as f32;
        Zip::from(&predictions)
            .and(&targets)
            .map_collect(|&p, &y| 2.0 * (p - y) / n)
    }
}

/// Huber loss (smooth L1)
#[derive(Clone, Copy, Debug)]
pub struct HuberLoss {
    pub delta: f32,
}

impl HuberLoss {
    pub fn new(delta: f32) -> Self {
        HuberLoss { delta }
    }
}

impl Default for HuberLoss {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Loss for HuberLoss {
    fn compute(&self, predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> f32 {
        let n = predictions.len().max(1) as f32;
        let delta = self.delta;
        let mut total = 0.0;
        Zip::from(&predictions).and(&targets).for_each(|&p, &y| {
            let abs_x = (p - y).abs();
            total += if abs_x <= delta {
                0.5 * abs_x * abs_x
            } else {
                delta * abs_x - 0.5 * delta * delta
            };
        });
        total / n
    }

    fn gradient(&self, predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> Array1<f32> {
        let n = predictions.len().max(1) as f32;
        let delta = self.delta;
        Zip::from(&predictions)
            .and(&targets)
            .map_collect(|&p, &y| (p - y).clamp(-delta, delta) / n)
    }
}

/// Loss selected by configuration
#[derive(Clone, Copy, Debug)]
pub enum LossFunction {
    Mse(MeanSquaredError),
    Huber(HuberLoss),
}

impl From<LossKind> for LossFunction {
    fn from(kind: LossKind) -> Self {
        match kind {
            LossKind::Mse => LossFunction::Mse(MeanSquaredError),
            LossKind::Huber => LossFunction::Huber(HuberLoss::default()),
        }
    }
}

impl Loss for LossFunction {
    fn compute(&self, predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> f32 {
        match self {
            LossFunction::Mse(loss) => loss.compute(predictions, targets),
            LossFunction::Huber(loss) => loss.compute(predictions, targets),
        }
    }

    fn gradient(&self, predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> Array1<f32> {
        match self {
            LossFunction::Mse(loss) => loss.gradient(predictions, targets),
            LossFunction::Huber(loss) => loss.gradient(predictions, targets),
        }
    }
}
