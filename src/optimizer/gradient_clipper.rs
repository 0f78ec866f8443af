use crate::config::ClipMode;
use crate::network::Gradients;

/// Gradient clipping methods
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GradientClipper {
    /// Clamp every element to `[-max, max]`
    ClipByValue { max: f32 },

    /// Rescale all gradients so their global L2 norm is at most `max_norm`
    ClipByGlobalNorm { max_norm: f32 },

    /// No clipping
    None,
}

impl GradientClipper {
    pub fn from_mode(mode: ClipMode, threshold: f32) -> Self {
        match mode {
            ClipMode::Value => GradientClipper::ClipByValue { max: threshold },
            ClipMode::Norm => GradientClipper::ClipByGlobalNorm { max_norm: threshold },
        }
    }

    /// Clip in place across every layer
    pub fn clip(&self, gradients: &mut Gradients) {
        match *self {
            GradientClipper::ClipByValue { max } => {
                for layer in gradients.layers.iter_mut() {
                    layer.weights.mapv_inplace(|g| g.clamp(-max, max));
                    layer.biases.mapv_inplace(|g| g.clamp(-max, max));
                }
            }

            GradientClipper::ClipByGlobalNorm { max_norm } => {
                let global_norm = gradients.global_norm();
                if global_norm > max_norm {
                    let scale = max_norm / global_norm;
                    for layer in gradients.layers.iter_mut() {
                        layer.weights.mapv_inplace(|g| g * scale);
                        layer.biases.mapv_inplace(|g| g * scale);
                    }
                }
            }

            GradientClipper::None => {}
        }
    }
}
