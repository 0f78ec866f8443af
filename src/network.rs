use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{DqnError, Result};
use crate::optimizer::{Optimizer, OptimizerWrapper};

/// Gradients for one dense layer
#[derive(Clone, Debug, PartialEq)]
pub struct LayerGradients {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
}

/// Gradients of the loss with respect to every network parameter, in layer order.
#[derive(Clone, Debug, PartialEq)]
pub struct Gradients {
    pub layers: Vec<LayerGradients>,
}

impl Gradients {
    /// L2 norm over all parameters
    pub fn global_norm(&self) -> f32 {
        self.layers
            .iter()
            .map(|g| {
                g.weights.iter().map(|&x| x * x).sum::<f32>()
                    + g.biases.iter().map(|&x| x * x).sum::<f32>()
            })
            .sum::<f32>()
            .sqrt()
    }

    /// Largest absolute element
    pub fn max_abs(&self) -> f32 {
        self.layers
            .iter()
            .flat_map(|g| g.weights.iter().chain(g.biases.iter()))
            .fold(0.0_f32, |max, &x| max.max(x.abs()))
    }

    pub fn is_finite(&self) -> bool {
        self.layers
            .iter()
            .all(|g| g.weights.iter().chain(g.biases.iter()).all(|x| x.is_finite()))
    }
}

/// The value-function collaborator: Q(s, ·; θ) plus a gradient-accepting update.
///
/// Implementors own their parameters. `Clone` produces a structurally
/// identical copy, which is how the target network is created.
pub trait QNetwork: Clone {
    /// Length of the state vector the network accepts
    fn input_dim(&self) -> usize;

    /// Size of the discrete action space
    fn num_actions(&self) -> usize;

    /// Q-values for a single state
    fn forward(&self, state: ArrayView1<f32>) -> Array1<f32>;

    /// Q-values for a batch of states, one row per state
    fn forward_batch(&self, states: ArrayView2<f32>) -> Array2<f32>;

    /// Backpropagate `output_errors` (d loss / d Q, shaped like the forward output)
    fn backward(&self, states: ArrayView2<f32>, output_errors: ArrayView2<f32>) -> Result<Gradients>;

    /// Apply already-clipped gradients with the given optimizer and step size
    fn apply_update(&mut self, gradients: &Gradients, optimizer: &mut OptimizerWrapper, learning_rate: f32) -> Result<()>;

    /// Overwrite `target` with this network's parameters
    fn copy_parameters_to(&self, target: &mut Self) {
        *target = self.clone();
    }
}

/// An enumeration of the activation functions used by the value network.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Activation {
    Relu,
    Linear,
}

impl Activation {
    fn apply_batch(&self, inputs: &mut Array2<f32>) {
        match self {
            Activation::Relu => inputs.mapv_inplace(|v| v.max(0.0)),
            Activation::Linear => {}
        }
    }

    fn derivative_batch(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        match self {
            Activation::Relu => inputs.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
            // Derivative of linear activation is always 1
            Activation::Linear => Array2::ones(inputs.dim()),
        }
    }
}

/// A fully connected layer: `activation(x · W + b)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
    pub activation: Activation,
}

impl Layer {
    /// Weights are drawn from `U(-1/sqrt(fan_in), 1/sqrt(fan_in))`, biases start at zero.
    pub fn new(input_size: usize, output_size: usize, activation: Activation) -> Self {
        let bound = Self::init_bound(input_size);
        let weights = Array2::random((input_size, output_size), Uniform::new_inclusive(-bound, bound));
        let biases = Array1::zeros(output_size);
        Layer { weights, biases, activation }
    }

    pub fn new_using<R: Rng + ?Sized>(input_size: usize, output_size: usize, activation: Activation, rng: &mut R) -> Self {
        let bound = Self::init_bound(input_size);
        let weights = Array2::random_using((input_size, output_size), Uniform::new_inclusive(-bound, bound), rng);
        let biases = Array1::zeros(output_size);
        Layer { weights, biases, activation }
    }

    /// Build a layer from explicit parameters; `weights` is `(input, output)`.
    pub fn from_parameters(weights: Array2<f32>, biases: Array1<f32>, activation: Activation) -> Result<Self> {
        if weights.ncols() != biases.len() {
            return Err(DqnError::dimension_mismatch(
                format!("{} biases", weights.ncols()),
                format!("{}", biases.len()),
            ));
        }
        Ok(Layer { weights, biases, activation })
    }

    fn init_bound(input_size: usize) -> f32 {
        1.0 / (input_size.max(1) as f32).sqrt()
    }

    pub fn input_size(&self) -> usize {
        self.weights.nrows()
    }

    pub fn output_size(&self) -> usize {
        self.weights.ncols()
    }

    /// Returns `(pre_activation, output)` so backpropagation can reuse both
    fn forward_batch(&self, inputs: ArrayView2<f32>) -> (Array2<f32>, Array2<f32>) {
        let pre_activation = inputs.dot(&self.weights) + &self.biases.view().insert_axis(Axis(0));
        let mut outputs = pre_activation.clone();
        self.activation.apply_batch(&mut outputs);
        (pre_activation, outputs)
    }
}

/// Multi-layer perceptron Q-network: ReLU hidden layers, linear output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NeuralNetwork {
    pub layers: Vec<Layer>,
}

impl NeuralNetwork {
    /// `layer_sizes` holds the input size, every hidden width, and the action count.
    pub fn new(layer_sizes: &[usize]) -> Result<Self> {
        Self::check_sizes(layer_sizes)?;
        let last = layer_sizes.len() - 2;
        let layers = layer_sizes
            .windows(2)
            .enumerate()
            .map(|(i, window)| Layer::new(window[0], window[1], Self::activation_for(i, last)))
            .collect();
        Ok(NeuralNetwork { layers })
    }

    /// Same as [`NeuralNetwork::new`] with reproducible initialization
    pub fn new_using<R: Rng + ?Sized>(layer_sizes: &[usize], rng: &mut R) -> Result<Self> {
        Self::check_sizes(layer_sizes)?;
        let last = layer_sizes.len() - 2;
        let layers = layer_sizes
            .windows(2)
            .enumerate()
            .map(|(i, window)| Layer::new_using(window[0], window[1], Self::activation_for(i, last), rng))
            .collect();
        Ok(NeuralNetwork { layers })
    }

    pub fn from_layers(layers: Vec<Layer>) -> Result<Self> {
        if layers.is_empty() {
            return Err(DqnError::configuration("layers", "network needs at least one layer"));
        }
        for pair in layers.windows(2) {
            if pair[0].output_size() != pair[1].input_size() {
                return Err(DqnError::dimension_mismatch(
                    format!("layer input {}", pair[0].output_size()),
                    format!("{}", pair[1].input_size()),
                ));
            }
        }
        Ok(NeuralNetwork { layers })
    }

    fn check_sizes(layer_sizes: &[usize]) -> Result<()> {
        if layer_sizes.len() < 2 {
            return Err(DqnError::configuration(
                "layer_sizes",
                "must contain at least input and output sizes",
            ));
        }
        if layer_sizes.iter().any(|&size| size == 0) {
            return Err(DqnError::configuration("layer_sizes", "every size must be at least 1"));
        }
        Ok(())
    }

    fn activation_for(index: usize, last: usize) -> Activation {
        if index == last {
            Activation::Linear
        } else {
            Activation::Relu
        }
    }

    /// Total number of scalar parameters
    pub fn parameter_count(&self) -> usize {
        self.layers
            .iter()
            .map(|layer| layer.weights.len() + layer.biases.len())
            .sum()
    }
}

impl QNetwork for NeuralNetwork {
    fn input_dim(&self) -> usize {
        self.layers.first().map(Layer::input_size).unwrap_or(0)
    }

    fn num_actions(&self) -> usize {
        self.layers.last().map(Layer::output_size).unwrap_or(0)
    }

    fn forward(&self, state: ArrayView1<f32>) -> Array1<f32> {
        let output = self.forward_batch(state.insert_axis(Axis(0)));
        output.row(0).to_owned()
    }

    fn forward_batch(&self, states: ArrayView2<f32>) -> Array2<f32> {
        let mut current = states.to_owned();
        for layer in &self.layers {
            current = layer.forward_batch(current.view()).1;
        }
        current
    }

    fn backward(&self, states: ArrayView2<f32>, output_errors: ArrayView2<f32>) -> Result<Gradients> {
        if states.ncols() != self.input_dim() {
            return Err(DqnError::dimension_mismatch(
                format!("{} state features", self.input_dim()),
                format!("{}", states.ncols()),
            ));
        }
        if output_errors.dim() != (states.nrows(), self.num_actions()) {
            return Err(DqnError::dimension_mismatch(
                format!("output errors {:?}", (states.nrows(), self.num_actions())),
                format!("{:?}", output_errors.dim()),
            ));
        }

        // Forward pass keeping each layer's input and pre-activation
        let mut inputs = Vec::with_capacity(self.layers.len());
        let mut pre_activations = Vec::with_capacity(self.layers.len());
        let mut current = states.to_owned();
        for layer in &self.layers {
            let (pre_activation, output) = layer.forward_batch(current.view());
            inputs.push(current);
            pre_activations.push(pre_activation);
            current = output;
        }

        let mut gradients = Vec::with_capacity(self.layers.len());
        let mut current_error = output_errors.to_owned();
        for i in (0..self.layers.len()).rev() {
            let layer = &self.layers[i];
            let adjusted_error = current_error * &layer.activation.derivative_batch(pre_activations[i].view());
            gradients.push(LayerGradients {
                weights: inputs[i].t().dot(&adjusted_error),
                biases: adjusted_error.sum_axis(Axis(0)),
            });
            current_error = adjusted_error.dot(&layer.weights.t());
        }
        gradients.reverse();

        Ok(Gradients { layers: gradients })
    }

    fn apply_update(&mut self, gradients: &Gradients, optimizer: &mut OptimizerWrapper, learning_rate: f32) -> Result<()> {
        if gradients.layers.len() != self.layers.len() {
            return Err(DqnError::dimension_mismatch(
                format!("{} layer gradients", self.layers.len()),
                format!("{}", gradients.layers.len()),
            ));
        }
        for (index, (layer, grads)) in self.layers.iter().zip(&gradients.layers).enumerate() {
            if grads.weights.dim() != layer.weights.dim() || grads.biases.dim() != layer.biases.dim() {
                return Err(DqnError::dimension_mismatch(
                    format!("layer {} gradients {:?}", index, layer.weights.dim()),
                    format!("{:?}", grads.weights.dim()),
                ));
            }
        }

        optimizer.begin_step();
        for (index, (layer, grads)) in self.layers.iter_mut().zip(&gradients.layers).enumerate() {
            optimizer.update_weights(index, &mut layer.weights, &grads.weights, learning_rate);
            optimizer.update_biases(index, &mut layer.biases, &grads.biases, learning_rate);
        }
        Ok(())
    }

    fn copy_parameters_to(&self, target: &mut Self) {
        target.layers.clone_from(&self.layers);
    }
}
