//! Multi-Layer Perceptron (MLP) - Generic feedforward neural network
//!
//! Backbone shared by the PPO actor (mean head) and critic (value head).

use burn::{
    module::Module,
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::{activation::relu, backend::Backend},
};
use rand::Rng;

use super::orthogonal::orthogonal_linear;

/// Configuration for Multi-Layer Perceptron
#[derive(Config, Debug)]
pub struct MLPConfig {
    /// Input dimension
    pub input_dim: usize,
    /// Hidden layer dimensions (e.g., [512, 512, 512] for three hidden layers of 512 units each)
    pub hidden_layers: Vec<usize>,
    /// Output dimension
    pub output_dim: usize,
    /// Orthogonal gain for the output layer; `None` keeps burn's default initializer
    #[config(default = "None")]
    pub output_gain: Option<f64>,
    /// Constant bias of the orthogonally initialized output layer
    #[config(default = 1e-6)]
    pub output_bias: f64,
}

/// Multi-Layer Perceptron implementation
///
/// Hidden layers use ReLU activation, the output layer is linear
#[derive(Module, Debug)]
pub struct MLP<B: Backend> {
    layers: Vec<Linear<B>>,
}

impl MLPConfig {
    /// Initialize the MLP, drawing orthogonal output weights from the thread RNG
    pub fn init<B: Backend>(&self, device: &B::Device) -> MLP<B> {
        self.init_with_rng(device, &mut rand::thread_rng())
    }

    /// Initialize the MLP, drawing orthogonal output weights from `rng`
    pub fn init_with_rng<B: Backend, R: Rng + ?Sized>(
        &self,
        device: &B::Device,
        rng: &mut R,
    ) -> MLP<B> {
        let dims: Vec<usize> = std::iter::once(self.input_dim)
            .chain(self.hidden_layers.iter().copied())
            .chain(std::iter::once(self.output_dim))
            .collect();
        let n_layers = dims.len() - 1;

        let layers = dims
            .windows(2)
            .enumerate()
            .map(|(i, pair)| match self.output_gain {
                Some(gain) if i == n_layers - 1 => {
                    orthogonal_linear(pair[0], pair[1], gain, self.output_bias, &mut *rng, device)
                }
                _ => LinearConfig::new(pair[0], pair[1]).init(device),
            })
            .collect();

        MLP { layers }
    }
}

impl<B: Backend> MLP<B> {
    /// Generic forward pass - works with any tensor dimension
    ///
    /// Applies ReLU activation to all hidden layers, no activation on output layer.
    /// The last dimension is always treated as the feature dimension.
    pub fn forward<const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        let last = self.layers.len() - 1;

        self.layers
            .iter()
            .enumerate()
            .fold(input, |x, (i, layer)| {
                let x = layer.forward(x);
                if i < last {
                    relu(x)
                } else {
                    x
                }
            })
    }
}
