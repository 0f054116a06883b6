use burn::{prelude::*, tensor::backend::Backend};
use rand::Rng;

use crate::nn::{MLPConfig, MLP};

/// Configuration for the [`ValueNetwork`]
#[derive(Config, Debug)]
pub struct ValueNetworkConfig {
    pub state_dim: usize,
    /// Width of each of the three hidden layers
    #[config(default = 512)]
    pub hidden_dim: usize,
    /// Orthogonal gain of the value head
    #[config(default = 0.5)]
    pub output_gain: f64,
    #[config(default = 1e-6)]
    pub output_bias: f64,
}

/// Critic network: state → unconstrained scalar V(s)
#[derive(Module, Debug)]
pub struct ValueNetwork<B: Backend> {
    net: MLP<B>,
}

impl ValueNetworkConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ValueNetwork<B> {
        self.init_with_rng(device, &mut rand::thread_rng())
    }

    pub fn init_with_rng<B: Backend, R: Rng + ?Sized>(
        &self,
        device: &B::Device,
        rng: &mut R,
    ) -> ValueNetwork<B> {
        let net = MLPConfig::new(self.state_dim, vec![self.hidden_dim; 3], 1)
            .with_output_gain(Some(self.output_gain))
            .with_output_bias(self.output_bias)
            .init_with_rng(device, rng);

        ValueNetwork { net }
    }
}

impl<B: Backend> ValueNetwork<B> {
    /// `[batch, state_dim]` → `[batch, 1]`
    pub fn forward(&self, state: Tensor<B, 2>) -> Tensor<B, 2> {
        self.net.forward(state)
    }

    /// `[batch, state_dim]` → `[batch]`
    pub fn value(&self, state: Tensor<B, 2>) -> Tensor<B, 1> {
        let [batch, _] = state.dims();
        self.forward(state).reshape([batch])
    }
}
