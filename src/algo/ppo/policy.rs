//! Diagonal-Gaussian policy: MLP mean head plus a state-independent `log_std`
//!
//! X ~ N(μ, σ):  log f(x) = -(x - μ)² / 2σ² - log(√(2π)) - log(σ)
//!
//! Actions are sampled with the reparameterization `a = μ(s) + ξ·σ`, ξ ~ N(0, I),
//! and ξ is handed back to the caller. Storing ξ lets the learning pass rebuild
//! the sampling log-probability from `log_std` alone, without re-evaluating μ.

use burn::{
    module::Param,
    prelude::*,
    tensor::{activation::sigmoid, backend::Backend, Distribution},
};
use rand::Rng;

use crate::nn::{MLPConfig, MLP};

/// `ln(√(2π))`
pub const SQRT_2PI_LOG: f32 = 0.918_938_5;

/// Configuration for the [`PolicyNetwork`]
#[derive(Config, Debug)]
pub struct PolicyNetworkConfig {
    pub state_dim: usize,
    pub action_dim: usize,
    /// Width of each of the three hidden layers
    #[config(default = 512)]
    pub hidden_dim: usize,
    /// Initial value of every `log_std` entry
    #[config(default = "-0.5")]
    pub log_std_init: f32,
    /// Orthogonal gain of the mean head
    #[config(default = 0.1)]
    pub output_gain: f64,
    #[config(default = 1e-6)]
    pub output_bias: f64,
}

/// Actor network
///
/// Homoscedastic in the state, heteroscedastic across action dimensions:
/// one learned `log_std` entry per action dimension, shared by all states.
#[derive(Module, Debug)]
pub struct PolicyNetwork<B: Backend> {
    mean: MLP<B>,
    log_std: Param<Tensor<B, 1>>,
}

impl PolicyNetworkConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> PolicyNetwork<B> {
        self.init_with_rng(device, &mut rand::thread_rng())
    }

    pub fn init_with_rng<B: Backend, R: Rng + ?Sized>(
        &self,
        device: &B::Device,
        rng: &mut R,
    ) -> PolicyNetwork<B> {
        let mean = MLPConfig::new(
            self.state_dim,
            vec![self.hidden_dim; 3],
            self.action_dim,
        )
        .with_output_gain(Some(self.output_gain))
        .with_output_bias(self.output_bias)
        .init_with_rng(device, rng);

        let log_std = Tensor::full([self.action_dim], self.log_std_init, device);

        PolicyNetwork {
            mean,
            log_std: Param::from_tensor(log_std),
        }
    }
}

impl<B: Backend> PolicyNetwork<B> {
    /// Mean of the action distribution: `[batch, action_dim]`
    pub fn forward(&self, state: Tensor<B, 2>) -> Tensor<B, 2> {
        self.mean.forward(state)
    }

    /// Current `log_std`: `[action_dim]`
    pub fn log_std(&self) -> Tensor<B, 1> {
        self.log_std.val()
    }

    /// Mean squashed to (0, 1) with a sigmoid, for evaluation only
    pub fn deterministic_action(&self, state: Tensor<B, 2>) -> Tensor<B, 2> {
        sigmoid(self.forward(state))
    }

    /// Sample `a = μ(s) + ξ·exp(log_std)`
    ///
    /// Returns `(action, noise)`, both `[batch, action_dim]`.
    pub fn sample_action_with_noise(&self, state: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let mean = self.forward(state);
        let std = self.log_std().exp().unsqueeze::<2>();

        let noise = Tensor::random(mean.shape(), Distribution::Normal(0.0, 1.0), &mean.device());
        let action = mean + noise.clone() * std;

        (action, noise)
    }

    /// Log-density of `action` under the current policy at `state`: `[batch]`
    pub fn log_prob(&self, state: Tensor<B, 2>, action: Tensor<B, 2>) -> Tensor<B, 1> {
        gaussian_log_prob(self.forward(state), self.log_std(), action)
    }

    /// Log-density of an action drawn as `μ + ξ·σ`, from ξ alone: `[batch]`
    ///
    /// `-Σ_d [0.5·ξ_d² + log_std_d + ln√(2π)]`, equal to [`log_prob`](Self::log_prob)
    /// for that action while `μ` and `log_std` are unchanged.
    pub fn log_prob_from_noise(&self, noise: Tensor<B, 2>) -> Tensor<B, 1> {
        let [batch, _] = noise.dims();
        let log_std = self.log_std().unsqueeze::<2>();

        let log_prob = (noise.powf_scalar(2.0) * 0.5 + log_std)
            .add_scalar(SQRT_2PI_LOG)
            .neg();
        log_prob.sum_dim(1).reshape([batch])
    }
}

/// Diagonal-Gaussian log-density summed over the action dimensions
///
/// - `mean`, `action`: `[batch, action_dim]`
/// - `log_std`: `[action_dim]`
///
/// Returns `-Σ_d [log_std_d + ln√(2π) + 0.5·((μ_d - a_d)/σ_d)²]`: `[batch]`
pub fn gaussian_log_prob<B: Backend>(
    mean: Tensor<B, 2>,
    log_std: Tensor<B, 1>,
    action: Tensor<B, 2>,
) -> Tensor<B, 1> {
    let [batch, _] = mean.dims();
    let log_std = log_std.unsqueeze::<2>();
    let std = log_std.clone().exp();

    let delta = ((mean - action) / std).powf_scalar(2.0) * 0.5;
    let log_prob = (log_std + delta).add_scalar(SQRT_2PI_LOG).neg();

    log_prob.sum_dim(1).reshape([batch])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{to_vec_f32, Rows, ToTensor};
    use burn::backend::ndarray::{NdArray, NdArrayDevice};
    use rand::{rngs::StdRng, SeedableRng};

    type TestBackend = NdArray;

    fn policy(state_dim: usize, action_dim: usize) -> PolicyNetwork<TestBackend> {
        let mut rng = StdRng::seed_from_u64(1);
        PolicyNetworkConfig::new(state_dim, action_dim)
            .with_hidden_dim(16)
            .init_with_rng(&NdArrayDevice::default(), &mut rng)
    }

    #[test]
    fn test_sqrt_2pi_log_constant() {
        let expected = (2.0 * std::f64::consts::PI).sqrt().ln() as f32;
        assert!((SQRT_2PI_LOG - expected).abs() < 1e-7);
    }

    #[test]
    fn test_standard_normal_at_mean() {
        let device = NdArrayDevice::default();

        // mean = 0, std = 1, action = 0 over three dimensions
        let mean = Tensor::<TestBackend, 2>::zeros([1, 3], &device);
        let log_std = Tensor::<TestBackend, 1>::zeros([3], &device);
        let action = Tensor::<TestBackend, 2>::zeros([1, 3], &device);

        let log_prob = to_vec_f32(gaussian_log_prob(mean, log_std, action)).unwrap();

        assert_eq!(log_prob.len(), 1);
        assert!((log_prob[0] - (-3.0 * SQRT_2PI_LOG)).abs() < 1e-6);
    }

    #[test]
    fn test_matches_closed_form_density() {
        let device = NdArrayDevice::default();

        let mean: Tensor<TestBackend, 2> = Rows::new(&[0.5_f32, -1.0], 2).to_tensor(&device);
        let log_std: Tensor<TestBackend, 1> = vec![0.2_f32, -0.7].to_tensor(&device);
        let action: Tensor<TestBackend, 2> = Rows::new(&[1.0_f32, -1.3], 2).to_tensor(&device);

        let got = to_vec_f32(gaussian_log_prob(mean, log_std, action)).unwrap()[0] as f64;

        // Product of two univariate normal densities
        let density = |x: f64, mu: f64, sigma: f64| {
            (-(x - mu).powi(2) / (2.0 * sigma * sigma)).exp()
                / ((2.0 * std::f64::consts::PI).sqrt() * sigma)
        };
        let expected = (density(1.0, 0.5, 0.2f64.exp()) * density(-1.3, -1.0, (-0.7f64).exp())).ln();

        assert!((got - expected).abs() < 1e-5, "got {got}, expected {expected}");
    }

    #[test]
    fn test_log_prob_from_noise_matches_log_prob() {
        let device = NdArrayDevice::default();
        let actor = policy(4, 2);

        let states = Tensor::<TestBackend, 2>::random([6, 4], Distribution::Uniform(-1.0, 1.0), &device);
        let (action, noise) = actor.sample_action_with_noise(states.clone());

        let from_action = to_vec_f32(actor.log_prob(states, action)).unwrap();
        let from_noise = to_vec_f32(actor.log_prob_from_noise(noise)).unwrap();

        for (a, b) in from_action.iter().zip(&from_noise) {
            assert!((a - b).abs() < 1e-4, "{a} vs {b}");
        }
    }

    #[test]
    fn test_sample_shapes_and_initial_log_std() {
        let device = NdArrayDevice::default();
        let actor = policy(3, 2);

        let states = Tensor::<TestBackend, 2>::zeros([5, 3], &device);
        let (action, noise) = actor.sample_action_with_noise(states);

        assert_eq!(action.dims(), [5, 2]);
        assert_eq!(noise.dims(), [5, 2]);
        assert_eq!(to_vec_f32(actor.log_std()).unwrap(), vec![-0.5, -0.5]);
    }

    #[test]
    fn test_deterministic_action_in_unit_interval() {
        let device = NdArrayDevice::default();
        let actor = policy(3, 2);

        let states = Tensor::<TestBackend, 2>::random([8, 3], Distribution::Uniform(-5.0, 5.0), &device);
        let actions = to_vec_f32(actor.deterministic_action(states)).unwrap();

        assert!(actions.iter().all(|a| *a > 0.0 && *a < 1.0));
    }

    #[test]
    fn test_same_inputs_give_unit_ratio() {
        let device = NdArrayDevice::default();
        let actor = policy(2, 1);

        let states = Tensor::<TestBackend, 2>::random([4, 2], Distribution::Default, &device);
        let (action, _) = actor.sample_action_with_noise(states.clone());

        let old = actor.log_prob(states.clone(), action.clone());
        let new = actor.log_prob(states, action);
        let ratio = to_vec_f32((new - old).exp()).unwrap();

        assert!(ratio.iter().all(|r| *r == 1.0));
    }
}
