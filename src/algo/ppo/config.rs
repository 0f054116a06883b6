use burn::prelude::*;

use crate::error::PpoError;

/// Configuration for the [`PPOTrainer`](super::PPOTrainer)
///
/// Immutable once the trainer is built; several trainers with different
/// configurations can coexist.
///
/// ```ignore
/// let config = PPOConfig::new(state_dim, action_dim)
///     .with_hidden_dim(64)
///     .with_batch_size(128)
///     .with_seed(Some(42));
/// ```
#[derive(Config, Debug)]
pub struct PPOConfig {
    /// Dimension of the state vector
    pub state_dim: usize,
    /// Dimension of the continuous action vector
    pub action_dim: usize,

    /// Adam learning rate shared by actor and critic
    ///
    /// **Default:** `1e-4`
    #[config(default = 1e-4)]
    pub learning_rate: f64,
    /// The discount factor γ, stored as the mask of non-terminal steps
    ///
    /// **Default:** `0.99`
    #[config(default = 0.99)]
    pub gamma: f32,
    /// Soft update rate τ
    ///
    /// Reserved for target-network variants; the PPO update never reads it.
    ///
    /// **Default:** `2^-8`
    #[config(default = 0.00390625)]
    pub tau: f32,
    /// Clipping parameter ε of the probability ratio
    ///
    /// **Default:** `0.3`
    #[config(default = 0.3)]
    pub ratio_clip: f32,
    /// Weight of the entropy term in the combined loss
    ///
    /// **Default:** `0.01`
    #[config(default = 0.01)]
    pub lambda_entropy: f32,
    /// GAE λ
    ///
    /// **Default:** `0.98`
    #[config(default = 0.98)]
    pub lambda_gae_adv: f32,

    /// Width of the three hidden layers of both networks
    ///
    /// **Default:** `512`
    #[config(default = 512)]
    pub hidden_dim: usize,
    /// Minibatch size, also the chunk size of the batched critic evaluation
    ///
    /// **Default:** `512`
    #[config(default = 512)]
    pub batch_size: usize,
    /// Rollout buffer capacity; must exceed the longest expected episode
    ///
    /// **Default:** `4146` (`2^12 + 50`)
    #[config(default = 4146)]
    pub buffer_capacity: usize,
    /// Each learning pass runs `repeat_times * len / batch_size` updates
    ///
    /// **Default:** `16`
    #[config(default = 16)]
    pub repeat_times: usize,

    /// Initial value of every `log_std` entry
    ///
    /// **Default:** `-0.5`
    #[config(default = "-0.5")]
    pub log_std_init: f32,
    /// Orthogonal gain of the actor's output layer
    ///
    /// **Default:** `0.1`
    #[config(default = 0.1)]
    pub actor_output_gain: f64,
    /// Orthogonal gain of the critic's output layer
    ///
    /// **Default:** `0.5`
    #[config(default = 0.5)]
    pub critic_output_gain: f64,
    /// Constant bias of both output layers
    ///
    /// **Default:** `1e-6`
    #[config(default = 1e-6)]
    pub output_bias: f64,
    /// Additive ε of the advantage and return-scale normalizations
    ///
    /// **Default:** `1e-5`
    #[config(default = 1e-5)]
    pub epsilon: f32,
    /// Clip gradients by value before each optimizer step
    ///
    /// **Default:** `None`
    #[config(default = "None")]
    pub gradient_clip: Option<f32>,
    /// Seed for the backend and minibatch RNGs
    ///
    /// **Default:** `None` (entropy-seeded)
    #[config(default = "None")]
    pub seed: Option<u64>,
}

impl PPOConfig {
    /// Check every hyperparameter against its valid range
    pub fn validate(&self) -> crate::error::Result<()> {
        fn invalid(msg: String) -> crate::error::Result<()> {
            Err(PpoError::InvalidConfig(msg))
        }

        if self.state_dim == 0 || self.action_dim == 0 {
            return invalid(format!(
                "state_dim ({}) and action_dim ({}) must be positive",
                self.state_dim, self.action_dim
            ));
        }
        if self.hidden_dim == 0 {
            return invalid("hidden_dim must be positive".to_string());
        }
        if !(self.learning_rate > 0.0) {
            return invalid(format!("learning_rate must be positive, got {}", self.learning_rate));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return invalid(format!("gamma must be in [0, 1], got {}", self.gamma));
        }
        if !(0.0..=1.0).contains(&self.lambda_gae_adv) {
            return invalid(format!("lambda_gae_adv must be in [0, 1], got {}", self.lambda_gae_adv));
        }
        if !(self.ratio_clip > 0.0 && self.ratio_clip < 1.0) {
            return invalid(format!("ratio_clip must be in (0, 1), got {}", self.ratio_clip));
        }
        if !self.lambda_entropy.is_finite() {
            return invalid(format!("lambda_entropy must be finite, got {}", self.lambda_entropy));
        }
        // The return-scale normalization needs a sample std, which needs two samples
        if self.batch_size < 2 {
            return invalid(format!("batch_size must be at least 2, got {}", self.batch_size));
        }
        if self.buffer_capacity == 0 {
            return invalid("buffer_capacity must be positive".to_string());
        }
        if self.repeat_times == 0 {
            return invalid("repeat_times must be positive".to_string());
        }
        if !(self.epsilon > 0.0) {
            return invalid(format!("epsilon must be positive, got {}", self.epsilon));
        }
        if let Some(clip) = self.gradient_clip {
            if !(clip > 0.0) {
                return invalid(format!("gradient_clip must be positive, got {clip}"));
            }
        }
        Ok(())
    }
}
