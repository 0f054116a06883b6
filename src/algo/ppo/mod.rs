//! Proximal Policy Optimization (PPO) for continuous action spaces
//!
//! PPO is an on-policy actor-critic algorithm that limits how far each update
//! can move the policy. It maximizes the clipped surrogate objective
//!
//! ```text
//! L^CLIP(θ) = E[min(r_t(θ)·A_t, clip(r_t(θ), 1 - ε, 1 + ε)·A_t)]
//! r_t(θ)    = π_θ(a_t|s_t) / π_θ_old(a_t|s_t)
//! ```
//!
//! A learning pass:
//! 1. evaluates the critic on the whole rollout, without gradients
//! 2. rebuilds `log π_old` from the stored sampling noise
//! 3. computes returns and GAE advantages, standardizing the advantages
//! 4. runs `repeat_times * len / batch_size` minibatch updates, each one
//!    backward pass through surrogate + scaled Huber critic loss + entropy term
//!
//! The actor is a diagonal Gaussian whose mean comes from an MLP and whose
//! `log_std` is a free parameter shared by all states.
//!
//! ## References
//!
//! - Schulman et al., "Proximal Policy Optimization Algorithms" (2017)

mod config;
mod gae;
mod loss;
mod policy;
mod trainer;
mod value;

pub use config::PPOConfig;
pub use gae::{discounted_returns_and_advantages, standardize, AdvantageEstimator, Advantages};
pub use loss::{clip_fraction, clipped_surrogate, entropy_proxy, return_scale};
pub use policy::{gaussian_log_prob, PolicyNetwork, PolicyNetworkConfig, SQRT_2PI_LOG};
pub use trainer::PPOTrainer;
pub use value::{ValueNetwork, ValueNetworkConfig};
