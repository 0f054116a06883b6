//! Proximal Policy Optimization for continuous-action control, built on burn.
//!
//! The crate keeps a diagonal-Gaussian actor and a value critic, collects
//! on-policy transitions into a fixed-capacity [`RolloutBuffer`](memory::RolloutBuffer),
//! and runs clipped-surrogate updates once the buffer is nearly full.
//!
//! ```ignore
//! use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};
//! use rl_ppo::algo::ppo::{PPOConfig, PPOTrainer};
//!
//! let config = PPOConfig::new(3, 1).with_hidden_dim(64);
//! let mut trainer = PPOTrainer::<Autodiff<NdArray>>::new(config, NdArrayDevice::default())?;
//!
//! let (action, noise) = trainer.choose_action(&state)?;
//! // ... step the environment ...
//! trainer.store_transition(&state, &action, reward, done, &noise)?;
//! if trainer.ready_to_learn(max_episode_len) {
//!     let metrics = trainer.learn()?;
//! }
//! ```

pub mod algo;
pub mod error;
pub mod memory;
pub mod nn;
pub mod traits;

pub use error::{PpoError, Result};
