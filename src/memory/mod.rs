//! Experience storage

pub mod rollout;

pub use rollout::{RolloutBatch, RolloutBuffer, RolloutTensors, Transition};
