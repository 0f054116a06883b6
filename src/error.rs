//! Error type shared by the buffer, the networks and the trainer.

use thiserror::Error;

/// Errors surfaced by the PPO core
#[derive(Debug, Error)]
pub enum PpoError {
    /// `store` was called on a buffer whose cursor already reached capacity
    #[error("rollout buffer is full ({capacity} transitions), learn() before storing more")]
    BufferFull { capacity: usize },

    /// A vector handed to the core does not have the configured width
    #[error("{field} has {actual} elements, expected {expected}")]
    DimensionMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A hyperparameter is outside its valid range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A loss or parameter became NaN/Inf during an update pass
    #[error("non-finite {quantity} ({value}) at update {update}")]
    NonFinite {
        quantity: &'static str,
        value: f32,
        update: usize,
    },

    /// Reading tensor data back to the host failed
    #[error("tensor data conversion failed: {0}")]
    TensorData(String),
}

pub type Result<T> = std::result::Result<T, PpoError>;
