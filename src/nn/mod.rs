//! Neural network building blocks for the actor and critic

pub mod mlp;
pub mod orthogonal;

pub use mlp::{MLPConfig, MLP};
pub use orthogonal::{orthogonal_linear, orthogonal_weights};
