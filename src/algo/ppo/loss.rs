//! Loss terms of the PPO update
//!
//! All functions return single-element tensors so they can be combined and
//! backpropagated as one objective.

use burn::{prelude::*, tensor::backend::Backend};

/// Clipped surrogate loss
///
/// L^clip(θ) = E[min(r·A, clip(r, 1 - ε, 1 + ε)·A)], negated for minimization.
///
/// - `ratio`, `advantages`: `[batch]`
pub fn clipped_surrogate<B: Backend>(
    ratio: Tensor<B, 1>,
    advantages: Tensor<B, 1>,
    clip: f32,
) -> Tensor<B, 1> {
    let surrogate1 = advantages.clone() * ratio.clone();
    let surrogate2 = advantages * ratio.clamp(1.0 - clip, 1.0 + clip);

    surrogate1.min_pair(surrogate2).mean().neg()
}

/// Entropy proxy `mean(p · log p)` from log-probabilities
///
/// This is the negated sample entropy, so adding it with a positive weight to
/// a minimized loss rewards exploration.
pub fn entropy_proxy<B: Backend>(log_prob: Tensor<B, 1>) -> Tensor<B, 1> {
    (log_prob.clone().exp() * log_prob).mean()
}

/// `std(returns) + ε` with the unbiased sample standard deviation
///
/// Scales the critic loss to the policy loss magnitude.
pub fn return_scale<B: Backend>(returns: Tensor<B, 1>, epsilon: f32) -> Tensor<B, 1> {
    returns.var(0).sqrt().add_scalar(epsilon)
}

/// Fraction of ratios outside `[1 - ε, 1 + ε]`
pub fn clip_fraction<B: Backend>(ratio: Tensor<B, 1>, clip: f32) -> Tensor<B, 1> {
    let below = ratio.clone().lower_elem(1.0 - clip).float();
    let above = ratio.greater_elem(1.0 + clip).float();

    (below + above).mean()
}
