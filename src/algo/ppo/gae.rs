//! Generalized Advantage Estimation over a masked rollout.
//!
//! Each transition carries a single mask, `0` at a terminal step and `γ`
//! otherwise, so the discount and the episode reset are one multiplier:
//!
//! ```text
//! R_t   = r_t + m_t · R_{t+1}
//! A_t   = r_t + m_t · (V_{t+1} + λ·A_{t+1}) - V_t
//!       = δ_t + γλ·A_{t+1}                 (inside an episode)
//! ```
//!
//! Advantages are standardized over the whole rollout, never per minibatch.
//!
//! ## References
//!
//! - Schulman et al., "High-Dimensional Continuous Control Using
//!   Generalized Advantage Estimation" (2016)

use crate::error::{PpoError, Result};

/// Returns and standardized advantages, one entry per buffered transition
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Advantages {
    pub returns: Vec<f32>,
    pub advantages: Vec<f32>,
}

/// GAE with a fixed λ and normalization ε
#[derive(Clone, Copy, Debug)]
pub struct AdvantageEstimator {
    pub lambda: f32,
    pub epsilon: f32,
}

impl AdvantageEstimator {
    pub fn new(lambda: f32, epsilon: f32) -> Self {
        Self { lambda, epsilon }
    }

    /// Backward GAE pass followed by full-batch standardization
    ///
    /// `rewards`, `masks` and `values` must have the same length and be in
    /// temporal (insertion) order.
    pub fn compute(&self, rewards: &[f32], masks: &[f32], values: &[f32]) -> Result<Advantages> {
        let n = rewards.len();
        for (field, len) in [("masks", masks.len()), ("values", values.len())] {
            if len != n {
                return Err(PpoError::DimensionMismatch {
                    field,
                    expected: n,
                    actual: len,
                });
            }
        }

        let (returns, mut advantages) =
            discounted_returns_and_advantages(rewards, masks, values, self.lambda);
        check_finite("return", &returns)?;
        check_finite("advantage", &advantages)?;
        standardize(&mut advantages, self.epsilon);

        Ok(Advantages { returns, advantages })
    }
}

/// Raw backward recursion, without standardization
///
/// Returns `(returns, advantages)`.
pub fn discounted_returns_and_advantages(
    rewards: &[f32],
    masks: &[f32],
    values: &[f32],
    lambda: f32,
) -> (Vec<f32>, Vec<f32>) {
    let n = rewards.len();
    let mut returns = vec![0.0f32; n];
    let mut advantages = vec![0.0f32; n];

    let mut pre_return = 0.0f32;
    let mut pre_advantage = 0.0f32;

    for i in (0..n).rev() {
        returns[i] = rewards[i] + masks[i] * pre_return;
        pre_return = returns[i];

        // pre = V' + λ·A'  ⇒  A = r + γV' + γλA' - V
        advantages[i] = rewards[i] + masks[i] * pre_advantage - values[i];
        pre_advantage = values[i] + advantages[i] * lambda;
    }

    (returns, advantages)
}

/// Non-finite entries come from NaN/Inf rewards, states or critic outputs.
/// Update index 0: nothing has been applied yet in this pass.
fn check_finite(quantity: &'static str, values: &[f32]) -> Result<()> {
    match values.iter().find(|v| !v.is_finite()) {
        Some(&value) => Err(PpoError::NonFinite {
            quantity,
            value,
            update: 0,
        }),
        None => Ok(()),
    }
}

/// Standard score in place: `(x - mean) / (std + ε)`
///
/// Uses the unbiased (n - 1) sample standard deviation. A single element has
/// standard deviation 0. Zero variance leaves every entry at 0.
pub fn standardize(values: &mut [f32], epsilon: f32) {
    let n = values.len();
    if n == 0 {
        return;
    }

    let mean = values.iter().sum::<f32>() / n as f32;
    let std = if n > 1 {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / (n - 1) as f32;
        var.sqrt()
    } else {
        0.0
    };

    let scale = std + epsilon;
    values.iter_mut().for_each(|v| *v = (*v - mean) / scale);
}


#[cfg(test)]
mod proptest_gae {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Standardized advantages have mean ≈ 0 and std ≈ 1 for non-degenerate batches
        #[test]
        fn test_standardized_moments(
            raw in prop::collection::vec(-100.0f32..100.0, 2..200),
        ) {
            let n = raw.len() as f32;
            let raw_mean = raw.iter().sum::<f32>() / n;
            let raw_std = (raw.iter().map(|a| (a - raw_mean).powi(2)).sum::<f32>() / (n - 1.0)).sqrt();
            prop_assume!(raw_std > 0.1);

            let mut advantages = raw.clone();
            standardize(&mut advantages, 1e-5);

            let mean = advantages.iter().sum::<f32>() / n;
            let std = (advantages.iter().map(|a| (a - mean).powi(2)).sum::<f32>() / (n - 1.0)).sqrt();

            prop_assert!(mean.abs() < 1e-3, "mean {}", mean);
            prop_assert!((std - 1.0).abs() < 1e-2, "std {}", std);
        }

        /// GAE outputs stay finite for bounded rewards and values
        #[test]
        fn test_gae_always_finite(
            rewards in prop::collection::vec(-100.0f32..100.0, 1..100),
            gamma in 0.0f32..=1.0,
            lambda in 0.0f32..=1.0,
        ) {
            let n = rewards.len();
            let masks: Vec<f32> = (0..n).map(|i| if i % 17 == 16 { 0.0 } else { gamma }).collect();
            let values: Vec<f32> = (0..n).map(|i| (i as f32) * 0.1).collect();

            let out = AdvantageEstimator::new(lambda, 1e-5).compute(&rewards, &masks, &values).unwrap();

            prop_assert!(out.returns.iter().all(|r| r.is_finite()));
            prop_assert!(out.advantages.iter().all(|a| a.is_finite()));
        }
    }
}
