//! Trainable agent trait: the boundary between the PPO core and the training loop
//!
//! The environment loop (reset/step, episode bookkeeping, reward shaping)
//! lives outside this crate. It talks to an agent only through this trait:
//! - ask for an action (and the noise that produced it)
//! - hand back the transition
//! - check whether the buffer needs draining, and learn

use crate::error::Result;

/// Training metrics returned after each learning pass
///
/// Values are averaged over the minibatch updates of the pass.
#[derive(Clone, Debug, Default)]
pub struct TrainingMetrics {
    /// Clipped surrogate loss (negated objective)
    pub policy_loss: f32,

    /// Smooth-L1 critic loss before return-scale normalization
    pub value_loss: f32,

    /// Entropy proxy `mean(p · log p)` of the new policy on the minibatch
    pub entropy: f32,

    /// Approximate KL divergence `mean(old_log_prob - new_log_prob)`
    pub approx_kl: f32,

    /// Fraction of probability ratios outside `[1 - ε, 1 + ε]`
    pub clip_fraction: f32,

    /// Number of gradient updates performed
    pub n_updates: usize,

    /// Number of transitions the pass learned from
    pub n_transitions: usize,
}

/// Trait for on-policy agents driven by an external control loop
///
/// # Example
///
/// ```ignore
/// let (action, noise) = agent.choose_action(&state)?;
/// let (next_state, reward, done) = env.step(&action);
/// agent.store_transition(&state, &action, reward, done, &noise)?;
///
/// if let Some(metrics) = agent.learn_if_ready(max_episode_len)? {
///     log::info!("policy loss {}", metrics.policy_loss);
/// }
/// ```
pub trait TrainableAgent {
    /// Sample an action for `state`, returning `(action, noise)`
    ///
    /// The noise must be passed back through [`store_transition`](Self::store_transition).
    fn choose_action(&self, state: &[f32]) -> Result<(Vec<f32>, Vec<f32>)>;

    /// Record one transition of the current rollout
    fn store_transition(
        &mut self,
        state: &[f32],
        action: &[f32],
        reward: f32,
        done: bool,
        noise: &[f32],
    ) -> Result<()>;

    /// True when the buffer can no longer hold a full episode of `max_episode_len` steps
    ///
    /// Check this after every step.
    fn ready_to_learn(&self, max_episode_len: usize) -> bool;

    /// Run one learning pass on the collected rollout, then clear it
    fn learn(&mut self) -> Result<TrainingMetrics>;

    /// Get total number of transitions stored since creation
    fn total_steps(&self) -> usize;

    /// Learn only if [`ready_to_learn`](Self::ready_to_learn) says so
    fn learn_if_ready(&mut self, max_episode_len: usize) -> Result<Option<TrainingMetrics>> {
        if self.ready_to_learn(max_episode_len) {
            self.learn().map(Some)
        } else {
            Ok(None)
        }
    }
}
