use burn::{
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    nn::loss::{HuberLoss, HuberLossConfig, Reduction},
    optim::{adaptor::OptimizerAdaptor, Adam, AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::{backend::AutodiffBackend, TensorData},
};
use rand::{rngs::StdRng, Rng, SeedableRng};

use super::{
    gae::{AdvantageEstimator, Advantages},
    loss::{clip_fraction, clipped_surrogate, entropy_proxy, return_scale},
    PPOConfig, PolicyNetwork, PolicyNetworkConfig, ValueNetwork, ValueNetworkConfig,
};
use crate::{
    error::{PpoError, Result},
    memory::{RolloutBuffer, RolloutTensors, Transition},
    traits::{to_vec_f32, Rows, ToTensor, TrainableAgent, TrainingMetrics},
};

/// PPO trainer for continuous action spaces
///
/// Owns the actor, the critic, their Adam optimizers and the rollout buffer.
/// The trainer alternates between two phases driven by the caller:
/// - collecting: [`choose_action`](Self::choose_action) and
///   [`store_transition`](Self::store_transition) after every environment step
/// - updating: [`learn`](Self::learn) once [`ready_to_learn`](Self::ready_to_learn)
///   reports that another full episode might not fit
///
/// ### Generics
/// - `B` - A burn autodiff backend (e.g. `Autodiff<NdArray>`, `Autodiff<Wgpu>`)
pub struct PPOTrainer<B: AutodiffBackend> {
    // Networks
    actor: PolicyNetwork<B>,
    critic: ValueNetwork<B>,

    // Optimizers (stored to keep Adam moments across passes)
    actor_optimizer: OptimizerAdaptor<Adam, PolicyNetwork<B>, B>,
    critic_optimizer: OptimizerAdaptor<Adam, ValueNetwork<B>, B>,

    buffer: RolloutBuffer,
    estimator: AdvantageEstimator,
    value_loss: HuberLoss,
    config: PPOConfig,

    device: B::Device,
    rng: StdRng,

    // Training state
    total_steps: usize,
    passes: usize,
}

impl<B: AutodiffBackend> PPOTrainer<B> {
    /// Create a new PPO trainer
    ///
    /// Validates `config`, seeds the backend and minibatch RNGs when
    /// `config.seed` is set, and builds both networks on `device`.
    pub fn new(config: PPOConfig, device: B::Device) -> Result<Self> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => {
                B::seed(seed);
                StdRng::seed_from_u64(seed)
            }
            None => StdRng::from_entropy(),
        };

        let actor = PolicyNetworkConfig::new(config.state_dim, config.action_dim)
            .with_hidden_dim(config.hidden_dim)
            .with_log_std_init(config.log_std_init)
            .with_output_gain(config.actor_output_gain)
            .with_output_bias(config.output_bias)
            .init_with_rng(&device, &mut rng);

        let critic = ValueNetworkConfig::new(config.state_dim)
            .with_hidden_dim(config.hidden_dim)
            .with_output_gain(config.critic_output_gain)
            .with_output_bias(config.output_bias)
            .init_with_rng(&device, &mut rng);

        let optimizer = AdamConfig::new()
            .with_grad_clipping(config.gradient_clip.map(GradientClippingConfig::Value));

        log::debug!(
            "PPO trainer: state_dim={}, action_dim={}, hidden_dim={}, capacity={}",
            config.state_dim,
            config.action_dim,
            config.hidden_dim,
            config.buffer_capacity
        );

        Ok(Self {
            actor,
            critic,
            actor_optimizer: optimizer.init(),
            critic_optimizer: optimizer.init(),
            buffer: RolloutBuffer::new(config.buffer_capacity, config.state_dim, config.action_dim),
            estimator: AdvantageEstimator::new(config.lambda_gae_adv, config.epsilon),
            value_loss: HuberLossConfig::new(1.0).init(),
            config,
            device,
            rng,
            total_steps: 0,
            passes: 0,
        })
    }

    pub fn config(&self) -> &PPOConfig {
        &self.config
    }

    pub fn actor(&self) -> &PolicyNetwork<B> {
        &self.actor
    }

    pub fn critic(&self) -> &ValueNetwork<B> {
        &self.critic
    }

    pub fn buffer(&self) -> &RolloutBuffer {
        &self.buffer
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Get total number of transitions stored since creation
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Number of completed learning passes
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Sample an action for a single state
    ///
    /// Returns `(action, noise)`; the noise must come back through
    /// [`store_transition`](Self::store_transition).
    pub fn choose_action(&self, state: &[f32]) -> Result<(Vec<f32>, Vec<f32>)> {
        let state = self.state_tensor(state)?.inner();
        let (action, noise) = self.actor.valid().sample_action_with_noise(state);

        Ok((to_vec_f32(action)?, to_vec_f32(noise)?))
    }

    /// Sigmoid-squashed mean action in (0, 1), for evaluation
    pub fn deterministic_action(&self, state: &[f32]) -> Result<Vec<f32>> {
        let state = self.state_tensor(state)?.inner();
        to_vec_f32(self.actor.valid().deterministic_action(state))
    }

    /// Store a transition in the rollout buffer
    ///
    /// The mask is `0` when `done`, `γ` otherwise.
    pub fn store_transition(
        &mut self,
        state: &[f32],
        action: &[f32],
        reward: f32,
        done: bool,
        noise: &[f32],
    ) -> Result<()> {
        let mask = if done { 0.0 } else { self.config.gamma };
        self.buffer.store(Transition {
            state,
            action,
            reward,
            mask,
            noise,
        })?;
        self.total_steps += 1;
        Ok(())
    }

    /// Check whether the buffer might not fit one more episode of `max_episode_len` steps
    pub fn ready_to_learn(&self, max_episode_len: usize) -> bool {
        self.buffer.remaining() < max_episode_len
    }

    /// Run one PPO learning pass on the buffered rollout, then clear the buffer
    ///
    /// On a non-finite loss the pass stops before the offending optimizer
    /// step and returns [`PpoError::NonFinite`]; the buffer is left intact.
    pub fn learn(&mut self) -> Result<TrainingMetrics> {
        let n = self.buffer.len();
        if n == 0 {
            log::warn!("learn() called with an empty rollout buffer");
            return Ok(TrainingMetrics::default());
        }
        log::info!("training on {n}/{} transitions", self.buffer.capacity());

        let (tensors, old_log_prob, Advantages { returns, advantages }) = self.prepare_pass()?;
        let RolloutTensors {
            states, actions, ..
        } = tensors;
        let returns: Tensor<B, 1> = returns.to_tensor(&self.device);
        let advantages: Tensor<B, 1> = advantages.to_tensor(&self.device);

        let batch_size = self.config.batch_size;
        let clip = self.config.ratio_clip;
        let iterations = self.config.repeat_times * n / batch_size;
        if iterations == 0 {
            log::warn!(
                "{n} transitions with repeat_times={} and batch_size={batch_size} give no updates",
                self.config.repeat_times
            );
        }

        let mut totals = TrainingMetrics {
            n_transitions: n,
            ..Default::default()
        };

        for update in 0..iterations {
            let indices = self.sample_indices(n, batch_size);

            let state = states.clone().select(0, indices.clone());
            let action = actions.clone().select(0, indices.clone());
            let old_return = returns.clone().select(0, indices.clone());
            let old_log_prob = old_log_prob.clone().select(0, indices.clone());
            let adv = advantages.clone().select(0, indices);

            // Probability ratio: π_θ(a|s) / π_θ_old(a|s) = exp(log π_θ - log π_θ_old)
            let new_log_prob = self.actor.log_prob(state.clone(), action);
            let ratio = (new_log_prob.clone() - old_log_prob.clone()).exp();

            let surrogate = clipped_surrogate(ratio.clone(), adv, clip);
            let entropy = entropy_proxy(new_log_prob.clone());

            let value = self.critic.value(state);
            let value_loss = self
                .value_loss
                .forward(value, old_return.clone(), Reduction::Mean);

            // Minimize surrogate + scaled critic loss + λ_entropy · mean(p log p)
            let united = surrogate.clone()
                + value_loss.clone() / return_scale(old_return, self.config.epsilon)
                + entropy.clone() * self.config.lambda_entropy;

            let united_value: f32 = united.clone().into_scalar().elem();
            if !united_value.is_finite() {
                log::error!("aborting learning pass: combined loss is {united_value} at update {update}");
                return Err(PpoError::NonFinite {
                    quantity: "combined loss",
                    value: united_value,
                    update,
                });
            }

            totals.policy_loss += surrogate.into_scalar().elem::<f32>();
            totals.value_loss += value_loss.into_scalar().elem::<f32>();
            totals.entropy += entropy.into_scalar().elem::<f32>();
            totals.approx_kl += (old_log_prob - new_log_prob).mean().into_scalar().elem::<f32>();
            totals.clip_fraction += clip_fraction(ratio, clip).into_scalar().elem::<f32>();
            totals.n_updates += 1;

            // One backward pass, gradients split per network
            let mut grads = united.backward();
            let actor_grads = GradientsParams::from_module(&mut grads, &self.actor);
            let critic_grads = GradientsParams::from_module(&mut grads, &self.critic);

            let lr = self.config.learning_rate;
            self.actor = self.actor_optimizer.step(lr, self.actor.clone(), actor_grads);
            self.critic = self.critic_optimizer.step(lr, self.critic.clone(), critic_grads);
        }

        self.check_log_std(iterations)?;
        self.buffer.clear();
        self.passes += 1;

        let metrics = average(totals);
        log::info!(
            "pass {}: {} updates, policy_loss={:.4}, value_loss={:.4}, entropy={:.4}, approx_kl={:.5}, clip_fraction={:.3}",
            self.passes,
            metrics.n_updates,
            metrics.policy_loss,
            metrics.value_loss,
            metrics.entropy,
            metrics.approx_kl,
            metrics.clip_fraction
        );
        Ok(metrics)
    }

    /// Gradient-free preparation of a pass
    ///
    /// Critic values in `batch_size` chunks, old log-probabilities from the
    /// stored noise and the current `log_std`, then GAE.
    fn prepare_pass(&self) -> Result<(RolloutTensors<B>, Tensor<B, 1>, Advantages)> {
        let batch = self.buffer.sample_all();
        let n = batch.len();

        let critic = self.critic.valid();
        let mut values = Vec::with_capacity(n);
        for start in (0..n).step_by(self.config.batch_size) {
            let end = (start + self.config.batch_size).min(n);
            let chunk: Tensor<B::InnerBackend, 2> =
                Rows::new(batch.states_in(start..end), batch.state_dim()).to_tensor(&self.device);
            values.extend(to_vec_f32(critic.value(chunk))?);
        }

        let tensors = batch.to_tensors::<B>(&self.device);
        let old_log_prob = Tensor::from_inner(
            self.actor
                .valid()
                .log_prob_from_noise(tensors.noises.clone().inner()),
        );

        let advantages = self.estimator.compute(batch.rewards(), batch.masks(), &values)?;
        log::debug!(
            "mean return {:.4}, mean value {:.4}",
            mean(&advantages.returns),
            mean(&values)
        );

        Ok((tensors, old_log_prob, advantages))
    }

    /// `batch_size` indices drawn uniformly with replacement from `0..n`
    fn sample_indices(&mut self, n: usize, batch_size: usize) -> Tensor<B, 1, Int> {
        let indices: Vec<i64> = (0..batch_size)
            .map(|_| self.rng.gen_range(0..n) as i64)
            .collect();

        Tensor::<B, 1, Int>::from_data(
            TensorData::new(indices, [batch_size]).convert::<B::IntElem>(),
            &self.device,
        )
    }

    fn check_log_std(&self, update: usize) -> Result<()> {
        let log_std = to_vec_f32(self.actor.log_std())?;
        match log_std.iter().find(|v| !v.is_finite()) {
            Some(&value) => {
                log::error!("log_std diverged after {update} updates: {log_std:?}");
                Err(PpoError::NonFinite {
                    quantity: "log_std",
                    value,
                    update,
                })
            }
            None => Ok(()),
        }
    }

    fn state_tensor(&self, state: &[f32]) -> Result<Tensor<B, 2>> {
        if state.len() != self.config.state_dim {
            return Err(PpoError::DimensionMismatch {
                field: "state",
                expected: self.config.state_dim,
                actual: state.len(),
            });
        }
        Ok(Rows::new(state, self.config.state_dim).to_tensor(&self.device))
    }
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f32>() / values.len() as f32
    }
}

fn average(totals: TrainingMetrics) -> TrainingMetrics {
    if totals.n_updates == 0 {
        return totals;
    }
    let n = totals.n_updates as f32;
    TrainingMetrics {
        policy_loss: totals.policy_loss / n,
        value_loss: totals.value_loss / n,
        entropy: totals.entropy / n,
        approx_kl: totals.approx_kl / n,
        clip_fraction: totals.clip_fraction / n,
        ..totals
    }
}

/// Implementation of the training-loop boundary for PPO
impl<B: AutodiffBackend> TrainableAgent for PPOTrainer<B> {
    fn choose_action(&self, state: &[f32]) -> Result<(Vec<f32>, Vec<f32>)> {
        PPOTrainer::choose_action(self, state)
    }

    fn store_transition(
        &mut self,
        state: &[f32],
        action: &[f32],
        reward: f32,
        done: bool,
        noise: &[f32],
    ) -> Result<()> {
        PPOTrainer::store_transition(self, state, action, reward, done, noise)
    }

    fn ready_to_learn(&self, max_episode_len: usize) -> bool {
        PPOTrainer::ready_to_learn(self, max_episode_len)
    }

    fn learn(&mut self) -> Result<TrainingMetrics> {
        PPOTrainer::learn(self)
    }

    fn total_steps(&self) -> usize {
        self.total_steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{
        ndarray::{NdArray, NdArrayDevice},
        Autodiff,
    };

    type TestBackend = Autodiff<NdArray>;

    fn trainer(config: PPOConfig) -> PPOTrainer<TestBackend> {
        PPOTrainer::new(config, NdArrayDevice::default()).unwrap()
    }

    fn small_config() -> PPOConfig {
        PPOConfig::new(2, 1)
            .with_hidden_dim(16)
            .with_batch_size(4)
            .with_buffer_capacity(10)
            .with_repeat_times(2)
            .with_seed(Some(42))
    }

    fn fill(trainer: &mut PPOTrainer<TestBackend>, steps: usize) {
        let mut rng = StdRng::seed_from_u64(9);
        for i in 0..steps {
            let state: [f32; 2] = [rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)];
            let (action, noise) = trainer.choose_action(&state).unwrap();
            let done = i % 4 == 3;
            trainer
                .store_transition(&state, &action, rng.gen_range(-1.0..1.0), done, &noise)
                .unwrap();
        }
    }

    #[test]
    fn test_choose_action_shapes() {
        let trainer = trainer(PPOConfig::new(3, 2).with_hidden_dim(8));
        let (action, noise) = trainer.choose_action(&[0.1, 0.2, 0.3]).unwrap();

        assert_eq!(action.len(), 2);
        assert_eq!(noise.len(), 2);
        assert!(action.iter().chain(&noise).all(|v| v.is_finite()));
    }

    #[test]
    fn test_choose_action_rejects_wrong_state_width() {
        let trainer = trainer(PPOConfig::new(3, 2).with_hidden_dim(8));
        let err = trainer.choose_action(&[0.1, 0.2]).unwrap_err();

        assert!(matches!(err, PpoError::DimensionMismatch { field: "state", .. }));
    }

    #[test]
    fn test_store_transition_builds_mask() {
        let mut trainer = trainer(small_config());
        trainer.store_transition(&[0.0, 1.0], &[0.5], 1.0, false, &[0.2]).unwrap();
        trainer.store_transition(&[1.0, 0.0], &[0.4], 2.0, true, &[0.1]).unwrap();

        let batch = trainer.buffer().sample_all();
        assert_eq!(batch.masks(), &[0.99, 0.0]);
        assert_eq!(batch.rewards(), &[1.0, 2.0]);
        assert_eq!(trainer.total_steps(), 2);
    }

    #[test]
    fn test_ready_to_learn_reserves_one_episode() {
        let mut trainer = trainer(small_config());
        fill(&mut trainer, 6);

        // 4 free slots: an episode of 4 still fits, one of 5 does not
        assert!(!trainer.ready_to_learn(4));
        assert!(trainer.ready_to_learn(5));
    }

    #[test]
    fn test_store_beyond_capacity_fails() {
        let mut trainer = trainer(small_config());
        fill(&mut trainer, 10);

        let err = trainer
            .store_transition(&[0.0, 0.0], &[0.0], 0.0, false, &[0.0])
            .unwrap_err();
        assert!(matches!(err, PpoError::BufferFull { capacity: 10 }));
        assert_eq!(trainer.buffer().len(), trainer.buffer().capacity());
    }

    #[test]
    fn test_learn_clears_buffer_and_updates_networks() {
        let mut trainer = trainer(small_config());
        fill(&mut trainer, 10);

        let log_std_before = to_vec_f32(trainer.actor().log_std()).unwrap();
        let metrics = trainer.learn().unwrap();

        assert_eq!(trainer.buffer().len(), 0);
        // repeat_times * len / batch_size = 2 * 10 / 4
        assert_eq!(metrics.n_updates, 5);
        assert_eq!(metrics.n_transitions, 10);
        assert!(metrics.policy_loss.is_finite());
        assert!(metrics.value_loss.is_finite());
        assert!((0.0..=1.0).contains(&metrics.clip_fraction));

        let log_std_after = to_vec_f32(trainer.actor().log_std()).unwrap();
        assert_ne!(log_std_before, log_std_after);
        assert_eq!(trainer.passes(), 1);
    }

    #[test]
    fn test_non_finite_reward_aborts_and_keeps_buffer() {
        let mut trainer = trainer(small_config());
        fill(&mut trainer, 5);
        trainer
            .store_transition(&[0.1, 0.2], &[0.0], f32::INFINITY, false, &[0.0])
            .unwrap();
        let log_std_before = to_vec_f32(trainer.actor().log_std()).unwrap();

        let err = trainer.learn().unwrap_err();

        assert!(matches!(err, PpoError::NonFinite { .. }));
        assert_eq!(trainer.buffer().len(), 6);
        assert_eq!(trainer.passes(), 0);
        assert_eq!(to_vec_f32(trainer.actor().log_std()).unwrap(), log_std_before);
    }

    #[test]
    fn test_learn_on_empty_buffer_is_noop() {
        let mut trainer = trainer(small_config());
        let metrics = trainer.learn().unwrap();

        assert_eq!(metrics.n_updates, 0);
        assert_eq!(trainer.passes(), 0);
    }

    #[test]
    fn test_learn_without_updates_still_clears() {
        // 2 transitions * 2 repeats / batch of 8 floors to zero updates
        let mut trainer = trainer(small_config().with_batch_size(8));
        fill(&mut trainer, 2);

        let metrics = trainer.learn().unwrap();
        assert_eq!(metrics.n_updates, 0);
        assert!(trainer.buffer().is_empty());
    }

    #[test]
    fn test_learn_if_ready() {
        let mut trainer = trainer(small_config());
        fill(&mut trainer, 3);
        assert!(trainer.learn_if_ready(5).unwrap().is_none());
        assert_eq!(trainer.buffer().len(), 3);

        fill(&mut trainer, 3);
        assert!(trainer.learn_if_ready(5).unwrap().is_some());
        assert!(trainer.buffer().is_empty());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = PPOTrainer::<TestBackend>::new(
            PPOConfig::new(2, 1).with_batch_size(1),
            NdArrayDevice::default(),
        );
        assert!(matches!(result, Err(PpoError::InvalidConfig(_))));
    }

    #[test]
    fn test_deterministic_action_bounds() {
        let trainer = trainer(small_config());
        let action = trainer.deterministic_action(&[3.0, -3.0]).unwrap();

        assert_eq!(action.len(), 1);
        assert!(action[0] > 0.0 && action[0] < 1.0);
    }
}
