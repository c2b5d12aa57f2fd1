//! Clipped-surrogate policy optimization agent.
//!
//! Each [`PpoAgent::train_step`] samples a batch from the experience buffer
//! and freezes it for the whole call:
//!
//! 1. Critic values for the observations and next observations
//! 2. One-step TD advantages `r + γ·V(s')·(1 - done) - V(s)`, normalized
//! 3. Old log-probabilities of the sampled actions, computed once
//! 4. `policy_epochs` clipped-surrogate actor updates
//! 5. `value_epochs` critic regressions onto the TD targets
//!
//! Networks live on burn's autodiff backend; both phases norm-clip
//! gradients inside the Adam optimizer.

use std::fmt;

use burn::tensor::backend::Backend;
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use crate::config::AgentConfig;
use crate::control::{ControlInput, Controller};
use crate::twin::Action;

use super::buffer::{ReplayBuffer, Transition};
use super::nn::AgentBackend;
use super::policy::{GaussianPolicy, SurrogateBatch};
use super::value::ValueNet;

/// Mean losses over the epochs of one train step.
///
/// All zeros when the buffer held too few transitions to train.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrainMetrics {
    pub policy_loss: f32,
    pub value_loss: f32,
    pub entropy: f32,
}

/// Actor-critic agent for continuous actions in [0, 1].
pub struct PpoAgent {
    config: AgentConfig,
    policy: GaussianPolicy<AgentBackend>,
    value: ValueNet<AgentBackend>,
    buffer: ReplayBuffer,
    rng: StdRng,
    training: bool,
}

impl PpoAgent {
    /// Creates an agent for the given observation and action sizes.
    ///
    /// # Panics
    ///
    /// Panics if a dimension, `hidden_dim` or `buffer_capacity` is zero.
    pub fn new(obs_dim: usize, action_dim: usize, config: &AgentConfig, seed: u64) -> Self {
        assert!(obs_dim > 0 && action_dim > 0, "observation and action sizes must be > 0");
        let mut rng = StdRng::seed_from_u64(seed);
        let device: <AgentBackend as Backend>::Device = Default::default();
        let policy = GaussianPolicy::new(
            obs_dim,
            action_dim,
            config.hidden_dim,
            config.learning_rate,
            config.max_grad_norm,
            &mut rng,
            &device,
        );
        let value = ValueNet::new(
            obs_dim,
            config.hidden_dim,
            config.learning_rate,
            config.max_grad_norm,
            &mut rng,
            &device,
        );
        Self {
            config: config.clone(),
            policy,
            value,
            buffer: ReplayBuffer::new(config.buffer_capacity),
            rng,
            training: true,
        }
    }

    pub fn obs_dim(&self) -> usize {
        self.policy.obs_dim()
    }

    pub fn action_dim(&self) -> usize {
        self.policy.action_dim()
    }

    /// Chooses an action for `observation`.
    ///
    /// Deterministic mode returns the distribution mean; otherwise one sample
    /// is drawn and clipped to [0, 1].
    ///
    /// # Panics
    ///
    /// Panics if `observation` does not have `obs_dim` components.
    pub fn select_action(&mut self, observation: &[f32], deterministic: bool) -> Vec<f32> {
        assert_eq!(
            observation.len(),
            self.obs_dim(),
            "observation has {} components, agent expects {}",
            observation.len(),
            self.obs_dim()
        );
        if deterministic {
            self.policy.mean_action(observation)
        } else {
            self.policy.sample(observation, &mut self.rng)
        }
    }

    /// Appends a transition, evicting the oldest one when the buffer is full.
    pub fn store_transition(&mut self, transition: Transition) {
        self.buffer.push(transition);
    }

    /// Number of stored transitions.
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// Runs one update on `batch_size` transitions sampled without replacement.
    ///
    /// Returns zeroed metrics without touching the networks when the buffer
    /// holds fewer than `batch_size` transitions or `batch_size` is zero.
    ///
    /// # Panics
    ///
    /// Panics if stored transitions do not match the agent's dimensions.
    pub fn train_step(&mut self, batch_size: usize) -> TrainMetrics {
        if batch_size == 0 || self.buffer.len() < batch_size {
            return TrainMetrics::default();
        }
        let cfg = &self.config;
        let batch = self.buffer.sample(batch_size, &mut self.rng);
        assert_eq!(batch.observations.ncols(), self.policy.obs_dim(), "transition observation size mismatch");
        assert_eq!(batch.actions.ncols(), self.policy.action_dim(), "transition action size mismatch");

        let (targets, advantages) = td_targets_and_advantages(
            &batch.rewards,
            &self.value.predict(&batch.observations),
            &self.value.predict(&batch.next_observations),
            &batch.dones,
            cfg.gamma,
            cfg.advantage_epsilon,
        );
        let old_log_probs = self.policy.log_probs(&batch.observations, &batch.actions);
        let surrogate_batch = SurrogateBatch::new(
            &batch.observations,
            &batch.actions,
            &old_log_probs,
            &advantages,
            self.policy.device(),
        );

        let mut policy_loss = 0.0;
        let mut entropy = 0.0;
        let mut max_grad_norm_seen = 0.0_f32;
        for _ in 0..cfg.policy_epochs {
            let stats =
                self.policy
                    .surrogate_step(&surrogate_batch, cfg.clip_epsilon, cfg.entropy_coef);
            policy_loss += stats.loss;
            entropy += stats.entropy;
            max_grad_norm_seen = max_grad_norm_seen.max(stats.grad_norm);
        }

        let mut value_loss = 0.0;
        for _ in 0..cfg.value_epochs {
            value_loss += self.value.regression_step(&batch.observations, &targets);
        }

        let metrics = TrainMetrics {
            policy_loss: policy_loss / cfg.policy_epochs.max(1) as f32,
            value_loss: value_loss / cfg.value_epochs.max(1) as f32,
            entropy: entropy / cfg.policy_epochs.max(1) as f32,
        };
        debug!(
            batch_size,
            policy_loss = metrics.policy_loss,
            value_loss = metrics.value_loss,
            entropy = metrics.entropy,
            max_policy_grad_norm = max_grad_norm_seen,
            "train step"
        );
        metrics
    }

    /// Switches between sampling (training) and mean actions (evaluation)
    /// when the agent is driven as a [`Controller`].
    pub fn set_training_mode(&mut self, training: bool) {
        self.training = training;
    }

    pub fn is_training(&self) -> bool {
        self.training
    }

    /// Critic estimate for one observation.
    pub fn value_of(&self, observation: &[f32]) -> f32 {
        let row = Array2::from_shape_fn((1, observation.len()), |(_, j)| observation[j]);
        self.value.predict(&row)[0]
    }
}

impl fmt::Debug for PpoAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PpoAgent")
            .field("obs_dim", &self.obs_dim())
            .field("action_dim", &self.action_dim())
            .field("buffered", &self.buffer.len())
            .field("training", &self.training)
            .finish_non_exhaustive()
    }
}

impl Controller for PpoAgent {
    fn name(&self) -> &str {
        "ppo"
    }

    fn act(&mut self, input: &ControlInput<'_>) -> Action {
        let deterministic = !self.training;
        Action::from_slice(&self.select_action(input.observation, deterministic))
    }
}

/// One-step TD targets `r + γ·V(s')·(1 - done)` and their normalized
/// advantages over `V(s)`.
fn td_targets_and_advantages(
    rewards: &Array1<f32>,
    values: &Array1<f32>,
    next_values: &Array1<f32>,
    dones: &Array1<f32>,
    gamma: f32,
    advantage_epsilon: f32,
) -> (Array1<f32>, Array1<f32>) {
    let not_done = dones.mapv(|d| 1.0 - d);
    let targets = rewards + &(next_values * gamma * &not_done);
    let advantages = normalize(&(&targets - values), advantage_epsilon);
    (targets, advantages)
}

/// Shifts to zero mean and scales by the sample standard deviation plus `epsilon`.
fn normalize(values: &Array1<f32>, epsilon: f32) -> Array1<f32> {
    let n = values.len();
    if n == 0 {
        return values.clone();
    }
    let mean = values.sum() / n as f32;
    let std = if n < 2 {
        0.0
    } else {
        (values.mapv(|v| (v - mean).powi(2)).sum() / (n - 1) as f32).sqrt()
    };
    values.mapv(|v| (v - mean) / (std + epsilon))
}
