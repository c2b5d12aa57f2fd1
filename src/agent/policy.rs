//! Diagonal Gaussian actor with a sigmoid-bounded mean.

use std::f32::consts::PI;

use burn::module::Param;
use burn::optim::{GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::activation::sigmoid;
use burn::tensor::backend::AutodiffBackend;
use ndarray::{Array1, Array2};
use rand::Rng;
use rand_distr::StandardNormal;

use super::nn::{Adam, Mlp, ParamIds, ToTensor, adam, clip_global_norm, to_array1, to_vec};

/// `0.5 * ln(2π)`.
fn half_log_two_pi() -> f32 {
    0.5 * (2.0 * PI).ln()
}

/// Losses of one clipped-surrogate update.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SurrogateStats {
    /// `-mean(min(r·A, clip(r)·A)) - c·H`.
    pub loss: f32,
    /// Entropy of the action distribution.
    pub entropy: f32,
    /// Gradient norm over all actor parameters, before clipping.
    pub grad_norm: f32,
}

/// Actor parameters: `a ~ N(sigmoid(mlp(obs)), exp(log_std)^2)` per action dimension.
///
/// The standard deviation is a learned, state-independent vector.
#[derive(Module, Debug)]
pub struct GaussianActor<B: Backend> {
    mean_net: Mlp<B>,
    log_std: Param<Tensor<B, 1>>,
}

impl<B: Backend> GaussianActor<B> {
    /// Distribution means, each in (0, 1).
    pub fn means(&self, observations: Tensor<B, 2>) -> Tensor<B, 2> {
        sigmoid(self.mean_net.forward(observations))
    }

    /// Log-density of each row of `actions` under the distribution at `means`.
    pub fn log_probs(&self, means: Tensor<B, 2>, actions: Tensor<B, 2>) -> Tensor<B, 1> {
        let log_std = self.log_std.val().unsqueeze::<2>();
        let inv_var = log_std.clone().mul_scalar(-2.0).exp();
        let per_dim = (actions - means).powf_scalar(2.0).mul(inv_var).mul_scalar(-0.5)
            - log_std;
        per_dim.sub_scalar(half_log_two_pi()).sum_dim(1).squeeze::<1>(1)
    }

    /// Entropy of the (state-independent) distribution, as a one-element tensor.
    pub fn entropy(&self) -> Tensor<B, 1> {
        let log_std = self.log_std.val();
        let dims = log_std.dims()[0] as f32;
        log_std.sum().add_scalar(dims * (0.5 + half_log_two_pi()))
    }
}

/// A frozen batch for [`GaussianPolicy::surrogate_step`].
#[derive(Debug, Clone)]
pub struct SurrogateBatch<B: Backend> {
    pub observations: Tensor<B, 2>,
    pub actions: Tensor<B, 2>,
    /// Log-probabilities under the data-collecting policy.
    pub old_log_probs: Tensor<B, 1>,
    /// Normalized advantages.
    pub advantages: Tensor<B, 1>,
}

impl<B: Backend> SurrogateBatch<B> {
    pub fn new(
        observations: &Array2<f32>,
        actions: &Array2<f32>,
        old_log_probs: &Array1<f32>,
        advantages: &Array1<f32>,
        device: &B::Device,
    ) -> Self {
        Self {
            observations: observations.to_tensor(device),
            actions: actions.to_tensor(device),
            old_log_probs: old_log_probs.to_tensor(device),
            advantages: advantages.to_tensor(device),
        }
    }
}

/// Actor together with its optimizer.
pub struct GaussianPolicy<B: AutodiffBackend> {
    actor: GaussianActor<B>,
    optimizer: Adam<GaussianActor<B>, B>,
    learning_rate: f64,
    max_grad_norm: f32,
    device: B::Device,
}

impl<B: AutodiffBackend> GaussianPolicy<B> {
    /// # Panics
    ///
    /// Panics if any dimension is zero.
    pub fn new<R: Rng + ?Sized>(
        obs_dim: usize,
        action_dim: usize,
        hidden_dim: usize,
        learning_rate: f32,
        max_grad_norm: f32,
        rng: &mut R,
        device: &B::Device,
    ) -> Self {
        let actor = GaussianActor {
            mean_net: Mlp::new(&[obs_dim, hidden_dim, hidden_dim, action_dim], rng, device),
            log_std: Param::from_tensor(Tensor::zeros([action_dim], device)),
        };
        Self {
            actor,
            optimizer: adam(),
            learning_rate: f64::from(learning_rate),
            max_grad_norm,
            device: device.clone(),
        }
    }

    pub fn obs_dim(&self) -> usize {
        self.actor.mean_net.input_dim()
    }

    pub fn action_dim(&self) -> usize {
        self.actor.mean_net.output_dim()
    }

    pub fn log_std(&self) -> Vec<f32> {
        to_vec(self.actor.log_std.val())
    }

    /// Distribution means for a batch of observations.
    pub fn means(&self, observations: &Array2<f32>) -> Array2<f32> {
        let cols = self.action_dim();
        let flat = to_vec(self.actor.means(observations.to_tensor(&self.device)));
        Array2::from_shape_fn((observations.nrows(), cols), |(i, j)| flat[i * cols + j])
    }

    /// Mean action for one observation.
    pub fn mean_action(&self, observation: &[f32]) -> Vec<f32> {
        to_vec(self.actor.means(observation.to_tensor(&self.device)))
    }

    /// Samples an action and hard-clips every component to [0, 1].
    pub fn sample<R: Rng + ?Sized>(&self, observation: &[f32], rng: &mut R) -> Vec<f32> {
        self.mean_action(observation)
            .into_iter()
            .zip(self.log_std())
            .map(|(mu, s)| {
                let noise: f32 = rng.sample(StandardNormal);
                (mu + s.exp() * noise).clamp(0.0, 1.0)
            })
            .collect()
    }

    /// Log-density of each row of `actions` for the matching observation.
    pub fn log_probs(&self, observations: &Array2<f32>, actions: &Array2<f32>) -> Array1<f32> {
        let means = self.actor.means(observations.to_tensor(&self.device));
        to_array1(self.actor.log_probs(means, actions.to_tensor(&self.device)))
    }

    pub fn entropy(&self) -> f32 {
        self.actor.entropy().into_scalar().elem::<f32>()
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Runs one clipped-surrogate gradient step on a frozen batch.
    ///
    /// Samples whose ratio is clipped contribute no gradient; the entropy
    /// bonus pushes `log_std` up by `entropy_coef` per dimension. Gradients
    /// are scaled to a joint norm of at most `max_grad_norm` before the step.
    pub fn surrogate_step(
        &mut self,
        batch: &SurrogateBatch<B>,
        clip_epsilon: f32,
        entropy_coef: f32,
    ) -> SurrogateStats {
        let actor = self.actor.clone();
        let means = actor.means(batch.observations.clone());
        let log_probs = actor.log_probs(means, batch.actions.clone());
        let ratio = (log_probs - batch.old_log_probs.clone()).exp();
        let clipped = ratio.clone().clamp(1.0 - clip_epsilon, 1.0 + clip_epsilon);
        let objective = (ratio * batch.advantages.clone())
            .min_pair(clipped * batch.advantages.clone())
            .mean();
        let entropy = actor.entropy();
        let loss = objective.neg() - entropy.clone().mul_scalar(entropy_coef);

        let loss_value = loss.clone().into_scalar().elem::<f32>();
        let entropy_value = entropy.into_scalar().elem::<f32>();

        let mut grads = GradientsParams::from_grads(loss.backward(), &actor);
        let mut params = ParamIds::default();
        actor.mean_net.collect_params(&mut params);
        params.vector(&actor.log_std);
        let grad_norm =
            clip_global_norm::<B::InnerBackend>(&mut grads, &params, self.max_grad_norm);
        self.actor = self.optimizer.step(self.learning_rate, actor, grads);

        SurrogateStats {
            loss: loss_value,
            entropy: entropy_value,
            grad_norm,
        }
    }
}
