//! Critic network estimating state values.

use burn::optim::{GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use ndarray::{Array1, Array2};
use rand::Rng;

use super::nn::{Adam, Mlp, ParamIds, ToTensor, adam, clip_global_norm, to_array1};

/// Scalar value estimate `V(obs)` from an independent MLP.
pub struct ValueNet<B: AutodiffBackend> {
    net: Mlp<B>,
    optimizer: Adam<Mlp<B>, B>,
    learning_rate: f64,
    max_grad_norm: f32,
    device: B::Device,
}

impl<B: AutodiffBackend> ValueNet<B> {
    pub fn new<R: Rng + ?Sized>(
        obs_dim: usize,
        hidden_dim: usize,
        learning_rate: f32,
        max_grad_norm: f32,
        rng: &mut R,
        device: &B::Device,
    ) -> Self {
        Self {
            net: Mlp::new(&[obs_dim, hidden_dim, hidden_dim, 1], rng, device),
            optimizer: adam(),
            learning_rate: f64::from(learning_rate),
            max_grad_norm,
            device: device.clone(),
        }
    }

    /// Value estimates for a batch of observations.
    pub fn predict(&self, observations: &Array2<f32>) -> Array1<f32> {
        let values = self.net.forward(observations.to_tensor(&self.device));
        to_array1(values.squeeze::<1>(1))
    }

    /// One mean-squared-error regression step towards `targets`, with
    /// gradients clipped to a joint norm of `max_grad_norm`.
    ///
    /// Returns the loss before the update.
    pub fn regression_step(&mut self, observations: &Array2<f32>, targets: &Array1<f32>) -> f32 {
        let net = self.net.clone();
        let values = net.forward(observations.to_tensor(&self.device)).squeeze::<1>(1);
        let loss = (values - targets.to_tensor(&self.device)).powf_scalar(2.0).mean();
        let loss_value = loss.clone().into_scalar().elem::<f32>();

        let mut grads = GradientsParams::from_grads(loss.backward(), &net);
        let mut params = ParamIds::default();
        net.collect_params(&mut params);
        clip_global_norm::<B::InnerBackend>(&mut grads, &params, self.max_grad_norm);
        self.net = self.optimizer.step(self.learning_rate, net, grads);
        loss_value
    }
}
