//! Feed-forward networks on burn, plus the glue between host arrays and tensors.
//!
//! Inputs are batches laid out as rows (`batch x features`). Hidden layers
//! use ReLU, the output layer is linear; callers apply their own output
//! transform.

use burn::backend::{Autodiff, NdArray};
use burn::module::{AutodiffModule, Param, ParamId};
use burn::nn::Linear;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{AdamW, AdamWConfig, GradientsParams};
use burn::prelude::*;
use burn::tensor::activation::relu;
use burn::tensor::backend::AutodiffBackend;
use ndarray::{Array1, Array2};
use rand::Rng;
use rand_distr::StandardNormal;

/// Backend the agent trains on: reverse-mode autodiff over the CPU ndarray backend.
pub type AgentBackend = Autodiff<NdArray>;

/// Optimizer stored by the actor and critic.
pub type Adam<M, B> = OptimizerAdaptor<AdamW, M, B>;

/// Adam without weight decay.
///
/// Gradients are clipped beforehand with [`clip_global_norm`]; burn's own
/// `GradientClippingConfig::Norm` bounds each parameter tensor separately.
pub fn adam<B: AutodiffBackend, M: AutodiffModule<B>>() -> Adam<M, B> {
    AdamWConfig::new().with_weight_decay(0.0).init()
}

/// Identifiers of a module's float parameters, grouped by rank.
#[derive(Debug, Clone, Default)]
pub struct ParamIds {
    matrices: Vec<ParamId>,
    vectors: Vec<ParamId>,
}

impl ParamIds {
    pub fn matrix<B: Backend>(&mut self, param: &Param<Tensor<B, 2>>) {
        self.matrices.push(param.id);
    }

    pub fn vector<B: Backend>(&mut self, param: &Param<Tensor<B, 1>>) {
        self.vectors.push(param.id);
    }

    /// Sum of squared gradient elements over every listed parameter.
    pub fn grad_squared_norm<B: Backend>(&self, grads: &GradientsParams) -> f32 {
        let matrices: f32 = self
            .matrices
            .iter()
            .filter_map(|id| grads.get::<B, 2>(*id))
            .map(squared_sum)
            .sum();
        let vectors: f32 = self
            .vectors
            .iter()
            .filter_map(|id| grads.get::<B, 1>(*id))
            .map(squared_sum)
            .sum();
        matrices + vectors
    }

    fn scale<B: Backend>(&self, grads: &mut GradientsParams, factor: f32) {
        for id in &self.matrices {
            if let Some(g) = grads.remove::<B, 2>(*id) {
                grads.register(*id, g.mul_scalar(factor));
            }
        }
        for id in &self.vectors {
            if let Some(g) = grads.remove::<B, 1>(*id) {
                grads.register(*id, g.mul_scalar(factor));
            }
        }
    }
}

fn squared_sum<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> f32 {
    tensor.powf_scalar(2.0).sum().into_scalar().elem::<f32>()
}

/// Rescales all gradients of `params` so their joint L2 norm is at most
/// `max_norm`, and returns the norm before rescaling.
///
/// `B` is the backend the gradients live on, the inner backend of the
/// autodiff backend that produced them.
pub fn clip_global_norm<B: Backend>(
    grads: &mut GradientsParams,
    params: &ParamIds,
    max_norm: f32,
) -> f32 {
    let norm = params.grad_squared_norm::<B>(grads).sqrt();
    if norm > max_norm {
        params.scale::<B>(grads, max_norm / norm);
    }
    norm
}

/// Multi-layer perceptron with ReLU hidden activations.
#[derive(Module, Debug)]
pub struct Mlp<B: Backend> {
    layers: Vec<Linear<B>>,
}

impl<B: Backend> Mlp<B> {
    /// Creates a network with the given layer widths, input first.
    ///
    /// Weights are drawn from `N(0, 1/inputs)` with `rng`, biases start at zero,
    /// so the same seed always yields the same network.
    ///
    /// # Panics
    ///
    /// Panics if fewer than two sizes are given or any size is zero.
    pub fn new<R: Rng + ?Sized>(sizes: &[usize], rng: &mut R, device: &B::Device) -> Self {
        assert!(sizes.len() >= 2, "an MLP needs at least input and output sizes");
        assert!(sizes.iter().all(|&s| s > 0), "layer sizes must be > 0");
        let layers = sizes
            .windows(2)
            .map(|w| dense(w[0], w[1], &mut *rng, device))
            .collect();
        Self { layers }
    }

    pub fn input_dim(&self) -> usize {
        self.layers[0].weight.val().dims()[0]
    }

    pub fn output_dim(&self) -> usize {
        self.layers[self.layers.len() - 1].weight.val().dims()[1]
    }

    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let last = self.layers.len() - 1;
        let mut x = input;
        for (i, layer) in self.layers.iter().enumerate() {
            x = layer.forward(x);
            if i < last {
                x = relu(x);
            }
        }
        x
    }

    /// Adds every weight and bias to `ids`.
    pub fn collect_params(&self, ids: &mut ParamIds) {
        for layer in &self.layers {
            ids.matrix(&layer.weight);
            if let Some(bias) = &layer.bias {
                ids.vector(bias);
            }
        }
    }
}

fn dense<B: Backend, R: Rng + ?Sized>(
    inputs: usize,
    outputs: usize,
    rng: &mut R,
    device: &B::Device,
) -> Linear<B> {
    let scale = (1.0 / inputs as f32).sqrt();
    let weights: Vec<f32> = (0..inputs * outputs)
        .map(|_| rng.sample::<f32, _>(StandardNormal) * scale)
        .collect();
    let weight = Tensor::from_data(
        TensorData::new(weights, [inputs, outputs]).convert::<B::FloatElem>(),
        device,
    );
    Linear {
        weight: Param::from_tensor(weight),
        bias: Some(Param::from_tensor(Tensor::zeros([outputs], device))),
    }
}

/// Host-side batches that can be uploaded as float tensors.
pub trait ToTensor<B: Backend, const D: usize> {
    fn to_tensor(&self, device: &B::Device) -> Tensor<B, D>;
}

impl<B: Backend> ToTensor<B, 2> for Array2<f32> {
    fn to_tensor(&self, device: &B::Device) -> Tensor<B, 2> {
        let (rows, cols) = self.dim();
        let data = TensorData::new(self.iter().copied().collect::<Vec<f32>>(), [rows, cols]);
        Tensor::from_data(data.convert::<B::FloatElem>(), device)
    }
}

impl<B: Backend> ToTensor<B, 1> for Array1<f32> {
    fn to_tensor(&self, device: &B::Device) -> Tensor<B, 1> {
        let data = TensorData::new(self.to_vec(), [self.len()]);
        Tensor::from_data(data.convert::<B::FloatElem>(), device)
    }
}

impl<B: Backend> ToTensor<B, 2> for [f32] {
    /// A single row.
    fn to_tensor(&self, device: &B::Device) -> Tensor<B, 2> {
        let data = TensorData::new(self.to_vec(), [1, self.len()]);
        Tensor::from_data(data.convert::<B::FloatElem>(), device)
    }
}

/// Copies a tensor back to the host, row-major.
pub fn to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Vec<f32> {
    tensor.into_data().iter::<f32>().collect()
}

/// Copies a rank-1 tensor back to the host.
pub fn to_array1<B: Backend>(tensor: Tensor<B, 1>) -> Array1<f32> {
    Array1::from(to_vec(tensor))
}
