use ndarray::{Array2, ArrayView2};
use rand::Rng;

use super::Dense;
use crate::{Result, arch::activations::ActFn, initialization::ParamInit};

#[derive(Clone, Debug)]
pub enum Layer {
    Dense(Dense),
}

impl Layer {
    pub fn dense(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        Self::Dense(Dense::new(dim, act_fn))
    }

    /// The amount of parameters this layer takes from the model's parameter buffer.
    pub fn size(&self) -> usize {
        match self {
            Self::Dense(l) => l.size(),
        }
    }

    /// The `(input, output)` widths of this layer.
    pub fn dim(&self) -> (usize, usize) {
        match self {
            Self::Dense(l) => l.dim(),
        }
    }

    pub fn init_params<R: Rng + ?Sized>(&self, init: &ParamInit, rng: &mut R) -> Result<Vec<f32>> {
        match self {
            Self::Dense(l) => l.init_params(init, rng),
        }
    }

    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<ArrayView2<'_, f32>> {
        match self {
            Self::Dense(l) => l.forward(params, x),
        }
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        match self {
            Self::Dense(l) => l.backward(params, grad, d),
        }
    }
}
