use ndarray::{Array2, ArrayView2};
use rand::Rng;

use super::{Model, layers::Layer};
use crate::{MlErr, Result, initialization::ParamInit};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
#[derive(Clone, Debug)]
pub struct Sequential {
    layers: Vec<Layer>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` instance.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Layer>,
    {
        Self {
            layers: layers.into_iter().collect(),
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    fn check_len(&self, what: &'static str, got: usize) -> Result<()> {
        let expected = self.size();

        if got != expected {
            return Err(MlErr::SizeMismatch {
                what,
                got,
                expected,
            });
        }

        Ok(())
    }
}

impl Model for Sequential {
    fn size(&self) -> usize {
        self.layers.iter().map(|layer| layer.size()).sum()
    }

    fn init_params<R: Rng + ?Sized>(&self, init: &ParamInit, rng: &mut R) -> Result<Vec<f32>> {
        let mut params = Vec::with_capacity(self.size());

        for layer in &self.layers {
            params.extend(layer.init_params(init, rng)?);
        }

        Ok(params)
    }

    fn forward<'a>(
        &'a mut self,
        params: &[f32],
        mut x: ArrayView2<'a, f32>,
    ) -> Result<ArrayView2<'a, f32>> {
        self.check_len("model parameters", params.len())?;

        let mut offset = 0;

        for layer in self.layers.iter_mut() {
            let size = layer.size();
            x = layer.forward(&params[offset..offset + size], x)?;
            offset += size;
        }

        Ok(x)
    }

    fn backward(&mut self, params: &[f32], grad: &mut [f32], mut d: Array2<f32>) -> Result<()> {
        self.check_len("model parameters", params.len())?;
        self.check_len("model gradient", grad.len())?;

        let mut end = params.len();

        for layer in self.layers.iter_mut().rev() {
            let start = end - layer.size();
            d = layer.backward(&params[start..end], &mut grad[start..end], d)?;
            end = start;
        }

        Ok(())
    }
}
