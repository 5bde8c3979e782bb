use ndarray::{Array2, ArrayView2};
use rand::Rng;

use crate::{Result, initialization::ParamInit};

/// A differentiable model over a flat parameter buffer.
///
/// A `Model` does not own its parameters: the same buffer is passed to every call,
/// so the parameters can be read during evaluation and updated by an optimizer
/// between batches without the model holding on to them.
pub trait Model {
    /// Returns the amount of parameters in the model.
    fn size(&self) -> usize;

    /// Draws a fresh parameter buffer of length `size()`.
    ///
    /// # Arguments
    /// * `init` - The initialization scheme applied to each layer.
    /// * `rng` - The random number generator to draw from.
    fn init_params<R: Rng + ?Sized>(&self, init: &ParamInit, rng: &mut R) -> Result<Vec<f32>>;

    /// Makes a forward pass through the model.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `x` - The input batch, one row per sample.
    ///
    /// # Returns
    /// The prediction for the given input or an error if occurred.
    fn forward<'a>(
        &'a mut self,
        params: &[f32],
        x: ArrayView2<'a, f32>,
    ) -> Result<ArrayView2<'a, f32>>;

    /// Computes the gradient of the loss with respect to every parameter for the
    /// last forwarded batch.
    ///
    /// # Arguments
    /// * `params` - The model's parameters, the same ones given to `forward`.
    /// * `grad` - A buffer of length `size()` the gradient is written to.
    /// * `d` - The derivative of the loss with respect to the model's output.
    fn backward(&mut self, params: &[f32], grad: &mut [f32], d: Array2<f32>) -> Result<()>;
}
