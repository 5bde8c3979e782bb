use ndarray::{Array2, ArrayView2};

use super::LossHistory;
use crate::{Result, dataset::Dataset};

/// The public interface for a training session, hiding the concrete model, optimizer and
/// loss behind a trait object.
///
/// The parameters are owned by the caller and lent to each call.
pub trait Trainer {
    /// The amount of parameters the model takes.
    fn size(&self) -> usize;

    /// Draws a fresh parameter buffer for the model.
    fn init_params(&mut self) -> Result<Vec<f32>>;

    /// Trains the model for the configured amount of epochs.
    ///
    /// # Arguments
    /// * `params` - The model's parameters, updated in place once per batch.
    /// * `train` - The dataset the model is fit on, reshuffled every epoch.
    /// * `test` - The dataset evaluated after every epoch.
    ///
    /// # Returns
    /// One entry per completed epoch or an error if occurred.
    fn fit(&mut self, params: &mut [f32], train: &mut Dataset, test: &Dataset)
    -> Result<LossHistory>;

    /// Computes the loss over a whole dataset without touching the parameters.
    fn evaluate(&mut self, params: &[f32], dataset: &Dataset) -> Result<f32>;

    /// Computes the model's output for every row of `x`.
    fn predict(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>>;
}
