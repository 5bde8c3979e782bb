use ndarray::{Array2, ArrayView2};

/// A loss function over a batch of predictions.
pub trait LossFn {
    /// The scalar loss of `y_pred` against the expected `y`.
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32;

    /// The gradient of `loss` with respect to each element of `y_pred`.
    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32>;
}
