use ndarray::{linalg, prelude::*};
use rand::Rng;

use crate::{MlErr, Result, arch::activations::ActFn, initialization::ParamInit};

/// A fully connected layer, `a = act_fn(x · W + b)`.
///
/// The layer does not own its parameters, it views a slice of `(dim.0 + 1) * dim.1`
/// values laid out as the row-major `dim.0 x dim.1` weight matrix followed by the
/// `dim.1` biases. The gradient slice follows the same layout.
#[derive(Clone, Debug)]
pub struct Dense {
    dim: (usize, usize),
    act_fn: Option<ActFn>,
    size: usize,

    // Forward metadata
    x: Array2<f32>,
    z: Array2<f32>,
    a: Array2<f32>,
}

impl Dense {
    /// Creates a new `Dense` layer.
    ///
    /// # Arguments
    /// * `dim` - The input and output widths of the layer.
    /// * `act_fn` - The activation applied to the weighted sums, if any.
    pub fn new(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        let zeros = Array2::zeros((0, 0));

        Self {
            dim,
            size: (dim.0 + 1) * dim.1,
            act_fn,
            x: zeros.clone(),
            z: zeros.clone(),
            a: zeros,
        }
    }

    /// Returns the size of this layer.
    ///
    /// # Returns
    /// The amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    /// Draws a fresh set of parameters for this layer.
    pub fn init_params<R: Rng + ?Sized>(&self, init: &ParamInit, rng: &mut R) -> Result<Vec<f32>> {
        init.sample(rng, self.dim.0, self.dim.1, self.size)
    }

    /// Computes this layer's output for a batch, caching what `backward` needs.
    ///
    /// # Arguments
    /// * `params` - This layer's parameter slice.
    /// * `x` - The input batch, one row per sample.
    ///
    /// # Returns
    /// A view of the activations, one row per sample.
    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<ArrayView2<'_, f32>> {
        if x.ncols() != self.dim.0 {
            return Err(MlErr::SizeMismatch {
                what: "dense layer input width",
                got: x.ncols(),
                expected: self.dim.0,
            });
        }

        let (w, b) = self.view_params(params)?;
        self.z = x.dot(&w) + &b;
        self.x = x.to_owned();

        let Some(ref act_fn) = self.act_fn else {
            return Ok(self.z.view());
        };

        self.a = self.z.mapv(|z| act_fn.f(z));
        Ok(self.a.view())
    }

    /// Writes this layer's gradient for the last forwarded batch and propagates the delta.
    ///
    /// # Arguments
    /// * `params` - This layer's parameter slice.
    /// * `grad` - This layer's gradient slice, overwritten.
    /// * `d` - The derivative of the loss with respect to this layer's output.
    ///
    /// # Returns
    /// The derivative of the loss with respect to this layer's input.
    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        mut d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        if d.dim() != self.z.dim() {
            return Err(MlErr::SizeMismatch {
                what: "dense layer delta rows",
                got: d.nrows(),
                expected: self.z.nrows(),
            });
        }

        if let Some(act_fn) = &self.act_fn {
            d.zip_mut_with(&self.z, |d, &z| *d *= act_fn.df(z));
        }

        let (mut dw, mut db) = self.view_grad(grad)?;
        linalg::general_mat_mul(1.0, &self.x.t(), &d, 0.0, &mut dw);
        db.assign(&d.sum_axis(Axis(0)));

        let (w, _) = self.view_params(params)?;
        Ok(d.dot(&w.t()))
    }

    /// Gives a view of the raw gradient slice as the delta weights and delta biases of this layer.
    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>)> {
        self.check_len("dense layer gradient", grad.len())?;

        let w_size = self.size - self.dim.1;
        let (dw_raw, db_raw) = grad.split_at_mut(w_size);
        let dw = ArrayViewMut2::from_shape(self.dim, dw_raw)?;
        let db = ArrayViewMut1::from_shape(self.dim.1, db_raw)?;
        Ok((dw, db))
    }

    /// Gives a view of the raw parameter slice as the weights and biases of this layer.
    fn view_params<'a>(
        &self,
        params: &'a [f32],
    ) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        self.check_len("dense layer parameters", params.len())?;

        let w_size = self.size - self.dim.1;
        let weights = ArrayView2::from_shape(self.dim, &params[..w_size])?;
        let biases = ArrayView1::from_shape(self.dim.1, &params[w_size..])?;
        Ok((weights, biases))
    }

    fn check_len(&self, what: &'static str, got: usize) -> Result<()> {
        if got != self.size {
            return Err(MlErr::SizeMismatch {
                what,
                got,
                expected: self.size,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::arch::loss::{LossFn, Mse};

    #[test]
    fn size_counts_weights_and_biases() {
        assert_eq!(Dense::new((3, 2), None).size(), 8);
    }

    #[test]
    fn forward_without_activation_is_affine() {
        let mut dense = Dense::new((2, 1), None);
        // w = [[2], [3]], b = [1]
        let params = [2.0, 3.0, 1.0];
        let x = array![[1.0, 1.0], [0.0, 2.0]];

        let y = dense.forward(&params, x.view()).unwrap();
        assert_eq!(y, array![[6.0f32], [7.0]]);
    }

    #[test]
    fn forward_applies_the_activation() {
        let mut dense = Dense::new((1, 2), Some(ActFn::relu()));
        // w = [[1, -1]], b = [0, 0]
        let params = [1.0, -1.0, 0.0, 0.0];
        let x = array![[2.0]];

        let y = dense.forward(&params, x.view()).unwrap();
        assert_eq!(y, array![[2.0f32, 0.0]]);
    }

    #[test]
    fn forward_rejects_wrong_input_width() {
        let mut dense = Dense::new((3, 1), None);
        let params = [0.0; 4];
        let x = array![[1.0, 2.0]];

        assert!(matches!(
            dense.forward(&params, x.view()),
            Err(MlErr::SizeMismatch { expected: 3, .. })
        ));
    }

    #[test]
    fn forward_rejects_wrong_param_count() {
        let mut dense = Dense::new((2, 2), None);
        let x = array![[1.0, 2.0]];

        assert!(dense.forward(&[0.0; 5], x.view()).is_err());
    }

    #[test]
    fn backward_matches_finite_differences() {
        let x = array![[0.5, -1.0, 2.0], [1.5, 0.3, -0.7]];
        let y = array![[0.2, -0.4], [1.0, 0.5]];
        let params: Vec<f32> = (0..8).map(|i| (i as f32 - 3.5) * 0.15).collect();

        let mut dense = Dense::new((3, 2), Some(ActFn::sigmoid(1.0)));
        let y_pred = dense.forward(&params, x.view()).unwrap().to_owned();
        let d = Mse.loss_prime(y_pred.view(), y.view());
        let mut grad = vec![0.0; dense.size()];
        dense.backward(&params, &mut grad, d).unwrap();

        let h = 1e-2;
        for i in 0..params.len() {
            let mut plus = params.clone();
            let mut minus = params.clone();
            plus[i] += h;
            minus[i] -= h;

            let loss_plus = Mse.loss(dense.forward(&plus, x.view()).unwrap(), y.view());
            let loss_minus = Mse.loss(dense.forward(&minus, x.view()).unwrap(), y.view());
            let numeric = (loss_plus - loss_minus) / (2.0 * h);

            assert!(
                (grad[i] - numeric).abs() < 1e-3,
                "param {i}: analytic {} vs numeric {numeric}",
                grad[i]
            );
        }
    }

    #[test]
    fn backward_propagates_delta_through_weights() {
        let mut dense = Dense::new((2, 1), None);
        let params = [2.0, 3.0, 0.0];
        let x = array![[1.0, 1.0]];

        dense.forward(&params, x.view()).unwrap();
        let mut grad = [0.0; 3];
        let d_prev = dense.backward(&params, &mut grad, array![[1.0]]).unwrap();

        assert_eq!(d_prev, array![[2.0f32, 3.0]]);
        assert_eq!(grad, [1.0, 1.0, 1.0]);
    }
}
