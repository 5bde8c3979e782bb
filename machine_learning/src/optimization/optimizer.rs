use crate::{MlErr, Result};

/// A parameter update rule, applied once per batch.
pub trait Optimizer {
    /// Takes one step on `params` given the gradient of the loss with respect to them.
    ///
    /// # Returns
    /// An error if `grad` and `params` have different lengths.
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()>;
}

pub(super) fn check_lengths(grad: &[f32], params: &[f32]) -> Result<()> {
    if grad.len() != params.len() {
        return Err(MlErr::SizeMismatch {
            what: "gradient",
            got: grad.len(),
            expected: params.len(),
        });
    }

    Ok(())
}
