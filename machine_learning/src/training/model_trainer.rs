use std::num::NonZeroUsize;

use log::{debug, info};
use ndarray::{Array2, ArrayView2};
use rand::Rng;

use super::{EpochLoss, LossHistory, Trainer};
use crate::{
    MlErr, Result,
    arch::{Model, loss::LossFn},
    dataset::Dataset,
    initialization::ParamInit,
    optimization::Optimizer,
};

/// A model `Trainer`. Contains the relevant components needed for training a model,
/// including the model itself.
pub struct ModelTrainer<M, O, L, R>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
    R: Rng,
{
    model: M,
    init: ParamInit,
    optimizer: O,
    loss_fn: L,

    epochs: usize,
    batch_size: NonZeroUsize,
    rng: R,
}

impl<M, O, L, R> ModelTrainer<M, O, L, R>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
    R: Rng,
{
    /// Returns a new `ModelTrainer`.
    ///
    /// # Arguments
    /// * `model` - The model that will be trained.
    /// * `init` - How the model's parameters are drawn by `init_params`.
    /// * `optimizer` - The update rule applied after every batch.
    /// * `loss_fn` - The loss function used to measure the difference between a model's output
    ///   and the expected one.
    /// * `epochs` - The amount of passes over the training set per `fit` call.
    /// * `batch_size` - The amount of rows per batch.
    /// * `rng` - A random number generator, used for initialization and shuffling.
    pub fn new(
        model: M,
        init: ParamInit,
        optimizer: O,
        loss_fn: L,
        epochs: usize,
        batch_size: NonZeroUsize,
        rng: R,
    ) -> Self {
        Self {
            model,
            init,
            optimizer,
            loss_fn,
            epochs,
            batch_size,
            rng,
        }
    }

    /// Runs forward, backward and one optimizer step on a single batch.
    ///
    /// # Returns
    /// The batch loss, measured before the step.
    fn step(
        &mut self,
        params: &mut [f32],
        grad: &mut [f32],
        x: ArrayView2<f32>,
        y: ArrayView2<f32>,
    ) -> Result<f32> {
        let y_pred = self.model.forward(params, x)?;
        let loss = self.loss_fn.loss(y_pred, y);
        let d = self.loss_fn.loss_prime(y_pred, y);

        self.model.backward(params, grad, d)?;
        self.optimizer.update_params(grad, params)?;
        Ok(loss)
    }
}

impl<M, O, L, R> Trainer for ModelTrainer<M, O, L, R>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
    R: Rng,
{
    fn size(&self) -> usize {
        self.model.size()
    }

    fn init_params(&mut self) -> Result<Vec<f32>> {
        self.model.init_params(&self.init, &mut self.rng)
    }

    fn fit(
        &mut self,
        params: &mut [f32],
        train: &mut Dataset,
        test: &Dataset,
    ) -> Result<LossHistory> {
        if train.is_empty() {
            return Err(MlErr::EmptyDataset);
        }

        let mut grad = vec![0.; self.model.size()];
        let mut history = LossHistory::new();

        for epoch in 1..=self.epochs {
            train.shuffle(&mut self.rng);

            let mut total = 0.;
            let mut batches = 0;

            for (batch, (x, y)) in train.batches(self.batch_size).enumerate() {
                grad.fill(0.);
                let loss = self.step(params, &mut grad, x.view(), y.view())?;
                debug!(epoch = epoch, batch = batch, loss = loss; "batch done");

                total += loss;
                batches += 1;
            }

            let train_loss = total / batches as f32;
            let test_loss = self.evaluate(params, test)?;
            info!(epoch = epoch, train_loss = train_loss, test_loss = test_loss; "epoch done");

            history.push(EpochLoss {
                epoch,
                train_loss,
                test_loss,
            });
        }

        Ok(history)
    }

    fn evaluate(&mut self, params: &[f32], dataset: &Dataset) -> Result<f32> {
        if dataset.is_empty() {
            return Err(MlErr::EmptyDataset);
        }

        let y_pred = self.model.forward(params, dataset.x())?;
        Ok(self.loss_fn.loss(y_pred, dataset.y()))
    }

    fn predict(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let y_pred = self.model.forward(params, x)?;
        Ok(y_pred.to_owned())
    }
}
