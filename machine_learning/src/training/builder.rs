use std::num::NonZeroUsize;

use rand::{SeedableRng, rngs::StdRng};

use super::{ModelTrainer, Trainer};
use crate::{
    MlErr, Result,
    arch::{
        Model, Sequential,
        activations::ActFn,
        layers::Layer,
        loss::{LossFn, Mse},
    },
    initialization::ParamInit,
    optimization::{Adam, GradientDescent, GradientDescentWithMomentum, Optimizer},
    specs::{
        ActFnSpec, LayerSpec, LossFnSpec, ModelSpec, OptimizerSpec, ParamInitSpec, TrainerSpec,
    },
};

/// Builds `Trainer`s given a specification.
#[derive(Default)]
pub struct TrainerBuilder;

impl TrainerBuilder {
    /// Creates a new `TrainerBuilder`.
    pub fn new() -> Self {
        Self
    }

    /// Builds a new `Trainer` following a spec.
    ///
    /// # Arguments
    /// * `spec` - The specification for the trainer.
    ///
    /// # Returns
    /// The trainer, or an error if the spec is inconsistent.
    pub fn build(&self, spec: &TrainerSpec) -> Result<Box<dyn Trainer>> {
        self.resolve_model(spec)
    }

    fn resolve_model(&self, spec: &TrainerSpec) -> Result<Box<dyn Trainer>> {
        match &spec.model {
            ModelSpec::Sequential {
                layers: layer_specs,
            } => {
                self.validate_layers(layer_specs)?;
                let layers = layer_specs.iter().map(|ls| self.resolve_layer(*ls));
                let model = Sequential::new(layers);
                self.resolve_optimizer(spec, model)
            }
        }
    }

    fn validate_layers(&self, layers: &[LayerSpec]) -> Result<()> {
        if layers.is_empty() {
            return Err(MlErr::InvalidSpec("a sequential model needs at least one layer".into()));
        }

        for (i, pair) in layers.windows(2).enumerate() {
            let (LayerSpec::Dense { dim: prev, .. }, LayerSpec::Dense { dim: next, .. }) =
                (pair[0], pair[1]);

            if prev.1 != next.0 {
                return Err(MlErr::InvalidSpec(format!(
                    "layer {} outputs {} values but layer {} takes {}",
                    i,
                    prev.1,
                    i + 1,
                    next.0
                )));
            }
        }

        for (i, layer) in layers.iter().enumerate() {
            let LayerSpec::Dense { dim, .. } = layer;

            if dim.0 == 0 || dim.1 == 0 {
                return Err(MlErr::InvalidSpec(format!("layer {i} has a zero width")));
            }
        }

        Ok(())
    }

    fn resolve_layer(&self, spec: LayerSpec) -> Layer {
        match spec {
            LayerSpec::Dense { dim, act_fn } => {
                let factory = |act_fn| Layer::dense(dim, act_fn);
                self.resolve_act_fn(act_fn, factory)
            }
        }
    }

    fn resolve_act_fn<F>(&self, spec: Option<ActFnSpec>, layer_factory: F) -> Layer
    where
        F: FnOnce(Option<ActFn>) -> Layer,
    {
        let Some(act_fn) = spec else {
            return layer_factory(None);
        };

        let act_fn = match act_fn {
            ActFnSpec::Relu => ActFn::relu(),
            ActFnSpec::Sigmoid { amp } => ActFn::sigmoid(amp),
        };

        layer_factory(Some(act_fn))
    }

    fn resolve_optimizer<M>(&self, spec: &TrainerSpec, model: M) -> Result<Box<dyn Trainer>>
    where
        M: Model + 'static,
    {
        let len = model.size();

        match spec.optimizer {
            OptimizerSpec::Adam {
                learning_rate,
                beta1,
                beta2,
                epsilon,
            } => {
                let optimizer = Adam::new(len, learning_rate, beta1, beta2, epsilon);
                self.resolve_loss(spec, model, optimizer)
            }
            OptimizerSpec::GradientDescent { learning_rate } => {
                let optimizer = GradientDescent::new(learning_rate);
                self.resolve_loss(spec, model, optimizer)
            }
            OptimizerSpec::GradientDescentWithMomentum {
                learning_rate,
                momentum,
            } => {
                let optimizer = GradientDescentWithMomentum::new(len, learning_rate, momentum);
                self.resolve_loss(spec, model, optimizer)
            }
        }
    }

    fn resolve_loss<M, O>(
        &self,
        spec: &TrainerSpec,
        model: M,
        optimizer: O,
    ) -> Result<Box<dyn Trainer>>
    where
        M: Model + 'static,
        O: Optimizer + 'static,
    {
        match spec.loss {
            LossFnSpec::Mse => {
                let loss = Mse::new();
                self.terminate_build(spec, model, optimizer, loss)
            }
        }
    }

    fn terminate_build<M, O, L>(
        &self,
        spec: &TrainerSpec,
        model: M,
        optimizer: O,
        loss: L,
    ) -> Result<Box<dyn Trainer>>
    where
        M: Model + 'static,
        O: Optimizer + 'static,
        L: LossFn + 'static,
    {
        let batch_size = NonZeroUsize::new(spec.batch_size)
            .ok_or_else(|| MlErr::InvalidSpec("batch_size must be positive".into()))?;
        let init = self.resolve_init(spec.init);
        let rng = self.generate_rng(spec.seed);

        let trainer = ModelTrainer::new(model, init, optimizer, loss, spec.epochs, batch_size, rng);
        Ok(Box::new(trainer))
    }

    fn resolve_init(&self, spec: ParamInitSpec) -> ParamInit {
        match spec {
            ParamInitSpec::Const { value } => ParamInit::Const { value },
            ParamInitSpec::Uniform { low, high } => ParamInit::Uniform { low, high },
            ParamInitSpec::FanInUniform => ParamInit::FanInUniform,
            ParamInitSpec::XavierUniform => ParamInit::XavierUniform,
            ParamInitSpec::Kaiming => ParamInit::Kaiming,
        }
    }

    fn generate_rng(&self, seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}
