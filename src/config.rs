use std::{
    error::Error,
    fmt, fs, io,
    path::{Path, PathBuf},
};

use machine_learning::specs::{
    ActFnSpec, LayerSpec, LossFnSpec, ModelSpec, OptimizerSpec, ParamInitSpec, TrainerSpec,
};
use serde::{Deserialize, Serialize};

use crate::{observations::ObservationSchema, prepare::PrepareOptions};

/// Failures while loading a configuration file.
#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "cannot read config: {e}"),
            ConfigError::Json(e) => write!(f, "invalid config: {e}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Json(e) => Some(e),
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Reads a JSON configuration file. Missing fields take their defaults.
pub fn load<T, P>(path: P) -> Result<T, ConfigError>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Everything the `train` command needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub data: DataConfig,
    pub model: ModelConfig,
    pub training: TrainingConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// The input table. The command line may override it.
    pub path: Option<PathBuf>,
    #[serde(flatten)]
    pub schema: ObservationSchema,
    pub threshold: f64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: None,
            schema: ObservationSchema::default(),
            threshold: PrepareOptions::default().threshold,
        }
    }
}

impl DataConfig {
    pub fn prepare_options(&self) -> PrepareOptions {
        PrepareOptions {
            threshold: self.threshold,
        }
    }
}

/// The width of both hidden layers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HiddenDim {
    Fixed(usize),
    /// Two thirds of the amount of training rows, rounded down.
    #[default]
    TwoThirdsOfTrainRows,
}

impl HiddenDim {
    pub fn resolve(&self, train_rows: usize) -> usize {
        match *self {
            HiddenDim::Fixed(dim) => dim,
            HiddenDim::TwoThirdsOfTrainRows => (train_rows * 2 / 3).max(1),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub hidden: HiddenDim,
    pub init: ParamInitSpec,
}

impl ModelConfig {
    /// Two `relu` hidden layers of the same width and a linear output.
    pub fn model_spec(&self, features: usize, train_rows: usize, outputs: usize) -> ModelSpec {
        let hidden = self.hidden.resolve(train_rows);
        let relu = Some(ActFnSpec::Relu);

        ModelSpec::Sequential {
            layers: vec![
                LayerSpec::Dense {
                    dim: (features, hidden),
                    act_fn: relu,
                },
                LayerSpec::Dense {
                    dim: (hidden, hidden),
                    act_fn: relu,
                },
                LayerSpec::Dense {
                    dim: (hidden, outputs),
                    act_fn: None,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub optimizer: OptimizerSpec,
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 20,
            batch_size: 64,
            optimizer: OptimizerSpec::adam(0.01),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub predictions: PathBuf,
    pub history: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            predictions: "predictions.csv".into(),
            history: "loss_history.csv".into(),
        }
    }
}

impl RunConfig {
    /// The trainer for a dataset with the given amount of features and training rows.
    pub fn trainer_spec(&self, features: usize, train_rows: usize) -> TrainerSpec {
        TrainerSpec {
            model: self.model.model_spec(features, train_rows, 1),
            init: self.model.init,
            optimizer: self.training.optimizer,
            loss: LossFnSpec::Mse,
            epochs: self.training.epochs,
            batch_size: self.training.batch_size,
            seed: self.training.seed,
        }
    }
}
