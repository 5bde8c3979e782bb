use log::info;
use ndarray::{Array2, Axis};

use crate::{
    error::{PrepError, Result},
    observations::Observations,
    scaler::CityScalers,
    split::split_at,
    target::log_cases_all,
};

/// How observations are turned into training and test arrays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrepareOptions {
    /// Rows with a time before it are trained on, the rest are tested on.
    pub threshold: f64,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self { threshold: 60. }
    }
}

/// The rows of one side of the split, ready for a model.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub cities: Vec<String>,
    pub times: Vec<f64>,
    /// The raw case counts.
    pub cases: Vec<f64>,
    /// One row per observation, one column per feature.
    pub features: Array2<f32>,
    /// The standardized `ln(cases + 1)`, one column.
    pub targets: Array2<f32>,
}

impl Partition {
    fn select(observations: &Observations, rows: &[usize], targets: Vec<f64>) -> Self {
        let pick = |values: &[f64]| rows.iter().map(|&i| values[i]).collect::<Vec<_>>();
        let n = rows.len();

        Self {
            cities: rows.iter().map(|&i| observations.cities()[i].clone()).collect(),
            times: pick(observations.times()),
            cases: pick(observations.cases()),
            features: observations.features().select(Axis(0), rows),
            targets: Array2::from_shape_fn((n, 1), |(i, _)| targets[i] as f32),
        }
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}

/// The outcome of data preparation: both partitions and the scalers fit on the training one.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedData {
    pub train: Partition,
    pub test: Partition,
    pub scalers: CityScalers,
    pub feature_names: Vec<String>,
}

/// Splits the observations by time and standardizes the log cases of each city with
/// statistics taken from its training rows only.
///
/// # Returns
/// An invalid target error on a negative or non finite count, an empty partition error
/// if either side of the split has no rows, and a missing scaler error if a test row
/// belongs to a city with no training rows.
pub fn prepare(observations: &Observations, options: &PrepareOptions) -> Result<PreparedData> {
    let log_cases = log_cases_all(observations.cases())?;
    let split = split_at(observations, options.threshold);

    if split.train.is_empty() {
        return Err(PrepError::EmptyPartition { partition: "train" });
    }

    if split.test.is_empty() {
        return Err(PrepError::EmptyPartition { partition: "test" });
    }

    let cities_of = |rows: &[usize]| {
        rows.iter()
            .map(|&i| observations.cities()[i].as_str())
            .collect::<Vec<_>>()
    };
    let values_of = |rows: &[usize]| rows.iter().map(|&i| log_cases[i]).collect::<Vec<_>>();

    let train_cities = cities_of(&split.train);
    let train_values = values_of(&split.train);
    let scalers = CityScalers::fit(&train_cities, &train_values)?;

    let train_targets = scalers.transform_all(&train_cities, &train_values)?;
    let test_targets = scalers.transform_all(&cities_of(&split.test), &values_of(&split.test))?;

    info!(
        "prepared {} train and {} test rows, {} features, {} cities",
        split.train.len(),
        split.test.len(),
        observations.feature_names().len(),
        scalers.len()
    );

    Ok(PreparedData {
        train: Partition::select(observations, &split.train, train_targets),
        test: Partition::select(observations, &split.test, test_targets),
        scalers,
        feature_names: observations.feature_names().to_vec(),
    })
}
