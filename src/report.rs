use std::{fs::File, io, path::Path};

use machine_learning::training::LossHistory;
use serde::{Serialize, Serializer};

use crate::{
    error::{PrepError, Result},
    prepare::Partition,
    scaler::CityScalers,
    unscale::unscale_all,
};

/// Which side of the split a row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Subset {
    Train,
    Test,
}

/// One row of the predictions table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRecord {
    #[serde(serialize_with = "time_bin")]
    pub time: f64,
    pub city: String,
    pub split: Subset,
    pub cases: f64,
    pub prediction: f64,
}

/// Whole time bins are written without a fractional part, as they are read.
fn time_bin<S>(time: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if time.fract() == 0. && time.abs() < i64::MAX as f64 {
        serializer.serialize_i64(*time as i64)
    } else {
        serializer.serialize_f64(*time)
    }
}

/// Pairs every row of a partition with its prediction mapped back to a case count.
///
/// # Arguments
/// * `partition` - The rows that were predicted.
/// * `subset` - Which side of the split `partition` is.
/// * `standardized` - The model output for each row, in standardized log space.
/// * `scalers` - The scalers fit while preparing the data.
pub fn prediction_records(
    partition: &Partition,
    subset: Subset,
    standardized: &[f32],
    scalers: &CityScalers,
) -> Result<Vec<PredictionRecord>> {
    if standardized.len() != partition.len() {
        return Err(PrepError::schema(format!(
            "{} predictions for {} rows",
            standardized.len(),
            partition.len()
        )));
    }

    let predictions = unscale_all(
        scalers,
        &partition.cities,
        standardized.iter().map(|&z| f64::from(z)),
    )?;

    let records = partition
        .cities
        .iter()
        .zip(&partition.times)
        .zip(&partition.cases)
        .zip(predictions)
        .map(|(((city, &time), &cases), prediction)| PredictionRecord {
            time,
            city: city.clone(),
            split: subset,
            cases,
            prediction,
        })
        .collect();

    Ok(records)
}

/// Writes the prediction records as CSV with a header row.
pub fn write_predictions<W: io::Write>(writer: W, records: &[PredictionRecord]) -> Result<()> {
    write_rows(writer, records)
}

/// Writes one `epoch, train_loss, test_loss` row per entry of the history.
pub fn write_history<W: io::Write>(writer: W, history: &LossHistory) -> Result<()> {
    write_rows(writer, history.entries())
}

pub fn save_predictions<P: AsRef<Path>>(path: P, records: &[PredictionRecord]) -> Result<()> {
    write_predictions(File::create(path)?, records)
}

pub fn save_history<P: AsRef<Path>>(path: P, history: &LossHistory) -> Result<()> {
    write_history(File::create(path)?, history)
}

fn write_rows<W: io::Write, T: Serialize>(writer: W, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);

    for row in rows {
        writer.serialize(row)?;
    }

    writer.flush()?;
    Ok(())
}
