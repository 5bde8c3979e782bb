use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use log::info;
use machine_learning::{
    dataset::Dataset,
    training::{LossHistory, TrainerBuilder},
};

use crate::{
    config::{OutputConfig, RunConfig},
    filter::{FilterConfig, run_filter},
    observations::Observations,
    prepare::{Partition, prepare},
    report::{PredictionRecord, Subset, prediction_records, save_history, save_predictions},
    table::Table,
};

/// The outcome of a training run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub history: LossHistory,
    /// Loss over the training set in standardized space, after the last epoch.
    pub train_mse: f32,
    pub test_mse: f32,
    /// Train rows first, then test rows.
    pub predictions: Vec<PredictionRecord>,
}

/// Prepares the table at `data`, trains the network on it and predicts every row.
pub fn train(config: &RunConfig, data: &Path) -> anyhow::Result<RunSummary> {
    let table = Table::read_csv(data).with_context(|| format!("cannot load {}", data.display()))?;
    let observations = Observations::from_table(&table, &config.data.schema)?;
    let prepared = prepare(&observations, &config.data.prepare_options())?;

    let features = prepared.feature_names.len();
    let spec = config.trainer_spec(features, prepared.train.len());
    info!("training on {} rows with {features} features", prepared.train.len());

    let mut trainer = TrainerBuilder::new().build(&spec)?;
    let mut train_set = dataset(&prepared.train)?;
    let test_set = dataset(&prepared.test)?;

    let mut params = trainer.init_params()?;
    let history = trainer.fit(&mut params, &mut train_set, &test_set)?;

    let train_mse = trainer.evaluate(&params, &train_set)?;
    let test_mse = trainer.evaluate(&params, &test_set)?;
    info!(train_mse = train_mse, test_mse = test_mse; "final loss");

    let mut predictions = Vec::with_capacity(observations.len());
    for (partition, subset) in [(&prepared.train, Subset::Train), (&prepared.test, Subset::Test)] {
        let output = trainer.predict(&params, partition.features.view())?;
        let standardized = output.column(0).to_vec();
        let records = prediction_records(partition, subset, &standardized, &prepared.scalers)?;
        predictions.extend(records);
    }

    Ok(RunSummary {
        history,
        train_mse,
        test_mse,
        predictions,
    })
}

/// Writes the predictions and the loss history tables.
pub fn write_outputs(summary: &RunSummary, output: &OutputConfig) -> anyhow::Result<()> {
    save_predictions(&output.predictions, &summary.predictions)
        .with_context(|| format!("cannot write {}", output.predictions.display()))?;
    save_history(&output.history, &summary.history)
        .with_context(|| format!("cannot write {}", output.history.display()))?;

    info!(
        "wrote {} and {}",
        output.predictions.display(),
        output.history.display()
    );
    Ok(())
}

/// Reads every input table, filters them as one and writes the result to `output` as
/// gzip compressed CSV.
pub fn filter(inputs: &[PathBuf], output: &Path, config: &FilterConfig) -> anyhow::Result<()> {
    if inputs.is_empty() {
        bail!("no input tables");
    }

    let tables = inputs
        .iter()
        .map(|path| {
            Table::read_csv(path).with_context(|| format!("cannot load {}", path.display()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let table = run_filter(tables, config)?;
    table
        .write_csv_gz(output)
        .with_context(|| format!("cannot write {}", output.display()))?;

    info!("wrote {} rows to {}", table.nrows(), output.display());
    Ok(())
}

fn dataset(partition: &Partition) -> machine_learning::Result<Dataset> {
    Dataset::new(partition.features.clone(), partition.targets.clone())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use machine_learning::specs::OptimizerSpec;

    use super::*;
    use crate::config::{HiddenDim, TrainingConfig};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("measles-forecast-{name}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Two cities with a seasonal case series and its first two lags.
    fn write_dataset(path: &Path) {
        let mut csv = String::from("city,time,cases,cases_lag_1,cases_lag_2\n");

        for (city, scale) in [("London", 400.), ("Bristol", 40.)] {
            let cases: Vec<f64> = (0..40)
                .map(|t| (scale * (1. + (t as f64 * 0.6).sin())).round())
                .collect();

            for t in 2..40 {
                let lag = |k: usize| (cases[t - k] + 1.).ln();
                csv += &format!("{city},{t},{},{:.4},{:.4}\n", cases[t], lag(1), lag(2));
            }
        }

        fs::write(path, csv).unwrap();
    }

    fn config() -> RunConfig {
        let mut config = RunConfig::default();
        config.data.threshold = 30.;
        config.model.hidden = HiddenDim::Fixed(8);
        config.training = TrainingConfig {
            epochs: 3,
            batch_size: 8,
            optimizer: OptimizerSpec::adam(0.01),
            seed: Some(42),
        };
        config
    }

    #[test]
    fn trains_and_predicts_every_row() {
        let dir = scratch_dir("train");
        let data = dir.join("measles.csv");
        write_dataset(&data);

        let summary = train(&config(), &data).unwrap();

        assert_eq!(summary.history.len(), 3);
        assert!(summary.history.iter().all(|e| e.train_loss >= 0. && e.test_loss >= 0.));
        assert_eq!(summary.predictions.len(), 76);
        assert_eq!(
            summary.predictions.iter().filter(|r| r.split == Subset::Test).count(),
            20
        );
        assert!(summary.predictions.iter().all(|r| r.prediction.is_finite()));
        assert!(summary.predictions.iter().all(|r| match r.split {
            Subset::Train => r.time < 30.,
            Subset::Test => r.time >= 30.,
        }));
    }

    #[test]
    fn seeded_runs_repeat() {
        let dir = scratch_dir("seeded");
        let data = dir.join("measles.csv");
        write_dataset(&data);

        let a = train(&config(), &data).unwrap();
        let b = train(&config(), &data).unwrap();

        assert_eq!(a.history, b.history);
        assert_eq!(a.predictions, b.predictions);
    }

    #[test]
    fn writes_both_tables() {
        let dir = scratch_dir("outputs");
        let data = dir.join("measles.csv");
        write_dataset(&data);

        let mut config = config();
        config.output = OutputConfig {
            predictions: dir.join("predictions.csv"),
            history: dir.join("history.csv"),
        };

        let summary = train(&config, &data).unwrap();
        write_outputs(&summary, &config.output).unwrap();

        let history = fs::read_to_string(&config.output.history).unwrap();
        assert!(history.starts_with("epoch,train_loss,test_loss\n1,"));
        assert_eq!(history.lines().count(), 4);

        let predictions = Table::read_csv(&config.output.predictions).unwrap();
        assert_eq!(predictions.headers(), ["time", "city", "split", "cases", "prediction"]);
        assert_eq!(predictions.nrows(), 76);
    }

    #[test]
    fn filter_writes_the_reduced_table() {
        let dir = scratch_dir("filter");
        let a = dir.join("train.csv");
        let b = dir.join("test.csv");
        let out = dir.join("filtered.csv.gz");
        let header = "city,time,cases,pop,susc_lag_1,cases_lag_1\n";
        fs::write(&a, format!("{header}A,0,1,9,0,0\nB,0,1,1,0,0\n")).unwrap();
        fs::write(&b, format!("{header}A,1,2,9,0,1\nB,1,1,1,0,1\n")).unwrap();

        let config = FilterConfig {
            top_n: 1,
            columns: crate::filter::ColumnFilter {
                drop: vec!["pop".into()],
                exclude_substrings: vec!["susc".into()],
            },
            ..Default::default()
        };
        filter(&[a, b], &out, &config).unwrap();
        assert!(fs::read(&out).unwrap().starts_with(&[0x1f, 0x8b]));

        let table = Table::read_csv(&out).unwrap();
        assert_eq!(table.headers(), ["city", "time", "cases", "cases_lag_1"]);
        assert_eq!(table.column("city").unwrap(), ["A", "A"]);
    }

    #[test]
    fn missing_data_file_fails() {
        let dir = scratch_dir("missing");

        assert!(train(&config(), &dir.join("nope.csv")).is_err());
    }
}
