use std::collections::HashMap;

use log::warn;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::{
    error::{PrepError, Result},
    table::Table,
};

/// Which columns of a table hold the grouping key, the time bin and the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservationSchema {
    pub city: String,
    pub time: String,
    pub cases: String,
    /// Extra columns never used as features.
    pub exclude: Vec<String>,
}

impl Default for ObservationSchema {
    fn default() -> Self {
        Self {
            city: "city".into(),
            time: "time".into(),
            cases: "cases".into(),
            exclude: Vec::new(),
        }
    }
}

/// Rows of (city, time bin, case count) together with their numeric lag features.
#[derive(Debug, Clone, PartialEq)]
pub struct Observations {
    cities: Vec<String>,
    times: Vec<f64>,
    cases: Vec<f64>,
    feature_names: Vec<String>,
    features: Array2<f32>,
}

impl Observations {
    /// Extracts the observations held by a table.
    ///
    /// Every column other than the city, time, cases and excluded ones is a feature
    /// if all of its cells parse as numbers. Other columns are skipped with a warning.
    ///
    /// # Returns
    /// A schema error if a required column is missing or has an unparsable cell, if a
    /// numeric cell is NaN or infinite, if no feature column remains, or if the times of
    /// a city are not evenly spaced and increasing.
    pub fn from_table(table: &Table, schema: &ObservationSchema) -> Result<Self> {
        let cities: Vec<String> = table
            .require_column(&schema.city)?
            .iter()
            .map(|c| c.trim().to_string())
            .collect();
        let times = parse_column(&schema.time, table.require_column(&schema.time)?)?;
        let cases = parse_column(&schema.cases, table.require_column(&schema.cases)?)?;

        check_time_order(&cities, &times)?;

        let reserved = [&schema.city, &schema.time, &schema.cases];
        let mut feature_names = Vec::new();
        let mut feature_columns = Vec::new();

        for (name, cells) in table.columns() {
            let excluded = schema.exclude.iter().any(|e| e == name);
            if excluded || reserved.iter().any(|r| r.as_str() == name) {
                continue;
            }

            match parse_feature(name, cells)? {
                Some(values) => {
                    feature_names.push(name.to_string());
                    feature_columns.push(values);
                }
                None => warn!("skipping non numeric column '{name}'"),
            }
        }

        if feature_names.is_empty() {
            return Err(PrepError::schema("no numeric feature columns"));
        }

        let features = Array2::from_shape_fn((cities.len(), feature_columns.len()), |(i, j)| {
            feature_columns[j][i]
        });

        Ok(Self {
            cities,
            times,
            cases,
            feature_names,
            features,
        })
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn cities(&self) -> &[String] {
        &self.cities
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn cases(&self) -> &[f64] {
        &self.cases
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn features(&self) -> &Array2<f32> {
        &self.features
    }
}

/// How far a step between two time bins may drift from the first step of its city.
const STEP_TOLERANCE: f64 = 0.1;

fn parse_column(name: &str, cells: &[String]) -> Result<Vec<f64>> {
    cells
        .iter()
        .enumerate()
        .map(|(row, cell)| {
            let value: f64 = cell.trim().parse().map_err(|_| {
                PrepError::schema(format!("column '{name}' row {row}: cannot parse '{cell}'"))
            })?;
            check_finite(name, row, cell, value.is_finite())?;
            Ok(value)
        })
        .collect()
}

/// Parses a feature column, or returns `None` if one of its cells is not a number.
fn parse_feature(name: &str, cells: &[String]) -> Result<Option<Vec<f32>>> {
    let mut values = Vec::with_capacity(cells.len());

    for (row, cell) in cells.iter().enumerate() {
        let Ok(value) = cell.trim().parse::<f32>() else {
            return Ok(None);
        };
        check_finite(name, row, cell, value.is_finite())?;
        values.push(value);
    }

    Ok(Some(values))
}

fn check_finite(name: &str, row: usize, cell: &str, finite: bool) -> Result<()> {
    if finite {
        return Ok(());
    }

    Err(PrepError::schema(format!(
        "column '{name}' row {row}: '{cell}' is not a finite number"
    )))
}

/// Times within a city must increase by the same step from one row to the next.
fn check_time_order(cities: &[String], times: &[f64]) -> Result<()> {
    let mut last: HashMap<&str, (f64, Option<f64>)> = HashMap::new();

    for (row, (city, &time)) in cities.iter().zip(times).enumerate() {
        let Some((prev, step)) = last.get_mut(city.as_str()) else {
            last.insert(city.as_str(), (time, None));
            continue;
        };

        let gap = time - *prev;
        if gap <= 0. {
            return Err(PrepError::schema(format!(
                "row {row}: time {time} of city '{city}' does not follow {prev}"
            )));
        }

        match *step {
            Some(step) if (gap - step).abs() > STEP_TOLERANCE * step => {
                return Err(PrepError::schema(format!(
                    "row {row}: time {time} of city '{city}' is {gap} after {prev}, expected a step of {step}"
                )));
            }
            Some(_) => {}
            None => *step = Some(gap),
        }

        *prev = time;
    }

    Ok(())
}
