use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{PrepError, Result};

/// A fitted `(mean, std)` pair mapping values to zero mean and unit variance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StandardScaler {
    mean: f64,
    std: f64,
}

impl StandardScaler {
    /// Fits a scaler on `values` with the population standard deviation.
    ///
    /// A zero standard deviation is stored as 1, so a constant series maps to 0.
    ///
    /// # Returns
    /// `None` if there are no values.
    pub fn fit(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = match var.sqrt() {
            std if std > 0. => std,
            _ => 1.,
        };

        Some(Self { mean, std })
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn std(&self) -> f64 {
        self.std
    }

    pub fn transform(&self, x: f64) -> f64 {
        (x - self.mean) / self.std
    }

    pub fn inverse(&self, z: f64) -> f64 {
        z * self.std + self.mean
    }
}

/// One `StandardScaler` per city, fit once and then only read.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CityScalers {
    scalers: BTreeMap<String, StandardScaler>,
}

impl CityScalers {
    /// Fits one scaler per distinct city on the values of its rows.
    ///
    /// # Arguments
    /// * `cities` - The city of each row.
    /// * `values` - The value of each row, aligned with `cities`.
    pub fn fit<S: AsRef<str>>(cities: &[S], values: &[f64]) -> Result<Self> {
        if cities.len() != values.len() {
            return Err(PrepError::schema(format!(
                "{} cities for {} values",
                cities.len(),
                values.len()
            )));
        }

        let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for (city, &value) in cities.iter().zip(values) {
            groups.entry(city.as_ref()).or_default().push(value);
        }

        let scalers = groups
            .into_iter()
            .filter_map(|(city, values)| {
                StandardScaler::fit(&values).map(|scaler| (city.to_string(), scaler))
            })
            .collect();

        Ok(Self { scalers })
    }

    /// The scaler of `city`.
    ///
    /// # Returns
    /// A missing scaler error if none was fit for it.
    pub fn get(&self, city: &str) -> Result<&StandardScaler> {
        self.scalers.get(city).ok_or_else(|| PrepError::MissingScaler {
            city: city.to_string(),
        })
    }

    pub fn transform(&self, city: &str, x: f64) -> Result<f64> {
        Ok(self.get(city)?.transform(x))
    }

    pub fn inverse(&self, city: &str, z: f64) -> Result<f64> {
        Ok(self.get(city)?.inverse(z))
    }

    /// Standardizes every row with the scaler of its own city.
    pub fn transform_all<S: AsRef<str>>(&self, cities: &[S], values: &[f64]) -> Result<Vec<f64>> {
        cities
            .iter()
            .zip(values)
            .map(|(city, &x)| self.transform(city.as_ref(), x))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.scalers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scalers.is_empty()
    }

    /// Iterates the fitted `(city, scaler)` pairs in city order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StandardScaler)> {
        self.scalers.iter().map(|(city, scaler)| (city.as_str(), scaler))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn standardizes_to_zero_mean_unit_std() {
        let values = [1., 2., 3., 4., 10.];
        let scaler = StandardScaler::fit(&values).unwrap();
        let z: Vec<f64> = values.iter().map(|&v| scaler.transform(v)).collect();

        let mean = z.iter().sum::<f64>() / z.len() as f64;
        let var = z.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / z.len() as f64;
        assert_relative_eq!(mean, 0., epsilon = 1e-12);
        assert_relative_eq!(var.sqrt(), 1., epsilon = 1e-12);
    }

    #[test]
    fn uses_the_population_std() {
        let scaler = StandardScaler::fit(&[1., 3.]).unwrap();

        assert_eq!(scaler.mean(), 2.);
        assert_eq!(scaler.std(), 1.);
    }

    #[test]
    fn constant_series_maps_to_zero() {
        let scaler = StandardScaler::fit(&[4., 4., 4.]).unwrap();

        assert_eq!(scaler.std(), 1.);
        assert_eq!(scaler.transform(4.), 0.);
    }

    #[test]
    fn nothing_to_fit_on() {
        assert!(StandardScaler::fit(&[]).is_none());
    }

    #[test]
    fn each_city_gets_its_own_scaler() {
        let cities = ["A", "B", "A", "B"];
        let values = [0., 100., 2., 300.];
        let scalers = CityScalers::fit(&cities, &values).unwrap();

        assert_eq!(scalers.len(), 2);
        assert_eq!(scalers.get("A").unwrap().mean(), 1.);
        assert_eq!(scalers.get("B").unwrap().mean(), 200.);
        assert_eq!(scalers.transform_all(&cities, &values).unwrap(), [-1., -1., 1., 1.]);
    }

    #[test]
    fn unknown_city_is_a_missing_scaler() {
        let scalers = CityScalers::fit(&["A"], &[1.]).unwrap();

        assert!(matches!(
            scalers.transform("C", 1.),
            Err(PrepError::MissingScaler { city }) if city == "C"
        ));
        assert!(scalers.inverse("C", 0.).is_err());
    }

    #[test]
    fn misaligned_inputs_are_rejected() {
        assert!(CityScalers::fit(&["A", "B"], &[1.]).is_err());
    }

    proptest! {
        #[test]
        fn inverse_undoes_transform(
            values in prop::collection::vec(0f64..1e4, 1..50),
            x in 0f64..1e4,
        ) {
            let scaler = StandardScaler::fit(&values).unwrap();
            let back = scaler.inverse(scaler.transform(x));

            prop_assert!((back - x).abs() <= 1e-9 * x.abs().max(1.));
        }
    }
}
