use crate::{error::Result, scaler::CityScalers, target::exp_cases};

/// Maps a standardized prediction of `city` back to a case count.
///
/// # Returns
/// A missing scaler error if no scaler was fit for `city`.
pub fn unscale(scalers: &CityScalers, city: &str, standardized: f64) -> Result<f64> {
    let log_cases = scalers.inverse(city, standardized)?;
    Ok(exp_cases(log_cases))
}

/// Unscales every prediction with the scaler of the city of its row.
pub fn unscale_all<S, I>(scalers: &CityScalers, cities: &[S], standardized: I) -> Result<Vec<f64>>
where
    S: AsRef<str>,
    I: IntoIterator<Item = f64>,
{
    cities
        .iter()
        .zip(standardized)
        .map(|(city, z)| unscale(scalers, city.as_ref(), z))
        .collect()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::target::log_cases_all;

    #[test]
    fn unscale_undoes_preparation() {
        let cities = ["A", "A", "A", "B", "B"];
        let cases = [0., 12., 40., 1000., 2500.];
        let logs = log_cases_all(&cases).unwrap();
        let scalers = CityScalers::fit(&cities, &logs).unwrap();
        let z = scalers.transform_all(&cities, &logs).unwrap();

        let back = unscale_all(&scalers, &cities, z).unwrap();

        for (b, c) in back.iter().zip(cases) {
            assert_relative_eq!(*b, c, epsilon = 1e-9, max_relative = 1e-9);
        }
    }

    #[test]
    fn uses_the_scaler_of_the_row_city() {
        let scalers = CityScalers::fit(&["A", "B"], &[1., 5.]).unwrap();

        // constant series: std 1, so z = 0 maps back to the city mean
        assert_relative_eq!(unscale(&scalers, "A", 0.).unwrap(), 1f64.exp_m1());
        assert_relative_eq!(unscale(&scalers, "B", 0.).unwrap(), 5f64.exp_m1());
    }

    #[test]
    fn unknown_city_fails() {
        let scalers = CityScalers::fit(&["A"], &[1.]).unwrap();

        assert!(unscale(&scalers, "Z", 0.).is_err());
        assert!(unscale_all(&scalers, &["A", "Z"], [0., 0.]).is_err());
    }
}
