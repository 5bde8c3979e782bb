//! The `ln(x + 1)` transform applied to case counts before standardizing.

use crate::error::{PrepError, Result};

/// Maps a case count to `ln(count + 1)`.
///
/// # Arguments
/// * `row` - The row the count was read from, reported on failure.
/// * `count` - The case count.
///
/// # Returns
/// An invalid target error if the count is negative or not finite.
pub fn log_cases(row: usize, count: f64) -> Result<f64> {
    if !count.is_finite() || count < 0. {
        return Err(PrepError::InvalidTarget { row, value: count });
    }

    Ok(count.ln_1p())
}

/// Applies `log_cases` to every count, failing on the first invalid one.
pub fn log_cases_all(counts: &[f64]) -> Result<Vec<f64>> {
    counts
        .iter()
        .enumerate()
        .map(|(row, &count)| log_cases(row, count))
        .collect()
}

/// The inverse of `log_cases`, `exp(x) - 1`.
pub fn exp_cases(x: f64) -> f64 {
    x.exp_m1()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn zero_cases_map_to_zero() {
        assert_eq!(log_cases(0, 0.).unwrap(), 0.);
    }

    #[test]
    fn matches_ln_of_x_plus_one() {
        assert_relative_eq!(log_cases(0, 99.).unwrap(), 100f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn negative_counts_are_rejected() {
        assert!(matches!(
            log_cases_all(&[1., 2., -1.]),
            Err(PrepError::InvalidTarget { row: 2, .. })
        ));
    }

    #[test]
    fn non_finite_counts_are_rejected() {
        assert!(log_cases(0, f64::NAN).is_err());
        assert!(log_cases(0, f64::INFINITY).is_err());
    }

    #[test]
    fn exp_cases_inverts_log_cases() {
        for count in [0., 1., 17., 1234.5] {
            let back = exp_cases(log_cases(0, count).unwrap());
            assert_relative_eq!(back, count, max_relative = 1e-12);
        }
    }
}
