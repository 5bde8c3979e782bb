use crate::observations::Observations;

/// Row indices of the training and test partitions, each in input order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Partitions the observations by time: rows before `threshold` go to train, the rest to test.
pub fn split_at(observations: &Observations, threshold: f64) -> Split {
    split_times(observations.times(), threshold)
}

/// Partitions row indices by their time: `time < threshold` is train, anything else is test.
pub fn split_times(times: &[f64], threshold: f64) -> Split {
    let (train, test) = (0..times.len()).partition(|&i| times[i] < threshold);
    Split { train, test }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn two_cities_split_at_six() {
        // cities A and B, times 0..10 each, interleaved
        let times: Vec<f64> = (0..10).flat_map(|t| [t as f64, t as f64]).collect();
        let split = split_times(&times, 6.);

        assert_eq!(split.train.len(), 12);
        assert_eq!(split.test.len(), 8);
        assert!(split.train.iter().all(|&i| times[i] < 6.));
        assert!(split.test.iter().all(|&i| times[i] >= 6.));
    }

    #[test]
    fn threshold_row_goes_to_test() {
        let split = split_times(&[59., 60., 61.], 60.);

        assert_eq!(split.train, [0]);
        assert_eq!(split.test, [1, 2]);
    }

    proptest! {
        #[test]
        fn split_is_a_partition(
            times in prop::collection::vec(-50i32..150, 0..200),
            threshold in -60i32..160,
        ) {
            let times: Vec<f64> = times.into_iter().map(f64::from).collect();
            let split = split_times(&times, f64::from(threshold));

            let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
            all.sort_unstable();
            prop_assert_eq!(all, (0..times.len()).collect::<Vec<_>>());

            prop_assert!(split.train.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(split.test.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
