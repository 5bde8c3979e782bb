use std::{num::NonZeroUsize, slice::Chunks};

use ndarray::{Array2, ArrayView2, Axis, s};
use rand::{Rng, seq::SliceRandom};

use crate::{MlErr, Result};

/// An in-memory supervised dataset: one row of features and one row of targets per sample.
///
/// The rows are never moved; shuffling permutes an index order that `batches` walks,
/// so every sample is visited exactly once per pass.
#[derive(Debug, Clone)]
pub struct Dataset {
    x: Array2<f32>,
    y: Array2<f32>,
    order: Vec<usize>,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Arguments
    /// * `x` - The features, one row per sample.
    /// * `y` - The targets, one row per sample.
    ///
    /// # Returns
    /// An error if `x` and `y` have a different amount of rows.
    pub fn new(x: Array2<f32>, y: Array2<f32>) -> Result<Self> {
        if x.nrows() != y.nrows() {
            return Err(MlErr::SizeMismatch {
                what: "dataset target rows",
                got: y.nrows(),
                expected: x.nrows(),
            });
        }

        let order = (0..x.nrows()).collect();
        Ok(Self { x, y, order })
    }

    /// Creates a new `Dataset` from row-major samples where each row holds `x_size`
    /// features followed by `y_size` targets.
    pub fn from_flat(data: Vec<f32>, x_size: usize, y_size: usize) -> Result<Self> {
        let row_size = x_size + y_size;

        if row_size == 0 || data.len() % row_size != 0 {
            return Err(MlErr::InvalidSpec(format!(
                "dataset length ({}) is not divisible by x_size + y_size ({row_size})",
                data.len()
            )));
        }

        let rows = Array2::from_shape_vec((data.len() / row_size, row_size), data)?;
        let x = rows.slice(s![.., ..x_size]).to_owned();
        let y = rows.slice(s![.., x_size..]).to_owned();
        Self::new(x, y)
    }

    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn x_size(&self) -> usize {
        self.x.ncols()
    }

    pub fn y_size(&self) -> usize {
        self.y.ncols()
    }

    pub fn x(&self) -> ArrayView2<'_, f32> {
        self.x.view()
    }

    pub fn y(&self) -> ArrayView2<'_, f32> {
        self.y.view()
    }

    /// Permutes the order in which `batches` visits the samples.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.order.shuffle(rng);
    }

    /// The amount of batches a pass over the dataset is cut into, `ceil(len / batch_size)`.
    pub fn num_batches(&self, batch_size: NonZeroUsize) -> usize {
        self.len().div_ceil(batch_size.get())
    }

    /// The sample indices of each batch, in the current order. Every batch holds
    /// `batch_size` indices except possibly the last one.
    pub fn batch_indices(&self, batch_size: NonZeroUsize) -> Chunks<'_, usize> {
        self.order.chunks(batch_size.get())
    }

    /// Iterates the dataset in batches of `(x, y)`, following the current order.
    pub fn batches(
        &self,
        batch_size: NonZeroUsize,
    ) -> impl Iterator<Item = (Array2<f32>, Array2<f32>)> + '_ {
        self.batch_indices(batch_size)
            .map(|idx| (self.x.select(Axis(0), idx), self.y.select(Axis(0), idx)))
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn ramp(n: usize) -> Dataset {
        let data = (0..n).flat_map(|i| [i as f32, i as f32 * 10.]).collect();
        Dataset::from_flat(data, 1, 1).unwrap()
    }

    fn batch_size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn mismatched_rows_are_rejected() {
        let x = Array2::zeros((3, 2));
        let y = Array2::zeros((2, 1));

        assert!(Dataset::new(x, y).is_err());
    }

    #[test]
    fn flat_data_must_be_a_whole_amount_of_rows() {
        assert!(Dataset::from_flat(vec![0.; 5], 1, 1).is_err());
    }

    #[test]
    fn from_flat_splits_features_and_targets() {
        let ds = ramp(3);

        assert_eq!(ds.len(), 3);
        assert_eq!(ds.x_size(), 1);
        assert_eq!(ds.y_size(), 1);
        assert_eq!(ds.y()[[2, 0]], 20.);
    }

    #[test]
    fn batch_count_is_the_ceiling() {
        let ds = ramp(10);

        assert_eq!(ds.num_batches(batch_size(4)), 3);
        assert_eq!(ds.batch_indices(batch_size(4)).count(), 3);
        assert_eq!(ds.num_batches(batch_size(5)), 2);
        assert_eq!(ds.num_batches(batch_size(64)), 1);
    }

    #[test]
    fn last_batch_may_be_smaller() {
        let ds = ramp(10);
        let sizes: Vec<_> = ds.batches(batch_size(4)).map(|(x, _)| x.nrows()).collect();

        assert_eq!(sizes, [4, 4, 2]);
    }

    #[test]
    fn every_index_appears_once_per_pass() {
        let mut ds = ramp(23);
        let mut rng = StdRng::seed_from_u64(5);

        for _ in 0..3 {
            ds.shuffle(&mut rng);
            let mut seen: Vec<usize> = ds.batch_indices(batch_size(4)).flatten().copied().collect();
            seen.sort_unstable();
            assert_eq!(seen, (0..23).collect::<Vec<_>>());
        }
    }

    #[test]
    fn batches_keep_features_and_targets_aligned() {
        let mut ds = ramp(9);
        ds.shuffle(&mut StdRng::seed_from_u64(1));

        for (x, y) in ds.batches(batch_size(2)) {
            for (xi, yi) in x.iter().zip(y.iter()) {
                assert_eq!(*yi, xi * 10.);
            }
        }
    }
}
