use serde::Serialize;

/// The losses recorded at the end of one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EpochLoss {
    /// One based index of the epoch.
    pub epoch: usize,
    /// Mean of the batch losses seen during the epoch.
    pub train_loss: f32,
    /// Loss over the whole test set once the epoch finished.
    pub test_loss: f32,
}

/// The per epoch losses of a training run, in the order they were recorded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LossHistory {
    entries: Vec<EpochLoss>,
}

impl LossHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, entry: EpochLoss) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[EpochLoss] {
        &self.entries
    }

    pub fn last(&self) -> Option<&EpochLoss> {
        self.entries.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EpochLoss> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a LossHistory {
    type Item = &'a EpochLoss;
    type IntoIter = std::slice::Iter<'a, EpochLoss>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
