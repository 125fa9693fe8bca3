use crate::data::sample::Sample;
use crate::error::{Result, TrainError};

/// Indexed access to labelled samples.
///
/// A dataset only provides samples; batching and ordering belong to
/// `DataLoader`.
pub trait Dataset {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetches a sample by index.
    ///
    /// # Errors
    /// `TrainError::IndexOutOfBounds` if `index >= len()`, or whatever
    /// loading the sample produced.
    fn get(&self, index: usize) -> Result<Sample>;
}

/// Dataset backed by vectors already in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataset {
    inputs: Vec<Vec<f64>>,
    labels: Vec<usize>,
}

impl InMemoryDataset {
    pub fn new(inputs: Vec<Vec<f64>>, labels: Vec<usize>) -> Result<Self> {
        if inputs.len() != labels.len() {
            return Err(TrainError::ShapeMismatch {
                what: "labels",
                got: labels.len(),
                expected: inputs.len(),
            });
        }
        Ok(InMemoryDataset { inputs, labels })
    }
}

impl Dataset for InMemoryDataset {
    fn len(&self) -> usize {
        self.inputs.len()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        let input = self.inputs.get(index)
            .ok_or(TrainError::IndexOutOfBounds { index, len: self.inputs.len() })?;
        Ok(Sample { input: input.clone(), label: self.labels[index] })
    }
}

impl<D: Dataset + ?Sized> Dataset for &D {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        (**self).get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_stored_sample() {
        let ds = InMemoryDataset::new(vec![vec![0.0], vec![1.0]], vec![3, 4]).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(1).unwrap(), Sample { input: vec![1.0], label: 4 });
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let ds = InMemoryDataset::new(vec![vec![0.0]], vec![0]).unwrap();
        assert!(matches!(ds.get(1), Err(TrainError::IndexOutOfBounds { index: 1, len: 1 })));
    }

    #[test]
    fn new_rejects_mismatched_lengths() {
        assert!(InMemoryDataset::new(vec![vec![0.0]], vec![]).is_err());
    }
}
