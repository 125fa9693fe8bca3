use log::debug;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::data::dataset::Dataset;
use crate::data::sample::Batch;
use crate::error::{Result, TrainError};

/// Groups a dataset into fixed-size batches.
///
/// Each call to `iter` starts a fresh pass over the dataset, reshuffling the
/// sample order first when shuffling is enabled. The final partial batch is
/// kept unless `drop_last` is set.
pub struct DataLoader<D: Dataset> {
    dataset: D,
    batch_size: usize,
    shuffle: bool,
    drop_last: bool,
    rng: StdRng,
    order: Vec<usize>,
}

impl<D: Dataset> DataLoader<D> {
    /// Loader visiting samples in index order.
    pub fn new(dataset: D, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(TrainError::InvalidConfig("batch_size must be at least 1".into()));
        }
        let order = (0..dataset.len()).collect();
        Ok(DataLoader {
            dataset,
            batch_size,
            shuffle: false,
            drop_last: false,
            rng: StdRng::from_entropy(),
            order,
        })
    }

    /// Shuffles the sample order at the start of every pass. A seed makes the
    /// sequence of orders reproducible.
    pub fn shuffled(mut self, seed: Option<u64>) -> Self {
        self.shuffle = true;
        if let Some(seed) = seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        self
    }

    /// Skips the final batch when it would be smaller than `batch_size`.
    pub fn drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }

    pub fn dataset(&self) -> &D {
        &self.dataset
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffle
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Batches per pass: `ceil(len / batch_size)`, or `floor` with `drop_last`.
    pub fn num_batches(&self) -> usize {
        let n = self.dataset.len();
        if self.drop_last {
            n / self.batch_size
        } else {
            n.div_ceil(self.batch_size)
        }
    }

    /// Samples visited per pass.
    pub fn num_samples(&self) -> usize {
        if self.drop_last {
            self.num_batches() * self.batch_size
        } else {
            self.dataset.len()
        }
    }

    /// Starts a new pass over the dataset.
    pub fn iter(&mut self) -> Batches<'_, D> {
        if self.order.len() != self.dataset.len() {
            self.order = (0..self.dataset.len()).collect();
        }
        if self.shuffle {
            self.order.shuffle(&mut self.rng);
            debug!("reshuffled {} samples", self.order.len());
        }
        Batches {
            dataset: &self.dataset,
            order: &self.order[..self.num_samples()],
            batch_size: self.batch_size,
            position: 0,
        }
    }
}

/// One pass of batches from a `DataLoader`. Samples are loaded lazily as
/// each batch is requested.
pub struct Batches<'a, D: Dataset> {
    dataset: &'a D,
    order: &'a [usize],
    batch_size: usize,
    position: usize,
}

impl<D: Dataset> Iterator for Batches<'_, D> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.order.len() {
            return None;
        }
        let end = (self.position + self.batch_size).min(self.order.len());
        let indices = &self.order[self.position..end];
        self.position = end;

        let samples: Result<Vec<_>> = indices.iter().map(|&i| self.dataset.get(i)).collect();
        Some(samples.and_then(Batch::from_samples))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.order.len() - self.position).div_ceil(self.batch_size);
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::InMemoryDataset;

    fn dataset(n: usize) -> InMemoryDataset {
        let inputs = (0..n).map(|i| vec![i as f64]).collect();
        InMemoryDataset::new(inputs, (0..n).collect()).unwrap()
    }

    fn labels_of(loader: &mut DataLoader<InMemoryDataset>) -> Vec<Vec<usize>> {
        loader.iter().map(|b| b.unwrap().labels).collect()
    }

    #[test]
    fn keeps_partial_batch_by_default() {
        let mut loader = DataLoader::new(dataset(10), 4).unwrap();
        assert_eq!(loader.num_batches(), 3);
        assert_eq!(
            labels_of(&mut loader),
            vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7], vec![8, 9]]
        );
    }

    #[test]
    fn drop_last_skips_partial_batch() {
        let mut loader = DataLoader::new(dataset(10), 4).unwrap().drop_last(true);
        assert_eq!(loader.num_batches(), 2);
        assert_eq!(loader.num_samples(), 8);
        assert_eq!(labels_of(&mut loader).len(), 2);
    }

    #[test]
    fn iter_restarts_the_sequence() {
        let mut loader = DataLoader::new(dataset(5), 2).unwrap();
        let first = labels_of(&mut loader);
        let second = labels_of(&mut loader);
        assert_eq!(first, second);
    }

    #[test]
    fn shuffled_pass_visits_every_sample_once() {
        let mut loader = DataLoader::new(dataset(20), 3).unwrap().shuffled(Some(11));
        for _ in 0..3 {
            let mut seen: Vec<usize> = labels_of(&mut loader).into_iter().flatten().collect();
            seen.sort_unstable();
            assert_eq!(seen, (0..20).collect::<Vec<_>>());
        }
    }

    #[test]
    fn seeded_shuffles_are_reproducible() {
        let mut a = DataLoader::new(dataset(20), 5).unwrap().shuffled(Some(4));
        let mut b = DataLoader::new(dataset(20), 5).unwrap().shuffled(Some(4));
        assert_eq!(labels_of(&mut a), labels_of(&mut b));
        assert_eq!(labels_of(&mut a), labels_of(&mut b));
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        assert!(matches!(
            DataLoader::new(dataset(3), 0),
            Err(TrainError::InvalidConfig(_))
        ));
    }
}
