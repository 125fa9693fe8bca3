use std::sync::mpsc;

use crate::error::{Result, TrainError};
use crate::train::epoch_stats::EpochMetrics;

/// Configuration for an `EpochTrainer` run.
///
/// # Fields
/// - `epochs`      — number of train + validation passes to run
/// - `log_every`   — a progress line is logged every `log_every` epochs and
///                   after the last one
/// - `progress_tx` — optional channel sender; one `EpochMetrics` is sent per
///                   completed epoch. A dropped receiver does not stop the run.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub epochs: usize,
    pub log_every: usize,
    pub progress_tx: Option<mpsc::Sender<EpochMetrics>>,
}

impl TrainConfig {
    /// Creates a `TrainConfig` that logs every fifth epoch and has no
    /// progress channel.
    pub fn new(epochs: usize) -> Self {
        TrainConfig { epochs, log_every: 5, progress_tx: None }
    }

    pub fn log_every(mut self, log_every: usize) -> Self {
        self.log_every = log_every;
        self
    }

    pub fn progress(mut self, tx: mpsc::Sender<EpochMetrics>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.log_every == 0 {
            return Err(TrainError::InvalidConfig("log_every must be at least 1".into()));
        }
        Ok(())
    }
}
