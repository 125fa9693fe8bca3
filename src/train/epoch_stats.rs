use serde::{Serialize, Deserialize};

/// Metrics recorded at the end of one epoch.
///
/// One value is appended to the run history per completed epoch and, when a
/// `progress_tx` channel is configured in `TrainConfig`, also sent on it.
/// Values are never modified after they are recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Total epochs requested for this run.
    pub total_epochs: usize,
    /// Mean of the per-batch training losses.
    pub train_loss: f64,
    /// Mean of the per-batch validation losses.
    pub val_loss: f64,
    /// Validation accuracy in percent, within [0, 100].
    pub val_accuracy: f64,
    /// Wall-clock duration of the epoch in milliseconds.
    pub elapsed_ms: u64,
}
