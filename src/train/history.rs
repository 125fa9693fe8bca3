use std::fmt::Write as _;

use serde::{Serialize, Deserialize};

use crate::error::Result;
use crate::train::epoch_stats::EpochMetrics;

/// Highest validation accuracy seen so far. Never decreases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BestScore {
    value: f64,
    epoch: Option<usize>,
}

impl BestScore {
    /// Records `score` for `epoch`; returns true when it is a new best.
    /// NaN scores are ignored.
    pub fn update(&mut self, epoch: usize, score: f64) -> bool {
        if score > self.value || (self.epoch.is_none() && score == self.value) {
            self.value = score;
            self.epoch = Some(epoch);
            true
        } else {
            false
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Epoch that first reached the current best, if any epoch has run.
    pub fn epoch(&self) -> Option<usize> {
        self.epoch
    }
}

/// Ordered per-epoch metrics of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    epochs: Vec<EpochMetrics>,
}

impl TrainingHistory {
    pub fn push(&mut self, metrics: EpochMetrics) {
        self.epochs.push(metrics);
    }

    pub fn epochs(&self) -> &[EpochMetrics] {
        &self.epochs
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    pub fn last(&self) -> Option<&EpochMetrics> {
        self.epochs.last()
    }

    pub fn train_losses(&self) -> Vec<f64> {
        self.epochs.iter().map(|m| m.train_loss).collect()
    }

    pub fn val_losses(&self) -> Vec<f64> {
        self.epochs.iter().map(|m| m.val_loss).collect()
    }

    pub fn val_accuracies(&self) -> Vec<f64> {
        self.epochs.iter().map(|m| m.val_accuracy).collect()
    }

    /// One header line plus one line per epoch, for spreadsheet or plotting
    /// tools.
    pub fn to_csv(&self) -> String {
        let mut out = String::from("epoch,train_loss,val_loss,val_accuracy,elapsed_ms\n");
        for m in &self.epochs {
            let _ = writeln!(
                out,
                "{},{},{},{},{}",
                m.epoch, m.train_loss, m.val_loss, m.val_accuracy, m.elapsed_ms
            );
        }
        out
    }
}

/// Everything a finished run hands to reporting and plotting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub history: TrainingHistory,
    pub best_score: BestScore,
}

impl TrainingReport {
    pub fn train_losses(&self) -> Vec<f64> {
        self.history.train_losses()
    }

    pub fn val_losses(&self) -> Vec<f64> {
        self.history.val_losses()
    }

    /// Serializes the report to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load_json(path: &str) -> Result<TrainingReport> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(epoch: usize, train_loss: f64, val_accuracy: f64) -> EpochMetrics {
        EpochMetrics {
            epoch,
            total_epochs: 3,
            train_loss,
            val_loss: train_loss * 2.0,
            val_accuracy,
            elapsed_ms: 1,
        }
    }

    #[test]
    fn best_score_only_rises() {
        let mut best = BestScore::default();
        let mut seen = Vec::new();
        for (epoch, score) in [10.0, 40.0, 25.0, 60.0, 55.0].into_iter().enumerate() {
            best.update(epoch + 1, score);
            seen.push(best.value());
        }
        assert_eq!(seen, vec![10.0, 40.0, 40.0, 60.0, 60.0]);
        assert_eq!(best.epoch(), Some(4));
    }

    #[test]
    fn best_score_ignores_nan() {
        let mut best = BestScore::default();
        best.update(1, 20.0);
        assert!(!best.update(2, f64::NAN));
        assert_eq!(best.value(), 20.0);
    }

    #[test]
    fn zero_accuracy_first_epoch_is_recorded() {
        let mut best = BestScore::default();
        assert!(best.update(1, 0.0));
        assert_eq!(best.epoch(), Some(1));
        assert!(!best.update(2, 0.0));
        assert_eq!(best.epoch(), Some(1));
    }

    #[test]
    fn history_exposes_ordered_series() {
        let mut h = TrainingHistory::default();
        h.push(metrics(1, 1.0, 50.0));
        h.push(metrics(2, 0.5, 75.0));
        assert_eq!(h.train_losses(), vec![1.0, 0.5]);
        assert_eq!(h.val_losses(), vec![2.0, 1.0]);
        assert_eq!(h.val_accuracies(), vec![50.0, 75.0]);
    }

    #[test]
    fn csv_has_header_and_a_row_per_epoch() {
        let mut h = TrainingHistory::default();
        h.push(metrics(1, 1.0, 50.0));
        let csv = h.to_csv();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "1,1,2,50,1");
    }

    #[test]
    fn report_round_trips_through_json_file() {
        let mut report = TrainingReport::default();
        report.history.push(metrics(1, 0.75, 33.0));
        report.best_score.update(1, 33.0);
        let path = std::env::temp_dir()
            .join(format!("epoch-trainer-report-{}.json", std::process::id()));
        let path = path.to_str().unwrap();

        report.save_json(path).unwrap();
        let loaded = TrainingReport::load_json(path).unwrap();
        std::fs::remove_file(path).unwrap();
        assert_eq!(loaded, report);
    }
}
