use std::time::Instant;

use log::{debug, info, warn};

use crate::data::dataset::Dataset;
use crate::data::loader::DataLoader;
use crate::error::{Result, TrainError};
use crate::loss::loss_fn::Loss;
use crate::network::model::Model;
use crate::optim::optimizer::Optimizer;
use crate::train::epoch_stats::EpochMetrics;
use crate::train::history::{BestScore, TrainingHistory, TrainingReport};
use crate::train::step::{evaluate, train_step};
use crate::train::train_config::TrainConfig;

/// Where an `EpochTrainer` is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerState {
    NotStarted,
    /// `epoch` epochs have finished and at least one more remains.
    Running { epoch: usize },
    Completed,
}

/// Runs a fixed number of epochs, each one full training pass followed by
/// one full validation pass.
///
/// The trainer is the only writer of the model's parameters (through
/// `train_step`), of the best score, and of the history. Errors from any
/// step end the run and are returned as-is; epochs finished before the
/// failure stay in the history.
///
/// ```ignore
/// let mut trainer = EpochTrainer::new(&mut network, CrossEntropyLoss, Sgd::new(0.01), TrainConfig::new(100))?;
/// let report = trainer.run(&mut train_loader, &mut val_loader)?;
/// println!("best: {:.2}%", report.best_score.value());
/// ```
pub struct EpochTrainer<'a, M, L, O>
where
    M: Model + ?Sized,
    L: Loss,
    O: Optimizer,
{
    model: &'a mut M,
    loss: L,
    optimizer: O,
    config: TrainConfig,
    state: TrainerState,
    history: TrainingHistory,
    best: BestScore,
    progress_closed: bool,
}

impl<'a, M, L, O> EpochTrainer<'a, M, L, O>
where
    M: Model + ?Sized,
    L: Loss,
    O: Optimizer,
{
    pub fn new(model: &'a mut M, loss: L, optimizer: O, config: TrainConfig) -> Result<Self> {
        config.validate()?;
        Ok(EpochTrainer {
            model,
            loss,
            optimizer,
            config,
            state: TrainerState::NotStarted,
            history: TrainingHistory::default(),
            best: BestScore::default(),
            progress_closed: false,
        })
    }

    pub fn state(&self) -> TrainerState {
        self.state
    }

    pub fn history(&self) -> &TrainingHistory {
        &self.history
    }

    pub fn best_score(&self) -> BestScore {
        self.best
    }

    pub fn model(&self) -> &M {
        &*self.model
    }

    pub fn optimizer(&self) -> &O {
        &self.optimizer
    }

    pub fn report(&self) -> TrainingReport {
        TrainingReport { history: self.history.clone(), best_score: self.best }
    }

    /// Runs the next epoch and advances the state.
    ///
    /// # Errors
    /// `AlreadyCompleted` once every configured epoch has run,
    /// `EmptyDataset` when the training loader yields no batches,
    /// `InvalidConfig` when the validation loader shuffles, or any error
    /// raised while loading, training, or evaluating.
    pub fn run_epoch<T, V>(
        &mut self,
        train: &mut DataLoader<T>,
        val: &mut DataLoader<V>,
    ) -> Result<EpochMetrics>
    where
        T: Dataset,
        V: Dataset,
    {
        let epoch = match self.state {
            TrainerState::Completed => return Err(TrainError::AlreadyCompleted),
            _ if self.config.epochs == 0 => {
                self.state = TrainerState::Completed;
                return Err(TrainError::AlreadyCompleted);
            }
            TrainerState::NotStarted => 1,
            TrainerState::Running { epoch } => epoch + 1,
        };
        if train.num_batches() == 0 {
            return Err(TrainError::EmptyDataset("training"));
        }
        if val.is_shuffled() {
            return Err(TrainError::InvalidConfig(
                "validation loader must visit samples in a fixed order".into(),
            ));
        }
        if epoch == 1 && !train.is_shuffled() {
            warn!("training loader is not shuffled; every epoch sees the same batch order");
        }

        let started = Instant::now();
        let train_loss = self.train_pass(train)?;
        if !train_loss.is_finite() {
            warn!("epoch {epoch}: training loss is {train_loss}");
        }
        let summary = evaluate(&mut *self.model, &self.loss, val)?;

        let metrics = EpochMetrics {
            epoch,
            total_epochs: self.config.epochs,
            train_loss,
            val_loss: summary.avg_loss,
            val_accuracy: summary.accuracy_pct,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        if self.best.update(epoch, metrics.val_accuracy) {
            debug!("epoch {epoch}: new best validation accuracy {:.2}%", metrics.val_accuracy);
        }
        self.history.push(metrics.clone());
        self.report_progress(&metrics);

        self.state = if epoch >= self.config.epochs {
            TrainerState::Completed
        } else {
            TrainerState::Running { epoch }
        };
        Ok(metrics)
    }

    /// Runs every remaining epoch and returns the report.
    pub fn run<T, V>(
        &mut self,
        train: &mut DataLoader<T>,
        val: &mut DataLoader<V>,
    ) -> Result<TrainingReport>
    where
        T: Dataset,
        V: Dataset,
    {
        if self.config.epochs == 0 {
            self.state = TrainerState::Completed;
        }
        info!(
            "training for {} epochs: {} train batches, {} validation batches, lr={}",
            self.config.epochs,
            train.num_batches(),
            val.num_batches(),
            self.optimizer.learning_rate()
        );
        while self.state != TrainerState::Completed {
            self.run_epoch(train, val)?;
        }
        match self.best.epoch() {
            Some(epoch) => info!(
                "best validation accuracy {:.2}% at epoch {epoch}",
                self.best.value()
            ),
            None => info!("no epochs were run"),
        }
        Ok(self.report())
    }

    /// Mean of the per-batch losses over one shuffled pass.
    fn train_pass<T: Dataset>(&mut self, train: &mut DataLoader<T>) -> Result<f64> {
        let mut total = 0.0;
        let mut batches = 0usize;
        for batch in train.iter() {
            let batch = batch?;
            total += train_step(&mut *self.model, &self.loss, &mut self.optimizer, &batch)?;
            batches += 1;
        }
        Ok(total / batches as f64)
    }

    fn report_progress(&mut self, m: &EpochMetrics) {
        if m.epoch % self.config.log_every == 0 || m.epoch == m.total_epochs {
            info!(
                "epoch {}/{}: train_loss={:.4} val_loss={:.4} val_acc={:.2}%",
                m.epoch, m.total_epochs, m.train_loss, m.val_loss, m.val_accuracy
            );
        }
        if self.progress_closed {
            return;
        }
        if let Some(ref tx) = self.config.progress_tx {
            if tx.send(m.clone()).is_err() {
                warn!("progress receiver dropped; continuing without progress updates");
                self.progress_closed = true;
            }
        }
    }
}
