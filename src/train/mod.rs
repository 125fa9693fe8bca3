pub mod epoch_stats;
pub mod history;
pub mod step;
pub mod train_config;
pub mod trainer;

pub use epoch_stats::EpochMetrics;
pub use history::{BestScore, TrainingHistory, TrainingReport};
pub use step::{eval_step, evaluate, train_step, EvalOutcome, EvalSummary};
pub use train_config::TrainConfig;
pub use trainer::{EpochTrainer, TrainerState};
