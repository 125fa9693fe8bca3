pub mod error;
pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod data;
pub mod train;
pub mod config;

// Convenience re-exports
pub use error::{Result, TrainError};
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use layers::dense::Dense;
pub use network::{Model, Network, NetworkSpec, LayerSpec, NoGrad};
pub use loss::{CrossEntropyLoss, Loss, LossType, MseLoss};
pub use optim::{Optimizer, Sgd, SgdConfig};
pub use data::{Batch, DataLoader, Dataset, ImageFolder, ImageShape, InMemoryDataset, Sample};
pub use train::{EpochMetrics, EpochTrainer, TrainConfig, TrainerState, TrainingReport};
pub use config::RunConfig;
