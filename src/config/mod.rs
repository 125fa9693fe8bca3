pub mod run_config;

pub use run_config::{DataConfig, OutputConfig, RunConfig, TrainSection};
