use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};

use crate::data::image_folder::ImageFolder;
use crate::data::sample::ImageShape;
use crate::data::transform::{Normalize, RandomHorizontalFlip};
use crate::error::{Result, TrainError};
use crate::loss::loss_type::LossType;
use crate::network::spec::NetworkSpec;
use crate::optim::sgd::SgdConfig;
use crate::train::train_config::TrainConfig;

/// Where the images live and how each one is preprocessed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// `root/<class>/<image>` hierarchy used for training.
    pub train_dir: PathBuf,
    /// Same layout, used for validation.
    pub val_dir: PathBuf,
    pub image: ImageShape,
    #[serde(default)]
    pub normalize: Option<Normalize>,
    /// Randomly mirror training images left-to-right.
    #[serde(default)]
    pub augment_flip: bool,
}

/// Epoch and batching settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainSection {
    pub epochs: usize,
    pub batch_size: usize,
    pub log_every: usize,
    /// Seeds weight initialisation, shuffling and flip augmentation.
    pub seed: Option<u64>,
    pub drop_last: bool,
}

impl Default for TrainSection {
    fn default() -> Self {
        TrainSection { epochs: 100, batch_size: 32, log_every: 5, seed: None, drop_last: false }
    }
}

/// Files written when the run finishes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// JSON training report (loss histories and best score).
    pub report_path: Option<PathBuf>,
    /// Trained network weights as JSON.
    pub model_path: Option<PathBuf>,
}

/// A complete training run, as read by the `epoch-trainer` binary.
///
/// ```json
/// {
///   "name": "shapes",
///   "data": {
///     "train_dir": "data/train",
///     "val_dir": "data/val",
///     "image": { "channels": 1, "height": 28, "width": 28 }
///   },
///   "network": {
///     "layers": [
///       { "size": 128, "input_size": 784, "activation": "ReLU" },
///       { "size": 3, "input_size": 128, "activation": "Identity" }
///     ]
///   },
///   "optimizer": { "learning_rate": 0.01, "weight_decay": 0.0001 },
///   "train": { "epochs": 100, "batch_size": 32 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_name")]
    pub name: String,
    pub data: DataConfig,
    pub network: NetworkSpec,
    #[serde(default)]
    pub loss: LossType,
    #[serde(default)]
    pub optimizer: SgdConfig,
    #[serde(default)]
    pub train: TrainSection,
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_name() -> String {
    "model".to_string()
}

impl RunConfig {
    pub fn from_json(text: &str) -> Result<RunConfig> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load_json(path: &str) -> Result<RunConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Checks every section and that the network input matches the image.
    pub fn validate(&self) -> Result<()> {
        self.data.image.validate()?;
        if let Some(normalize) = &self.data.normalize {
            normalize.validate()?;
            if normalize.mean.len() != self.data.image.channels as usize {
                return Err(TrainError::ShapeMismatch {
                    what: "normalize channels",
                    got: normalize.mean.len(),
                    expected: self.data.image.channels as usize,
                });
            }
        }
        self.network.validate()?;
        if self.network.input_size() != self.data.image.len() {
            return Err(TrainError::ShapeMismatch {
                what: "network input size",
                got: self.network.input_size(),
                expected: self.data.image.len(),
            });
        }
        self.optimizer.validate()?;
        if self.train.batch_size == 0 {
            return Err(TrainError::InvalidConfig("batch_size must be at least 1".into()));
        }
        self.train_config().validate()
    }

    pub fn train_config(&self) -> TrainConfig {
        TrainConfig::new(self.train.epochs).log_every(self.train.log_every)
    }

    /// Training images with normalisation and, if enabled, flip augmentation.
    /// Flips follow `train.seed` when one is set.
    pub fn train_dataset(&self) -> Result<ImageFolder> {
        let mut ds = self.open_folder(&self.data.train_dir)?;
        if self.data.augment_flip {
            ds = ds.with_transform(RandomHorizontalFlip::new(0.5, self.train.seed)?);
        }
        Ok(ds)
    }

    /// Validation images with normalisation only.
    pub fn val_dataset(&self) -> Result<ImageFolder> {
        self.open_folder(&self.data.val_dir)
    }

    fn open_folder(&self, dir: &Path) -> Result<ImageFolder> {
        let mut ds = ImageFolder::open(dir, self.data.image)?;
        if let Some(normalize) = &self.data.normalize {
            ds = ds.with_transform(normalize.clone());
        }
        Ok(ds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "data": {
            "train_dir": "data/train",
            "val_dir": "data/val",
            "image": { "channels": 1, "height": 4, "width": 4 }
        },
        "network": {
            "layers": [
                { "size": 8, "input_size": 16, "activation": "ReLU" },
                { "size": 3, "input_size": 8, "activation": "Identity" }
            ]
        }
    }"#;

    #[test]
    fn minimal_config_takes_defaults() {
        let cfg = RunConfig::from_json(MINIMAL).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.name, "model");
        assert_eq!(cfg.loss, LossType::CrossEntropy);
        assert_eq!(cfg.optimizer, SgdConfig::default());
        assert_eq!(cfg.train, TrainSection::default());
        assert_eq!(cfg.train_config().log_every, 5);
        assert!(cfg.output.report_path.is_none());
    }

    #[test]
    fn network_input_must_match_image_size() {
        let mut cfg = RunConfig::from_json(MINIMAL).unwrap();
        cfg.data.image.width = 5;
        assert!(matches!(
            cfg.validate(),
            Err(TrainError::ShapeMismatch { what: "network input size", got: 16, expected: 20 })
        ));
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let mut cfg = RunConfig::from_json(MINIMAL).unwrap();
        cfg.train.batch_size = 0;
        assert!(matches!(cfg.validate(), Err(TrainError::InvalidConfig(_))));
    }

    #[test]
    fn normalize_must_cover_each_channel() {
        let mut cfg = RunConfig::from_json(MINIMAL).unwrap();
        cfg.data.normalize = Some(Normalize { mean: vec![0.5; 3], std: vec![0.5; 3] });
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_sections_fill_in_defaults() {
        let text = MINIMAL.replacen(
            "\"network\"",
            "\"train\": { \"epochs\": 7 }, \"optimizer\": { \"momentum\": 0.9 }, \"network\"",
            1,
        );
        let cfg = RunConfig::from_json(&text).unwrap();
        assert_eq!(cfg.train.epochs, 7);
        assert_eq!(cfg.train.batch_size, 32);
        assert_eq!(cfg.optimizer.momentum, 0.9);
        assert_eq!(cfg.optimizer.learning_rate, 0.01);
    }
}
