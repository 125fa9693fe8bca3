use serde::{Serialize, Deserialize};

use crate::error::{Result, TrainError};
use crate::math::matrix::Matrix;

/// Channel count and spatial size of one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageShape {
    pub channels: u32,
    pub height: u32,
    pub width: u32,
}

impl ImageShape {
    pub fn new(channels: u32, height: u32, width: u32) -> Self {
        ImageShape { channels, height, width }
    }

    /// Flattened length `C * H * W`.
    pub fn len(&self) -> usize {
        self.channels as usize * self.plane()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values per channel, `H * W`.
    pub fn plane(&self) -> usize {
        self.height as usize * self.width as usize
    }

    pub fn validate(&self) -> Result<()> {
        if self.channels != 1 && self.channels != 3 {
            return Err(TrainError::InvalidConfig(format!(
                "images must have 1 or 3 channels, got {}", self.channels
            )));
        }
        if self.height == 0 || self.width == 0 {
            return Err(TrainError::InvalidConfig("image height and width must be positive".into()));
        }
        Ok(())
    }
}

/// One labelled input, flattened channel-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub input: Vec<f64>,
    pub label: usize,
}

/// A mini-batch: one input row per sample and the matching labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Shape `[batch, C*H*W]`.
    pub inputs: Matrix,
    pub labels: Vec<usize>,
}

impl Batch {
    /// Stacks samples into a batch; every input must have the same length.
    pub fn from_samples(samples: Vec<Sample>) -> Result<Batch> {
        let cols = samples.first().map_or(0, |s| s.input.len());
        let mut data = Vec::with_capacity(samples.len() * cols);
        let mut labels = Vec::with_capacity(samples.len());
        for sample in samples {
            if sample.input.len() != cols {
                return Err(TrainError::ShapeMismatch {
                    what: "sample length",
                    got: sample.input.len(),
                    expected: cols,
                });
            }
            data.extend(sample.input);
            labels.push(sample.label);
        }
        let inputs = Matrix::from_vec(labels.len(), cols, data)?;
        Ok(Batch { inputs, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
