use std::sync::Mutex;

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Serialize, Deserialize};

use crate::data::sample::ImageShape;
use crate::error::{Result, TrainError};

/// Per-sample preprocessing or augmentation applied after decoding.
///
/// `input` holds one image flattened channel-major as `[C, H, W]`.
pub trait Transform {
    fn apply(&self, input: &mut [f64], shape: ImageShape) -> Result<()>;
}

/// Per-channel standardisation: `(x - mean[c]) / std[c]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalize {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl Normalize {
    pub fn new(mean: Vec<f64>, std: Vec<f64>) -> Result<Self> {
        let normalize = Normalize { mean, std };
        normalize.validate()?;
        Ok(normalize)
    }

    pub fn validate(&self) -> Result<()> {
        if self.mean.len() != self.std.len() {
            return Err(TrainError::ShapeMismatch {
                what: "normalize std",
                got: self.std.len(),
                expected: self.mean.len(),
            });
        }
        if self.std.iter().any(|&s| s == 0.0 || !s.is_finite()) {
            return Err(TrainError::InvalidConfig("normalize std must be finite and non-zero".into()));
        }
        Ok(())
    }
}

impl Transform for Normalize {
    fn apply(&self, input: &mut [f64], shape: ImageShape) -> Result<()> {
        if self.mean.len() != shape.channels as usize {
            return Err(TrainError::ShapeMismatch {
                what: "normalize channels",
                got: self.mean.len(),
                expected: shape.channels as usize,
            });
        }
        if shape.plane() == 0 {
            return Ok(());
        }
        for (c, plane) in input.chunks_mut(shape.plane()).enumerate() {
            let (mean, std) = (self.mean[c], self.std[c]);
            plane.iter_mut().for_each(|x| *x = (*x - mean) / std);
        }
        Ok(())
    }
}

/// Mirrors the image left-to-right with the given probability.
///
/// Draws come from its own generator, so a seeded flip repeats the same
/// sequence of decisions.
#[derive(Debug)]
pub struct RandomHorizontalFlip {
    probability: f64,
    rng: Mutex<StdRng>,
}

impl RandomHorizontalFlip {
    pub fn new(probability: f64, seed: Option<u64>) -> Result<Self> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(TrainError::InvalidConfig(format!(
                "flip probability must be in [0, 1], got {probability}"
            )));
        }
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(RandomHorizontalFlip { probability, rng: Mutex::new(rng) })
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }
}

impl Transform for RandomHorizontalFlip {
    fn apply(&self, input: &mut [f64], shape: ImageShape) -> Result<()> {
        let flip = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            rng.gen_bool(self.probability)
        };
        if flip {
            flip_horizontal(input, shape);
        }
        Ok(())
    }
}

fn flip_horizontal(input: &mut [f64], shape: ImageShape) {
    let width = shape.width as usize;
    if width == 0 {
        return;
    }
    for row in input.chunks_mut(width) {
        row.reverse();
    }
}
