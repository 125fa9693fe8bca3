use serde::{Serialize, Deserialize};

use crate::error::{Result, TrainError};
use crate::math::matrix::Matrix;
use crate::network::model::ParamMut;
use crate::optim::optimizer::Optimizer;

/// Stochastic gradient descent with optional L2 weight decay and momentum.
///
/// Per parameter `w` with gradient `g`:
/// `g' = g + weight_decay · w`, then with momentum `v = momentum · v + g'`
/// and `w -= learning_rate · v` (or `w -= learning_rate · g'` without).
#[derive(Debug, Clone)]
pub struct Sgd {
    pub learning_rate: f64,
    pub weight_decay: f64,
    pub momentum: f64,
    velocity: Vec<Matrix>,
}

/// Serializable SGD hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SgdConfig {
    pub learning_rate: f64,
    pub weight_decay: f64,
    pub momentum: f64,
}

impl Default for SgdConfig {
    fn default() -> Self {
        SgdConfig { learning_rate: 0.01, weight_decay: 0.0, momentum: 0.0 }
    }
}

impl SgdConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(TrainError::InvalidConfig(format!(
                "learning_rate must be positive, got {}", self.learning_rate
            )));
        }
        if !(self.weight_decay >= 0.0) {
            return Err(TrainError::InvalidConfig(format!(
                "weight_decay must not be negative, got {}", self.weight_decay
            )));
        }
        if !(0.0..1.0).contains(&self.momentum) {
            return Err(TrainError::InvalidConfig(format!(
                "momentum must be in [0, 1), got {}", self.momentum
            )));
        }
        Ok(())
    }

    pub fn build(&self) -> Result<Sgd> {
        self.validate()?;
        Ok(Sgd::new(self.learning_rate)
            .with_weight_decay(self.weight_decay)
            .with_momentum(self.momentum))
    }
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd { learning_rate, weight_decay: 0.0, momentum: 0.0, velocity: Vec::new() }
    }

    pub fn with_weight_decay(mut self, weight_decay: f64) -> Sgd {
        self.weight_decay = weight_decay;
        self
    }

    pub fn with_momentum(mut self, momentum: f64) -> Sgd {
        self.momentum = momentum;
        self
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, params: &mut [ParamMut<'_>]) -> Result<()> {
        for p in params.iter() {
            if p.grad.shape() != p.value.shape() {
                let (rows, cols) = p.value.shape();
                return Err(TrainError::ShapeMismatch {
                    what: "gradient length",
                    got: p.grad.len(),
                    expected: rows * cols,
                });
            }
        }

        // rebuilt whenever the parameter layout changes, e.g. a new model
        let stale = self.velocity.len() != params.len()
            || self.velocity.iter().zip(params.iter()).any(|(v, p)| v.shape() != p.value.shape());
        if self.momentum > 0.0 && stale {
            self.velocity = params.iter()
                .map(|p| Matrix::zeros(p.value.rows, p.value.cols))
                .collect();
        }

        for (i, p) in params.iter_mut().enumerate() {
            let wd = self.weight_decay;
            for (j, w) in p.value.data.iter_mut().enumerate() {
                let mut g = p.grad.data[j] + wd * *w;
                if self.momentum > 0.0 {
                    let v = &mut self.velocity[i].data[j];
                    *v = self.momentum * *v + g;
                    g = *v;
                }
                *w -= self.learning_rate * g;
            }
        }
        Ok(())
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}
