use serde::{Serialize, Deserialize};
use crate::activation::activation::ActivationFunction;
use crate::error::{Result, TrainError};
use crate::network::metadata::ModelMetadata;

/// Describes one layer in a network specification.
///
/// Fields:
/// - `size`       — number of neurons in this layer
/// - `input_size` — output size of the previous layer, or the flattened
///                  `C*H*W` input length for the first layer
/// - `activation` — activation function applied after the linear transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub size: usize,
    pub input_size: usize,
    pub activation: ActivationFunction,
}

/// A serializable description of a fully-connected classifier.
///
/// The last layer's `size` is the class count. Pair an `Identity` output with
/// cross-entropy, which applies softmax itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Human-readable name used as the model file stem.
    #[serde(default)]
    pub name: String,
    /// Ordered list of layer descriptions (input → output).
    pub layers: Vec<LayerSpec>,
    #[serde(default)]
    pub metadata: Option<ModelMetadata>,
}

impl NetworkSpec {
    /// Checks that the spec has layers, none of them empty, and that each
    /// layer's `input_size` matches the previous layer's `size`.
    pub fn validate(&self) -> Result<()> {
        if self.layers.is_empty() {
            return Err(TrainError::InvalidConfig("network needs at least one layer".into()));
        }
        if let Some(i) = self.layers.iter().position(|l| l.size == 0 || l.input_size == 0) {
            return Err(TrainError::InvalidConfig(format!("layer {i} has a zero dimension")));
        }
        for pair in self.layers.windows(2) {
            if pair[1].input_size != pair[0].size {
                return Err(TrainError::ShapeMismatch {
                    what: "layer input size",
                    got: pair[1].input_size,
                    expected: pair[0].size,
                });
            }
        }
        Ok(())
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, |l| l.input_size)
    }

    pub fn num_classes(&self) -> usize {
        self.layers.last().map_or(0, |l| l.size)
    }
}
