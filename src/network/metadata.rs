use serde::{Deserialize, Serialize};

use crate::data::sample::ImageShape;

/// Optional annotations attached to a saved Network.
/// All fields are Option<> so models saved without metadata deserialize cleanly.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ModelMetadata {
    pub description: Option<String>,
    /// Shape of one input image before flattening.
    pub input_shape: Option<ImageShape>,
    /// Class names for the output layer, in class-index order.
    pub output_labels: Option<Vec<String>>,
}
