use serde::{Serialize, Deserialize};

use crate::loss::cross_entropy::CrossEntropyLoss;
use crate::loss::loss_fn::Loss;
use crate::loss::mse::MseLoss;

/// Selects which loss function a run uses.
///
/// - `CrossEntropy` — categorical cross-entropy over logits; pair with an
///   Identity output layer.
/// - `Mse`          — mean-squared error against one-hot targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossType {
    #[default]
    CrossEntropy,
    Mse,
}

impl LossType {
    pub fn build(self) -> Box<dyn Loss> {
        match self {
            LossType::CrossEntropy => Box::new(CrossEntropyLoss),
            LossType::Mse => Box::new(MseLoss),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_snake_case_names() {
        let t: LossType = serde_json::from_str("\"cross_entropy\"").unwrap();
        assert_eq!(t, LossType::CrossEntropy);
        let t: LossType = serde_json::from_str("\"mse\"").unwrap();
        assert_eq!(t, LossType::Mse);
    }
}
