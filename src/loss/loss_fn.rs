use crate::error::{Result, TrainError};
use crate::math::matrix::Matrix;

/// Batch loss and its gradient with respect to the scores.
#[derive(Debug, Clone)]
pub struct LossOutput {
    /// Mean loss over the batch.
    pub value: f64,
    /// ∂value/∂scores, same shape as the scores.
    pub grad: Matrix,
}

/// Maps `[batch, classes]` scores and class labels to a scalar loss.
pub trait Loss {
    fn compute(&self, scores: &Matrix, labels: &[usize]) -> Result<LossOutput>;
}

impl<L: Loss + ?Sized> Loss for Box<L> {
    fn compute(&self, scores: &Matrix, labels: &[usize]) -> Result<LossOutput> {
        (**self).compute(scores, labels)
    }
}

/// Checks one label per row and every label inside the class range.
pub(crate) fn check_labels(scores: &Matrix, labels: &[usize]) -> Result<()> {
    if labels.len() != scores.rows {
        return Err(TrainError::ShapeMismatch {
            what: "labels",
            got: labels.len(),
            expected: scores.rows,
        });
    }
    if let Some(&label) = labels.iter().find(|&&l| l >= scores.cols) {
        return Err(TrainError::InvalidLabel { label, classes: scores.cols });
    }
    Ok(())
}
