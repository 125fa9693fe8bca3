use crate::error::Result;
use crate::loss::loss_fn::{check_labels, Loss, LossOutput};
use crate::math::matrix::Matrix;

/// Mean squared error between the scores and one-hot targets, averaged over
/// every element of the batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct MseLoss;

impl Loss for MseLoss {
    fn compute(&self, scores: &Matrix, labels: &[usize]) -> Result<LossOutput> {
        check_labels(scores, labels)?;
        let n = scores.len().max(1) as f64;

        let mut grad = scores.clone();
        let mut total = 0.0;
        for (r, &label) in labels.iter().enumerate() {
            for (c, g) in grad.row_mut(r).iter_mut().enumerate() {
                let target = if c == label { 1.0 } else { 0.0 };
                let diff = *g - target;
                total += diff * diff;
                *g = 2.0 * diff / n;
            }
        }

        Ok(LossOutput { value: total / n, grad })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_one_hot_scores_have_zero_loss() {
        let scores = Matrix::from_rows(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        let out = MseLoss.compute(&scores, &[0, 1]).unwrap();
        assert_eq!(out.value, 0.0);
        assert!(out.grad.data.iter().all(|&g| g == 0.0));
    }

    #[test]
    fn averages_over_every_element() {
        let scores = Matrix::zeros(1, 4);
        let out = MseLoss.compute(&scores, &[2]).unwrap();
        assert!((out.value - 0.25).abs() < 1e-12);
        assert!((out.grad.get(0, 2) + 0.5).abs() < 1e-12);
    }
}
