use crate::activation::activation::softmax_in_place;
use crate::error::Result;
use crate::loss::loss_fn::{check_labels, Loss, LossOutput};
use crate::math::matrix::Matrix;

/// Categorical cross-entropy over raw logits.
///
/// Softmax is applied internally, so the network's output layer should be
/// `Identity`. The gradient with respect to the logits is
/// `(softmax - onehot) / batch`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossEntropyLoss;

impl Loss for CrossEntropyLoss {
    fn compute(&self, scores: &Matrix, labels: &[usize]) -> Result<LossOutput> {
        check_labels(scores, labels)?;
        let batch = scores.rows.max(1) as f64;

        let mut grad = scores.clone();
        let mut total = 0.0;
        for (r, &label) in labels.iter().enumerate() {
            let logits = scores.row(r);
            // log-softmax via the log-sum-exp trick
            let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let log_sum = logits.iter().map(|x| (x - max).exp()).sum::<f64>().ln() + max;
            total += log_sum - logits[label];

            let row = grad.row_mut(r);
            softmax_in_place(row);
            row[label] -= 1.0;
            row.iter_mut().for_each(|g| *g /= batch);
        }

        Ok(LossOutput { value: total / batch, grad })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrainError;

    #[test]
    fn uniform_logits_give_log_of_class_count() {
        let scores = Matrix::zeros(2, 4);
        let out = CrossEntropyLoss.compute(&scores, &[0, 3]).unwrap();
        assert!((out.value - 4f64.ln()).abs() < 1e-12);
        assert!((out.grad.get(0, 0) - (0.25 - 1.0) / 2.0).abs() < 1e-12);
        assert!((out.grad.get(0, 1) - 0.25 / 2.0).abs() < 1e-12);
    }

    #[test]
    fn confident_correct_prediction_has_small_loss() {
        let scores = Matrix::from_rows(&[vec![20.0, 0.0, 0.0]]).unwrap();
        let out = CrossEntropyLoss.compute(&scores, &[0]).unwrap();
        assert!(out.value < 1e-6);
    }

    #[test]
    fn gradient_rows_sum_to_zero() {
        let scores = Matrix::from_rows(&[vec![0.3, -1.0, 2.0], vec![5.0, 4.0, -3.0]]).unwrap();
        let out = CrossEntropyLoss.compute(&scores, &[2, 1]).unwrap();
        for r in 0..2 {
            assert!(out.grad.row(r).iter().sum::<f64>().abs() < 1e-12);
        }
    }

    #[test]
    fn rejects_label_outside_class_range() {
        let scores = Matrix::zeros(1, 3);
        assert!(matches!(
            CrossEntropyLoss.compute(&scores, &[3]),
            Err(TrainError::InvalidLabel { label: 3, classes: 3 })
        ));
    }

    #[test]
    fn rejects_label_count_mismatch() {
        let scores = Matrix::zeros(2, 3);
        assert!(matches!(
            CrossEntropyLoss.compute(&scores, &[0]),
            Err(TrainError::ShapeMismatch { what: "labels", .. })
        ));
    }
}
