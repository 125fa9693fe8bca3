use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activation::activation::{softmax_in_place, ActivationFunction};
use crate::error::{Result, TrainError};
use crate::math::matrix::Matrix;

/// Values recorded by a gradient-tracked forward pass.
#[derive(Debug, Clone)]
struct Tape {
    input: Matrix,
    pre_activation: Matrix,
    output: Matrix,
}

/// Fully-connected layer: `act(input · W + b)` over a whole batch.
///
/// Gradients accumulate across `backward` calls until `zero_grad` clears
/// them, so a training step must reset them before backpropagating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    /// Shape `[input_size, size]`.
    pub weights: Matrix,
    /// Shape `[1, size]`.
    pub biases: Matrix,
    pub activator: ActivationFunction,
    #[serde(skip)]
    weights_grad: Matrix,
    #[serde(skip)]
    biases_grad: Matrix,
    #[serde(skip)]
    tape: Option<Tape>,
}

impl Dense {
    /// New layer with He or Xavier weights (depending on the activation) and
    /// zero biases.
    pub fn new<R: Rng + ?Sized>(
        size: usize,
        input_size: usize,
        activation: ActivationFunction,
        rng: &mut R,
    ) -> Dense {
        let weights = if activation.prefers_he_init() {
            Matrix::he(input_size, size, rng)
        } else {
            Matrix::xavier(input_size, size, rng)
        };
        Dense::build(weights, Matrix::zeros(1, size), activation)
    }

    /// Layer with explicit parameters. `biases` must be `[1, weights.cols]`.
    pub fn from_parts(weights: Matrix, biases: Matrix, activation: ActivationFunction) -> Result<Dense> {
        if biases.rows != 1 || biases.cols != weights.cols {
            return Err(TrainError::ShapeMismatch {
                what: "biases",
                got: biases.len(),
                expected: weights.cols,
            });
        }
        Ok(Dense::build(weights, biases, activation))
    }

    fn build(weights: Matrix, biases: Matrix, activator: ActivationFunction) -> Dense {
        Dense {
            weights_grad: Matrix::zeros(weights.rows, weights.cols),
            biases_grad: Matrix::zeros(biases.rows, biases.cols),
            weights,
            biases,
            activator,
            tape: None,
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.rows
    }

    pub fn size(&self) -> usize {
        self.weights.cols
    }

    pub fn weights_grad(&self) -> &Matrix {
        &self.weights_grad
    }

    pub fn biases_grad(&self) -> &Matrix {
        &self.biases_grad
    }

    /// Forward pass over a `[batch, input_size]` matrix. When `track` is set
    /// the input and pre-activation are kept for `backward`; otherwise any
    /// previous record is discarded.
    pub fn forward(&mut self, input: &Matrix, track: bool) -> Result<Matrix> {
        let mut z = input.dot(&self.weights)?;
        z.add_row(&self.biases)?;

        let mut a = z.map(|x| self.activator.function(x));
        if self.activator == ActivationFunction::Softmax {
            for r in 0..a.rows {
                softmax_in_place(a.row_mut(r));
            }
        }

        self.tape = if track {
            Some(Tape { input: input.clone(), pre_activation: z, output: a.clone() })
        } else {
            None
        };
        Ok(a)
    }

    /// Backpropagates `grad_output` (∂L/∂a, shape `[batch, size]`), adds
    /// this layer's parameter gradients to the accumulators, and returns
    /// ∂L/∂input.
    pub fn backward(&mut self, grad_output: &Matrix) -> Result<Matrix> {
        let tape = self.tape.as_ref().ok_or(TrainError::GradientsDisabled)?;

        let delta = if self.activator == ActivationFunction::Softmax {
            softmax_backward(&tape.output, grad_output)?
        } else {
            let act_derivative = tape.pre_activation.map(|x| self.activator.derivative(x));
            grad_output.zip_map(&act_derivative, |g, d| g * d)?
        };

        let w_grad = tape.input.transpose().dot(&delta)?;
        let b_grad = delta.sum_rows();
        let grad_input = delta.dot(&self.weights.transpose())?;

        self.ensure_grad_buffers();
        self.weights_grad.add_assign(&w_grad)?;
        self.biases_grad.add_assign(&b_grad)?;
        Ok(grad_input)
    }

    pub fn zero_grad(&mut self) {
        self.ensure_grad_buffers();
        self.weights_grad.fill(0.0);
        self.biases_grad.fill(0.0);
    }

    /// Drops the recorded forward pass.
    pub fn clear_tape(&mut self) {
        self.tape = None;
    }

    /// Mutable parameters paired with their gradients: weights, then biases.
    pub fn params_mut(&mut self) -> [(&mut Matrix, &Matrix); 2] {
        self.ensure_grad_buffers();
        [
            (&mut self.weights, &self.weights_grad),
            (&mut self.biases, &self.biases_grad),
        ]
    }

    // Deserialised layers start with empty gradient buffers.
    fn ensure_grad_buffers(&mut self) {
        if self.weights_grad.shape() != self.weights.shape() {
            self.weights_grad = Matrix::zeros(self.weights.rows, self.weights.cols);
        }
        if self.biases_grad.shape() != self.biases.shape() {
            self.biases_grad = Matrix::zeros(self.biases.rows, self.biases.cols);
        }
    }
}

/// ∂L/∂z for a row-wise softmax: `s ⊙ (g - Σ g·s)` per row.
fn softmax_backward(output: &Matrix, grad_output: &Matrix) -> Result<Matrix> {
    let mut delta = grad_output.zip_map(output, |g, _| g)?;
    for r in 0..output.rows {
        let s = output.row(r);
        let dot: f64 = grad_output.row(r).iter().zip(s).map(|(g, s)| g * s).sum();
        for (d, &si) in delta.row_mut(r).iter_mut().zip(s) {
            *d = si * (*d - dot);
        }
    }
    Ok(delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn layer(activation: ActivationFunction) -> Dense {
        Dense::new(2, 3, activation, &mut StdRng::seed_from_u64(42))
    }

    fn sum_output(layer: &mut Dense, input: &Matrix) -> f64 {
        layer.forward(input, false).unwrap().data.iter().sum()
    }

    #[test]
    fn forward_produces_batch_by_size() {
        let mut l = layer(ActivationFunction::ReLU);
        let out = l.forward(&Matrix::zeros(5, 3), false).unwrap();
        assert_eq!(out.shape(), (5, 2));
    }

    #[test]
    fn forward_rejects_wrong_feature_count() {
        let mut l = layer(ActivationFunction::Identity);
        assert!(matches!(
            l.forward(&Matrix::zeros(1, 4), true),
            Err(TrainError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn backward_without_tracking_fails() {
        let mut l = layer(ActivationFunction::Tanh);
        l.forward(&Matrix::zeros(1, 3), false).unwrap();
        assert!(matches!(
            l.backward(&Matrix::zeros(1, 2)),
            Err(TrainError::GradientsDisabled)
        ));
    }

    #[test]
    fn weight_gradients_match_finite_differences() {
        for activation in [ActivationFunction::Tanh, ActivationFunction::Softmax] {
            let mut l = layer(activation.clone());
            let input = Matrix::from_rows(&[vec![0.3, -1.2, 0.8], vec![1.0, 0.5, -0.4]]).unwrap();
            // d(sum of weighted outputs) / d(output) = fixed weights per column
            let upstream = Matrix::from_rows(&[vec![1.0, -2.0], vec![0.5, 3.0]]).unwrap();

            l.zero_grad();
            l.forward(&input, true).unwrap();
            l.backward(&upstream).unwrap();
            let analytical = l.weights_grad().clone();

            let eps = 1e-6;
            for i in 0..l.weights.rows {
                for j in 0..l.weights.cols {
                    let orig = l.weights.get(i, j);
                    let objective = |l: &mut Dense| {
                        let out = l.forward(&input, false).unwrap();
                        out.zip_map(&upstream, |a, g| a * g).unwrap().data.iter().sum::<f64>()
                    };
                    l.weights.set(i, j, orig + eps);
                    let plus = objective(&mut l);
                    l.weights.set(i, j, orig - eps);
                    let minus = objective(&mut l);
                    l.weights.set(i, j, orig);

                    let numerical = (plus - minus) / (2.0 * eps);
                    assert!(
                        (numerical - analytical.get(i, j)).abs() < 1e-5,
                        "{activation:?} grad mismatch at [{i}, {j}]: numerical={numerical}, analytical={}",
                        analytical.get(i, j)
                    );
                }
            }
        }
    }

    #[test]
    fn gradients_accumulate_until_cleared() {
        let mut l = layer(ActivationFunction::Identity);
        let input = Matrix::from_rows(&[vec![1.0, 2.0, 3.0]]).unwrap();
        let upstream = Matrix::from_rows(&[vec![1.0, 1.0]]).unwrap();

        l.forward(&input, true).unwrap();
        l.backward(&upstream).unwrap();
        let once = l.biases_grad().clone();
        l.backward(&upstream).unwrap();
        assert_eq!(l.biases_grad(), &once.scale(2.0));

        l.zero_grad();
        assert!(l.biases_grad().data.iter().all(|&g| g == 0.0));
    }

    #[test]
    fn identity_layer_sum_is_linear_in_bias() {
        let mut l = layer(ActivationFunction::Identity);
        let input = Matrix::zeros(1, 3);
        let before = sum_output(&mut l, &input);
        l.biases.fill(1.0);
        assert!((sum_output(&mut l, &input) - (before + 2.0)).abs() < 1e-12);
    }
}
