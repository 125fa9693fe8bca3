use rand::Rng;
use serde::{Serialize, Deserialize};
use std::f64::consts::PI;

use crate::error::{Result, TrainError};

/// Dense row-major `f64` matrix.
///
/// A batch of images is stored as one row per sample, each row holding the
/// sample's `[C, H, W]` values flattened channel-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f64>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix { rows, cols, data: vec![0.0; rows * cols] }
    }

    /// Wraps `data` as a `rows × cols` matrix.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Matrix> {
        if data.len() != rows * cols {
            return Err(TrainError::ShapeMismatch {
                what: "matrix data",
                got: data.len(),
                expected: rows * cols,
            });
        }
        Ok(Matrix { rows, cols, data })
    }

    /// Stacks equally long rows into a matrix.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Matrix> {
        let cols = rows.first().map_or(0, |r| r.len());
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            if row.len() != cols {
                return Err(TrainError::ShapeMismatch {
                    what: "row length",
                    got: row.len(),
                    expected: cols,
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Matrix { rows: rows.len(), cols, data })
    }

    /// Samples a single value from N(0, 1) using the Box-Muller transform.
    fn sample_standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
        // Uniform on (0, 1] so ln() stays finite.
        let u1: f64 = 1.0 - rng.gen::<f64>();
        let u2: f64 = 1.0 - rng.gen::<f64>();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    fn normal<R: Rng + ?Sized>(rows: usize, cols: usize, std_dev: f64, rng: &mut R) -> Matrix {
        let data = (0..rows * cols)
            .map(|_| Matrix::sample_standard_normal(rng) * std_dev)
            .collect();
        Matrix { rows, cols, data }
    }

    /// He initialization: N(0, sqrt(2 / rows)). `rows` is the fan-in.
    pub fn he<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Matrix {
        Matrix::normal(rows, cols, (2.0 / rows.max(1) as f64).sqrt(), rng)
    }

    /// Xavier (Glorot) initialization: N(0, sqrt(1 / rows)). `rows` is the fan-in.
    pub fn xavier<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Matrix {
        Matrix::normal(rows, cols, (1.0 / rows.max(1) as f64).sqrt(), rng)
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.data[r * self.cols + c]
    }

    pub fn set(&mut self, r: usize, c: usize, value: f64) {
        self.data[r * self.cols + c] = value;
    }

    pub fn row(&self, r: usize) -> &[f64] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    pub fn row_mut(&mut self, r: usize) -> &mut [f64] {
        &mut self.data[r * self.cols..(r + 1) * self.cols]
    }

    /// Matrix product `self · rhs`.
    pub fn dot(&self, rhs: &Matrix) -> Result<Matrix> {
        if self.cols != rhs.rows {
            return Err(TrainError::ShapeMismatch {
                what: "dot",
                got: rhs.rows,
                expected: self.cols,
            });
        }
        let mut res = Matrix::zeros(self.rows, rhs.cols);
        for i in 0..self.rows {
            let out = &mut res.data[i * rhs.cols..(i + 1) * rhs.cols];
            for k in 0..self.cols {
                let a = self.data[i * self.cols + k];
                for (o, b) in out.iter_mut().zip(rhs.row(k)) {
                    *o += a * b;
                }
            }
        }
        Ok(res)
    }

    pub fn transpose(&self) -> Matrix {
        let mut res = Matrix::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                res.data[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }
        res
    }

    pub fn map<F>(&self, functor: F) -> Matrix
    where
        F: Fn(f64) -> f64,
    {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&x| functor(x)).collect(),
        }
    }

    /// Element-wise combination of two same-shape matrices.
    pub fn zip_map<F>(&self, rhs: &Matrix, functor: F) -> Result<Matrix>
    where
        F: Fn(f64, f64) -> f64,
    {
        self.check_same_shape(rhs, "zip_map")?;
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().zip(&rhs.data).map(|(&a, &b)| functor(a, b)).collect(),
        })
    }

    pub fn scale(&self, factor: f64) -> Matrix {
        self.map(|x| x * factor)
    }

    /// In-place `self += rhs`.
    pub fn add_assign(&mut self, rhs: &Matrix) -> Result<()> {
        self.check_same_shape(rhs, "add_assign")?;
        for (a, b) in self.data.iter_mut().zip(&rhs.data) {
            *a += b;
        }
        Ok(())
    }

    /// Adds a `[1, cols]` row to every row.
    pub fn add_row(&mut self, row: &Matrix) -> Result<()> {
        if row.rows != 1 || row.cols != self.cols {
            return Err(TrainError::ShapeMismatch {
                what: "broadcast row",
                got: row.len(),
                expected: self.cols,
            });
        }
        for r in 0..self.rows {
            for (a, b) in self.row_mut(r).iter_mut().zip(&row.data) {
                *a += b;
            }
        }
        Ok(())
    }

    /// Column sums as a `[1, cols]` matrix.
    pub fn sum_rows(&self) -> Matrix {
        let mut res = Matrix::zeros(1, self.cols);
        for r in 0..self.rows {
            for (acc, x) in res.data.iter_mut().zip(self.row(r)) {
                *acc += x;
            }
        }
        res
    }

    /// Index of the largest value in row `r`. Exact ties resolve to the
    /// lowest index; NaN never wins.
    pub fn argmax_row(&self, r: usize) -> usize {
        let mut best = 0;
        let mut best_val = f64::NEG_INFINITY;
        for (i, &x) in self.row(r).iter().enumerate() {
            if x > best_val {
                best = i;
                best_val = x;
            }
        }
        best
    }

    pub fn fill(&mut self, value: f64) {
        self.data.iter_mut().for_each(|x| *x = value);
    }

    fn check_same_shape(&self, rhs: &Matrix, what: &'static str) -> Result<()> {
        if self.rows != rhs.rows {
            return Err(TrainError::ShapeMismatch { what, got: rhs.rows, expected: self.rows });
        }
        if self.cols != rhs.cols {
            return Err(TrainError::ShapeMismatch { what, got: rhs.cols, expected: self.cols });
        }
        Ok(())
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix { rows: 0, cols: 0, data: vec![] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn dot_propagates_non_finite_values_through_zero_inputs() {
        let zeros = Matrix::zeros(1, 2);
        let weights = Matrix::from_vec(2, 2, vec![f64::NAN, 1.0, f64::INFINITY, 1.0]).unwrap();
        let out = zeros.dot(&weights).unwrap();
        assert!(out.data[0].is_nan());
        assert_eq!(out.data[1], 0.0);
    }

    #[test]
    fn dot_multiplies_rows_by_columns() {
        let a = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let b = Matrix::from_rows(&[vec![5.0], vec![6.0]]).unwrap();
        let c = a.dot(&b).unwrap();
        assert_eq!(c.shape(), (2, 1));
        assert_eq!(c.data, vec![17.0, 39.0]);
    }

    #[test]
    fn dot_rejects_bad_inner_dimension() {
        let a = Matrix::zeros(2, 3);
        let b = Matrix::zeros(2, 3);
        assert!(matches!(
            a.dot(&b),
            Err(TrainError::ShapeMismatch { what: "dot", got: 2, expected: 3 })
        ));
    }

    #[test]
    fn transpose_swaps_axes() {
        let a = Matrix::from_rows(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        let t = a.transpose();
        assert_eq!(t.shape(), (3, 2));
        assert_eq!(t.row(0), &[1.0, 4.0]);
        assert_eq!(t.row(2), &[3.0, 6.0]);
    }

    #[test]
    fn add_row_broadcasts_and_sum_rows_reduces() {
        let mut a = Matrix::zeros(3, 2);
        let bias = Matrix::from_vec(1, 2, vec![1.0, -1.0]).unwrap();
        a.add_row(&bias).unwrap();
        assert_eq!(a.sum_rows().data, vec![3.0, -3.0]);
    }

    #[test]
    fn argmax_prefers_first_of_tied_maxima() {
        let m = Matrix::from_rows(&[vec![0.5, 2.0, 2.0], vec![1.0, 1.0, 1.0]]).unwrap();
        assert_eq!(m.argmax_row(0), 1);
        assert_eq!(m.argmax_row(1), 0);
    }

    #[test]
    fn from_rows_rejects_ragged_input() {
        assert!(Matrix::from_rows(&[vec![1.0], vec![1.0, 2.0]]).is_err());
    }

    #[test]
    fn seeded_initialisers_are_reproducible() {
        let a = Matrix::he(4, 3, &mut StdRng::seed_from_u64(7));
        let b = Matrix::he(4, 3, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
        assert!(a.data.iter().all(|x| x.is_finite()));
    }
}
