//! Dense row-major integer matrices.

use std::fmt;
use std::ops::Index;

use crate::error::{ConfigError, Error};

/// A dense `rows × cols` matrix of `i64` stored row-major.
///
/// Arithmetic that can grow values (weighted accumulation, products) is
/// checked and reports [`Error::Overflow`] instead of wrapping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<i64>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, 0)
    }

    pub fn filled(rows: usize, cols: usize, value: i64) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> i64) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(f(i, j));
            }
        }
        Self { rows, cols, data }
    }

    /// Builds a matrix from row vectors; every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<i64>>) -> Result<Self, ConfigError> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, |row| row.len());
        let mut data = Vec::with_capacity(n_rows * n_cols);
        for row in rows {
            if row.len() != n_cols {
                return Err(ConfigError::ShapeMismatch {
                    name: "row",
                    rows: 1,
                    cols: row.len(),
                    expected_rows: 1,
                    expected_cols: n_cols,
                });
            }
            data.extend(row);
        }
        Ok(Self {
            rows: n_rows,
            cols: n_cols,
            data,
        })
    }

    /// Wraps a row-major buffer, or returns `None` if its length is not `rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<i64>) -> Option<Self> {
        (rows.checked_mul(cols)? == data.len()).then_some(Self { rows, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<i64> {
        self.data
    }

    pub fn row(&self, i: usize) -> &[i64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn set(&mut self, i: usize, j: usize, value: i64) {
        self.data[i * self.cols + j] = value;
    }

    /// Copies the `rows × cols` sub-matrix whose top-left corner is `(row, col)`.
    pub fn block(&self, row: usize, col: usize, rows: usize, cols: usize) -> Matrix {
        Matrix::from_fn(rows, cols, |i, j| self[(row + i, col + j)])
    }

    /// `self += factor * other`, element-wise.
    pub fn add_scaled(&mut self, other: &Matrix, factor: i64) -> Result<(), Error> {
        debug_assert_eq!(self.shape(), other.shape());
        for (acc, &x) in self.data.iter_mut().zip(&other.data) {
            *acc = x
                .checked_mul(factor)
                .and_then(|term| acc.checked_add(term))
                .ok_or(Error::Overflow("encoding"))?;
        }
        Ok(())
    }

    /// Computes `selfᵀ · other`, contracting over the shared row dimension.
    ///
    /// `self` is `k × a` and `other` is `k × b`; the result is `a × b`.
    pub fn transpose_mul(&self, other: &Matrix) -> Result<Matrix, Error> {
        if self.rows != other.rows {
            return Err(ConfigError::ShapeMismatch {
                name: "right operand",
                rows: other.rows,
                cols: other.cols,
                expected_rows: self.rows,
                expected_cols: other.cols,
            }
            .into());
        }

        let mut out = Matrix::zeros(self.cols, other.cols);
        for q in 0..self.rows {
            let right = other.row(q);
            for (i, &x) in self.row(q).iter().enumerate() {
                if x == 0 {
                    continue;
                }
                let acc = &mut out.data[i * other.cols..(i + 1) * other.cols];
                for (cell, &y) in acc.iter_mut().zip(right) {
                    *cell = x
                        .checked_mul(y)
                        .and_then(|term| cell.checked_add(term))
                        .ok_or(Error::Overflow("block multiply"))?;
                }
            }
        }
        Ok(out)
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = i64;

    fn index(&self, (i, j): (usize, usize)) -> &i64 {
        &self.data[i * self.cols + j]
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.rows {
            writeln!(f, "  {:?}", self.row(i))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transpose_mul_contracts_over_rows() {
        // A is 2x3, B is 2x2, so AᵀB is 3x2.
        let a = Matrix::from_rows(vec![vec![1, 2, 3], vec![4, 5, 6]]).unwrap();
        let b = Matrix::from_rows(vec![vec![7, 8], vec![9, 10]]).unwrap();

        let c = a.transpose_mul(&b).unwrap();

        let expected =
            Matrix::from_rows(vec![vec![43, 48], vec![59, 66], vec![75, 84]]).unwrap();
        assert_eq!(c, expected);
    }

    #[test]
    fn transpose_mul_rejects_mismatched_rows() {
        let a = Matrix::zeros(2, 3);
        let b = Matrix::zeros(3, 3);
        assert!(matches!(
            a.transpose_mul(&b),
            Err(Error::Configuration(ConfigError::ShapeMismatch { .. }))
        ));
    }

    #[test]
    fn add_scaled_reports_overflow() {
        let mut acc = Matrix::filled(1, 1, i64::MAX);
        let one = Matrix::filled(1, 1, 1);
        assert!(matches!(
            acc.add_scaled(&one, 1),
            Err(Error::Overflow(_))
        ));
    }

    #[test]
    fn block_copies_sub_matrix() {
        let m = Matrix::from_fn(4, 4, |i, j| (i * 4 + j) as i64);
        let block = m.block(2, 1, 2, 2);
        assert_eq!(block.as_slice(), &[9, 10, 13, 14]);
    }

    #[test]
    fn from_rows_rejects_ragged_input() {
        assert!(Matrix::from_rows(vec![vec![1, 2], vec![3]]).is_err());
    }

    #[test]
    fn from_vec_checks_length() {
        assert!(Matrix::from_vec(2, 2, vec![1, 2, 3]).is_none());
        assert!(Matrix::from_vec(2, 2, vec![1, 2, 3, 4]).is_some());
    }
}
