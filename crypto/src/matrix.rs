//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

//! Small dense square matrix helpers for the per round secret `K`
//!
//! `K` is `m x m` where `m` is one party's feature count, so a plain
//! Gauss-Jordan elimination with partial pivoting is enough.

use ndarray::Array2;

/// Reduces `m` to row echelon form in place, returns the determinant
fn eliminate(m: &mut Array2<f64>, mut companion: Option<&mut Array2<f64>>) -> f64 {
    let n = m.nrows();
    let mut det = 1.0;

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&a, &b| m[[a, col]].abs().total_cmp(&m[[b, col]].abs()))
            .unwrap_or(col);
        let pivot = m[[pivot_row, col]];
        if pivot == 0.0 || !pivot.is_finite() {
            return 0.0;
        }

        if pivot_row != col {
            swap_rows(m, pivot_row, col);
            if let Some(c) = companion.as_deref_mut() {
                swap_rows(c, pivot_row, col);
            }
            det = -det;
        }
        det *= pivot;

        for row in 0..n {
            if row == col || (companion.is_none() && row < col) {
                continue;
            }
            let factor = m[[row, col]] / pivot;
            if factor == 0.0 {
                continue;
            }
            for k in 0..n {
                let delta = factor * m[[col, k]];
                m[[row, k]] -= delta;
                if let Some(c) = companion.as_deref_mut() {
                    let delta = factor * c[[col, k]];
                    c[[row, k]] -= delta;
                }
            }
        }
    }
    det
}

fn swap_rows(m: &mut Array2<f64>, a: usize, b: usize) {
    for k in 0..m.ncols() {
        m.swap([a, k], [b, k]);
    }
}

/// Determinant of a square matrix
pub fn determinant(m: &Array2<f64>) -> f64 {
    assert!(m.is_square(), "determinant of a non square matrix");
    let mut work = m.clone();
    eliminate(&mut work, None)
}

/// Inverse of a square matrix, `None` if it is singular
pub fn invert(m: &Array2<f64>) -> Option<Array2<f64>> {
    assert!(m.is_square(), "inverse of a non square matrix");
    let n = m.nrows();
    let mut work = m.clone();
    let mut inverse = Array2::<f64>::eye(n);

    let det = eliminate(&mut work, Some(&mut inverse));
    if det == 0.0 || !det.is_finite() {
        return None;
    }

    // work is diagonal now
    for row in 0..n {
        let d = work[[row, row]];
        inverse.row_mut(row).mapv_inplace(|v| v / d);
    }
    if inverse.iter().all(|v| v.is_finite()) {
        Some(inverse)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn assert_close(a: &Array2<f64>, b: &Array2<f64>) {
        assert_eq!(a.shape(), b.shape());
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-9, "{} != {}", x, y);
        }
    }

    #[test]
    fn determinant_small() {
        assert_eq!(determinant(&array![[3.0]]), 3.0);
        assert!((determinant(&array![[1.0, 2.0], [3.0, 4.0]]) + 2.0).abs() < 1e-12);
        // needs a row swap
        assert!((determinant(&array![[0.0, 1.0], [1.0, 0.0]]) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn singular_has_no_inverse() {
        let m = array![[1.0, 2.0], [2.0, 4.0]];
        assert_eq!(determinant(&m), 0.0);
        assert!(invert(&m).is_none());
        assert!(invert(&array![[0.0]]).is_none());
    }

    #[test]
    fn inverse_times_matrix_is_identity() {
        let m = array![[2.0, -1.0, 0.0], [-1.0, 2.0, -1.0], [0.0, -1.0, 2.0]];
        let inv = invert(&m).unwrap();
        assert_close(&m.dot(&inv), &Array2::eye(3));
        assert_close(&inv.dot(&m), &Array2::eye(3));
    }

    #[test]
    fn inverse_with_pivoting() {
        let m = array![[0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 3.0, 0.0]];
        let inv = invert(&m).unwrap();
        assert_close(&m.dot(&inv), &Array2::eye(3));
    }
}
