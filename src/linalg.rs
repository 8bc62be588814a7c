// src/linalg.rs

//! Small dense-matrix helpers on top of `ndarray`.
//!
//! `ndarray` is the linear-algebra provider: transpose, `dot`, broadcasting and
//! slicing come straight from it. This module only adds the handful of
//! operations the NIPALS loop needs that `ndarray` does not spell out directly.

use crate::error::PlsError;
use ndarray::{s, Array1, Array2, ArrayBase, Axis, Data, Dimension};

/// Norms and inner products at or below this value are treated as zero.
pub const NUMERICAL_ZERO: f64 = 1e-12;

/// Frobenius norm of a matrix, or Euclidean norm of a vector.
pub fn frobenius_norm<S, D>(a: &ArrayBase<S, D>) -> f64
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    a.iter().map(|&v| v * v).sum::<f64>().sqrt()
}

/// Sum of squared entries.
pub fn sum_of_squares<S, D>(a: &ArrayBase<S, D>) -> f64
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    a.iter().map(|&v| v * v).sum()
}

/// Index of the column with the largest sum.
///
/// Only a strictly greater sum replaces the current best, so the first index wins
/// ties. Returns 0 for a matrix without columns.
pub fn max_sum_col_index(data: &Array2<f64>) -> usize {
    let mut max_index = 0;
    let mut max_sum = f64::NEG_INFINITY;
    for (i, column) in data.axis_iter(Axis(1)).enumerate() {
        let current_sum = column.sum();
        if current_sum > max_sum {
            max_sum = current_sum;
            max_index = i;
        }
    }
    max_index
}

/// Column index with the largest squared mass, i.e. `max_sum_col_index(M ∘ M)`.
pub fn max_squared_col_index(data: &Array2<f64>) -> usize {
    max_sum_col_index(&(data * data))
}

/// Scales `v` to unit Euclidean norm in place and returns the norm it had.
///
/// # Errors
/// `PlsError::NumericalDegeneracy` if the norm is at or below [`NUMERICAL_ZERO`].
pub fn unit_normalize(
    v: &mut Array1<f64>,
    stage: &'static str,
    component: usize,
) -> Result<f64, PlsError> {
    let norm = frobenius_norm(v);
    if !norm.is_finite() || norm <= NUMERICAL_ZERO {
        return Err(PlsError::NumericalDegeneracy { stage, component });
    }
    v.mapv_inplace(|x| x / norm);
    Ok(norm)
}

/// Outer product `a · bᵗ`.
pub fn outer(a: &Array1<f64>, b: &Array1<f64>) -> Array2<f64> {
    let a_col = a.view().insert_axis(Axis(1));
    let b_row = b.view().insert_axis(Axis(0));
    a_col.dot(&b_row)
}

/// Copy of the leading `n_cols` columns.
pub fn leading_columns(m: &Array2<f64>, n_cols: usize) -> Array2<f64> {
    m.slice(s![.., ..n_cols]).to_owned()
}

/// Copy of the leading `n × n` block.
pub fn leading_block(m: &Array2<f64>, n: usize) -> Array2<f64> {
    m.slice(s![..n, ..n]).to_owned()
}

/// Builds a matrix from a nested row table.
///
/// # Errors
/// `PlsError::InvalidArgument` if rows have different lengths.
pub fn matrix_from_rows(rows: &[Vec<f64>]) -> Result<Array2<f64>, PlsError> {
    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, |r| r.len());
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_cols) {
        return Err(PlsError::InvalidArgument(format!(
            "Row {} has {} columns, expected {}.",
            i,
            row.len(),
            n_cols
        )));
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((n_rows, n_cols), flat)
        .map_err(|e| PlsError::InvalidArgument(format!("Failed to build matrix: {}", e)))
}

/// Converts a matrix into a nested row table.
pub fn matrix_to_rows(m: &Array2<f64>) -> Vec<Vec<f64>> {
    m.rows().into_iter().map(|row| row.to_vec()).collect()
}
