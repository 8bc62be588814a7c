// src/normalize.rs

use crate::error::PlsError;
use log::{debug, warn};
use ndarray::{Array1, Array2, Axis};

/// Standard deviations at or below this value (or non-finite) are replaced by `1.0`.
pub const SCALE_SANITIZATION_THRESHOLD: f64 = 1e-9;

/// A column-normalized matrix together with the statistics used to produce it.
#[derive(Debug, Clone)]
pub struct Normalized {
    /// Centered (and, if requested, scaled) data. Shape: (n_samples, n_columns)
    pub data: Array2<f64>,
    /// Column means of the input. Shape: (n_columns)
    pub means: Array1<f64>,
    /// Sanitized column standard deviations; all ones when scaling is off.
    /// Always strictly positive. Shape: (n_columns)
    pub std_devs: Array1<f64>,
}

/// Centers each column of `matrix` and optionally scales it to unit standard deviation.
///
/// Standard deviations use the unbiased (n - 1) denominator. A column whose standard
/// deviation is not finite or is `<= SCALE_SANITIZATION_THRESHOLD` is divided by `1.0`
/// instead, so it ends up centered at zero. A single-row matrix has no spread at all
/// and is therefore centered to zeros with unit scale.
///
/// The input is consumed and transformed in place.
///
/// # Errors
/// `PlsError::InvalidArgument` if the matrix has no rows or no columns, or contains
/// NaN or infinite values.
pub fn feature_normalize(mut matrix: Array2<f64>, scale: bool) -> Result<Normalized, PlsError> {
    let (n_rows, n_cols) = matrix.dim();
    if n_rows == 0 || n_cols == 0 {
        return Err(PlsError::InvalidArgument(format!(
            "Cannot normalize a {}x{} matrix; it must have at least one row and one column.",
            n_rows, n_cols
        )));
    }
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(PlsError::InvalidArgument(
            "Input matrix contains non-finite (NaN or infinity) values.".into(),
        ));
    }

    let means = matrix
        .mean_axis(Axis(0))
        .ok_or_else(|| PlsError::InvalidArgument("Failed to compute column means.".into()))?;
    matrix -= &means;

    let std_devs = if !scale {
        Array1::ones(n_cols)
    } else if n_rows < 2 {
        debug!("Single-row matrix: standard deviations are undefined, using unit scale.");
        Array1::ones(n_cols)
    } else {
        let raw = matrix.map_axis(Axis(0), |column| column.std(1.0));
        let n_clamped = raw
            .iter()
            .filter(|&&s| !(s.is_finite() && s > SCALE_SANITIZATION_THRESHOLD))
            .count();
        if n_clamped > 0 {
            warn!(
                "{} of {} columns have zero variance; their scale is clamped to 1.0.",
                n_clamped, n_cols
            );
        }
        raw.mapv(|s| if s.is_finite() && s > SCALE_SANITIZATION_THRESHOLD { s } else { 1.0 })
    };
    matrix /= &std_devs;

    Ok(Normalized {
        data: matrix,
        means,
        std_devs,
    })
}
