// Partial least squares (PLS) regression

use crate::config::{PlsOptions, TrainingConfig};
use crate::error::PlsError;
use crate::linalg::{
    frobenius_norm, leading_block, leading_columns, matrix_from_rows, matrix_to_rows,
    max_squared_col_index, outer, sum_of_squares, unit_normalize, NUMERICAL_ZERO,
};
use crate::normalize::feature_normalize;
use log::{debug, info, trace, warn};
use ndarray::{Array1, Array2};

/// Partial least squares regression model fitted with NIPALS.
///
/// The model relates a predictor matrix X (n_samples × n_features) to a response
/// matrix Y (n_samples × n_targets) through a small number of latent components.
/// Training extracts one component at a time, deflating X and Y after each, and
/// assembles the combined operator `PBQ = P · B · Qᵗ` that maps normalized
/// predictors straight to normalized responses.
///
/// A model is either untrained or holds a complete fitted snapshot. A call to `train`
/// builds a fresh snapshot and swaps it in only once training succeeds.
#[derive(Debug, Clone, Default)]
pub struct PLS {
    fitted: Option<FittedPls>,
}

/// Every artifact produced by one successful training run.
#[derive(Debug, Clone)]
pub(crate) struct FittedPls {
    /// X scores (T). Shape: (n_samples, k_components)
    pub(crate) x_scores: Array2<f64>,
    /// X loadings (P), unit-norm columns. Shape: (n_features, k_components)
    pub(crate) x_loadings: Array2<f64>,
    /// Y scores (U). Shape: (n_samples, k_components)
    pub(crate) y_scores: Array2<f64>,
    /// Y loadings (Q), unit-norm columns. Shape: (n_targets, k_components)
    pub(crate) y_loadings: Array2<f64>,
    /// X weights (W). Shape: (n_features, k_components)
    pub(crate) x_weights: Array2<f64>,
    /// Diagonal inner-relation coefficients (B). Shape: (k_components, k_components)
    pub(crate) inner_coefficients: Array2<f64>,
    /// P · B · Qᵗ. Shape: (n_features, n_targets)
    pub(crate) coefficients: Array2<f64>,
    /// Deflated X after the last component (E).
    pub(crate) x_residuals: Array2<f64>,
    /// Deflated Y after the last component (F).
    pub(crate) y_residuals: Array2<f64>,
    /// Sum of squares of the normalized Y before deflation.
    pub(crate) y_sum_of_squares: f64,
    /// Negated column means of the training Y. Shape: (n_targets)
    pub(crate) y_means: Array1<f64>,
    /// Sanitized column standard deviations of the training Y. Shape: (n_targets)
    pub(crate) y_std_devs: Array1<f64>,
    /// Share of X variance explained by the last extracted component.
    pub(crate) r2x: f64,
    /// Whether columns were scaled as well as centered.
    pub(crate) scale: bool,
    /// ‖Y‖_F before the first component and after each deflation.
    /// Empty for models restored from a record.
    pub(crate) residual_norm_history: Vec<f64>,
}

impl PLS {
    /// Creates a new, untrained PLS model.
    ///
    /// # Examples
    ///
    /// ```
    /// use efficient_pls::PLS;
    /// let pls = PLS::new();
    /// assert!(!pls.is_fitted());
    /// ```
    pub fn new() -> Self {
        Self { fitted: None }
    }

    pub(crate) fn from_fitted(fitted: FittedPls) -> Self {
        Self {
            fitted: Some(fitted),
        }
    }

    pub(crate) fn fitted(&self) -> Result<&FittedPls, PlsError> {
        self.fitted.as_ref().ok_or(PlsError::NotFitted)
    }

    /// Fits the model with NIPALS.
    ///
    /// * `training_set` - Predictors X, shape (n_samples, n_features).
    /// * `predictions` - Responses Y, shape (n_samples, n_targets).
    /// * `options` - `latent_vectors` and `tolerance` are required.
    ///
    /// Both matrices are consumed: they are normalized and then deflated in place.
    /// Clone them first if the originals are still needed.
    ///
    /// Components are extracted while the residual ‖Y‖_F exceeds `tolerance` and fewer
    /// than `latent_vectors` components exist. Extraction also stops early once X has
    /// no variance left. On any error the previously fitted state (if any) is kept.
    ///
    /// # Errors
    /// * `PlsError::InvalidArgument` for missing or invalid options, mismatched row
    ///   counts, empty matrices, or non-finite values.
    /// * `PlsError::NumericalDegeneracy` if a norm collapses during extraction, the
    ///   inner iteration fails to converge within `max_iterations`, or no component
    ///   could be extracted at all.
    pub fn train(
        &mut self,
        training_set: Array2<f64>,
        predictions: Array2<f64>,
        options: &PlsOptions,
    ) -> Result<(), PlsError> {
        let config = options.validate()?;

        if training_set.nrows() != predictions.nrows() {
            return Err(PlsError::InvalidArgument(format!(
                "Training set has {} rows but predictions have {}; every sample needs a response.",
                training_set.nrows(),
                predictions.nrows()
            )));
        }

        info!(
            "Training PLS on {} samples, {} features, {} targets (latentVectors={}, tolerance={:e})",
            training_set.nrows(),
            training_set.ncols(),
            predictions.ncols(),
            config.latent_vectors,
            config.tolerance
        );

        let fitted = fit_nipals(training_set, predictions, &config)?;

        info!(
            "PLS training finished with {} components, R2X={:.6}",
            fitted.x_scores.ncols(),
            fitted.r2x
        );
        self.fitted = Some(fitted);
        Ok(())
    }

    /// Nested-table form of [`PLS::train`].
    ///
    /// # Errors
    /// As `train`, plus `PlsError::InvalidArgument` for ragged tables.
    pub fn train_rows(
        &mut self,
        training_set: &[Vec<f64>],
        predictions: &[Vec<f64>],
        options: &PlsOptions,
    ) -> Result<(), PlsError> {
        let x = matrix_from_rows(training_set)?;
        let y = matrix_from_rows(predictions)?;
        self.train(x, y, options)
    }

    /// Predicts responses for new samples.
    ///
    /// The input is normalized with its *own* column statistics (not the training
    /// statistics), multiplied by `PBQ`, and mapped back to the response scale with the
    /// stored Y standard deviations and means. Consequently a single-row input
    /// normalizes to zeros and predicts the training mean of Y.
    ///
    /// * `dataset` - Shape (m_samples, n_features). Consumed.
    ///
    /// # Errors
    /// * `PlsError::NotFitted` if the model has not been trained or loaded.
    /// * `PlsError::DimensionMismatch` if the column count differs from training.
    /// * `PlsError::InvalidArgument` for non-finite input values.
    pub fn predict(&self, dataset: Array2<f64>) -> Result<Array2<f64>, PlsError> {
        let fitted = self.fitted()?;
        let n_features = fitted.coefficients.nrows();
        let n_targets = fitted.coefficients.ncols();

        if dataset.ncols() != n_features {
            return Err(PlsError::DimensionMismatch {
                expected: n_features,
                found: dataset.ncols(),
            });
        }
        if dataset.nrows() == 0 {
            return Ok(Array2::zeros((0, n_targets)));
        }

        let normalized = feature_normalize(dataset, fitted.scale)?;
        let mut y = normalized.data.dot(&fitted.coefficients);
        y *= &fitted.y_std_devs;
        // y_means holds the negated training means.
        y -= &fitted.y_means;
        Ok(y)
    }

    /// Nested-table form of [`PLS::predict`].
    ///
    /// # Errors
    /// As `predict`, plus `PlsError::InvalidArgument` for ragged tables.
    pub fn predict_rows(&self, dataset: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, PlsError> {
        let x = matrix_from_rows(dataset)?;
        let y = self.predict(x)?;
        Ok(matrix_to_rows(&y))
    }

    /// R2X: the share of X variance explained by the last extracted component.
    ///
    /// This is a per-component figure, not a cumulative one.
    /// Returns `None` if the model has not been fitted.
    pub fn explained_variance(&self) -> Option<f64> {
        self.fitted.as_ref().map(|f| f.r2x)
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Number of latent components retained, or `None` if not fitted.
    pub fn n_components(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.x_scores.ncols())
    }

    /// X scores (T), shape (n_samples, k_components).
    pub fn x_scores(&self) -> Option<&Array2<f64>> {
        self.fitted.as_ref().map(|f| &f.x_scores)
    }

    /// X loadings (P), shape (n_features, k_components).
    pub fn x_loadings(&self) -> Option<&Array2<f64>> {
        self.fitted.as_ref().map(|f| &f.x_loadings)
    }

    /// Y scores (U), shape (n_samples, k_components).
    pub fn y_scores(&self) -> Option<&Array2<f64>> {
        self.fitted.as_ref().map(|f| &f.y_scores)
    }

    /// Y loadings (Q), shape (n_targets, k_components).
    pub fn y_loadings(&self) -> Option<&Array2<f64>> {
        self.fitted.as_ref().map(|f| &f.y_loadings)
    }

    /// X weights (W), shape (n_features, k_components).
    pub fn x_weights(&self) -> Option<&Array2<f64>> {
        self.fitted.as_ref().map(|f| &f.x_weights)
    }

    /// Diagonal inner-relation coefficients (B), shape (k_components, k_components).
    pub fn inner_coefficients(&self) -> Option<&Array2<f64>> {
        self.fitted.as_ref().map(|f| &f.inner_coefficients)
    }

    /// Combined regression operator `PBQ`, shape (n_features, n_targets).
    pub fn coefficients(&self) -> Option<&Array2<f64>> {
        self.fitted.as_ref().map(|f| &f.coefficients)
    }

    /// Residual X after deflation (E).
    pub fn x_residuals(&self) -> Option<&Array2<f64>> {
        self.fitted.as_ref().map(|f| &f.x_residuals)
    }

    /// Residual Y after deflation (F).
    pub fn y_residuals(&self) -> Option<&Array2<f64>> {
        self.fitted.as_ref().map(|f| &f.y_residuals)
    }

    /// Sum of squares of the normalized training Y (ssqYcal).
    pub fn y_sum_of_squares(&self) -> Option<f64> {
        self.fitted.as_ref().map(|f| f.y_sum_of_squares)
    }

    /// Negated column means of the training Y.
    pub fn y_means(&self) -> Option<&Array1<f64>> {
        self.fitted.as_ref().map(|f| &f.y_means)
    }

    /// Column standard deviations of the training Y.
    pub fn y_std_devs(&self) -> Option<&Array1<f64>> {
        self.fitted.as_ref().map(|f| &f.y_std_devs)
    }

    /// ‖Y‖_F before the first component and after each deflation step.
    pub fn residual_norm_history(&self) -> Option<&[f64]> {
        self.fitted
            .as_ref()
            .map(|f| f.residual_norm_history.as_slice())
    }
}

/// Runs NIPALS on owned X and Y and assembles the fitted snapshot.
fn fit_nipals(
    training_set: Array2<f64>,
    predictions: Array2<f64>,
    config: &TrainingConfig,
) -> Result<FittedPls, PlsError> {
    let tolerance = config.tolerance;
    let max_components = config.latent_vectors;

    let x_normalized = feature_normalize(training_set, config.scale)?;
    let y_normalized = feature_normalize(predictions, config.scale)?;
    let mut x = x_normalized.data;
    let mut y = y_normalized.data;
    let y_means = y_normalized.means.mapv(|m| -m);
    let y_std_devs = y_normalized.std_devs;

    let (n_samples, n_features) = x.dim();
    let n_targets = y.ncols();

    let ssq_x_cal = sum_of_squares(&x);
    let ssq_y_cal = sum_of_squares(&y);

    // X has rank at most min(n, m); more components than that are never extracted.
    let capacity = max_components.min(n_samples).min(n_features);

    let mut t_mat = Array2::<f64>::zeros((n_samples, capacity));
    let mut p_mat = Array2::<f64>::zeros((n_features, capacity));
    let mut u_mat = Array2::<f64>::zeros((n_samples, capacity));
    let mut q_mat = Array2::<f64>::zeros((n_targets, capacity));
    let mut w_mat = Array2::<f64>::zeros((n_features, capacity));
    let mut b_mat = Array2::<f64>::zeros((capacity, capacity));

    let mut residual_norm_history = vec![frobenius_norm(&y)];
    let mut last_component: Option<(Array1<f64>, Array1<f64>)> = None;
    let mut k = 0;

    while k < capacity && frobenius_norm(&y) > tolerance {
        let t_index = max_squared_col_index(&x);
        let u_index = max_squared_col_index(&y);
        trace!(
            "Component {}: starting from X column {} and Y column {}",
            k,
            t_index,
            u_index
        );

        let mut t1 = x.column(t_index).to_owned();
        if frobenius_norm(&t1) <= tolerance {
            warn!(
                "X has no variance left after {} components; stopping before latentVectors={}.",
                k, max_components
            );
            break;
        }
        let mut u = y.column(u_index).to_owned();
        let mut t = Array1::<f64>::zeros(n_samples);
        let mut w = Array1::<f64>::zeros(n_features);
        let mut q = Array1::<f64>::zeros(n_targets);

        let mut iterations = 0;
        while frobenius_norm(&(&t1 - &t)) > tolerance {
            if iterations == config.max_iterations {
                return Err(PlsError::NumericalDegeneracy {
                    stage: "inner iteration convergence",
                    component: k,
                });
            }
            iterations += 1;

            w = x.t().dot(&u);
            unit_normalize(&mut w, "x-weights", k)?;
            t = t1;
            t1 = x.dot(&w);
            q = y.t().dot(&t1);
            unit_normalize(&mut q, "y-loadings", k)?;
            u = y.dot(&q);
        }

        let mut t = t1;
        let tt = t.dot(&t);
        if tt <= NUMERICAL_ZERO {
            return Err(PlsError::NumericalDegeneracy {
                stage: "x-scores",
                component: k,
            });
        }
        let mut p = x.t().dot(&t) / tt;
        let p_norm = unit_normalize(&mut p, "x-loadings", k)?;
        t *= p_norm;
        w *= p_norm;

        let b = u.dot(&t) / t.dot(&t);
        if !b.is_finite() {
            return Err(PlsError::NumericalDegeneracy {
                stage: "inner regression coefficient",
                component: k,
            });
        }

        x -= &outer(&t, &p);
        y -= &(outer(&t, &q) * b);

        t_mat.column_mut(k).assign(&t);
        p_mat.column_mut(k).assign(&p);
        u_mat.column_mut(k).assign(&u);
        q_mat.column_mut(k).assign(&q);
        w_mat.column_mut(k).assign(&w);
        b_mat[[k, k]] = b;

        let y_residual_norm = frobenius_norm(&y);
        residual_norm_history.push(y_residual_norm);
        debug!(
            "Component {}: {} inner iterations, b={:.6}, residual ||Y||={:.6e}",
            k, iterations, b, y_residual_norm
        );

        last_component = Some((t, p));
        k += 1;
    }

    let (t_last, p_last) = last_component.ok_or(PlsError::NumericalDegeneracy {
        stage: "first latent component",
        component: 0,
    })?;

    if k == capacity && frobenius_norm(&y) > tolerance {
        warn!(
            "Residual ||Y||={:.6e} is still above tolerance after {} components (latentVectors={}).",
            frobenius_norm(&y),
            k,
            max_components
        );
    }

    // `k` counts extracted components; the last valid column index is k - 1 and
    // everything up to it (inclusive) is kept.
    let last_index = k - 1;
    let n_kept = last_index + 1;
    let x_scores = leading_columns(&t_mat, n_kept);
    let x_loadings = leading_columns(&p_mat, n_kept);
    let y_scores = leading_columns(&u_mat, n_kept);
    let y_loadings = leading_columns(&q_mat, n_kept);
    let x_weights = leading_columns(&w_mat, n_kept);
    let inner_coefficients = leading_block(&b_mat, n_kept);

    let r2x = t_last.dot(&t_last) * p_last.dot(&p_last) / ssq_x_cal;
    let coefficients = x_loadings.dot(&inner_coefficients).dot(&y_loadings.t());

    Ok(FittedPls {
        x_scores,
        x_loadings,
        y_scores,
        y_loadings,
        x_weights,
        inner_coefficients,
        coefficients,
        x_residuals: x,
        y_residuals: y,
        y_sum_of_squares: ssq_y_cal,
        y_means,
        y_std_devs,
        r2x,
        scale: config.scale,
        residual_norm_history,
    })
}
