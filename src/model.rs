// src/model.rs

use crate::error::PlsError;
use crate::linalg::{matrix_from_rows, matrix_to_rows, NUMERICAL_ZERO};
use crate::pls::{FittedPls, PLS};
use float_cmp::approx_eq;
use log::info;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Kind tag carried by every exported PLS record.
pub const MODEL_NAME: &str = "PLS";

/// Plain, serializable snapshot of a fitted PLS model.
///
/// Field names follow the exported record layout
/// (`modelName`, `E`, `F`, `R2X`, `ssqYcal`, `ymean`, `ystd`, `PBQ`, `T`, `P`, `U`,
/// `Q`, `W`, `B`). Matrices are stored as row tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlsModelRecord {
    #[serde(rename = "modelName")]
    pub model_name: String,
    #[serde(rename = "E")]
    pub e: Vec<Vec<f64>>,
    #[serde(rename = "F")]
    pub f: Vec<Vec<f64>>,
    #[serde(rename = "R2X")]
    pub r2x: f64,
    #[serde(rename = "ssqYcal")]
    pub ssq_y_cal: f64,
    pub ymean: Vec<f64>,
    pub ystd: Vec<f64>,
    #[serde(rename = "PBQ")]
    pub pbq: Vec<Vec<f64>>,
    #[serde(rename = "T")]
    pub t: Vec<Vec<f64>>,
    #[serde(rename = "P")]
    pub p: Vec<Vec<f64>>,
    #[serde(rename = "U")]
    pub u: Vec<Vec<f64>>,
    #[serde(rename = "Q")]
    pub q: Vec<Vec<f64>>,
    #[serde(rename = "W")]
    pub w: Vec<Vec<f64>>,
    #[serde(rename = "B")]
    pub b: Vec<Vec<f64>>,
    /// Records written before scaling became optional were always scaled.
    #[serde(default = "default_scale")]
    pub scale: bool,
}

fn default_scale() -> bool {
    true
}

fn table(name: &str, rows: &[Vec<f64>]) -> Result<Array2<f64>, PlsError> {
    let m = matrix_from_rows(rows)
        .map_err(|e| PlsError::Validation(format!("{} is not a rectangular table: {}", name, e)))?;
    if m.iter().any(|v| !v.is_finite()) {
        return Err(PlsError::Validation(format!(
            "{} contains non-finite values.",
            name
        )));
    }
    Ok(m)
}

fn expect_shape(name: &str, m: &Array2<f64>, rows: usize, cols: usize) -> Result<(), PlsError> {
    if m.dim() != (rows, cols) {
        return Err(PlsError::Validation(format!(
            "{} has shape {:?}, expected {:?}.",
            name,
            m.dim(),
            (rows, cols)
        )));
    }
    Ok(())
}

impl PLS {
    /// Exports the fitted model as a plain record.
    ///
    /// # Errors
    /// `PlsError::NotFitted` if the model has not been trained or loaded.
    pub fn export(&self) -> Result<PlsModelRecord, PlsError> {
        let fitted = self.fitted()?;
        Ok(PlsModelRecord {
            model_name: MODEL_NAME.to_string(),
            e: matrix_to_rows(&fitted.x_residuals),
            f: matrix_to_rows(&fitted.y_residuals),
            r2x: fitted.r2x,
            ssq_y_cal: fitted.y_sum_of_squares,
            ymean: fitted.y_means.to_vec(),
            ystd: fitted.y_std_devs.to_vec(),
            pbq: matrix_to_rows(&fitted.coefficients),
            t: matrix_to_rows(&fitted.x_scores),
            p: matrix_to_rows(&fitted.x_loadings),
            u: matrix_to_rows(&fitted.y_scores),
            q: matrix_to_rows(&fitted.y_loadings),
            w: matrix_to_rows(&fitted.x_weights),
            b: matrix_to_rows(&fitted.inner_coefficients),
            scale: fitted.scale,
        })
    }

    /// Restores a trained model from an exported record without retraining.
    ///
    /// # Errors
    /// `PlsError::Validation` if the kind tag is not `"PLS"`, if any table is ragged or
    /// holds non-finite values, if the artifacts disagree on dimensions, if `B` has
    /// populated off-diagonal entries, or if `ystd` holds non-positive values.
    pub fn load(record: PlsModelRecord) -> Result<PLS, PlsError> {
        if record.model_name != MODEL_NAME {
            return Err(PlsError::Validation(format!(
                "Expected model kind \"{}\", got \"{}\".",
                MODEL_NAME, record.model_name
            )));
        }

        let coefficients = table("PBQ", &record.pbq)?;
        let x_scores = table("T", &record.t)?;
        let x_loadings = table("P", &record.p)?;
        let y_scores = table("U", &record.u)?;
        let y_loadings = table("Q", &record.q)?;
        let x_weights = table("W", &record.w)?;
        let inner_coefficients = table("B", &record.b)?;
        let x_residuals = table("E", &record.e)?;
        let y_residuals = table("F", &record.f)?;

        let (n_features, n_targets) = coefficients.dim();
        let n_samples = x_scores.nrows();
        let k = inner_coefficients.nrows();

        if n_features == 0 || n_targets == 0 || k == 0 || n_samples == 0 {
            return Err(PlsError::Validation(
                "Record holds an empty model (no features, targets, samples or components)."
                    .into(),
            ));
        }
        if record.ymean.len() != n_targets || record.ystd.len() != n_targets {
            return Err(PlsError::Validation(format!(
                "ymean ({}) and ystd ({}) must both have {} entries to match PBQ.",
                record.ymean.len(),
                record.ystd.len(),
                n_targets
            )));
        }

        expect_shape("B", &inner_coefficients, k, k)?;
        expect_shape("T", &x_scores, n_samples, k)?;
        expect_shape("P", &x_loadings, n_features, k)?;
        expect_shape("U", &y_scores, n_samples, k)?;
        expect_shape("Q", &y_loadings, n_targets, k)?;
        expect_shape("W", &x_weights, n_features, k)?;
        expect_shape("E", &x_residuals, n_samples, n_features)?;
        expect_shape("F", &y_residuals, n_samples, n_targets)?;

        for ((i, j), &v) in inner_coefficients.indexed_iter() {
            if i != j && !approx_eq!(f64, v, 0.0, epsilon = NUMERICAL_ZERO) {
                return Err(PlsError::Validation(format!(
                    "B must be diagonal, but B[{}][{}] = {}.",
                    i, j, v
                )));
            }
        }

        if record
            .ymean
            .iter()
            .chain(std::iter::once(&record.r2x))
            .chain(std::iter::once(&record.ssq_y_cal))
            .any(|v| !v.is_finite())
        {
            return Err(PlsError::Validation(
                "ymean, R2X and ssqYcal must be finite.".into(),
            ));
        }
        if record.ystd.iter().any(|&s| !s.is_finite() || s <= 0.0) {
            return Err(PlsError::Validation(
                "ystd must contain only positive, finite values.".into(),
            ));
        }

        Ok(PLS::from_fitted(FittedPls {
            x_scores,
            x_loadings,
            y_scores,
            y_loadings,
            x_weights,
            inner_coefficients,
            coefficients,
            x_residuals,
            y_residuals,
            y_sum_of_squares: record.ssq_y_cal,
            y_means: Array1::from(record.ymean),
            y_std_devs: Array1::from(record.ystd),
            r2x: record.r2x,
            scale: record.scale,
            residual_norm_history: Vec::new(),
        }))
    }

    /// Saves the fitted model to a file using bincode.
    ///
    /// * `path` - The file path to save the model to.
    ///
    /// # Errors
    /// `PlsError::NotFitted` for an untrained model, `PlsError::Io` if the file cannot
    /// be created, `PlsError::Serialization` if encoding fails.
    pub fn save_model<P: AsRef<Path>>(&self, path: P) -> Result<(), PlsError> {
        let record = self.export()?;
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        bincode::serde::encode_into_std_write(&record, &mut writer, bincode::config::standard())?;
        writer.flush()?;
        info!("Saved PLS model to {:?}", path.as_ref());
        Ok(())
    }

    /// Loads a model previously written by [`PLS::save_model`].
    ///
    /// The decoded record goes through the same validation as [`PLS::load`].
    ///
    /// # Errors
    /// `PlsError::Io`, `PlsError::Serialization`, or any error from `load`.
    pub fn load_model<P: AsRef<Path>>(path: P) -> Result<PLS, PlsError> {
        let file = File::open(path.as_ref())?;
        let mut reader = BufReader::new(file);
        let record: PlsModelRecord =
            bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard())?;
        PLS::load(record)
    }
}
