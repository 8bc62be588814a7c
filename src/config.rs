// src/config.rs

use crate::error::PlsError;
use serde::{Deserialize, Serialize};

/// Default cap on inner NIPALS sweeps per latent component.
pub const DEFAULT_MAX_ITERATIONS: usize = 500;

/// User-facing training options.
///
/// `latent_vectors` and `tolerance` are required; they are optional here only so a
/// partially specified record (e.g. `{"latentVectors": 2}`) can be deserialized and
/// then rejected with a precise message by [`PlsOptions::validate`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlsOptions {
    /// Upper bound on the number of latent components to extract.
    pub latent_vectors: Option<usize>,
    /// Convergence tolerance for both the outer (residual Y norm) and the
    /// inner (change in the X score) stopping rules.
    pub tolerance: Option<f64>,
    /// Maximum inner NIPALS sweeps per component before giving up.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Scale columns to unit standard deviation after centering.
    #[serde(default = "default_scale")]
    pub scale: bool,
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

fn default_scale() -> bool {
    true
}

impl Default for PlsOptions {
    /// No component count or tolerance; both must be set before training.
    fn default() -> Self {
        PlsOptions {
            latent_vectors: None,
            tolerance: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            scale: true,
        }
    }
}

impl PlsOptions {
    pub fn new(latent_vectors: usize, tolerance: f64) -> Self {
        PlsOptions {
            latent_vectors: Some(latent_vectors),
            tolerance: Some(tolerance),
            ..Default::default()
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_scale(mut self, scale: bool) -> Self {
        self.scale = scale;
        self
    }

    /// Checks every option and returns the resolved configuration.
    ///
    /// # Errors
    /// `PlsError::InvalidArgument` if `latent_vectors` is missing or zero, if
    /// `tolerance` is missing, non-finite or not strictly positive, or if
    /// `max_iterations` is zero.
    pub fn validate(&self) -> Result<TrainingConfig, PlsError> {
        let latent_vectors = match self.latent_vectors {
            Some(0) => {
                return Err(PlsError::InvalidArgument(
                    "latentVectors must be a positive integer.".into(),
                ))
            }
            Some(k) => k,
            None => {
                return Err(PlsError::InvalidArgument(
                    "latentVectors option is required.".into(),
                ))
            }
        };

        let tolerance = match self.tolerance {
            Some(tol) if tol.is_finite() && tol > 0.0 => tol,
            Some(tol) => {
                return Err(PlsError::InvalidArgument(format!(
                    "tolerance must be a positive finite number, got {}.",
                    tol
                )))
            }
            None => {
                return Err(PlsError::InvalidArgument(
                    "tolerance option is required.".into(),
                ))
            }
        };

        if self.max_iterations == 0 {
            return Err(PlsError::InvalidArgument(
                "maxIterations must be greater than 0.".into(),
            ));
        }

        Ok(TrainingConfig {
            latent_vectors,
            tolerance,
            max_iterations: self.max_iterations,
            scale: self.scale,
        })
    }
}

/// Validated training configuration produced by [`PlsOptions::validate`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrainingConfig {
    pub latent_vectors: usize,
    pub tolerance: f64,
    pub max_iterations: usize,
    pub scale: bool,
}
