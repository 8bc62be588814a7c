// src/error.rs

use thiserror::Error;

/// Errors raised while training, predicting with, or persisting a PLS model.
#[derive(Error, Debug)]
pub enum PlsError {
    /// A caller-supplied argument was missing, out of range, or inconsistent.
    /// Raised before any model state is touched.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A norm or inner product collapsed to (near) zero while extracting a component.
    #[error("Numerical degeneracy while computing {stage} for latent component {component}")]
    NumericalDegeneracy {
        stage: &'static str,
        component: usize,
    },

    /// Prediction input does not have the number of features the model was trained on.
    #[error("Input data has {found} feature columns, but the model was trained on {expected}.")]
    DimensionMismatch { expected: usize, found: usize },

    /// An exported model record is malformed or carries the wrong kind tag.
    #[error("Invalid model record: {0}")]
    Validation(String),

    #[error("PLS model is not fitted. Train or load a model first.")]
    NotFitted,

    #[error("Failed to read or write model file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to (de)serialize PLS model: {0}")]
    Serialization(String),
}

impl From<bincode::error::EncodeError> for PlsError {
    fn from(e: bincode::error::EncodeError) -> Self {
        PlsError::Serialization(e.to_string())
    }
}

impl From<bincode::error::DecodeError> for PlsError {
    fn from(e: bincode::error::DecodeError) -> Self {
        PlsError::Serialization(e.to_string())
    }
}
