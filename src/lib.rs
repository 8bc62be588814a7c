// Partial least squares (PLS) regression

#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod linalg;
pub mod model;
pub mod normalize;
pub mod pls;

pub use config::{PlsOptions, TrainingConfig};
pub use error::PlsError;
pub use model::{PlsModelRecord, MODEL_NAME};
pub use pls::PLS;

#[cfg(test)]
mod pls_tests;
