//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

//! Vertical logistic regression with per round blinding
//!
//! The active party holds `X_b` and the labels, every passive party holds a
//! disjoint set of columns `X_a` for the same rows. Each batch runs one
//! masked exchange per passive party; see [`traits`] for the step order.

use std::{error::Error, fmt};

use crypto::blinding::BlindingError;
use ndarray::Array1;
use ndarray::Axis;
use rand::Rng;

use crate::shared::{TFeatures, TLabels, TVector};

#[derive(Debug)]
pub enum ProtocolError {
    ErrorIO(String),
    ErrorMissingInput(String),
    ErrorShape(String),
    ErrorBatch(String),
    ErrorOutOfOrder(String),
    ErrorBlinding(BlindingError),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::ErrorIO(s) => write!(f, "protocol error: cannot load input: {}", s),
            ProtocolError::ErrorMissingInput(s) => {
                write!(f, "protocol error: {} cannot be empty", s)
            }
            ProtocolError::ErrorShape(s) => write!(f, "protocol error: shape mismatch: {}", s),
            ProtocolError::ErrorBatch(s) => write!(f, "protocol error: bad batch: {}", s),
            ProtocolError::ErrorOutOfOrder(s) => {
                write!(f, "protocol error: step out of order: {}", s)
            }
            ProtocolError::ErrorBlinding(e) => write!(f, "protocol error: blinding: {}", e),
        }
    }
}

impl Error for ProtocolError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ProtocolError::ErrorBlinding(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BlindingError> for ProtocolError {
    fn from(e: BlindingError) -> Self {
        ProtocolError::ErrorBlinding(e)
    }
}

/// Hyper parameters shared by both roles
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingParams {
    pub epochs: usize,
    pub learning_rate: f64,
    pub batch_size: usize,
    /// Seeds shuffling and weight initialisation, never blinding factors
    pub seed: Option<u64>,
}

impl Default for TrainingParams {
    fn default() -> Self {
        TrainingParams {
            epochs: 1,
            learning_rate: 0.01,
            batch_size: 64,
            seed: None,
        }
    }
}

pub fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Standard normal initial weights
pub fn init_weights<R: Rng + ?Sized>(dim: usize, rng: &mut R) -> TVector {
    TVector::from_shape_fn(dim, |_| rng.sample::<f64, _>(rand_distr::StandardNormal))
}

/// Rows of `features` named by `batch`, in batch order
pub(crate) fn select_rows(features: &TFeatures, batch: &[usize]) -> Result<TFeatures, ProtocolError> {
    if batch.is_empty() {
        return Err(ProtocolError::ErrorBatch("empty batch".to_string()));
    }
    if let Some(bad) = batch.iter().find(|&&i| i >= features.nrows()) {
        return Err(ProtocolError::ErrorBatch(format!(
            "row {} is out of range, {} rows available",
            bad,
            features.nrows()
        )));
    }
    Ok(features.select(Axis(0), batch))
}

pub(crate) fn check_len(what: &str, v: &TVector, expected: usize) -> Result<(), ProtocolError> {
    if v.len() != expected {
        return Err(ProtocolError::ErrorShape(format!(
            "{} has {} entries, expected {}",
            what,
            v.len(),
            expected
        )));
    }
    Ok(())
}

/// Share of predictions equal to the labels
pub fn accuracy(predicted: &Array1<u8>, labels: &TLabels) -> Result<f64, ProtocolError> {
    check_len("labels", labels, predicted.len())?;
    if predicted.is_empty() {
        return Err(ProtocolError::ErrorShape("no rows to score".to_string()));
    }
    let hits = predicted
        .iter()
        .zip(labels.iter())
        .filter(|&(&p, &y)| f64::from(p) == y)
        .count();
    Ok(hits as f64 / predicted.len() as f64)
}

pub mod active;
pub mod passive;
pub mod traits;

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn sigmoid_values() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(30.0) > 0.999);
        assert!(sigmoid(-30.0) < 0.001);
    }

    #[test]
    fn accuracy_counts_hits() {
        let acc = accuracy(&array![1u8, 0, 1, 1], &array![1.0, 1.0, 1.0, 0.0]).unwrap();
        assert_eq!(acc, 0.5);
        assert!(accuracy(&array![1u8], &array![1.0, 0.0]).is_err());
    }

    #[test]
    fn select_rows_keeps_batch_order() {
        let x = array![[0.0, 1.0], [2.0, 3.0], [4.0, 5.0]];
        let s = select_rows(&x, &[2, 0]).unwrap();
        assert_eq!(s, array![[4.0, 5.0], [0.0, 1.0]]);
    }

    #[test]
    fn select_rows_rejects_bad_rows() {
        let x = array![[0.0], [1.0]];
        assert!(matches!(
            select_rows(&x, &[0, 2]),
            Err(ProtocolError::ErrorBatch(_))
        ));
        assert!(matches!(
            select_rows(&x, &[]),
            Err(ProtocolError::ErrorBatch(_))
        ));
    }
}
