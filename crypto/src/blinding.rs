//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

use ndarray::Array1;
use ndarray::Array2;

use crate::matrix;
use crate::random::BlindingSource;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BlindingError {
    #[error("no usable {what} after {attempts} draws")]
    Degenerate { what: &'static str, attempts: usize },
    #[error("party {party} is unknown, {parties} parties are tracked")]
    UnknownParty { party: usize, parties: usize },
    #[error("party {party} has no phi for round {round}")]
    UnknownRound { party: usize, round: usize },
    #[error("expected one phi per party ({expected}), got {got}")]
    PartyCount { expected: usize, got: usize },
    #[error("phi must be nonzero")]
    ZeroPhi,
}

/// Draws a scalar until it is nonzero
pub fn sample_nonzero<S: BlindingSource + ?Sized>(
    source: &mut S,
    max_attempts: usize,
) -> Result<f64, BlindingError> {
    for attempt in 0..max_attempts {
        let v = source.scalar();
        if v != 0.0 && v.is_finite() {
            return Ok(v);
        }
        debug!("degenerate phi draw, attempt {}", attempt);
    }
    Err(BlindingError::Degenerate {
        what: "nonzero phi",
        attempts: max_attempts,
    })
}

/// A passive party's secret for one round: `K` and its inverse
#[derive(Debug, Clone)]
pub struct RoundSecret {
    k: Array2<f64>,
    k_inverse: Array2<f64>,
}

/// Draws `dim x dim` matrices until one is invertible, returns it with
/// its inverse
pub fn sample_invertible<S: BlindingSource + ?Sized>(
    source: &mut S,
    dim: usize,
    max_attempts: usize,
) -> Result<(Array2<f64>, Array2<f64>), BlindingError> {
    for attempt in 0..max_attempts {
        let k = source.matrix(dim);
        if matrix::determinant(&k) == 0.0 {
            debug!("singular K draw, attempt {}", attempt);
            continue;
        }
        if let Some(k_inverse) = matrix::invert(&k) {
            return Ok((k, k_inverse));
        }
    }
    Err(BlindingError::Degenerate {
        what: "invertible K",
        attempts: max_attempts,
    })
}

impl RoundSecret {
    pub fn sample<S: BlindingSource + ?Sized>(
        source: &mut S,
        dim: usize,
        max_attempts: usize,
    ) -> Result<RoundSecret, BlindingError> {
        let (k, k_inverse) = sample_invertible(source, dim, max_attempts)?;
        Ok(RoundSecret { k, k_inverse })
    }

    pub fn k(&self) -> &Array2<f64> {
        &self.k
    }

    pub fn k_inverse(&self) -> &Array2<f64> {
        &self.k_inverse
    }

    pub fn blind(&self, v: &Array1<f64>) -> Array1<f64> {
        self.k.dot(v)
    }

    pub fn unblind(&self, v: &Array1<f64>) -> Array1<f64> {
        self.k_inverse.dot(v)
    }
}

/// Factors the active party draws once per batch and shares across parties
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchMask {
    pub sigma: f64,
    pub tor: f64,
}

impl BatchMask {
    pub fn sample<S: BlindingSource + ?Sized>(source: &mut S) -> BatchMask {
        BatchMask {
            sigma: source.scalar(),
            tor: source.scalar(),
        }
    }

    /// `sigma * delta + tor`
    pub fn apply(&self, delta: &Array1<f64>) -> Array1<f64> {
        delta.mapv(|d| self.sigma * d + self.tor)
    }
}

/// Per party record of every `phi` the active party has issued
///
/// Round `r` is unmasked with the value committed at the end of round
/// `r - 1`, so the history starts with `1.0` for every party.
#[derive(Debug, Clone, PartialEq)]
pub struct PhiHistory {
    phis: Vec<Vec<f64>>,
}

impl PhiHistory {
    pub fn new(parties: usize) -> PhiHistory {
        PhiHistory {
            phis: vec![vec![1.0]; parties],
        }
    }

    /// Number of committed rounds
    pub fn rounds(&self) -> usize {
        self.phis.first().map(|p| p.len() - 1).unwrap_or_default()
    }

    fn party(&self, party: usize) -> Result<&Vec<f64>, BlindingError> {
        self.phis.get(party).ok_or(BlindingError::UnknownParty {
            party,
            parties: self.phis.len(),
        })
    }

    /// The carry needed to unmask the current round of `party`
    pub fn previous(&self, party: usize) -> Result<f64, BlindingError> {
        let history = self.party(party)?;
        history
            .last()
            .copied()
            .ok_or(BlindingError::UnknownRound { party, round: 0 })
    }

    pub fn previous_all(&self) -> Vec<f64> {
        self.phis
            .iter()
            .map(|p| p.last().copied().unwrap_or(1.0))
            .collect()
    }

    /// `phi` in effect while running round `round` (0 based) of `party`
    pub fn at(&self, party: usize, round: usize) -> Result<f64, BlindingError> {
        self.party(party)?
            .get(round)
            .copied()
            .ok_or(BlindingError::UnknownRound { party, round })
    }

    /// Appends one fresh value per party, in party index order
    pub fn commit(&mut self, fresh: &[f64]) -> Result<(), BlindingError> {
        if fresh.len() != self.phis.len() {
            return Err(BlindingError::PartyCount {
                expected: self.phis.len(),
                got: fresh.len(),
            });
        }
        if fresh.iter().any(|&phi| phi == 0.0) {
            return Err(BlindingError::ZeroPhi);
        }
        for (history, &phi) in self.phis.iter_mut().zip(fresh) {
            history.push(phi);
        }
        Ok(())
    }
}
