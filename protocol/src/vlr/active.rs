//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

use common::permutations;
use crypto::blinding::BatchMask;
use crypto::blinding::PhiHistory;
use ndarray::Array1;
use rand::Rng;

use super::check_len;
use super::init_weights;
use super::select_rows;
use super::sigmoid;
use super::ProtocolError;
use crate::shared::{TBatches, TFeatures, TLabels, TVector};
use crate::vlr::traits::ActiveVlrProtocol;

/// Label holder's state: its columns, the labels, `theta_b` and the
/// `phi` carried for every passive party
#[derive(Debug, Clone)]
pub struct ActiveVlr {
    features: TFeatures,
    labels: TLabels,
    theta: TVector,
    learning_rate: f64,
    phi_history: PhiHistory,
}

impl ActiveVlr {
    pub fn new<R: Rng + ?Sized>(
        features: TFeatures,
        labels: TLabels,
        learning_rate: f64,
        parties: usize,
        rng: &mut R,
    ) -> Result<ActiveVlr, ProtocolError> {
        check_len("labels", &labels, features.nrows())?;
        if parties == 0 {
            return Err(ProtocolError::ErrorShape(
                "at least one passive party is required".to_string(),
            ));
        }
        let theta = init_weights(features.ncols(), rng);
        info!(
            "Active model initialised: rows: {}, cols: {}, passive parties: {}",
            features.nrows(),
            features.ncols(),
            parties
        );
        Ok(ActiveVlr {
            features,
            labels,
            theta,
            learning_rate,
            phi_history: PhiHistory::new(parties),
        })
    }

    pub fn weights(&self) -> &TVector {
        &self.theta
    }

    pub fn phi_history(&self) -> &PhiHistory {
        &self.phi_history
    }

    fn aggregate(
        &self,
        z_b: TVector,
        passive_scores: &[TVector],
        phis: &[f64],
    ) -> Result<TVector, ProtocolError> {
        if passive_scores.len() != phis.len() {
            return Err(ProtocolError::ErrorShape(format!(
                "got scores from {} parties, expected {}",
                passive_scores.len(),
                phis.len()
            )));
        }
        let mut z = z_b;
        for (party, (z_a, phi)) in passive_scores.iter().zip(phis).enumerate() {
            check_len(&format!("score of party {}", party), z_a, z.len())?;
            z.scaled_add(1.0 / phi, z_a);
        }
        Ok(z)
    }
}

impl ActiveVlrProtocol for ActiveVlr {
    fn gen_batches<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> TBatches {
        permutations::gen_batches(self.features.nrows(), batch_size, rng)
    }

    fn local_score(&self, batch: &[usize]) -> Result<TVector, ProtocolError> {
        Ok(select_rows(&self.features, batch)?.dot(&self.theta))
    }

    fn batch_error(
        &self,
        batch: &[usize],
        passive_scores: &[TVector],
    ) -> Result<TVector, ProtocolError> {
        let z_b = self.local_score(batch)?;
        let z = self.aggregate(z_b, passive_scores, &self.phi_history.previous_all())?;
        let y = TVector::from_iter(batch.iter().map(|&i| self.labels[i]));
        Ok(z.mapv(sigmoid) - y)
    }

    fn update_local(&mut self, batch: &[usize], delta: &TVector) -> Result<(), ProtocolError> {
        check_len("delta", delta, batch.len())?;
        let grad = select_rows(&self.features, batch)?.t().dot(delta);
        self.theta.scaled_add(-self.learning_rate, &grad);
        Ok(())
    }

    fn unmask_gradient(
        &self,
        masked_grad_s: &TVector,
        masked_s: &TVector,
        mask: &BatchMask,
    ) -> Result<TVector, ProtocolError> {
        check_len("masked batch mean", masked_s, masked_grad_s.len())?;
        Ok((masked_grad_s - &(masked_s * mask.tor)) / mask.sigma)
    }

    fn remask_gradient(
        &self,
        masked_grad: &TVector,
        phi_prev: f64,
        mu: &TVector,
    ) -> Result<TVector, ProtocolError> {
        check_len("mu", mu, masked_grad.len())?;
        Ok(masked_grad * (self.learning_rate * phi_prev) + mu)
    }

    fn reblind_weights(
        &self,
        masked_theta: &TVector,
        mu: &TVector,
        phi_prev: f64,
        phi_new: f64,
    ) -> Result<TVector, ProtocolError> {
        check_len("mu", mu, masked_theta.len())?;
        Ok((masked_theta + mu) / phi_prev * phi_new)
    }

    fn commit_phis(&mut self, fresh: &[f64]) -> Result<(), ProtocolError> {
        self.phi_history.commit(fresh)?;
        Ok(())
    }

    fn predict_labels(
        &self,
        features: &TFeatures,
        passive_scores: &[TVector],
    ) -> Result<Array1<u8>, ProtocolError> {
        if features.ncols() != self.theta.len() {
            return Err(ProtocolError::ErrorShape(format!(
                "prediction rows have {} columns, model has {}",
                features.ncols(),
                self.theta.len()
            )));
        }
        // partial scores are summed as received, no phi is applied at inference
        let ones = vec![1.0; passive_scores.len()];
        let z = self.aggregate(features.dot(&self.theta), passive_scores, &ones)?;
        Ok(z.mapv(|v| if sigmoid(v) >= 0.5 { 1 } else { 0 }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample() -> ActiveVlr {
        let x = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [0.5, 0.5]];
        let y = array![1.0, 0.0, 1.0, 0.0];
        ActiveVlr::new(x, y, 0.1, 2, &mut StdRng::seed_from_u64(1)).unwrap()
    }

    #[test]
    fn labels_must_match_rows() {
        let r = ActiveVlr::new(
            array![[1.0], [2.0]],
            array![1.0],
            0.1,
            1,
            &mut StdRng::seed_from_u64(0),
        );
        assert!(matches!(r, Err(ProtocolError::ErrorShape(_))));
    }

    #[test]
    fn batch_error_divides_by_previous_phi() {
        let mut a = sample();
        a.commit_phis(&[2.0, -4.0]).unwrap();
        let batch = [0, 1];
        let z_b = a.local_score(&batch).unwrap();
        let s1 = array![2.0, 4.0];
        let s2 = array![4.0, 8.0];
        let delta = a.batch_error(&batch, &[s1, s2]).unwrap();

        // s1 / 2 + s2 / -4 = [0, 0]
        assert!((delta[0] - (sigmoid(z_b[0]) - 1.0)).abs() < 1e-12);
        assert!((delta[1] - sigmoid(z_b[1])).abs() < 1e-12);
    }

    #[test]
    fn batch_error_needs_every_party() {
        let a = sample();
        let r = a.batch_error(&[0], &[array![0.0]]);
        assert!(matches!(r, Err(ProtocolError::ErrorShape(_))));
    }

    #[test]
    fn update_local_is_plain_gradient_descent() {
        let mut a = sample();
        let before = a.weights().clone();
        let delta = array![0.5, -1.0];
        a.update_local(&[0, 1], &delta).unwrap();
        // X[batch]^T . delta = [0.5, -1.0]
        let expected = before - &(array![0.5, -1.0] * 0.1);
        assert!((a.weights() - &expected).iter().all(|d| d.abs() < 1e-12));
    }

    #[test]
    fn reblind_strips_mu_and_swaps_phi() {
        let a = sample();
        let theta = array![1.0, -2.0];
        let mu = array![0.3, 0.7];
        let masked = &theta * 3.0 - &mu;
        let out = a.reblind_weights(&masked, &mu, 3.0, 0.5).unwrap();
        assert!((out - &(theta * 0.5)).iter().all(|d| d.abs() < 1e-12));
    }

    #[test]
    fn predict_thresholds_at_half() {
        let a = sample();
        let x = array![[0.0, 0.0], [0.0, 0.0]];
        let labels = a
            .predict_labels(&x, &[array![10.0, -10.0], array![0.0, 0.0]])
            .unwrap();
        assert_eq!(labels, array![1u8, 0u8]);
    }
}
