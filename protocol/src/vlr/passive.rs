//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

use crypto::blinding::RoundSecret;
use crypto::prelude::MAX_RESAMPLE_ATTEMPTS;
use crypto::random::BlindingSource;
use ndarray::Axis;
use rand::Rng;

use super::check_len;
use super::init_weights;
use super::select_rows;
use super::ProtocolError;
use crate::shared::{TFeatures, TVector};
use crate::vlr::traits::PassiveVlrProtocol;

#[derive(Debug, Clone)]
pub struct PassiveVlr {
    features: TFeatures,
    // carries the active party's latest phi, never the bare weights
    theta: TVector,
    secret: Option<RoundSecret>,
}

impl PassiveVlr {
    pub fn new<R: Rng + ?Sized>(features: TFeatures, rng: &mut R) -> PassiveVlr {
        let theta = init_weights(features.ncols(), rng);
        info!(
            "Passive model initialised: rows: {}, cols: {}",
            features.nrows(),
            features.ncols()
        );
        PassiveVlr {
            features,
            theta,
            secret: None,
        }
    }

    pub fn weights(&self) -> &TVector {
        &self.theta
    }

    pub fn num_features(&self) -> usize {
        self.features.ncols()
    }

    /// True between `masked_gradient` and `finalize_weights`
    pub fn in_round(&self) -> bool {
        self.secret.is_some()
    }

    fn secret(&self, step: &str) -> Result<&RoundSecret, ProtocolError> {
        self.secret.as_ref().ok_or_else(|| {
            ProtocolError::ErrorOutOfOrder(format!("{} before the masked gradient", step))
        })
    }
}

impl PassiveVlrProtocol for PassiveVlr {
    fn local_score(&self, batch: &[usize]) -> Result<TVector, ProtocolError> {
        if self.in_round() {
            return Err(ProtocolError::ErrorOutOfOrder(
                "new batch while a round is open".to_string(),
            ));
        }
        Ok(select_rows(&self.features, batch)?.dot(&self.theta))
    }

    fn masked_gradient<S: BlindingSource + ?Sized>(
        &mut self,
        batch: &[usize],
        masked_delta: &TVector,
        source: &mut S,
    ) -> Result<(TVector, TVector), ProtocolError> {
        if self.in_round() {
            return Err(ProtocolError::ErrorOutOfOrder(
                "masked delta while a round is open".to_string(),
            ));
        }
        check_len("masked delta", masked_delta, batch.len())?;
        let batch_x = select_rows(&self.features, batch)?;

        let secret = RoundSecret::sample(source, self.num_features(), MAX_RESAMPLE_ATTEMPTS)?;
        let masked_grad_s = secret.blind(&batch_x.t().dot(masked_delta));
        let mean = batch_x
            .mean_axis(Axis(0))
            .ok_or_else(|| ProtocolError::ErrorBatch("empty batch".to_string()))?;
        let masked_s = secret.blind(&mean);

        self.secret = Some(secret);
        Ok((masked_grad_s, masked_s))
    }

    fn blend_weights(&self, outgoing: &TVector) -> Result<TVector, ProtocolError> {
        let secret = self.secret("weight blend")?;
        check_len("masked step", outgoing, self.theta.len())?;
        Ok(secret.blind(&self.theta) - outgoing)
    }

    fn finalize_weights(&mut self, masked_theta: &TVector) -> Result<(), ProtocolError> {
        check_len("masked weights", masked_theta, self.theta.len())?;
        let theta = self.secret("weight update")?.unblind(masked_theta);
        self.theta = theta;
        self.secret = None;
        Ok(())
    }

    fn partial_scores(&self, features: &TFeatures) -> Result<TVector, ProtocolError> {
        if features.ncols() != self.theta.len() {
            return Err(ProtocolError::ErrorShape(format!(
                "prediction rows have {} columns, model has {}",
                features.ncols(),
                self.theta.len()
            )));
        }
        Ok(features.dot(&self.theta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto::random::GaussianSource;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample() -> PassiveVlr {
        let x = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        PassiveVlr::new(x, &mut StdRng::seed_from_u64(2))
    }

    #[test]
    fn steps_need_a_secret() {
        let mut p = sample();
        assert!(matches!(
            p.blend_weights(&array![0.0, 0.0]),
            Err(ProtocolError::ErrorOutOfOrder(_))
        ));
        assert!(matches!(
            p.finalize_weights(&array![0.0, 0.0]),
            Err(ProtocolError::ErrorOutOfOrder(_))
        ));
    }

    #[test]
    fn round_opens_and_closes() {
        let mut p = sample();
        let mut source = GaussianSource::seeded(3);
        p.masked_gradient(&[0, 2], &array![0.1, 0.2], &mut source)
            .unwrap();
        assert!(p.in_round());
        assert!(matches!(
            p.local_score(&[0]),
            Err(ProtocolError::ErrorOutOfOrder(_))
        ));

        // outgoing of zero: masked theta is K . theta, unblinds to theta
        let theta = p.weights().clone();
        let masked = p.blend_weights(&array![0.0, 0.0]).unwrap();
        p.finalize_weights(&masked).unwrap();
        assert!(!p.in_round());
        assert!((p.weights() - &theta).iter().all(|d| d.abs() < 1e-9));
    }

    #[test]
    fn masked_delta_must_match_batch() {
        let mut p = sample();
        let mut source = GaussianSource::seeded(4);
        let r = p.masked_gradient(&[0, 1], &array![1.0], &mut source);
        assert!(matches!(r, Err(ProtocolError::ErrorShape(_))));
        assert!(!p.in_round());
    }

    #[test]
    fn out_of_range_batch() {
        let p = sample();
        assert!(matches!(
            p.local_score(&[3]),
            Err(ProtocolError::ErrorBatch(_))
        ));
    }
}
