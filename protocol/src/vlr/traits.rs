//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

use crypto::blinding::BatchMask;
use crypto::random::BlindingSource;
use ndarray::Array1;
use rand::Rng;

use crate::shared::{TBatches, TFeatures, TVector};
use crate::vlr::ProtocolError;

/// Steps of one round, active side
///
/// Order per batch: `local_score`, `batch_error`, `BatchMask::apply`
/// (sent to every party), `update_local`, then per party
/// `unmask_gradient`, `remask_gradient`, `reblind_weights`, and finally
/// `commit_phis` once every party is done.
pub trait ActiveVlrProtocol {
    fn gen_batches<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> TBatches;

    /// `X_b[batch] . theta_b`
    fn local_score(&self, batch: &[usize]) -> Result<TVector, ProtocolError>;

    /// `sigmoid(z_b + sum_k z_a_k / phi_k) - y`
    fn batch_error(
        &self,
        batch: &[usize],
        passive_scores: &[TVector],
    ) -> Result<TVector, ProtocolError>;

    /// Plain gradient step on `theta_b` with the true error
    fn update_local(&mut self, batch: &[usize], delta: &TVector) -> Result<(), ProtocolError>;

    /// `(masked_grad_S_a - tor * masked_S) / sigma`
    fn unmask_gradient(
        &self,
        masked_grad_s: &TVector,
        masked_s: &TVector,
        mask: &BatchMask,
    ) -> Result<TVector, ProtocolError>;

    /// `learning_rate * phi_prev * masked_grad + mu`
    fn remask_gradient(
        &self,
        masked_grad: &TVector,
        phi_prev: f64,
        mu: &TVector,
    ) -> Result<TVector, ProtocolError>;

    /// `(masked_theta + mu) / phi_prev * phi_new`
    fn reblind_weights(
        &self,
        masked_theta: &TVector,
        mu: &TVector,
        phi_prev: f64,
        phi_new: f64,
    ) -> Result<TVector, ProtocolError>;

    fn commit_phis(&mut self, fresh: &[f64]) -> Result<(), ProtocolError>;

    /// Labels in `{0, 1}` from the active rows and the passive partial scores
    fn predict_labels(
        &self,
        features: &TFeatures,
        passive_scores: &[TVector],
    ) -> Result<Array1<u8>, ProtocolError>;
}

/// Steps of one round, passive side
///
/// Order per batch: `local_score`, `masked_gradient`, `blend_weights`,
/// `finalize_weights`. The secret `K` lives from `masked_gradient` until
/// `finalize_weights`.
pub trait PassiveVlrProtocol {
    /// `X_a[batch] . theta_a`
    fn local_score(&self, batch: &[usize]) -> Result<TVector, ProtocolError>;

    /// Draws a fresh `K`, returns `(K . X_a[batch]^T . masked_delta, K . S)`
    fn masked_gradient<S: BlindingSource + ?Sized>(
        &mut self,
        batch: &[usize],
        masked_delta: &TVector,
        source: &mut S,
    ) -> Result<(TVector, TVector), ProtocolError>;

    /// `K . theta_a - outgoing`
    fn blend_weights(&self, outgoing: &TVector) -> Result<TVector, ProtocolError>;

    /// `theta_a = K^-1 . masked_theta`, retires `K`
    fn finalize_weights(&mut self, masked_theta: &TVector) -> Result<(), ProtocolError>;

    /// `X . theta_a` for inference, sent without blinding
    fn partial_scores(&self, features: &TFeatures) -> Result<TVector, ProtocolError>;
}
