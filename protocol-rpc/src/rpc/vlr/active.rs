//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use common::metrics::Metrics;
use common::timer;
use crypto::blinding::{sample_nonzero, BatchMask};
use crypto::prelude::MAX_RESAMPLE_ATTEMPTS;
use crypto::random::{BlindingSource, GaussianSource};
use futures::future::try_join_all;
use ndarray::Array1;
use protocol::fileio::LabeledData;
use protocol::shared::{TFeatures, TVector};
use protocol::vlr::active::ActiveVlr;
use protocol::vlr::traits::ActiveVlrProtocol;
use protocol::vlr::TrainingParams;
use rand::rngs::StdRng;
use tokio::io::{AsyncRead, AsyncWrite};

use super::{training_rng, During, Phase, Role, StepError, TrainerRole, TrainingError};
use crate::connect::channel::{Channel, Health};
use crate::connect::session::{ActiveSession, PeerTarget};
use crate::proto::Message;

/// Label holder driving every round
pub struct ActiveRole<S> {
    session: ActiveSession<S>,
    model: ActiveVlr,
    params: TrainingParams,
    rng: StdRng,
    blinding: GaussianSource<StdRng>,
    metrics: Arc<Metrics>,
}

/// Steps 6 to 10 of one round with one passive party
///
/// Only reads the shared model; the fresh `phi` is handed back to the
/// caller, which commits it once every party is done.
async fn party_round<S>(
    party: usize,
    channel: &mut Channel<S>,
    model: &ActiveVlr,
    mask: BatchMask,
    phi_prev: f64,
    mut source: GaussianSource<StdRng>,
) -> Result<f64, StepError>
where
    S: AsyncRead + AsyncWrite + Unpin + Health + Send,
{
    let (masked_grad_s, masked_s) = channel.receive().await?.into_masked_gradient()?;
    let masked_grad = model.unmask_gradient(&masked_grad_s, &masked_s, &mask)?;

    let mu = source.vector(masked_grad.len());
    let outgoing = model.remask_gradient(&masked_grad, phi_prev, &mu)?;
    channel.send(&Message::BlindedStep(outgoing.to_vec())).await?;

    let masked_theta = channel.receive().await?.into_masked_weights()?;
    let phi_new = sample_nonzero(&mut source, MAX_RESAMPLE_ATTEMPTS)?;
    let reblinded = model.reblind_weights(&masked_theta, &mu, phi_prev, phi_new)?;
    channel.send(&Message::MaskedWeights(reblinded.to_vec())).await?;
    trace!("party {} round done", party);
    Ok(phi_new)
}

impl<S> ActiveRole<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Health + Send,
{
    pub fn new(
        session: ActiveSession<S>,
        data: LabeledData,
        params: TrainingParams,
        metrics: Arc<Metrics>,
    ) -> Result<ActiveRole<S>, TrainingError> {
        let mut rng = training_rng(params.seed);
        let model = ActiveVlr::new(
            data.features,
            data.labels,
            params.learning_rate,
            session.party_count(),
            &mut rng,
        )
        .during(Role::Active, Phase::Setup)?;
        Ok(ActiveRole {
            session,
            model,
            params,
            rng,
            blinding: GaussianSource::from_entropy(),
            metrics,
        })
    }

    pub fn model(&self) -> &ActiveVlr {
        &self.model
    }

    async fn train_batch(&mut self, batch: &[usize]) -> Result<(), StepError> {
        // 2. partial scores of every party
        let passive_scores = self
            .session
            .receive_from_peer(PeerTarget::All)
            .await?
            .into_vec()
            .into_iter()
            .map(Message::into_partial_score)
            .collect::<Result<Vec<TVector>, _>>()?;

        // 3. error of the joint prediction
        let delta = self.model.batch_error(batch, &passive_scores)?;

        // 4. one mask for every party of this batch
        let mask = BatchMask::sample(&mut self.blinding);
        let masked_delta = Message::MaskedDelta(mask.apply(&delta).to_vec());
        self.session
            .send_to_peer(PeerTarget::All, &masked_delta)
            .await?;

        // 5. own weights with the true error
        self.model.update_local(batch, &delta)?;

        // 6 - 10. one concurrent round per party
        let phi_prev = self.model.phi_history().previous_all();
        let sources = (0..phi_prev.len())
            .map(|_| self.blinding.fork())
            .collect::<Vec<_>>();
        let model = &self.model;
        let rounds = self
            .session
            .peers_mut()
            .iter_mut()
            .zip(phi_prev.into_iter().zip(sources))
            .enumerate()
            .map(|(party, (channel, (phi, source)))| {
                party_round(party, channel, model, mask, phi, source)
            });
        let fresh = try_join_all(rounds).await?;

        self.model.commit_phis(&fresh)?;
        Ok(())
    }
}

#[async_trait]
impl<S> TrainerRole for ActiveRole<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Health + Send,
{
    type Prediction = Array1<u8>;

    async fn fit(&mut self) -> Result<(), TrainingError> {
        let training = timer::Timer::new_silent("training");
        self.metrics.event("Start training.");
        for epoch in 0..self.params.epochs {
            // 1. shuffle and share the batches of this epoch
            let batches = self.model.gen_batches(self.params.batch_size, &mut self.rng);
            self.session
                .send_to_peer(PeerTarget::All, &Message::Batches(batches.clone()))
                .await
                .during(Role::Active, Phase::BatchDissemination)?;

            for batch in batches.iter() {
                let t = timer::Timer::new_silent("batch");
                self.train_batch(batch)
                    .await
                    .during(Role::Active, Phase::BatchRound)?;
                self.metrics.record_batch(t.elapsed());
            }
            self.metrics.record_epoch();
            self.metrics.event(&format!(
                "Epoch {} of {} done, {} batches.",
                epoch + 1,
                self.params.epochs,
                batches.len()
            ));
        }
        self.metrics.set_training_time(training.elapsed());
        Ok(())
    }

    /// Partial scores arrive unblinded at inference, no round is run
    async fn predict(&mut self, features: &TFeatures) -> Result<Array1<u8>, TrainingError> {
        let passive_scores = self
            .session
            .receive_from_peer(PeerTarget::All)
            .await
            .during(Role::Active, Phase::Prediction)?
            .into_vec()
            .into_iter()
            .map(Message::into_partial_score)
            .collect::<Result<Vec<TVector>, _>>()
            .during(Role::Active, Phase::Prediction)?;
        let labels = self
            .model
            .predict_labels(features, &passive_scores)
            .during(Role::Active, Phase::Prediction)?;
        self.metrics
            .event(&format!("Predicted {} rows.", labels.len()));
        Ok(labels)
    }
}
