//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use common::metrics::Metrics;
use common::timer;
use crypto::random::GaussianSource;
use protocol::shared::TFeatures;
use protocol::vlr::passive::PassiveVlr;
use protocol::vlr::traits::PassiveVlrProtocol;
use protocol::vlr::TrainingParams;
use rand::rngs::StdRng;
use tokio::io::{AsyncRead, AsyncWrite};

use super::{training_rng, During, Phase, Role, StepError, TrainerRole, TrainingError};
use crate::connect::channel::Health;
use crate::connect::session::PassiveSession;
use crate::proto::Message;

/// Feature holder reacting to the active party one message at a time
pub struct PassiveRole<S> {
    session: PassiveSession<S>,
    model: PassiveVlr,
    params: TrainingParams,
    blinding: GaussianSource<StdRng>,
    metrics: Arc<Metrics>,
}

impl<S> PassiveRole<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Health + Send,
{
    pub fn new(
        session: PassiveSession<S>,
        features: TFeatures,
        params: TrainingParams,
        metrics: Arc<Metrics>,
    ) -> PassiveRole<S> {
        let model = PassiveVlr::new(features, &mut training_rng(params.seed));
        PassiveRole {
            session,
            model,
            params,
            blinding: GaussianSource::from_entropy(),
            metrics,
        }
    }

    pub fn model(&self) -> &PassiveVlr {
        &self.model
    }

    async fn train_batch(&mut self, batch: &[usize]) -> Result<(), StepError> {
        // 2. partial score
        let z_a = self.model.local_score(batch)?;
        self.session
            .send_to_active(&Message::PartialScore(z_a.to_vec()))
            .await?;

        // 6. gradient under a fresh K
        let masked_delta = self.session.receive_from_active().await?.into_masked_delta()?;
        let (gradient, mean) =
            self.model
                .masked_gradient(batch, &masked_delta, &mut self.blinding)?;
        self.session
            .send_to_active(&Message::MaskedGradient {
                gradient: gradient.to_vec(),
                mean: mean.to_vec(),
            })
            .await?;

        // 8. blend
        let outgoing = self.session.receive_from_active().await?.into_blinded_step()?;
        let masked_theta = self.model.blend_weights(&outgoing)?;
        self.session
            .send_to_active(&Message::MaskedWeights(masked_theta.to_vec()))
            .await?;

        // 10. new weights
        let reblinded = self.session.receive_from_active().await?.into_masked_weights()?;
        self.model.finalize_weights(&reblinded)?;
        Ok(())
    }
}

#[async_trait]
impl<S> TrainerRole for PassiveRole<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Health + Send,
{
    type Prediction = ();

    async fn fit(&mut self) -> Result<(), TrainingError> {
        let training = timer::Timer::new_silent("training");
        self.metrics.event("Start training.");
        for epoch in 0..self.params.epochs {
            let batches = self
                .session
                .receive_from_active()
                .await
                .and_then(Message::into_batches)
                .during(Role::Passive, Phase::BatchDissemination)?;
            debug!("epoch {}: {} batches", epoch, batches.len());

            for batch in batches.iter() {
                let t = timer::Timer::new_silent("batch");
                self.train_batch(batch)
                    .await
                    .during(Role::Passive, Phase::BatchRound)?;
                self.metrics.record_batch(t.elapsed());
            }
            self.metrics.record_epoch();
        }
        self.metrics.set_training_time(training.elapsed());
        Ok(())
    }

    /// Sends `X . theta_a` in the clear, the active party holds the labels
    async fn predict(&mut self, features: &TFeatures) -> Result<(), TrainingError> {
        let scores = self
            .model
            .partial_scores(features)
            .during(Role::Passive, Phase::Prediction)?;
        self.session
            .send_to_active(&Message::PartialScore(scores.to_vec()))
            .await
            .during(Role::Passive, Phase::Prediction)?;
        self.metrics
            .event(&format!("Sent partial scores of {} rows.", scores.len()));
        Ok(())
    }
}
