//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

//! Role drivers running the masked training exchange over a session

use std::fmt;

use async_trait::async_trait;
use crypto::blinding::BlindingError;
use protocol::shared::TFeatures;
use protocol::vlr::ProtocolError;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::connect::channel::ChannelError;
use crate::settings::ConfigError;

pub mod active;
pub mod passive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Active,
    Passive,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Active => write!(f, "active"),
            Role::Passive => write!(f, "passive"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    BatchDissemination,
    BatchRound,
    Prediction,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Setup => write!(f, "setup"),
            Phase::BatchDissemination => write!(f, "batch dissemination"),
            Phase::BatchRound => write!(f, "batch round"),
            Phase::Prediction => write!(f, "prediction"),
        }
    }
}

/// Failure of a single step, before it is tagged with role and phase
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl From<BlindingError> for StepError {
    fn from(e: BlindingError) -> Self {
        StepError::Protocol(ProtocolError::from(e))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("{role} party failed during {phase}: {source}")]
    Round {
        role: Role,
        phase: Phase,
        #[source]
        source: StepError,
    },
}

/// Tags a step failure with the role and phase it happened in
pub trait During<T> {
    fn during(self, role: Role, phase: Phase) -> Result<T, TrainingError>;
}

impl<T, E: Into<StepError>> During<T> for Result<T, E> {
    fn during(self, role: Role, phase: Phase) -> Result<T, TrainingError> {
        self.map_err(|e| {
            let source = e.into();
            error!("{} party failed during {}: {}", role, phase, source);
            TrainingError::Round {
                role,
                phase,
                source,
            }
        })
    }
}

/// Shuffling and weight initialisation share this generator
pub(crate) fn training_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// One side of the training run
///
/// `fit` and `predict` must be driven on every party at the same time:
/// each side blocks on the messages of the other.
#[async_trait]
pub trait TrainerRole {
    type Prediction;

    async fn fit(&mut self) -> Result<(), TrainingError>;

    async fn predict(&mut self, features: &TFeatures) -> Result<Self::Prediction, TrainingError>;
}
