//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

//! Messages exchanged between the active party and the passive parties

use bytes::Bytes;
use ndarray::Array1;
use protocol::shared::{TBatches, TVector};
use serde::{Deserialize, Serialize};

use crate::connect::channel::ChannelError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    /// Shuffled row indices of every batch of one epoch
    Batches(TBatches),
    /// `X_a[batch] . theta_a` during training, `X . theta_a` at inference
    PartialScore(Vec<f64>),
    /// `sigma * delta + tor`, the same payload for every party
    MaskedDelta(Vec<f64>),
    /// `K . X_a[batch]^T . masked_delta` and `K . S`
    MaskedGradient { gradient: Vec<f64>, mean: Vec<f64> },
    /// `learning_rate * phi_prev * masked_grad + mu`
    BlindedStep(Vec<f64>),
    /// `K . theta_a - outgoing` towards the active party, re-blinded weights
    /// on the way back
    MaskedWeights(Vec<f64>),
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Batches(_) => "batches",
            Message::PartialScore(_) => "partial score",
            Message::MaskedDelta(_) => "masked delta",
            Message::MaskedGradient { .. } => "masked gradient",
            Message::BlindedStep(_) => "blinded step",
            Message::MaskedWeights(_) => "masked weights",
        }
    }

    pub fn encode(&self) -> Result<Bytes, ChannelError> {
        Ok(Bytes::from(bincode::serialize(self)?))
    }

    pub fn decode(payload: &[u8]) -> Result<Message, ChannelError> {
        Ok(bincode::deserialize(payload)?)
    }

    fn unexpected<T>(self, expected: &'static str) -> Result<T, ChannelError> {
        error!("expected a {} message, got {}", expected, self.kind());
        Err(ChannelError::UnexpectedMessage {
            expected,
            got: self.kind(),
        })
    }

    pub fn into_batches(self) -> Result<TBatches, ChannelError> {
        match self {
            Message::Batches(b) => Ok(b),
            other => other.unexpected("batches"),
        }
    }

    pub fn into_partial_score(self) -> Result<TVector, ChannelError> {
        match self {
            Message::PartialScore(v) => Ok(Array1::from(v)),
            other => other.unexpected("partial score"),
        }
    }

    pub fn into_masked_delta(self) -> Result<TVector, ChannelError> {
        match self {
            Message::MaskedDelta(v) => Ok(Array1::from(v)),
            other => other.unexpected("masked delta"),
        }
    }

    pub fn into_masked_gradient(self) -> Result<(TVector, TVector), ChannelError> {
        match self {
            Message::MaskedGradient { gradient, mean } => {
                Ok((Array1::from(gradient), Array1::from(mean)))
            }
            other => other.unexpected("masked gradient"),
        }
    }

    pub fn into_blinded_step(self) -> Result<TVector, ChannelError> {
        match self {
            Message::BlindedStep(v) => Ok(Array1::from(v)),
            other => other.unexpected("blinded step"),
        }
    }

    pub fn into_masked_weights(self) -> Result<TVector, ChannelError> {
        match self {
            Message::MaskedWeights(v) => Ok(Array1::from(v)),
            other => other.unexpected("masked weights"),
        }
    }

    /// Every float vector the message carries, batches carry none
    pub fn vectors(&self) -> Vec<&[f64]> {
        match self {
            Message::Batches(_) => vec![],
            Message::PartialScore(v)
            | Message::MaskedDelta(v)
            | Message::BlindedStep(v)
            | Message::MaskedWeights(v) => vec![v.as_slice()],
            Message::MaskedGradient { gradient, mean } => {
                vec![gradient.as_slice(), mean.as_slice()]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_pair_survives_the_wire() {
        let m = Message::MaskedGradient {
            gradient: vec![0.25, -1.5e-300, f64::MAX],
            mean: vec![],
        };
        let back = Message::decode(&m.encode().unwrap()).unwrap();
        assert_eq!(back, m);
        let (g, s) = back.into_masked_gradient().unwrap();
        assert_eq!(g.len(), 3);
        assert!(s.is_empty());
    }

    #[test]
    fn wrong_variant_is_reported() {
        let r = Message::BlindedStep(vec![1.0]).into_masked_weights();
        match r {
            Err(ChannelError::UnexpectedMessage { expected, got }) => {
                assert_eq!(expected, "masked weights");
                assert_eq!(got, "blinded step");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn garbage_payload() {
        assert!(matches!(
            Message::decode(&[0xff, 0xff, 0xff, 0xff, 0x01]),
            Err(ChannelError::Serialization(_))
        ));
    }
}
