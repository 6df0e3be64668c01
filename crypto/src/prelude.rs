//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

pub use ndarray::Array1;
pub use ndarray::Array2;

pub use crate::blinding::BatchMask;
pub use crate::blinding::BlindingError;
pub use crate::blinding::PhiHistory;
pub use crate::blinding::RoundSecret;
pub use crate::random::BlindingSource;
pub use crate::random::GaussianSource;

pub type TVector = Array1<f64>;
pub type TMatrix = Array2<f64>;

/// Upper bound on redraws of a degenerate blinding factor
pub const MAX_RESAMPLE_ATTEMPTS: usize = 64;
