//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

use ndarray::Array1;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use rand_distr::StandardNormal;

/// Source of the random values every blinding factor is drawn from
///
/// Production code samples a standard normal; tests swap in scripted
/// sources to pin the algebra or to provoke degenerate draws.
pub trait BlindingSource {
    fn scalar(&mut self) -> f64;

    fn vector(&mut self, len: usize) -> Array1<f64> {
        Array1::from_shape_fn(len, |_| self.scalar())
    }

    fn matrix(&mut self, dim: usize) -> Array2<f64> {
        Array2::from_shape_fn((dim, dim), |_| self.scalar())
    }
}

/// Standard normal draws from any `Rng`
#[derive(Debug, Clone)]
pub struct GaussianSource<R> {
    rng: R,
}

impl<R: Rng> GaussianSource<R> {
    pub fn new(rng: R) -> GaussianSource<R> {
        GaussianSource { rng }
    }

    /// Splits off an independent source, used to give every concurrent
    /// party round its own stream of factors
    pub fn fork(&mut self) -> GaussianSource<StdRng> {
        GaussianSource::new(StdRng::from_seed(self.rng.gen()))
    }
}

impl GaussianSource<StdRng> {
    pub fn from_entropy() -> GaussianSource<StdRng> {
        GaussianSource::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> GaussianSource<StdRng> {
        GaussianSource::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> BlindingSource for GaussianSource<R> {
    fn scalar(&mut self) -> f64 {
        self.rng.sample(StandardNormal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_sources_agree() {
        let mut a = GaussianSource::seeded(5);
        let mut b = GaussianSource::seeded(5);
        assert_eq!(a.vector(8), b.vector(8));
        assert_eq!(a.matrix(3), b.matrix(3));
    }

    #[test]
    fn forks_are_independent() {
        let mut parent = GaussianSource::seeded(9);
        let mut x = parent.fork();
        let mut y = parent.fork();
        assert_ne!(x.vector(4), y.vector(4));
    }

    #[test]
    fn shapes() {
        let mut s = GaussianSource::from_entropy();
        assert_eq!(s.vector(5).len(), 5);
        assert_eq!(s.matrix(4).shape(), &[4, 4]);
    }
}
