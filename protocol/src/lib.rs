#![forbid(unsafe_code)]
#![crate_name = "protocol"]

#[macro_use]
extern crate log;

pub mod fileio;
pub mod vlr;

pub mod shared {
    use ndarray::Array1;
    use ndarray::Array2;

    /// Row major feature table, one row per record
    pub type TFeatures = Array2<f64>;

    /// Binary labels, active party only
    pub type TLabels = Array1<f64>;

    /// Scores, errors, gradients and weights
    pub type TVector = Array1<f64>;

    /// Row indices of every batch of an epoch
    pub type TBatches = Vec<Vec<usize>>;
}
