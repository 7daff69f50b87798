//! Layer primitives shared by the discriminators.
//!
//! - `conv`: weight-normalized Conv1d
//! - `pool`: AvgPool1d without padding in the divisor
//! - `init`: `weights_init` and parameter counting

pub mod conv;
pub mod init;
pub mod pool;

pub use conv::WeightNormConv1d;
pub use init::{parameter_count, weights_init};
pub use pool::AvgPool1d;

/// Negative slope of every LeakyReLU in the discriminators.
pub const LEAKY_RELU_SLOPE: f64 = 0.2;
