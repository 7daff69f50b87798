//! Discriminators for adversarial training of a mel-spectrogram vocoder.
//!
//! Built on candle. Every convolution is weight-normalized and all tensors
//! are `(batch, channels, time)`.
//!
//! # Architecture
//!
//! - `MsgDiscriminator`: stacked Dblocks mixing a spectrogram stream with a
//!   conditioning stream, scored per frame
//! - `MelGanDiscriminator`: strided convs over the spectrogram alone
//! - `MultiMsgDiscriminator` / `MultiScaleDiscriminator`: one member per
//!   average-pooled resolution
//!
//! # Example
//!
//! ```ignore
//! use candle_core::{Device, Tensor};
//! use candle_nn::VarMap;
//! use vocoder_disc::{MultiMsgDiscriminator, MultiMsgDiscriminatorConfig};
//!
//! let device = Device::Cpu;
//! let varmap = VarMap::new();
//! let config = MultiMsgDiscriminatorConfig::default();
//! let disc = MultiMsgDiscriminator::fresh(&config, &varmap, &device)?;
//!
//! let mel = Tensor::randn(0f32, 1.0, (4, 80, 300), &device)?;
//! let cond = Tensor::ones((4, 256, 300), candle_core::DType::F32, &device)?;
//! for scale in disc.forward(&mel, &cond)? {
//!     // scale.score: (4, frames), scale.features: one map per Dblock
//! }
//! ```

pub mod config;
pub mod discriminator;
pub mod error;
pub mod nn;

pub use config::*;
pub use discriminator::{
    DiscriminatorOutput, MelGanDiscriminator, MsgDiscriminator, MultiMsgDiscriminator,
    MultiScaleDiscriminator,
};
pub use error::{DiscriminatorError, Result};
