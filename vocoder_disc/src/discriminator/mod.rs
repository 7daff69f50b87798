//! Discriminators for adversarial vocoder training.
//!
//! - `MsgDiscriminator`: spectrogram + condition streams through Dblocks
//! - `MelGanDiscriminator`: strided convs over the spectrogram alone
//! - `MultiMsgDiscriminator` / `MultiScaleDiscriminator`: the above run at
//!   successively average-pooled resolutions
//!
//! Scores are raw (no sigmoid); they are meant for a least-squares GAN loss.

mod dblock;
mod melgan;
mod msg;
mod multi;

pub use dblock::{Dblock, LeakyConv};
pub use melgan::MelGanDiscriminator;
pub use msg::MsgDiscriminator;
pub use multi::{features, scores, Downsample, MultiMsgDiscriminator, MultiScaleDiscriminator};

use candle_core::Tensor;

/// Output from a single discriminator.
#[derive(Debug, Clone)]
pub struct DiscriminatorOutput {
    /// Intermediate feature maps, for feature-matching losses.
    pub features: Vec<Tensor>,
    /// Final real/fake score.
    pub score: Tensor,
}
