use serde::{Deserialize, Serialize};

use crate::error::{DiscriminatorError, Result};

// ---------------------------------------------------------------------------
// MSG
// ---------------------------------------------------------------------------

fn default_num_d() -> usize { 3 }
fn default_msg_ndf() -> usize { 80 }
fn default_msg_n_layers() -> usize { 4 }
fn default_hidden_dim() -> usize { 256 }
fn default_downsampling_factor() -> usize { 2 }

/// Single MSG discriminator: a stack of conditioned Dblocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MsgDiscriminatorConfig {
    /// Spectrogram channels entering the first Dblock (mel bins).
    #[serde(default = "default_msg_ndf")]
    pub nf: usize,
    #[serde(default = "default_msg_n_layers")]
    pub n_layers: usize,
    /// Channels of the conditioning stream.
    #[serde(default = "default_hidden_dim")]
    pub hidden_dim: usize,
}

impl Default for MsgDiscriminatorConfig {
    fn default() -> Self {
        serde_json::from_str("{}").unwrap()
    }
}

impl MsgDiscriminatorConfig {
    pub fn validate(&self) -> Result<()> {
        nonzero("nf", self.nf)?;
        nonzero("n_layers", self.n_layers)?;
        nonzero("hidden_dim", self.hidden_dim)?;
        self.final_channels().map(|_| ())
    }

    /// Spec channels after the last Dblock, `nf * 2^n_layers`.
    ///
    /// Fails when that width, or the weight count of a k=3 conv at that
    /// width, does not fit in `usize`.
    pub fn final_channels(&self) -> Result<usize> {
        (0..self.n_layers)
            .try_fold(self.nf, |c, _| c.checked_mul(2))
            .filter(|c| c.checked_mul(*c).and_then(|w| w.checked_mul(3)).is_some())
            .ok_or_else(|| {
                DiscriminatorError::Config(format!(
                    "nf = {} with n_layers = {} overflows the channel count",
                    self.nf, self.n_layers
                ))
            })
    }
}

/// Ensemble of MSG discriminators over average-pooled scales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiMsgDiscriminatorConfig {
    #[serde(default = "default_num_d")]
    pub num_d: usize,
    #[serde(default = "default_msg_ndf")]
    pub ndf: usize,
    #[serde(default = "default_msg_n_layers")]
    pub n_layers: usize,
    /// Average-pool kernel between scales. Stride is always 2.
    #[serde(default = "default_downsampling_factor")]
    pub downsampling_factor: usize,
    #[serde(default = "default_hidden_dim")]
    pub hidden_dim: usize,
}

impl Default for MultiMsgDiscriminatorConfig {
    fn default() -> Self {
        serde_json::from_str("{}").unwrap()
    }
}

impl MultiMsgDiscriminatorConfig {
    pub fn validate(&self) -> Result<()> {
        nonzero("num_d", self.num_d)?;
        validate_downsampling(self.downsampling_factor)?;
        self.discriminator().validate()
    }

    /// Config shared by every member of the ensemble.
    pub fn discriminator(&self) -> MsgDiscriminatorConfig {
        MsgDiscriminatorConfig {
            nf: self.ndf,
            n_layers: self.n_layers,
            hidden_dim: self.hidden_dim,
        }
    }
}

// ---------------------------------------------------------------------------
// MelGAN
// ---------------------------------------------------------------------------

fn default_input_dim() -> usize { 80 }
fn default_melgan_ndf() -> usize { 16 }
fn default_melgan_n_layers() -> usize { 3 }
fn default_disc_out() -> usize { 512 }

/// Single MelGAN discriminator: strided convs with a channel cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MelGanDiscriminatorConfig {
    #[serde(default = "default_input_dim")]
    pub input_dim: usize,
    #[serde(default = "default_melgan_ndf")]
    pub ndf: usize,
    /// Number of stride-2 layers.
    #[serde(default = "default_melgan_n_layers")]
    pub n_layers: usize,
    /// Channel cap, also the width of the penultimate layer.
    #[serde(default = "default_disc_out")]
    pub disc_out: usize,
}

impl Default for MelGanDiscriminatorConfig {
    fn default() -> Self {
        serde_json::from_str("{}").unwrap()
    }
}

impl MelGanDiscriminatorConfig {
    pub fn validate(&self) -> Result<()> {
        nonzero("input_dim", self.input_dim)?;
        nonzero("ndf", self.ndf)?;
        nonzero("disc_out", self.disc_out)
    }

    /// `(in, out)` channels of each stride-2 layer.
    pub fn strided_channels(&self) -> Vec<(usize, usize)> {
        let mut nf = self.ndf;
        (0..self.n_layers)
            .map(|_| {
                let prev = nf;
                nf = nf.saturating_mul(2).min(self.disc_out);
                (prev, nf)
            })
            .collect()
    }
}

/// Ensemble of MelGAN discriminators over average-pooled scales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiScaleDiscriminatorConfig {
    #[serde(default = "default_num_d")]
    pub num_d: usize,
    #[serde(default = "default_input_dim")]
    pub input_dim: usize,
    #[serde(default = "default_melgan_ndf")]
    pub ndf: usize,
    #[serde(default = "default_melgan_n_layers")]
    pub n_layers: usize,
    #[serde(default = "default_disc_out")]
    pub disc_out: usize,
    #[serde(default = "default_downsampling_factor")]
    pub downsampling_factor: usize,
}

impl Default for MultiScaleDiscriminatorConfig {
    fn default() -> Self {
        serde_json::from_str("{}").unwrap()
    }
}

impl MultiScaleDiscriminatorConfig {
    pub fn validate(&self) -> Result<()> {
        nonzero("num_d", self.num_d)?;
        validate_downsampling(self.downsampling_factor)?;
        self.discriminator().validate()
    }

    pub fn discriminator(&self) -> MelGanDiscriminatorConfig {
        MelGanDiscriminatorConfig {
            input_dim: self.input_dim,
            ndf: self.ndf,
            n_layers: self.n_layers,
            disc_out: self.disc_out,
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level
// ---------------------------------------------------------------------------

/// Discriminator section of a training config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscriminatorsConfig {
    #[serde(default)]
    pub msg: Option<MultiMsgDiscriminatorConfig>,
    #[serde(default)]
    pub melgan: Option<MultiScaleDiscriminatorConfig>,
}

impl DiscriminatorsConfig {
    /// Parse and validate every present section.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        if let Some(msg) = &cfg.msg {
            msg.validate()?;
        }
        if let Some(melgan) = &cfg.melgan {
            melgan.validate()?;
        }
        Ok(cfg)
    }
}

fn nonzero(name: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(DiscriminatorError::Config(format!("{name} must be > 0")));
    }
    Ok(())
}

// AvgPool1d with padding 1 needs kernel >= 2.
fn validate_downsampling(kernel: usize) -> Result<()> {
    if kernel < 2 {
        return Err(DiscriminatorError::Config(format!(
            "downsampling_factor must be >= 2, got {kernel}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msg_config_defaults() {
        let cfg = MsgDiscriminatorConfig::default();
        assert_eq!(cfg.nf, 80);
        assert_eq!(cfg.n_layers, 4);
        assert_eq!(cfg.hidden_dim, 256);
        assert_eq!(cfg.final_channels().unwrap(), 1280);
    }

    #[test]
    fn test_multi_msg_config_defaults() {
        let cfg = MultiMsgDiscriminatorConfig::default();
        assert_eq!(cfg.num_d, 3);
        assert_eq!(cfg.ndf, 80);
        assert_eq!(cfg.n_layers, 4);
        assert_eq!(cfg.downsampling_factor, 2);
        assert_eq!(cfg.hidden_dim, 256);
        assert_eq!(cfg.discriminator(), MsgDiscriminatorConfig::default());
    }

    #[test]
    fn test_melgan_config_defaults() {
        let cfg = MelGanDiscriminatorConfig::default();
        assert_eq!(cfg.input_dim, 80);
        assert_eq!(cfg.ndf, 16);
        assert_eq!(cfg.n_layers, 3);
        assert_eq!(cfg.disc_out, 512);
    }

    #[test]
    fn test_strided_channels_double_until_cap() {
        let cfg = MelGanDiscriminatorConfig {
            ndf: 16,
            n_layers: 4,
            disc_out: 64,
            ..Default::default()
        };
        assert_eq!(
            cfg.strided_channels(),
            vec![(16, 32), (32, 64), (64, 64), (64, 64)]
        );
    }

    #[test]
    fn test_config_deserialize_override() {
        let json = r#"{"ndf": 32, "num_d": 2}"#;
        let cfg: MultiScaleDiscriminatorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.ndf, 32);
        assert_eq!(cfg.num_d, 2);
        // rest should be defaults
        assert_eq!(cfg.input_dim, 80);
        assert_eq!(cfg.disc_out, 512);
    }

    #[test]
    fn test_validate_rejects_zero_layers() {
        let cfg = MsgDiscriminatorConfig {
            n_layers: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(DiscriminatorError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_small_pool_kernel() {
        let cfg = MultiMsgDiscriminatorConfig {
            downsampling_factor: 1,
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("downsampling_factor"), "{err}");
    }

    #[test]
    fn test_top_level_from_json() {
        let json = r#"{
            "msg": {"num_d": 2, "hidden_dim": 128},
            "melgan": {}
        }"#;
        let cfg = DiscriminatorsConfig::from_json(json).unwrap();
        let msg = cfg.msg.unwrap();
        assert_eq!(msg.num_d, 2);
        assert_eq!(msg.hidden_dim, 128);
        assert_eq!(msg.ndf, 80); // default
        assert_eq!(cfg.melgan, Some(MultiScaleDiscriminatorConfig::default()));
    }

    #[test]
    fn test_top_level_from_json_validates_sections() {
        let json = r#"{"melgan": {"num_d": 0}}"#;
        assert!(matches!(
            DiscriminatorsConfig::from_json(json),
            Err(DiscriminatorError::Config(_))
        ));
    }

    #[test]
    fn test_top_level_from_json_reports_bad_json() {
        assert!(matches!(
            DiscriminatorsConfig::from_json("{"),
            Err(DiscriminatorError::Serialization(_))
        ));
    }

    #[test]
    fn test_validate_rejects_overflowing_layer_count() {
        let cfg = MsgDiscriminatorConfig {
            n_layers: 64,
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, DiscriminatorError::Config(_)));
        assert!(err.to_string().contains("n_layers = 64"), "{err}");

        let multi = MultiMsgDiscriminatorConfig {
            n_layers: 64,
            ..Default::default()
        };
        assert!(matches!(multi.validate(), Err(DiscriminatorError::Config(_))));
        let json = r#"{"msg": {"n_layers": 64}}"#;
        assert!(matches!(
            DiscriminatorsConfig::from_json(json),
            Err(DiscriminatorError::Config(_))
        ));
    }

    #[test]
    fn test_strided_channels_saturate_at_cap() {
        let cfg = MelGanDiscriminatorConfig {
            ndf: usize::MAX / 2 + 1,
            n_layers: 2,
            disc_out: usize::MAX,
            ..Default::default()
        };
        let channels = cfg.strided_channels();
        assert_eq!(channels[0].1, usize::MAX);
        assert_eq!(channels[1], (usize::MAX, usize::MAX));
    }
}
