//! Error types for the discriminator crate.

use thiserror::Error;

/// Result type for discriminator operations.
pub type Result<T> = std::result::Result<T, DiscriminatorError>;

/// Error type for discriminator operations.
#[derive(Error, Debug)]
pub enum DiscriminatorError {
    /// Tensor operation error.
    #[error("candle error: {0}")]
    Candle(#[from] candle_core::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Input shape does not match what the network was built for.
    #[error("shape mismatch: expected {expected}, got {actual:?}")]
    ShapeMismatch {
        /// Human-readable description of the expected shape.
        expected: String,
        /// Actual shape.
        actual: Vec<usize>,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for DiscriminatorError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Check that `xs` is `(batch, channels, time)` with the given channel count.
pub(crate) fn check_ncl(xs: &candle_core::Tensor, channels: usize, what: &str) -> Result<()> {
    let dims = xs.dims();
    if dims.len() != 3 || dims[1] != channels {
        return Err(DiscriminatorError::ShapeMismatch {
            expected: format!("{what} of shape (batch, {channels}, time)"),
            actual: dims.to_vec(),
        });
    }
    Ok(())
}

/// Check that `cond` is non-empty and aligned with `spec` in batch and time.
pub(crate) fn check_aligned(
    spec: &candle_core::Tensor,
    cond: &candle_core::Tensor,
) -> Result<()> {
    let (s, c) = (spec.dims(), cond.dims());
    let aligned = s.len() == 3 && c.len() == 3 && s[0] == c[0] && s[2] == c[2];
    if !aligned || c[2] == 0 {
        return Err(DiscriminatorError::ShapeMismatch {
            expected: format!("non-empty condition with the spectrogram's batch and time {s:?}"),
            actual: c.to_vec(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device, Tensor};

    #[test]
    fn test_check_ncl_accepts_matching_channels() -> Result<()> {
        let x = Tensor::zeros((2, 80, 10), DType::F32, &Device::Cpu)?;
        check_ncl(&x, 80, "spec")
    }

    #[test]
    fn test_check_ncl_rejects_wrong_rank() -> Result<()> {
        let x = Tensor::zeros((80, 10), DType::F32, &Device::Cpu)?;
        let err = check_ncl(&x, 80, "spec").unwrap_err();
        match err {
            DiscriminatorError::ShapeMismatch { actual, .. } => assert_eq!(actual, vec![80, 10]),
            other => panic!("unexpected error: {other}"),
        }
        Ok(())
    }

    #[test]
    fn test_check_ncl_rejects_wrong_channels() -> Result<()> {
        let x = Tensor::zeros((1, 64, 10), DType::F32, &Device::Cpu)?;
        let err = check_ncl(&x, 80, "spec").unwrap_err();
        assert!(err.to_string().contains("(batch, 80, time)"), "{err}");
        Ok(())
    }

    #[test]
    fn test_check_aligned() -> Result<()> {
        let spec = Tensor::zeros((2, 8, 10), DType::F32, &Device::Cpu)?;
        check_aligned(&spec, &Tensor::zeros((2, 4, 10), DType::F32, &Device::Cpu)?)?;

        for shape in [(2, 4, 9), (1, 4, 10)] {
            let cond = Tensor::zeros(shape, DType::F32, &Device::Cpu)?;
            match check_aligned(&spec, &cond) {
                Err(DiscriminatorError::ShapeMismatch { actual, .. }) => {
                    assert_eq!(actual, cond.dims().to_vec())
                }
                other => panic!("unexpected result: {other:?}"),
            }
        }

        let empty = Tensor::zeros((2, 8, 0), DType::F32, &Device::Cpu)?;
        let cond = Tensor::zeros((2, 4, 0), DType::F32, &Device::Cpu)?;
        assert!(check_aligned(&empty, &cond).is_err());
        Ok(())
    }

    #[test]
    fn test_serde_error_maps_to_serialization() {
        let err: DiscriminatorError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, DiscriminatorError::Serialization(_)));
    }
}
