//! Parameter initialization for freshly built discriminators.

use candle_core::{Result, Tensor};
use candle_nn::VarMap;

use super::conv::l2_norm_per_channel;

/// `(direction, magnitude)` suffix pairs for both checkpoint namings.
const WEIGHT_NORM_SUFFIXES: [(&str, &str); 2] = [
    ("weight_v", "weight_g"),
    ("parametrizations.weight.original1", "parametrizations.weight.original0"),
];

const CONV_STD: f32 = 0.02;

/// Re-initialize every weight-normalized conv in `varmap`.
///
/// Each direction `v` is redrawn from `N(0, 0.02)` and its magnitude `g`
/// is set to `||v||`, so the effective kernel equals the draw. Biases are
/// left as built. Returns the number of convs touched.
pub fn weights_init(varmap: &VarMap) -> Result<usize> {
    let data = varmap
        .data()
        .lock()
        .map_err(|e| candle_core::Error::Msg(format!("weights_init: {e}")))?;
    let mut touched = 0;
    for (name, v) in data.iter() {
        let Some(g_name) = magnitude_name(name) else {
            continue;
        };
        let Some(g) = data.get(&g_name) else {
            candle_core::bail!("weights_init: {} has no matching {}", name, g_name);
        };
        let draw = Tensor::randn(0f32, CONV_STD, v.dims(), v.device())?.to_dtype(v.dtype())?;
        v.set(&draw)?;
        g.set(&l2_norm_per_channel(&draw)?)?;
        touched += 1;
    }
    tracing::debug!(convs = touched, "applied weights_init");
    Ok(touched)
}

/// Total number of trainable scalars held by `varmap`.
pub fn parameter_count(varmap: &VarMap) -> usize {
    varmap.all_vars().iter().map(|v| v.elem_count()).sum()
}

fn magnitude_name(name: &str) -> Option<String> {
    WEIGHT_NORM_SUFFIXES.iter().find_map(|(v_suffix, g_suffix)| {
        name.strip_suffix(v_suffix)
            .map(|prefix| format!("{prefix}{g_suffix}"))
    })
}
