//! Entrypoints available to the `sweepgen` binary by name.

use sg_sweeper::{cartesian_product, merge_overrides, EntrypointRegistry};
use sg_types::OverrideSet;

const HIDDEN_SIZES: [u32; 2] = [32, 64];
const MAX_LAYERS: usize = 3;
const DROPOUT_RATES: [f64; 2] = [0.1, 0.5];

/// Network depths 1..=3 with every per-layer hidden size combination.
pub fn multilayer() -> anyhow::Result<Vec<OverrideSet>> {
    let mut sweep = Vec::new();
    for num_layers in 1..=MAX_LAYERS {
        let widths = vec![HIDDEN_SIZES.to_vec(); num_layers];
        for num_hidden in cartesian_product(&widths) {
            let hidden: Vec<String> = num_hidden.iter().map(ToString::to_string).collect();
            sweep.push(OverrideSet::from_pairs([
                ("num_layers", num_layers.to_string()),
                ("num_hidden", format!("[{}]", hidden.join(","))),
            ])?);
        }
    }
    Ok(sweep)
}

pub fn dropout() -> anyhow::Result<Vec<OverrideSet>> {
    let mut sweep = Vec::with_capacity(DROPOUT_RATES.len());
    for rate in DROPOUT_RATES {
        sweep.push(OverrideSet::from_pairs([("+dropout", rate)])?);
    }
    Ok(sweep)
}

pub fn builtin_registry() -> EntrypointRegistry {
    let mut registry = EntrypointRegistry::new();
    registry
        .register("multilayer", multilayer)
        .register("dropout", dropout)
        .register("multilayer_with_dropout", || {
            Ok(merge_overrides(&[multilayer()?, dropout()?]))
        });
    registry
}
