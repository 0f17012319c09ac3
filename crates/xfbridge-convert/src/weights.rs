//! Per-vertex bone influence selection

use smallvec::SmallVec;
use std::collections::HashMap;

use xfbridge_nucc::nud::MAX_INFLUENCES;
use xfbridge_nucc::VertexWeights;

use crate::scene::Influence;

/// Weights written when a vertex has no usable influence
pub const FALLBACK_WEIGHTS: [f32; MAX_INFLUENCES] = [0.0, 0.0, 0.0, 1.0];

/// Reduce a vertex's influences to exactly four normalized (bone index, weight) pairs
///
/// Influences naming bones outside `bone_indices` are ignored. The rest are
/// sorted by descending weight (ties keep their order), the first four kept
/// and padded with `(0, 0.0)`. When the kept weights sum to zero the vertex
/// gets [`FALLBACK_WEIGHTS`] on bone 0.
pub fn resolve_weights(influences: &[Influence], bone_indices: &HashMap<String, u32>) -> VertexWeights {
    let mut kept: SmallVec<[(u32, f32); 8]> = influences
        .iter()
        .filter_map(|i| bone_indices.get(&i.bone).map(|&index| (index, i.weight)))
        .collect();

    kept.sort_by(|a, b| b.1.total_cmp(&a.1));
    kept.truncate(MAX_INFLUENCES);
    kept.resize(MAX_INFLUENCES, (0, 0.0));

    let sum: f32 = kept.iter().map(|(_, w)| w).sum();
    if sum <= 0.0 {
        return VertexWeights {
            ids: [0; MAX_INFLUENCES],
            weights: FALLBACK_WEIGHTS,
        };
    }

    let mut weights = VertexWeights::default();
    for (slot, (index, weight)) in kept.into_iter().enumerate() {
        weights.ids[slot] = index;
        weights.weights[slot] = weight / sum;
    }
    weights
}
