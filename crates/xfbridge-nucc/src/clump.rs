//! Clump chunks: a skeleton plus its models and model groups

use serde::{Deserialize, Serialize};

use crate::chunks::ChunkId;

/// Ordered list of model references, possibly containing the null sentinel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelGroup {
    /// Opaque flag
    pub flag0: u32,
    /// Opaque flag
    pub flag1: u32,
    /// Opaque value (shown as hex in the scene)
    pub unk: u32,
    /// Model references; `None` is the null sentinel
    pub models: Vec<Option<ChunkId>>,
}

/// Clump chunk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClumpChunk {
    /// File path
    pub path: String,
    /// Clump name
    pub name: String,
    /// Opaque header field
    pub field00: u32,
    /// Coordinate table flags
    pub coord_flag0: u16,
    /// Coordinate table flags
    pub coord_flag1: u16,
    /// Model table flags
    pub model_flag0: u16,
    /// Model table flags
    pub model_flag1: u16,
    /// Skeleton, in bone index order
    pub coords: Vec<ChunkId>,
    /// Top-level model list
    pub models: Vec<ChunkId>,
    /// Model groups
    pub model_groups: Vec<ModelGroup>,
}

impl ClumpChunk {
    /// Create an empty clump
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Every model referenced from the flat list and the groups, first-seen order,
    /// without duplicates and without the null sentinel
    pub fn all_models(&self) -> Vec<ChunkId> {
        let mut seen = std::collections::HashSet::new();
        self.models
            .iter()
            .copied()
            .chain(self.model_groups.iter().flat_map(|g| g.models.iter().flatten().copied()))
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_models_dedup_first_seen() {
        let mut clump = ClumpChunk::new("c/foo.max", "Foo");
        clump.models = vec![ChunkId(4), ChunkId(2)];
        clump.model_groups = vec![
            ModelGroup {
                models: vec![Some(ChunkId(2)), None, Some(ChunkId(7))],
                ..ModelGroup::default()
            },
            ModelGroup {
                models: vec![Some(ChunkId(4)), Some(ChunkId(9))],
                ..ModelGroup::default()
            },
        ];

        assert_eq!(
            clump.all_models(),
            vec![ChunkId(4), ChunkId(2), ChunkId(7), ChunkId(9)]
        );
    }
}
