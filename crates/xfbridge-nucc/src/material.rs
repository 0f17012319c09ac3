//! Container material chunks

use serde::{Deserialize, Serialize};

use crate::chunks::ChunkId;

/// Texture references sharing one flag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureGroup {
    /// Opaque group flag
    pub unk: u32,
    /// Texture chunks
    pub textures: Vec<ChunkId>,
}

/// Material chunk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialChunk {
    /// File path
    pub path: String,
    /// Material name
    pub name: String,
    /// Opaque field
    pub field02: u8,
    /// Opaque field
    pub field04: u16,
    /// Float block format (shown as hex in the scene)
    pub format: u32,
    /// Float parameters
    pub floats: Vec<f32>,
    /// Texture groups
    pub texture_groups: Vec<TextureGroup>,
}

impl MaterialChunk {
    /// Create an empty material
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// First texture of the first group, the one hosts show as base color
    pub fn base_texture(&self) -> Option<ChunkId> {
        self.texture_groups.first().and_then(|g| g.textures.first()).copied()
    }
}
