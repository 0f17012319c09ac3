//! NUT texture chunks

use serde::{Deserialize, Serialize};

/// Signature at the start of every NUT asset
pub const NUT_MAGIC: &[u8; 4] = b"NTP3";

/// Whether a buffer looks like a NUT asset: the signature followed by data
pub fn is_valid_nut(data: &[u8]) -> bool {
    data.len() > NUT_MAGIC.len() && data.starts_with(NUT_MAGIC)
}

/// Texture chunk
///
/// A texture referenced by a material before its page is known has no data;
/// adding the texture page later fills it in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureChunk {
    /// File path
    pub path: String,
    /// Texture name
    pub name: String,
    /// Raw NUT bytes
    pub nut: Option<Vec<u8>>,
}

impl TextureChunk {
    /// Create a texture reference without data
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            nut: None,
        }
    }

    /// Create a texture holding NUT bytes
    pub fn with_data(path: impl Into<String>, name: impl Into<String>, nut: Vec<u8>) -> Self {
        Self {
            nut: Some(nut),
            ..Self::new(path, name)
        }
    }

    /// Whether the chunk carries data
    pub fn has_data(&self) -> bool {
        self.nut.is_some()
    }
}
