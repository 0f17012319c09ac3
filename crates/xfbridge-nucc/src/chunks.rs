// xfbridge-nucc/src/chunks.rs
//! Chunk kinds, identifiers and the tagged chunk union

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::clump::ClumpChunk;
use crate::coord::CoordChunk;
use crate::material::MaterialChunk;
use crate::model::ModelChunk;
use crate::texture::TextureChunk;

/// Chunk kinds supported by the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChunkKind {
    /// Skeleton + models root
    Clump,
    /// Coordinate node (bone)
    Coord,
    /// Drawable model holding a NUD
    Model,
    /// Container material
    Material,
    /// NUT texture
    Texture,
}

impl ChunkKind {
    /// Type name as stored in the container
    pub fn type_name(&self) -> &'static str {
        match self {
            ChunkKind::Clump => "nuccChunkClump",
            ChunkKind::Coord => "nuccChunkCoord",
            ChunkKind::Model => "nuccChunkModel",
            ChunkKind::Material => "nuccChunkMaterial",
            ChunkKind::Texture => "nuccChunkTexture",
        }
    }

    /// Parse a stored type name
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "nuccChunkClump" => Some(ChunkKind::Clump),
            "nuccChunkCoord" => Some(ChunkKind::Coord),
            "nuccChunkModel" => Some(ChunkKind::Model),
            "nuccChunkMaterial" => Some(ChunkKind::Material),
            "nuccChunkTexture" => Some(ChunkKind::Texture),
            _ => None,
        }
    }
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Stable index of a chunk inside a [`crate::Container`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkId(pub u32);

impl ChunkId {
    /// Index into the chunk arena
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of a chunk for cross-reference purposes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkKey {
    /// Chunk kind
    pub kind: ChunkKind,
    /// Path of the file the chunk belongs to
    pub path: String,
    /// Chunk name
    pub name: String,
}

impl ChunkKey {
    /// Create a key
    pub fn new(kind: ChunkKind, path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:{}", self.kind, self.path, self.name)
    }
}

/// A typed chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Chunk {
    /// Clump chunk
    Clump(ClumpChunk),
    /// Coordinate chunk
    Coord(CoordChunk),
    /// Model chunk
    Model(ModelChunk),
    /// Material chunk
    Material(MaterialChunk),
    /// Texture chunk
    Texture(TextureChunk),
}

impl Chunk {
    /// Kind of this chunk
    pub fn kind(&self) -> ChunkKind {
        match self {
            Chunk::Clump(_) => ChunkKind::Clump,
            Chunk::Coord(_) => ChunkKind::Coord,
            Chunk::Model(_) => ChunkKind::Model,
            Chunk::Material(_) => ChunkKind::Material,
            Chunk::Texture(_) => ChunkKind::Texture,
        }
    }

    /// File path of this chunk
    pub fn path(&self) -> &str {
        match self {
            Chunk::Clump(c) => &c.path,
            Chunk::Coord(c) => &c.path,
            Chunk::Model(c) => &c.path,
            Chunk::Material(c) => &c.path,
            Chunk::Texture(c) => &c.path,
        }
    }

    /// Name of this chunk
    pub fn name(&self) -> &str {
        match self {
            Chunk::Clump(c) => &c.name,
            Chunk::Coord(c) => &c.node.name,
            Chunk::Model(c) => &c.name,
            Chunk::Material(c) => &c.name,
            Chunk::Texture(c) => &c.name,
        }
    }

    /// Cross-reference identity of this chunk
    pub fn key(&self) -> ChunkKey {
        ChunkKey::new(self.kind(), self.path(), self.name())
    }
}

macro_rules! chunk_conversions {
    ($($variant:ident => $ty:ty, $as_ref:ident, $as_mut:ident;)*) => {
        impl Chunk {
            $(
                #[doc = concat!("Borrow as a `", stringify!($ty), "`")]
                pub fn $as_ref(&self) -> Option<&$ty> {
                    match self {
                        Chunk::$variant(c) => Some(c),
                        _ => None,
                    }
                }

                #[doc = concat!("Mutably borrow as a `", stringify!($ty), "`")]
                pub fn $as_mut(&mut self) -> Option<&mut $ty> {
                    match self {
                        Chunk::$variant(c) => Some(c),
                        _ => None,
                    }
                }
            )*
        }

        $(
            impl From<$ty> for Chunk {
                fn from(chunk: $ty) -> Self {
                    Chunk::$variant(chunk)
                }
            }
        )*
    };
}

chunk_conversions! {
    Clump => ClumpChunk, as_clump, as_clump_mut;
    Coord => CoordChunk, as_coord, as_coord_mut;
    Model => ModelChunk, as_model, as_model_mut;
    Material => MaterialChunk, as_material, as_material_mut;
    Texture => TextureChunk, as_texture, as_texture_mut;
}
