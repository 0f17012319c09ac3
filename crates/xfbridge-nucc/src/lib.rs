//! xfbridge-nucc
//!
//! In-memory chunk graph of an XFBIN container.
//!
//! # Chunk kinds
//!
//! | Kind | Type name | Holds |
//! |------|-----------|-------|
//! | Clump | `nuccChunkClump` | Skeleton, models, model groups |
//! | Coord | `nuccChunkCoord` | One skeleton node |
//! | Model | `nuccChunkModel` | NUD meshes and material references |
//! | Material | `nuccChunkMaterial` | Float block and texture groups |
//! | Texture | `nuccChunkTexture` | NUT bytes |
//!
//! # Example
//!
//! ```rust,ignore
//! use xfbridge_nucc::{ContainerCodec, JsonCodec};
//!
//! let container = JsonCodec::new().read_file("1nrtbod1.json".as_ref())?;
//! for (_, clump) in container.clumps() {
//!     println!("{} has {} bones", clump.name, clump.coords.len());
//! }
//! ```

pub mod chunks;
pub mod clump;
pub mod codec;
pub mod container;
pub mod coord;
pub mod logging;
pub mod material;
pub mod model;
pub mod nud;
pub mod texture;

pub use chunks::{Chunk, ChunkId, ChunkKey, ChunkKind};
pub use clump::{ClumpChunk, ModelGroup};
pub use codec::{ContainerCodec, JsonCodec};
pub use container::{Container, Page};
pub use coord::{CoordChunk, CoordNode};
pub use material::{MaterialChunk, TextureGroup};
pub use model::{ModelChunk, RiggingFlag};
pub use nud::{
    Nud, NudMaterial, NudMaterialProperty, NudMaterialTexture, NudMesh, NudMeshGroup, NudVertex,
    VertexWeights, MAX_FACES, MAX_VERTICES,
};
pub use texture::{is_valid_nut, TextureChunk, NUT_MAGIC};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
