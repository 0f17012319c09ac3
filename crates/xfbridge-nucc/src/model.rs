//! Model chunks

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::chunks::ChunkId;
use crate::nud::Nud;

bitflags! {
    /// Vertex binding of a model
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct RiggingFlag: u32 {
        const UNSKINNED = 0x01;
        const SKINNED = 0x02;
        const BODY = 0x04;
        const BLUR = 0x10;
        const SHADOW = 0x20;
    }
}

impl RiggingFlag {
    /// Flags describing how vertices bind to bones
    pub const BASE: Self = Self::UNSKINNED.union(Self::SKINNED).union(Self::BODY);

    /// Rendering extras
    pub const EXTRA: Self = Self::BLUR.union(Self::SHADOW);

    /// Base part of the flag
    pub fn base(self) -> Self {
        self & Self::BASE
    }

    /// Extra part of the flag
    pub fn extra(self) -> Self {
        self & Self::EXTRA
    }
}

/// `material_flags[1]` bit telling that `flag1_floats` are present
pub const MATERIAL_FLAG1_HAS_FLOATS: u8 = 0x04;

/// Model chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelChunk {
    /// File path
    pub path: String,
    /// Model name
    pub name: String,
    /// Owning clump
    pub clump: Option<ChunkId>,
    /// Index of the mesh bone in the clump's coordinate table
    pub coord_index: u32,
    /// One material reference per mesh
    pub materials: Vec<ChunkId>,
    /// Vertex binding flags
    pub rigging_flag: RiggingFlag,
    /// Four opaque material flag bytes
    pub material_flags: [u8; 4],
    /// Present only when `material_flags[1]` has [`MATERIAL_FLAG1_HAS_FLOATS`]
    pub flag1_floats: Option<[f32; 6]>,
    /// Mesh data
    pub nud: Nud,
}

impl ModelChunk {
    /// Create an empty model
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            path: path.into(),
            nud: Nud {
                name: name.clone(),
                ..Nud::default()
            },
            name,
            clump: None,
            coord_index: 0,
            materials: Vec::new(),
            rigging_flag: RiggingFlag::empty(),
            material_flags: [0; 4],
            flag1_floats: None,
        }
    }

    /// Set material flags, keeping the float block only when the flags ask for it
    pub fn set_material_flags(&mut self, flags: [u8; 4], floats: [f32; 6]) {
        self.material_flags = flags;
        self.flag1_floats = (flags[1] & MATERIAL_FLAG1_HAS_FLOATS != 0).then_some(floats);
    }
}
