// xfbridge-nucc/src/nud.rs
//! NUD mesh records held by model chunks

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Highest vertex count a single mesh can index
pub const MAX_VERTICES: usize = 32767;

/// Highest triangle count a single mesh can hold
pub const MAX_FACES: usize = 16383;

/// Materials read per mesh; extras are ignored
pub const MAX_MATERIALS: usize = 4;

/// Bone influences per vertex
pub const MAX_INFLUENCES: usize = 4;

/// UV channels per vertex
pub const MAX_UV_CHANNELS: usize = 2;

/// `bone_type` of a mesh whose vertices carry no bone data
pub const BONE_TYPE_NONE: u8 = 0;

/// NUD model: one or more mesh groups
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Nud {
    /// Name, same as the model chunk
    pub name: String,
    /// Center and radius (container units)
    pub bounding_sphere: [f32; 4],
    /// Mesh groups
    pub mesh_groups: Vec<NudMeshGroup>,
}

impl Nud {
    /// Total mesh count across all groups
    pub fn mesh_count(&self) -> usize {
        self.mesh_groups.iter().map(|g| g.meshes.len()).sum()
    }

    /// Lowest and highest bone index carrying a positive weight
    ///
    /// Returns `(0, 0)` when no vertex is weighted to any bone.
    pub fn bone_range(&self) -> (u32, u32) {
        let mut range: Option<(u32, u32)> = None;

        let weighted = self
            .mesh_groups
            .iter()
            .flat_map(|g| &g.meshes)
            .flat_map(|m| &m.vertices)
            .filter_map(|v| v.bones.as_ref())
            .flat_map(|b| b.ids.iter().zip(&b.weights))
            .filter(|(_, w)| **w > 0.0)
            .map(|(&id, _)| id);

        for id in weighted {
            range = Some(match range {
                Some((lo, hi)) => (lo.min(id), hi.max(id)),
                None => (id, id),
            });
        }

        range.unwrap_or((0, 0))
    }
}

/// A group of meshes sharing bone flags and bounds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NudMeshGroup {
    /// Group name
    pub name: String,
    /// Opaque bone flags
    pub bone_flags: u32,
    /// Group bounds (container units)
    pub bounding_sphere: [f32; 8],
    /// Meshes, one per material slot of the model
    pub meshes: Vec<NudMesh>,
}

/// Flat vertex and triangle buffers of one sub-mesh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NudMesh {
    /// Vertex buffer
    pub vertices: Vec<NudVertex>,
    /// Triangle index buffer
    pub faces: Vec<[u32; 3]>,
    /// Vertex format
    pub vertex_type: u8,
    /// Bone data format
    pub bone_type: u8,
    /// UV format
    pub uv_type: u8,
    /// Face format flag
    pub face_flag: u8,
    /// Render materials (at most [`MAX_MATERIALS`])
    pub materials: Vec<NudMaterial>,
}

/// Four bone indices with matching weights
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VertexWeights {
    /// Indices into the clump's coordinate table
    pub ids: [u32; MAX_INFLUENCES],
    /// Weights, summing to 1
    pub weights: [f32; MAX_INFLUENCES],
}

/// One vertex of a NUD mesh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NudVertex {
    /// Position (container units)
    pub position: [f32; 3],
    /// Unit normal
    pub normal: [f32; 3],
    /// Unit tangent
    pub tangent: [f32; 3],
    /// `normal × tangent`
    pub bitangent: [f32; 3],
    /// RGBA bytes
    pub color: Option<[u8; 4]>,
    /// UV channels, V flipped
    pub uv: SmallVec<[[f32; 2]; MAX_UV_CHANNELS]>,
    /// Bone data, absent on unskinned meshes
    pub bones: Option<VertexWeights>,
}

/// Render state of a NUD mesh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NudMaterial {
    /// Material id / flags
    pub flags: u32,
    /// Blend source factor
    pub source_factor: u16,
    /// Blend destination factor
    pub dest_factor: u16,
    /// Alpha test
    pub alpha_test: u8,
    /// Alpha function
    pub alpha_function: u8,
    /// Reference alpha
    pub ref_alpha: u16,
    /// Cull mode
    pub cull_mode: u16,
    /// Opaque value
    pub unk1: f32,
    /// Opaque value
    pub unk2: f32,
    /// Z-buffer offset
    pub zbuffer_offset: i32,
    /// Texture samplers
    pub textures: Vec<NudMaterialTexture>,
    /// Named shader parameters
    pub properties: Vec<NudMaterialProperty>,
}

/// Texture sampler state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NudMaterialTexture {
    /// Opaque value
    pub unk0: i32,
    /// Map mode
    pub map_mode: u16,
    /// Wrap mode along S
    pub wrap_mode_s: u8,
    /// Wrap mode along T
    pub wrap_mode_t: u8,
    /// Minification filter
    pub min_filter: u8,
    /// Magnification filter
    pub mag_filter: u8,
    /// Mip detail
    pub mip_detail: u8,
    /// Opaque value
    pub unk1: u8,
    /// Opaque value
    pub unk2: u16,
}

/// Named shader parameter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NudMaterialProperty {
    /// Parameter name
    pub name: String,
    /// Values, usually four
    pub values: Vec<f32>,
}
