//! Read-only scene snapshot exchanged with the host editor
//!
//! Export consumes a [`Scene`]; import produces one. Lengths are in scene
//! units, rotations in radians, UVs with a bottom-left origin.

use glam::{DMat4, DVec3};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::path::PathBuf;

use xfbridge_nucc::nud::MAX_UV_CHANNELS;
use xfbridge_nucc::{NudMaterialTexture, RiggingFlag};

/// Suffix the host appends to armature names to keep them unique
pub const CLUMP_SUFFIX: &str = " [C]";

/// Prefix of host materials created for container materials
pub const MATERIAL_PREFIX: &str = "[XFBIN] ";

/// Model group entry standing for the null sentinel
pub const NULL_MODEL: &str = "None";

/// A collection of armatures
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Collection name
    pub name: String,
    /// One armature per clump
    pub armatures: Vec<Armature>,
    /// Every texture chunk found on import
    pub textures: Vec<TextureChunkProps>,
}

/// A skeleton with its models; exported as one clump
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Armature {
    /// Armature name, possibly carrying [`CLUMP_SUFFIX`]
    pub name: String,
    /// Bones in scene order
    pub bones: Vec<SceneBone>,
    /// Clump-level properties
    pub clump: ClumpProperties,
    /// Model holders, in scene order
    pub models: Vec<SceneModel>,
    /// Rendering materials created on import
    pub host_materials: Vec<HostMaterial>,
}

impl Armature {
    /// Clump name: the armature name without [`CLUMP_SUFFIX`]
    pub fn clump_name(&self) -> &str {
        self.name.strip_suffix(CLUMP_SUFFIX).unwrap_or(&self.name)
    }

    /// Find a bone by name
    pub fn bone(&self, name: &str) -> Option<&SceneBone> {
        self.bones.iter().find(|b| b.name == name)
    }
}

/// A named bone with its armature-space matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneBone {
    /// Bone name
    pub name: String,
    /// Parent bone name
    pub parent: Option<String>,
    /// Armature-space matrix
    pub world: DMat4,
    /// Matrix relative to the parent; derived on import, ignored on export
    pub local: DMat4,
    /// Per-axis scale signs recorded on import
    pub scale_signs: Option<[f64; 3]>,
    /// Opaque value recorded on import
    pub unk_float: Option<f32>,
    /// Opaque value recorded on import
    pub unk_short: Option<u16>,
}

impl SceneBone {
    /// Create a bone without recorded metadata
    pub fn new(name: impl Into<String>, parent: Option<&str>, world: DMat4) -> Self {
        Self {
            name: name.into(),
            parent: parent.map(str::to_string),
            world,
            local: world,
            scale_signs: None,
            unk_float: None,
            unk_short: None,
        }
    }
}

/// Clump properties editable in the host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClumpProperties {
    /// File path of the clump's chunks
    pub path: String,
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
    /// Container materials
    pub materials: Vec<XfbinMaterialProps>,
    /// Flat model list, by name
    pub models: Vec<String>,
    /// Model groups
    pub model_groups: Vec<ModelGroupProps>,
    /// Texture assets to write with this clump
    pub texture_chunks: Vec<TextureChunkProps>,
}

/// Model group, by model name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelGroupProps {
    /// Opaque flag
    pub flag0: u32,
    /// Opaque flag
    pub flag1: u32,
    /// Hex string
    pub unk: String,
    /// Model names; `"None"` marks the null sentinel
    pub models: Vec<String>,
}

/// Container material
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct XfbinMaterialProps {
    /// Material chunk name
    pub material_name: String,
    /// Opaque field
    pub field02: u8,
    /// Opaque field
    pub field04: u16,
    /// Hex string
    pub float_format: String,
    /// Float parameters, carried as provided
    pub floats: Vec<f32>,
    /// Texture groups
    pub texture_groups: Vec<TextureGroupProps>,
}

/// Texture group of a container material
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureGroupProps {
    /// Group flag
    pub flag: u32,
    /// Textures of the group
    pub textures: Vec<TextureRef>,
}

/// Texture reference by identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureRef {
    /// Chunk path
    pub path: String,
    /// Chunk name
    pub texture_name: String,
}

/// Texture asset attached to a clump
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureChunkProps {
    /// Chunk path
    pub path: String,
    /// Chunk name
    pub texture_name: String,
    /// Write this texture on export
    pub include: bool,
    /// NUT file on disk
    pub nut_path: Option<PathBuf>,
}

/// Material created for the host renderer on import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostMaterial {
    /// `"[XFBIN] {material}"`
    pub name: String,
    /// Container material it mirrors
    pub xfbin_material: String,
    /// Image names to try, in order, for the base color texture
    pub base_texture_candidates: Vec<String>,
}

/// Holder object for one model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneModel {
    /// Model name
    pub name: String,
    /// Set when the holder is parented directly to a bone
    pub parent_bone: Option<String>,
    /// NUD properties
    pub nud: NudProperties,
    /// Sub-meshes
    pub meshes: Vec<SceneMesh>,
}

/// Model-level NUD properties
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NudProperties {
    /// Bone the model is bound to
    pub mesh_bone: String,
    /// Base binding flags
    pub rigging_flag: RiggingFlag,
    /// Extra rendering flags
    pub rigging_flag_extra: RiggingFlag,
    /// Material flag bytes
    pub material_flags: [u8; 4],
    /// Kept only when `material_flags[1] & 0x04`
    pub flag1_floats: [f32; 6],
    /// Mesh group bone flags
    pub bone_flag: u32,
    /// Scene units
    pub bounding_sphere_nud: [f32; 4],
    /// Scene units
    pub bounding_sphere_group: [f32; 8],
}

/// Triangulated surface with per-corner attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneMesh {
    /// Surface name
    pub name: String,
    /// Surface vertices
    pub vertices: Vec<SceneVertex>,
    /// Triangles, three corners each
    pub triangles: Vec<[SceneCorner; 3]>,
    /// Whether the surface has a bone weight layer
    pub has_deform: bool,
    /// Mesh properties
    pub properties: MeshProperties,
}

/// Surface vertex
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneVertex {
    /// Armature-space position
    pub position: DVec3,
    /// Vertex normal
    pub normal: DVec3,
    /// Bone influences by bone name
    pub influences: Vec<Influence>,
}

impl SceneVertex {
    /// Create an unweighted vertex
    pub fn new(position: DVec3, normal: DVec3) -> Self {
        Self {
            position,
            normal,
            influences: Vec::new(),
        }
    }
}

/// One bone influence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Influence {
    /// Bone name
    pub bone: String,
    /// Weight
    pub weight: f32,
}

impl Influence {
    /// Create an influence
    pub fn new(bone: impl Into<String>, weight: f32) -> Self {
        Self {
            bone: bone.into(),
            weight,
        }
    }
}

/// Per-corner attributes of a triangle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneCorner {
    /// Surface vertex index
    pub vertex: u32,
    /// Corner normal
    pub normal: DVec3,
    /// Corner tangent
    pub tangent: DVec3,
    /// RGBA, 0..1
    pub color: Option<[f32; 4]>,
    /// UV channels
    pub uv: SmallVec<[[f32; 2]; MAX_UV_CHANNELS]>,
}

impl SceneCorner {
    /// Corner carrying only a vertex index
    pub fn at(vertex: u32) -> Self {
        Self {
            vertex,
            ..Self::default()
        }
    }
}

/// Per-mesh properties
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshProperties {
    /// NUD vertex type
    pub vertex_type: u8,
    /// NUD bone type
    pub bone_type: u8,
    /// NUD UV type
    pub uv_type: u8,
    /// NUD face flag
    pub face_flag: u8,
    /// Name of the container material
    pub xfbin_material: String,
    /// NUD render materials
    pub materials: Vec<NudMaterialProps>,
}

/// NUD render material
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NudMaterialProps {
    /// Hex string
    pub material_id: String,
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
    /// Named properties
    pub material_props: Vec<NudPropertyProps>,
}

/// Named shader parameter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NudPropertyProps {
    /// Property name
    pub prop_name: String,
    /// Number of meaningful entries in `values`
    pub count: usize,
    /// Values, truncated to `count` on export
    pub values: Vec<f32>,
}
