//! xfbridge Conversion Engine
//!
//! Converts between an editable rigged scene and the chunk graph of an
//! XFBIN container:
//! - Bone hierarchy resolver (armature-space matrices <-> local coord nodes)
//! - Weight resolver (arbitrary influences -> four normalized pairs)
//! - Mesh converter (triangulated surfaces <-> NUD meshes)
//! - Chunk graph assembler (clump merge, model selection, model groups)
//! - Top-level [`Exporter`] and [`Importer`] operations

pub mod assembler;
pub mod exporter;
pub mod importer;
pub mod material;
pub mod mesh;
pub mod scene;
pub mod settings;
pub mod skeleton;
pub mod weights;

pub use assembler::{ClumpAssembler, ClumpSummary};
pub use exporter::{ExportReport, Exporter};
pub use importer::{ImportReport, Importer};
pub use scene::{
    Armature, ClumpProperties, Influence, MeshProperties, NudProperties, Scene, SceneBone, SceneCorner, SceneMesh,
    SceneModel, SceneVertex,
};
pub use settings::{ExportSettings, ImportSettings, MeshSelection};
pub use skeleton::{export_bones, import_bones, Hierarchy};
pub use weights::resolve_weights;
