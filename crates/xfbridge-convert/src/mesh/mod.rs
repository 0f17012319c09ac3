//! Mesh conversion between scene surfaces and NUD meshes

pub mod export;
pub mod import;

pub use export::{export_mesh, MeshExportContext};
pub use import::import_mesh;
