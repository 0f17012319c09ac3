//! NUD mesh -> scene surface

use glam::{DMat3, DMat4};
use std::collections::{BTreeSet, HashSet};

use xfbridge_core::units::{self, widen};
use xfbridge_core::{Diagnostic, DiagnosticKind, Diagnostics, UnitKind};
use xfbridge_nucc::nud::{BONE_TYPE_NONE, MAX_UV_CHANNELS};
use xfbridge_nucc::NudMesh;

use crate::material::import_nud_materials;
use crate::scene::{Influence, MeshProperties, SceneCorner, SceneMesh, SceneVertex};

/// Color given to corners of vertices without one, when others have it
const WHITE: [f32; 4] = [1.0; 4];

/// Rebuild a surface from a NUD mesh
///
/// One point per vertex. Triangles that do not reference three distinct,
/// existing vertices are skipped, and repeated triangles are dropped. Bone
/// indices resolve through `bone_names` (the clump's coordinate table).
/// `bone_world` moves the surface out of mesh bone space.
pub fn import_mesh(
    mesh: &NudMesh,
    name: &str,
    xfbin_material: &str,
    bone_names: &[String],
    bone_world: Option<DMat4>,
    diagnostics: &mut Diagnostics,
) -> SceneMesh {
    let directions = bone_world.map(|m| DMat3::from_mat4(m).inverse().transpose());
    let mut unknown_bones = BTreeSet::new();

    let vertices: Vec<SceneVertex> = mesh
        .vertices
        .iter()
        .map(|v| {
            let mut position = units::position_to_scene(widen(v.position));
            let mut normal = widen(v.normal);
            if let (Some(world), Some(directions)) = (bone_world, directions) {
                position = world.transform_point3(position);
                normal = (directions * normal).normalize_or_zero();
            }

            let influences = v
                .bones
                .iter()
                .flat_map(|b| b.ids.iter().zip(&b.weights))
                .filter(|(_, w)| **w > 0.0)
                .filter_map(|(&id, &weight)| match bone_names.get(id as usize) {
                    Some(bone) => Some(Influence::new(bone.clone(), weight)),
                    None => {
                        unknown_bones.insert(id);
                        None
                    }
                })
                .collect();

            SceneVertex {
                position,
                normal,
                influences,
            }
        })
        .collect();

    for index in unknown_bones {
        diagnostics.push(Diagnostic::new(
            UnitKind::Mesh,
            name,
            DiagnosticKind::UnknownBoneIndex { index },
        ));
    }

    let has_color = mesh.vertices.iter().any(|v| v.color.is_some());
    let uv_channels = mesh
        .vertices
        .iter()
        .map(|v| v.uv.len())
        .max()
        .unwrap_or(0)
        .min(MAX_UV_CHANNELS);

    let mut seen = HashSet::new();
    let mut triangles = Vec::with_capacity(mesh.faces.len());

    for face in &mesh.faces {
        let in_range = face.iter().all(|&i| (i as usize) < mesh.vertices.len());
        let distinct = face[0] != face[1] && face[1] != face[2] && face[0] != face[2];
        if !(in_range && distinct) {
            continue;
        }

        let mut key = *face;
        key.sort_unstable();
        if !seen.insert(key) {
            continue;
        }

        triangles.push(face.map(|i| {
            let source = &mesh.vertices[i as usize];
            let mut tangent = widen(source.tangent);
            if let Some(directions) = directions {
                tangent = (directions * tangent).normalize_or_zero();
            }

            SceneCorner {
                vertex: i,
                normal: vertices[i as usize].normal,
                tangent,
                color: has_color.then(|| source.color.map_or(WHITE, units::color_to_scene)),
                uv: (0..uv_channels)
                    .map(|c| source.uv.get(c).map_or([0.0, 0.0], |&uv| units::flip_uv(uv)))
                    .collect(),
            }
        }));
    }

    let has_deform = mesh.bone_type != BONE_TYPE_NONE || mesh.vertices.iter().any(|v| v.bones.is_some());

    SceneMesh {
        name: name.to_string(),
        vertices,
        triangles,
        has_deform,
        properties: MeshProperties {
            vertex_type: mesh.vertex_type,
            bone_type: mesh.bone_type,
            uv_type: mesh.uv_type,
            face_flag: mesh.face_flag,
            xfbin_material: xfbin_material.to_string(),
            materials: import_nud_materials(&mesh.materials),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use xfbridge_nucc::{NudVertex, VertexWeights};

    fn vertex(x: f32, color: Option<[u8; 4]>) -> NudVertex {
        NudVertex {
            position: [x, 0.0, 0.0],
            normal: [0.0, 0.0, 1.0],
            color,
            uv: std::iter::once([0.25, 0.75]).collect(),
            ..NudVertex::default()
        }
    }

    fn triangle_mesh() -> NudMesh {
        NudMesh {
            vertices: vec![vertex(0.0, None), vertex(1.0, Some([255, 0, 0, 255])), vertex(2.0, None)],
            faces: vec![[0, 1, 2], [2, 1, 0], [0, 0, 1], [0, 1, 7]],
            ..NudMesh::default()
        }
    }

    #[test]
    fn test_faces_filtered_and_deduplicated() {
        let mut diagnostics = Diagnostics::new();
        let surface = import_mesh(&triangle_mesh(), "m", "mat", &[], None, &mut diagnostics);

        assert_eq!(surface.vertices.len(), 3);
        assert_eq!(surface.triangles.len(), 1);
        assert!((surface.vertices[1].position.x - 100.0).abs() < 1e-9);
        assert!(!surface.has_deform);
    }

    #[test]
    fn test_corner_attributes() {
        let mut diagnostics = Diagnostics::new();
        let surface = import_mesh(&triangle_mesh(), "m", "mat", &[], None, &mut diagnostics);
        let corners = &surface.triangles[0];

        assert_eq!(corners[0].color, Some(WHITE));
        assert_eq!(corners[1].color, Some([1.0, 0.0, 0.0, 1.0]));
        assert_eq!(corners[2].uv.as_slice(), &[[0.25, 0.25]]);
        assert_eq!(corners[0].normal, DVec3::Z);
    }

    #[test]
    fn test_influences_resolved_through_bone_table() {
        let mut mesh = triangle_mesh();
        mesh.vertices[0].bones = Some(VertexWeights {
            ids: [1, 5, 0, 0],
            weights: [0.75, 0.25, 0.0, 0.0],
        });
        let bones = vec!["root".to_string(), "spine".to_string()];
        let mut diagnostics = Diagnostics::new();

        let surface = import_mesh(&mesh, "m", "mat", &bones, None, &mut diagnostics);

        assert!(surface.has_deform);
        assert_eq!(surface.vertices[0].influences, vec![Influence::new("spine", 0.75)]);
        assert!(matches!(
            diagnostics.entries()[0].kind,
            DiagnosticKind::UnknownBoneIndex { index: 5 }
        ));
    }

    #[test]
    fn test_bone_world_applied() {
        let world = DMat4::from_translation(DVec3::new(0.0, 10.0, 0.0));
        let mut diagnostics = Diagnostics::new();
        let surface = import_mesh(&triangle_mesh(), "m", "mat", &[], Some(world), &mut diagnostics);

        assert!((surface.vertices[0].position.y - 10.0).abs() < 1e-9);
    }
}
