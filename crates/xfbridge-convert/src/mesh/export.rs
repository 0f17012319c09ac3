//! Scene surface -> NUD mesh

use glam::{DMat3, DMat4, DVec3};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use xfbridge_core::units::{self, narrow};
use xfbridge_core::{Diagnostic, DiagnosticKind, Diagnostics, Error, Result, UnitKind};
use xfbridge_nucc::nud::MAX_UV_CHANNELS;
use xfbridge_nucc::{NudMesh, NudVertex, MAX_FACES, MAX_VERTICES};

use crate::material::export_nud_materials;
use crate::scene::{SceneCorner, SceneMesh, SceneVertex};
use crate::weights::resolve_weights;

/// Shared, read-only inputs of a mesh export
#[derive(Debug, Clone, Copy)]
pub struct MeshExportContext<'a> {
    /// Bone name -> index in the clump's coordinate table
    pub bone_indices: &'a HashMap<String, u32>,
    /// Transform into mesh bone space, when the model is not parented to its bone
    pub bone_space: Option<DMat4>,
}

/// Position and direction transforms of a bone space
struct Space {
    points: DMat4,
    directions: DMat3,
}

impl Space {
    fn new(matrix: DMat4) -> Self {
        Self {
            points: matrix,
            directions: DMat3::from_mat4(matrix).inverse().transpose(),
        }
    }

    fn direction(&self, v: DVec3) -> DVec3 {
        (self.directions * v).normalize_or_zero()
    }
}

/// Convert one triangulated surface
///
/// Vertices are deduplicated by surface vertex index: the first corner that
/// reaches a vertex decides its normal, tangent, color and UVs. Degenerate
/// triangles are dropped before any of their vertices are written. Returns `None` (with a diagnostic) when the result
/// breaks a format limit.
pub fn export_mesh(
    mesh: &SceneMesh,
    ctx: &MeshExportContext<'_>,
    diagnostics: &mut Diagnostics,
) -> Result<Option<NudMesh>> {
    let space = ctx.bone_space.map(Space::new);

    let mut remap: HashMap<u32, u32> = HashMap::new();
    let mut vertices: Vec<NudVertex> = Vec::new();
    let mut faces: Vec<[u32; 3]> = Vec::with_capacity(mesh.triangles.len());
    let mut degenerate = 0usize;

    for triangle in &mesh.triangles {
        for corner in triangle {
            if mesh.vertices.get(corner.vertex as usize).is_none() {
                return Err(Error::invalid_data(format!(
                    "surface '{}' has a corner on missing vertex {}",
                    mesh.name, corner.vertex
                )));
            }
        }

        let [a, b, c] = [triangle[0].vertex, triangle[1].vertex, triangle[2].vertex];
        if a == b || b == c || a == c {
            degenerate += 1;
            continue;
        }

        let mut face = [0u32; 3];
        for (slot, corner) in triangle.iter().enumerate() {
            face[slot] = match remap.entry(corner.vertex) {
                Entry::Occupied(e) => *e.get(),
                Entry::Vacant(e) => {
                    let source = &mesh.vertices[corner.vertex as usize];
                    let index = u32::try_from(vertices.len())
                        .map_err(|_| Error::invalid_data(format!("surface '{}' is too large", mesh.name)))?;
                    vertices.push(export_vertex(mesh, source, corner, space.as_ref(), ctx));
                    *e.insert(index)
                }
            };
        }
        faces.push(face);
    }

    if degenerate > 0 {
        diagnostics.push(Diagnostic::new(
            UnitKind::Mesh,
            &mesh.name,
            DiagnosticKind::DegenerateTriangles { count: degenerate },
        ));
    }

    // Only surviving triangles allocate vertices, so no faces means no vertices
    let limit = if vertices.len() < 3 || faces.is_empty() {
        Some(DiagnosticKind::TooFewVertices { count: vertices.len() })
    } else if vertices.len() > MAX_VERTICES {
        Some(DiagnosticKind::TooManyVertices {
            count: vertices.len(),
            limit: MAX_VERTICES,
        })
    } else if faces.len() > MAX_FACES {
        Some(DiagnosticKind::TooManyTriangles {
            count: faces.len(),
            limit: MAX_FACES,
        })
    } else {
        None
    };

    if let Some(kind) = limit {
        diagnostics.push(Diagnostic::new(UnitKind::Mesh, &mesh.name, kind));
        return Ok(None);
    }

    let props = &mesh.properties;
    Ok(Some(NudMesh {
        vertices,
        faces,
        vertex_type: props.vertex_type,
        bone_type: props.bone_type,
        uv_type: props.uv_type,
        face_flag: props.face_flag,
        materials: export_nud_materials(&props.materials)?,
    }))
}

fn export_vertex(
    mesh: &SceneMesh,
    source: &SceneVertex,
    corner: &SceneCorner,
    space: Option<&Space>,
    ctx: &MeshExportContext<'_>,
) -> NudVertex {
    let (position, normal, tangent) = match space {
        Some(space) => (
            space.points.transform_point3(source.position),
            space.direction(corner.normal),
            space.direction(corner.tangent),
        ),
        None => (source.position, corner.normal, corner.tangent),
    };

    NudVertex {
        position: narrow(units::position_to_external(position)),
        normal: narrow(normal),
        tangent: narrow(tangent),
        bitangent: narrow(normal.cross(tangent)),
        color: corner.color.map(units::color_to_external),
        uv: corner.uv.iter().take(MAX_UV_CHANNELS).map(|&uv| units::flip_uv(uv)).collect(),
        bones: mesh
            .has_deform
            .then(|| resolve_weights(&source.influences, ctx.bone_indices)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Influence, SceneCorner};

    fn corner(vertex: u32, uv: [f32; 2]) -> SceneCorner {
        SceneCorner {
            vertex,
            normal: DVec3::Z,
            tangent: DVec3::X,
            color: Some([1.0, 0.5, 0.0, 1.0]),
            uv: std::iter::once(uv).collect(),
        }
    }

    fn quad() -> SceneMesh {
        SceneMesh {
            name: "body (1) [skin]".to_string(),
            vertices: vec![
                SceneVertex::new(DVec3::new(0.0, 0.0, 0.0), DVec3::Z),
                SceneVertex::new(DVec3::new(100.0, 0.0, 0.0), DVec3::Z),
                SceneVertex::new(DVec3::new(100.0, 100.0, 0.0), DVec3::Z),
                SceneVertex::new(DVec3::new(0.0, 100.0, 0.0), DVec3::Z),
            ],
            triangles: vec![
                [corner(0, [0.0, 0.0]), corner(1, [1.0, 0.0]), corner(2, [1.0, 1.0])],
                [corner(0, [0.5, 0.5]), corner(2, [1.0, 1.0]), corner(3, [0.0, 1.0])],
            ],
            ..SceneMesh::default()
        }
    }

    #[test]
    fn test_dedup_by_vertex_first_corner_wins() {
        let bones = HashMap::new();
        let ctx = MeshExportContext {
            bone_indices: &bones,
            bone_space: None,
        };
        let mut diagnostics = Diagnostics::new();

        let nud = export_mesh(&quad(), &ctx, &mut diagnostics).unwrap().unwrap();

        assert_eq!(nud.vertices.len(), 4);
        assert_eq!(nud.faces, vec![[0, 1, 2], [0, 2, 3]]);
        // Vertex 0 keeps the UV of the first corner, V flipped
        assert_eq!(nud.vertices[0].uv.as_slice(), &[[0.0, 1.0]]);
        assert_eq!(nud.vertices[0].color, Some([255, 127, 0, 255]));
        assert!((nud.vertices[1].position[0] - 1.0).abs() < 1e-6);
        assert_eq!(nud.vertices[0].bitangent, [0.0, 1.0, 0.0]);
        assert!(nud.vertices[0].bones.is_none());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_degenerate_triangles_dropped() {
        let mut mesh = quad();
        mesh.triangles.push([corner(1, [0.0; 2]), corner(1, [0.0; 2]), corner(2, [0.0; 2])]);

        let bones = HashMap::new();
        let ctx = MeshExportContext {
            bone_indices: &bones,
            bone_space: None,
        };
        let mut diagnostics = Diagnostics::new();

        let nud = export_mesh(&mesh, &ctx, &mut diagnostics).unwrap().unwrap();
        assert_eq!(nud.faces.len(), 2);
        assert!(matches!(
            diagnostics.entries()[0].kind,
            DiagnosticKind::DegenerateTriangles { count: 1 }
        ));
    }

    #[test]
    fn test_too_few_vertices_skipped() {
        let mut mesh = quad();
        mesh.triangles = vec![[corner(0, [0.0; 2]), corner(0, [0.0; 2]), corner(1, [0.0; 2])]];

        let bones = HashMap::new();
        let ctx = MeshExportContext {
            bone_indices: &bones,
            bone_space: None,
        };
        let mut diagnostics = Diagnostics::new();

        assert!(export_mesh(&mesh, &ctx, &mut diagnostics).unwrap().is_none());
        assert!(diagnostics
            .entries()
            .iter()
            .any(|d| matches!(d.kind, DiagnosticKind::TooFewVertices { count: 0 })));
    }

    #[test]
    fn test_all_degenerate_surface_dropped() {
        let mut mesh = quad();
        mesh.triangles = vec![
            [corner(0, [0.0; 2]), corner(0, [0.0; 2]), corner(1, [0.0; 2])],
            [corner(2, [0.0; 2]), corner(2, [0.0; 2]), corner(3, [0.0; 2])],
        ];

        let bones = HashMap::new();
        let ctx = MeshExportContext {
            bone_indices: &bones,
            bone_space: None,
        };
        let mut diagnostics = Diagnostics::new();

        assert!(export_mesh(&mesh, &ctx, &mut diagnostics).unwrap().is_none());
        let kinds: Vec<_> = diagnostics.entries().iter().map(|d| &d.kind).collect();
        assert!(matches!(kinds[0], DiagnosticKind::DegenerateTriangles { count: 2 }));
        assert!(matches!(kinds[1], DiagnosticKind::TooFewVertices { count: 0 }));
    }

    #[test]
    fn test_degenerate_triangle_leaves_no_orphans() {
        let mut mesh = quad();
        mesh.vertices.push(SceneVertex::new(DVec3::new(50.0, 50.0, 0.0), DVec3::Z));
        mesh.triangles.push([corner(4, [0.0; 2]), corner(4, [0.0; 2]), corner(1, [0.0; 2])]);

        let bones = HashMap::new();
        let ctx = MeshExportContext {
            bone_indices: &bones,
            bone_space: None,
        };
        let nud = export_mesh(&mesh, &ctx, &mut Diagnostics::new()).unwrap().unwrap();

        assert_eq!(nud.vertices.len(), 4);
        assert_eq!(nud.faces.len(), 2);
    }

    #[test]
    fn test_weights_written_with_deform_layer() {
        let mut mesh = quad();
        mesh.has_deform = true;
        mesh.vertices[0].influences = vec![Influence::new("spine", 2.0), Influence::new("root", 2.0)];

        let bones: HashMap<String, u32> = [("root".to_string(), 0), ("spine".to_string(), 1)].into();
        let ctx = MeshExportContext {
            bone_indices: &bones,
            bone_space: None,
        };
        let mut diagnostics = Diagnostics::new();

        let nud = export_mesh(&mesh, &ctx, &mut diagnostics).unwrap().unwrap();
        let weights = nud.vertices[0].bones.unwrap();
        assert_eq!(weights.ids, [1, 0, 0, 0]);
        assert_eq!(weights.weights, [0.5, 0.5, 0.0, 0.0]);
        // Unweighted vertices fall back to bone 0
        assert_eq!(nud.vertices[1].bones.unwrap().weights, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_bone_space_transform() {
        let bones = HashMap::new();
        let bone_world = DMat4::from_translation(DVec3::new(0.0, 0.0, 100.0));
        let ctx = MeshExportContext {
            bone_indices: &bones,
            bone_space: Some(bone_world.inverse()),
        };
        let mut diagnostics = Diagnostics::new();

        let nud = export_mesh(&quad(), &ctx, &mut diagnostics).unwrap().unwrap();
        assert!((nud.vertices[0].position[2] + 1.0).abs() < 1e-6);
        assert_eq!(nud.vertices[0].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_missing_vertex_is_an_error() {
        let mut mesh = quad();
        mesh.triangles.push([corner(0, [0.0; 2]), corner(1, [0.0; 2]), corner(9, [0.0; 2])]);

        let bones = HashMap::new();
        let ctx = MeshExportContext {
            bone_indices: &bones,
            bone_space: None,
        };
        assert!(export_mesh(&mesh, &ctx, &mut Diagnostics::new()).is_err());
    }
}
