//! Chunk graph assembly for one clump
//!
//! [`ClumpAssembler`] turns an armature into a clump chunk plus the coord,
//! model, material and texture chunks it references, merging with the clump
//! of the same name already in the container. Merge decisions, the bone
//! index table and the material table are settled first; models are then
//! converted in parallel and inserted in scene order.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use xfbridge_core::units;
use xfbridge_core::{Diagnostic, DiagnosticKind, Diagnostics, Error, Result, UnitKind};
use xfbridge_nucc::{ChunkId, ClumpChunk, Container, CoordChunk, ModelChunk, ModelGroup, NudMeshGroup};

use crate::material::{export_xfbin_material, parse_hex};
use crate::mesh::{export_mesh, MeshExportContext};
use crate::scene::{Armature, SceneModel, NULL_MODEL};
use crate::settings::ExportSettings;
use crate::skeleton::export_bones;

/// What was written for one clump
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClumpSummary {
    /// Clump name
    pub name: String,
    /// Clump chunk id
    pub id: ChunkId,
    /// Distinct models referenced by the clump
    pub models: usize,
}

/// Read-only inputs shared by every model conversion of a clump
#[derive(Clone, Copy)]
struct ModelContext<'a> {
    path: &'a str,
    clump_id: ChunkId,
    bone_indices: &'a HashMap<String, u32>,
    materials: &'a HashMap<String, ChunkId>,
    armature: &'a Armature,
}

/// One model holder's fate
#[derive(Clone, Copy)]
enum Step<'a> {
    Build(&'a SceneModel),
    Reuse { name: &'a str, id: ChunkId },
}

/// Writes clumps into a container
pub struct ClumpAssembler<'a> {
    container: &'a mut Container,
    settings: ExportSettings,
}

impl<'a> ClumpAssembler<'a> {
    /// Create an assembler; forced flags of `settings` are applied here
    pub fn new(container: &'a mut Container, settings: &ExportSettings) -> Self {
        Self {
            container,
            settings: settings.effective(),
        }
    }

    /// Assemble the clump of one armature and store it in the container
    ///
    /// The previous clump with the same name, if any, keeps its chunk id so
    /// pages and references to it stay valid.
    pub fn assemble(&mut self, armature: &Armature, diagnostics: &mut Diagnostics) -> Result<ClumpSummary> {
        let name = armature.clump_name();
        let props = &armature.clump;
        let _span = tracing::info_span!("clump", clump = %name).entered();

        let old = match self.settings.inject_to_container.then(|| self.container.find_clump(name)).flatten() {
            Some(id) => Some((id, self.container.clump(id)?.clone())),
            None => None,
        };
        let old_clump = old.as_ref().map(|(_, clump)| clump);

        // Nothing is written until the clump is known to be buildable
        if old_clump.is_none() {
            if !self.settings.export_bones {
                return Err(Error::MissingBones {
                    clump: name.to_string(),
                });
            }
            if !self.settings.export_meshes {
                return Err(Error::MissingMeshes {
                    clump: name.to_string(),
                });
            }
        }

        // Placeholder so models can point at the clump before it is filled in
        let clump_id = match &old {
            Some((id, _)) => *id,
            None => self.container.insert(ClumpChunk::new(props.path.clone(), name)),
        };

        let coords = self.coords(armature, old_clump)?;
        let bone_names = coords
            .iter()
            .map(|&id| self.container.coord(id).map(|c| c.node.name.clone()))
            .collect::<Result<Vec<_>>>()?;

        let (models, model_groups) = if self.settings.export_meshes {
            self.models(armature, clump_id, &bone_names, old_clump, diagnostics)?
        } else if let Some(old) = old_clump {
            (old.models.clone(), old.model_groups.clone())
        } else {
            return Err(Error::MissingMeshes {
                clump: name.to_string(),
            });
        };

        let clump = ClumpChunk {
            path: props.path.clone(),
            name: name.to_string(),
            field00: props.field00,
            coord_flag0: props.coord_flag0,
            coord_flag1: props.coord_flag1,
            model_flag0: props.model_flag0,
            model_flag1: props.model_flag1,
            coords,
            models,
            model_groups,
        };
        let model_count = clump.all_models().len();
        self.container.replace(clump_id, clump)?;

        tracing::info!(bones = bone_names.len(), models = model_count, "Assembled clump");

        Ok(ClumpSummary {
            name: name.to_string(),
            id: clump_id,
            models: model_count,
        })
    }

    /// Coordinate chunks, rebuilt from the scene or carried over
    fn coords(&mut self, armature: &Armature, old: Option<&ClumpChunk>) -> Result<Vec<ChunkId>> {
        if self.settings.export_bones {
            let path = &armature.clump.path;
            let nodes = export_bones(&armature.bones)?;
            return Ok(nodes
                .into_iter()
                .map(|node| self.container.insert(CoordChunk::new(path.clone(), node)))
                .collect());
        }

        old.map(|c| c.coords.clone()).ok_or_else(|| Error::MissingBones {
            clump: armature.clump_name().to_string(),
        })
    }

    /// Model list and model groups rebuilt from the scene
    fn models(
        &mut self,
        armature: &Armature,
        clump_id: ChunkId,
        bone_names: &[String],
        old: Option<&ClumpChunk>,
        diagnostics: &mut Diagnostics,
    ) -> Result<(Vec<ChunkId>, Vec<ModelGroup>)> {
        let props = &armature.clump;

        let bone_indices: HashMap<String, u32> = bone_names.iter().cloned().zip(0u32..).collect();

        let mut materials = HashMap::with_capacity(props.materials.len());
        for material in &props.materials {
            let chunk = export_xfbin_material(material, &props.path, self.container)?;
            materials.insert(material.material_name.clone(), self.container.insert(chunk));
        }

        let mut previous: HashMap<String, ChunkId> = HashMap::new();
        for id in old.map(ClumpChunk::all_models).unwrap_or_default() {
            if let Some(model) = self.container.get(id).and_then(|c| c.as_model()) {
                previous.entry(model.name.clone()).or_insert(id);
            }
        }

        let selection = self.settings.selection();
        let mut plan = Vec::with_capacity(armature.models.len());
        for model in &armature.models {
            match selection.as_ref().map(|s| s.get(model.name.as_str()).copied()) {
                Some(None) => {}
                Some(Some(false)) => {
                    if let Some(&id) = previous.get(&model.name) {
                        plan.push(Step::Reuse { name: &model.name, id });
                    }
                }
                _ => plan.push(Step::Build(model)),
            }
        }

        let ctx = ModelContext {
            path: &props.path,
            clump_id,
            bone_indices: &bone_indices,
            materials: &materials,
            armature,
        };

        let outcomes = plan
            .par_iter()
            .map(|step| match *step {
                Step::Build(model) => build_model(model, ctx),
                Step::Reuse { .. } => Ok((None, Diagnostics::new())),
            })
            .collect::<Result<Vec<_>>>()?;

        let mut resolved: HashMap<String, ChunkId> = HashMap::with_capacity(plan.len());
        for (step, (chunk, model_diagnostics)) in plan.iter().zip(outcomes) {
            diagnostics.extend(model_diagnostics);
            match (*step, chunk) {
                (Step::Reuse { name, id }, _) => {
                    resolved.entry(name.to_string()).or_insert(id);
                }
                (Step::Build(model), Some(chunk)) => {
                    let id = self.container.insert(chunk);
                    resolved.insert(model.name.clone(), id);
                }
                (Step::Build(_), None) => {}
            }
        }

        let models = props
            .models
            .iter()
            .filter_map(|name| resolved.get(name).copied())
            .collect();

        let model_groups = props
            .model_groups
            .iter()
            .map(|group| {
                Ok(ModelGroup {
                    flag0: group.flag0,
                    flag1: group.flag1,
                    unk: parse_hex(&group.unk)?,
                    models: group
                        .models
                        .iter()
                        .map(|name| (name != NULL_MODEL).then(|| resolved.get(name).copied()).flatten())
                        .collect(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok((models, model_groups))
    }
}

/// Convert one model holder; `None` when no sub-mesh survives
fn build_model(model: &SceneModel, ctx: ModelContext<'_>) -> Result<(Option<ModelChunk>, Diagnostics)> {
    let mut diagnostics = Diagnostics::new();
    let props = &model.nud;

    let mut chunk = ModelChunk::new(ctx.path, model.name.clone());
    chunk.clump = Some(ctx.clump_id);
    chunk.coord_index = ctx.bone_indices.get(&props.mesh_bone).copied().unwrap_or(0);
    chunk.rigging_flag = props.rigging_flag | props.rigging_flag_extra;
    chunk.set_material_flags(props.material_flags, props.flag1_floats);
    chunk.nud.bounding_sphere = units::sphere_to_external(props.bounding_sphere_nud);

    // Holders parented to a bone already live in its space
    let bone_space = match (&model.parent_bone, ctx.armature.bone(&props.mesh_bone)) {
        (None, Some(bone)) => Some(bone.world.inverse()),
        _ => None,
    };
    let mesh_ctx = MeshExportContext {
        bone_indices: ctx.bone_indices,
        bone_space,
    };

    let mut meshes = Vec::with_capacity(model.meshes.len());
    for mesh in &model.meshes {
        let material_name = &mesh.properties.xfbin_material;
        let Some(&material) = ctx.materials.get(material_name) else {
            diagnostics.push(Diagnostic::new(
                UnitKind::Mesh,
                &mesh.name,
                DiagnosticKind::UnknownMaterial {
                    material: material_name.clone(),
                },
            ));
            continue;
        };

        if let Some(nud_mesh) = export_mesh(mesh, &mesh_ctx, &mut diagnostics)? {
            meshes.push(nud_mesh);
            chunk.materials.push(material);
        }
    }

    if meshes.is_empty() {
        diagnostics.push(Diagnostic::new(UnitKind::Model, &model.name, DiagnosticKind::EmptyModel));
        return Ok((None, diagnostics));
    }

    tracing::debug!(model = %model.name, meshes = meshes.len(), "Built model");

    chunk.nud.mesh_groups = vec![NudMeshGroup {
        name: model.name.clone(),
        bone_flags: props.bone_flag,
        bounding_sphere: units::sphere_to_external(props.bounding_sphere_group),
        meshes,
    }];

    Ok((Some(chunk), diagnostics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{DMat4, DVec3};
    use xfbridge_nucc::Chunk;

    use crate::scene::{
        ModelGroupProps, NudProperties, SceneBone, SceneCorner, SceneMesh, SceneVertex, XfbinMaterialProps,
    };

    fn triangle(material: &str) -> SceneMesh {
        let mut mesh = SceneMesh {
            name: "tri".to_string(),
            vertices: vec![
                SceneVertex::new(DVec3::ZERO, DVec3::Z),
                SceneVertex::new(DVec3::X, DVec3::Z),
                SceneVertex::new(DVec3::Y, DVec3::Z),
            ],
            triangles: vec![[SceneCorner::at(0), SceneCorner::at(1), SceneCorner::at(2)]],
            ..SceneMesh::default()
        };
        mesh.properties.xfbin_material = material.to_string();
        mesh
    }

    fn model(name: &str, material: &str) -> SceneModel {
        SceneModel {
            name: name.to_string(),
            parent_bone: None,
            nud: NudProperties {
                mesh_bone: "spine".to_string(),
                bounding_sphere_nud: [100.0, 0.0, 0.0, 50.0],
                ..NudProperties::default()
            },
            meshes: vec![triangle(material)],
        }
    }

    fn armature() -> Armature {
        let mut armature = Armature {
            name: "1foo [C]".to_string(),
            bones: vec![
                SceneBone::new("root", None, DMat4::IDENTITY),
                SceneBone::new("spine", Some("root"), DMat4::from_translation(DVec3::Z)),
            ],
            models: vec![model("A", "skin"), model("B", "skin")],
            ..Armature::default()
        };
        armature.clump.path = "c/1foo/max/1foo.max".to_string();
        armature.clump.materials = vec![XfbinMaterialProps {
            material_name: "skin".to_string(),
            ..XfbinMaterialProps::default()
        }];
        armature.clump.models = vec!["A".to_string(), "B".to_string()];
        armature.clump.model_groups = vec![ModelGroupProps {
            unk: "CA".to_string(),
            models: vec!["A".to_string(), "None".to_string(), "ghost".to_string(), "B".to_string()],
            ..ModelGroupProps::default()
        }];
        armature
    }

    #[test]
    fn test_assemble_new_clump() {
        let mut container = Container::new();
        let mut diagnostics = Diagnostics::new();

        let summary = ClumpAssembler::new(&mut container, &ExportSettings::new_container())
            .assemble(&armature(), &mut diagnostics)
            .unwrap();

        assert_eq!(summary.name, "1foo");
        assert_eq!(summary.models, 2);

        let clump = container.clump(summary.id).unwrap();
        assert_eq!(clump.coords.len(), 2);
        assert_eq!(clump.models.len(), 2);

        let group = &clump.model_groups[0];
        assert_eq!(group.unk, 0xCA);
        assert_eq!(group.models.len(), 4);
        assert_eq!(group.models[0], Some(clump.models[0]));
        assert_eq!(group.models[1], None);
        assert_eq!(group.models[2], None);

        let model = container.model(clump.models[0]).unwrap();
        assert_eq!(model.clump, Some(summary.id));
        assert_eq!(model.coord_index, 1);
        assert!((model.nud.bounding_sphere[0] - 1.0).abs() < 1e-6);
        assert_eq!(model.nud.mesh_groups[0].name, "A");
    }

    #[test]
    fn test_unknown_material_drops_model() {
        let mut armature = armature();
        armature.models[1] = model("B", "missing");

        let mut container = Container::new();
        let mut diagnostics = Diagnostics::new();
        let summary = ClumpAssembler::new(&mut container, &ExportSettings::new_container())
            .assemble(&armature, &mut diagnostics)
            .unwrap();

        assert_eq!(summary.models, 1);
        let kinds: Vec<_> = diagnostics.entries().iter().map(|d| &d.kind).collect();
        assert!(kinds.iter().any(|k| matches!(k, DiagnosticKind::UnknownMaterial { .. })));
        assert!(kinds.contains(&&DiagnosticKind::EmptyModel));
    }

    #[test]
    fn test_missing_bones_without_previous_clump() {
        let mut container = Container::new();
        let settings = ExportSettings {
            export_bones: false,
            ..ExportSettings::default()
        };

        let err = ClumpAssembler::new(&mut container, &settings)
            .assemble(&armature(), &mut Diagnostics::new())
            .unwrap_err();
        assert!(matches!(err, Error::MissingBones { .. }));
        assert!(container.is_empty());
    }

    #[test]
    fn test_missing_meshes_without_previous_clump() {
        let mut container = Container::new();
        let settings = ExportSettings {
            export_meshes: false,
            ..ExportSettings::default()
        };

        let err = ClumpAssembler::new(&mut container, &settings)
            .assemble(&armature(), &mut Diagnostics::new())
            .unwrap_err();
        assert!(matches!(err, Error::MissingMeshes { .. }));
        assert!(container.is_empty());
    }

    #[test]
    fn test_denied_model_carried_over() {
        let mut container = Container::new();
        let first = ClumpAssembler::new(&mut container, &ExportSettings::new_container())
            .assemble(&armature(), &mut Diagnostics::new())
            .unwrap();
        container.add_clump_page(first.id).unwrap();
        let old_b = container.clump(first.id).unwrap().models[1];

        // B is denied and changed in the scene; the stored B must survive untouched
        let mut armature = armature();
        armature.models[1].meshes.clear();
        let settings = ExportSettings {
            export_specific_meshes: true,
            meshes_to_export: vec![
                crate::settings::MeshSelection::new("A", true),
                crate::settings::MeshSelection::new("B", false),
            ],
            ..ExportSettings::default()
        };

        let second = ClumpAssembler::new(&mut container, &settings)
            .assemble(&armature, &mut Diagnostics::new())
            .unwrap();

        assert_eq!(second.id, first.id);
        let clump = container.clump(second.id).unwrap();
        assert_eq!(clump.models[1], old_b);
        assert!(matches!(container.get(old_b), Some(Chunk::Model(m)) if m.nud.mesh_count() == 1));
    }
}
