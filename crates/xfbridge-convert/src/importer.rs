//! Container -> scene import

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use xfbridge_core::units;
use xfbridge_core::{Diagnostic, DiagnosticKind, Diagnostics, Error, Result, UnitKind};
use xfbridge_nucc::logging::timed;
use xfbridge_nucc::{Chunk, ChunkId, ClumpChunk, Container, ContainerCodec, ModelChunk};

use crate::material::{display_material_name, format_hex, host_material, import_xfbin_material};
use crate::mesh::import_mesh;
use crate::scene::{
    Armature, ClumpProperties, ModelGroupProps, NudProperties, Scene, SceneBone, SceneModel, TextureChunkProps,
    CLUMP_SUFFIX, NULL_MODEL,
};
use crate::settings::ImportSettings;
use crate::skeleton::import_bones;

/// Outcome of an import
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    /// Clump names, in page order
    pub clumps: Vec<String>,
    /// Models imported across all clumps
    pub models: usize,
    /// Units skipped or cleared along the way
    pub diagnostics: Diagnostics,
    /// Wall time of the whole operation
    pub elapsed: Duration,
}

/// Reads containers into scenes
pub struct Importer<C: ContainerCodec> {
    codec: C,
    settings: ImportSettings,
}

impl<C: ContainerCodec> Importer<C> {
    /// Create an importer
    pub fn new(codec: C, settings: ImportSettings) -> Self {
        Self { codec, settings }
    }

    /// Import the container at `path`; the scene is named after the file
    pub fn import(&self, path: &Path) -> Result<(Scene, ImportReport)> {
        let target = path.display().to_string();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.split('.').next())
            .unwrap_or_default()
            .to_string();

        let (result, elapsed) = timed("import", &target, || {
            let container = self.codec.read_file(path)?;
            self.import_container(&container, &name)
        });

        let (scene, mut report) = result?;
        report.elapsed = elapsed;
        tracing::info!(
            clumps = report.clumps.len(),
            models = report.models,
            "Finished importing {} in {:.2}s",
            scene.name,
            elapsed.as_secs_f64()
        );

        Ok((scene, report))
    }

    /// Build a scene from an in-memory container
    pub fn import_container(&self, container: &Container, name: &str) -> Result<(Scene, ImportReport)> {
        let mut report = ImportReport::default();
        let mut scene = Scene {
            name: name.to_string(),
            ..Scene::default()
        };

        for (_, clump) in container.clumps() {
            let armature = self.import_clump(container, clump, &mut report.diagnostics)?;
            report.clumps.push(clump.name.clone());
            report.models += armature.models.len();
            scene.armatures.push(armature);
        }

        // Every texture listed on a page, once
        let mut seen = std::collections::HashSet::new();
        for page in container.pages() {
            for &id in &page.chunks {
                if let Some(Chunk::Texture(texture)) = container.get(id) {
                    if seen.insert(id) {
                        scene.textures.push(TextureChunkProps {
                            path: texture.path.clone(),
                            texture_name: texture.name.clone(),
                            include: true,
                            nut_path: None,
                        });
                    }
                }
            }
        }

        Ok((scene, report))
    }

    fn import_clump(&self, container: &Container, clump: &ClumpChunk, diagnostics: &mut Diagnostics) -> Result<Armature> {
        let _span = tracing::info_span!("clump", clump = %clump.name).entered();

        let bones = import_bones(container, clump)?;
        let bone_names = clump
            .coords
            .iter()
            .map(|&id| container.coord(id).map(|c| c.node.name.clone()))
            .collect::<Result<Vec<_>>>()?;

        let mut models: Vec<&ModelChunk> = Vec::new();
        let mut unsupported = 0;
        for id in clump.all_models() {
            match container.get(id) {
                Some(Chunk::Model(model)) => models.push(model),
                Some(_) => unsupported += 1,
                None => {
                    return Err(Error::DanglingReference {
                        from: clump.name.clone(),
                        id: id.0,
                    })
                }
            }
        }
        if unsupported > 0 {
            diagnostics.push(Diagnostic::new(
                UnitKind::Clump,
                &clump.name,
                DiagnosticKind::UnsupportedChunk { count: unsupported },
            ));
        }

        let mut material_ids: Vec<ChunkId> = Vec::new();
        for &id in models.iter().flat_map(|m| &m.materials) {
            if !material_ids.contains(&id) {
                material_ids.push(id);
            }
        }
        let materials = material_ids
            .iter()
            .map(|&id| import_xfbin_material(container.material(id)?, container))
            .collect::<Result<Vec<_>>>()?;

        let mut texture_chunks: Vec<TextureChunkProps> = Vec::new();
        for texture in materials.iter().flat_map(|m| &m.texture_groups).flat_map(|g| &g.textures) {
            if !texture_chunks
                .iter()
                .any(|t| t.path == texture.path && t.texture_name == texture.texture_name)
            {
                texture_chunks.push(TextureChunkProps {
                    path: texture.path.clone(),
                    texture_name: texture.texture_name.clone(),
                    include: true,
                    nut_path: None,
                });
            }
        }

        let model_name = |id: ChunkId| container.get(id).map_or_else(String::new, |c| c.name().to_string());
        let properties = ClumpProperties {
            path: clump.path.clone(),
            field00: clump.field00,
            coord_flag0: clump.coord_flag0,
            coord_flag1: clump.coord_flag1,
            model_flag0: clump.model_flag0,
            model_flag1: clump.model_flag1,
            models: clump.models.iter().map(|&id| model_name(id)).collect(),
            model_groups: clump
                .model_groups
                .iter()
                .map(|g| ModelGroupProps {
                    flag0: g.flag0,
                    flag1: g.flag1,
                    unk: format_hex(g.unk, 4),
                    models: g
                        .models
                        .iter()
                        .map(|id| id.map_or_else(|| NULL_MODEL.to_string(), model_name))
                        .collect(),
                })
                .collect(),
            materials,
            texture_chunks,
        };

        let host_materials = properties.materials.iter().map(host_material).collect();

        let scene_models = models
            .iter()
            .map(|model| self.import_model(container, clump, model, &bones, &bone_names, diagnostics))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(bones = bones.len(), models = scene_models.len(), "Imported clump");

        Ok(Armature {
            name: format!("{}{CLUMP_SUFFIX}", clump.name),
            bones,
            clump: properties,
            models: scene_models,
            host_materials,
        })
    }

    fn import_model(
        &self,
        container: &Container,
        clump: &ClumpChunk,
        model: &ModelChunk,
        bones: &[SceneBone],
        bone_names: &[String],
        diagnostics: &mut Diagnostics,
    ) -> Result<SceneModel> {
        let mesh_bone = bone_names.get(model.coord_index as usize).cloned().unwrap_or_default();
        let bone_world = bones.iter().find(|b| b.name == mesh_bone).map(|b| b.world);

        // Models without weighted bones hang off their mesh bone; the rest are moved out of its space
        let (parent_bone, surface_world) = match bone_world {
            Some(_) if model.nud.bone_range() == (0, 0) => (Some(mesh_bone.clone()), None),
            Some(world) => (None, Some(world)),
            None => (None, None),
        };

        let mut meshes = Vec::with_capacity(model.nud.mesh_count());
        let mut material_slot = 0;
        for group in &model.nud.mesh_groups {
            for (i, mesh) in group.meshes.iter().enumerate() {
                let &material_id = model.materials.get(material_slot).ok_or_else(|| {
                    Error::invalid_data(format!(
                        "model '{}' has no material for mesh {}",
                        model.name,
                        material_slot + 1
                    ))
                })?;
                material_slot += 1;

                let material = container.material(material_id)?;
                let display = if self.settings.use_full_material_names {
                    material.name.as_str()
                } else {
                    display_material_name(&material.name, &clump.name)
                };
                let name = if display.is_empty() {
                    group.name.clone()
                } else {
                    format!("{} ({}) [{display}]", group.name, i + 1)
                };

                meshes.push(import_mesh(mesh, &name, &material.name, bone_names, surface_world, diagnostics));
            }
        }

        let first_group = model.nud.mesh_groups.first();
        Ok(SceneModel {
            name: model.name.clone(),
            parent_bone,
            nud: NudProperties {
                mesh_bone,
                rigging_flag: model.rigging_flag.base(),
                rigging_flag_extra: model.rigging_flag.extra(),
                material_flags: model.material_flags,
                flag1_floats: model.flag1_floats.unwrap_or_default(),
                bone_flag: first_group.map_or(0, |g| g.bone_flags),
                bounding_sphere_nud: units::sphere_to_scene(model.nud.bounding_sphere),
                bounding_sphere_group: first_group.map_or([0.0; 8], |g| units::sphere_to_scene(g.bounding_sphere)),
            },
            meshes,
        })
    }
}
