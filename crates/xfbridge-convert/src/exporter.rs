//! Scene -> container export

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use xfbridge_core::{Diagnostic, DiagnosticKind, Diagnostics, Result, UnitKind};
use xfbridge_nucc::logging::timed;
use xfbridge_nucc::{is_valid_nut, Container, ContainerCodec, TextureChunk};

use crate::assembler::{ClumpAssembler, ClumpSummary};
use crate::scene::{Armature, Scene};
use crate::settings::ExportSettings;

/// Outcome of an export
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportReport {
    /// Clumps written, in scene order
    pub clumps: Vec<ClumpSummary>,
    /// Texture pages written
    pub textures: usize,
    /// Units skipped along the way
    pub diagnostics: Diagnostics,
    /// Wall time of the whole operation
    pub elapsed: Duration,
}

/// Writes scenes into containers
pub struct Exporter<C: ContainerCodec> {
    codec: C,
    settings: ExportSettings,
}

impl<C: ContainerCodec> Exporter<C> {
    /// Create an exporter
    pub fn new(codec: C, settings: ExportSettings) -> Self {
        Self { codec, settings }
    }

    /// Export options in use
    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Export a scene to `path`
    ///
    /// When merging, the existing container must exist. The file is only
    /// written once every clump has been assembled; any fatal error leaves
    /// it untouched. Chunks no page reaches are dropped before writing.
    pub fn export(&self, scene: &Scene, path: &Path) -> Result<ExportReport> {
        let target = path.display().to_string();
        let (result, elapsed) = timed("export", &target, || -> Result<ExportReport> {
            let mut container = if self.settings.inject_to_container {
                self.codec.read_file(path)?
            } else {
                Container::new()
            };

            let mut report = self.export_into(scene, &mut container)?;

            // Superseded coords, dropped models and unused materials are not written
            let remap = container.prune()?;
            for summary in &mut report.clumps {
                if let Some(&id) = remap.get(&summary.id) {
                    summary.id = id;
                }
            }

            self.codec.write_file(&container, path)?;
            Ok(report)
        });

        let mut report = result?;
        report.elapsed = elapsed;
        tracing::info!(
            skipped = report.diagnostics.len(),
            "Finished exporting {} in {:.2}s",
            scene.name,
            elapsed.as_secs_f64()
        );

        Ok(report)
    }

    /// Export a scene into an in-memory container
    ///
    /// Chunk ids stay stable; nothing is pruned. On error the container is
    /// left as it was.
    pub fn export_into(&self, scene: &Scene, container: &mut Container) -> Result<ExportReport> {
        let before = container.clone();
        let result = self.assemble_all(scene, container);
        if result.is_err() {
            *container = before;
        }
        result
    }

    fn assemble_all(&self, scene: &Scene, container: &mut Container) -> Result<ExportReport> {
        let settings = self.settings.effective();
        let mut report = ExportReport::default();

        for armature in &scene.armatures {
            if settings.export_textures {
                report.textures += add_textures(armature, container, &mut report.diagnostics)?;
            }

            let summary = ClumpAssembler::new(container, &settings).assemble(armature, &mut report.diagnostics)?;
            container.add_clump_page(summary.id)?;
            report.clumps.push(summary);
        }

        Ok(report)
    }
}

/// Add a page for every included texture of an armature whose file is a valid NUT
fn add_textures(armature: &Armature, container: &mut Container, diagnostics: &mut Diagnostics) -> Result<usize> {
    let mut added = 0;

    for texture in &armature.clump.texture_chunks {
        let Some(nut_path) = texture.nut_path.as_deref().filter(|p| texture.include && p.is_file()) else {
            continue;
        };

        let data = match fs::read(nut_path) {
            Ok(data) => data,
            Err(e) => {
                diagnostics.push(Diagnostic::new(
                    UnitKind::Texture,
                    &texture.texture_name,
                    DiagnosticKind::UnreadableTexture {
                        path: nut_path.to_path_buf(),
                        reason: e.to_string(),
                    },
                ));
                continue;
            }
        };

        if !is_valid_nut(&data) {
            diagnostics.push(Diagnostic::new(
                UnitKind::Texture,
                &texture.texture_name,
                DiagnosticKind::InvalidTexture {
                    path: nut_path.to_path_buf(),
                },
            ));
            continue;
        }

        let id = container.insert(TextureChunk::with_data(&texture.path, &texture.texture_name, data));
        container.add_chunk_page(id)?;
        added += 1;
    }

    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use xfbridge_nucc::JsonCodec;

    use crate::scene::TextureChunkProps;

    fn texture(name: &str, file: &tempfile::NamedTempFile) -> TextureChunkProps {
        TextureChunkProps {
            path: format!("c/1foo/tex/{name}.nut"),
            texture_name: name.to_string(),
            include: true,
            nut_path: Some(file.path().to_path_buf()),
        }
    }

    #[test]
    fn test_textures_checked_for_signature() {
        let mut good = tempfile::NamedTempFile::new().unwrap();
        good.write_all(b"NTP3\x00\x01\x02").unwrap();
        let mut bad = tempfile::NamedTempFile::new().unwrap();
        bad.write_all(b"DDS \x00\x01").unwrap();

        let mut armature = Armature::default();
        armature.clump.texture_chunks = vec![texture("good", &good), texture("bad", &bad)];

        let mut container = Container::new();
        let mut diagnostics = Diagnostics::new();
        assert_eq!(add_textures(&armature, &mut container, &mut diagnostics).unwrap(), 1);

        assert_eq!(container.pages().len(), 1);
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(
            diagnostics.entries()[0].kind,
            DiagnosticKind::InvalidTexture { .. }
        ));
    }

    #[test]
    fn test_excluded_texture_ignored() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"NTP3data").unwrap();

        let mut armature = Armature::default();
        let mut props = texture("skip", &file);
        props.include = false;
        armature.clump.texture_chunks = vec![props];

        let mut container = Container::new();
        let mut diagnostics = Diagnostics::new();
        assert_eq!(add_textures(&armature, &mut container, &mut diagnostics).unwrap(), 0);
        assert!(container.is_empty());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_inject_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(JsonCodec::new(), ExportSettings::default());

        let err = exporter
            .export(&Scene::default(), &dir.path().join("missing.json"))
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
