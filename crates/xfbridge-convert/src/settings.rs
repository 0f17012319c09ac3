//! Export and import options

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Allow/deny entry for one model holder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshSelection {
    /// Model name
    pub name: String,
    /// `true` exports the model, `false` carries the previous one over
    pub value: bool,
}

impl MeshSelection {
    /// Create a selection entry
    pub fn new(name: impl Into<String>, value: bool) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Export options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Merge into the existing container instead of writing a new one
    pub inject_to_container: bool,
    /// Rebuild models from the scene
    pub export_meshes: bool,
    /// Rebuild coordinates from the scene
    pub export_bones: bool,
    /// Add texture pages
    pub export_textures: bool,
    /// Only export the models named in `meshes_to_export`
    pub export_specific_meshes: bool,
    /// Per-model allow/deny list
    pub meshes_to_export: Vec<MeshSelection>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            inject_to_container: true,
            export_meshes: true,
            export_bones: true,
            export_textures: true,
            export_specific_meshes: false,
            meshes_to_export: Vec::new(),
        }
    }
}

impl ExportSettings {
    /// Settings for writing a fresh container
    pub fn new_container() -> Self {
        Self {
            inject_to_container: false,
            ..Self::default()
        }
    }

    /// Settings with the flags a fresh container forces on
    ///
    /// Without a container to merge into there is nothing to carry over, so
    /// meshes, bones and textures are always exported.
    pub fn effective(&self) -> Self {
        if self.inject_to_container {
            return self.clone();
        }
        Self {
            export_meshes: true,
            export_bones: true,
            export_textures: true,
            ..self.clone()
        }
    }

    /// The allow/deny list by name, when only specific meshes are exported
    pub fn selection(&self) -> Option<HashMap<&str, bool>> {
        self.export_specific_meshes
            .then(|| self.meshes_to_export.iter().map(|m| (m.name.as_str(), m.value)).collect())
    }
}

/// Import options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Keep material names as stored instead of stripping the clump prefix
    pub use_full_material_names: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_defaults() {
        let settings = ExportSettings::default();
        assert!(settings.inject_to_container);
        assert!(settings.export_meshes && settings.export_bones && settings.export_textures);
        assert!(!settings.export_specific_meshes);
        assert!(settings.selection().is_none());
    }

    #[test]
    fn test_new_container_forces_flags() {
        let settings = ExportSettings {
            inject_to_container: false,
            export_bones: false,
            export_meshes: false,
            export_textures: false,
            ..ExportSettings::default()
        };
        let effective = settings.effective();
        assert!(effective.export_bones && effective.export_meshes && effective.export_textures);

        let injecting = ExportSettings {
            export_bones: false,
            ..ExportSettings::default()
        };
        assert!(!injecting.effective().export_bones);
    }

    #[test]
    fn test_settings_from_partial_json() {
        let settings: ExportSettings = serde_json::from_str(
            r#"{"export_bones": false, "export_specific_meshes": true,
                "meshes_to_export": [{"name": "body", "value": false}]}"#,
        )
        .unwrap();

        assert!(settings.inject_to_container);
        assert!(!settings.export_bones);
        assert_eq!(settings.selection().unwrap().get("body"), Some(&false));
    }
}
