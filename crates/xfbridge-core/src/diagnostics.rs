//! Recoverable conversion problems
//!
//! A multi-model container should not fail wholesale over one bad sub-mesh,
//! so content problems are collected as diagnostics while the conversion
//! carries on with the remaining units.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// What went wrong with a skipped unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// Sub-mesh has more vertices than a mesh can index
    TooManyVertices { count: usize, limit: usize },
    /// Sub-mesh has more triangles than a mesh can hold
    TooManyTriangles { count: usize, limit: usize },
    /// Sub-mesh has fewer than 3 vertices, so no valid faces
    TooFewVertices { count: usize },
    /// Sub-mesh names a container material that does not exist
    UnknownMaterial { material: String },
    /// Texture asset does not carry the NTP3 signature
    InvalidTexture { path: PathBuf },
    /// Texture asset could not be read
    UnreadableTexture { path: PathBuf, reason: String },
    /// Triangles collapsed to fewer than 3 distinct vertices
    DegenerateTriangles { count: usize },
    /// Model has no exported sub-meshes left
    EmptyModel,
    /// Clump references chunks that are not models
    UnsupportedChunk { count: usize },
    /// Vertex references a bone index outside the clump's bone table
    UnknownBoneIndex { index: u32 },
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::TooManyVertices { count, limit } => {
                write!(f, "has {count} vertices (limit is {limit}) and will be skipped")
            }
            DiagnosticKind::TooManyTriangles { count, limit } => {
                write!(f, "has {count} faces (limit is {limit}) and will be skipped")
            }
            DiagnosticKind::TooFewVertices { .. } => {
                write!(f, "has no valid faces and will be skipped")
            }
            DiagnosticKind::UnknownMaterial { material } => {
                write!(f, "has a non-existing XFBIN material '{material}' and will be skipped")
            }
            DiagnosticKind::InvalidTexture { path } => {
                write!(f, "path {} is not a valid NUT file and will be skipped", path.display())
            }
            DiagnosticKind::UnreadableTexture { path, reason } => {
                write!(f, "path {} could not be read ({reason}) and will be skipped", path.display())
            }
            DiagnosticKind::DegenerateTriangles { count } => {
                write!(f, "had {count} degenerate triangle(s) removed")
            }
            DiagnosticKind::EmptyModel => {
                write!(f, "does not contain any exported meshes and will be skipped")
            }
            DiagnosticKind::UnsupportedChunk { count } => {
                write!(f, "references {count} chunk(s) with unsupported types that will not be imported")
            }
            DiagnosticKind::UnknownBoneIndex { index } => {
                write!(f, "references bone index {index} outside the clump's bone table")
            }
        }
    }
}

/// Which part of the pipeline raised a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    /// A sub-mesh of a model
    Mesh,
    /// A whole model
    Model,
    /// A texture chunk
    Texture,
    /// A clump
    Clump,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            UnitKind::Mesh => "NUD MESH",
            UnitKind::Model => "NUD",
            UnitKind::Texture => "NUT",
            UnitKind::Clump => "CLUMP",
        };
        f.write_str(tag)
    }
}

/// A skipped (or partially skipped) unit, named for the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Kind of unit
    pub unit_kind: UnitKind,
    /// Name of the unit
    pub unit: String,
    /// Violated condition
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    /// Create a diagnostic for a named unit
    pub fn new(unit_kind: UnitKind, unit: impl Into<String>, kind: DiagnosticKind) -> Self {
        Self {
            unit_kind,
            unit: unit.into(),
            kind,
        }
    }

    /// Log this diagnostic as a warning and hand it back
    pub fn emit(self) -> Self {
        tracing::warn!(unit = %self.unit, kind = %self.unit_kind, "{}", self);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}", self.unit_kind, self.unit, self.kind)
    }
}

/// Ordered collection of diagnostics from one operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Log and record a diagnostic
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic.emit());
    }

    /// Record diagnostics that were already logged elsewhere
    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    /// All recorded diagnostics, in the order they were raised
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Number of diagnostics
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was reported
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Diagnostics raised for a given unit name
    pub fn for_unit<'a>(&'a self, unit: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.entries.iter().filter(move |d| d.unit == unit)
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_message_names_unit_and_limit() {
        let diagnostic = Diagnostic::new(
            UnitKind::Mesh,
            "body (1) [skin]",
            DiagnosticKind::TooManyVertices { count: 40000, limit: 32767 },
        );
        let message = diagnostic.to_string();

        assert!(message.starts_with("[NUD MESH] body (1) [skin]"));
        assert!(message.contains("40000"));
        assert!(message.contains("32767"));
    }

    #[test]
    fn test_for_unit_filters() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(Diagnostic::new(UnitKind::Model, "a", DiagnosticKind::EmptyModel));
        diagnostics.push(Diagnostic::new(UnitKind::Model, "b", DiagnosticKind::EmptyModel));

        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics.for_unit("b").count(), 1);
    }
}
