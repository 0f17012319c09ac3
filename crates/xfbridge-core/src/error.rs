//! Unified error handling for xfbridge
//!
//! Every fatal condition of an export or import ends up as one of these
//! variants. Recoverable problems (a sub-mesh over capacity, a bad texture)
//! are not errors: they are reported as [`crate::Diagnostic`]s instead.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for all xfbridge operations
#[derive(Error, Debug)]
pub enum Error {
    // ==================== I/O Errors ====================

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Container snapshot (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ==================== Structural Errors ====================

    /// Bone export disabled and there is no previous clump to take bones from
    #[error("Cannot export bones for clump '{clump}': bone export is disabled and no existing clump was found")]
    MissingBones {
        clump: String,
    },

    /// Mesh export disabled and there is no previous clump to take models from
    #[error("Cannot export meshes for clump '{clump}': mesh export is disabled and no existing clump was found")]
    MissingMeshes {
        clump: String,
    },

    /// A coordinate node names a parent that is not part of the clump
    #[error("Node '{node}' references missing parent '{parent}'")]
    MissingParent {
        node: String,
        parent: String,
    },

    /// A coordinate node lists a child that is not part of the clump
    #[error("Node '{node}' references missing child '{child}'")]
    MissingChild {
        node: String,
        child: String,
    },

    /// The parent relation contains a cycle
    #[error("Cyclic bone hierarchy detected at node '{node}'")]
    CyclicHierarchy {
        node: String,
    },

    /// Two coordinate nodes share a name within one clump
    #[error("Duplicate node name '{name}'")]
    DuplicateNode {
        name: String,
    },

    /// A chunk reference points outside the container's chunk table
    #[error("Dangling chunk reference {id} in '{from}'")]
    DanglingReference {
        from: String,
        id: u32,
    },

    /// A chunk reference points at a chunk of the wrong kind
    #[error("Chunk {id} referenced from '{from}' is a {found}, expected {expected}")]
    WrongChunkKind {
        from: String,
        id: u32,
        expected: String,
        found: String,
    },

    // ==================== General Errors ====================

    /// Invalid data structure
    #[error("Invalid data: {message}")]
    InvalidData {
        message: String,
    },

    /// Custom error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

/// Result type using the unified Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an error with additional context
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Error::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create an invalid data error
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Error::InvalidData {
            message: message.into(),
        }
    }

    /// Check if this is a "not found" type error
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::FileNotFound(_) => true,
            Error::WithContext { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error comes from the graph structure (as opposed to I/O)
    pub fn is_structural(&self) -> bool {
        match self {
            Error::MissingBones { .. }
            | Error::MissingMeshes { .. }
            | Error::MissingParent { .. }
            | Error::MissingChild { .. }
            | Error::CyclicHierarchy { .. }
            | Error::DuplicateNode { .. }
            | Error::DanglingReference { .. }
            | Error::WrongChunkKind { .. } => true,
            Error::WithContext { source, .. } => source.is_structural(),
            _ => false,
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}
