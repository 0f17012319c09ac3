//! Coordinate chunks (skeleton nodes)

use serde::{Deserialize, Serialize};

/// A named node of the clump skeleton
///
/// Parent and children are referenced by name; names are unique within a
/// clump. Sibling order is the order of `children`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordNode {
    /// Node name
    pub name: String,
    /// Parent node name
    pub parent: Option<String>,
    /// Child node names, in traversal order
    pub children: Vec<String>,
    /// Local translation (container units)
    pub position: [f32; 3],
    /// Local rotation, degrees
    pub rotation: [f32; 3],
    /// Local scale, sign included
    pub scale: [f32; 3],
    /// Opaque value carried through unchanged
    pub unk_float: f32,
    /// Opaque value carried through unchanged
    pub unk_short: u16,
}

impl CoordNode {
    /// Create a root node with an identity transform
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
            unk_float: 1.0,
            unk_short: 0,
        }
    }
}

/// Coordinate chunk wrapping one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordChunk {
    /// File path
    pub path: String,
    /// Node; its name is the chunk name
    pub node: CoordNode,
}

impl CoordChunk {
    /// Create a coordinate chunk
    pub fn new(path: impl Into<String>, node: CoordNode) -> Self {
        Self {
            path: path.into(),
            node,
        }
    }
}
