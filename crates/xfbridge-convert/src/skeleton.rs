//! Bone hierarchy resolution
//!
//! Export turns armature-space bone matrices into local coordinate nodes;
//! import rebuilds armature-space matrices from coordinate nodes. Both sides
//! go through [`Hierarchy`], an arena of node indices validated once for
//! missing parents, duplicate names and cycles.

use glam::{DMat3, DMat4, DQuat, DVec3};
use std::collections::{HashMap, HashSet};

use xfbridge_core::units::{self, narrow, widen};
use xfbridge_core::{Error, Result};
use xfbridge_nucc::{ClumpChunk, Container, CoordNode};

use crate::scene::SceneBone;

/// Scale magnitudes below this cannot carry recorded signs
const SCALE_EPSILON: f64 = 1e-12;

/// Validated parent/child structure over named nodes
#[derive(Debug, Clone)]
pub struct Hierarchy {
    names: Vec<String>,
    parents: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
    by_name: HashMap<String, usize>,
}

impl Hierarchy {
    /// Build from `(name, parent)` pairs in scene order
    ///
    /// Children and roots keep the order of the input.
    pub fn build<'a, I>(nodes: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
    {
        let nodes: Vec<(&str, Option<&str>)> = nodes.into_iter().collect();

        let mut by_name = HashMap::with_capacity(nodes.len());
        for (i, (name, _)) in nodes.iter().enumerate() {
            if by_name.insert((*name).to_string(), i).is_some() {
                return Err(Error::DuplicateNode {
                    name: (*name).to_string(),
                });
            }
        }

        let mut parents = Vec::with_capacity(nodes.len());
        let mut children = vec![Vec::new(); nodes.len()];
        let mut roots = Vec::new();

        for (i, (name, parent)) in nodes.iter().enumerate() {
            match parent {
                Some(parent) => {
                    let p = *by_name.get(*parent).ok_or_else(|| Error::MissingParent {
                        node: (*name).to_string(),
                        parent: (*parent).to_string(),
                    })?;
                    parents.push(Some(p));
                    children[p].push(i);
                }
                None => {
                    parents.push(None);
                    roots.push(i);
                }
            }
        }

        let hierarchy = Self {
            names: nodes.iter().map(|(n, _)| (*n).to_string()).collect(),
            parents,
            children,
            roots,
            by_name,
        };
        hierarchy.check_acyclic()?;

        Ok(hierarchy)
    }

    /// Every node must be reachable from a root; the ones that are not sit on a cycle
    fn check_acyclic(&self) -> Result<()> {
        let mut visited = HashSet::with_capacity(self.names.len());
        let mut stack: Vec<usize> = self.roots.clone();

        while let Some(i) = stack.pop() {
            if visited.insert(i) {
                stack.extend(self.children[i].iter().copied());
            }
        }

        match (0..self.names.len()).find(|i| !visited.contains(i)) {
            Some(i) => Err(Error::CyclicHierarchy {
                node: self.names[i].clone(),
            }),
            None => Ok(()),
        }
    }

    /// Put the children of `node` in the order of `listed`
    ///
    /// Children the list does not mention keep their relative order after it.
    pub fn order_children(&mut self, node: usize, listed: &[String]) -> Result<()> {
        let mut ordered = Vec::with_capacity(self.children[node].len());

        for child in listed {
            let c = *self.by_name.get(child).ok_or_else(|| Error::MissingChild {
                node: self.names[node].clone(),
                child: child.clone(),
            })?;
            if self.parents[c] == Some(node) && !ordered.contains(&c) {
                ordered.push(c);
            }
        }

        for &c in &self.children[node] {
            if !ordered.contains(&c) {
                ordered.push(c);
            }
        }

        self.children[node] = ordered;
        Ok(())
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether there are no nodes
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Node name
    pub fn name(&self, node: usize) -> &str {
        &self.names[node]
    }

    /// Parent index
    pub fn parent(&self, node: usize) -> Option<usize> {
        self.parents[node]
    }

    /// Child indices, in traversal order
    pub fn children(&self, node: usize) -> &[usize] {
        &self.children[node]
    }

    /// Parent-first traversal: roots in order, each followed by its subtree
    pub fn preorder(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.names.len());
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();

        while let Some(i) = stack.pop() {
            order.push(i);
            stack.extend(self.children[i].iter().rev().copied());
        }

        order
    }
}

/// Convert scene bones into coordinate nodes, parent-first
///
/// Each node stores `parent_world⁻¹ · world` decomposed into translation,
/// rotation and scale. The scale is stored as magnitude times sign; when the
/// bone recorded its signs on import and they agree with the matrix, they
/// are used so the rotation comes out as it went in.
pub fn export_bones(bones: &[SceneBone]) -> Result<Vec<CoordNode>> {
    let hierarchy = Hierarchy::build(bones.iter().map(|b| (b.name.as_str(), b.parent.as_deref())))?;

    let mut nodes = Vec::with_capacity(bones.len());
    let mut slot_of = vec![0usize; bones.len()];

    for i in hierarchy.preorder() {
        let bone = &bones[i];
        let parent_world = hierarchy.parent(i).map_or(DMat4::IDENTITY, |p| bones[p].world);
        let local = parent_world.inverse() * bone.world;

        let (translation, rotation, scale) = decompose(&local, bone.scale_signs);

        let mut node = CoordNode::new(bone.name.clone());
        node.parent = hierarchy.parent(i).map(|p| bones[p].name.clone());
        node.position = narrow(units::position_to_external(translation));
        node.rotation = narrow(units::quat_to_degrees(rotation));
        node.scale = narrow(scale);
        if let Some(unk_float) = bone.unk_float {
            node.unk_float = unk_float;
        }
        if let Some(unk_short) = bone.unk_short {
            node.unk_short = unk_short;
        }

        slot_of[i] = nodes.len();
        nodes.push(node);
    }

    // Children lists are filled once every node exists
    for i in hierarchy.preorder() {
        if let Some(p) = hierarchy.parent(i) {
            let name = nodes[slot_of[i]].name.clone();
            nodes[slot_of[p]].children.push(name);
        }
    }

    tracing::debug!(bones = nodes.len(), "Exported bone hierarchy");
    Ok(nodes)
}

/// Split a local matrix into translation, rotation and signed scale
fn decompose(local: &DMat4, recorded_signs: Option<[f64; 3]>) -> (DVec3, DQuat, DVec3) {
    let (scale, rotation, translation) = local.to_scale_rotation_translation();
    let magnitude = scale.abs();

    let recorded = recorded_signs
        .map(DVec3::from_array)
        .filter(|signs| {
            let flips = signs.x * signs.y * signs.z < 0.0;
            flips == (local.determinant() < 0.0) && magnitude.min_element() > SCALE_EPSILON
        });

    match recorded {
        Some(signs) => {
            let basis = DMat3::from_mat4(*local);
            let signed = magnitude * signs;
            let rotation = DMat3::from_cols(
                basis.x_axis / signed.x,
                basis.y_axis / signed.y,
                basis.z_axis / signed.z,
            );
            (translation, DQuat::from_mat3(&rotation).normalize(), signed)
        }
        None => (translation, rotation, magnitude * scale.signum()),
    }
}

/// Rebuild scene bones for a clump, parent-first
///
/// `world = parent_world · T · R · S`, with S the absolute stored scale
/// multiplied by the stored signs. The signs are recorded on the bone so a
/// later export can restore them.
pub fn import_bones(container: &Container, clump: &ClumpChunk) -> Result<Vec<SceneBone>> {
    let nodes = clump
        .coords
        .iter()
        .map(|&id| container.coord(id).map(|c| &c.node))
        .collect::<Result<Vec<&CoordNode>>>()?;

    let mut hierarchy = Hierarchy::build(nodes.iter().map(|n| (n.name.as_str(), n.parent.as_deref())))?;
    for (i, node) in nodes.iter().enumerate() {
        hierarchy.order_children(i, &node.children)?;
    }

    let mut worlds = vec![DMat4::IDENTITY; nodes.len()];
    let mut bones = Vec::with_capacity(nodes.len());

    for i in hierarchy.preorder() {
        let node = nodes[i];
        let parent_world = hierarchy.parent(i).map_or(DMat4::IDENTITY, |p| worlds[p]);

        let signs: [f64; 3] = node.scale.map(|s| if s < 0.0 { -1.0 } else { 1.0 });
        let scale = widen(node.scale).abs() * DVec3::from_array(signs);
        let local = DMat4::from_scale_rotation_translation(
            scale,
            units::quat_from_degrees(widen(node.rotation)),
            units::position_to_scene(widen(node.position)),
        );
        let world = parent_world * local;
        worlds[i] = world;

        bones.push(SceneBone {
            name: node.name.clone(),
            parent: node.parent.clone(),
            world,
            local,
            scale_signs: Some(signs),
            unk_float: Some(node.unk_float),
            unk_short: Some(node.unk_short),
        });
    }

    tracing::debug!(clump = %clump.name, bones = bones.len(), "Imported bone hierarchy");
    Ok(bones)
}
