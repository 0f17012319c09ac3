// xfbridge-nucc/src/container.rs
//! Chunk container: an arena of typed chunks grouped into pages
//!
//! Chunks are addressed by [`ChunkId`], which stays stable for the life of
//! the container. Inserting a chunk whose (kind, path, name) already exists
//! replaces its data in place and keeps the old id, so every reference to it
//! stays valid. This is what lets a partial re-export carry untouched models
//! forward by id instead of copying them.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use xfbridge_core::{Error, Result};

use crate::chunks::{Chunk, ChunkId, ChunkKey, ChunkKind};
use crate::clump::ClumpChunk;
use crate::coord::CoordChunk;
use crate::material::MaterialChunk;
use crate::model::ModelChunk;
use crate::texture::TextureChunk;

/// Grouping unit of chunks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Chunks of this page, in write order
    pub chunks: Vec<ChunkId>,
}

impl Page {
    /// Whether the page lists a chunk
    pub fn contains(&self, id: ChunkId) -> bool {
        self.chunks.contains(&id)
    }
}

#[derive(Deserialize)]
struct ContainerSnapshot {
    chunks: Vec<Chunk>,
    pages: Vec<Page>,
}

/// In-memory chunk graph of one container file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "ContainerSnapshot")]
pub struct Container {
    chunks: Vec<Chunk>,
    pages: Vec<Page>,
    #[serde(skip)]
    index: HashMap<ChunkKey, ChunkId>,
}

impl From<ContainerSnapshot> for Container {
    fn from(snapshot: ContainerSnapshot) -> Self {
        let mut container = Self {
            chunks: snapshot.chunks,
            pages: snapshot.pages,
            index: HashMap::new(),
        };
        container.reindex();
        container
    }
}

impl PartialEq for Container {
    fn eq(&self, other: &Self) -> bool {
        self.chunks == other.chunks && self.pages == other.pages
    }
}

impl Container {
    /// Create an empty container
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the container holds no chunks
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Pages, in file order
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// All chunks with their ids
    pub fn chunks(&self) -> impl Iterator<Item = (ChunkId, &Chunk)> {
        self.chunks.iter().enumerate().map(|(i, c)| (id_at(i), c))
    }

    /// Rebuild the (kind, path, name) index from the chunk arena
    pub fn reindex(&mut self) {
        self.index.clear();
        for (i, chunk) in self.chunks.iter().enumerate() {
            self.index.entry(chunk.key()).or_insert(id_at(i));
        }
    }

    /// Insert a chunk, replacing the data of an existing chunk with the same key
    pub fn insert(&mut self, chunk: impl Into<Chunk>) -> ChunkId {
        let chunk = chunk.into();
        let key = chunk.key();

        if let Some(&id) = self.index.get(&key) {
            self.chunks[id.index()] = chunk;
            return id;
        }

        let id = id_at(self.chunks.len());
        self.chunks.push(chunk);
        self.index.insert(key, id);
        id
    }

    /// Replace the chunk at `id`, moving it to the key of the new data
    pub fn replace(&mut self, id: ChunkId, chunk: impl Into<Chunk>) -> Result<()> {
        let chunk = chunk.into();
        let slot = self.chunks.get_mut(id.index()).ok_or_else(|| Error::DanglingReference {
            from: chunk.name().to_string(),
            id: id.0,
        })?;

        let old_key = slot.key();
        let new_key = chunk.key();
        *slot = chunk;

        if old_key != new_key {
            if self.index.get(&old_key) == Some(&id) {
                self.index.remove(&old_key);
            }
            self.index.insert(new_key, id);
        }

        Ok(())
    }

    /// Id of the texture chunk with this path and name, creating a data-less one if needed
    pub fn intern_texture(&mut self, path: &str, name: &str) -> ChunkId {
        match self.find(&ChunkKey::new(ChunkKind::Texture, path, name)) {
            Some(id) => id,
            None => self.insert(TextureChunk::new(path, name)),
        }
    }

    /// Look up a chunk by identity
    pub fn find(&self, key: &ChunkKey) -> Option<ChunkId> {
        self.index.get(key).copied()
    }

    /// Get a chunk
    pub fn get(&self, id: ChunkId) -> Option<&Chunk> {
        self.chunks.get(id.index())
    }

    /// Get a chunk mutably
    pub fn get_mut(&mut self, id: ChunkId) -> Option<&mut Chunk> {
        self.chunks.get_mut(id.index())
    }

    /// Get a clump
    pub fn clump(&self, id: ChunkId) -> Result<&ClumpChunk> {
        self.typed(id, ChunkKind::Clump, Chunk::as_clump)
    }

    /// Get a coordinate chunk
    pub fn coord(&self, id: ChunkId) -> Result<&CoordChunk> {
        self.typed(id, ChunkKind::Coord, Chunk::as_coord)
    }

    /// Get a model
    pub fn model(&self, id: ChunkId) -> Result<&ModelChunk> {
        self.typed(id, ChunkKind::Model, Chunk::as_model)
    }

    /// Get a material
    pub fn material(&self, id: ChunkId) -> Result<&MaterialChunk> {
        self.typed(id, ChunkKind::Material, Chunk::as_material)
    }

    /// Get a texture
    pub fn texture(&self, id: ChunkId) -> Result<&TextureChunk> {
        self.typed(id, ChunkKind::Texture, Chunk::as_texture)
    }

    fn typed<'a, T>(
        &'a self,
        id: ChunkId,
        expected: ChunkKind,
        pick: impl Fn(&'a Chunk) -> Option<&'a T>,
    ) -> Result<&'a T> {
        let chunk = self.get(id).ok_or_else(|| Error::DanglingReference {
            from: expected.type_name().to_string(),
            id: id.0,
        })?;

        pick(chunk).ok_or_else(|| Error::WrongChunkKind {
            from: chunk.name().to_string(),
            id: id.0,
            expected: expected.type_name().to_string(),
            found: chunk.kind().type_name().to_string(),
        })
    }

    /// Every clump, in page order
    pub fn clumps(&self) -> impl Iterator<Item = (ChunkId, &ClumpChunk)> {
        let mut seen = HashSet::new();
        self.pages
            .iter()
            .flat_map(|p| p.chunks.iter().copied())
            .filter(move |id| seen.insert(*id))
            .filter_map(move |id| self.get(id).and_then(Chunk::as_clump).map(|c| (id, c)))
    }

    /// Find a clump by name
    pub fn find_clump(&self, name: &str) -> Option<ChunkId> {
        self.clumps().find(|(_, c)| c.name == name).map(|(id, _)| id)
    }

    /// Index of the page listing a chunk
    pub fn page_of(&self, id: ChunkId) -> Option<usize> {
        self.pages.iter().position(|p| p.contains(id))
    }

    /// Write a page for a clump and everything it references
    ///
    /// The page lists the clump, its coordinates, its models, their materials
    /// and the materials' textures, each once. A page already holding the clump
    /// is replaced; otherwise the page is appended.
    pub fn add_clump_page(&mut self, clump_id: ChunkId) -> Result<()> {
        let clump = self.clump(clump_id)?;

        let mut listed = HashSet::new();
        let mut page = Page::default();
        let mut push = |id: ChunkId| {
            if listed.insert(id) {
                page.chunks.push(id);
            }
        };

        push(clump_id);
        for &coord in &clump.coords {
            self.coord(coord)?;
            push(coord);
        }

        // Non-model references are listed as they are; importers report them
        let models = clump.all_models();
        let mut materials = Vec::new();
        for &model_id in &models {
            let chunk = self.get(model_id).ok_or_else(|| Error::DanglingReference {
                from: clump.name.clone(),
                id: model_id.0,
            })?;
            push(model_id);
            if let Some(model) = chunk.as_model() {
                materials.extend(model.materials.iter().copied());
            }
        }

        for &material_id in &materials {
            push(material_id);
        }
        for &material_id in &materials {
            for group in &self.material(material_id)?.texture_groups {
                for &texture in &group.textures {
                    self.texture(texture)?;
                    push(texture);
                }
            }
        }

        match self.pages.iter().position(|p| p.chunks.first() == Some(&clump_id)) {
            Some(i) => self.pages[i] = page,
            None => self.pages.push(page),
        }

        Ok(())
    }

    /// Write a page holding a single chunk (used for textures)
    ///
    /// A page holding only that chunk is replaced; otherwise the page is
    /// appended. Clump pages that also list the chunk are left alone.
    pub fn add_chunk_page(&mut self, id: ChunkId) -> Result<()> {
        if self.get(id).is_none() {
            return Err(Error::DanglingReference {
                from: "page".to_string(),
                id: id.0,
            });
        }

        let page = Page { chunks: vec![id] };
        match self.pages.iter().position(|p| p.chunks == page.chunks) {
            Some(i) => self.pages[i] = page,
            None => self.pages.push(page),
        }

        Ok(())
    }

    /// Drop every chunk not reachable from a page
    ///
    /// Surviving chunks keep their relative order and are renumbered; every
    /// reference and page entry is rewritten. Returns the old -> new id map.
    pub fn prune(&mut self) -> Result<HashMap<ChunkId, ChunkId>> {
        let mut reachable = vec![false; self.chunks.len()];
        let mut stack: Vec<ChunkId> = self.pages.iter().flat_map(|p| p.chunks.iter().copied()).collect();

        while let Some(id) = stack.pop() {
            let chunk = self.get(id).ok_or_else(|| Error::DanglingReference {
                from: "page".to_string(),
                id: id.0,
            })?;
            if !std::mem::replace(&mut reachable[id.index()], true) {
                stack.extend(references(chunk));
            }
        }

        let remap: HashMap<ChunkId, ChunkId> = reachable
            .iter()
            .enumerate()
            .filter(|&(_, &kept)| kept)
            .enumerate()
            .map(|(new, (old, _))| (id_at(old), id_at(new)))
            .collect();
        let dropped = self.chunks.len() - remap.len();
        if dropped == 0 {
            return Ok(remap);
        }

        let chunks = std::mem::take(&mut self.chunks);
        self.chunks = chunks
            .into_iter()
            .zip(reachable)
            .filter_map(|(chunk, kept)| kept.then_some(chunk))
            .collect();

        // Every reference of a reachable chunk is reachable, so lookups cannot miss
        let map = |id: ChunkId| remap.get(&id).copied().unwrap_or(id);
        for chunk in &mut self.chunks {
            remap_references(chunk, map);
        }
        for page in &mut self.pages {
            for id in &mut page.chunks {
                *id = map(*id);
            }
        }
        self.reindex();

        tracing::debug!(dropped, kept = self.chunks.len(), "Pruned unreferenced chunks");
        Ok(remap)
    }

    /// Check every chunk reference points at a chunk of the right kind
    pub fn validate(&self) -> Result<()> {
        for page in &self.pages {
            for &id in &page.chunks {
                if self.get(id).is_none() {
                    return Err(Error::DanglingReference {
                        from: "page".to_string(),
                        id: id.0,
                    });
                }
            }
        }

        for (_, chunk) in self.chunks() {
            match chunk {
                Chunk::Clump(clump) => {
                    for &id in &clump.coords {
                        self.coord(id)?;
                    }
                    for id in clump.all_models() {
                        if self.get(id).is_none() {
                            return Err(Error::DanglingReference {
                                from: clump.name.clone(),
                                id: id.0,
                            });
                        }
                    }
                }
                Chunk::Model(model) => {
                    if let Some(clump) = model.clump {
                        self.clump(clump)?;
                    }
                    for &id in &model.materials {
                        self.material(id)?;
                    }
                }
                Chunk::Material(material) => {
                    for group in &material.texture_groups {
                        for &id in &group.textures {
                            self.texture(id)?;
                        }
                    }
                }
                Chunk::Coord(_) | Chunk::Texture(_) => {}
            }
        }

        Ok(())
    }
}

/// Chunks a chunk points at
fn references(chunk: &Chunk) -> Vec<ChunkId> {
    match chunk {
        Chunk::Clump(clump) => clump.coords.iter().copied().chain(clump.all_models()).collect(),
        Chunk::Model(model) => model.clump.into_iter().chain(model.materials.iter().copied()).collect(),
        Chunk::Material(material) => material
            .texture_groups
            .iter()
            .flat_map(|g| g.textures.iter().copied())
            .collect(),
        Chunk::Coord(_) | Chunk::Texture(_) => Vec::new(),
    }
}

fn remap_references(chunk: &mut Chunk, map: impl Fn(ChunkId) -> ChunkId) {
    match chunk {
        Chunk::Clump(clump) => {
            for id in clump.coords.iter_mut().chain(clump.models.iter_mut()) {
                *id = map(*id);
            }
            for id in clump.model_groups.iter_mut().flat_map(|g| g.models.iter_mut().flatten()) {
                *id = map(*id);
            }
        }
        Chunk::Model(model) => {
            model.clump = model.clump.map(&map);
            for id in &mut model.materials {
                *id = map(*id);
            }
        }
        Chunk::Material(material) => {
            for id in material.texture_groups.iter_mut().flat_map(|g| g.textures.iter_mut()) {
                *id = map(*id);
            }
        }
        Chunk::Coord(_) | Chunk::Texture(_) => {}
    }
}

#[allow(clippy::cast_possible_truncation)]
fn id_at(index: usize) -> ChunkId {
    ChunkId(index as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::CoordNode;

    const PATH: &str = "c/1nrt/max/1nrtbod1.max";

    fn sample() -> (Container, ChunkId) {
        let mut container = Container::new();
        let root = container.insert(CoordChunk::new(PATH, CoordNode::new("root")));
        let texture = container.insert(TextureChunk::with_data(PATH, "1nrtbody", b"NTP3data".to_vec()));

        let mut material = MaterialChunk::new(PATH, "1nrtbody_mat");
        material.texture_groups.push(crate::material::TextureGroup {
            unk: 0,
            textures: vec![texture],
        });
        let material = container.insert(material);

        let clump_id = container.insert(ClumpChunk::new(PATH, "1nrtbod1"));
        let mut model = ModelChunk::new(PATH, "body");
        model.clump = Some(clump_id);
        model.materials = vec![material];
        let model = container.insert(model);

        let mut clump = ClumpChunk::new(PATH, "1nrtbod1");
        clump.coords = vec![root];
        clump.models = vec![model];
        assert_eq!(container.insert(clump), clump_id);

        (container, clump_id)
    }

    #[test]
    fn test_insert_upserts_by_key() {
        let mut container = Container::new();
        let first = container.insert(TextureChunk::new(PATH, "tex"));
        let second = container.insert(TextureChunk::with_data(PATH, "tex", b"NTP3....".to_vec()));

        assert_eq!(first, second);
        assert_eq!(container.len(), 1);
        assert!(container.texture(first).map(TextureChunk::has_data).unwrap_or(false));
    }

    #[test]
    fn test_intern_texture_keeps_data() {
        let mut container = Container::new();
        let id = container.insert(TextureChunk::with_data(PATH, "tex", b"NTP3....".to_vec()));

        assert_eq!(container.intern_texture(PATH, "tex"), id);
        assert!(container.texture(id).unwrap().has_data());
    }

    #[test]
    fn test_clump_page_lists_references_once() {
        let (mut container, clump_id) = sample();
        container.add_clump_page(clump_id).unwrap();

        assert_eq!(container.pages().len(), 1);
        let kinds: Vec<ChunkKind> = container.pages()[0]
            .chunks
            .iter()
            .map(|&id| container.get(id).unwrap().kind())
            .collect();
        assert_eq!(
            kinds,
            vec![
                ChunkKind::Clump,
                ChunkKind::Coord,
                ChunkKind::Model,
                ChunkKind::Material,
                ChunkKind::Texture
            ]
        );

        // Writing again replaces rather than appends
        container.add_clump_page(clump_id).unwrap();
        assert_eq!(container.pages().len(), 1);
        assert_eq!(container.find_clump("1nrtbod1"), Some(clump_id));
    }

    #[test]
    fn test_texture_page_leaves_clump_page_alone() {
        let (mut container, clump_id) = sample();
        container.add_clump_page(clump_id).unwrap();
        let texture = container.find(&ChunkKey::new(ChunkKind::Texture, PATH, "1nrtbody")).unwrap();

        container.add_chunk_page(texture).unwrap();
        assert_eq!(container.pages().len(), 2);
        assert_eq!(container.find_clump("1nrtbod1"), Some(clump_id));

        // A second texture page replaces the first one, not the clump page
        container.add_chunk_page(texture).unwrap();
        assert_eq!(container.pages().len(), 2);
        assert_eq!(container.pages()[1].chunks, vec![texture]);
        assert_eq!(container.page_of(clump_id), Some(0));
    }

    #[test]
    fn test_prune_drops_unreachable_and_renumbers() {
        let mut container = Container::new();
        let stray = container.insert(CoordChunk::new(PATH, CoordNode::new("old_bone")));
        let (clump_id, root) = {
            let root = container.insert(CoordChunk::new(PATH, CoordNode::new("root")));
            let mut clump = ClumpChunk::new(PATH, "1nrtbod1");
            clump.coords = vec![root];
            (container.insert(clump), root)
        };
        let mut model = ModelChunk::new(PATH, "body");
        model.clump = Some(clump_id);
        let model = container.insert(model);
        if let Some(clump) = container.get_mut(clump_id).and_then(Chunk::as_clump_mut) {
            clump.models = vec![model];
            clump.model_groups = vec![crate::clump::ModelGroup {
                models: vec![Some(model), None],
                ..Default::default()
            }];
        }
        container.add_clump_page(clump_id).unwrap();

        let remap = container.prune().unwrap();

        assert_eq!(container.len(), 3);
        assert!(!remap.contains_key(&stray));
        assert!(container.find(&ChunkKey::new(ChunkKind::Coord, PATH, "old_bone")).is_none());
        assert!(container.validate().is_ok());

        let new_clump = remap[&clump_id];
        assert_eq!(container.find_clump("1nrtbod1"), Some(new_clump));
        let clump = container.clump(new_clump).unwrap();
        assert_eq!(clump.coords, vec![remap[&root]]);
        assert_eq!(clump.model_groups[0].models, vec![Some(remap[&model]), None]);
        assert_eq!(container.model(remap[&model]).unwrap().clump, Some(new_clump));

        // Nothing left to drop
        let again = container.prune().unwrap();
        assert!(again.iter().all(|(old, new)| old == new));
    }

    #[test]
    fn test_replace_moves_key() {
        let (mut container, clump_id) = sample();
        container
            .replace(clump_id, ClumpChunk::new("c/other.max", "1nrtbod1"))
            .unwrap();

        assert_eq!(
            container.find(&ChunkKey::new(ChunkKind::Clump, "c/other.max", "1nrtbod1")),
            Some(clump_id)
        );
        assert_eq!(container.find(&ChunkKey::new(ChunkKind::Clump, PATH, "1nrtbod1")), None);
    }

    #[test]
    fn test_typed_access_reports_wrong_kind() {
        let (container, clump_id) = sample();
        let err = container.model(clump_id).unwrap_err();
        assert!(matches!(err, Error::WrongChunkKind { .. }));

        let err = container.model(ChunkId(99)).unwrap_err();
        assert!(matches!(err, Error::DanglingReference { id: 99, .. }));
    }

    #[test]
    fn test_validate_catches_dangling_model() {
        let (mut container, clump_id) = sample();
        assert!(container.validate().is_ok());

        if let Some(clump) = container.get_mut(clump_id).and_then(Chunk::as_clump_mut) {
            clump.models.push(ChunkId(42));
        }
        assert!(container.validate().is_err());
    }
}
