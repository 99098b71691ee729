use std::collections::HashMap;

/// Handle to a directory slot in the filesystem's node arena. Parent links
/// are plain ids rather than owning references, so the tree has no ownership
/// cycles to tear down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirId(pub(crate) usize);

/// A named file: an ordered list of block indices plus the cumulative byte
/// size of everything written so far. The content itself lives in the block
/// store; this is only the map of where to find it.
#[derive(Debug, Clone)]
pub struct File {
    name: String,
    blocks: Vec<u32>,
    size: u64,
}

impl File {
    pub(crate) fn new(name: &str) -> Self {
        File {
            name: name.to_string(),
            blocks: Vec::new(),
            size: 0,
        }
    }

    pub(crate) fn from_parts(name: String, blocks: Vec<u32>, size: u64) -> Self {
        File { name, blocks, size }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Block indices in logical byte order.
    pub fn blocks(&self) -> &[u32] {
        &self.blocks
    }

    pub(crate) fn push_block(&mut self, blocknr: u32) {
        self.blocks.push(blocknr);
    }

    pub(crate) fn grow(&mut self, bytes: u64) {
        self.size += bytes;
    }
}

/// A directory node: named files plus named child directories, with a
/// non-owning back-reference to the parent. The full path is derived once at
/// construction and never changes afterwards.
#[derive(Debug)]
pub struct Directory {
    name: String,
    path: String,
    parent: Option<DirId>,
    files: HashMap<String, File>,
    children: HashMap<String, DirId>,
}

impl Directory {
    pub(crate) fn root() -> Self {
        Directory {
            name: "/".to_string(),
            path: "/".to_string(),
            parent: None,
            files: HashMap::new(),
            children: HashMap::new(),
        }
    }

    pub(crate) fn child_of(name: &str, parent: DirId, parent_path: &str) -> Self {
        Directory {
            name: name.to_string(),
            path: format!("{}{}/", parent_path, name),
            parent: Some(parent),
            files: HashMap::new(),
            children: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn parent(&self) -> Option<DirId> {
        self.parent
    }

    pub fn file(&self, name: &str) -> Option<&File> {
        self.files.get(name)
    }

    pub fn files(&self) -> impl Iterator<Item = &File> + '_ {
        self.files.values()
    }

    pub fn child(&self, name: &str) -> Option<DirId> {
        self.children.get(name).copied()
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, DirId)> + '_ {
        self.children.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub(crate) fn file_mut(&mut self, name: &str) -> Option<&mut File> {
        self.files.get_mut(name)
    }

    pub(crate) fn insert_file(&mut self, file: File) {
        self.files.insert(file.name().to_string(), file);
    }

    pub(crate) fn remove_file(&mut self, name: &str) -> Option<File> {
        self.files.remove(name)
    }

    pub(crate) fn insert_child(&mut self, name: &str, id: DirId) {
        self.children.insert(name.to_string(), id);
    }

    pub(crate) fn remove_child(&mut self, name: &str) -> Option<DirId> {
        self.children.remove(name)
    }
}
