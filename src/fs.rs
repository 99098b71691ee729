use log::debug;

use crate::alloc::Bitmap;
use crate::dir::{DirId, Directory, File};
use crate::error::{FsError, Result};
use crate::store::BlockStore;

const ROOT: DirId = DirId(0);

/// One entry from a directory listing. Ordering follows the underlying maps;
/// callers that need a stable order sort for themselves.
#[derive(Debug, PartialEq)]
pub enum Entry {
    Dir(String),
    File(String, u64),
}

/// The working filesystem: a fixed pool of blocks, the allocation bitmap,
/// the directory tree, and the session's current-directory cursor. Every
/// operation acts relative to the cursor.
pub struct FileSystem {
    store: BlockStore,
    bitmap: Bitmap,
    dirs: Vec<Directory>,
    cwd: DirId,
}

impl FileSystem {
    /// Creates an empty filesystem with `block_count` blocks of `block_size`
    /// bytes each. Both are fixed for the life of the filesystem and of any
    /// image saved from it.
    pub fn new(block_count: usize, block_size: usize) -> Self {
        FileSystem {
            store: BlockStore::new(block_count, block_size),
            bitmap: Bitmap::new(block_count),
            dirs: vec![Directory::root()],
            cwd: ROOT,
        }
    }

    pub fn block_count(&self) -> usize {
        self.store.block_count()
    }

    pub fn block_size(&self) -> usize {
        self.store.block_size()
    }

    pub fn free_blocks(&self) -> usize {
        self.bitmap.free_count()
    }

    /// Full path of the current directory, e.g. `/docs/img/`.
    pub fn cwd_path(&self) -> &str {
        self.dirs[self.cwd.0].path()
    }

    /// The directory the cursor points at.
    pub fn current_dir(&self) -> &Directory {
        &self.dirs[self.cwd.0]
    }

    /// Looks up a directory node by its arena handle.
    pub fn dir(&self, id: DirId) -> &Directory {
        &self.dirs[id.0]
    }

    /// Handle of the root directory.
    pub fn root(&self) -> DirId {
        ROOT
    }

    fn cur(&self) -> &Directory {
        &self.dirs[self.cwd.0]
    }

    fn cur_mut(&mut self) -> &mut Directory {
        &mut self.dirs[self.cwd.0]
    }

    /// Moves the cursor into the child `name`, or to the parent for `".."`.
    /// Moving up from the root is a no-op; an unknown name leaves the cursor
    /// where it was.
    pub fn change_dir(&mut self, name: &str) -> Result<()> {
        if name == ".." {
            if let Some(parent) = self.cur().parent() {
                self.cwd = parent;
            }
            return Ok(());
        }
        match self.cur().child(name) {
            Some(id) => {
                self.cwd = id;
                Ok(())
            }
            None => Err(FsError::DirNotFound(name.to_string())),
        }
    }

    /// Creates and attaches a child directory under the cursor.
    pub fn make_dir(&mut self, name: &str) -> Result<()> {
        if self.cur().child(name).is_some() {
            return Err(FsError::DirExists(name.to_string()));
        }
        let id = DirId(self.dirs.len());
        let dir = Directory::child_of(name, self.cwd, self.cur().path());
        self.dirs.push(dir);
        self.cur_mut().insert_child(name, id);
        Ok(())
    }

    /// Detaches the child directory `name`. Every block owned by a file
    /// anywhere under the detached subtree goes back to the free pool; the
    /// detached nodes themselves stay in the arena, unreachable, until the
    /// session ends.
    pub fn remove_dir(&mut self, name: &str) -> Result<()> {
        let id = match self.cur_mut().remove_child(name) {
            Some(id) => id,
            None => return Err(FsError::DirNotFound(name.to_string())),
        };
        self.reclaim_subtree(id);
        Ok(())
    }

    fn reclaim_subtree(&mut self, id: DirId) {
        let mut pending = vec![id];
        while let Some(DirId(i)) = pending.pop() {
            for file in self.dirs[i].files() {
                for &blocknr in file.blocks() {
                    self.bitmap.release(blocknr as usize);
                }
            }
            pending.extend(self.dirs[i].children().map(|(_, child)| child));
        }
    }

    /// Names under the cursor: child directories first, then files with
    /// their sizes.
    pub fn list_dir(&self) -> Vec<Entry> {
        let dir = self.cur();
        let mut entries: Vec<Entry> = dir
            .children()
            .map(|(name, _)| Entry::Dir(name.to_string()))
            .collect();
        entries.extend(
            dir.files()
                .map(|f| Entry::File(f.name().to_string(), f.size())),
        );
        entries
    }

    /// Attaches an empty file (no blocks, size 0) under the cursor.
    pub fn create_file(&mut self, name: &str) -> Result<()> {
        if self.cur().file(name).is_some() {
            return Err(FsError::FileExists(name.to_string()));
        }
        self.cur_mut().insert_file(File::new(name));
        Ok(())
    }

    /// Appends `data` to the file `name`, one freshly allocated block per
    /// chunk of at most `block_size` bytes. Existing blocks are never touched
    /// or reclaimed; a second write extends the file.
    ///
    /// # Errors
    ///
    /// Running the free pool dry mid-write stops the write: the chunks
    /// already written stay in place and the size covers only those chunks.
    /// There is no rollback.
    pub fn write_file(&mut self, name: &str, data: &[u8]) -> Result<usize> {
        let block_size = self.store.block_size();
        let file = match self.dirs[self.cwd.0].file_mut(name) {
            Some(file) => file,
            None => return Err(FsError::FileNotFound(name.to_string())),
        };
        let mut written = 0;
        for chunk in data.chunks(block_size) {
            let blocknr = self.bitmap.allocate()?;
            self.store.write(blocknr, 0, chunk)?;
            file.push_block(blocknr as u32);
            file.grow(chunk.len() as u64);
            written += chunk.len();
        }
        debug!("wrote {} bytes to {}", written, name);
        Ok(written)
    }

    /// Raw file content: every block in sequence order, each read in full.
    /// The tail of the last block is whatever padding the store holds,
    /// zeroes for blocks that were never fully written.
    pub fn read_file_raw(&self, name: &str) -> Result<Vec<u8>> {
        let file = self
            .cur()
            .file(name)
            .ok_or_else(|| FsError::FileNotFound(name.to_string()))?;
        let block_size = self.store.block_size();
        let mut out = Vec::with_capacity(file.blocks().len() * block_size);
        for &blocknr in file.blocks() {
            out.extend_from_slice(self.store.read(blocknr as usize, 0, block_size)?);
        }
        Ok(out)
    }

    /// Text view of a file: the raw content with trailing NUL padding and
    /// whitespace trimmed from the overall result. Lossy for binary data;
    /// use [`FileSystem::read_file_raw`] there.
    pub fn read_file(&self, name: &str) -> Result<String> {
        let raw = self.read_file_raw(name)?;
        let text = String::from_utf8_lossy(&raw);
        Ok(text
            .trim_end_matches(|c: char| c == '\0' || c.is_whitespace())
            .to_string())
    }

    /// Detaches the file `name` and returns every block it referenced to the
    /// free pool.
    pub fn remove_file(&mut self, name: &str) -> Result<()> {
        match self.dirs[self.cwd.0].remove_file(name) {
            Some(file) => {
                for &blocknr in file.blocks() {
                    self.bitmap.release(blocknr as usize);
                }
                Ok(())
            }
            None => Err(FsError::FileNotFound(name.to_string())),
        }
    }

    // Codec plumbing.

    pub(crate) fn store(&self) -> &BlockStore {
        &self.store
    }

    pub(crate) fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    pub(crate) fn from_parts(store: BlockStore, bitmap: Bitmap, dirs: Vec<Directory>) -> Self {
        FileSystem {
            store,
            bitmap,
            dirs,
            cwd: ROOT,
        }
    }

    /// Re-points the cursor at the directory named by `path`, walking the
    /// tree from the root. Used when restoring a saved cursor.
    pub(crate) fn set_cwd_path(&mut self, path: &str) -> Option<()> {
        let mut cur = ROOT;
        for component in path.split('/').filter(|s| !s.is_empty()) {
            cur = self.dirs[cur.0].child(component)?;
        }
        self.cwd = cur;
        Some(())
    }
}
