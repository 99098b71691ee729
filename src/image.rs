//! The on-disk image format.
//!
//! One image file holds one whole filesystem. The format is explicit and
//! versioned rather than whatever a serialization library happens to emit,
//! so corruption detection is a contract instead of an accident:
//!
//! ```text
//! ===========================================================================
//! | Header | Cursor path | Bitmap | Block arena | Directory tree (recursive) |
//! ===========================================================================
//! ```
//!
//! The header is a fixed-size record carrying the magic, the format version,
//! and the geometry everything after it is sized from. Directory records are
//! length-prefixed and nest: name, files (name, size, block list), children.

use std::convert::TryInto;
use std::io::Write;
use std::path::Path;

use log::info;
use zerocopy::{AsBytes, FromBytes, LayoutVerified};

use crate::alloc::Bitmap;
use crate::dir::{DirId, Directory, File};
use crate::error::{FsError, Result};
use crate::fs::FileSystem;
use crate::store::BlockStore;

const IMG_MAGIC: u32 = 0x4246_5331; // BFS1
const IMG_VERSION: u32 = 1;

/// The first bytes of every image. Geometry lives here so the rest of the
/// blob can be sized and checked before any of it is trusted.
#[repr(C)]
#[derive(AsBytes, FromBytes, Clone, Copy)]
struct ImageHeader {
    magic: u32,
    version: u32,
    block_size: u32,
    block_count: u32,
}

fn corrupt(msg: &str) -> FsError {
    FsError::ImageCorrupt(msg.to_string())
}

/// Serializes the whole filesystem to `path`, replacing whatever was there.
/// The file handle is scoped to this call and synced before it closes.
pub fn save<P: AsRef<Path>>(path: P, fs: &FileSystem) -> Result<()> {
    let blob = encode(fs);
    let mut out = std::fs::File::create(&path)?;
    out.write_all(&blob)?;
    out.sync_all()?;
    info!("saved image to {}", path.as_ref().display());
    Ok(())
}

/// Reads a previously saved image back into an equivalent filesystem.
///
/// # Errors
///
/// A missing file is [`FsError::ImageMissing`], so the caller can decide to
/// start fresh. Anything unreadable as the expected format is
/// [`FsError::ImageCorrupt`].
pub fn load<P: AsRef<Path>>(path: P) -> Result<FileSystem> {
    let blob = match std::fs::read(&path) {
        Ok(blob) => blob,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(FsError::ImageMissing(
                path.as_ref().display().to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    };
    let fs = decode(&blob)?;
    info!("mounted image {}", path.as_ref().display());
    Ok(fs)
}

fn encode(fs: &FileSystem) -> Vec<u8> {
    let header = ImageHeader {
        magic: IMG_MAGIC,
        version: IMG_VERSION,
        block_size: fs.block_size() as u32,
        block_count: fs.block_count() as u32,
    };
    let mut blob = header.as_bytes().to_vec();
    put_str(&mut blob, fs.cwd_path());

    let bitmap = fs.bitmap().to_bytes();
    put_u32(&mut blob, bitmap.len() as u32);
    blob.extend_from_slice(&bitmap);

    blob.extend_from_slice(fs.store().as_bytes());

    encode_dir(&mut blob, fs, fs.root());
    blob
}

fn encode_dir(blob: &mut Vec<u8>, fs: &FileSystem, id: DirId) {
    let dir = fs.dir(id);
    put_str(blob, dir.name());

    let files: Vec<&File> = dir.files().collect();
    put_u32(blob, files.len() as u32);
    for file in files {
        put_str(blob, file.name());
        put_u64(blob, file.size());
        put_u32(blob, file.blocks().len() as u32);
        for &blocknr in file.blocks() {
            put_u32(blob, blocknr);
        }
    }

    let children: Vec<DirId> = dir.children().map(|(_, child)| child).collect();
    put_u32(blob, children.len() as u32);
    for child in children {
        encode_dir(blob, fs, child);
    }
}

fn decode(blob: &[u8]) -> Result<FileSystem> {
    let (header, rest) = LayoutVerified::<&[u8], ImageHeader>::new_from_prefix(blob)
        .ok_or_else(|| corrupt("truncated header"))?;
    let header: ImageHeader = *header;
    if header.magic != IMG_MAGIC {
        return Err(corrupt("bad magic"));
    }
    if header.version != IMG_VERSION {
        return Err(corrupt("unsupported format version"));
    }
    let block_size = header.block_size as usize;
    let block_count = header.block_count as usize;
    if block_size == 0 {
        return Err(corrupt("zero block size"));
    }

    let mut r = Reader::new(rest);
    let cursor = r.str()?;

    let bitmap_len = r.u32()? as usize;
    let bitmap = Bitmap::from_bytes(r.take(bitmap_len)?, block_count)?;

    let arena_len = block_count
        .checked_mul(block_size)
        .ok_or_else(|| corrupt("implausible geometry"))?;
    let arena = r.take(arena_len)?.to_vec();
    let store = BlockStore::from_raw(arena, block_count, block_size);

    let mut dirs: Vec<Directory> = Vec::new();
    decode_dir(&mut r, &mut dirs, None, block_count)?;
    if !r.is_empty() {
        return Err(corrupt("trailing bytes after directory tree"));
    }

    let mut fs = FileSystem::from_parts(store, bitmap, dirs);
    fs.set_cwd_path(&cursor)
        .ok_or_else(|| corrupt("cursor path does not resolve"))?;
    Ok(fs)
}

fn decode_dir(
    r: &mut Reader<'_>,
    dirs: &mut Vec<Directory>,
    parent: Option<DirId>,
    block_count: usize,
) -> Result<DirId> {
    let name = r.str()?;
    let id = DirId(dirs.len());
    let mut dir = match parent {
        None => {
            if name != "/" {
                return Err(corrupt("malformed root record"));
            }
            Directory::root()
        }
        Some(p) => Directory::child_of(&name, p, dirs[p.0].path()),
    };

    let nfiles = r.u32()?;
    for _ in 0..nfiles {
        let fname = r.str()?;
        let size = r.u64()?;
        let nblocks = r.u32()?;
        // Sized by pushes, not by the untrusted count.
        let mut blocks = Vec::new();
        for _ in 0..nblocks {
            let blocknr = r.u32()?;
            if blocknr as usize >= block_count {
                return Err(corrupt("file references a block past the pool"));
            }
            blocks.push(blocknr);
        }
        dir.insert_file(File::from_parts(fname, blocks, size));
    }
    dirs.push(dir);

    let ndirs = r.u32()?;
    for _ in 0..ndirs {
        let child = decode_dir(r, dirs, Some(id), block_count)?;
        let child_name = dirs[child.0].name().to_string();
        dirs[id.0].insert_child(&child_name, child);
    }
    Ok(id)
}

fn put_u32(blob: &mut Vec<u8>, value: u32) {
    blob.extend_from_slice(&value.to_le_bytes());
}

fn put_u64(blob: &mut Vec<u8>, value: u64) {
    blob.extend_from_slice(&value.to_le_bytes());
}

fn put_str(blob: &mut Vec<u8>, s: &str) {
    put_u32(blob, s.len() as u32);
    blob.extend_from_slice(s.as_bytes());
}

/// Bounds-checked cursor over the variable-length part of an image. Every
/// read past the end is corruption, never a panic.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos == self.buf.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.buf.len() - self.pos {
            return Err(corrupt("unexpected end of image"));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn str(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| corrupt("name is not utf-8"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fs() -> FileSystem {
        let mut fs = FileSystem::new(8, 4);
        fs.make_dir("docs").unwrap();
        fs.change_dir("docs").unwrap();
        fs.create_file("a.txt").unwrap();
        fs.write_file("a.txt", b"hello!").unwrap();
        fs
    }

    #[test]
    fn can_encode_and_decode_a_filesystem() {
        let fs = sample_fs();
        let decoded = decode(&encode(&fs)).unwrap();
        assert_eq!(decoded.cwd_path(), "/docs/");
        assert_eq!(decoded.free_blocks(), fs.free_blocks());
        assert_eq!(decoded.read_file("a.txt").unwrap(), "hello!");
    }

    #[test]
    fn blob_with_bad_magic_is_corrupt() {
        let mut blob = encode(&sample_fs());
        blob[0] ^= 0xff;
        match decode(&blob) {
            Err(FsError::ImageCorrupt(_)) => {}
            other => panic!("expected corrupt image, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn truncated_blob_is_corrupt() {
        let blob = encode(&sample_fs());
        for cut in [3, blob.len() / 2, blob.len() - 1].iter() {
            match decode(&blob[..*cut]) {
                Err(FsError::ImageCorrupt(_)) => {}
                other => panic!("expected corrupt image, got {:?}", other.map(|_| ())),
            }
        }
    }

    #[test]
    fn trailing_garbage_is_corrupt() {
        let mut blob = encode(&sample_fs());
        blob.push(0);
        assert!(decode(&blob).is_err());
    }

    #[test]
    fn unsupported_version_is_corrupt() {
        let mut blob = encode(&sample_fs());
        blob[4..8].copy_from_slice(&99u32.to_ne_bytes());
        assert!(decode(&blob).is_err());
    }
}
