use thiserror::Error;

/// Everything a filesystem operation can report. None of these end the
/// session; the shell prints them and keeps reading commands. The only
/// variant that stops anything is [`FsError::ImageCorrupt`] at startup.
#[derive(Error, Debug)]
pub enum FsError {
    #[error("directory not found: {0}")]
    DirNotFound(String),
    #[error("file not found: {0}")]
    FileNotFound(String),
    #[error("directory already exists: {0}")]
    DirExists(String),
    #[error("file already exists: {0}")]
    FileExists(String),
    #[error("no more free blocks available")]
    OutOfBlocks,
    /// Contract violation on the block store; never reachable through a
    /// correctly maintained bitmap.
    #[error("block {0} out of range")]
    BlockOutOfRange(usize),
    #[error("image not found: {0}")]
    ImageMissing(String),
    #[error("image is broken: {0}")]
    ImageCorrupt(String),
    #[error("image i/o failed: {0}")]
    ImageIo(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FsError>;
