use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Invalid archive path: {0}")]
    InvalidPath(String),

    #[error("Invalid stream name: {0}")]
    InvalidStreamName(String),

    #[error("Archive writer already finished")]
    AlreadyFinished,

    #[error("Archive writer not initialized")]
    NotInitialized,

    #[error("Stream not found: {0}")]
    NotFound(String),

    #[error("Stream no longer backed by the staging area: {0}")]
    StreamDetached(String),

    #[error("Invalid magic number in archive trailer")]
    InvalidMagic,

    #[error("Unsupported format version: {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },

    #[error("Table of contents checksum verification failed")]
    ChecksumMismatch,

    #[error("Corrupt table of contents: {0}")]
    CorruptToc(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
