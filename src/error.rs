use std::{io, path::PathBuf};

use crate::formats::chunk::display_tag;

/// Failure kinds for every decoder in the crate.
///
/// Nothing here is ever recovered from inside the decoders: a wrong palette
/// or tile stream is worse than a loud failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("bad magic: expected {}, found {}", display_tag(.expected), display_tag(.found))]
    BadMagic { expected: [u8; 4], found: [u8; 4] },

    #[error("truncated header at offset 0x{offset:X}: need {needed} bytes, {available} available")]
    TruncatedHeader {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("chunk {} at offset 0x{offset:X} declares {declared} bytes but only {available} remain", display_tag(.tag))]
    ChunkOverrun {
        tag: [u8; 4],
        offset: usize,
        declared: u32,
        available: usize,
    },

    #[error("chunk {} at offset 0x{offset:X} declares length {declared}, smaller than its own header", display_tag(.tag))]
    InvalidChunkLength {
        tag: [u8; 4],
        offset: usize,
        declared: u32,
    },

    #[error("chunk {} not found", display_tag(.0))]
    ChunkNotFound([u8; 4]),

    #[error("malformed palette: {0}")]
    MalformedPalette(String),

    #[error("unknown pixel depth indicator {0}")]
    UnknownDepth(u8),

    #[error("tile data of {length} bytes is not a multiple of {bytes_per_tile}")]
    TruncatedTileData { length: usize, bytes_per_tile: usize },

    #[error("file id {id} out of range (table holds {len} entries)")]
    IndexOutOfRange { id: usize, len: usize },

    #[error("file {id} spans 0x{start:X}..0x{end:X} outside a buffer of {buffer_len} bytes")]
    SliceOutOfBounds {
        id: usize,
        start: usize,
        end: usize,
        buffer_len: usize,
    },

    #[error("malformed file table: {0}")]
    MalformedFileTable(String),

    #[error("{what} of {value} does not fit a NARC field")]
    ArchiveTooLarge { what: &'static str, value: usize },
}

/// Failures of the byte-buffer source collaborator.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors surfaced by the conversion pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no file named {0:?} in the ROM")]
    UnknownFile(String),

    #[error("failed to serialise palette: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = DecodeError> = std::result::Result<T, E>;
