use std::{
    collections::HashMap,
    fs,
    io,
    path::{Path, PathBuf},
};

use crate::error::SourceError;

/// Where input bytes come from. The decoders only ever see the buffers.
pub trait ByteSource {
    fn read_all(&self, path: &Path) -> Result<Vec<u8>, SourceError>;
}

/// Reads whole files from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSource;

impl ByteSource for FsSource {
    fn read_all(&self, path: &Path) -> Result<Vec<u8>, SourceError> {
        fs::read(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => SourceError::NotFound(path.to_path_buf()),
            _ => SourceError::Io {
                path: path.to_path_buf(),
                source,
            },
        })
    }
}

/// In-memory files keyed by path.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<PathBuf, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<P: Into<PathBuf>>(&mut self, path: P, data: Vec<u8>) {
        self.files.insert(path.into(), data);
    }
}

impl ByteSource for MemorySource {
    fn read_all(&self, path: &Path) -> Result<Vec<u8>, SourceError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(path.to_path_buf()))
    }
}
