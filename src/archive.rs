//! # Archive index
//!
//! Integer-addressed view over a flat bundle of sub-files: the ROM filesystem
//! itself, or the file image of a NARC. Ids are positions in the file table
//! and never shift, even around absent slots.

use crate::{
    error::{DecodeError, Result},
    filesystem::{FatEntry, FileAllocationTable, FileNameTable},
};

#[derive(Debug, Clone)]
pub struct ArchiveIndex<'a> {
    data: &'a [u8],
    file_table: Vec<FatEntry>,
    name_table: Option<FileNameTable>,
}

impl<'a> ArchiveIndex<'a> {
    /// `data` is the buffer the file table's offsets point into.
    pub fn open(
        data: &'a [u8],
        file_table: FileAllocationTable,
        name_table: Option<FileNameTable>,
    ) -> Self {
        ArchiveIndex {
            data,
            file_table: file_table.entries,
            name_table,
        }
    }

    /// Number of slots, absent ones included.
    pub fn len(&self) -> usize {
        self.file_table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.file_table.is_empty()
    }

    pub fn has_names(&self) -> bool {
        self.name_table.is_some()
    }

    /// Bytes of sub-file `id`. Absent slots are an error, never an empty file.
    pub fn get_file(&self, id: usize) -> Result<&'a [u8]> {
        let entry = self
            .file_table
            .get(id)
            .filter(|entry| !entry.is_absent())
            .ok_or(DecodeError::IndexOutOfRange {
                id,
                len: self.file_table.len(),
            })?;

        let start = entry.start_address as usize;
        let end = entry.end_address as usize;
        self.data
            .get(start..end)
            .ok_or(DecodeError::SliceOutOfBounds {
                id,
                start,
                end,
                buffer_len: self.data.len(),
            })
    }

    /// Best-effort path of sub-file `id`.
    pub fn name_of(&self, id: usize) -> Option<String> {
        let id = u16::try_from(id).ok()?;
        self.name_table.as_ref()?.name_of(id)
    }

    /// Resolve a path through the name table, when there is one.
    pub fn file_id(&self, path: &str) -> Option<usize> {
        self.name_table
            .as_ref()?
            .get_file_id(path)
            .map(|id| id as usize)
    }

    /// Ids of every slot that holds a file.
    pub fn present_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.file_table
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.is_absent())
            .map(|(id, _)| id)
    }

    /// Present files with their ids. Entries pointing outside the buffer are skipped.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &'a [u8])> + '_ {
        self.present_ids()
            .filter_map(move |id| self.get_file(id).ok().map(|data| (id, data)))
    }
}
