use std::collections::HashMap;

use crate::{
    binary_utils::{read_u16_le, read_u32_le, read_u8},
    error::{DecodeError, Result},
};

/// A FatEntry is the `[start, end)` byte range of one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatEntry {
    pub start_address: u32, // 4 bytes long
    pub end_address: u32,   // 4 bytes long
}

impl FatEntry {
    /// Unused slots are written as zero-length ranges. They keep their index
    /// so every later file id stays where the game expects it.
    pub fn is_absent(&self) -> bool {
        self.end_address <= self.start_address
    }

    pub fn len(&self) -> usize {
        self.end_address.saturating_sub(self.start_address) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct FileAllocationTable {
    pub entries: Vec<FatEntry>,
}

impl FileAllocationTable {
    pub fn read_from_rom(rom_data: &[u8], fat_offset: u32, fat_size: u32) -> Result<Self> {
        Self::read_entries(rom_data, fat_offset as usize, fat_size as usize / 8)
    }

    /// Read `count` consecutive `(start, end)` pairs starting at `offset`.
    pub fn read_entries(data: &[u8], offset: usize, count: usize) -> Result<Self> {
        let mut entries = Vec::with_capacity(count);

        for i in 0..count {
            let entry_offset = offset + i * 8;

            // Useful for finding if this ROM is corrupted
            let (Some(start), Some(end)) = (
                read_u32_le(data, entry_offset),
                read_u32_le(data, entry_offset + 4),
            ) else {
                return Err(DecodeError::MalformedFileTable(format!(
                    "FAT entry {} at 0x{:X} out of bounds",
                    i, entry_offset
                )));
            };

            entries.push(FatEntry {
                start_address: start,
                end_address: end,
            });
        }

        Ok(FileAllocationTable { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub offset: u32, // Offset to sub-table
    pub first_file_id: u16,
    pub parent_id: u16,
}

pub enum FntEntry {
    File(String),
    Directory(String, u16),
}

/// Base ID for directories in the NDS filesystem
/// Directories have IDs starting from 0xF000, with their index added to this base
const DIRECTORY_ID_BASE: u16 = 0xF000;
/// Directory ids run from 0xF000 to 0xFFFF
const MAX_DIRECTORIES: u16 = 0x1000;
const ESTIMATED_ENTRIES_PER_SUBTABLE: usize = 16;
const ESTIMATED_FILES_PER_DIRECTORY: usize = 8;

/// Directory tree and file names of a ROM (FNT) or NARC (BTNF).
#[derive(Debug, Clone, Default)]
pub struct FileNameTable {
    pub directories: Vec<DirectoryEntry>,
    pub file_names: HashMap<u16, String>,
    pub file_directories: HashMap<u16, u16>, // File ID -> owning dir ID
    pub directory_names: HashMap<u16, String>,
    pub directory_structure: HashMap<u16, Vec<u16>>, // Parent ID -> child dir IDs
}

impl FileNameTable {
    pub fn read_from_rom(rom_data: &[u8], fnt_offset: u32) -> Result<Self> {
        let mut fnt = FileNameTable::default();

        fnt.read_main_directory_table(rom_data, fnt_offset)?;
        fnt.parse_subtables(rom_data, fnt_offset)?;

        Ok(fnt)
    }

    fn read_main_directory_table(&mut self, rom_data: &[u8], fnt_offset: u32) -> Result<()> {
        // Firstly, read number of dir from root entry
        let total_dirs = read_u16_le(rom_data, fnt_offset as usize + 6).ok_or_else(|| {
            DecodeError::MalformedFileTable("FNT offset out of bounds".to_string())
        })?;

        if total_dirs > MAX_DIRECTORIES {
            return Err(DecodeError::MalformedFileTable(format!(
                "FNT declares {} directories, more than the {} directory ids",
                total_dirs, MAX_DIRECTORIES
            )));
        }

        self.directories = Vec::with_capacity(total_dirs as usize);

        for i in 0..total_dirs {
            // Each main table entry is 8 bytes
            let dir_offset = fnt_offset as usize + (i as usize * 8);

            let (Some(subtable_offset), Some(first_file_id), Some(parent_or_total)) = (
                read_u32_le(rom_data, dir_offset),
                read_u16_le(rom_data, dir_offset + 4),
                read_u16_le(rom_data, dir_offset + 6),
            ) else {
                return Err(DecodeError::MalformedFileTable(
                    "Directory entry offset out of bounds".to_string(),
                ));
            };

            // For the root directory this is the total number of directories,
            // for every other directory it is the parent directory ID
            let parent_id = if i == 0 { 0xFFFF } else { parent_or_total };

            self.directories.push(DirectoryEntry {
                offset: subtable_offset,
                first_file_id,
                parent_id,
            });
        }

        Ok(())
    }

    /// Parse a single sub-table and return its entries
    fn parse_subtable(
        &self,
        rom_data: &[u8],
        fnt_base: u32,
        subtable_offset: u32,
    ) -> Result<Vec<FntEntry>> {
        let mut entries = Vec::with_capacity(ESTIMATED_ENTRIES_PER_SUBTABLE);
        let mut pos = fnt_base as usize + subtable_offset as usize;

        loop {
            // Highest bit represents file or dir, lower 7 bits represent name length
            let type_and_length_byte = read_u8(rom_data, pos).ok_or_else(|| {
                DecodeError::MalformedFileTable("Unexpected end of data in subtable".to_string())
            })?;
            pos += 1;

            // Check for end of table marker
            if type_and_length_byte == 0 {
                break;
            }

            // `0x7F` = `0b01111111` Nullifies highest bit and stores name length
            let length = (type_and_length_byte & 0x7F) as usize;

            let name_bytes = rom_data.get(pos..pos + length).ok_or_else(|| {
                DecodeError::MalformedFileTable("Name length exceeds available data".to_string())
            })?;
            let name = String::from_utf8_lossy(name_bytes).to_string();
            pos += length;

            // `0x80` = `0b10000000` Only keeps the highest bit
            if type_and_length_byte & 0x80 == 0 {
                entries.push(FntEntry::File(name));
            } else {
                let dir_id = read_u16_le(rom_data, pos).ok_or_else(|| {
                    DecodeError::MalformedFileTable("Directory ID out of bounds".to_string())
                })?;
                pos += 2;
                entries.push(FntEntry::Directory(name, dir_id));
            }
        }

        Ok(entries)
    }

    /// Parse all sub-tables and build our file/directory maps
    fn parse_subtables(&mut self, rom_data: &[u8], fnt_offset: u32) -> Result<()> {
        let dir_count = self.directories.len();
        self.file_names = HashMap::with_capacity(dir_count * ESTIMATED_FILES_PER_DIRECTORY);
        self.file_directories = HashMap::with_capacity(dir_count * ESTIMATED_FILES_PER_DIRECTORY);
        self.directory_names = HashMap::with_capacity(dir_count);
        self.directory_structure = HashMap::with_capacity(dir_count);

        for (dir_index, dir_entry) in self.directories.iter().enumerate() {
            let dir_id = DIRECTORY_ID_BASE + dir_index as u16;
            let entries = self.parse_subtable(rom_data, fnt_offset, dir_entry.offset)?;

            // File IDs are sequential within a directory
            let mut file_id = dir_entry.first_file_id;

            for entry in entries {
                match entry {
                    FntEntry::File(name) => {
                        self.file_names.insert(file_id, name);
                        self.file_directories.insert(file_id, dir_id);
                        file_id = file_id.wrapping_add(1);
                    }
                    FntEntry::Directory(name, child_dir_id) => {
                        self.directory_names.insert(child_dir_id, name);
                        self.directory_structure
                            .entry(dir_id)
                            .or_default()
                            .push(child_dir_id);
                    }
                }
            }
        }

        Ok(())
    }

    /// Get a file ID for a given path
    pub fn get_file_id(&self, path: &str) -> Option<u16> {
        let parts: Vec<&str> = path.trim_matches('/').split('/').collect();
        let (file_name, dir_parts) = parts.split_last()?;

        // Start at the root directory and descend through each named child
        let mut current_dir_id = DIRECTORY_ID_BASE;
        for dir_name in dir_parts {
            let children = self.directory_structure.get(&current_dir_id)?;
            current_dir_id = *children.iter().find(|&&child_id| {
                self.directory_names.get(&child_id).map(String::as_str) == Some(*dir_name)
            })?;
        }

        let dir_index = (current_dir_id & 0x0FFF) as usize;
        let dir_entry = self.directories.get(dir_index)?;

        // Files of one directory have consecutive IDs from first_file_id
        let mut id = dir_entry.first_file_id;
        while self.file_directories.get(&id) == Some(&current_dir_id) {
            if self.file_names.get(&id).map(String::as_str) == Some(*file_name) {
                return Some(id);
            }
            id = id.checked_add(1)?;
        }

        None
    }

    /// Full `dir/sub/file` path of a file, if the table names it.
    pub fn name_of(&self, file_id: u16) -> Option<String> {
        let file_name = self.file_names.get(&file_id)?;
        let mut parts = vec![file_name.as_str()];

        let mut dir_id = *self.file_directories.get(&file_id)?;
        while dir_id != DIRECTORY_ID_BASE {
            // A parent chain longer than the table itself can only be a cycle
            if parts.len() > self.directories.len() {
                return None;
            }
            parts.push(self.directory_names.get(&dir_id)?.as_str());
            let dir_index = (dir_id & 0x0FFF) as usize;
            dir_id = self.directories.get(dir_index)?.parent_id;
        }

        parts.reverse();
        Some(parts.join("/"))
    }
}
