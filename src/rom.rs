use std::path::Path;

use tracing::{debug, warn};

use crate::{
    archive::ArchiveIndex,
    binary_utils::{read_ascii, read_u32_le, read_u8},
    error::{DecodeError, PipelineError, Result},
    filesystem::{FileAllocationTable, FileNameTable},
    source::ByteSource,
};

/// Bytes of the cartridge header this crate reads, up to the end of the FAT size field.
const HEADER_READ_LEN: usize = 0x50;

/// ROM header information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomHeader {
    pub game_title: String,
    pub game_code: String,
    pub maker_code: String,
    pub unit_code: u8,
    pub rom_version: u8,
    pub fnt_offset: u32,
    pub fnt_size: u32,
    pub fat_offset: u32,
    pub fat_size: u32,
}

/// Read the ROM header from the start of a ROM image
pub fn read_header(rom_data: &[u8]) -> Result<RomHeader> {
    let truncated = || DecodeError::TruncatedHeader {
        offset: 0,
        needed: HEADER_READ_LEN,
        available: rom_data.len(),
    };
    if rom_data.len() < HEADER_READ_LEN {
        return Err(truncated());
    }

    Ok(RomHeader {
        // Game title (12 bytes), game code (4 bytes), maker code (2 bytes)
        game_title: read_ascii(rom_data, 0x000, 12).ok_or_else(truncated)?,
        game_code: read_ascii(rom_data, 0x00C, 4).ok_or_else(truncated)?,
        maker_code: read_ascii(rom_data, 0x010, 2).ok_or_else(truncated)?,
        unit_code: read_u8(rom_data, 0x012).ok_or_else(truncated)?,
        rom_version: read_u8(rom_data, 0x01E).ok_or_else(truncated)?,
        fnt_offset: read_u32_le(rom_data, 0x040).ok_or_else(truncated)?,
        fnt_size: read_u32_le(rom_data, 0x044).ok_or_else(truncated)?,
        fat_offset: read_u32_le(rom_data, 0x048).ok_or_else(truncated)?,
        fat_size: read_u32_le(rom_data, 0x04C).ok_or_else(truncated)?,
    })
}

/// Build the file index of a whole ROM image from its FAT and FNT.
///
/// A ROM without a usable FNT still indexes; its files just have no names.
pub fn file_table(rom_data: &[u8]) -> Result<ArchiveIndex<'_>> {
    let header = read_header(rom_data)?;
    let fat = FileAllocationTable::read_from_rom(rom_data, header.fat_offset, header.fat_size)?;

    let fnt = if header.fnt_size == 0 {
        None
    } else {
        match FileNameTable::read_from_rom(rom_data, header.fnt_offset) {
            Ok(fnt) => Some(fnt),
            Err(e) => {
                warn!("ROM name table unreadable, continuing without names: {}", e);
                None
            }
        }
    };

    debug!(
        "Indexed {} FAT entries ({} named)",
        fat.len(),
        fnt.as_ref().map_or(0, |f| f.file_names.len())
    );
    Ok(ArchiveIndex::open(rom_data, fat, fnt))
}

/// Represents a Nintendo DS ROM
#[derive(Debug, Clone)]
pub struct Rom {
    pub header: RomHeader,
    pub data: Vec<u8>,
}

impl Rom {
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let header = read_header(&data)?;
        Ok(Rom { header, data })
    }

    /// Load a ROM through a byte source
    pub fn open<S: ByteSource>(source: &S, path: &Path) -> Result<Self, PipelineError> {
        let data = source.read_all(path)?;
        let rom = Rom::from_bytes(data)?;
        debug!(
            "Loaded ROM {:?}: {} ({}), {} bytes",
            path,
            rom.header.game_title,
            rom.header.game_code,
            rom.data.len()
        );
        Ok(rom)
    }

    pub fn archive(&self) -> Result<ArchiveIndex<'_>> {
        file_table(&self.data)
    }
}
