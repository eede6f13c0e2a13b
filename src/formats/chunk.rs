//! # Nitro chunk model
//!
//! Every Nitro resource (NCLR, NCGR, NARC, ...) is a 16-byte container header
//! followed by a run of chunks. Each chunk starts with a 4-byte tag and a
//! little-endian `u32` length that counts the 8 header bytes too.
//!
//! Tags are stored byte-reversed relative to their names: the palette chunk
//! `PLTT` is written to disk as `TTLP`. The constants in this module are the
//! stored form and are compared byte for byte, never reversed at runtime.

use crate::{
    binary_utils::{read_tag, read_u16_le, read_u32_le},
    error::{DecodeError, Result},
};

pub type Tag = [u8; 4];

pub const CONTAINER_HEADER_LEN: usize = 16;
pub const CHUNK_HEADER_LEN: usize = 8;

/// NCLR palette resource.
pub const NCLR_MAGIC: Tag = *b"RLCN";
/// PLTT palette data chunk.
pub const PLTT_MAGIC: Tag = *b"TTLP";
/// NCGR character graphics resource.
pub const NCGR_MAGIC: Tag = *b"RGCN";
/// CHAR character data chunk.
pub const CHAR_MAGIC: Tag = *b"RAHC";
/// NARC archives are the one format that keeps its magic in reading order.
pub const NARC_MAGIC: Tag = *b"NARC";
/// FATB file allocation chunk.
pub const FATB_MAGIC: Tag = *b"BTAF";
/// FNTB file name chunk.
pub const FNTB_MAGIC: Tag = *b"BTNF";
/// FIMG file image chunk.
pub const FIMG_MAGIC: Tag = *b"GMIF";

/// Render a tag as stored, escaping anything that is not printable ASCII.
pub fn display_tag(tag: &Tag) -> String {
    let text: String = tag
        .iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                (b as char).to_string()
            } else {
                format!("\\x{:02X}", b)
            }
        })
        .collect();
    format!("\"{}\"", text)
}

/// A single tagged, length-prefixed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub tag: Tag,
    /// Length from the chunk header, header bytes included.
    pub declared_length: u32,
    /// Offset of the chunk header within the walked buffer.
    pub offset: usize,
    pub payload: &'a [u8],
}

impl<'a> Chunk<'a> {
    /// Read the chunk whose header starts at `offset`.
    pub fn read(buffer: &'a [u8], offset: usize) -> Result<Self> {
        let available = buffer.len().saturating_sub(offset);
        let (Some(tag), Some(declared_length)) =
            (read_tag(buffer, offset), read_u32_le(buffer, offset.saturating_add(4)))
        else {
            return Err(DecodeError::TruncatedHeader {
                offset,
                needed: CHUNK_HEADER_LEN,
                available,
            });
        };

        if (declared_length as usize) < CHUNK_HEADER_LEN {
            return Err(DecodeError::InvalidChunkLength {
                tag,
                offset,
                declared: declared_length,
            });
        }

        let payload_start = offset + CHUNK_HEADER_LEN;
        let payload_len = declared_length as usize - CHUNK_HEADER_LEN;
        let payload_available = available - CHUNK_HEADER_LEN;
        if payload_len > payload_available {
            return Err(DecodeError::ChunkOverrun {
                tag,
                offset,
                declared: declared_length,
                available,
            });
        }

        Ok(Chunk {
            tag,
            declared_length,
            offset,
            payload: &buffer[payload_start..payload_start + payload_len],
        })
    }

    /// Offset of the next chunk header, driven by the declared length.
    pub fn end(&self) -> usize {
        self.offset + self.declared_length as usize
    }
}

/// Lazy walk over consecutive chunks. Stops at the end of the buffer and
/// yields nothing more after its first error.
#[derive(Debug, Clone)]
pub struct ChunkWalker<'a> {
    buffer: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> Iterator for ChunkWalker<'a> {
    type Item = Result<Chunk<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.buffer.len() {
            return None;
        }

        match Chunk::read(self.buffer, self.offset) {
            Ok(chunk) => {
                self.offset = chunk.end();
                Some(Ok(chunk))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for ChunkWalker<'_> {}

/// Walk the chunks of `buffer` starting at `start_offset`.
///
/// Calling this again with the same arguments restarts the walk.
pub fn walk_chunks(buffer: &[u8], start_offset: usize) -> ChunkWalker<'_> {
    ChunkWalker {
        buffer,
        offset: start_offset,
        failed: false,
    }
}

/// Walk until a chunk tagged `tag` turns up. Walk errors hit before that
/// point are returned as-is.
pub fn find_chunk(buffer: &[u8], start_offset: usize, tag: Tag) -> Result<Chunk<'_>> {
    for chunk in walk_chunks(buffer, start_offset) {
        let chunk = chunk?;
        if chunk.tag == tag {
            return Ok(chunk);
        }
    }
    Err(DecodeError::ChunkNotFound(tag))
}

/// The generic 16-byte header shared by every Nitro container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    pub magic: Tag,
    pub byte_order: u16,
    pub version: u16,
    pub total_length: u32,
    pub header_size: u16,
    pub chunk_count: u16,
}

impl ContainerHeader {
    pub fn read(buffer: &[u8]) -> Result<Self> {
        let truncated = || DecodeError::TruncatedHeader {
            offset: 0,
            needed: CONTAINER_HEADER_LEN,
            available: buffer.len(),
        };
        if buffer.len() < CONTAINER_HEADER_LEN {
            return Err(truncated());
        }

        Ok(ContainerHeader {
            magic: read_tag(buffer, 0).ok_or_else(truncated)?,
            byte_order: read_u16_le(buffer, 4).ok_or_else(truncated)?,
            version: read_u16_le(buffer, 6).ok_or_else(truncated)?,
            total_length: read_u32_le(buffer, 8).ok_or_else(truncated)?,
            header_size: read_u16_le(buffer, 12).ok_or_else(truncated)?,
            chunk_count: read_u16_le(buffer, 14).ok_or_else(truncated)?,
        })
    }
}

/// A whole-file container whose magic has been checked.
#[derive(Debug, Clone, Copy)]
pub struct Container<'a> {
    pub header: ContainerHeader,
    buffer: &'a [u8],
}

impl<'a> Container<'a> {
    pub fn parse(buffer: &'a [u8], expected_magic: Tag) -> Result<Self> {
        let found = read_tag(buffer, 0).ok_or(DecodeError::TruncatedHeader {
            offset: 0,
            needed: CONTAINER_HEADER_LEN,
            available: buffer.len(),
        })?;
        if found != expected_magic {
            return Err(DecodeError::BadMagic {
                expected: expected_magic,
                found,
            });
        }

        let header = ContainerHeader::read(buffer)?;
        Ok(Container { header, buffer })
    }

    pub fn chunks(&self) -> ChunkWalker<'a> {
        walk_chunks(self.buffer, CONTAINER_HEADER_LEN)
    }

    pub fn find_chunk(&self, tag: Tag) -> Result<Chunk<'a>> {
        find_chunk(self.buffer, CONTAINER_HEADER_LEN, tag)
    }

    /// Whether the chunk lengths plus the header add up to the declared
    /// total. Files that fail this still decode.
    pub fn check_lengths(&self) -> Result<bool> {
        let mut sum = self.header.header_size as u64;
        for chunk in self.chunks() {
            sum += chunk?.declared_length as u64;
        }
        Ok(sum == self.header.total_length as u64)
    }
}
