//! # NCGR character graphics
//!
//! Tile pixels live in the `CHAR` chunk. Its payload starts with an 8-byte
//! sub-header:
//!
//! | offset | size | field                         |
//! |--------|------|-------------------------------|
//! | 0      | 2    | height in tiles               |
//! | 2      | 2    | width in tiles                |
//! | 4      | 1    | depth indicator (3 = 4bpp, 4 = 8bpp) |
//! | 5      | 3    | unused                        |
//!
//! Everything after the sub-header is the packed pixel stream, 8x8 tiles
//! back to back. The stream is copied out untouched.

use crate::{
    binary_utils::{read_u16_le, read_u8},
    error::{DecodeError, Result},
    formats::chunk::{Container, CHAR_MAGIC, NCGR_MAGIC},
};

pub const CHAR_SUBHEADER_LEN: usize = 8;
pub const DEPTH_INDICATOR_OFFSET: usize = 4;
pub const TILE_DIM: usize = 8;
pub const PIXELS_PER_TILE: usize = TILE_DIM * TILE_DIM;

const DEPTH_4BPP: u8 = 3;
const DEPTH_8BPP: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum BitDepth {
    Four,
    Eight,
}

impl BitDepth {
    pub fn from_indicator(value: u8) -> Result<Self> {
        match value {
            DEPTH_4BPP => Ok(BitDepth::Four),
            DEPTH_8BPP => Ok(BitDepth::Eight),
            other => Err(DecodeError::UnknownDepth(other)),
        }
    }

    pub fn bits(&self) -> usize {
        match self {
            BitDepth::Four => 4,
            BitDepth::Eight => 8,
        }
    }

    /// 32 bytes for a 4bpp tile, 64 for 8bpp.
    pub fn bytes_per_tile(&self) -> usize {
        PIXELS_PER_TILE * self.bits() / 8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CharHeader {
    pub height_tiles: u16,
    pub width_tiles: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSheet {
    pub pixel_stream: Vec<u8>,
    pub bits_per_pixel: BitDepth,
    pub header: CharHeader,
}

impl TileSheet {
    pub fn bytes_per_tile(&self) -> usize {
        self.bits_per_pixel.bytes_per_tile()
    }

    pub fn tile_count(&self) -> usize {
        self.pixel_stream.len() / self.bytes_per_tile()
    }

    /// Packed bytes of one tile.
    pub fn tile(&self, index: usize) -> Option<&[u8]> {
        let size = self.bytes_per_tile();
        let start = index.checked_mul(size)?;
        self.pixel_stream.get(start..start.checked_add(size)?)
    }

    /// Unpack one tile into 64 palette indices, row-major. 4bpp bytes hold
    /// the left pixel in the low nibble.
    pub fn tile_indices(&self, index: usize) -> Option<[u8; PIXELS_PER_TILE]> {
        let tile = self.tile(index)?;
        let mut pixels = [0u8; PIXELS_PER_TILE];
        match self.bits_per_pixel {
            BitDepth::Four => {
                for (i, &byte) in tile.iter().enumerate() {
                    pixels[i * 2] = byte & 0x0F;
                    pixels[i * 2 + 1] = (byte >> 4) & 0x0F;
                }
            }
            BitDepth::Eight => pixels.copy_from_slice(tile),
        }
        Some(pixels)
    }
}

/// Decode an NCGR file into its depth and raw tile stream.
pub fn decode_tiles(buffer: &[u8]) -> Result<TileSheet> {
    let container = Container::parse(buffer, NCGR_MAGIC)?;
    let chunk = container.find_chunk(CHAR_MAGIC)?;
    let payload = chunk.payload;

    if payload.len() < CHAR_SUBHEADER_LEN {
        return Err(DecodeError::TruncatedHeader {
            offset: chunk.offset,
            needed: CHAR_SUBHEADER_LEN,
            available: payload.len(),
        });
    }

    let indicator = read_u8(payload, DEPTH_INDICATOR_OFFSET).unwrap_or_default();
    let bits_per_pixel = BitDepth::from_indicator(indicator)?;
    let header = CharHeader {
        height_tiles: read_u16_le(payload, 0).unwrap_or_default(),
        width_tiles: read_u16_le(payload, 2).unwrap_or_default(),
    };

    let pixel_stream = &payload[CHAR_SUBHEADER_LEN..];
    let bytes_per_tile = bits_per_pixel.bytes_per_tile();
    if pixel_stream.len() % bytes_per_tile != 0 {
        return Err(DecodeError::TruncatedTileData {
            length: pixel_stream.len(),
            bytes_per_tile,
        });
    }

    Ok(TileSheet {
        pixel_stream: pixel_stream.to_vec(),
        bits_per_pixel,
        header,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::{chunk::NCLR_MAGIC, testing::build_container};

    fn char_payload(depth: u8, pixels: &[u8]) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&2u16.to_le_bytes());
        payload.extend_from_slice(&5u16.to_le_bytes());
        payload.extend_from_slice(&[depth, 0, 0, 0]);
        payload.extend_from_slice(pixels);
        payload
    }

    fn ncgr(depth: u8, pixels: &[u8]) -> Vec<u8> {
        build_container(NCGR_MAGIC, &[(CHAR_MAGIC, char_payload(depth, pixels))])
    }

    #[test]
    fn tile_count_follows_depth() {
        let pixels: Vec<u8> = (0..320).map(|i| i as u8).collect();

        let four = decode_tiles(&ncgr(3, &pixels)).unwrap();
        assert_eq!(four.bits_per_pixel, BitDepth::Four);
        assert_eq!(four.bytes_per_tile(), 32);
        assert_eq!(four.tile_count(), 10);

        let eight = decode_tiles(&ncgr(4, &pixels)).unwrap();
        assert_eq!(eight.bits_per_pixel, BitDepth::Eight);
        assert_eq!(eight.bytes_per_tile(), 64);
        assert_eq!(eight.tile_count(), 5);
        assert_eq!(eight.pixel_stream, pixels);
    }

    #[test]
    fn sub_header_dimensions() {
        let sheet = decode_tiles(&ncgr(3, &[0; 32])).unwrap();
        assert_eq!(
            sheet.header,
            CharHeader {
                height_tiles: 2,
                width_tiles: 5
            }
        );
    }

    #[test]
    fn unknown_depth_is_rejected() {
        assert_eq!(
            decode_tiles(&ncgr(5, &[0; 64])).unwrap_err(),
            DecodeError::UnknownDepth(5)
        );
        assert_eq!(
            decode_tiles(&ncgr(0, &[0; 64])).unwrap_err(),
            DecodeError::UnknownDepth(0)
        );
    }

    #[test]
    fn partial_tile_is_truncated() {
        assert_eq!(
            decode_tiles(&ncgr(4, &[0; 100])).unwrap_err(),
            DecodeError::TruncatedTileData {
                length: 100,
                bytes_per_tile: 64
            }
        );
    }

    #[test]
    fn empty_stream_has_no_tiles() {
        let sheet = decode_tiles(&ncgr(3, &[])).unwrap();
        assert_eq!(sheet.tile_count(), 0);
        assert!(sheet.tile(0).is_none());
    }

    #[test]
    fn wrong_magic_and_missing_chunk() {
        let palette = build_container(NCLR_MAGIC, &[(CHAR_MAGIC, char_payload(3, &[]))]);
        assert!(matches!(
            decode_tiles(&palette),
            Err(DecodeError::BadMagic { .. })
        ));

        let unreversed_tag = build_container(NCGR_MAGIC, &[(*b"CHAR", char_payload(3, &[]))]);
        assert_eq!(
            decode_tiles(&unreversed_tag).unwrap_err(),
            DecodeError::ChunkNotFound(CHAR_MAGIC)
        );
    }

    #[test]
    fn unpacks_4bpp_low_nibble_first() {
        let mut pixels = vec![0u8; 64];
        pixels[0] = 0x21;
        pixels[31] = 0xF0;
        pixels[32] = 0x07;
        let sheet = decode_tiles(&ncgr(3, &pixels)).unwrap();

        let first = sheet.tile_indices(0).unwrap();
        assert_eq!(&first[..2], &[1, 2]);
        assert_eq!(&first[62..], &[0, 15]);
        assert_eq!(sheet.tile_indices(1).unwrap()[0], 7);
        assert!(sheet.tile_indices(2).is_none());
    }

    #[test]
    fn unpacks_8bpp_verbatim() {
        let pixels: Vec<u8> = (0..64).collect();
        let sheet = decode_tiles(&ncgr(4, &pixels)).unwrap();
        assert_eq!(sheet.tile_indices(0).unwrap().to_vec(), pixels);
    }
}
