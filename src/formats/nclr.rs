//! # NCLR palettes
//!
//! The palette colours live in the `PLTT` chunk. The chunk payload opens with
//! an 8-byte sub-header (palette bit depth, extended flag) followed by packed
//! little-endian RGB555 values, one per colour.

use serde::Serialize;

use crate::{
    binary_utils::read_u32_le,
    color::{rgb555_to_rgb888, Rgb},
    error::{DecodeError, Result},
    formats::chunk::{Container, NCLR_MAGIC, PLTT_MAGIC},
};

pub const PLTT_SUBHEADER_LEN: usize = 8;
pub const COLOURS_PER_PALETTE: usize = 16;

/// Palette shape, derived from the colour count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DepthClass {
    /// A single 4bpp palette.
    Sixteen,
    /// A single 8bpp palette.
    TwoFiftySix,
    /// Several 4bpp palettes back to back.
    Multiple16,
    Custom,
}

impl DepthClass {
    pub fn from_count(count: usize) -> Self {
        match count {
            16 => DepthClass::Sixteen,
            256 => DepthClass::TwoFiftySix,
            n if n > 0 && n % COLOURS_PER_PALETTE == 0 => DepthClass::Multiple16,
            _ => DepthClass::Custom,
        }
    }

    pub fn describe(&self, count: usize) -> String {
        match self {
            DepthClass::Sixteen => "4bpp (16 colors)".to_string(),
            DepthClass::TwoFiftySix => "8bpp (256 colors)".to_string(),
            DepthClass::Multiple16 => format!(
                "Multiple 4bpp palettes ({} palettes)",
                count / COLOURS_PER_PALETTE
            ),
            DepthClass::Custom => format!("Custom ({} colors)", count),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaletteHeader {
    /// 3 for 4bpp palettes, 4 for 8bpp.
    pub bit_depth: u32,
    pub extended: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteTable {
    pub colors: Vec<u16>,
    pub depth_class: DepthClass,
    pub header: PaletteHeader,
}

impl PaletteTable {
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Number of whole 16-colour palettes in the table.
    pub fn palette_count(&self) -> usize {
        self.colors.len() / COLOURS_PER_PALETTE
    }

    pub fn to_rgb888(&self) -> Vec<Rgb> {
        self.colors.iter().map(|&c| rgb555_to_rgb888(c)).collect()
    }

    /// The raw `.pal` stream the engine loads: little-endian RGB555.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.colors.iter().flat_map(|c| c.to_le_bytes()).collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        let listing = PaletteJson {
            format: "RGB555",
            color_count: self.colors.len(),
            colors: self
                .colors
                .iter()
                .enumerate()
                .map(|(index, &rgb555)| {
                    let rgb = rgb555_to_rgb888(rgb555);
                    ColorJson {
                        index,
                        rgb555,
                        rgb555_hex: format!("0x{:04x}", rgb555),
                        rgb888: [rgb.r, rgb.g, rgb.b],
                        hex: rgb.hex(),
                    }
                })
                .collect(),
        };
        serde_json::to_string_pretty(&listing)
    }
}

#[derive(Serialize)]
struct PaletteJson {
    format: &'static str,
    color_count: usize,
    colors: Vec<ColorJson>,
}

#[derive(Serialize)]
struct ColorJson {
    index: usize,
    rgb555: u16,
    rgb555_hex: String,
    rgb888: [u8; 3],
    hex: String,
}

/// Decode an NCLR file into its colour table.
pub fn decode_palette(buffer: &[u8]) -> Result<PaletteTable> {
    let container = Container::parse(buffer, NCLR_MAGIC)?;
    let chunk = container.find_chunk(PLTT_MAGIC)?;
    let payload = chunk.payload;

    if payload.len() < PLTT_SUBHEADER_LEN {
        return Err(DecodeError::MalformedPalette(format!(
            "PLTT payload of {} bytes is shorter than its {}-byte header",
            payload.len(),
            PLTT_SUBHEADER_LEN
        )));
    }

    let header = PaletteHeader {
        bit_depth: read_u32_le(payload, 0).unwrap_or_default(),
        extended: read_u32_le(payload, 4).unwrap_or_default(),
    };

    let data = &payload[PLTT_SUBHEADER_LEN..];
    if data.len() % 2 != 0 {
        return Err(DecodeError::MalformedPalette(format!(
            "{} bytes of colour data is not a whole number of RGB555 values",
            data.len()
        )));
    }

    let colors: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    Ok(PaletteTable {
        depth_class: DepthClass::from_count(colors.len()),
        colors,
        header,
    })
}
