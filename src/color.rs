//! # RGB555 colour math
//!
//! DS colours are 15-bit: red in bits 0-4, green in 5-9, blue in 10-14.
//! Bit 15 carries no colour and is ignored.
//!
//! Expansion to 8 bits uses the truncating `c * 255 / 31`, which matches the
//! converter output the engine assets were built with. Whether the hardware
//! itself rounds is unverified.

use serde::Serialize;

const CHANNEL_MASK: u16 = 0x1F;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// `#rrggbb`
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Scale a 5-bit channel to 8 bits. Inputs are masked to 5 bits first.
pub fn expand_5_to_8(channel: u8) -> u8 {
    let c = (channel as u16) & CHANNEL_MASK;
    (c * 255 / 31) as u8
}

/// Scale an 8-bit channel down to 5 bits, rounding to nearest.
///
/// This is one-directional: 8 -> 5 -> 8 loses the low bits.
pub fn pack_8_to_5(channel: u8) -> u8 {
    ((channel as u16 * 31 + 127) / 255) as u8
}

/// Split an RGB555 value into its `(r, g, b)` 5-bit channels.
pub fn split_rgb555(value: u16) -> (u8, u8, u8) {
    (
        (value & CHANNEL_MASK) as u8,
        ((value >> 5) & CHANNEL_MASK) as u8,
        ((value >> 10) & CHANNEL_MASK) as u8,
    )
}

pub fn join_rgb555(r: u8, g: u8, b: u8) -> u16 {
    (r as u16 & CHANNEL_MASK)
        | ((g as u16 & CHANNEL_MASK) << 5)
        | ((b as u16 & CHANNEL_MASK) << 10)
}

pub fn rgb555_to_rgb888(value: u16) -> Rgb {
    let (r, g, b) = split_rgb555(value);
    Rgb::new(expand_5_to_8(r), expand_5_to_8(g), expand_5_to_8(b))
}

/// Pack an 8-bit colour back into RGB555 for re-serialisation.
pub fn rgb888_to_rgb555(colour: Rgb) -> u16 {
    join_rgb555(
        pack_8_to_5(colour.r),
        pack_8_to_5(colour.g),
        pack_8_to_5(colour.b),
    )
}
