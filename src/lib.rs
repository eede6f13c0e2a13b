//! Decoders for Nintendo DS Nitro assets: NARC archives, NCLR palettes and
//! NCGR tile sheets, plus the ROM filesystem they live in.

pub mod archive;
pub mod binary_utils;
pub mod color;
pub mod error;
pub mod filesystem;
pub mod formats;
pub mod manifest;
pub mod pipeline;
pub mod rom;
pub mod source;

pub use archive::ArchiveIndex;
pub use color::{expand_5_to_8, pack_8_to_5, rgb555_to_rgb888, split_rgb555, Rgb};
pub use error::{DecodeError, PipelineError, SourceError};
pub use formats::{decode_palette, decode_tiles, parse_narc};
pub use pipeline::{
    convert_archive, decode_archive_entry, Asset, AssetKind, BatchSummary, ConvertOptions,
};
pub use rom::Rom;
