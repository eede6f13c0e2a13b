//! Nitro resource formats
//!
//! Every format here is a Nitro container: a 16-byte header followed by
//! tagged chunks, walked by [`chunk`]. Tags are compared in stored byte
//! order, so `NCLR` is matched as `RLCN` and `NARC` as `NARC`.

pub mod chunk;
pub mod narc;
pub mod ncgr;
pub mod nclr;

#[cfg(test)]
pub(crate) mod testing;

pub use chunk::{find_chunk, walk_chunks, Chunk, Container, ContainerHeader, Tag};
pub use narc::{pack_narc, parse_narc, Narc};
pub use ncgr::{decode_tiles, BitDepth, TileSheet};
pub use nclr::{decode_palette, DepthClass, PaletteTable};
