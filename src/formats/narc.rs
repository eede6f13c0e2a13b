//! # NARC archives
//!
//! A NARC is a Nitro container with three chunks:
//!
//! - `BTAF` (FATB): file count, then `(start, end)` pairs relative to the
//!   file image
//! - `BTNF` (FNTB): a file name table in the same layout as the ROM's FNT;
//!   most archives carry only an empty root directory
//! - `GMIF` (FIMG): the concatenated file data

use tracing::warn;

use crate::{
    archive::ArchiveIndex,
    binary_utils::read_u16_le,
    error::{DecodeError, Result},
    filesystem::{FileAllocationTable, FileNameTable},
    formats::chunk::{
        Chunk, Container, ContainerHeader, CHUNK_HEADER_LEN, CONTAINER_HEADER_LEN, FATB_MAGIC,
        FIMG_MAGIC, FNTB_MAGIC, NARC_MAGIC,
    },
};

const FATB_HEADER_LEN: usize = 4;
const FIMG_ALIGNMENT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatbHeader {
    pub file_count: u16,
    pub reserved: u16,
}

#[derive(Debug, Clone)]
pub struct Narc<'a> {
    pub header: ContainerHeader,
    pub fatb: FatbHeader,
    pub files: ArchiveIndex<'a>,
}

impl<'a> Narc<'a> {
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        let container = Container::parse(buffer, NARC_MAGIC)?;

        let mut fatb: Option<Chunk<'a>> = None;
        let mut fntb: Option<Chunk<'a>> = None;
        let mut fimg: Option<Chunk<'a>> = None;
        for chunk in container.chunks() {
            let chunk = chunk?;
            match chunk.tag {
                FATB_MAGIC => fatb = Some(chunk),
                FNTB_MAGIC => fntb = Some(chunk),
                FIMG_MAGIC => fimg = Some(chunk),
                _ => {}
            }
        }
        let fatb = fatb.ok_or(DecodeError::ChunkNotFound(FATB_MAGIC))?;
        let fimg = fimg.ok_or(DecodeError::ChunkNotFound(FIMG_MAGIC))?;

        let (Some(file_count), Some(reserved)) =
            (read_u16_le(fatb.payload, 0), read_u16_le(fatb.payload, 2))
        else {
            return Err(DecodeError::TruncatedHeader {
                offset: fatb.offset,
                needed: FATB_HEADER_LEN,
                available: fatb.payload.len(),
            });
        };
        let table =
            FileAllocationTable::read_entries(fatb.payload, FATB_HEADER_LEN, file_count as usize)?;

        // Names are cosmetic; a broken name table never blocks extraction.
        let names = fntb.and_then(|chunk| match FileNameTable::read_from_rom(chunk.payload, 0) {
            Ok(fnt) if !fnt.file_names.is_empty() => Some(fnt),
            Ok(_) => None,
            Err(e) => {
                warn!("Ignoring unreadable NARC name table: {}", e);
                None
            }
        });

        Ok(Narc {
            header: container.header,
            fatb: FatbHeader {
                file_count,
                reserved,
            },
            files: ArchiveIndex::open(fimg.payload, table, names),
        })
    }
}

/// Parse a NARC straight into its file index.
pub fn parse_narc(buffer: &[u8]) -> Result<ArchiveIndex<'_>> {
    Narc::parse(buffer).map(|narc| narc.files)
}

fn narc_u32(what: &'static str, value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| DecodeError::ArchiveTooLarge { what, value })
}

/// Serialise files into an unnamed NARC, each file padded to 4 bytes.
///
/// Fails when the file count exceeds `u16` or any offset exceeds `u32`.
pub fn pack_narc(files: &[Vec<u8>]) -> Result<Vec<u8>> {
    let file_count = u16::try_from(files.len()).map_err(|_| DecodeError::ArchiveTooLarge {
        what: "file count",
        value: files.len(),
    })?;

    let mut image = Vec::new();
    let mut fatb = Vec::with_capacity(FATB_HEADER_LEN + files.len() * 8);
    fatb.extend_from_slice(&file_count.to_le_bytes());
    fatb.extend_from_slice(&0u16.to_le_bytes());

    for file in files {
        let start = narc_u32("file offset", image.len())?;
        image.extend_from_slice(file);
        let end = narc_u32("file offset", image.len())?;
        fatb.extend_from_slice(&start.to_le_bytes());
        fatb.extend_from_slice(&end.to_le_bytes());

        let padding = (FIMG_ALIGNMENT - image.len() % FIMG_ALIGNMENT) % FIMG_ALIGNMENT;
        image.extend(std::iter::repeat(0xFF).take(padding));
    }

    // Root directory only: sub-table at offset 4, first file 0, one directory
    let mut fntb = Vec::with_capacity(8);
    fntb.extend_from_slice(&4u32.to_le_bytes());
    fntb.extend_from_slice(&0u16.to_le_bytes());
    fntb.extend_from_slice(&1u16.to_le_bytes());

    let chunks = [(FATB_MAGIC, fatb), (FNTB_MAGIC, fntb), (FIMG_MAGIC, image)];
    let total: usize = CONTAINER_HEADER_LEN
        + chunks
            .iter()
            .map(|(_, payload)| CHUNK_HEADER_LEN + payload.len())
            .sum::<usize>();
    let total_length = narc_u32("archive length", total)?;

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&NARC_MAGIC);
    out.extend_from_slice(&0xFFFEu16.to_le_bytes());
    out.extend_from_slice(&0x0100u16.to_le_bytes());
    out.extend_from_slice(&total_length.to_le_bytes());
    out.extend_from_slice(&(CONTAINER_HEADER_LEN as u16).to_le_bytes());
    out.extend_from_slice(&(chunks.len() as u16).to_le_bytes());
    for (tag, payload) in &chunks {
        out.extend_from_slice(tag);
        let chunk_length = narc_u32("chunk length", CHUNK_HEADER_LEN + payload.len())?;
        out.extend_from_slice(&chunk_length.to_le_bytes());
        out.extend_from_slice(payload);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{filesystem::tests::sample_fnt, formats::testing::build_container};

    #[test]
    fn packed_archive_reads_back() {
        let files = vec![vec![1, 2, 3], vec![], vec![4; 9]];
        let data = pack_narc(&files).unwrap();

        let narc = Narc::parse(&data).unwrap();
        assert_eq!(narc.fatb.file_count, 3);
        assert_eq!(narc.header.total_length as usize, data.len());
        assert_eq!(narc.header.chunk_count, 3);

        let archive = narc.files;
        assert_eq!(archive.len(), 3);
        assert_eq!(archive.get_file(0).unwrap(), &[1, 2, 3]);
        assert!(matches!(
            archive.get_file(1),
            Err(DecodeError::IndexOutOfRange { id: 1, .. })
        ));
        assert_eq!(archive.get_file(2).unwrap(), &[4; 9]);
        assert!(!archive.has_names());
    }

    #[test]
    fn file_count_past_u16_is_rejected() {
        let files = vec![Vec::new(); u16::MAX as usize + 1];
        assert_eq!(
            pack_narc(&files).unwrap_err(),
            DecodeError::ArchiveTooLarge {
                what: "file count",
                value: 0x10000
            }
        );

        let data = pack_narc(&files[1..]).unwrap();
        assert_eq!(Narc::parse(&data).unwrap().fatb.file_count, u16::MAX);
    }

    #[test]
    fn file_offsets_are_relative_to_the_image() {
        let data = pack_narc(&[vec![0xAB; 4], vec![0xCD; 2]]).unwrap();
        let archive = parse_narc(&data).unwrap();
        assert_eq!(archive.get_file(1).unwrap(), &[0xCD, 0xCD]);
    }

    #[test]
    fn named_archive() {
        let mut fatb = Vec::new();
        fatb.extend_from_slice(&7u16.to_le_bytes());
        fatb.extend_from_slice(&0u16.to_le_bytes());
        for i in 0..7u32 {
            fatb.extend_from_slice(&i.to_le_bytes());
            fatb.extend_from_slice(&(i + 1).to_le_bytes());
        }
        let data = build_container(
            NARC_MAGIC,
            &[
                (FATB_MAGIC, fatb),
                (FNTB_MAGIC, sample_fnt()),
                (FIMG_MAGIC, (0..8).collect()),
            ],
        );

        let archive = parse_narc(&data).unwrap();
        assert_eq!(archive.name_of(5).as_deref(), Some("data/b.bin"));
        assert_eq!(archive.file_id("a.bin"), Some(4));
        assert_eq!(archive.get_file(4).unwrap(), &[4]);
    }

    #[test]
    fn missing_file_image() {
        let data = build_container(NARC_MAGIC, &[(FATB_MAGIC, vec![0; 4])]);
        assert_eq!(
            parse_narc(&data).unwrap_err(),
            DecodeError::ChunkNotFound(FIMG_MAGIC)
        );
    }

    #[test]
    fn reversed_magic_is_not_a_narc() {
        let mut data = pack_narc(&[vec![1]]).unwrap();
        data[..4].copy_from_slice(b"CRAN");
        assert!(matches!(
            parse_narc(&data),
            Err(DecodeError::BadMagic { .. })
        ));
    }

    #[test]
    fn short_file_table() {
        let mut fatb = Vec::new();
        fatb.extend_from_slice(&2u16.to_le_bytes());
        fatb.extend_from_slice(&0u16.to_le_bytes());
        fatb.extend_from_slice(&[0; 8]);
        let data = build_container(NARC_MAGIC, &[(FATB_MAGIC, fatb), (FIMG_MAGIC, vec![])]);
        assert!(matches!(
            parse_narc(&data),
            Err(DecodeError::MalformedFileTable(_))
        ));
    }
}
