//! Glue between archives, decoders and output files.
//!
//! Batch runs never stop at a bad entry: the failure is logged with its id
//! and kept in the returned [`BatchSummary`], and the remaining entries are
//! converted as usual.

use std::{
    fs,
    path::Path,
};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    archive::ArchiveIndex,
    binary_utils::read_tag,
    error::{PipelineError, Result},
    formats::{
        chunk::{display_tag, NARC_MAGIC, NCGR_MAGIC, NCLR_MAGIC},
        narc::parse_narc,
        nclr::{decode_palette, PaletteTable},
        ncgr::{decode_tiles, TileSheet},
    },
    rom::Rom,
    source::ByteSource,
};

/// A decoded archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asset {
    Palette(PaletteTable),
    Tiles(TileSheet),
    /// A nested NARC, left packed.
    Archive { file_count: usize },
    /// Anything this crate has no decoder for.
    Raw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Palette,
    Tiles,
    Archive,
    Raw,
}

impl Asset {
    pub fn kind(&self) -> AssetKind {
        match self {
            Asset::Palette(_) => AssetKind::Palette,
            Asset::Tiles(_) => AssetKind::Tiles,
            Asset::Archive { .. } => AssetKind::Archive,
            Asset::Raw => AssetKind::Raw,
        }
    }
}

/// Pick a decoder by the stored magic and run it.
pub fn decode_asset(bytes: &[u8]) -> Result<Asset> {
    match read_tag(bytes, 0) {
        Some(NCLR_MAGIC) => decode_palette(bytes).map(Asset::Palette),
        Some(NCGR_MAGIC) => decode_tiles(bytes).map(Asset::Tiles),
        Some(NARC_MAGIC) => parse_narc(bytes).map(|narc| Asset::Archive {
            file_count: narc.len(),
        }),
        _ => Ok(Asset::Raw),
    }
}

pub fn decode_archive_entry(archive: &ArchiveIndex<'_>, id: usize) -> Result<Asset> {
    decode_asset(archive.get_file(id)?)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertOptions {
    /// Write palettes as a JSON colour listing instead of raw RGB555.
    pub json: bool,
    /// Also copy every entry out verbatim as `NNNN.bin`.
    pub extract_raw: bool,
}

#[derive(Debug)]
pub struct EntryFailure {
    pub id: usize,
    pub name: Option<String>,
    pub error: PipelineError,
}

/// Outcome of one batch run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub palettes: usize,
    pub tiles: usize,
    pub archives: usize,
    pub raw: usize,
    pub failures: Vec<EntryFailure>,
}

impl BatchSummary {
    pub fn converted(&self) -> usize {
        self.palettes + self.tiles
    }

    /// Entries looked at, failures included.
    pub fn total(&self) -> usize {
        self.converted() + self.archives + self.raw + self.failures.len()
    }

    pub fn record(&mut self, kind: AssetKind) {
        match kind {
            AssetKind::Palette => self.palettes += 1,
            AssetKind::Tiles => self.tiles += 1,
            AssetKind::Archive => self.archives += 1,
            AssetKind::Raw => self.raw += 1,
        }
    }

    pub fn fail(&mut self, id: usize, name: Option<String>, error: PipelineError) {
        match &name {
            Some(name) => warn!("Entry {} ({}) failed: {}", id, name, error),
            None => warn!("Entry {} failed: {}", id, error),
        }
        self.failures.push(EntryFailure { id, name, error });
    }
}

fn write_file(path: &Path, data: &[u8]) -> Result<(), PipelineError> {
    fs::write(path, data).map_err(|source| PipelineError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub fn create_output_dir(dir: &Path) -> Result<(), PipelineError> {
    fs::create_dir_all(dir).map_err(|source| PipelineError::Write {
        path: dir.to_path_buf(),
        source,
    })
}

/// Write a palette as raw little-endian RGB555, or as a JSON listing.
pub fn write_palette(table: &PaletteTable, path: &Path, json: bool) -> Result<(), PipelineError> {
    if json {
        write_file(path, table.to_json()?.as_bytes())
    } else {
        write_file(path, &table.to_le_bytes())
    }
}

/// Write the packed tile stream exactly as stored.
pub fn write_tiles(sheet: &TileSheet, path: &Path) -> Result<(), PipelineError> {
    write_file(path, &sheet.pixel_stream)
}

/// Copy every present entry out as `NNNN.bin`. Returns how many were written.
pub fn extract_archive(archive: &ArchiveIndex<'_>, output_dir: &Path) -> Result<usize, PipelineError> {
    create_output_dir(output_dir)?;

    let mut written = 0;
    for id in archive.present_ids() {
        let data = archive.get_file(id)?;
        write_file(&output_dir.join(format!("{:04}.bin", id)), data)?;
        written += 1;
    }

    info!("Extracted {} files to {:?}", written, output_dir);
    Ok(written)
}

fn palette_file_name(stem: &str, json: bool) -> String {
    if json {
        format!("{}_palette.json", stem)
    } else {
        format!("{}_palette.pal", stem)
    }
}

fn convert_entry(
    archive: &ArchiveIndex<'_>,
    id: usize,
    output_dir: &Path,
    options: ConvertOptions,
) -> Result<AssetKind, PipelineError> {
    let data = archive.get_file(id)?;
    let stem = format!("{:04}", id);

    if options.extract_raw {
        write_file(&output_dir.join(format!("{}.bin", stem)), data)?;
    }

    let asset = decode_asset(data)?;
    match &asset {
        Asset::Palette(table) => {
            debug!(
                "{}: {} colours, {}",
                stem,
                table.len(),
                table.depth_class.describe(table.len())
            );
            write_palette(
                table,
                &output_dir.join(palette_file_name(&stem, options.json)),
                options.json,
            )?;
        }
        Asset::Tiles(sheet) => {
            debug!(
                "{}: {} tiles at {}bpp",
                stem,
                sheet.tile_count(),
                sheet.bits_per_pixel.bits()
            );
            write_tiles(sheet, &output_dir.join(format!("{}_tiles.bin", stem)))?;
        }
        Asset::Archive { file_count } => {
            debug!("{}: nested archive with {} files", stem, file_count);
        }
        Asset::Raw => {}
    }

    Ok(asset.kind())
}

/// Decode every entry of an archive into `output_dir`, in parallel.
pub fn convert_archive(
    archive: &ArchiveIndex<'_>,
    output_dir: &Path,
    options: ConvertOptions,
) -> Result<BatchSummary, PipelineError> {
    create_output_dir(output_dir)?;

    let ids: Vec<usize> = archive.present_ids().collect();
    let outcomes: Vec<(usize, Result<AssetKind, PipelineError>)> = ids
        .par_iter()
        .map(|&id| (id, convert_entry(archive, id, output_dir, options)))
        .collect();

    let mut summary = BatchSummary::default();
    for (id, outcome) in outcomes {
        match outcome {
            Ok(kind) => summary.record(kind),
            Err(e) => summary.fail(id, archive.name_of(id), e),
        }
    }

    info!(
        "Converted {} palettes and {} tile sheets from {} entries ({} failed)",
        summary.palettes,
        summary.tiles,
        ids.len(),
        summary.failures.len()
    );
    Ok(summary)
}

/// One row of an archive listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileListing {
    pub id: usize,
    pub size: usize,
    /// Stored magic, printable or not.
    pub magic: Option<String>,
    pub name: Option<String>,
}

pub fn list_files(archive: &ArchiveIndex<'_>) -> Vec<FileListing> {
    archive
        .iter()
        .map(|(id, data)| FileListing {
            id,
            size: data.len(),
            magic: read_tag(data, 0).map(|tag| display_tag(&tag)),
            name: archive.name_of(id),
        })
        .collect()
}

/// Load a NARC either from disk or, when `rom` is given, from inside a ROM
/// by path or numeric file id.
pub fn load_archive_bytes<S: ByteSource>(
    source: &S,
    rom: Option<&Path>,
    archive: &str,
) -> Result<Vec<u8>, PipelineError> {
    let Some(rom_path) = rom else {
        return Ok(source.read_all(Path::new(archive))?);
    };

    let rom = Rom::open(source, rom_path)?;
    let index = rom.archive()?;
    let id = index
        .file_id(archive)
        .or_else(|| archive.parse::<usize>().ok())
        .ok_or_else(|| PipelineError::UnknownFile(archive.to_string()))?;

    match index.name_of(id) {
        Some(name) => info!("Found file {} ({})", id, name),
        None => info!("Found file ID {} (no filename)", id),
    }
    Ok(index.get_file(id)?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::DecodeError,
        formats::{
            chunk::{CHAR_MAGIC, PLTT_MAGIC},
            narc::pack_narc,
            testing::build_container,
        },
        rom::tests::sample_rom,
        source::MemorySource,
    };

    fn nclr(colours: &[u16]) -> Vec<u8> {
        let mut payload = vec![3, 0, 0, 0, 0, 0, 0, 0];
        payload.extend(colours.iter().flat_map(|c| c.to_le_bytes()));
        build_container(NCLR_MAGIC, &[(PLTT_MAGIC, payload)])
    }

    fn ncgr(depth: u8, pixels: &[u8]) -> Vec<u8> {
        let mut payload = vec![1, 0, 1, 0, depth, 0, 0, 0];
        payload.extend_from_slice(pixels);
        build_container(NCGR_MAGIC, &[(CHAR_MAGIC, payload)])
    }

    #[test]
    fn assets_are_sniffed_by_magic() {
        assert_eq!(
            decode_asset(&nclr(&[0; 16])).unwrap().kind(),
            AssetKind::Palette
        );
        assert_eq!(
            decode_asset(&ncgr(3, &[0; 32])).unwrap().kind(),
            AssetKind::Tiles
        );
        assert_eq!(
            decode_asset(&pack_narc(&[vec![1], vec![2]]).unwrap()).unwrap(),
            Asset::Archive { file_count: 2 }
        );
        assert_eq!(decode_asset(b"NCLR not reversed").unwrap(), Asset::Raw);
        assert_eq!(decode_asset(&[]).unwrap(), Asset::Raw);
    }

    #[test]
    fn summary_counts_each_kind_separately() {
        let mut summary = BatchSummary::default();
        for kind in [
            AssetKind::Palette,
            AssetKind::Tiles,
            AssetKind::Tiles,
            AssetKind::Archive,
            AssetKind::Raw,
        ] {
            summary.record(kind);
        }

        assert_eq!(summary.palettes, 1);
        assert_eq!(summary.tiles, 2);
        assert_eq!(summary.archives, 1);
        assert_eq!(summary.raw, 1);
        assert_eq!(summary.converted(), 3);
        assert_eq!(summary.total(), 5);
    }

    #[test]
    fn nested_archive_is_counted_as_archive() {
        let inner = pack_narc(&[vec![1], vec![2], vec![3]]).unwrap();
        let narc = pack_narc(&[inner, nclr(&[0; 16])]).unwrap();
        let archive = parse_narc(&narc).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let summary = convert_archive(&archive, dir.path(), ConvertOptions::default()).unwrap();
        assert_eq!(summary.archives, 1);
        assert_eq!(summary.palettes, 1);
        assert_eq!(summary.raw, 0);
    }

    #[test]
    fn archive_entry_errors_pass_through() {
        let narc = pack_narc(&[nclr(&[0; 16]), vec![], ncgr(7, &[0; 32])]).unwrap();
        let archive = parse_narc(&narc).unwrap();

        assert!(matches!(
            decode_archive_entry(&archive, 0),
            Ok(Asset::Palette(_))
        ));
        assert!(matches!(
            decode_archive_entry(&archive, 1),
            Err(DecodeError::IndexOutOfRange { .. })
        ));
        assert_eq!(
            decode_archive_entry(&archive, 2).unwrap_err(),
            DecodeError::UnknownDepth(7)
        );
        assert!(decode_archive_entry(&archive, 3).is_err());
    }

    #[test]
    fn batch_keeps_going_past_failures() {
        let palette: Vec<u16> = (0..16).collect();
        let narc = pack_narc(&[
            nclr(&palette),
            ncgr(3, &[0x21; 64]),
            ncgr(4, &[0; 65]),
            b"plain".to_vec(),
        ])
        .unwrap();
        let archive = parse_narc(&narc).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let summary = convert_archive(&archive, dir.path(), ConvertOptions::default()).unwrap();
        assert_eq!(summary.palettes, 1);
        assert_eq!(summary.tiles, 1);
        assert_eq!(summary.raw, 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].id, 2);
        assert!(matches!(
            summary.failures[0].error,
            PipelineError::Decode(DecodeError::TruncatedTileData { .. })
        ));

        let pal = fs::read(dir.path().join("0000_palette.pal")).unwrap();
        assert_eq!(pal.len(), 32);
        assert_eq!(&pal[2..4], &[1, 0]);
        assert_eq!(
            fs::read(dir.path().join("0001_tiles.bin")).unwrap(),
            vec![0x21; 64]
        );
        assert!(!dir.path().join("0002_tiles.bin").exists());
        assert!(!dir.path().join("0003.bin").exists());
    }

    #[test]
    fn batch_json_and_raw_outputs() {
        let narc = pack_narc(&[nclr(&[0x7FFF]), b"plain".to_vec()]).unwrap();
        let archive = parse_narc(&narc).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let options = ConvertOptions {
            json: true,
            extract_raw: true,
        };

        let summary = convert_archive(&archive, dir.path(), options).unwrap();
        assert_eq!(summary.converted(), 1);

        let json = fs::read_to_string(dir.path().join("0000_palette.json")).unwrap();
        assert!(json.contains("\"#ffffff\""));
        assert_eq!(fs::read(dir.path().join("0001.bin")).unwrap(), b"plain");
        assert!(dir.path().join("0000.bin").exists());
    }

    #[test]
    fn extraction_writes_numbered_files() {
        let narc = pack_narc(&[vec![1, 2], vec![], vec![3]]).unwrap();
        let archive = parse_narc(&narc).unwrap();
        let dir = tempfile::tempdir().unwrap();

        assert_eq!(extract_archive(&archive, dir.path()).unwrap(), 2);
        assert_eq!(fs::read(dir.path().join("0000.bin")).unwrap(), vec![1, 2]);
        assert!(!dir.path().join("0001.bin").exists());
        assert_eq!(fs::read(dir.path().join("0002.bin")).unwrap(), vec![3]);
    }

    #[test]
    fn listing_skips_absent_slots() {
        let rom = Rom::from_bytes(sample_rom()).unwrap();
        let listing = list_files(&rom.archive().unwrap());

        assert_eq!(listing.len(), 6);
        assert_eq!(listing[0].id, 0);
        assert_eq!(listing[1].id, 2);
        assert_eq!(listing[1].size, 3);
        assert_eq!(listing[1].magic, None);
        assert_eq!(listing[5].name.as_deref(), Some("data/c.bin"));
        assert_eq!(listing[5].magic.as_deref(), Some("\"\\x06\\x06\\x06\\x06\""));
    }

    #[test]
    fn archive_bytes_from_disk_or_rom() {
        let mut source = MemorySource::new();
        source.insert("title.narc", vec![0xAA]);
        source.insert("game.nds", sample_rom());

        assert_eq!(
            load_archive_bytes(&source, None, "title.narc").unwrap(),
            vec![0xAA]
        );

        let rom = Some(Path::new("game.nds"));
        assert_eq!(
            load_archive_bytes(&source, rom, "data/b.bin").unwrap(),
            vec![5; 6]
        );
        assert_eq!(load_archive_bytes(&source, rom, "3").unwrap(), vec![3; 4]);
        assert!(matches!(
            load_archive_bytes(&source, rom, "data/zzz.bin"),
            Err(PipelineError::UnknownFile(_))
        ));
        assert!(matches!(
            load_archive_bytes(&source, rom, "1"),
            Err(PipelineError::Decode(DecodeError::IndexOutOfRange { .. }))
        ));
    }
}
