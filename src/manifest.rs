//! Manifest parsing and named conversion
//!
//! An `assets.toml` names one source archive and the entries to pull out of it:
//!
//! ```toml
//! [source]
//! rom = "platinum.nds"            # optional; without it `archive` is a file on disk
//! archive = "demo/title/titledemo.narc"
//!
//! [output]
//! dir = "out/title"
//! json = false
//!
//! [[palettes]]
//! id = 24
//! name = "top_screen"
//!
//! [[tiles]]
//! id = 4
//! name = "top_screen"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::{
    formats::{narc::parse_narc, ncgr::decode_tiles, nclr::decode_palette},
    pipeline::{create_output_dir, load_archive_bytes, write_palette, write_tiles},
    source::ByteSource,
};

#[derive(Debug, Deserialize)]
pub struct Manifest {
    pub source: SourceConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub palettes: Vec<NamedEntry>,
    #[serde(default)]
    pub tiles: Vec<NamedEntry>,
}

#[derive(Debug, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub rom: Option<PathBuf>,
    /// Path on disk, or a path / file id inside `rom`.
    pub archive: String,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default)]
    pub json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            dir: default_output_dir(),
            json: false,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("out/")
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedEntry {
    pub id: usize,
    pub name: String,
}

/// Load and parse a manifest file
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {:?}", path))?;
    let manifest: Manifest = toml::from_str(&content)
        .with_context(|| format!("Failed to parse manifest: {:?}", path))?;
    Ok(manifest)
}

/// Files written by [`build_all`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub palettes: Vec<PathBuf>,
    pub tiles: Vec<PathBuf>,
}

/// Build every named entry. Relative paths resolve against `base_dir`,
/// normally the manifest's own directory.
pub fn build_all<S: ByteSource>(
    manifest: &Manifest,
    source: &S,
    base_dir: &Path,
    output_override: Option<&Path>,
) -> Result<BuildReport> {
    let rom = manifest.source.rom.as_ref().map(|rom| base_dir.join(rom));
    let archive_location = match &rom {
        Some(_) => manifest.source.archive.clone(),
        None => base_dir
            .join(&manifest.source.archive)
            .to_string_lossy()
            .into_owned(),
    };
    let output_dir = output_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| base_dir.join(&manifest.output.dir));

    let bytes = load_archive_bytes(source, rom.as_deref(), &archive_location)
        .with_context(|| format!("Failed to load archive {:?}", manifest.source.archive))?;
    let archive = parse_narc(&bytes)
        .with_context(|| format!("{:?} is not a NARC", manifest.source.archive))?;
    create_output_dir(&output_dir)?;

    let mut report = BuildReport::default();

    for entry in &manifest.palettes {
        let table = archive
            .get_file(entry.id)
            .and_then(decode_palette)
            .with_context(|| format!("Palette '{}' (entry {})", entry.name, entry.id))?;
        let extension = if manifest.output.json { "json" } else { "pal" };
        let output = output_dir.join(format!("{}.{}", entry.name, extension));
        info!(
            "Palette {} -> {:?} ({} colours, {})",
            entry.name,
            output,
            table.len(),
            table.depth_class.describe(table.len())
        );
        write_palette(&table, &output, manifest.output.json)?;
        report.palettes.push(output);
    }

    for entry in &manifest.tiles {
        let sheet = archive
            .get_file(entry.id)
            .and_then(decode_tiles)
            .with_context(|| format!("Tiles '{}' (entry {})", entry.name, entry.id))?;
        let output = output_dir.join(format!("{}_tiles.bin", entry.name));
        info!(
            "Tiles {} -> {:?} ({} tiles, {}bpp)",
            entry.name,
            output,
            sheet.tile_count(),
            sheet.bits_per_pixel.bits()
        );
        write_tiles(&sheet, &output)?;
        report.tiles.push(output);
    }

    Ok(report)
}
