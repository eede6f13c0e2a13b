//! nitro-assets - Nintendo DS asset extraction tool
//!
//! Pulls NARC archives out of a ROM image and converts the NCLR palettes and
//! NCGR tile sheets inside them into flat files.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use nitro_assets::{
    formats::{decode_palette, decode_tiles, parse_narc},
    manifest,
    pipeline::{self, ConvertOptions},
    rom::Rom,
    source::{ByteSource, FsSource},
};

#[derive(Parser)]
#[command(name = "nitro-assets")]
#[command(about = "Nintendo DS NARC / NCLR / NCGR extraction tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every file in a ROM image
    List {
        /// Input .nds file
        rom: PathBuf,

        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract every member of a NARC inside a ROM as NNNN.bin
    Extract {
        /// Input .nds file
        rom: PathBuf,

        /// Archive path inside the ROM, or its numeric file id
        archive: String,

        /// Output directory (not needed with --list)
        #[arg(required_unless_present = "list")]
        output: Option<PathBuf>,

        /// Only list the archive's members
        #[arg(short, long)]
        list: bool,
    },

    /// Convert an NCLR palette to raw RGB555 or JSON
    Palette {
        /// Input .nclr file
        input: PathBuf,

        /// Output .pal / .json file
        output: PathBuf,

        /// Write a JSON colour listing
        #[arg(long)]
        json: bool,
    },

    /// Dump the raw tile stream of an NCGR file
    Tiles {
        /// Input .ncgr file
        input: PathBuf,

        /// Output .bin file
        output: PathBuf,
    },

    /// Decode every palette and tile sheet in a NARC
    Convert {
        /// NARC on disk, or a path / file id inside --rom
        archive: String,

        /// Output directory
        output: PathBuf,

        /// Read the archive out of this ROM image
        #[arg(long)]
        rom: Option<PathBuf>,

        /// Write palettes as JSON
        #[arg(long)]
        json: bool,

        /// Also extract every member verbatim
        #[arg(long)]
        raw: bool,
    },

    /// Build named assets from a manifest file
    Build {
        /// Path to assets.toml manifest
        #[arg(default_value = "assets.toml")]
        manifest: PathBuf,

        /// Output directory (overrides manifest)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List { rom, json } => list_rom(&rom, json)?,

        Commands::Extract {
            rom,
            archive,
            output,
            list,
        } => {
            let bytes = pipeline::load_archive_bytes(&FsSource, Some(&rom), &archive)?;
            let narc = parse_narc(&bytes).with_context(|| format!("{:?} is not a NARC", archive))?;
            if list {
                for entry in pipeline::list_files(&narc) {
                    println!(
                        "{:04}  {:>8} bytes  {}",
                        entry.id,
                        entry.size,
                        entry.magic.as_deref().unwrap_or("-")
                    );
                }
            } else {
                let output =
                    output.context("An output directory is required unless --list is given")?;
                pipeline::extract_archive(&narc, &output)?;
            }
        }

        Commands::Palette {
            input,
            output,
            json,
        } => {
            let bytes = FsSource.read_all(&input)?;
            let table =
                decode_palette(&bytes).with_context(|| format!("Failed to decode {:?}", input))?;
            tracing::info!(
                "{} colours ({})",
                table.len(),
                table.depth_class.describe(table.len())
            );
            pipeline::write_palette(&table, &output, json)?;
            tracing::info!("Wrote {:?}", output);
        }

        Commands::Tiles { input, output } => {
            let bytes = FsSource.read_all(&input)?;
            let sheet =
                decode_tiles(&bytes).with_context(|| format!("Failed to decode {:?}", input))?;
            tracing::info!(
                "{} tiles at {}bpp",
                sheet.tile_count(),
                sheet.bits_per_pixel.bits()
            );
            pipeline::write_tiles(&sheet, &output)?;
            tracing::info!("Wrote {:?}", output);
        }

        Commands::Convert {
            archive,
            output,
            rom,
            json,
            raw,
        } => {
            let bytes = pipeline::load_archive_bytes(&FsSource, rom.as_deref(), &archive)?;
            let narc = parse_narc(&bytes).with_context(|| format!("{:?} is not a NARC", archive))?;
            let options = ConvertOptions {
                json,
                extract_raw: raw,
            };
            let summary = pipeline::convert_archive(&narc, &output, options)?;
            if !summary.failures.is_empty() {
                tracing::warn!(
                    "{} of {} entries could not be converted",
                    summary.failures.len(),
                    summary.total()
                );
            }
        }

        Commands::Build { manifest, output } => {
            tracing::info!("Building assets from {:?}", manifest);
            let config = manifest::load_manifest(&manifest)?;
            let base_dir = manifest.parent().unwrap_or_else(|| Path::new(""));
            let report = manifest::build_all(&config, &FsSource, base_dir, output.as_deref())?;
            tracing::info!(
                "Build complete: {} palettes, {} tile sheets",
                report.palettes.len(),
                report.tiles.len()
            );
        }
    }

    Ok(())
}

fn list_rom(path: &Path, json: bool) -> Result<()> {
    let rom = Rom::open(&FsSource, path)?;
    let archive = rom.archive()?;
    let listing = pipeline::list_files(&archive);

    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    println!(
        "{} ({}), maker {}, {} files",
        rom.header.game_title,
        rom.header.game_code,
        rom.header.maker_code,
        listing.len()
    );
    for entry in listing {
        println!(
            "{:5}  {:>10}  {:<18}  {}",
            entry.id,
            entry.size,
            entry.magic.as_deref().unwrap_or("-"),
            entry.name.as_deref().unwrap_or("")
        );
    }
    Ok(())
}
