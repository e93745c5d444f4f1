//! Waymark CLI
//!
//! Replay NMEA captures through the external GPS session handler and lay out
//! curved map labels.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod label;
mod replay;

use config::WaymarkConfig;
use waymark_text::LabelAnchor;

#[derive(Parser)]
#[command(name = "waymark")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Waymark map overlay tools", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to ./waymark.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an NMEA capture and print each fix as a JSON line
    Replay {
        /// Capture file
        file: PathBuf,

        /// Bytes delivered per stream read
        #[arg(long, default_value = "64")]
        chunk: usize,

        /// Accept sentences with bad checksums
        #[arg(long)]
        no_checksum: bool,
    },

    /// Lay out a label along a polyline and print the placed glyphs
    Label {
        /// Label text
        text: String,

        /// Path vertices as "x,y x,y ..."
        #[arg(short, long, allow_hyphen_values = true)]
        points: String,

        /// Baseline distance from the path (positive is below a rightward path)
        #[arg(short, long, allow_hyphen_values = true)]
        offset: Option<f32>,

        /// Centre the label on the path
        #[arg(long)]
        center: bool,

        /// Font size in pixels
        #[arg(short, long)]
        size: Option<f32>,

        /// TTF/OTF file for glyph advances
        #[arg(long)]
        font: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging on stderr; stdout carries command output
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    let config = WaymarkConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Replay {
            file,
            chunk,
            no_checksum,
        } => cmd_replay(config, &file, chunk, no_checksum),

        Commands::Label {
            text,
            points,
            offset,
            center,
            size,
            font,
        } => cmd_label(config, &text, &points, offset, center, size, font.as_deref()),

        Commands::Config => cmd_config(&config),
    }
}

fn cmd_replay(config: WaymarkConfig, file: &Path, chunk: usize, no_checksum: bool) -> Result<()> {
    let mut gps = config.gps;
    if no_checksum {
        gps = gps.with_checksum(false);
    }

    let stdout = io::stdout();
    let stats = replay::run(gps, file, chunk, &mut stdout.lock())?;
    info!(
        "{} fixes from {} bytes ({} sentences discarded)",
        stats.fixes_emitted, stats.bytes_read, stats.sentences_discarded
    );
    Ok(())
}

fn cmd_label(
    config: WaymarkConfig,
    text: &str,
    points: &str,
    offset: Option<f32>,
    center: bool,
    size: Option<f32>,
    font: Option<&Path>,
) -> Result<()> {
    let mut settings = config.label;
    if let Some(offset) = offset {
        settings = settings.with_offset(offset);
    }
    if center {
        settings = settings.with_anchor(LabelAnchor::Center);
    }
    if let Some(size) = size {
        settings = settings.with_font_size(size);
    }

    let points = label::parse_points(points)?;
    let style = settings.style()?;
    let options = settings.options();

    let stdout = io::stdout();
    label::run(text, &points, &style, &options, font, &mut stdout.lock())
}

fn cmd_config(config: &WaymarkConfig) -> Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}
