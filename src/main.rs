//! Carve - Edit a region of a file through a live mirror.
//!
//! # Usage
//!
//! ```bash
//! carve src/lib.rs --range 10:5-24:2
//! carve notes.md --range 3-8 --mirror section.md
//! carve config.toml --range 2:1-2:40 --backing scratch --mirror line.toml
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use carve::app::{App, parse_range_arg};
use carve::config::{
    ConfigFlags, MirrorBacking, clear_config_flags, global_config_path, load_config_flags,
    local_override_path, parse_flag_tokens, save_config_flags,
};

/// Edit a region of a file through a live mirror file
#[derive(Parser, Debug)]
#[command(name = "carve", version, about, long_about = None)]
struct Cli {
    /// File to extract from
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Region to extract, as L:C-L:C (1-based, end column exclusive) or L-L
    #[arg(short, long, value_name = "RANGE")]
    range: String,

    /// Write the mirror to this path instead of a temporary file
    #[arg(short, long, value_name = "PATH")]
    mirror: Option<PathBuf>,

    /// How the mirror is stored
    #[arg(long, value_enum)]
    backing: Option<MirrorBacking>,

    /// Quiet window before source edits reach the mirror
    #[arg(long, value_name = "MS")]
    batch_delay_ms: Option<u64>,

    /// Delay before the mirror is saved after a write-back
    #[arg(long, value_name = "MS")]
    autosave_delay_ms: Option<u64>,

    /// Window in which repeated extraction requests collapse
    #[arg(long, value_name = "MS")]
    extract_debounce_ms: Option<u64>,

    /// How often to poll for changes
    #[arg(long, value_name = "MS")]
    poll_interval_ms: Option<u64>,

    /// Log sync activity to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,
}

fn main() -> Result<()> {
    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    // Initialize logging
    let level = if effective.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    // Verify file exists
    if !cli.file.exists() {
        anyhow::bail!("File not found: {}", cli.file.display());
    }
    let range = parse_range_arg(&cli.range)?;
    let config = effective.sync_config();
    if cli.mirror.is_none() && config.backing == MirrorBacking::Scratch {
        anyhow::bail!("--backing scratch needs --mirror PATH");
    }

    let mut app = App::new(cli.file, range)
        .with_sync_config(config)
        .with_mirror_path(cli.mirror)
        .with_poll_interval(effective.poll_interval());

    app.run().context("Application error")
}
