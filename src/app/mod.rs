//! Command-line driver around a [`Session`](crate::session::Session).
//!
//! Opens one file, extracts a region of it into a mirror file, and keeps the
//! two in step until the mirror goes away or the user quits.

mod event_loop;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::config::{DEFAULT_POLL_INTERVAL_MS, MirrorBacking, SyncConfig};
use crate::text::{TextPosition, TextRange};

/// Main application struct that owns the run configuration.
pub struct App {
    file_path: PathBuf,
    range: TextRange,
    config: SyncConfig,
    mirror_path: Option<PathBuf>,
    poll_interval: Duration,
    watch_debounce: Duration,
}

impl App {
    /// Create an application extracting `range` of the given file.
    pub fn new(file_path: PathBuf, range: TextRange) -> Self {
        Self {
            file_path,
            range,
            config: SyncConfig::default(),
            mirror_path: None,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            watch_debounce: Duration::from_millis(150),
        }
    }

    pub const fn with_sync_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Write the mirror to a fixed path instead of a temporary file.
    pub fn with_mirror_path(mut self, path: Option<PathBuf>) -> Self {
        self.mirror_path = path;
        self
    }

    /// How long the loop sleeps between polls.
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Settings the session runs with.
    ///
    /// A fixed mirror path is the mirror's only backing, so no temporary
    /// file is written for it.
    fn session_config(&self) -> SyncConfig {
        let mut config = self.config;
        if self.mirror_path.is_some() {
            config.backing = MirrorBacking::Scratch;
        }
        config
    }
}

/// Parse `L:C-L:C` with 1-based lines and columns into a zero-based range.
///
/// The end column is exclusive. A bare `L-L` selects whole lines, ending at
/// the start of the line after the last one.
///
/// # Errors
/// Returns an error if the text is not a range in one of those forms.
pub fn parse_range_arg(s: &str) -> Result<TextRange> {
    let (start, end) = s
        .split_once('-')
        .with_context(|| format!("Range '{s}' must look like L:C-L:C"))?;
    match (start.split_once(':'), end.split_once(':')) {
        (Some(start), Some(end)) => Ok(TextRange::new(
            parse_position(start.0, start.1)?,
            parse_position(end.0, end.1)?,
        )),
        (None, None) => {
            let first = parse_one_based(start, "line")?;
            let last = parse_one_based(end, "line")?;
            Ok(TextRange::new(
                TextPosition::new(first.min(last), 0),
                TextPosition::new(first.max(last) + 1, 0),
            ))
        }
        _ => bail!("Range '{s}' mixes L:C and L forms"),
    }
}

fn parse_position(line: &str, column: &str) -> Result<TextPosition> {
    Ok(TextPosition::new(
        parse_one_based(line, "line")?,
        parse_one_based(column, "column")?,
    ))
}

fn parse_one_based(value: &str, what: &str) -> Result<usize> {
    let n: usize = value
        .trim()
        .parse()
        .with_context(|| format!("Invalid {what} '{value}'"))?;
    if n == 0 {
        bail!("{what} numbers start at 1");
    }
    Ok(n - 1)
}
