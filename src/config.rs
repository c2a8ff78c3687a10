use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

/// How a mirror is stored while it is open.
#[derive(clap::ValueEnum, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum MirrorBacking {
    /// A temporary file named after the source's language.
    #[default]
    TempFile,
    /// No backing file of its own.
    Scratch,
}

impl MirrorBacking {
    const fn as_flag_value(self) -> &'static str {
        match self {
            Self::TempFile => "temp-file",
            Self::Scratch => "scratch",
        }
    }
}

/// Timing and storage settings for a sync session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Quiet window before queued source edits are copied to the mirror.
    pub batch_delay_ms: u64,
    /// Delay before a mirror is saved after the source was rewritten from it.
    pub autosave_delay_ms: u64,
    /// Window in which repeated extraction requests collapse into one.
    pub extract_debounce_ms: u64,
    pub backing: MirrorBacking,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_delay_ms: 25,
            autosave_delay_ms: 400,
            extract_debounce_ms: 50,
            backing: MirrorBacking::TempFile,
        }
    }
}

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 20;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub batch_delay_ms: Option<u64>,
    pub autosave_delay_ms: Option<u64>,
    pub extract_debounce_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub backing: Option<MirrorBacking>,
    pub verbose: bool,
}

impl ConfigFlags {
    pub fn union(&self, other: &Self) -> Self {
        Self {
            batch_delay_ms: other.batch_delay_ms.or(self.batch_delay_ms),
            autosave_delay_ms: other.autosave_delay_ms.or(self.autosave_delay_ms),
            extract_debounce_ms: other.extract_debounce_ms.or(self.extract_debounce_ms),
            poll_interval_ms: other.poll_interval_ms.or(self.poll_interval_ms),
            backing: other.backing.or(self.backing),
            verbose: self.verbose || other.verbose,
        }
    }

    /// Resolve the session settings, filling gaps with defaults.
    pub fn sync_config(&self) -> SyncConfig {
        let defaults = SyncConfig::default();
        SyncConfig {
            batch_delay_ms: self.batch_delay_ms.unwrap_or(defaults.batch_delay_ms),
            autosave_delay_ms: self.autosave_delay_ms.unwrap_or(defaults.autosave_delay_ms),
            extract_debounce_ms: self
                .extract_debounce_ms
                .unwrap_or(defaults.extract_debounce_ms),
            backing: self.backing.unwrap_or(defaults.backing),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS))
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("carve").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("carve")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("carve").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config").join("carve").join("config");
        }
    }

    PathBuf::from(".carverc")
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".carverc")
}

pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace().map(ToOwned::to_owned))
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = Vec::new();
    lines.push("# carve defaults (saved with --save)".to_string());
    let delays = [
        ("--batch-delay-ms", flags.batch_delay_ms),
        ("--autosave-delay-ms", flags.autosave_delay_ms),
        ("--extract-debounce-ms", flags.extract_debounce_ms),
        ("--poll-interval-ms", flags.poll_interval_ms),
    ];
    for (flag, value) in delays {
        if let Some(ms) = value {
            lines.push(format!("{flag} {ms}"));
        }
    }
    if let Some(backing) = flags.backing {
        lines.push(format!("--backing {}", backing.as_flag_value()));
    }
    if flags.verbose {
        lines.push("--verbose".to_string());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick recognised flags out of command-line style tokens.
///
/// Unknown tokens and unparsable values are skipped.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        let (name, inline_value) = match token.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (token, None),
        };
        if name == "--verbose" || name == "-v" {
            flags.verbose = true;
            i += 1;
            continue;
        }
        let takes_value = matches!(
            name,
            "--batch-delay-ms"
                | "--autosave-delay-ms"
                | "--extract-debounce-ms"
                | "--poll-interval-ms"
                | "--backing"
        );
        if !takes_value {
            i += 1;
            continue;
        }
        let value = match inline_value {
            Some(value) => Some(value),
            None => {
                i += 1;
                tokens.get(i).map(String::as_str)
            }
        };
        if let Some(value) = value {
            apply_flag(&mut flags, name, value);
        }
        i += 1;
    }
    flags
}

fn apply_flag(flags: &mut ConfigFlags, name: &str, value: &str) {
    let ms = value.parse::<u64>().ok();
    match name {
        "--batch-delay-ms" => flags.batch_delay_ms = ms.or(flags.batch_delay_ms),
        "--autosave-delay-ms" => flags.autosave_delay_ms = ms.or(flags.autosave_delay_ms),
        "--extract-debounce-ms" => flags.extract_debounce_ms = ms.or(flags.extract_debounce_ms),
        "--poll-interval-ms" => flags.poll_interval_ms = ms.or(flags.poll_interval_ms),
        "--backing" => flags.backing = parse_backing(value).or(flags.backing),
        _ => {}
    }
}

fn parse_backing(s: &str) -> Option<MirrorBacking> {
    match s {
        "temp-file" => Some(MirrorBacking::TempFile),
        "scratch" => Some(MirrorBacking::Scratch),
        _ => None,
    }
}
