//! Settings file and config directory resolution

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default settings file name
pub const SETTINGS_FILE: &str = "seqtex.json";
/// Default log file name (used by `--log` without a path)
pub const LOG_FILE: &str = "seqtex.log";

/// Configuration for overriding default application paths
#[derive(Debug, Clone)]
pub struct PathConfig {
    /// Custom config directory (from CLI or ENV)
    pub config_dir: Option<PathBuf>,
}

impl PathConfig {
    /// Priority: CLI args → ENV var (SEQTEX_CONFIG_DIR) → None (use defaults)
    pub fn from_env_and_cli(cli_dir: Option<PathBuf>) -> Self {
        let config_dir = cli_dir.or_else(|| std::env::var("SEQTEX_CONFIG_DIR").ok().map(PathBuf::from));

        Self { config_dir }
    }
}

/// Get path to a configuration file
///
/// Priority:
/// 1. CLI --config-dir argument
/// 2. SEQTEX_CONFIG_DIR environment variable
/// 3. Local folder IF seqtex.json or seqtex.log already exist there
/// 4. Platform config directory from dirs-next (`~/.config/seqtex` on Linux)
pub fn config_file(name: &str, config: &PathConfig) -> PathBuf {
    get_config_dir(config).join(name)
}

/// Same priority as `config_file`, ending in the platform data directory
/// (`~/.local/share/seqtex` on Linux)
pub fn data_file(name: &str, config: &PathConfig) -> PathBuf {
    get_data_dir(config).join(name)
}

/// Create config and data directories if missing
pub fn ensure_dirs(config: &PathConfig) -> Result<()> {
    let config_dir = get_config_dir(config);
    let data_dir = get_data_dir(config);

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;
    }

    if data_dir != config_dir && !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
    }

    Ok(())
}

fn has_local_config_files(dir: &Path) -> bool {
    [SETTINGS_FILE, LOG_FILE].iter().any(|f| dir.join(f).exists())
}

fn resolve_dir(config: &PathConfig, platform: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = &config.config_dir {
        return dir.clone();
    }

    if let Ok(current_dir) = std::env::current_dir() {
        if has_local_config_files(&current_dir) {
            return current_dir;
        }
    }

    platform
        .map(|dir| dir.join("seqtex"))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn get_config_dir(config: &PathConfig) -> PathBuf {
    resolve_dir(config, dirs_next::config_dir())
}

fn get_data_dir(config: &PathConfig) -> PathBuf {
    resolve_dir(config, dirs_next::data_dir())
}

/// Sequence defaults applied before loading.
///
/// Missing keys in the JSON file fall back to these defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceSettings {
    /// Playback rate used for time lookups
    pub frame_rate: f64,
    /// Directory scans keep at most this many frames (0 = no limit)
    pub max_frames: usize,
    /// Directory scans keep only this extension (empty = any)
    pub extension: String,
    /// Scan and decode directories on a background thread
    pub threaded: bool,
    /// Worker sleep before each frame decode, in milliseconds
    pub decode_yield_ms: u64,
    /// Opaque host filter constants, passed to the texture as-is
    pub min_filter: Option<i32>,
    pub mag_filter: Option<i32>,
}

impl Default for SequenceSettings {
    fn default() -> Self {
        Self {
            frame_rate: 30.0,
            max_frames: 0,
            extension: String::new(),
            threaded: false,
            decode_yield_ms: 5,
            min_filter: None,
            mag_filter: None,
        }
    }
}

/// Read settings JSON; a missing file yields defaults
pub fn load_settings(path: &Path) -> Result<SequenceSettings> {
    if !path.exists() {
        debug!("No settings at {}, using defaults", path.display());
        return Ok(SequenceSettings::default());
    }

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings: {}", path.display()))?;
    let settings = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse settings: {}", path.display()))?;

    info!("Loaded settings from {}", path.display());
    Ok(settings)
}

/// Write settings as pretty JSON, creating parent directories
pub fn save_settings(path: &Path, settings: &SequenceSettings) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let text = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, text).with_context(|| format!("Failed to write settings: {}", path.display()))?;
    Ok(())
}
