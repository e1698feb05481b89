//! TOML configuration for clickzone.
//!
//! The file is optional.  It lives at the platform-appropriate location:
//! - Windows:  `%APPDATA%\Clickzone\config.toml`
//! - Linux:    `~/.config/clickzone/config.toml`
//! - macOS:    `~/Library/Application Support/Clickzone/config.toml`
//!
//! ```toml
//! [zone]
//! width = 300
//! height = 500
//! left = 200
//! top = 200
//! mirror_horizontal = false
//! mirror_vertical = true
//!
//! [logging]
//! level = "debug"
//! ```
//!
//! Command-line values always win over file values; see [`AppConfig::apply`].

use std::path::{Path, PathBuf};

use clickzone_core::{TargetZone, ZoneError};
use serde::Deserialize;
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// Neither the command line nor the file supplied a required value.
    #[error("missing required setting `{0}` (pass it on the command line or set it under [zone])")]
    MissingField(&'static str),

    #[error(transparent)]
    Zone(#[from] ZoneError),
}

// ── Config schema types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub zone: ZoneConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Target zone settings as written in the file.  Width and height have no
/// default; they must come from the file or the command line.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ZoneConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(default)]
    pub left: u32,
    #[serde(default)]
    pub top: u32,
    #[serde(default)]
    pub mirror_horizontal: bool,
    #[serde(default)]
    pub mirror_vertical: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `tracing` level or filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Values given on the command line.  `None` means "not given".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneOverrides {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub left: Option<u32>,
    pub top: Option<u32>,
    pub mirror_horizontal: Option<bool>,
    pub mirror_vertical: Option<bool>,
    pub log_level: Option<String>,
}

impl AppConfig {
    /// Layers command-line values over the file values.
    pub fn apply(&mut self, overrides: &ZoneOverrides) {
        let zone = &mut self.zone;
        if let Some(width) = overrides.width {
            zone.width = Some(width);
        }
        if let Some(height) = overrides.height {
            zone.height = Some(height);
        }
        if let Some(left) = overrides.left {
            zone.left = left;
        }
        if let Some(top) = overrides.top {
            zone.top = top;
        }
        if let Some(mirror) = overrides.mirror_horizontal {
            zone.mirror_horizontal = mirror;
        }
        if let Some(mirror) = overrides.mirror_vertical {
            zone.mirror_vertical = mirror;
        }
        if let Some(level) = &overrides.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Builds the validated remap target.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] if width or height is unset and
    /// [`ConfigError::Zone`] if either is zero.
    pub fn target_zone(&self) -> Result<TargetZone, ConfigError> {
        let zone = &self.zone;
        let width = zone.width.ok_or(ConfigError::MissingField("width"))?;
        let height = zone.height.ok_or(ConfigError::MissingField("height"))?;
        Ok(TargetZone::new(width, height, zone.left, zone.top)?
            .with_mirroring(zone.mirror_horizontal, zone.mirror_vertical))
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(platform_config_dir()
        .ok_or(ConfigError::NoPlatformConfigDir)?
        .join("config.toml"))
}

/// Loads the config at the default location.
///
/// # Errors
///
/// See [`load_config_from`]; additionally [`ConfigError::NoPlatformConfigDir`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Clickzone"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("clickzone"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("Clickzone")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
