// TOML config adapter - Configuration management using TOML files

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{SeamcutError, SeamcutResult};
use crate::planner::CutSettings;
use crate::probe::keyframes::DEFAULT_CACHE_CAPACITY;
use crate::probe::locator::DEFAULT_SEARCH_WINDOW;

/// File name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "seamcut.toml";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub tools: ToolsConfig,
    /// Defaults for every cut, concat and smart-cut call
    pub cut: CutSettings,
    pub keyframes: KeyframesConfig,
    pub logging: LoggingConfig,
}

/// Locations of the external tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg: String,
    pub ffprobe: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyframesConfig {
    /// Seconds searched around a time for keyframes
    pub window: f64,
    /// Samples kept in the keyframe cache
    pub cache_capacity: usize,
}

impl Default for KeyframesConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_SEARCH_WINDOW,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// TOML configuration adapter
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// Candidate config files, most specific first
    pub fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(dir).join("seamcut").join("config.toml"));
        } else if let Some(home) = std::env::var_os("HOME") {
            paths.push(
                PathBuf::from(home)
                    .join(".config")
                    .join("seamcut")
                    .join("config.toml"),
            );
        }
        if let Some(appdata) = std::env::var_os("APPDATA") {
            paths.push(PathBuf::from(appdata).join("seamcut").join("config.toml"));
        }
        paths
    }

    /// Find the config file to load.
    ///
    /// An explicit path must exist; otherwise the first existing default
    /// location is used, if any.
    pub fn discover(explicit: Option<&Path>) -> SeamcutResult<Option<PathBuf>> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(SeamcutError::Config {
                    message: format!("config file does not exist: {}", path.display()),
                });
            }
            return Ok(Some(path.to_path_buf()));
        }
        Ok(Self::default_config_paths()
            .into_iter()
            .find(|path| path.is_file()))
    }

    /// Load and parse a config file
    pub fn load(path: &Path) -> SeamcutResult<AppConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| SeamcutError::Config {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        let config = Self::parse(&content).map_err(|e| SeamcutError::Config {
            message: format!("{}: {}", path.display(), e),
        })?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse TOML content; missing sections and keys take their defaults
    pub fn parse(content: &str) -> SeamcutResult<AppConfig> {
        toml::from_str(content).map_err(|e| SeamcutError::Config {
            message: format!("failed to parse TOML config: {}", e),
        })
    }
}
