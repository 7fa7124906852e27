//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory where finished strips are written.
    pub output_dir: PathBuf,

    /// Default booth settings.
    pub booth: BoothDefaults,

    /// Optional JSON file overriding the built-in layout geometry table.
    pub layout_table: Option<PathBuf>,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default booth parameters.
///
/// Layout, filter and colors are kept as their textual names here and are
/// parsed by the model crate when a session is set up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoothDefaults {
    /// Layout name (`single`, `two-row`, `three-row`).
    pub layout: String,

    /// Filter name (`none`, `grayscale`, `sepia`, ...).
    pub filter: String,

    /// Paper (background) color as `#rrggbb`.
    pub paper_color: String,

    /// Border color as `#rrggbb`.
    pub border_color: String,

    /// Border stroke width in pixels.
    pub border_width: u32,

    /// Number of countdown ticks before each shot.
    pub countdown_ticks: u32,

    /// Milliseconds between countdown ticks.
    pub tick_ms: u64,

    /// Pause after the flash, in milliseconds.
    pub flash_ms: u64,

    /// Whether tick events request a sound cue.
    pub sound: bool,

    /// Edge length of progress thumbnails; 0 keeps the slot size.
    pub thumbnail_size: u32,

    /// Prefix of the default caption.
    pub caption_prefix: String,

    /// Prefix of exported file names.
    pub file_prefix: String,

    /// TrueType font used for captions.
    pub font_path: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "snapbooth=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            booth: BoothDefaults::default(),
            layout_table: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for BoothDefaults {
    fn default() -> Self {
        Self {
            layout: "three-row".to_string(),
            filter: "none".to_string(),
            paper_color: "#ffffff".to_string(),
            border_color: "#ffffff".to_string(),
            border_width: 4,
            countdown_ticks: 3,
            tick_ms: 1000,
            flash_ms: 400,
            sound: false,
            thumbnail_size: 96,
            caption_prefix: "SNAPBOOTH".to_string(),
            file_prefix: "SnapBooth".to_string(),
            font_path: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<PathBuf, std::io::Error> {
        let config_path = config_file_path();
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, config_path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("snapbooth").join("config.json")
}

/// Default output directory for finished strips.
fn default_output_dir() -> PathBuf {
    let base = std::env::var("XDG_PICTURES_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join("Pictures")
        });
    base.join("snapbooth")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "booth": { "layout": "single" } }"#).unwrap();
        assert_eq!(config.booth.layout, "single");
        assert_eq!(config.booth.countdown_ticks, 3);
        assert_eq!(config.booth.flash_ms, 400);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let dir = std::env::temp_dir().join(format!("snapbooth-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.booth.layout, "three-row");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = std::env::temp_dir().join(format!("snapbooth-save-{}", std::process::id()));
        let path = dir.join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.booth.filter = "sepia".to_string();
        config.booth.tick_ms = 250;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.booth.filter, "sepia");
        assert_eq!(loaded.booth.tick_ms, 250);

        std::fs::remove_dir_all(&dir).ok();
    }
}
