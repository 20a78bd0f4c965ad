//! Extraction configuration
//!
//! Stored as TOML, by default at `<config dir>/x4/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use x4_cat::overlay::base_archive_name;
use x4_cat::{detect_layers, CatTool, Layer};

pub const DEFAULT_LANGUAGE: u32 = 44;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config from {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write config to {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Game path does not exist: {}", .0.display())]
    GameNotFound(PathBuf),

    #[error("No base archives found in {}", .0.display())]
    BaseArchiveMissing(PathBuf),

    #[error("Extension detection failed: {0}")]
    Detect(#[from] x4_cat::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub game_path: PathBuf,
    pub cat_tool: PathBuf,
    pub tool_launcher: Option<PathBuf>,
    pub extraction_path: PathBuf,
    pub database_path: PathBuf,
    pub language: u32,
    pub tool_timeout_secs: u64,
    pub cleanup_after_extraction: bool,
    pub layers: Vec<Layer>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            game_path: PathBuf::new(),
            cat_tool: PathBuf::from("XRCatTool.exe"),
            tool_launcher: None,
            extraction_path: PathBuf::from("extracted"),
            database_path: PathBuf::from(x4_db::DEFAULT_DB_FILE),
            language: DEFAULT_LANGUAGE,
            tool_timeout_secs: x4_cat::cattool::DEFAULT_TIMEOUT.as_secs(),
            cleanup_after_extraction: false,
            layers: Vec::new(),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(dir.join("x4").join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `path`, or defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check the game installation is usable.
    ///
    /// `01.cat` only has to exist, so an unpacked install whose archives are
    /// directories passes too.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.game_path.is_dir() {
            return Err(ConfigError::GameNotFound(self.game_path.clone()));
        }
        if !self.game_path.join(base_archive_name(1)).exists() {
            return Err(ConfigError::BaseArchiveMissing(self.game_path.clone()));
        }
        Ok(())
    }

    /// Add installed extensions not already configured. Returns how many were added.
    pub fn detect_layers(&mut self) -> Result<usize, ConfigError> {
        let mut added = 0;
        for layer in detect_layers(&self.game_path)? {
            if self.layers.iter().any(|known| known.id == layer.id) {
                continue;
            }
            self.layers.push(layer);
            added += 1;
        }
        self.layers.sort_by(|a, b| a.load_order(b));
        Ok(added)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    /// The catalog tool as configured
    pub fn cat_tool(&self) -> CatTool {
        let tool = CatTool::new(&self.cat_tool).with_timeout(self.tool_timeout());
        match &self.tool_launcher {
            Some(launcher) => tool.with_launcher(launcher),
            None => tool,
        }
    }

    /// Comma-separated ids of the enabled layers, in load order
    pub fn enabled_layer_ids(&self) -> String {
        x4_cat::layer::enabled_in_order(&self.layers)
            .iter()
            .map(|layer| layer.id.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}
