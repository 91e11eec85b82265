// config.rs - configuration loading
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::path::Entities;

/// Default configuration file path
const CONFIG_FILE: &str = "./config.toml";

// ============== Config structs ==============

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub walker: WalkerConfig,
    /// Base query restricting which files a scan considers
    pub query: Entities,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct PathsConfig {
    /// BIDS dataset root
    pub root: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WalkerConfig {
    /// Follow symbolic links while walking
    pub follow_symlinks: bool,
    /// Maximum walk depth (0 means unlimited)
    pub max_depth: usize,
    /// Skip hidden files and directories below the root
    pub skip_hidden: bool,
    /// File names containing any of these (case-insensitive) are skipped entirely
    pub exclude_substrings: Vec<String>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            max_depth: 0,
            skip_hidden: true,
            exclude_substrings: vec!["test".to_string()],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DisplayConfig {
    /// Rows printed by the shell `list` command
    pub list_limit: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { list_limit: 20 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, `RUST_LOG` takes precedence
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

// ============== Loading ==============

impl AppConfig {
    /// Loads `./config.toml`, falling back to defaults when it is missing or invalid.
    pub fn load() -> Self {
        if !Path::new(CONFIG_FILE).exists() {
            return Self::default();
        }
        Self::load_from_file(CONFIG_FILE).unwrap_or_else(|e| {
            tracing::warn!("cannot load config file '{}': {}, using defaults", CONFIG_FILE, e);
            Self::default()
        })
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Writes the bundled default configuration file.
    pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<(), Box<dyn std::error::Error>> {
        let default_content = include_str!("../config.toml");
        fs::write(path, default_content)?;
        Ok(())
    }
}
