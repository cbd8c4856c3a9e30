//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/looptree/looptree.toml`
//! 3. Explicit config file (`--config`)
//! 4. Environment variables: `LOOPTREE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::arena::{Node, PATH_DELIMITER};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("config error: {message}")]
    Config { message: String },
}

fn config_err(e: config::ConfigError) -> SettingsError {
    SettingsError::Config {
        message: e.to_string(),
    }
}

/// Path rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Separator between ids, both when reading path files and when rendering paths
    pub delimiter: String,
    /// Pad rendered paths with empty columns up to this depth
    pub pad_to_level: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            delimiter: PATH_DELIMITER.to_string(),
            pad_to_level: None,
        }
    }
}

/// Raw settings for intermediate parsing (`None` means "not specified, inherit").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub delimiter: Option<String>,
    pub pad_to_level: Option<usize>,
}

/// Get the XDG config directory for looptree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "looptree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("looptree.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, SettingsError> {
    let content = std::fs::read_to_string(path).map_err(|e| SettingsError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| SettingsError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            delimiter: overlay
                .delimiter
                .clone()
                .unwrap_or_else(|| self.delimiter.clone()),
            pad_to_level: overlay.pad_to_level.or(self.pad_to_level),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `config_file` - Optional explicit config file; it must exist when given
    pub fn load(config_file: Option<&Path>) -> Result<Self, SettingsError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!("Loading global config: {}", global_path.display());
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        if let Some(path) = config_file {
            if !path.exists() {
                return Err(SettingsError::NotFound(path.to_path_buf()));
            }
            debug!("Loading config: {}", path.display());
            current = current.merge_with(&load_raw_settings(path)?);
        }

        Self::apply_env_overrides(current)
    }

    /// Apply LOOPTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, SettingsError> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("LOOPTREE"))
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("delimiter") {
            settings.delimiter = val;
        }
        if let Ok(val) = config.get::<usize>("pad_to_level") {
            settings.pad_to_level = Some(val);
        }

        Ok(settings)
    }

    /// Renders a node's path with the configured delimiter and padding.
    pub fn render_path<D>(&self, node: &Node<D>) -> String {
        node.extended_path_with(&self.delimiter, self.pad_to_level.unwrap_or(0))
    }
}
