//! TOML-based configuration for Dossier.
//!
//! Supports a config file (dossier.toml) with environment variable expansion
//! in path values.
//!
//! Example configuration:
//! ```toml
//! [query]
//! preview_limit = 50
//!
//! [schema]
//! source = "${DOSSIER_HOME}/schema.json"
//! fallback_enabled = true
//!
//! [store]
//! path = "./reports.db"
//!
//! [display]
//! utc_offset_minutes = 600
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::aggregate::ViewerZone;
use crate::planner::DEFAULT_ROW_LIMIT;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub query: QuerySettings,
    pub schema: SchemaSettings,
    pub store: StoreSettings,
    pub display: DisplaySettings,
}

/// Row query settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct QuerySettings {
    /// Row cap for previews and report runs.
    pub preview_limit: u64,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            preview_limit: DEFAULT_ROW_LIMIT,
        }
    }
}

/// Where entity metadata comes from.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SchemaSettings {
    /// Schema document (.json or .toml). Unset means the built-in entities.
    pub source: Option<String>,

    /// Fall back to the built-in entities when the source cannot be read.
    pub fallback_enabled: bool,
}

impl Default for SchemaSettings {
    fn default() -> Self {
        Self {
            source: None,
            fallback_enabled: true,
        }
    }
}

/// Report store settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreSettings {
    /// SQLite file. Defaults to `~/.dossier/reports.db`.
    pub path: Option<String>,
}

/// Presentation settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Viewer offset from UTC used for date buckets. Unset means the host's
    /// local zone.
    pub utc_offset_minutes: Option<i32>,
}

impl DisplaySettings {
    pub fn zone(&self) -> ViewerZone {
        match self.utc_offset_minutes {
            Some(minutes) => ViewerZone::from_offset_minutes(minutes),
            None => ViewerZone::Local,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `DOSSIER_CONFIG`
    /// 2. `./dossier.toml`
    /// 3. `~/.config/dossier/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("DOSSIER_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("dossier.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("dossier").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.query.preview_limit == 0 {
            return Err(SettingsError::InvalidConfig(
                "query.preview_limit must be at least 1".to_string(),
            ));
        }
        if let Some(minutes) = self.display.utc_offset_minutes {
            if minutes.unsigned_abs() >= 24 * 60 {
                return Err(SettingsError::InvalidConfig(format!(
                    "display.utc_offset_minutes out of range: {}",
                    minutes
                )));
            }
        }
        Ok(())
    }

    /// Schema document path with environment variables expanded.
    pub fn schema_source(&self) -> Result<Option<PathBuf>, SettingsError> {
        self.schema
            .source
            .as_deref()
            .map(|s| expand_env_vars(s).map(PathBuf::from))
            .transpose()
    }

    /// Store path with environment variables expanded.
    pub fn store_path(&self) -> Result<Option<PathBuf>, SettingsError> {
        self.store
            .path
            .as_deref()
            .map(|s| expand_env_vars(s).map(PathBuf::from))
            .transpose()
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let var_name: String = if chars.next_if_eq(&'{').is_some() {
            let name = std::iter::from_fn(|| chars.next_if(|&ch| ch != '}')).collect();
            chars.next(); // closing '}'
            name
        } else {
            std::iter::from_fn(|| chars.next_if(|&ch| ch.is_alphanumeric() || ch == '_')).collect()
        };

        if var_name.is_empty() {
            // Just a lone $, keep it
            result.push('$');
            continue;
        }
        let value = env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name))?;
        result.push_str(&value);
    }

    Ok(result)
}
