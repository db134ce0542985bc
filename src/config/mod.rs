//! Configuration module for Dossier.
//!
//! Handles the settings file and environment variable expansion.

mod settings;

pub use settings::{
    expand_env_vars, DisplaySettings, QuerySettings, SchemaSettings, Settings, SettingsError,
    StoreSettings,
};
