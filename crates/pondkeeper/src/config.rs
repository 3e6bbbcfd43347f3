//! Configuration management for pondkeeper.
//!
//! Configuration is layered with figment: defaults, then a TOML file, then
//! `PONDKEEPER_` environment variables. The loaded [`Config`] is owned by the
//! entry point and handed to the services that need it; nothing reads settings
//! from ambient global state.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "pondkeeper";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "pondkeeper.db";

/// Application configuration.
///
/// Loaded from (highest precedence first):
/// 1. Environment variables such as `PONDKEEPER_SETTINGS__NEON_HOST`
/// 2. TOML config file at `~/.config/pondkeeper/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Local storage configuration.
    pub storage: StorageConfig,
    /// Remote database connection settings.
    pub settings: Settings,
    /// SQL export defaults.
    pub export: ExportConfig,
    /// Demo data seeding.
    pub seed: SeedConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/pondkeeper/pondkeeper.db`
    pub database_path: Option<PathBuf>,
}

/// Connection settings for the remote PostgreSQL targets.
///
/// These are the string settings carried in the `localStorage` section of a
/// backup file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Supabase project URL.
    pub supabase_url: Option<String>,
    /// Supabase anonymous API key.
    pub supabase_anon_key: Option<String>,
    /// Neon `postgres://` connection string, used by the psql export.
    pub neon_connection_string: Option<String>,
    /// Neon host name.
    pub neon_host: Option<String>,
}

/// SQL export configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Prepend the schema to `sql export` output.
    pub include_schema: bool,
}

/// Demo data seeding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// Create `owner` and `staff` accounts when no users exist.
    pub demo_users: bool,
    /// Create the demo menu when the menu is empty.
    pub demo_menu: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            include_schema: true,
        }
    }
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            demo_users: true,
            demo_menu: false,
        }
    }
}

impl Settings {
    /// Setting names, as they appear in backup files.
    pub const NAMES: [&'static str; 4] = [
        "supabase_url",
        "supabase_anon_key",
        "neon_connection_string",
        "neon_host",
    ];

    /// Look up a setting by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        match name {
            "supabase_url" => self.supabase_url.as_deref(),
            "supabase_anon_key" => self.supabase_anon_key.as_deref(),
            "neon_connection_string" => self.neon_connection_string.as_deref(),
            "neon_host" => self.neon_host.as_deref(),
            _ => None,
        }
    }

    /// Set (`Some`) or remove (`None`) a setting by name.
    ///
    /// Returns `false` if the name is not a known setting.
    pub fn set(&mut self, name: &str, value: Option<String>) -> bool {
        let slot = match name {
            "supabase_url" => &mut self.supabase_url,
            "supabase_anon_key" => &mut self.supabase_anon_key,
            "neon_connection_string" => &mut self.neon_connection_string,
            "neon_host" => &mut self.neon_host,
            _ => return false,
        };
        *slot = value;
        true
    }

    /// Validate the URL-shaped settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] if a URL has the wrong scheme.
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.supabase_url {
            if !url_scheme().is_match(url) {
                return Err(Error::ConfigValidation {
                    message: format!("supabase_url must be an http(s) URL: {url}"),
                });
            }
        }

        if let Some(conn) = &self.neon_connection_string {
            if !postgres_scheme().is_match(conn) {
                return Err(Error::ConfigValidation {
                    message: "neon_connection_string must start with postgres:// or postgresql://"
                        .to_string(),
                });
            }
        }

        Ok(())
    }
}

fn url_scheme() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^https?://\S+$").expect("static regex"))
}

fn postgres_scheme() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^postgres(ql)?://\S+$").expect("static regex"))
}

impl Config {
    /// Load configuration from the default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("PONDKEEPER_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Write this configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigSave`] if serialization or the write fails.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self).map_err(|e| Error::ConfigSave {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        std::fs::write(path, text).map_err(|e| Error::ConfigSave {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if let Some(path) = &self.storage.database_path {
            if path.as_os_str().is_empty() {
                return Err(Error::ConfigValidation {
                    message: "database_path cannot be empty".to_string(),
                });
            }
        }

        self.settings.validate()
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }
}
