//! # Environment Snapshot
//!
//! Process-wide, immutable key-value configuration threaded through every
//! session to handler code.
//!
//! ## Sources (increasing precedence)
//!
//! 1. Optional JSON settings file (`appsettings.json` style). Nested objects
//!    are flattened with `:` separators.
//! 2. Process environment variables.
//!
//! Keys starting with the database prefix (`NPSQL_` by default) land in the
//! `database` map, everything else in `config`.

use crate::errors::EnvError;
use arc_swap::ArcSwap;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Default prefix routing keys into the database map.
pub const DEFAULT_DATABASE_PREFIX: &str = "NPSQL_";

lazy_static! {
    static ref GLOBAL_ENV: ArcSwap<GlobalEnv> = ArcSwap::from_pointee(GlobalEnv::empty());
}

/// Immutable configuration snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalEnv {
    config: BTreeMap<String, String>,
    database: BTreeMap<String, String>,
}

impl GlobalEnv {
    /// Create a snapshot from explicit maps.
    #[must_use]
    pub fn new(config: BTreeMap<String, String>, database: BTreeMap<String, String>) -> Self {
        Self { config, database }
    }

    /// A snapshot with no keys.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The current process-wide snapshot.
    #[must_use]
    pub fn global() -> Arc<GlobalEnv> {
        GLOBAL_ENV.load_full()
    }

    /// Replace the process-wide snapshot.
    ///
    /// Sessions created earlier keep the snapshot they captured.
    pub fn set_global(env: GlobalEnv) {
        info!(
            config_keys = env.config.len(),
            database_keys = env.database.len(),
            "Global environment replaced"
        );
        GLOBAL_ENV.store(Arc::new(env));
    }

    /// Look up a general configuration key.
    #[must_use]
    pub fn config(&self, key: &str) -> Option<&str> {
        self.config.get(key).map(String::as_str)
    }

    /// Look up a database configuration key.
    #[must_use]
    pub fn database(&self, key: &str) -> Option<&str> {
        self.database.get(key).map(String::as_str)
    }

    /// Look up a general configuration key that must be present.
    pub fn require_config(&self, key: &str) -> Result<&str, EnvError> {
        self.config(key).ok_or_else(|| EnvError::MissingKey {
            key: key.to_string(),
        })
    }

    /// All general configuration entries.
    #[must_use]
    pub fn config_entries(&self) -> &BTreeMap<String, String> {
        &self.config
    }

    /// All database configuration entries.
    #[must_use]
    pub fn database_entries(&self) -> &BTreeMap<String, String> {
        &self.database
    }
}

/// Builds a [`GlobalEnv`] from a settings file and environment variables.
#[derive(Debug, Clone)]
pub struct EnvLoader {
    settings_file: Option<PathBuf>,
    database_prefix: String,
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvLoader {
    /// Loader with no settings file and the default database prefix.
    #[must_use]
    pub fn new() -> Self {
        Self {
            settings_file: None,
            database_prefix: DEFAULT_DATABASE_PREFIX.to_string(),
        }
    }

    /// Read this JSON settings file first. A missing file is skipped.
    #[must_use]
    pub fn with_settings_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_file = Some(path.into());
        self
    }

    /// Route keys with this prefix into the database map.
    #[must_use]
    pub fn with_database_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.database_prefix = prefix.into();
        self
    }

    /// Load from the settings file and the process environment.
    pub fn load(&self) -> Result<GlobalEnv, EnvError> {
        self.load_from(std::env::vars())
    }

    /// Load from the settings file and the given variables.
    pub fn load_from<I, K, V>(&self, vars: I) -> Result<GlobalEnv, EnvError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut env = GlobalEnv::empty();

        if let Some(path) = &self.settings_file {
            for (key, value) in read_settings_file(path)? {
                self.insert(&mut env, key, value);
            }
        }

        for (key, value) in vars {
            self.insert(&mut env, key.into(), value.into());
        }

        debug!(
            config_keys = env.config.len(),
            database_keys = env.database.len(),
            "Environment snapshot loaded"
        );
        Ok(env)
    }

    fn insert(&self, env: &mut GlobalEnv, key: String, value: String) {
        if !self.database_prefix.is_empty() && key.starts_with(&self.database_prefix) {
            env.database.insert(key, value);
        } else {
            env.config.insert(key, value);
        }
    }
}

fn read_settings_file(path: &Path) -> Result<Vec<(String, String)>, EnvError> {
    if !path.exists() {
        debug!(path = %path.display(), "Settings file not found, skipping");
        return Ok(Vec::new());
    }

    let settings_error = |reason: String| EnvError::SettingsFile {
        path: path.display().to_string(),
        reason,
    };

    let raw = std::fs::read_to_string(path).map_err(|e| settings_error(e.to_string()))?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).map_err(|e| settings_error(e.to_string()))?;

    let serde_json::Value::Object(map) = value else {
        return Err(settings_error("top-level value must be an object".to_string()));
    };

    let mut entries = Vec::new();
    for (key, value) in map {
        flatten(key, value, &mut entries);
    }
    Ok(entries)
}

fn flatten(prefix: String, value: serde_json::Value, out: &mut Vec<(String, String)>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, nested) in map {
                flatten(format!("{prefix}:{key}"), nested, out);
            }
        }
        serde_json::Value::String(s) => out.push((prefix, s)),
        serde_json::Value::Null => {}
        other => out.push((prefix, other.to_string())),
    }
}

/// Connection settings for the SQL backend.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub address: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub keyspace: String,
}

impl DatabaseSettings {
    pub const ADDRESS_KEY: &'static str = "NPSQL_ADDRESS";
    /// Mixed-case spelling used by older deployments, read when
    /// [`ADDRESS_KEY`](Self::ADDRESS_KEY) is absent.
    pub const ADDRESS_KEY_ALIAS: &'static str = "NPSQL_Address";
    pub const PORT_KEY: &'static str = "NPSQL_PORT";
    pub const USERNAME_KEY: &'static str = "NPSQL_USERNAME";
    pub const PASSWORD_KEY: &'static str = "NPSQL_PASSWORD";
    pub const KEYSPACE_KEY: &'static str = "NPSQL_KEYSPACE";

    /// Extract the settings from a snapshot's database map.
    ///
    /// # Errors
    ///
    /// - `EnvError::MissingKey` - a required key is absent
    /// - `EnvError::InvalidValue` - the port is not a valid `u16`
    pub fn from_env(env: &GlobalEnv) -> Result<Self, EnvError> {
        let required = |key: &str| {
            env.database(key)
                .map(str::to_string)
                .ok_or_else(|| EnvError::MissingKey {
                    key: key.to_string(),
                })
        };

        let port_raw = required(Self::PORT_KEY)?;
        let port = port_raw.parse().map_err(|e: std::num::ParseIntError| {
            EnvError::InvalidValue {
                key: Self::PORT_KEY.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            address: required(Self::ADDRESS_KEY)
                .or_else(|missing| required(Self::ADDRESS_KEY_ALIAS).map_err(|_| missing))?,
            port,
            username: required(Self::USERNAME_KEY)?,
            password: required(Self::PASSWORD_KEY)?,
            keyspace: required(Self::KEYSPACE_KEY)?,
        })
    }
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("address", &self.address)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("keyspace", &self.keyspace)
            .finish()
    }
}
