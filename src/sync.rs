//! Mirror of the resolved configuration into Claude's `settings.json`.
//!
//! The settings document belongs to another tool. Only the variables in
//! [`SYNCED_VARS`] inside its `"env"` object are owned here; every other key
//! is written back as it was read, in the same order. The file is never
//! created: a missing file means the tool is not installed or not wanted.
//! A symlinked file is updated through the link, and its mode is kept.
//!
//! Two processes syncing at once race on the owned keys; the last writer
//! wins.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::store::rewrite_foreign_json;
use crate::config::{ApiConfig, ConfigError, ConfigManager, Paths};
use crate::env::{EnvSet, SYNCED_VARS};

/// Errors from reading or rewriting the settings file.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to read settings file '{path}'")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse settings file '{path}'")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Settings file '{path}' is not a JSON object")]
    NotAnObject { path: PathBuf },

    #[error("Settings file '{path}' has an \"env\" field that is not an object")]
    EnvNotAnObject { path: PathBuf },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// What a sync did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// File was rewritten.
    Updated,
    /// File does not exist; nothing done.
    Skipped,
}

/// Writes configuration values into the external settings file.
#[derive(Debug, Clone)]
pub struct SyncEngine {
    manager: ConfigManager,
    path: PathBuf,
}

impl SyncEngine {
    pub fn new(manager: ConfigManager, paths: &Paths) -> Self {
        Self {
            manager,
            path: paths.settings_file().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mirror `config` without touching global state.
    pub fn sync_local_only(&self, config: &ApiConfig) -> Result<SyncOutcome, SyncError> {
        self.sync_env(&EnvSet::for_config(config))
    }

    /// Mirror the global active configuration, or clear the owned keys if
    /// there is none.
    pub fn restore_to_global(&self) -> Result<SyncOutcome, SyncError> {
        let env = match self.manager.get_active() {
            Ok(config) => EnvSet::for_config(&config),
            Err(ConfigError::NoActiveConfig) => EnvSet::new(),
            Err(e) => return Err(e.into()),
        };
        self.sync_env(&env)
    }

    /// Clear the owned keys and set those present in `env`.
    pub fn sync_env(&self, env: &EnvSet) -> Result<SyncOutcome, SyncError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "Settings file absent, skipping sync");
                return Ok(SyncOutcome::Skipped);
            }
            Err(source) => {
                return Err(SyncError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let mut doc: Value = serde_json::from_str(&content).map_err(|source| SyncError::Parse {
            path: self.path.clone(),
            source,
        })?;
        merge_env(&mut doc, env, &self.path)?;
        rewrite_foreign_json(&self.path, &doc)?;

        tracing::info!(path = %self.path.display(), "Settings file synced");
        Ok(SyncOutcome::Updated)
    }
}

fn merge_env(doc: &mut Value, env: &EnvSet, path: &Path) -> Result<(), SyncError> {
    let root = doc.as_object_mut().ok_or_else(|| SyncError::NotAnObject {
        path: path.to_path_buf(),
    })?;

    let env_map = root
        .entry("env")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| SyncError::EnvNotAnObject {
            path: path.to_path_buf(),
        })?;

    for var in SYNCED_VARS {
        env_map.shift_remove(var);
    }
    for (var, value) in env.vars() {
        if SYNCED_VARS.contains(var) {
            env_map.insert((*var).to_string(), Value::String(value.clone()));
        }
    }
    Ok(())
}
