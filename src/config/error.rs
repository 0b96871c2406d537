use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors produced by the configuration store and manager.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration '{alias}' not found")]
    NotFound { alias: String },

    #[error("Configuration '{alias}' already exists")]
    DuplicateAlias { alias: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Timed out after {}s waiting for lock on '{path}'", .timeout.as_secs_f32())]
    LockTimeout { path: PathBuf, timeout: Duration },

    #[error("I/O error on '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse '{path}'")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No active configuration")]
    NoActiveConfig,
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Data-model invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("alias must not be empty")]
    EmptyAlias,

    #[error("either api_key or auth_token must be set")]
    BothAuthMethodsEmpty,

    #[error("base_url '{url}' is not a valid http(s) URL: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("model '{model}' is not in the supported list [{}]", .models.join(", "))]
    ModelNotInList { model: String, models: Vec<String> },

    #[error("models list contains no usable model names")]
    EmptyModelsList,

    #[error("model name must not be empty")]
    EmptyModelName,
}
