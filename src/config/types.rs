use serde::{Deserialize, Serialize};

/// Root document persisted in `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Alias of the globally active configuration; empty if none.
    #[serde(default)]
    pub active: String,
    /// Stored configurations in insertion order.
    #[serde(default)]
    pub configs: Vec<ApiConfig>,
}

impl ConfigFile {
    pub fn find(&self, alias: &str) -> Option<&ApiConfig> {
        self.configs.iter().find(|c| c.alias == alias)
    }

    pub fn find_mut(&mut self, alias: &str) -> Option<&mut ApiConfig> {
        self.configs.iter_mut().find(|c| c.alias == alias)
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.find(alias).is_some()
    }

    /// The record `active` points at, if any.
    pub fn active_config(&self) -> Option<&ApiConfig> {
        if self.active.is_empty() {
            return None;
        }
        self.find(&self.active)
    }
}

/// One named set of API credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Unique identifier (e.g., "work", "personal", "openrouter").
    pub alias: String,
    /// Provider tag used for normalization (e.g., "anthropic").
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provider: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub auth_token: String,
    /// Base URL for the API (e.g., "https://api.anthropic.com").
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_url: String,
    /// Currently selected model.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub model: String,
    /// Supported models. When non-empty, `model` must be one of them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<String>,
}

impl ApiConfig {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = token.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = models.into_iter().map(Into::into).collect();
        self
    }
}

/// Sparse update for a stored configuration.
///
/// `None` leaves a field untouched; `Some("")` clears it. `models` replaces
/// the whole list and `alias` renames the record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigPatch {
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub auth_token: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub models: Option<Vec<String>>,
    pub alias: Option<String>,
}

impl ConfigPatch {
    pub fn is_empty(&self) -> bool {
        self.provider.is_none()
            && self.api_key.is_none()
            && self.auth_token.is_none()
            && self.base_url.is_none()
            && self.model.is_none()
            && self.models.is_none()
            && self.alias.is_none()
    }

    /// Apply the supplied scalar fields to `config`.
    ///
    /// `models` and `alias` need the model fallback and the uniqueness
    /// check, so [`ConfigManager::edit`](crate::config::ConfigManager::edit)
    /// handles them.
    pub fn apply_to(&self, config: &mut ApiConfig) {
        let fields = [
            (&self.provider, &mut config.provider),
            (&self.api_key, &mut config.api_key),
            (&self.auth_token, &mut config.auth_token),
            (&self.base_url, &mut config.base_url),
            (&self.model, &mut config.model),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = value.clone();
            }
        }
    }
}

/// Outcome of replacing a configuration's model list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelsUpdate {
    pub previous: String,
    pub current: String,
    /// True when `previous` was dropped because it left the list.
    pub fell_back: bool,
}

/// Result of [`ConfigManager::edit`](crate::config::ConfigManager::edit).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    /// The record as stored, under its possibly new alias.
    pub config: ApiConfig,
    /// Present when the patch replaced the model list.
    pub models: Option<ModelsUpdate>,
}
