//! Environment builder. All recognized variables live here.

use crate::config::{ApiConfig, AuthMethod};

pub const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";
pub const AUTH_TOKEN_VAR: &str = "ANTHROPIC_AUTH_TOKEN";
pub const BASE_URL_VAR: &str = "ANTHROPIC_BASE_URL";
pub const MODEL_VAR: &str = "ANTHROPIC_MODEL";
/// Marks which alias the shell has active.
pub const ACTIVE_ALIAS_VAR: &str = "APIMGR_ACTIVE";

/// Every variable the tool sets or unsets, in script order.
pub const RECOGNIZED_VARS: [&str; 5] = [
    API_KEY_VAR,
    AUTH_TOKEN_VAR,
    BASE_URL_VAR,
    MODEL_VAR,
    ACTIVE_ALIAS_VAR,
];

/// Variables owned inside the external settings file's `env` map.
pub const SYNCED_VARS: [&str; 4] = [API_KEY_VAR, AUTH_TOKEN_VAR, BASE_URL_VAR, MODEL_VAR];

/// Ordered set of variables to export. Empty values are never added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSet {
    vars: Vec<(&'static str, String)>,
}

impl EnvSet {
    pub fn new() -> Self {
        Self { vars: Vec::new() }
    }

    /// Credential, base URL and model of `config`.
    ///
    /// Only one credential is exported; the API key wins over the token.
    pub fn for_config(config: &ApiConfig) -> Self {
        let mut env = Self::new();
        if let Some((method, secret)) = config.credential() {
            let var = match method {
                AuthMethod::ApiKey => API_KEY_VAR,
                AuthMethod::AuthToken => AUTH_TOKEN_VAR,
            };
            env.set(var, secret.expose());
        }
        env.set(BASE_URL_VAR, &config.base_url);
        env.set(MODEL_VAR, &config.model);
        env
    }

    /// Replace the model, e.g. for a session-only override.
    pub fn with_model(mut self, model: Option<&str>) -> Self {
        if let Some(model) = model {
            self.set(MODEL_VAR, model);
        }
        self
    }

    pub fn with_active_alias(mut self, alias: &str) -> Self {
        self.set(ACTIVE_ALIAS_VAR, alias);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(var, _)| *var == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn vars(&self) -> &[(&'static str, String)] {
        &self.vars
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    fn set(&mut self, var: &'static str, value: &str) {
        self.vars.retain(|(name, _)| *name != var);
        if !value.is_empty() {
            self.vars.push((var, value.to_string()));
        }
    }
}
