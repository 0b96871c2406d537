//! Normalization and invariant checks for stored configurations.

use url::Url;

use crate::config::error::ValidationError;
use crate::config::providers;
use crate::config::types::ApiConfig;

/// Trim fields and apply provider rules in place.
///
/// - provider tag is lower-cased when it names a known provider
/// - trailing `/` is stripped from `base_url`
/// - a known provider with no `base_url` gets the provider default
pub fn normalize(config: &mut ApiConfig) {
    for field in [
        &mut config.alias,
        &mut config.provider,
        &mut config.api_key,
        &mut config.auth_token,
        &mut config.base_url,
        &mut config.model,
    ] {
        let trimmed = field.trim();
        if trimmed.len() != field.len() {
            *field = trimmed.to_string();
        }
    }

    let trimmed_len = config.base_url.trim_end_matches('/').len();
    config.base_url.truncate(trimmed_len);

    if let Some(def) = providers::lookup(&config.provider) {
        config.provider = def.id.to_string();
        if config.base_url.is_empty() {
            config.base_url = def.default_base_url.to_string();
        }
    }
}

/// Trim entries, drop blanks and duplicates (first occurrence wins).
///
/// Returns `EmptyModelsList` when the input had entries but none survived.
pub fn normalize_models<I, S>(models: I) -> Result<Vec<String>, ValidationError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut supplied = 0usize;
    let mut out: Vec<String> = Vec::new();
    for model in models {
        supplied += 1;
        let model = model.as_ref().trim();
        if model.is_empty() || out.iter().any(|m| m == model) {
            continue;
        }
        out.push(model.to_string());
    }

    if supplied > 0 && out.is_empty() {
        return Err(ValidationError::EmptyModelsList);
    }
    Ok(out)
}

/// Check every record-level invariant against the final state of `config`.
pub fn validate(config: &ApiConfig) -> Result<(), ValidationError> {
    if config.alias.trim().is_empty() {
        return Err(ValidationError::EmptyAlias);
    }

    if config.api_key.is_empty() && config.auth_token.is_empty() {
        return Err(ValidationError::BothAuthMethodsEmpty);
    }

    if !config.base_url.is_empty() {
        validate_base_url(&config.base_url)?;
    }

    if config.models.iter().any(|m| m.trim().is_empty()) {
        return Err(ValidationError::EmptyModelsList);
    }

    ensure_listed(&config.models, &config.model)
}

/// A model picked by name: non-blank, and one of `models` unless that list
/// is empty.
pub fn check_model_choice(models: &[String], model: &str) -> Result<(), ValidationError> {
    if model.is_empty() {
        return Err(ValidationError::EmptyModelName);
    }
    ensure_listed(models, model)
}

fn ensure_listed(models: &[String], model: &str) -> Result<(), ValidationError> {
    if !models.is_empty() && !models.iter().any(|m| m == model) {
        return Err(ValidationError::ModelNotInList {
            model: model.to_string(),
            models: models.to_vec(),
        });
    }
    Ok(())
}

/// Must be an absolute http(s) URL with a non-empty host.
pub fn validate_base_url(raw: &str) -> Result<(), ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(invalid("missing host")),
    }
}
