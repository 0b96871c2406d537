//! CRUD and activation over the stored configurations.
//!
//! Every mutation goes through [`Store::atomic_update`], is checked against
//! the record invariants on the *resulting* record, and is either applied
//! in full or not at all.

use crate::config::error::{ConfigError, ValidationError};
use crate::config::store::Store;
use crate::config::types::{ApiConfig, ConfigFile, ConfigPatch, EditOutcome, ModelsUpdate};
use crate::config::validate::{check_model_choice, normalize, normalize_models, validate};

/// Entry point for all configuration reads and writes.
///
/// Constructed once per invocation and passed to whoever needs it.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    store: Store,
}

impl ConfigManager {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Snapshot of the whole document.
    pub fn load(&self) -> Result<ConfigFile, ConfigError> {
        self.store.load()
    }

    /// Add a new configuration. Returns the record as stored.
    ///
    /// An empty `model` is filled with the first supported model.
    pub fn add(&self, mut config: ApiConfig) -> Result<ApiConfig, ConfigError> {
        normalize(&mut config);
        config.models = normalize_models(&config.models)?;
        if config.model.is_empty() {
            if let Some(first) = config.models.first() {
                config.model = first.clone();
            }
        }
        validate(&config)?;

        let stored = config.clone();
        self.store.atomic_update(move |doc| {
            if doc.contains(&config.alias) {
                return Err(ConfigError::DuplicateAlias {
                    alias: config.alias,
                });
            }
            doc.configs.push(config);
            Ok(())
        })?;

        tracing::info!(alias = %stored.alias, "Configuration added");
        Ok(stored)
    }

    pub fn get(&self, alias: &str) -> Result<ApiConfig, ConfigError> {
        self.store
            .load()?
            .find(alias)
            .cloned()
            .ok_or_else(|| not_found(alias))
    }

    /// All configurations in insertion order.
    pub fn list(&self) -> Result<Vec<ApiConfig>, ConfigError> {
        Ok(self.store.load()?.configs)
    }

    /// Delete a configuration.
    ///
    /// Returns `true` when the removed alias was the global active one, in
    /// which case `active` has been cleared.
    pub fn remove(&self, alias: &str) -> Result<bool, ConfigError> {
        let was_active = self.store.atomic_update(|doc| {
            let index = doc
                .configs
                .iter()
                .position(|c| c.alias == alias)
                .ok_or_else(|| not_found(alias))?;
            doc.configs.remove(index);

            let was_active = doc.active == alias;
            if was_active {
                doc.active.clear();
            }
            Ok(was_active)
        })?;

        tracing::info!(alias = %alias, cleared_active = was_active, "Configuration removed");
        Ok(was_active)
    }

    /// Rename `old` to `new`, following the global active pointer.
    pub fn rename_alias(&self, old: &str, new: &str) -> Result<(), ConfigError> {
        let new = new.trim();
        if new.is_empty() {
            return Err(ValidationError::EmptyAlias.into());
        }

        self.store.atomic_update(|doc| {
            if !doc.contains(old) {
                return Err(not_found(old));
            }
            if old == new {
                return Ok(());
            }
            if doc.contains(new) {
                return Err(ConfigError::DuplicateAlias {
                    alias: new.to_string(),
                });
            }

            if let Some(config) = doc.find_mut(old) {
                config.alias = new.to_string();
            }
            if doc.active == old {
                doc.active = new.to_string();
            }
            Ok(())
        })?;

        tracing::info!(old_alias = %old, new_alias = %new, "Configuration renamed");
        Ok(())
    }

    /// Apply only the fields present in `patch`.
    ///
    /// The merged record is normalized and fully re-validated, so e.g.
    /// clearing the only credential fails even though the patch names a
    /// single field.
    pub fn update_partial(&self, alias: &str, patch: &ConfigPatch) -> Result<ApiConfig, ConfigError> {
        self.edit(alias, patch).map(|outcome| outcome.config)
    }

    /// Apply `patch` (fields, model list and rename) as one mutation.
    ///
    /// Everything lands on a single candidate record that is validated
    /// before the document is touched. Any failure leaves the stored
    /// configuration exactly as it was.
    ///
    /// A replaced model list keeps the current model if it is still listed,
    /// otherwise falls back to the first entry. An explicit `patch.model`
    /// wins over the fallback.
    pub fn edit(&self, alias: &str, patch: &ConfigPatch) -> Result<EditOutcome, ConfigError> {
        let models = patch.models.as_ref().map(normalize_models).transpose()?;
        let new_alias = match patch.alias.as_deref().map(str::trim) {
            Some("") => return Err(ValidationError::EmptyAlias.into()),
            other => other,
        };

        let outcome = self.store.atomic_update(|doc| {
            let current = doc.find(alias).ok_or_else(|| not_found(alias))?;
            let previous_model = current.model.clone();

            let mut candidate = current.clone();
            patch.apply_to(&mut candidate);

            let models_update = models.map(|models| {
                if patch.model.is_none() && !models.contains(&candidate.model) {
                    candidate.model = models.first().cloned().unwrap_or_default();
                }
                candidate.models = models;
                ModelsUpdate {
                    fell_back: patch.model.is_none() && previous_model != candidate.model,
                    previous: previous_model,
                    current: candidate.model.clone(),
                }
            });

            if let Some(new_alias) = new_alias {
                if new_alias != alias && doc.contains(new_alias) {
                    return Err(ConfigError::DuplicateAlias {
                        alias: new_alias.to_string(),
                    });
                }
                candidate.alias = new_alias.to_string();
            }

            normalize(&mut candidate);
            validate(&candidate)?;

            if doc.active == alias {
                doc.active = candidate.alias.clone();
            }
            if let Some(slot) = doc.find_mut(alias) {
                *slot = candidate.clone();
            }
            Ok(EditOutcome {
                config: candidate,
                models: models_update,
            })
        })?;

        if outcome.config.alias != alias {
            tracing::info!(old_alias = %alias, new_alias = %outcome.config.alias, "Configuration renamed");
        }
        if let Some(update) = outcome.models.as_ref().filter(|u| u.fell_back) {
            tracing::warn!(
                alias = %outcome.config.alias,
                previous = %update.previous,
                current = %update.current,
                "Model not in new list, fell back"
            );
        }
        tracing::info!(alias = %outcome.config.alias, "Configuration updated");
        Ok(outcome)
    }

    /// Replace the supported-model list.
    ///
    /// If the current model is not in the new list it falls back to the
    /// first entry, or is cleared when the list is empty. The returned
    /// [`ModelsUpdate`] reports whether that happened.
    pub fn set_models<I, S>(&self, alias: &str, models: I) -> Result<ModelsUpdate, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let models = normalize_models(models)?;

        let update = self.store.atomic_update(|doc| {
            let config = doc.find_mut(alias).ok_or_else(|| not_found(alias))?;

            let previous = config.model.clone();
            let current = if models.contains(&previous) {
                previous.clone()
            } else {
                models.first().cloned().unwrap_or_default()
            };

            let mut candidate = config.clone();
            candidate.models = models;
            candidate.model = current.clone();
            validate(&candidate)?;
            *config = candidate;

            Ok(ModelsUpdate {
                fell_back: previous != current,
                previous,
                current,
            })
        })?;

        if update.fell_back {
            tracing::warn!(
                alias = %alias,
                previous = %update.previous,
                current = %update.current,
                "Model not in new list, fell back"
            );
        }
        Ok(update)
    }

    /// Select one of the supported models.
    pub fn switch_model(&self, alias: &str, model: &str) -> Result<ApiConfig, ConfigError> {
        let model = model.trim();
        if model.is_empty() {
            return Err(ValidationError::EmptyModelName.into());
        }

        let updated = self.store.atomic_update(|doc| {
            let config = doc.find_mut(alias).ok_or_else(|| not_found(alias))?;
            check_model_choice(&config.models, model)?;
            config.model = model.to_string();
            Ok(config.clone())
        })?;

        tracing::info!(alias = %alias, model = %model, "Model switched");
        Ok(updated)
    }

    /// Point the global `active` alias at `alias`.
    pub fn set_active(&self, alias: &str) -> Result<ApiConfig, ConfigError> {
        let (previous, config) = self.store.atomic_update(|doc| {
            let config = doc.find(alias).cloned().ok_or_else(|| not_found(alias))?;
            let previous = std::mem::replace(&mut doc.active, alias.to_string());
            Ok((previous, config))
        })?;

        tracing::info!(
            old_active = %previous,
            new_active = %alias,
            "Global configuration switched"
        );
        Ok(config)
    }

    /// Resolve the global `active` alias to its record.
    pub fn get_active(&self) -> Result<ApiConfig, ConfigError> {
        let doc = self.store.load()?;
        if doc.active.is_empty() {
            return Err(ConfigError::NoActiveConfig);
        }
        match doc.active_config() {
            Some(config) => Ok(config.clone()),
            None => {
                tracing::warn!(active = %doc.active, "Active alias has no matching configuration");
                Err(ConfigError::NoActiveConfig)
            }
        }
    }
}

fn not_found(alias: &str) -> ConfigError {
    ConfigError::NotFound {
        alias: alias.to_string(),
    }
}
