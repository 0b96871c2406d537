//! Global and session-local activation.
//!
//! The config document (global) or the session marker (local) is the
//! authoritative change. The activation script and the settings mirror are
//! refreshed afterwards; their failures are logged and never fail the
//! switch.

use std::error::Error;

use crate::config::validate::check_model_choice;
use crate::config::{ApiConfig, ConfigError, ConfigManager, Paths};
use crate::env::{render_script, EnvSet, ScriptGenerator};
use crate::session::SessionTracker;
use crate::sync::{SyncEngine, SyncOutcome};

/// Result of a switch: the record and the script the shell should eval.
#[derive(Debug, Clone)]
pub struct Activation {
    pub config: ApiConfig,
    pub env: EnvSet,
}

impl Activation {
    fn new(config: ApiConfig, model_override: Option<&str>) -> Self {
        let env = EnvSet::for_config(&config)
            .with_model(model_override)
            .with_active_alias(&config.alias);
        Self { config, env }
    }

    pub fn script(&self) -> String {
        render_script(&self.env)
    }
}

/// Ties the manager, session markers, script and settings mirror together.
#[derive(Debug, Clone)]
pub struct Activator {
    manager: ConfigManager,
    sessions: SessionTracker,
    sync: SyncEngine,
    script: ScriptGenerator,
}

impl Activator {
    pub fn new(manager: ConfigManager, paths: &Paths) -> Self {
        Self {
            sessions: SessionTracker::new(paths),
            sync: SyncEngine::new(manager.clone(), paths),
            script: ScriptGenerator::new(manager.clone(), paths),
            manager,
        }
    }

    pub fn manager(&self) -> &ConfigManager {
        &self.manager
    }

    pub fn sessions(&self) -> &SessionTracker {
        &self.sessions
    }

    pub fn sync_engine(&self) -> &SyncEngine {
        &self.sync
    }

    pub fn script_generator(&self) -> &ScriptGenerator {
        &self.script
    }

    /// Make `alias` the global default.
    ///
    /// With `model`, the stored model is switched first, so a bad model
    /// leaves the active pointer untouched.
    pub fn switch_global(&self, alias: &str, model: Option<&str>) -> Result<Activation, ConfigError> {
        if let Some(model) = model {
            self.manager.switch_model(alias, model)?;
        }
        let config = self.manager.set_active(alias)?;

        best_effort("activation script", self.script.generate());
        best_effort("settings sync", self.sync.sync_local_only(&config));

        Ok(Activation::new(config, None))
    }

    /// Activate `alias` for the shell `pid` only.
    ///
    /// Neither `config.json` nor `active.env` is touched. A `model` override
    /// applies to this session's environment and is not stored.
    pub fn switch_local(
        &self,
        alias: &str,
        model: Option<&str>,
        pid: u32,
    ) -> Result<Activation, ConfigError> {
        let config = self.manager.get(alias)?;
        let model = model.map(str::trim);
        if let Some(model) = model {
            check_model_choice(&config.models, model)?;
        }

        self.sessions.create_marker(pid, alias)?;

        let activation = Activation::new(config, model);
        best_effort("settings sync", self.sync.sync_env(&activation.env));
        tracing::info!(alias = %alias, pid, "Local configuration switched");
        Ok(activation)
    }

    /// Script for a freshly started shell.
    ///
    /// If other terminals hold local overrides, the settings mirror is first
    /// reset to the global configuration so this shell's tools do not pick
    /// up someone else's override.
    pub fn load_active(&self) -> Result<String, ConfigError> {
        match self.sessions.has_active_sessions() {
            Ok(true) => best_effort("settings restore", self.sync.restore_to_global()),
            Ok(false) => {}
            Err(e) => tracing::warn!(error = %e, "Could not inspect session markers"),
        }
        self.script.render()
    }

    /// Drop the marker for `pid`.
    ///
    /// When that was the last live local session, the settings mirror goes
    /// back to the global configuration. Returns whether it did.
    pub fn cleanup_session(&self, pid: u32) -> Result<bool, ConfigError> {
        let had_marker = self.sessions.has_marker(pid);
        self.sessions.remove_marker(pid);
        if !had_marker || self.sessions.has_active_sessions()? {
            return Ok(false);
        }

        best_effort("settings restore", self.sync.restore_to_global());
        Ok(true)
    }

    /// Rewrite `active.env` and the settings mirror from global state.
    ///
    /// Unlike the switch paths, failures are returned.
    pub fn resync(&self) -> Result<SyncOutcome, crate::sync::SyncError> {
        self.script.generate()?;
        self.sync.restore_to_global()
    }

    /// Refresh derived files after `alias` was edited or removed.
    ///
    /// Only matters when `alias` is (or was) the global active one. The
    /// settings mirror is left alone while local sessions are live.
    pub fn refresh_after_change(&self, alias: &str, was_active: bool) {
        let is_active = match self.manager.load() {
            Ok(doc) => doc.active == alias,
            Err(e) => {
                tracing::warn!(error = %e, "Could not reload configuration");
                return;
            }
        };
        if !is_active && !was_active {
            return;
        }

        best_effort("activation script", self.script.generate());
        match self.sessions.has_active_sessions() {
            Ok(false) => best_effort("settings sync", self.sync.restore_to_global()),
            Ok(true) => tracing::debug!("Local sessions live, leaving settings file alone"),
            Err(e) => tracing::warn!(error = %e, "Could not inspect session markers"),
        }
    }
}

/// Log a secondary side effect's failure instead of propagating it.
fn best_effort<T, E: Error>(what: &str, result: Result<T, E>) {
    if let Err(e) = result {
        let mut message = e.to_string();
        let mut source = e.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        tracing::warn!(error = %message, "{what} failed; continuing");
    }
}
