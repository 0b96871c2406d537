//! Command execution.

use std::io::Write;

use anyhow::{bail, Context as _, Result};

use crate::activation::Activator;
use crate::cli::{hook, Cli, Command, FieldArgs};
use crate::config::{
    mask, providers, ApiConfig, ConfigManager, ConfigPatch, ModelsUpdate, Paths, Store,
};
use crate::env::{
    render_script, render_unset_all, EnvSet, ACTIVE_ALIAS_VAR, API_KEY_VAR, AUTH_TOKEN_VAR,
    RECOGNIZED_VARS,
};
use crate::session::parent_pid;
use crate::sync::SyncOutcome;

/// The invoking shell's view of the recognized variables.
#[derive(Debug, Clone, Default)]
pub struct ShellEnv {
    vars: Vec<(&'static str, String)>,
}

impl ShellEnv {
    pub fn from_process() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = RECOGNIZED_VARS
            .into_iter()
            .filter_map(|var| lookup(var).map(|value| (var, value)))
            .filter(|(_, value)| !value.is_empty())
            .collect();
        Self { vars }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(var, _)| *var == name)
            .map(|(_, value)| value.as_str())
    }

    /// Alias the shell currently has exported.
    pub fn active_alias(&self) -> Option<&str> {
        self.get(ACTIVE_ALIAS_VAR)
    }
}

/// Run one parsed command.
pub fn run(cli: Cli, shell: ShellEnv, out: &mut dyn Write, err: &mut dyn Write) -> Result<()> {
    let paths = Paths::resolve(cli.config_dir, cli.settings_file);
    let manager = ConfigManager::new(Store::new(&paths));
    let mut ctx = Context {
        activator: Activator::new(manager, &paths),
        shell,
        pid: cli.pid.unwrap_or_else(parent_pid),
        out,
        err,
    };

    match cli.command {
        Command::Switch {
            alias,
            local,
            model,
        } => ctx.switch(&alias, local, model.as_deref()),
        Command::Add { alias, fields } => ctx.add(alias, fields),
        Command::Edit {
            alias,
            fields,
            rename,
        } => ctx.edit(&alias, fields, rename),
        Command::Remove { alias } => ctx.remove(&alias),
        Command::List => ctx.list(),
        Command::Status => ctx.status(),
        Command::LoadActive => ctx.load_active(),
        Command::CleanupSession { session_pid } => ctx.cleanup_session(session_pid),
        Command::Sync => ctx.sync(),
        Command::Models { alias, models } => ctx.models(&alias, models),
        Command::Model { alias, model } => ctx.model(&alias, &model),
        Command::Init { shell } => {
            ctx.out.write_all(hook::render(shell).as_bytes())?;
            Ok(())
        }
    }
}

struct Context<'a> {
    activator: Activator,
    shell: ShellEnv,
    pid: u32,
    out: &'a mut dyn Write,
    err: &'a mut dyn Write,
}

impl Context<'_> {
    fn manager(&self) -> &ConfigManager {
        self.activator.manager()
    }

    fn switch(&mut self, alias: &str, local: bool, model: Option<&str>) -> Result<()> {
        let activation = if local {
            self.activator.switch_local(alias, model, self.pid)?
        } else {
            self.activator.switch_global(alias, model)?
        };

        self.out.write_all(activation.script().as_bytes())?;
        let scope = if local { "this shell only" } else { "global" };
        writeln!(self.err, "Switched to '{}' ({scope})", activation.config.alias)?;
        Ok(())
    }

    fn add(&mut self, alias: String, fields: FieldArgs) -> Result<()> {
        let config = ApiConfig {
            alias,
            provider: fields.provider.unwrap_or_default(),
            api_key: fields.api_key.unwrap_or_default(),
            auth_token: fields.auth_token.unwrap_or_default(),
            base_url: fields.base_url.unwrap_or_default(),
            model: fields.model.unwrap_or_default(),
            models: fields.models.unwrap_or_default(),
        };
        let stored = self.manager().add(config)?;
        writeln!(self.err, "Added '{}'", stored.alias)?;
        Ok(())
    }

    fn edit(&mut self, alias: &str, fields: FieldArgs, rename: Option<String>) -> Result<()> {
        let patch = ConfigPatch {
            provider: fields.provider,
            api_key: fields.api_key,
            auth_token: fields.auth_token,
            base_url: fields.base_url,
            model: fields.model,
            models: fields.models.map(clear_if_blank),
            alias: rename,
        };
        if patch.is_empty() {
            bail!("nothing to change for '{alias}'; pass at least one field");
        }

        let outcome = self.manager().edit(alias, &patch)?;
        let current = outcome.config.alias;
        if let Some(update) = &outcome.models {
            self.report_fallback(&current, update)?;
        }

        self.activator.refresh_after_change(&current, false);
        writeln!(self.err, "Updated '{current}'")?;
        self.emit_if_shell_active(alias, &current)
    }

    fn remove(&mut self, alias: &str) -> Result<()> {
        let was_active = self.manager().remove(alias)?;
        self.activator.refresh_after_change(alias, was_active);

        if was_active {
            writeln!(self.err, "Removed '{alias}' (was the global active configuration)")?;
        } else {
            writeln!(self.err, "Removed '{alias}'")?;
        }
        if self.shell.active_alias() == Some(alias) {
            self.out.write_all(render_unset_all().as_bytes())?;
        }
        Ok(())
    }

    fn list(&mut self) -> Result<()> {
        let doc = self.manager().load()?;
        if doc.configs.is_empty() {
            writeln!(self.err, "No configurations. Add one with `apimgr add <alias> --api-key <key>`.")?;
            return Ok(());
        }

        let shell_alias = self.shell.active_alias().map(str::to_string);
        for config in &doc.configs {
            let global = if config.alias == doc.active { '*' } else { ' ' };
            let here = if shell_alias.as_deref() == Some(config.alias.as_str()) {
                '>'
            } else {
                ' '
            };
            writeln!(self.err, "{global}{here} {}", describe(config))?;
        }
        writeln!(self.err, "\n* global active   > active in this shell")?;
        Ok(())
    }

    fn status(&mut self) -> Result<()> {
        let doc = self.manager().load()?;
        let global = if doc.active.is_empty() {
            "(none)"
        } else {
            doc.active.as_str()
        };
        writeln!(self.err, "Global active:  {global}")?;

        let local = self.activator.sessions().marker(self.pid);
        match (self.shell.active_alias(), local) {
            (_, Some(marker)) => {
                writeln!(self.err, "This shell:     {} (local override)", marker.alias)?
            }
            (Some(alias), None) => writeln!(self.err, "This shell:     {alias}")?,
            (None, None) => writeln!(self.err, "This shell:     (nothing loaded)")?,
        }

        let sessions = self.activator.sessions().active_sessions()?;
        writeln!(self.err, "Local sessions: {}", sessions.len())?;
        for marker in &sessions {
            writeln!(self.err, "  pid {:<8} {}", marker.pid, marker.alias)?;
        }

        writeln!(self.err, "Environment:")?;
        for var in RECOGNIZED_VARS {
            let value = match self.shell.get(var) {
                Some(value) if var == API_KEY_VAR || var == AUTH_TOKEN_VAR => mask(value),
                Some(value) => value.to_string(),
                None => "(unset)".to_string(),
            };
            writeln!(self.err, "  {var:<22} {value}")?;
        }
        Ok(())
    }

    fn load_active(&mut self) -> Result<()> {
        let script = self.activator.load_active()?;
        self.out.write_all(script.as_bytes())?;
        Ok(())
    }

    fn cleanup_session(&mut self, pid: u32) -> Result<()> {
        if self.activator.cleanup_session(pid)? {
            tracing::info!(pid, "Last local session ended, settings restored to global");
        }
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        let outcome = self
            .activator
            .resync()
            .context("failed to sync global configuration")?;
        match outcome {
            SyncOutcome::Updated => writeln!(
                self.err,
                "Synced {}",
                self.activator.sync_engine().path().display()
            )?,
            SyncOutcome::Skipped => writeln!(
                self.err,
                "{} not found; regenerated {} only",
                self.activator.sync_engine().path().display(),
                self.activator.script_generator().path().display()
            )?,
        }
        Ok(())
    }

    fn models(&mut self, alias: &str, models: Vec<String>) -> Result<()> {
        let update = self.manager().set_models(alias, clear_if_blank(models))?;
        self.report_fallback(alias, &update)?;
        self.activator.refresh_after_change(alias, false);
        writeln!(self.err, "Updated models for '{alias}'")?;
        self.emit_if_shell_active(alias, alias)
    }

    fn model(&mut self, alias: &str, model: &str) -> Result<()> {
        let config = self.manager().switch_model(alias, model)?;
        self.activator.refresh_after_change(alias, false);
        writeln!(self.err, "Model for '{alias}' set to '{}'", config.model)?;
        self.emit_if_shell_active(alias, alias)
    }

    fn report_fallback(&mut self, alias: &str, update: &ModelsUpdate) -> Result<()> {
        if !update.fell_back {
            return Ok(());
        }
        if update.current.is_empty() {
            writeln!(
                self.err,
                "warning: '{alias}' model '{}' cleared with the model list",
                update.previous
            )?;
        } else if update.previous.is_empty() {
            writeln!(self.err, "note: '{alias}' model set to '{}'", update.current)?;
        } else {
            writeln!(
                self.err,
                "warning: '{alias}' model '{}' is not in the new list; now using '{}'",
                update.previous, update.current
            )?;
        }
        Ok(())
    }

    /// Re-export `current` when this shell had `previous` loaded.
    fn emit_if_shell_active(&mut self, previous: &str, current: &str) -> Result<()> {
        if self.shell.active_alias() != Some(previous) {
            return Ok(());
        }
        let config = self.manager().get(current)?;
        let env = EnvSet::for_config(&config).with_active_alias(&config.alias);
        self.out.write_all(render_script(&env).as_bytes())?;
        Ok(())
    }
}

/// `--models ""` means "no list".
fn clear_if_blank(models: Vec<String>) -> Vec<String> {
    if models.iter().all(|m| m.trim().is_empty()) {
        Vec::new()
    } else {
        models
    }
}

fn describe(config: &ApiConfig) -> String {
    let provider = match providers::lookup(&config.provider) {
        Some(def) => def.label.to_string(),
        None if config.provider.is_empty() => "-".to_string(),
        None => config.provider.clone(),
    };
    let auth = match config.credential() {
        Some((method, secret)) => format!("{}={}", method.label(), secret.masked()),
        None => "no credentials".to_string(),
    };
    let base_url = if config.base_url.is_empty() {
        "(default)"
    } else {
        config.base_url.as_str()
    };
    let model = if config.model.is_empty() {
        "-"
    } else {
        config.model.as_str()
    };

    let mut line = format!(
        "{:<16} {:<14} {:<40} model={model} {auth}",
        config.alias, provider, base_url
    );
    if config.models.len() > 1 {
        line.push_str(&format!(" ({} models)", config.models.len()));
    }
    line
}
