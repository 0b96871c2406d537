//! Shell script rendering and the generated `active.env`.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::config::store::write_private;
use crate::config::{ConfigError, ConfigManager, Paths};
use crate::env::builder::{EnvSet, RECOGNIZED_VARS};

/// `unset` for every recognized variable.
pub fn render_unset_all() -> String {
    let mut out = String::new();
    for var in RECOGNIZED_VARS {
        let _ = writeln!(out, "unset {var}");
    }
    out
}

/// `unset` for every recognized variable, then `export` for each entry of `env`.
pub fn render_script(env: &EnvSet) -> String {
    let mut out = render_unset_all();
    for (var, value) in env.vars() {
        let _ = writeln!(out, "export {var}=\"{}\"", quote(value));
    }
    out
}

/// Escape for the inside of a double-quoted POSIX shell string.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '"' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Writes `active.env`, mirroring the global active configuration.
///
/// Only global activation paths call this; session-local switches never
/// touch the file.
#[derive(Debug, Clone)]
pub struct ScriptGenerator {
    manager: ConfigManager,
    path: PathBuf,
}

impl ScriptGenerator {
    pub fn new(manager: ConfigManager, paths: &Paths) -> Self {
        Self {
            manager,
            path: paths.script_file(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Script text for the current global state.
    pub fn render(&self) -> Result<String, ConfigError> {
        match self.manager.get_active() {
            Ok(config) => Ok(render_script(
                &EnvSet::for_config(&config).with_active_alias(&config.alias),
            )),
            Err(ConfigError::NoActiveConfig) => Ok(render_unset_all()),
            Err(e) => Err(e),
        }
    }

    /// Regenerate the file atomically.
    pub fn generate(&self) -> Result<(), ConfigError> {
        let script = self.render()?;
        write_private(&self.path, script.as_bytes())?;
        tracing::debug!(path = %self.path.display(), "Activation script written");
        Ok(())
    }
}
