//! File locations used by a single invocation.

use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const LOCK_FILE_NAME: &str = "config.json.lock";
pub const SCRIPT_FILE_NAME: &str = "active.env";
pub const SESSION_PREFIX: &str = "session-";

/// Overrides the config directory.
pub const HOME_ENV: &str = "APIMGR_HOME";
/// Overrides the external settings file location.
pub const SETTINGS_ENV: &str = "APIMGR_CLAUDE_SETTINGS";

/// Resolved locations of every file the tool touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    config_dir: PathBuf,
    settings_file: PathBuf,
}

impl Paths {
    pub fn new(config_dir: impl Into<PathBuf>, settings_file: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            settings_file: settings_file.into(),
        }
    }

    /// Resolve locations, preferring explicit overrides over platform defaults.
    ///
    /// The config dir is `~/.config/apimgr` on Linux (via `dirs::config_dir()`),
    /// falling back to `./.apimgr` if no config dir is available.
    pub fn resolve(config_dir: Option<PathBuf>, settings_file: Option<PathBuf>) -> Self {
        let config_dir = config_dir.unwrap_or_else(default_config_dir);
        let settings_file = settings_file.unwrap_or_else(default_settings_file);
        Self::new(config_dir, settings_file)
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    pub fn lock_file(&self) -> PathBuf {
        self.config_dir.join(LOCK_FILE_NAME)
    }

    pub fn script_file(&self) -> PathBuf {
        self.config_dir.join(SCRIPT_FILE_NAME)
    }

    pub fn session_file(&self, pid: u32) -> PathBuf {
        self.config_dir.join(format!("{SESSION_PREFIX}{pid}"))
    }

    /// External tool settings document (Claude's `settings.json`).
    pub fn settings_file(&self) -> &Path {
        &self.settings_file
    }
}

fn default_config_dir() -> PathBuf {
    match dirs::config_dir() {
        Some(dir) => dir.join("apimgr"),
        None => PathBuf::from(".apimgr"),
    }
}

fn default_settings_file() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".claude").join("settings.json")
}
