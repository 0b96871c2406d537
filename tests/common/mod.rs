//! Shared test utilities.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use apimgr::activation::Activator;
use apimgr::config::{ApiConfig, ConfigManager, Paths, Store};
use serde_json::Value;
use tempfile::TempDir;

/// Isolated config dir plus a settings file location next to it.
pub struct TestEnv {
    pub dir: TempDir,
    pub paths: Paths,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let paths = Paths::new(
            dir.path().join("apimgr"),
            dir.path().join("claude").join("settings.json"),
        );
        Self { dir, paths }
    }

    pub fn manager(&self) -> ConfigManager {
        ConfigManager::new(Store::new(&self.paths))
    }

    pub fn activator(&self) -> Activator {
        Activator::new(self.manager(), &self.paths)
    }

    /// Create the external settings file with `content`.
    pub fn write_settings(&self, content: &str) {
        let path = self.paths.settings_file();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    pub fn read_settings(&self) -> Value {
        read_json(self.paths.settings_file())
    }

    pub fn read_script(&self) -> Option<String> {
        fs::read_to_string(self.paths.script_file()).ok()
    }
}

pub fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

/// Two configurations, neither active.
pub fn seed(manager: &ConfigManager) {
    manager
        .add(
            ApiConfig::new("work")
                .with_api_key("sk-work")
                .with_base_url("https://api.work.example")
                .with_models(["w1", "w2"]),
        )
        .unwrap();
    manager
        .add(
            ApiConfig::new("home")
                .with_auth_token("tok-home")
                .with_model("h1"),
        )
        .unwrap();
}

/// Pid of a process that has already exited.
pub fn dead_pid() -> u32 {
    let mut child = std::process::Command::new("true").spawn().unwrap();
    let pid = child.id();
    child.wait().unwrap();
    pid
}
