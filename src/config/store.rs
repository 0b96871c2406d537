//! Durable storage for `config.json`.
//!
//! Every invocation is a separate process, so coordination happens through
//! an advisory lock on a sibling lock file. Writers re-read the document
//! under the lock, apply their change, and replace the file by renaming a
//! fully written temp file over it. Readers never see a partial document.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::config::error::ConfigError;
use crate::config::paths::Paths;
use crate::config::types::ConfigFile;

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Lock acquisition tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    pub lock_timeout: Duration,
    pub retry_interval: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

/// File-backed config document with exclusive read-modify-write.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
    lock_path: PathBuf,
    options: StoreOptions,
}

impl Store {
    pub fn new(paths: &Paths) -> Self {
        Self::with_options(paths, StoreOptions::default())
    }

    pub fn with_options(paths: &Paths, options: StoreOptions) -> Self {
        Self {
            path: paths.config_file(),
            lock_path: paths.lock_file(),
            options,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current document without locking.
    ///
    /// A missing (or blank) file is the first-run state and yields an
    /// empty document.
    pub fn load(&self) -> Result<ConfigFile, ConfigError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ConfigFile::default()),
            Err(e) => return Err(ConfigError::io(&self.path, e)),
        };

        if content.trim().is_empty() {
            return Ok(ConfigFile::default());
        }

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Apply `f` to the on-disk document while holding the exclusive lock.
    ///
    /// The document is re-read after the lock is taken. If `f` returns an
    /// error nothing is written.
    pub fn atomic_update<T, F>(&self, f: F) -> Result<T, ConfigError>
    where
        F: FnOnce(&mut ConfigFile) -> Result<T, ConfigError>,
    {
        let _lock = self.acquire_lock()?;

        let mut doc = self.load()?;
        let out = f(&mut doc)?;
        write_atomic(&self.path, &doc)?;
        Ok(out)
    }

    fn acquire_lock(&self) -> Result<LockGuard, ConfigError> {
        ensure_parent_dir(&self.lock_path)?;

        let file = open_private(&self.lock_path)?;
        let started = Instant::now();
        loop {
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => return Ok(LockGuard { file }),
                Err(e) if is_contended(&e) => {
                    if started.elapsed() >= self.options.lock_timeout {
                        return Err(ConfigError::LockTimeout {
                            path: self.lock_path.clone(),
                            timeout: self.options.lock_timeout,
                        });
                    }
                    tracing::debug!(path = %self.lock_path.display(), "Config lock busy, retrying");
                    thread::sleep(self.options.retry_interval);
                }
                Err(e) => return Err(ConfigError::io(&self.lock_path, e)),
            }
        }
    }
}

/// Held for the duration of a read-modify-write.
struct LockGuard {
    file: File,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

fn open_private(path: &Path) -> Result<File, ConfigError> {
    let mut options = OpenOptions::new();
    options.read(true).write(true).create(true).truncate(false);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path).map_err(|e| ConfigError::io(path, e))
}

pub(crate) fn ensure_parent_dir(path: &Path) -> Result<(), ConfigError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))
        }
        _ => Ok(()),
    }
}

/// Serialize `value` as pretty JSON and atomically replace `path`.
pub(crate) fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), ConfigError> {
    let data = to_pretty_json(path, value)?;
    write_private(path, data.as_bytes())
}

/// Write `bytes` to a temp file beside `path` (mode 0600) and rename it over `path`.
pub(crate) fn write_private(path: &Path, bytes: &[u8]) -> Result<(), ConfigError> {
    #[cfg(unix)]
    let permissions = {
        use std::os::unix::fs::PermissionsExt;
        Some(fs::Permissions::from_mode(0o600))
    };
    #[cfg(not(unix))]
    let permissions: Option<fs::Permissions> = None;

    replace_file(path, bytes, permissions)
}

/// Atomically rewrite an existing JSON file that belongs to another tool.
///
/// Symlinks are resolved first so the link stays a link and its target
/// receives the content. The target keeps its current permissions.
pub(crate) fn rewrite_foreign_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ConfigError> {
    let target = fs::canonicalize(path).map_err(|e| ConfigError::io(path, e))?;
    let permissions = fs::metadata(&target)
        .map_err(|e| ConfigError::io(&target, e))?
        .permissions();
    let data = to_pretty_json(&target, value)?;
    replace_file(&target, data.as_bytes(), Some(permissions))
}

fn to_pretty_json<T: Serialize>(path: &Path, value: &T) -> Result<String, ConfigError> {
    let mut data = serde_json::to_string_pretty(value).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    data.push('\n');
    Ok(data)
}

fn replace_file(
    path: &Path,
    bytes: &[u8],
    permissions: Option<fs::Permissions>,
) -> Result<(), ConfigError> {
    ensure_parent_dir(path)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| ConfigError::io(dir, e))?;
    if let Some(permissions) = permissions {
        tmp.as_file()
            .set_permissions(permissions)
            .map_err(|e| ConfigError::io(tmp.path(), e))?;
    }
    tmp.write_all(bytes)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| ConfigError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| ConfigError::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::ApiConfig;
    use std::sync::{Arc, Barrier};
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> Store {
        Store::new(&Paths::new(dir.path(), dir.path().join("settings.json")))
    }

    #[test]
    fn test_load_missing_file_is_empty_document() {
        let dir = TempDir::new().unwrap();
        let doc = store_in(&dir).load().unwrap();
        assert_eq!(doc, ConfigFile::default());
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "{ not json").unwrap();
        assert!(matches!(store.load(), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_update_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let expected = ConfigFile {
            active: "b".to_string(),
            configs: vec![
                ApiConfig::new("a").with_auth_token("tok"),
                ApiConfig::new("b")
                    .with_api_key("sk-b")
                    .with_provider("anthropic")
                    .with_base_url("https://api.anthropic.com")
                    .with_models(["m1", "m2"])
                    .with_model("m2"),
            ],
        };

        let written = expected.clone();
        store
            .atomic_update(move |doc| {
                *doc = written;
                Ok(())
            })
            .unwrap();

        assert_eq!(store.load().unwrap(), expected);
    }

    #[test]
    fn test_failed_update_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let result: Result<(), _> = store.atomic_update(|doc| {
            doc.active = "x".to_string();
            Err(ConfigError::NoActiveConfig)
        });
        assert!(result.is_err());
        assert!(!store.path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_config_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.atomic_update(|_| Ok(())).unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_lock_timeout_when_held_elsewhere() {
        let dir = TempDir::new().unwrap();
        let paths = Paths::new(dir.path(), dir.path().join("settings.json"));
        let store = Store::with_options(
            &paths,
            StoreOptions {
                lock_timeout: Duration::from_millis(100),
                retry_interval: Duration::from_millis(10),
            },
        );

        let holder = open_private(&paths.lock_file()).unwrap();
        FileExt::lock_exclusive(&holder).unwrap();

        let result = store.atomic_update(|doc| {
            doc.active = "never".to_string();
            Ok(())
        });
        assert!(matches!(result, Err(ConfigError::LockTimeout { .. })));
        assert!(!store.path().exists());

        FileExt::unlock(&holder).unwrap();
    }

    #[test]
    fn test_concurrent_writers_do_not_lose_updates() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store
                        .atomic_update(|doc| {
                            doc.configs
                                .push(ApiConfig::new(format!("cfg-{i}")).with_api_key("k"));
                            Ok(())
                        })
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.load().unwrap().configs.len(), 8);
    }
}
