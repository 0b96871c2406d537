//! Per-shell local overrides.
//!
//! A shell that switches with `--local` gets a `session-<pid>` marker in the
//! config directory. Markers never touch `config.json`; they only record
//! that some terminal is running with a different configuration than the
//! global one. Liveness of the recorded pid decides whether a marker still
//! counts. A reused pid keeps a dead session's marker alive until the new
//! process exits.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::paths::SESSION_PREFIX;
use crate::config::store::write_atomic;
use crate::config::{ConfigError, Paths};

/// Contents of one `session-<pid>` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMarker {
    #[serde(with = "pid_string")]
    pub pid: u32,
    pub alias: String,
}

/// Bookkeeping for session markers.
#[derive(Debug, Clone)]
pub struct SessionTracker {
    paths: Paths,
}

impl SessionTracker {
    pub fn new(paths: &Paths) -> Self {
        Self {
            paths: paths.clone(),
        }
    }

    /// Record that `pid` has `alias` locally active. Overwrites any previous
    /// marker for the same pid.
    pub fn create_marker(&self, pid: u32, alias: &str) -> Result<(), ConfigError> {
        let marker = SessionMarker {
            pid,
            alias: alias.to_string(),
        };
        write_atomic(&self.paths.session_file(pid), &marker)?;
        tracing::info!(pid, alias = %alias, "Local session marker created");
        Ok(())
    }

    /// Delete the marker for `pid`. Missing markers are fine.
    pub fn remove_marker(&self, pid: u32) {
        let path = self.paths.session_file(pid);
        match fs::remove_file(&path) {
            Ok(()) => tracing::debug!(pid, "Session marker removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to remove session marker"
            ),
        }
    }

    /// The marker for `pid`, if one exists and parses.
    pub fn marker(&self, pid: u32) -> Option<SessionMarker> {
        read_marker(&self.paths.session_file(pid))
    }

    /// Whether a marker file exists for `pid`, readable or not.
    pub fn has_marker(&self, pid: u32) -> bool {
        self.paths.session_file(pid).exists()
    }

    /// Markers whose process is still running.
    ///
    /// Markers for dead processes and unreadable marker files are removed
    /// along the way.
    pub fn active_sessions(&self) -> Result<Vec<SessionMarker>, ConfigError> {
        let dir = self.paths.config_dir();
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ConfigError::io(dir, e)),
        };

        let mut live = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ConfigError::io(dir, e))?;
            let Some(pid) = marker_pid(&entry.path()) else {
                continue;
            };

            match read_marker(&entry.path()) {
                Some(marker) if is_process_alive(pid) => live.push(marker),
                Some(marker) => {
                    tracing::info!(pid, alias = %marker.alias, "Reaping stale session marker");
                    self.remove_marker(pid);
                }
                None => {
                    tracing::warn!(path = %entry.path().display(), "Removing unreadable session marker");
                    self.remove_marker(pid);
                }
            }
        }

        live.sort_by_key(|m| m.pid);
        Ok(live)
    }

    /// Whether any other terminal still holds a local override.
    pub fn has_active_sessions(&self) -> Result<bool, ConfigError> {
        Ok(!self.active_sessions()?.is_empty())
    }
}

/// Pid encoded in a `session-<pid>` file name.
fn marker_pid(path: &Path) -> Option<u32> {
    path.file_name()?
        .to_str()?
        .strip_prefix(SESSION_PREFIX)?
        .parse()
        .ok()
}

fn read_marker(path: &Path) -> Option<SessionMarker> {
    let content = fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

/// Whether `pid` names a running process.
///
/// A process we may not signal (`EPERM`) still exists.
#[cfg(unix)]
pub fn is_process_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }
    // SAFETY: signal 0 only performs existence and permission checks.
    let rc = unsafe { libc::kill(pid, 0) };
    if rc == 0 {
        return true;
    }
    io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
pub fn is_process_alive(pid: u32) -> bool {
    pid != 0
}

/// Pid of the shell that invoked us.
#[cfg(unix)]
pub fn parent_pid() -> u32 {
    // SAFETY: getppid has no preconditions and cannot fail.
    let ppid = unsafe { libc::getppid() };
    u32::try_from(ppid).unwrap_or(0)
}

#[cfg(not(unix))]
pub fn parent_pid() -> u32 {
    0
}

/// The on-disk format stores the pid as a string.
mod pid_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(pid: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(pid)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u32),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(pid) => Ok(pid),
            Raw::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
        }
    }
}
