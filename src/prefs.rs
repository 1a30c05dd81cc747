//! Small local key/value preference storage.
//!
//! Values are strings persisted together as one JSON object file. Typed
//! values go through `load_json`/`save_json`.
//!
//! TRADE-OFFS
//! ==========
//! Preferences are best-effort: a missing, unreadable or corrupt file yields
//! empty preferences, and failed writes are logged and otherwise ignored.
//! Callers never see an error.

#[cfg(test)]
#[path = "prefs_test.rs"]
mod prefs_test;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct LocalPrefs {
    /// `None` keeps everything in memory.
    path: Option<PathBuf>,
    values: BTreeMap<String, String>,
}

impl LocalPrefs {
    /// Preferences backed by the JSON file at `path`.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = read_file(&path);
        Self { path: Some(path), values }
    }

    /// Preferences that are never written to disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
        self.flush();
    }

    pub fn remove(&mut self, key: &str) {
        if self.values.remove(key).is_some() {
            self.flush();
        }
    }

    /// Load a JSON value stored under `key`.
    #[must_use]
    pub fn load_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key)?;
        match serde_json::from_str(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(key, error = %e, "ignoring unparsable preference");
                None
            }
        }
    }

    /// Save a JSON value under `key`.
    pub fn save_json<T: Serialize>(&mut self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => self.set(key, raw),
            Err(e) => warn!(key, error = %e, "preference not serializable"),
        }
    }

    fn flush(&self) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(e) = write_file(path, &self.values) {
            warn!(path = %path.display(), error = %e, "failed to persist preferences");
        }
    }
}

fn read_file(path: &Path) -> BTreeMap<String, String> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read preferences");
            return BTreeMap::new();
        }
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "corrupt preferences file; starting empty");
        BTreeMap::new()
    })
}

fn write_file(path: &Path, values: &BTreeMap<String, String>) -> std::io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let raw = serde_json::to_string_pretty(values).map_err(std::io::Error::other)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, raw)?;
    fs::rename(&tmp, path)
}
