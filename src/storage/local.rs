//! Local filesystem storage implementation.
//!
//! Transients are one JSON file each under `transients/`; options live in a
//! single `options.json`. Every write goes to a temp file first and is
//! renamed into place.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::storage::{CacheEntry, OptionStore, TransientStore};

const TRANSIENT_DIR: &str = "transients";
const OPTIONS_FILE: &str = "options.json";

type Options = BTreeMap<String, String>;

/// Local filesystem storage backend.
#[derive(Debug)]
pub struct LocalStore {
    root_dir: PathBuf,
    /// Serializes read-modify-write of `options.json` within this process
    options_lock: Mutex<()>,
}

impl LocalStore {
    /// Create a new LocalStore rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            options_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    fn transient_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(AppError::storage(format!("invalid transient key: {key:?}")));
        }
        Ok(self.path(&format!("{TRANSIENT_DIR}/{key}.json")))
    }

    /// Ensure parent directory exists.
    fn ensure_dir(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
        Self::ensure_dir(path)?;

        let tmp = path.with_extension("tmp");
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.flush()?;
        drop(file);

        fs::rename(&tmp, path)?;
        Ok(())
    }

    fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        Self::write_bytes(path, &bytes)
    }

    /// Read bytes, returning None if file doesn't exist.
    fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
        match Self::read_bytes(path)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn remove(path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    fn load_options(&self) -> Result<Options> {
        Ok(Self::read_json(&self.path(OPTIONS_FILE))?.unwrap_or_default())
    }

    fn update_options(&self, update: impl FnOnce(&mut Options)) -> Result<()> {
        let _guard = self
            .options_lock
            .lock()
            .map_err(|_| AppError::storage("options lock poisoned"))?;

        let mut options = self.load_options()?;
        update(&mut options);
        Self::write_json(&self.path(OPTIONS_FILE), &options)
    }
}

impl TransientStore for LocalStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let path = self.transient_path(key)?;
        match Self::read_json::<CacheEntry>(&path)? {
            Some(entry) if entry.is_expired() => {
                log::debug!("Transient {} expired", key);
                Self::remove(&path)?;
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value)),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &Value, ttl: Duration) -> Result<()> {
        let path = self.transient_path(key)?;
        Self::write_json(&path, &CacheEntry::new(value.clone(), ttl))
    }

    fn delete(&self, key: &str) -> Result<()> {
        Self::remove(&self.transient_path(key)?)
    }

    fn purge(&self, prefix: &str) -> Result<usize> {
        let dir = self.path(TRANSIENT_DIR);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut removed = 0;
        for entry in entries {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with(prefix) && name.ends_with(".json") {
                Self::remove(&path)?;
                removed += 1;
            }
        }

        log::info!("Purged {} transients from {}", removed, dir.display());
        Ok(removed)
    }
}

impl OptionStore for LocalStore {
    fn get_option(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load_options()?.remove(key))
    }

    fn set_option(&self, key: &str, value: &str) -> Result<()> {
        self.update_options(|options| {
            options.insert(key.to_string(), value.to_string());
        })
    }

    fn delete_option(&self, key: &str) -> Result<()> {
        self.update_options(|options| {
            options.remove(key);
        })
    }
}
