use super::traits::SelectionStore;
use crate::error::{Result, StudioError};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

/// Keeps every key in one JSON object on disk. Each write rewrites the file.
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn read_raw(&self) -> Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StudioError::StorageError(format!(
                "cannot read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn parse(&self, raw: &[u8]) -> Result<BTreeMap<String, String>> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(BTreeMap::new());
        }
        serde_json::from_slice(raw).map_err(|e| {
            StudioError::StorageError(format!(
                "{} is not a valid state file: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        match self.read_raw()? {
            Some(raw) => self.parse(&raw),
            None => Ok(BTreeMap::new()),
        }
    }

    /// A corrupt file reads as empty so the next write replaces it.
    fn read_for_update(&self) -> Result<BTreeMap<String, String>> {
        let raw = match self.read_raw()? {
            Some(raw) => raw,
            None => return Ok(BTreeMap::new()),
        };
        Ok(self.parse(&raw).unwrap_or_else(|e| {
            log::warn!("Replacing unreadable studio state: {}", e);
            BTreeMap::new()
        }))
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StudioError::StorageError(e.to_string()))?;
        }
        let raw = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, raw).map_err(|e| StudioError::StorageError(e.to_string()))
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|e| StudioError::StorageError(e.to_string()))
    }
}

impl SelectionStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.guard()?;
        Ok(self.read_all()?.remove(key))
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.guard()?;
        let mut values = self.read_for_update()?;
        values.insert(key.to_string(), value.to_string());
        self.write_all(&values)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.guard()?;
        let mut values = self.read_for_update()?;
        if values.remove(key).is_some() {
            self.write_all(&values)?;
        }
        Ok(())
    }
}
