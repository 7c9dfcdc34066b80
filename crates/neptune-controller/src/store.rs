//! Durable snapshot storage.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use neptune_core::Snapshot;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{ControllerError, ControllerResult};

/// Backend holding the persisted [`Snapshot`].
///
/// Implementations must be cheap enough to call on every state change.
pub trait Store: Send + Sync {
    /// Read the last saved snapshot. Nothing saved yet is an empty snapshot.
    fn load(&self) -> ControllerResult<Snapshot>;

    /// Replace the saved snapshot.
    fn save(&self, snapshot: &Snapshot) -> ControllerResult<()>;
}

/// JSON file store. Writes go through a sibling temp file and a rename.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl Store for JsonFileStore {
    fn load(&self) -> ControllerResult<Snapshot> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no saved state");
                return Ok(Snapshot::default());
            }
            Err(err) => return Err(err.into()),
        };
        serde_json::from_str(&raw).map_err(|err| {
            ControllerError::Store(format!("{}: {err}", self.path.display()))
        })
    }

    fn save(&self, snapshot: &Snapshot) -> ControllerResult<()> {
        let json = serde_json::to_vec_pretty(snapshot)
            .map_err(|err| ControllerError::Store(err.to_string()))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let temp = self.temp_path();
        fs::write(&temp, json)?;
        fs::rename(&temp, &self.path)?;
        Ok(())
    }
}

/// In-memory store for tests and ephemeral hosts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: Mutex<Snapshot>,
    saves: Mutex<usize>,
    fail_writes: bool,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-loaded with `snapshot`.
    #[must_use]
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            ..Self::default()
        }
    }

    /// Create a store whose writes always fail.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    /// Current contents.
    #[must_use]
    pub fn contents(&self) -> Snapshot {
        self.snapshot.lock().clone()
    }

    /// Number of successful saves.
    #[must_use]
    pub fn saves(&self) -> usize {
        *self.saves.lock()
    }
}

impl Store for MemoryStore {
    fn load(&self) -> ControllerResult<Snapshot> {
        Ok(self.snapshot.lock().clone())
    }

    fn save(&self, snapshot: &Snapshot) -> ControllerResult<()> {
        if self.fail_writes {
            return Err(ControllerError::Store("write rejected".into()));
        }
        *self.snapshot.lock() = snapshot.clone();
        *self.saves.lock() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use neptune_core::{ChainId, Fork};

    use super::*;

    fn sample() -> Snapshot {
        Snapshot {
            fork: Some(Fork::new("f1", "Scratch")),
            base_url: Some("http://localhost:1738/".into()),
            chain_id: Some(ChainId::new("0x5")),
            ..Snapshot::default()
        }
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/state.json"));

        store.save(&sample()).unwrap();

        assert_eq!(store.load().unwrap(), sample());
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_corrupt_file_is_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();

        let err = JsonFileStore::new(path).load().unwrap_err();
        assert!(matches!(err, ControllerError::Store(_)));
    }

    #[test]
    fn test_memory_store_counts_saves() {
        let store = MemoryStore::new();
        store.save(&sample()).unwrap();
        store.save(&Snapshot::default()).unwrap();
        assert_eq!(store.saves(), 2);
        assert!(store.contents().is_empty());
    }

    #[test]
    fn test_failing_store_rejects_writes() {
        let store = MemoryStore::failing();
        assert!(store.save(&sample()).is_err());
        assert_eq!(store.saves(), 0);
    }
}
