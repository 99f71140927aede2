/// Wizard state persistence
///
/// Saves, loads and clears the stepper state under a single well-known key
/// of a key-value store.
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::state::{Payload, StepperState};
use crate::error::PersistenceError;

/// Key under which the state blob is stored
pub const STORAGE_KEY: &str = "stepperState";

/// Durable key-value store
pub trait StateStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError>;

    /// Removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}

/// File-backed storage, one `<key>.json` file per key
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Storage in the platform data directory
    pub fn in_data_dir() -> Result<Self, PersistenceError> {
        dirs::data_dir()
            .map(|dir| Self::new(dir.join("stepper-state")))
            .ok_or(PersistenceError::NoStorageDirectory)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> PersistenceError {
    PersistenceError::Io {
        path: path.display().to_string(),
        source,
    }
}

impl StateStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir).map_err(|e| io_error(&self.dir, e))?;

        let path = self.path_for(key);
        fs::write(&path, value).map_err(|e| io_error(&path, e))
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!("Deleted stepper state file: {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&path, e)),
        }
    }
}

/// In-process storage for tests and ephemeral sessions
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }
}

impl StateStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Serializes stepper state into a [`StateStorage`]
#[derive(Clone)]
pub struct StatePersistence {
    storage: Arc<dyn StateStorage>,
}

impl StatePersistence {
    pub fn new(storage: Arc<dyn StateStorage>) -> Self {
        Self { storage }
    }

    /// Save stepper state
    pub fn save<P: Payload>(&self, state: &StepperState<P>) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(state)?;
        self.storage.set(STORAGE_KEY, &json)?;

        tracing::debug!(
            steps = state.steps.len(),
            errors = state.errors.len(),
            "Saved stepper state"
        );
        Ok(())
    }

    /// Load stepper state, `None` when nothing is stored
    pub fn load<P: Payload>(&self) -> Result<Option<StepperState<P>>, PersistenceError> {
        let Some(json) = self.storage.get(STORAGE_KEY)? else {
            tracing::debug!("No stepper state found, starting fresh");
            return Ok(None);
        };

        let state: StepperState<P> = serde_json::from_str(&json)?;
        tracing::debug!(steps = state.steps.len(), "Loaded stepper state");
        Ok(Some(state))
    }

    /// Remove the stored state
    pub fn clear(&self) -> Result<(), PersistenceError> {
        self.storage.remove(STORAGE_KEY)
    }
}

impl std::fmt::Debug for StatePersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatePersistence")
            .field("key", &STORAGE_KEY)
            .finish_non_exhaustive()
    }
}
