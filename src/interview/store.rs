use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use super::state::JourneyState;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("progress storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("progress record is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Where a journey keeps its single progress record.
pub trait ProgressStore: Send + Sync {
    fn load(&self) -> Result<Option<JourneyState>, StoreError>;
    fn save(&self, state: &JourneyState) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}

/// Progress kept as a JSON file on the local disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ProgressStore for JsonFileStore {
    fn load(&self) -> Result<Option<JourneyState>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, state: &JourneyState) -> Result<(), StoreError> {
        let raw = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// In-process store holding the serialized record.
#[derive(Debug, Default)]
pub struct MemoryStore {
    raw: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with an arbitrary raw record, valid or not.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Mutex::new(Some(raw.into())),
        }
    }

    pub fn raw(&self) -> Option<String> {
        self.raw.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl ProgressStore for MemoryStore {
    fn load(&self) -> Result<Option<JourneyState>, StoreError> {
        match self.raw() {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn save(&self, state: &JourneyState) -> Result<(), StoreError> {
        let raw = serde_json::to_string(state)?;
        *self.raw.lock().unwrap_or_else(|e| e.into_inner()) = Some(raw);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.raw.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}
