use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::debug;

use super::model::Settings;

/// Errors raised by a settings backend.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Failed to access settings file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to encode settings: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to decode settings file {0}: {1}")]
    Decode(PathBuf, #[source] serde_json::Error),

    #[error("Settings backend unavailable: {0}")]
    Unavailable(String),
}

/// Durable storage for the settings record.
///
/// Implementations replace the whole record on `store`; a concurrent `load` sees either the old or
/// the new record, never a mix.
#[async_trait]
pub trait SettingsBackend: Send + Sync {
    /// Load the persisted record, or `None` if nothing was ever written.
    async fn load(&self) -> Result<Option<Settings>, PersistenceError>;

    /// Persist the record as a unit.
    async fn store(&self, settings: &Settings) -> Result<(), PersistenceError>;
}

/// JSON document on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write to a temporary file next to the target, then rename it over the target.
    fn replace_atomically(path: &Path, contents: &[u8]) -> Result<(), PersistenceError> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| PersistenceError::Io(dir.clone(), e))?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| PersistenceError::Io(dir, e))?;
        tmp.write_all(contents)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| PersistenceError::Io(tmp.path().to_path_buf(), e))?;
        tmp.persist(path)
            .map_err(|e| PersistenceError::Io(path.to_path_buf(), e.error))?;

        Ok(())
    }
}

#[async_trait]
impl SettingsBackend for FileBackend {
    async fn load(&self) -> Result<Option<Settings>, PersistenceError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings file at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(PersistenceError::Io(self.path.clone(), e)),
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| PersistenceError::Decode(self.path.clone(), e))
    }

    async fn store(&self, settings: &Settings) -> Result<(), PersistenceError> {
        let contents = serde_json::to_vec_pretty(settings).map_err(PersistenceError::Encode)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || Self::replace_atomically(&path, &contents))
            .await
            .map_err(|e| PersistenceError::Io(self.path.clone(), std::io::Error::other(e)))??;

        debug!("Persisted settings to {}", self.path.display());
        Ok(())
    }
}

/// In-process backend. Nothing survives a restart.
///
/// Loads and stores can be made to fail on demand, which is how storage outages are simulated.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    record: Mutex<Option<Settings>>,
    fail_loads: AtomicBool,
    fail_stores: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            record: Mutex::new(Some(settings)),
            ..Self::default()
        }
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_stores(&self, fail: bool) {
        self.fail_stores.store(fail, Ordering::SeqCst);
    }

    /// The record as currently stored, bypassing failure injection.
    pub fn stored(&self) -> Option<Settings> {
        self.record.lock().ok().and_then(|record| record.clone())
    }
}

#[async_trait]
impl SettingsBackend for MemoryBackend {
    async fn load(&self) -> Result<Option<Settings>, PersistenceError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable("load failure injected".to_string()));
        }

        let record = self
            .record
            .lock()
            .map_err(|e| PersistenceError::Unavailable(e.to_string()))?;
        Ok(record.clone())
    }

    async fn store(&self, settings: &Settings) -> Result<(), PersistenceError> {
        if self.fail_stores.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable("store failure injected".to_string()));
        }

        let mut record = self
            .record
            .lock()
            .map_err(|e| PersistenceError::Unavailable(e.to_string()))?;
        *record = Some(settings.clone());
        Ok(())
    }
}
