//! Persistence of the shared key between sessions.

use crate::error::key_store::KeyStoreError;

use common::{ErrorLocation, RedactedSharedKey};

use std::io::ErrorKind;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::{debug, info};

const KEY_FILE_NAME: &str = "shared_key";

pub trait SharedKeyStore: Send {
    /// `Ok(None)` when no handshake has completed yet.
    fn retrieve(&self) -> Result<Option<RedactedSharedKey>, KeyStoreError>;

    fn save(&mut self, key: &RedactedSharedKey) -> Result<(), KeyStoreError>;

    fn clean(&mut self) -> Result<(), KeyStoreError>;
}

/// Stores the Base64 key as `{dir}/shared_key`, readable only by its owner.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    dir: PathBuf,
}

impl FileKeyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(KEY_FILE_NAME)
    }
}

impl SharedKeyStore for FileKeyStore {
    fn retrieve(&self) -> Result<Option<RedactedSharedKey>, KeyStoreError> {
        let path = self.path();

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(KeyStoreError::Read {
                    location: ErrorLocation::from(Location::caller()),
                    path,
                    source: e,
                });
            }
        };

        let key = RedactedSharedKey::new(contents.trim().to_string());
        if key.is_empty() {
            return Err(KeyStoreError::Corrupted {
                location: ErrorLocation::from(Location::caller()),
                reason: format!("{} is empty", path.display()),
            });
        }

        Ok(Some(key))
    }

    fn save(&mut self, key: &RedactedSharedKey) -> Result<(), KeyStoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| KeyStoreError::Write {
            location: ErrorLocation::from(Location::caller()),
            path: self.dir.clone(),
            source: e,
        })?;

        let path = self.path();
        let temp_path = self.dir.join(format!("{KEY_FILE_NAME}.tmp"));

        write_private(&temp_path, key.as_base64().as_bytes()).map_err(|e| {
            KeyStoreError::Write {
                location: ErrorLocation::from(Location::caller()),
                path: temp_path.clone(),
                source: e,
            }
        })?;

        std::fs::rename(&temp_path, &path).map_err(|e| KeyStoreError::Write {
            location: ErrorLocation::from(Location::caller()),
            path: path.clone(),
            source: e,
        })?;

        info!("Shared key saved to {}", path.display());
        Ok(())
    }

    fn clean(&mut self) -> Result<(), KeyStoreError> {
        let path = self.path();

        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!("Shared key removed from {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No shared key to remove at {}", path.display());
                Ok(())
            }
            Err(e) => Err(KeyStoreError::Write {
                location: ErrorLocation::from(Location::caller()),
                path,
                source: e,
            }),
        }
    }
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, contents)
}

/// In-memory store. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyStore {
    key: Arc<Mutex<Option<RedactedSharedKey>>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(key: RedactedSharedKey) -> Self {
        Self {
            key: Arc::new(Mutex::new(Some(key))),
        }
    }

    pub fn current(&self) -> Option<RedactedSharedKey> {
        self.key.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl SharedKeyStore for MemoryKeyStore {
    fn retrieve(&self) -> Result<Option<RedactedSharedKey>, KeyStoreError> {
        Ok(self.current())
    }

    fn save(&mut self, key: &RedactedSharedKey) -> Result<(), KeyStoreError> {
        *self.key.lock().unwrap_or_else(|e| e.into_inner()) = Some(key.clone());
        Ok(())
    }

    fn clean(&mut self) -> Result<(), KeyStoreError> {
        *self.key.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}
