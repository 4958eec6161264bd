use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use thiserror::Error;

/// TokenStoreError
#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("token storage at {path} failed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

// 1. TokenStore Contract
/// TokenStore
///
/// Durable client-side storage for the bearer token, the equivalent of the browser's local
/// storage slot. Implementations hold at most one token.
///
/// `Send + Sync` so the same store can be shared between the session store and the HTTP
/// repository, which reads the token for every request.
pub trait TokenStore: Send + Sync {
    /// Returns the persisted token, if any.
    fn load(&self) -> Result<Option<String>, TokenStoreError>;

    /// Replaces the persisted token.
    fn save(&self, token: &str) -> Result<(), TokenStoreError>;

    /// Forgets the persisted token. Removing an absent token is not an error.
    fn remove(&self) -> Result<(), TokenStoreError>;
}

/// TokenStoreState
///
/// The shared handle passed to every consumer of the token.
pub type TokenStoreState = Arc<dyn TokenStore>;

// 2. File-backed Implementation
/// FileTokenStore
///
/// Keeps the token in a single file, one file per client profile. Parent directories are
/// created on first save so a fresh profile needs no setup.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> TokenStoreError {
        TokenStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, TokenStoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn save(&self, token: &str) -> Result<(), TokenStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        fs::write(&self.path, token).map_err(|e| self.io_error(e))
    }

    fn remove(&self) -> Result<(), TokenStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

// 3. In-memory Implementation
/// MemoryTokenStore
///
/// Process-local token slot. Used by tests and by callers that do not want the token to
/// outlive the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `token`, as if a previous run had saved it.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, TokenStoreError> {
        Ok(self
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, token: &str) -> Result<(), TokenStoreError> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn remove(&self) -> Result<(), TokenStoreError> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }
}
