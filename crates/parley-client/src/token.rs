//! Bearer token persistence.
//!
//! The token is the only durable client-local state. It lives under one
//! well-known key ([`TOKEN_KEY`]); an absent token reads as `None` and logout
//! clears the key. [`FileTokenStore`] backs the key with a file for durable
//! sessions, [`MemoryTokenStore`] keeps it in memory for tests.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Mutex,
};

use thiserror::Error;

/// Well-known key for the session bearer token.
pub const TOKEN_KEY: &str = "access_token";

/// Errors from token persistence.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Underlying filesystem failure
    #[error("token store I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Storage for the session bearer token.
pub trait TokenStore {
    /// Read the stored token. `None` if no token has been stored.
    fn load(&self) -> Result<Option<String>, TokenError>;

    /// Store a token, replacing any previous one.
    fn store(&self, token: &str) -> Result<(), TokenError>;

    /// Remove the stored token. Succeeds when no token exists.
    fn clear(&self) -> Result<(), TokenError>;
}

/// In-memory token store for tests and short-lived sessions.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, TokenError> {
        let slot = self.slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(slot.clone())
    }

    fn store(&self, token: &str) -> Result<(), TokenError> {
        let mut slot = self.slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *slot = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenError> {
        let mut slot = self.slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *slot = None;
        Ok(())
    }
}

/// File-backed token store.
///
/// The token is written verbatim to a single file. Reads trim surrounding
/// whitespace so a trailing newline from manual edits does not corrupt the
/// bearer header.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Store the token at an explicit path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store the token under [`TOKEN_KEY`] inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self { path: dir.as_ref().join(TOKEN_KEY) }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, TokenError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => {
                let token = raw.trim();
                if token.is_empty() { Ok(None) } else { Ok(Some(token.to_string())) }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn store(&self, token: &str) -> Result<(), TokenError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
