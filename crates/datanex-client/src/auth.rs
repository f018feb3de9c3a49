//! Authentication primitives for outbound requests.
//!
//! # Design
//! - The token lives behind [`TokenStore`] so callers decide where it persists.
//! - Empty or whitespace tokens are treated as absent.
//! - Expiry is surfaced through [`LoginRedirect`]; the client never prompts itself.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

/// Errors raised while persisting or clearing a token.
#[derive(Debug, Error)]
pub enum TokenStoreError {
    /// Filesystem access failed.
    #[error("token store io failure")]
    Io {
        /// Operation that failed.
        operation: &'static str,
        /// Token file involved.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
}

/// Persistent client-side storage for the bearer token.
pub trait TokenStore: Send + Sync {
    /// Current token, if one is stored.
    fn load(&self) -> Option<String>;

    /// Replace the stored token.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing storage cannot be written.
    fn save(&self, token: &str) -> Result<(), TokenStoreError>;

    /// Remove the stored token. Clearing an empty store succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing storage cannot be modified.
    fn clear(&self) -> Result<(), TokenStoreError>;
}

/// Login boundary notified when the service rejects the stored credentials.
pub trait LoginRedirect: Send + Sync {
    /// Send the user to the login boundary.
    fn redirect_to_login(&self);
}

/// Token store that only lives for the current process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    /// Store seeded with `token`.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        let guard = self.token.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.as_deref().and_then(normalise)
    }

    fn save(&self, token: &str) -> Result<(), TokenStoreError> {
        let mut guard = self.token.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        let mut guard = self.token.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = None;
        Ok(())
    }
}

/// Token store backed by a single file on disk.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Store that reads and writes `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the token file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<String> {
        let raw = fs::read_to_string(&self.path).ok()?;
        normalise(&raw)
    }

    fn save(&self, token: &str) -> Result<(), TokenStoreError> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| TokenStoreError::Io {
                operation: "token.create_dir",
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&self.path, token.trim()).map_err(|source| TokenStoreError::Io {
            operation: "token.write",
            path: self.path.clone(),
            source,
        })
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(TokenStoreError::Io {
                operation: "token.remove",
                path: self.path.clone(),
                source,
            }),
        }
    }
}

fn normalise(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips_and_clears() {
        let store = MemoryTokenStore::default();
        assert!(store.load().is_none());
        store.save("abc").expect("save");
        assert_eq!(store.load().as_deref(), Some("abc"));
        store.clear().expect("clear");
        assert!(store.load().is_none());
    }

    #[test]
    fn blank_tokens_count_as_absent() {
        let store = MemoryTokenStore::with_token("   ");
        assert!(store.load().is_none());
    }

    #[test]
    fn file_store_persists_between_instances() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("token");
        FileTokenStore::new(&path).save(" secret \n").expect("save");

        let reopened = FileTokenStore::new(&path);
        assert_eq!(reopened.load().as_deref(), Some("secret"));
        reopened.clear().expect("clear");
        assert!(!path.exists());
        reopened.clear().expect("clearing twice is fine");
    }
}
