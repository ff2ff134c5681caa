//! Persisted storage for authentication tokens
//!
//! Two string slots are used: the access token under `"token"` and the
//! refresh token under `"refreshToken"`. No expiry is tracked locally; a stale
//! token is only discovered when a request fails.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Slot holding the access token
pub const ACCESS_TOKEN_KEY: &str = "token";

/// Slot holding the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Token storage error types
#[derive(Debug, thiserror::Error)]
pub enum TokenStoreError {
    #[error("Failed to access token file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Token file is corrupted: {0}")]
    Corrupted(#[from] serde_json::Error),

    #[error("Browser storage unavailable: {0}")]
    Unavailable(String),
}

/// Access token plus optional refresh token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
        }
    }
}

/// Key/value holder for the two token slots
///
/// Access is synchronous. Implementations must keep values across process
/// restarts unless they are explicitly documented as in-memory only.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), TokenStoreError>;

    fn clear(&self, key: &str) -> Result<(), TokenStoreError>;

    /// Current access token, if any
    fn access_token(&self) -> Option<String> {
        self.get(ACCESS_TOKEN_KEY)
    }

    /// Current refresh token, if any
    fn refresh_token(&self) -> Option<String> {
        self.get(REFRESH_TOKEN_KEY)
    }

    /// Persist a token pair
    ///
    /// A pair without a refresh token leaves the stored refresh token as is,
    /// matching refresh responses that only rotate the access token.
    fn store_pair(&self, pair: &TokenPair) -> Result<(), TokenStoreError> {
        self.set(ACCESS_TOKEN_KEY, &pair.access_token)?;
        if let Some(refresh) = &pair.refresh_token {
            self.set(REFRESH_TOKEN_KEY, refresh)?;
        }
        Ok(())
    }

    /// Replace both slots with a freshly issued pair
    ///
    /// Unlike [`TokenStore::store_pair`], a missing refresh token clears the
    /// slot so a previous account's refresh token never outlives a new login.
    fn replace_pair(&self, pair: &TokenPair) -> Result<(), TokenStoreError> {
        self.set(ACCESS_TOKEN_KEY, &pair.access_token)?;
        match &pair.refresh_token {
            Some(refresh) => self.set(REFRESH_TOKEN_KEY, refresh),
            None => self.clear(REFRESH_TOKEN_KEY),
        }
    }

    /// Remove both tokens
    fn clear_all(&self) -> Result<(), TokenStoreError> {
        self.clear(ACCESS_TOKEN_KEY)?;
        self.clear(REFRESH_TOKEN_KEY)
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Process-local store; contents are lost on exit
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slots: DashMap<String, String>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        self.slots.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), TokenStoreError> {
        self.slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), TokenStoreError> {
        self.slots.remove(key);
        Ok(())
    }
}

// ============================================================================
// File-backed store
// ============================================================================

/// JSON file store, written through on every change
///
/// The file holds a flat object keyed by slot name, e.g.
/// `{"refreshToken": "...", "token": "..."}`.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    slots: DashMap<String, String>,
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    /// Open the store at `path`, loading existing tokens if the file exists
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, TokenStoreError> {
        let path = path.into();
        let slots = DashMap::new();

        match std::fs::read_to_string(&path) {
            Ok(contents) if !contents.trim().is_empty() => {
                let stored: BTreeMap<String, String> = serde_json::from_str(&contents)?;
                for (key, value) in stored {
                    slots.insert(key, value);
                }
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        Ok(Self {
            path,
            slots,
            write_lock: Mutex::new(()),
        })
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), TokenStoreError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let snapshot: BTreeMap<String, String> = self
            .slots
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&snapshot)?)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        self.slots.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), TokenStoreError> {
        self.slots.insert(key.to_string(), value.to_string());
        self.persist()
    }

    fn clear(&self, key: &str) -> Result<(), TokenStoreError> {
        if self.slots.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }
}

// ============================================================================
// Browser localStorage store
// ============================================================================

/// Store backed by the browser's `localStorage`
#[cfg(feature = "browser")]
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorageTokenStore;

#[cfg(feature = "browser")]
impl LocalStorageTokenStore {
    fn storage() -> Result<web_sys::Storage, TokenStoreError> {
        let window = web_sys::window()
            .ok_or_else(|| TokenStoreError::Unavailable("No window available".into()))?;
        window
            .local_storage()
            .map_err(|_| TokenStoreError::Unavailable("Failed to get localStorage".into()))?
            .ok_or_else(|| TokenStoreError::Unavailable("localStorage not available".into()))
    }
}

#[cfg(feature = "browser")]
impl TokenStore for LocalStorageTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        Self::storage().ok()?.get_item(key).ok()?
    }

    fn set(&self, key: &str, value: &str) -> Result<(), TokenStoreError> {
        Self::storage()?
            .set_item(key, value)
            .map_err(|_| TokenStoreError::Unavailable(format!("Failed to set {}", key)))
    }

    fn clear(&self, key: &str) -> Result<(), TokenStoreError> {
        Self::storage()?
            .remove_item(key)
            .map_err(|_| TokenStoreError::Unavailable(format!("Failed to remove {}", key)))
    }
}
