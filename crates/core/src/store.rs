//! Persisted credential storage
//!
//! Credentials live in a flat string key/value store so that the same keys
//! are used by the browser front-ends (`localStorage`) and native tools
//! (a JSON file). [`CredentialStore`] is the typed view the HTTP client uses.

use crate::error::{CoreError, CoreResult};
use crate::identity::{Credentials, UserIdentity};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// Storage keys shared with the browser front-ends
pub mod keys {
    pub const TOKEN: &str = "token";
    pub const REFRESH_TOKEN: &str = "refreshToken";
    pub const USER: &str = "user";
    pub const EXPIRES_AT: &str = "tokenExpiresAt";

    pub const ALL: [&str; 4] = [TOKEN, REFRESH_TOKEN, USER, EXPIRES_AT];
}

/// Minimal string key/value persistence
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> CoreResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> CoreResult<()>;

    /// Remove every key in `keys` as one operation
    fn remove_keys(&self, keys: &[&str]) -> CoreResult<()>;

    /// Write several entries as one operation
    fn set_many(&self, entries: &[(&str, String)]) -> CoreResult<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

/// In-process store, lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> CoreResult<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> CoreResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_keys(&self, keys: &[&str]) -> CoreResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }

    fn set_many(&self, new_entries: &[(&str, String)]) -> CoreResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in new_entries {
            entries.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }
}

/// Typed access to the persisted session
///
/// Read failures are logged and reported as "absent": a credential that
/// cannot be read is as good as no credential.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn KeyValueStore>,
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Store kept in memory only
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!("Failed to read '{key}' from credential store: {e}");
                None
            }
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.read(keys::TOKEN)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read(keys::REFRESH_TOKEN)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.read(keys::EXPIRES_AT)?;
        let secs = raw.parse::<i64>().ok()?;
        Utc.timestamp_opt(secs, 0).single()
    }

    pub fn user(&self) -> Option<UserIdentity> {
        let raw = self.read(keys::USER)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!("Stored user identity is not valid JSON: {e}");
                None
            }
        }
    }

    pub fn credentials(&self) -> Option<Credentials> {
        Some(Credentials {
            access_token: self.access_token()?,
            refresh_token: self.refresh_token(),
            expires_at: self.expires_at(),
        })
    }

    /// Persist the full session created by a successful login
    pub fn save_login(&self, credentials: &Credentials, user: Option<&UserIdentity>) -> CoreResult<()> {
        let mut entries = token_entries(credentials);
        if let Some(user) = user {
            entries.push((keys::USER, serde_json::to_string(user)?));
        }
        self.backend.set_many(&entries)?;
        if credentials.expires_at.is_none() {
            self.backend.remove_keys(&[keys::EXPIRES_AT])?;
        }
        debug!("Saved login session");
        Ok(())
    }

    /// Overwrite the tokens after a refresh; a missing refresh token keeps
    /// the stored one
    pub fn save_credentials(&self, credentials: &Credentials) -> CoreResult<()> {
        self.backend.set_many(&token_entries(credentials))
    }

    pub fn save_user(&self, user: &UserIdentity) -> CoreResult<()> {
        self.backend.set(keys::USER, &serde_json::to_string(user)?)
    }

    /// Remove every credential key; clearing an empty store is a no-op
    pub fn clear(&self) -> CoreResult<()> {
        self.backend.remove_keys(&keys::ALL)
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.user().is_some_and(|u| u.has_permission(permission))
    }
}

fn token_entries(credentials: &Credentials) -> Vec<(&'static str, String)> {
    let mut entries = vec![(keys::TOKEN, credentials.access_token.clone())];
    if let Some(refresh) = &credentials.refresh_token {
        entries.push((keys::REFRESH_TOKEN, refresh.clone()));
    }
    if let Some(at) = credentials.expires_at {
        entries.push((keys::EXPIRES_AT, at.timestamp().to_string()));
    }
    entries
}

impl From<Arc<dyn KeyValueStore>> for CredentialStore {
    fn from(backend: Arc<dyn KeyValueStore>) -> Self {
        Self::new(backend)
    }
}

/// Convert a poisoned or failed backend into a storage error
pub(crate) fn storage_err(e: impl fmt::Display) -> CoreError {
    CoreError::storage(e.to_string())
}
