//! Browser-session storage for the cart core.
//!
//! The core expects synchronous storage, while tower-sessions is async. A
//! [`SessionSnapshot`] bridges the two: it loads the cart's keys from the
//! session up front, serves the core from memory, and writes back only the
//! keys that changed.
//!
//! A snapshot is only safe while no other request in the same session runs;
//! `middleware::session_lock` holds that guarantee from load to save.

use std::collections::BTreeSet;

use furnilux_core::{CART_STORAGE_KEY, MemoryStorage, SessionStorage, StorageError};
use tower_sessions::Session;

/// Session key holding the notification presenter state.
pub const NOTIFICATION_STATE_KEY: &str = "furnilux_notification";

/// Keys loaded into every snapshot.
const SNAPSHOT_KEYS: [&str; 2] = [CART_STORAGE_KEY, NOTIFICATION_STATE_KEY];

/// Synchronous view of one session's storage keys.
#[derive(Debug)]
pub struct SessionSnapshot {
    storage: MemoryStorage,
    dirty: BTreeSet<String>,
}

impl SessionSnapshot {
    /// Load the cart keys from `session`, enforcing `quota` on later writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be read.
    pub async fn load(
        session: &Session,
        quota: usize,
    ) -> Result<Self, tower_sessions::session::Error> {
        let mut entries = Vec::with_capacity(SNAPSHOT_KEYS.len());
        for key in SNAPSHOT_KEYS {
            if let Some(value) = session.get::<String>(key).await? {
                entries.push((key.to_string(), value));
            }
        }

        Ok(Self::from_storage(MemoryStorage::from_entries(entries, quota)))
    }

    /// Wrap an already-populated store. Nothing starts out dirty.
    #[must_use]
    pub fn from_storage(storage: MemoryStorage) -> Self {
        Self {
            storage,
            dirty: BTreeSet::new(),
        }
    }

    /// Keys written or removed since the snapshot was taken.
    pub fn dirty_keys(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    /// Write changed keys back to `session`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store rejects a write.
    pub async fn flush(self, session: &Session) -> Result<(), tower_sessions::session::Error> {
        for key in &self.dirty {
            match self.storage.get(key) {
                Some(value) => session.insert(key, value).await?,
                None => {
                    session.remove_value(key).await?;
                }
            }
        }
        tracing::debug!(keys = self.dirty.len(), "Session snapshot flushed");
        Ok(())
    }
}

impl SessionStorage for SessionSnapshot {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage.get_item(key)
    }

    fn set_item(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.storage.set_item(key, value)?;
        self.dirty.insert(key.to_owned());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        self.storage.remove_item(key)?;
        self.dirty.insert(key.to_owned());
        Ok(())
    }
}
