//! Session-scoped key-value storage.
//!
//! [`SessionStorage`] mirrors the browser's Web Storage surface: string keys,
//! string values, synchronous access. The cart never touches a concrete
//! backend; the storefront supplies one backed by the browser session and
//! tests use [`MemoryStorage`].

use std::collections::HashMap;

use thiserror::Error;

/// Default quota, matching the common browser limit for session storage.
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A write would exceed the backend's quota.
    #[error("storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded {
        /// Total bytes the store would hold after the write.
        needed: usize,
        /// Configured quota in bytes.
        quota: usize,
    },

    /// The backend refused access or is not reachable.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A value could not be encoded for storage.
    #[error("failed to serialize value: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Synchronous string key-value store scoped to one browsing session.
pub trait SessionStorage {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backend itself fails.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write (quota, access).
    fn set_item(&mut self, key: &str, value: String) -> Result<(), StorageError>;

    /// Delete the value under `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the removal.
    fn remove_item(&mut self, key: &str) -> Result<(), StorageError>;
}

impl<S: SessionStorage + ?Sized> SessionStorage for &mut S {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key)
    }

    fn set_item(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        (**self).remove_item(key)
    }
}

/// In-memory storage with a byte quota.
///
/// Usage is measured as the sum of key and value lengths in bytes.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
    quota: usize,
}

impl MemoryStorage {
    /// Create an empty store with [`DEFAULT_QUOTA_BYTES`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_quota(DEFAULT_QUOTA_BYTES)
    }

    /// Create an empty store holding at most `quota` bytes.
    #[must_use]
    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: HashMap::new(),
            quota,
        }
    }

    /// Create a store pre-filled with `entries`.
    ///
    /// The quota applies to later writes only, so data loaded from elsewhere
    /// is never rejected.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = (String, String)>, quota: usize) -> Self {
        Self {
            entries: entries.into_iter().collect(),
            quota,
        }
    }

    /// Borrow the value under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Bytes currently in use.
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        let replaced = self.entries.get(key).map_or(0, |old| key.len() + old.len());
        let needed = self.used_bytes() - replaced + key.len() + value.len();
        if needed > self.quota {
            return Err(StorageError::QuotaExceeded {
                needed,
                quota: self.quota,
            });
        }
        self.entries.insert(key.to_owned(), value);
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let mut storage = MemoryStorage::new();
        assert_eq!(storage.get_item("k").unwrap(), None);

        storage.set_item("k", "v".to_string()).unwrap();
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("v"));

        storage.remove_item("k").unwrap();
        assert_eq!(storage.get_item("k").unwrap(), None);
        assert!(storage.is_empty());
    }

    #[test]
    fn test_remove_missing_key_is_ok() {
        let mut storage = MemoryStorage::new();
        assert!(storage.remove_item("missing").is_ok());
    }

    #[test]
    fn test_quota_exceeded_leaves_previous_value() {
        let mut storage = MemoryStorage::with_quota(10);
        storage.set_item("k", "12345".to_string()).unwrap();

        let err = storage.set_item("k", "1234567890".to_string()).unwrap_err();
        assert!(matches!(
            err,
            StorageError::QuotaExceeded {
                needed: 11,
                quota: 10
            }
        ));
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("12345"));
    }

    #[test]
    fn test_replacing_a_value_reuses_its_bytes() {
        let mut storage = MemoryStorage::with_quota(10);
        storage.set_item("k", "123456789".to_string()).unwrap();
        storage.set_item("k", "987654321".to_string()).unwrap();
        assert_eq!(storage.used_bytes(), 10);
    }

    #[test]
    fn test_from_entries_bypasses_quota_until_next_write() {
        let mut storage =
            MemoryStorage::from_entries([("k".to_string(), "0123456789".to_string())], 4);
        assert_eq!(storage.get("k"), Some("0123456789"));

        assert!(storage.set_item("other", "x".to_string()).is_err());
        storage.remove_item("k").unwrap();
        assert!(storage.set_item("j", "x".to_string()).is_ok());
    }

    #[test]
    fn test_mutable_reference_is_storage() {
        fn write(mut storage: impl SessionStorage) {
            storage.set_item("k", "v".to_string()).unwrap();
        }

        let mut storage = MemoryStorage::new();
        write(&mut storage);
        assert_eq!(storage.len(), 1);
    }
}
