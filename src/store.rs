//! Key/value persistence standing in for browser local storage.
//!
//! Every collection lives under one key as JSON text. Missing or malformed
//! values read back as empty, so a damaged entry never takes the shop down.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Storage keys.
pub mod keys {
    pub const PRODUCTS: &str = "products";
    pub const CATEGORIES: &str = "categories";
    pub const USERS: &str = "users";
    pub const ORDERS: &str = "orders";
    pub const PROMO_CODES: &str = "promoCodes";
    pub const PROMO_REDEMPTIONS: &str = "promoRedemptions";
    pub const SUPPORT_TICKETS: &str = "supportTickets";
    pub const PRODUCT_COMMENTS: &str = "productComments";
    pub const CARTS: &str = "carts";
    pub const VERIFICATION_CODE: &str = "verificationCode";
    pub const VERIFICATION_EMAIL: &str = "verificationEmail";
    pub const REGISTRATION_FORM_DATA: &str = "registrationFormData";
    pub const ACCENT_COLOR: &str = "accentColor";
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// Process-local store; contents vanish on restart.
#[derive(Debug, Default)]
pub struct MemoryStore { entries: HashMap<String, String> }

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> { self.entries.get(key).cloned() }
    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> { self.entries.insert(key.to_string(), value); Ok(()) }
    fn remove(&mut self, key: &str) -> Result<(), StorageError> { self.entries.remove(key); Ok(()) }
}

/// One JSON object on disk mapping keys to their text values. Every write
/// rewrites the file through a temporary sibling and a rename.
#[derive(Debug)]
pub struct FileStore { path: PathBuf, entries: BTreeMap<String, String> }

impl FileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "store file is malformed, starting empty");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) { fs::create_dir_all(parent)?; }
        tracing::debug!(path = %path.display(), keys = entries.len(), "opened file store");
        Ok(Self { path, entries })
    }

    fn flush(&self) -> Result<(), StorageError> {
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&self.entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> { self.entries.get(key).cloned() }
    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> { self.entries.insert(key.to_string(), value); self.flush() }
    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.entries.remove(key).is_some() { self.flush()?; }
        Ok(())
    }
}

/// Typed access to the collections held in a [`KeyValueStore`].
pub struct Storage { kv: Box<dyn KeyValueStore> }

impl Storage {
    pub fn new(kv: impl KeyValueStore + 'static) -> Self { Self { kv: Box::new(kv) } }
    pub fn in_memory() -> Self { Self::new(MemoryStore::new()) }

    pub fn load_list<T: DeserializeOwned>(&self, key: &str) -> Vec<T> { self.load_value(key).unwrap_or_default() }

    pub fn save_list<T: Serialize>(&mut self, key: &str, items: &[T]) -> Result<(), StorageError> { self.save_value(key, &items) }

    pub fn load_value<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let text = self.kv.get(key)?;
        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "ignoring malformed stored value");
                None
            }
        }
    }

    pub fn save_value<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StorageError> {
        let text = serde_json::to_string(value)?;
        self.kv.set(key, text)
    }

    pub fn contains(&self, key: &str) -> bool { self.kv.get(key).is_some() }
    pub fn remove(&mut self, key: &str) -> Result<(), StorageError> { self.kv.remove(key) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_and_malformed_values_read_as_empty() {
        let mut kv = MemoryStore::new();
        kv.set("products", "not json".into()).unwrap();
        let storage = Storage::new(kv);
        assert!(storage.load_list::<String>("products").is_empty());
        assert!(storage.load_list::<String>("users").is_empty());
        assert!(storage.contains("products"));
    }

    #[test]
    fn test_save_and_load_list() {
        let mut storage = Storage::in_memory();
        storage.save_list("tags", &["a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(storage.load_list::<String>("tags"), vec!["a", "b"]);
        storage.remove("tags").unwrap();
        assert!(!storage.contains("tags"));
    }

    #[test]
    fn test_file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");
        {
            let mut storage = Storage::new(FileStore::open(&path).unwrap());
            storage.save_value(keys::ACCENT_COLOR, "green").unwrap();
        }
        let storage = Storage::new(FileStore::open(&path).unwrap());
        assert_eq!(storage.load_value::<String>(keys::ACCENT_COLOR).as_deref(), Some("green"));
    }

    #[test]
    fn test_file_store_tolerates_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{ broken").unwrap();
        let storage = Storage::new(FileStore::open(&path).unwrap());
        assert!(!storage.contains(keys::PRODUCTS));
    }
}
