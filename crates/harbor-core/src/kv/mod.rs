//! Key-value store access.
//!
//! The catalog, its layers and the pending-install queue all live in a shared
//! key-value namespace. Every read goes straight to the store; nothing is
//! cached between requests.

pub mod consul;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use crate::error::{HarborError, Result};

pub use consul::ConsulKv;

/// A single key with its raw value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvPair {
    pub key: String,
    pub value: Vec<u8>,
}

/// Byte-blob access to the shared key-value namespace.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Keys under `prefix`.
    ///
    /// With a separator, keys are rolled up at the first separator following
    /// the prefix, so `keys("root/", Some("/"))` yields `root/0/`, `root/1/`.
    fn keys(&self, prefix: &str, separator: Option<&str>) -> Result<Vec<String>>;

    /// All pairs under `prefix`, recursively.
    fn list(&self, prefix: &str) -> Result<Vec<KvPair>>;

    fn delete(&self, key: &str) -> Result<()>;

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// Ordered in-process store. Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert for seeding fixtures.
    pub fn with(self, key: impl Into<String>, value: impl AsRef<[u8]>) -> Self {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.into(), value.as_ref().to_vec());
        }
        self
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned(operation: &str, key: &str) -> HarborError {
    HarborError::upstream(operation, key, "memory store lock poisoned")
}

impl KvStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self.entries.read().map_err(|_| poisoned("kv get", key))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned("kv put", key))?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn keys(&self, prefix: &str, separator: Option<&str>) -> Result<Vec<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| poisoned("kv keys", prefix))?;
        let mut keys = BTreeSet::new();
        for key in entries.keys().filter(|k| k.starts_with(prefix)) {
            let rest = &key[prefix.len()..];
            match separator.and_then(|sep| rest.find(sep).map(|pos| pos + sep.len())) {
                Some(end) => keys.insert(format!("{}{}", prefix, &rest[..end])),
                None => keys.insert(key.clone()),
            };
        }
        Ok(keys.into_iter().collect())
    }

    fn list(&self, prefix: &str) -> Result<Vec<KvPair>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| poisoned("kv list", prefix))?;
        Ok(entries
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| KvPair {
                key: k.clone(),
                value: v.clone(),
            })
            .collect())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| poisoned("kv delete", key))?;
        entries.remove(key);
        Ok(())
    }
}
