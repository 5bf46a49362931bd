use crate::error::Result;
use crate::storage::Storage;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory storage implementation.
///
/// Keeps entries in a sorted map behind an async lock. Suitable for
/// development and testing; entries are lost on restart and not shared
/// across processes.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    /// Create a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let entries = self.entries.read().await;
        let mut children: Vec<String> = Vec::new();

        for key in entries.keys() {
            let Some(suffix) = key.strip_prefix(prefix) else {
                continue;
            };
            if suffix.is_empty() {
                continue;
            }
            // Deeper keys surface as a single directory entry.
            let child = match suffix.find('/') {
                Some(idx) => &suffix[..=idx],
                None => suffix,
            };
            if children.last().map(String::as_str) != Some(child) {
                children.push(child.to_string());
            }
        }

        Ok(children)
    }
}
