//! Exact-text memoization for classification results.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Hex SHA-256 of the exact input text.
pub fn text_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Results keyed by the SHA-256 of the text that produced them.
///
/// Cloning shares the underlying map.
#[derive(Debug)]
pub struct TextCache<T> {
    entries: Arc<RwLock<HashMap<String, T>>>,
}

impl<T> Clone for TextCache<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<T> Default for TextCache<T> {
    fn default() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<T: Clone> TextCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, text: &str) -> Option<T> {
        self.read().get(&text_hash(text)).cloned()
    }

    pub fn insert(&self, text: &str, value: T) {
        self.write().insert(text_hash(text), value);
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, T>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, T>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}
