//! In-memory pairing of derived files with their uploads.

use std::collections::HashMap;
use std::sync::RwLock;

/// Maps a derived filename to the upload it was produced from
///
/// Filled when a transform succeeds. It does not survive a restart; lookups
/// fall back to the naming convention for anything it does not know.
#[derive(Debug, Default)]
pub struct OriginalIndex {
    entries: RwLock<HashMap<String, String>>,
}

impl OriginalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, optimized_filename: &str, original_filename: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            optimized_filename.to_string(),
            original_filename.to_string(),
        );
    }

    pub fn get(&self, optimized_filename: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(optimized_filename).cloned()
    }

    pub fn remove(&self, optimized_filename: &str) -> Option<String> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(optimized_filename)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
