use dashmap::DashMap;

use crate::cache::CacheEntry;

/// Process-local tier 1. Entries are lazily evicted when a read finds them
/// past expiry; there is no background sweep.
pub struct MemoryTier {
    map: DashMap<String, CacheEntry>,
}

impl MemoryTier {
    pub fn new() -> Self {
        MemoryTier { map: DashMap::new() }
    }

    pub fn get(&self, key: &str, now_ms: u64) -> Option<CacheEntry> {
        {
            let entry = self.map.get(key)?;
            if entry.is_fresh(now_ms) {
                return Some(entry.value().clone());
            }
        }
        // Guard dropped above; removing while holding it would deadlock.
        // The predicate re-checks staleness so a writer that refreshed the
        // entry in the window since the read does not lose its fresh entry.
        self.map.remove_if(key, |_, entry| !entry.is_fresh(now_ms));
        None
    }

    pub fn put(&self, key: &str, entry: CacheEntry) {
        self.map.insert(key.to_string(), entry);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.map.len()
    }
}

impl Default for MemoryTier {
    fn default() -> Self {
        Self::new()
    }
}
