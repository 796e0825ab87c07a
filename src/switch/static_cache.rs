use core::fmt;

use heapless::FnvIndexMap;

use crate::config::SWITCH_STATIC_CACHE_COUNT;
use crate::wire::{CacheKey, CacheValue};

/// A static cache entry, as installed by the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticEntry {
    pub key: CacheKey,
    pub value: CacheValue,
}

impl fmt::Display for StaticEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticTableFull;

impl fmt::Display for StaticTableFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Static cache table full")
    }
}

impl std::error::Error for StaticTableFull {}

/// Exact-match table of precomputed answers.
///
/// Filled before traffic starts and only read by the data path.
#[derive(Debug, Default)]
pub struct StaticTable {
    storage: FnvIndexMap<CacheKey, CacheValue, SWITCH_STATIC_CACHE_COUNT>,
}

impl StaticTable {
    pub fn new() -> Self {
        Self {
            storage: FnvIndexMap::new(),
        }
    }

    /// Install `key → value`, returning the value it replaces.
    ///
    /// Re-inserting a key never fails, even on a full table.
    pub fn insert(
        &mut self,
        key: CacheKey,
        value: CacheValue,
    ) -> Result<Option<CacheValue>, StaticTableFull> {
        if let Some(slot) = self.storage.get_mut(&key) {
            return Ok(Some(core::mem::replace(slot, value)));
        }
        self.storage
            .insert(key, value)
            .map_err(|_| StaticTableFull)
    }

    pub fn lookup(&self, key: CacheKey) -> Option<CacheValue> {
        self.storage.get(&key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = StaticEntry> + '_ {
        self.storage
            .iter()
            .map(|(&key, &value)| StaticEntry { key, value })
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}
