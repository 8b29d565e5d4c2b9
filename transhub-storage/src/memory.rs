//! Bounded in-memory storage.
//!
//! Keeps objects in a process-local map. With a byte capacity configured the
//! store behaves like a cache: once the total size exceeds the capacity the
//! least recently used objects are evicted, and later reads of an evicted
//! object fail with `StorageError::NotFound`.
//!
//! # Eviction
//!
//! ```text
//! write ──► insert ──► total > max? ──yes──► drop oldest access ──┐
//!                            ▲                                     │
//!                            └─────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, instrument};

use crate::error::{Result, StorageError};
use crate::path::ObjectPath;
use crate::traits::{BlobStorage, ObjectMeta};

#[derive(Debug, Clone)]
struct MemoryEntry {
    data: Bytes,
    last_accessed: Instant,
    modified: i64,
}

/// Map plus LRU bookkeeping.
struct MemoryState {
    entries: HashMap<ObjectPath, MemoryEntry>,
    total_size: u64,
    max_size: Option<u64>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl MemoryState {
    fn new(max_size: Option<u64>) -> Self {
        Self {
            entries: HashMap::new(),
            total_size: 0,
            max_size,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    fn insert(&mut self, path: ObjectPath, data: Bytes) {
        self.remove(&path);
        self.total_size += data.len() as u64;
        self.entries.insert(
            path,
            MemoryEntry {
                data,
                last_accessed: Instant::now(),
                modified: now_secs(),
            },
        );
    }

    fn remove(&mut self, path: &ObjectPath) -> Option<MemoryEntry> {
        let entry = self.entries.remove(path)?;
        self.total_size = self.total_size.saturating_sub(entry.data.len() as u64);
        Some(entry)
    }

    fn get(&mut self, path: &ObjectPath) -> Option<Bytes> {
        match self.entries.get_mut(path) {
            Some(entry) => {
                entry.last_accessed = Instant::now();
                self.hits += 1;
                Some(entry.data.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    fn needs_eviction(&self) -> bool {
        matches!(self.max_size, Some(max) if self.total_size > max)
    }

    /// Evict the least recently used entry, never the one just written.
    fn evict_lru(&mut self, keep: &ObjectPath) -> Option<ObjectPath> {
        let oldest = self
            .entries
            .iter()
            .filter(|(k, _)| *k != keep)
            .min_by_key(|(_, e)| e.last_accessed)
            .map(|(k, _)| k.clone());

        if let Some(ref key) = oldest {
            self.remove(key);
            self.evictions += 1;
        }

        oldest
    }

    fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// In-memory storage backend with optional LRU capacity.
pub struct MemoryStorage {
    state: Mutex<MemoryState>,
}

impl MemoryStorage {
    /// Unbounded in-memory storage.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::new(None)),
        }
    }

    /// In-memory storage that evicts once `max_size_bytes` is exceeded.
    pub fn with_capacity(max_size_bytes: u64) -> Self {
        Self {
            state: Mutex::new(MemoryState::new(Some(max_size_bytes))),
        }
    }

    /// Get storage statistics.
    pub fn stats(&self) -> MemoryStats {
        let state = self.state.lock();
        MemoryStats {
            entries: state.entries.len(),
            total_size: state.total_size,
            max_size: state.max_size,
            hit_rate: state.hit_rate(),
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
        }
    }

    /// Drop every stored object.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.total_size = 0;
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("MemoryStorage")
            .field("entries", &stats.entries)
            .field("total_size", &stats.total_size)
            .field("max_size", &stats.max_size)
            .field("hit_rate", &format!("{:.1}%", stats.hit_rate * 100.0))
            .finish()
    }
}

/// Memory storage statistics.
#[derive(Debug, Clone)]
pub struct MemoryStats {
    /// Number of stored objects
    pub entries: usize,
    /// Total size of stored data in bytes
    pub total_size: u64,
    /// Capacity in bytes, if bounded
    pub max_size: Option<u64>,
    /// Read hit rate (0.0 to 1.0)
    pub hit_rate: f64,
    pub hits: u64,
    pub misses: u64,
    /// Objects dropped to stay under capacity
    pub evictions: u64,
}

#[async_trait]
impl BlobStorage for MemoryStorage {
    #[instrument(skip(self, data), fields(path = %path, size = data.len()))]
    async fn write(&self, path: &ObjectPath, data: Bytes) -> Result<()> {
        if path.is_prefix() {
            return Err(StorageError::InvalidPath(path.to_string()));
        }

        let mut state = self.state.lock();
        state.insert(path.clone(), data);

        while state.needs_eviction() {
            match state.evict_lru(path) {
                Some(evicted) => debug!("Evicting from memory storage: {}", evicted),
                None => break,
            }
        }

        Ok(())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn read(&self, path: &ObjectPath) -> Result<Bytes> {
        self.state
            .lock()
            .get(path)
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn exists(&self, path: &ObjectPath) -> Result<bool> {
        Ok(self.state.lock().entries.contains_key(path))
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn delete(&self, path: &ObjectPath) -> Result<()> {
        self.state.lock().remove(path);
        Ok(())
    }

    async fn list(&self, prefix: &ObjectPath) -> Result<Vec<ObjectMeta>> {
        let state = self.state.lock();
        let mut results: Vec<ObjectMeta> = state
            .entries
            .iter()
            .filter(|(path, _)| prefix.covers(path))
            .map(|(path, entry)| ObjectMeta {
                path: path.clone(),
                size: entry.data.len() as u64,
                last_modified: Some(entry.modified),
            })
            .collect();
        results.sort_by(|a, b| a.path.to_string().cmp(&b.path.to_string()));
        Ok(results)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
