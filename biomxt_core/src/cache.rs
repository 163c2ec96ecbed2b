//! Bounded-memory LRU cache for decompressed blocks.
//!
//! One cache instance may be shared by readers over several files, so keys
//! carry the owning file's [`FileId`] alongside the block index. The whole
//! structure sits behind a single reader-writer lock: observers take the
//! shared side, mutators (including lookups, which update recency) take the
//! exclusive side. No I/O happens under the lock.

use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::mem;
use std::sync::RwLock;

use crate::format::FileId;

/// Memory ceiling used when a cache is built without knowledge of any file:
/// 128 MiB.
pub const DEFAULT_MEMORY_LIMIT: usize = 128 * 1024 * 1024;

/// Fixed per-entry cost charged on top of the payload allocation.
pub const ENTRY_OVERHEAD: usize = mem::size_of::<BlockKey>();

/// Cache key: (owning file, block index).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockKey {
    pub file_id: FileId,
    pub block_index: u32,
}

impl Hash for BlockKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Fold the UUID's two 64-bit words and the block index with the
        // golden-ratio constant so any changed UUID bit perturbs the result.
        let (lo, hi) = self.file_id.words();
        let mut seed = lo;
        seed ^= hi
            .wrapping_add(0x9e37_79b9)
            .wrapping_add(seed << 6)
            .wrapping_add(seed >> 2);
        seed ^= u64::from(self.block_index)
            .wrapping_add(0x9e37_79b9)
            .wrapping_add(seed << 6)
            .wrapping_add(seed >> 2);
        state.write_u64(seed);
    }
}

struct Slot {
    data: Vec<u8>,
    /// Position in the recency index; larger is more recent.
    stamp: u64,
}

fn entry_size(data: &Vec<u8>) -> usize {
    ENTRY_OVERHEAD + data.capacity()
}

struct CacheInner {
    map: HashMap<BlockKey, Slot>,
    /// stamp → key, ordered oldest-first. Every live stamp is unique.
    recency: BTreeMap<u64, BlockKey>,
    next_stamp: u64,
    memory_used: usize,
    memory_limit: usize,
}

impl CacheInner {
    fn remove_entry(&mut self, key: &BlockKey) -> Option<Vec<u8>> {
        let slot = self.map.remove(key)?;
        self.recency.remove(&slot.stamp);
        self.memory_used -= entry_size(&slot.data);
        Some(slot.data)
    }

    fn evict_one_least_recent(&mut self) -> bool {
        let Some((_, key)) = self.recency.pop_first() else {
            return false;
        };
        if let Some(slot) = self.map.remove(&key) {
            self.memory_used -= entry_size(&slot.data);
        }
        true
    }

    fn evict_until_fit(&mut self) {
        while self.memory_used > self.memory_limit {
            if !self.evict_one_least_recent() {
                break;
            }
        }
    }

    fn evict_until_enough(&mut self, incoming: usize) {
        while self.memory_used + incoming > self.memory_limit {
            if !self.evict_one_least_recent() {
                break;
            }
        }
    }
}

/// Strict-LRU cache of decompressed block bytes with exact byte accounting.
pub struct BlockCache {
    inner: RwLock<CacheInner>,
}

impl Default for BlockCache {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockCache {
    /// A cache with the default 128 MiB ceiling.
    pub fn new() -> Self {
        Self::with_memory_limit(DEFAULT_MEMORY_LIMIT)
    }

    pub fn with_memory_limit(bytes: usize) -> Self {
        BlockCache {
            inner: RwLock::new(CacheInner {
                map: HashMap::new(),
                recency: BTreeMap::new(),
                next_stamp: 0,
                memory_used: 0,
                memory_limit: bytes,
            }),
        }
    }

    pub fn get_memory_limit(&self) -> usize {
        self.inner.read().expect("cache lock poisoned").memory_limit
    }

    pub fn get_memory_used(&self) -> usize {
        self.inner.read().expect("cache lock poisoned").memory_used
    }

    /// Adjust the ceiling and evict immediately until the cache fits.
    pub fn set_memory_limit(&self, bytes: usize) {
        let mut inner = self.inner.write().expect("cache lock poisoned");
        inner.memory_limit = bytes;
        inner.evict_until_fit();
    }

    /// Insert a block, taking ownership of its bytes.
    ///
    /// An entry that would exceed the ceiling on its own is dropped
    /// silently. Otherwise least-recently-used entries are evicted until the
    /// newcomer fits, and it lands at the MRU end. An existing entry under
    /// the same key is replaced.
    pub fn insert(&self, key: BlockKey, data: Vec<u8>) {
        let mut inner = self.inner.write().expect("cache lock poisoned");
        let size = entry_size(&data);
        if size > inner.memory_limit {
            return;
        }

        inner.remove_entry(&key);
        inner.evict_until_enough(size);

        let stamp = inner.next_stamp;
        inner.next_stamp += 1;
        inner.recency.insert(stamp, key);
        inner.map.insert(key, Slot { data, stamp });
        inner.memory_used += size;
    }

    /// Copy `size` bytes starting at `offset` of the cached block into
    /// `buffer`, growing `buffer` if it is smaller than `size`.
    ///
    /// A hit promotes the entry to most-recently-used. Returns `false` on a
    /// miss, or when the requested sub-range exceeds the cached data.
    pub fn get_block_data(
        &self,
        key: &BlockKey,
        buffer: &mut Vec<u8>,
        offset: usize,
        size: usize,
    ) -> bool {
        let mut guard = self.inner.write().expect("cache lock poisoned");
        let CacheInner {
            map,
            recency,
            next_stamp,
            ..
        } = &mut *guard;

        let Some(slot) = map.get_mut(key) else {
            return false;
        };

        recency.remove(&slot.stamp);
        slot.stamp = *next_stamp;
        *next_stamp += 1;
        recency.insert(slot.stamp, *key);

        if offset + size > slot.data.len() {
            return false;
        }
        if buffer.len() < size {
            buffer.resize(size, 0);
        }
        buffer[..size].copy_from_slice(&slot.data[offset..offset + size]);
        true
    }
}
