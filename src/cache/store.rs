//! Cache Store Module
//!
//! Main cache engine: a hash-indexed, recency-ordered object store with
//! size-bounded LRU eviction.
//!
//! Entries live in an index-stable arena and are linked into two
//! independent structures: a doubly-linked recency list (most recently
//! used at the head, eviction candidates at the tail) and per-bucket
//! collision chains threaded through a dedicated link field. An entry
//! reachable from one structure is always reachable from the other.
//!
//! The store itself is a pure data structure and performs no I/O; callers
//! share it behind `SharedCache` and must hold the write half of the lock
//! for every operation that can mutate links, including `lookup` (which
//! promotes the entry it finds).

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tracing::error;

use crate::cache::{CacheEntry, CacheStats, BUCKET_COUNT};
use crate::error::{ProxyError, Result};

// == Cache Store ==
/// Shared object store with LRU eviction.
#[derive(Debug)]
pub struct CacheStore {
    /// Index-stable entry arena; `None` slots are free
    slots: Vec<Option<CacheEntry>>,
    /// Arena indices available for reuse
    free: Vec<usize>,
    /// Most recently used entry
    head: Option<usize>,
    /// Least recently used entry, next to be evicted
    tail: Option<usize>,
    /// Heads of the per-bucket collision chains
    buckets: Vec<Option<usize>>,
    /// Running sum of resident entry byte lengths
    total_size: usize,
    /// Capacity bound on `total_size`
    max_total_size: usize,
    /// Bound on a single entry's byte length (exclusive)
    max_object_size: usize,
    /// Performance statistics
    stats: CacheStats,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore with the given capacity limits.
    ///
    /// # Arguments
    /// * `max_total_size` - Maximum total bytes across all resident entries
    /// * `max_object_size` - Entries of this length or more are never stored
    pub fn new(max_total_size: usize, max_object_size: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            buckets: vec![None; BUCKET_COUNT],
            total_size: 0,
            max_total_size,
            max_object_size,
            stats: CacheStats::new(),
        }
    }

    // == Lookup ==
    /// Retrieves the cached bytes for a key, promoting the entry to most
    /// recently used.
    ///
    /// The body is copied out so the caller can release the store lock
    /// before writing to a socket. Promotion mutates the recency list, so
    /// this takes `&mut self` and callers must hold exclusive access.
    pub fn lookup(&mut self, key: &str) -> Option<Vec<u8>> {
        match self.find(key) {
            Some(idx) => {
                self.promote(idx);
                self.stats.record_hit();
                Some(self.entry(idx).body.clone())
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Insert / Update ==
    /// Stores a response body under a key.
    ///
    /// If the key is already resident its body is replaced in place and the
    /// entry promoted; no duplicate node is created. Otherwise entries are
    /// evicted from the least recently used end until the new body fits,
    /// and a fresh entry is linked at the head of the recency list and the
    /// front of its bucket chain.
    ///
    /// Bodies of `max_object_size` bytes or more are rejected.
    pub fn insert(&mut self, key: &str, body: Vec<u8>) -> Result<()> {
        if body.len() >= self.max_object_size {
            return Err(ProxyError::ObjectTooLarge {
                size: body.len(),
                limit: self.max_object_size,
            });
        }

        if let Some(idx) = self.find(key) {
            let new_len = body.len();
            let old_len = self.entry(idx).len();
            self.entry_mut(idx).body = body;
            self.total_size = self.total_size - old_len + new_len;
            self.promote(idx);
            // A grown body can push the total past the cap; restore the
            // invariant before returning.
            while self.total_size > self.max_total_size {
                if self.evict_lru().is_none() {
                    break;
                }
            }
            return Ok(());
        }

        while self.total_size + body.len() > self.max_total_size {
            if self.evict_lru().is_none() {
                break;
            }
        }

        let bucket = Self::bucket_index(key);
        let len = body.len();
        let entry = CacheEntry::new(key.to_string(), body);
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(entry);
                idx
            }
            None => {
                self.slots.push(Some(entry));
                self.slots.len() - 1
            }
        };

        self.entry_mut(idx).chain = self.buckets[bucket];
        self.buckets[bucket] = Some(idx);
        self.attach_front(idx);
        self.total_size += len;
        self.stats.record_insertion();
        Ok(())
    }

    // == Accessors ==
    /// Returns true if the key is resident, without promoting it.
    pub fn contains(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    /// Returns the current number of resident entries.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Returns true if no entries are resident.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the current sum of resident entry byte lengths.
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_usage(self.len(), self.total_size);
        stats
    }

    // == Clear ==
    /// Releases every resident entry, resetting the store to empty.
    ///
    /// Statistics counters are preserved so a final snapshot can still be
    /// reported after teardown.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.buckets.iter_mut().for_each(|bucket| *bucket = None);
        self.total_size = 0;
    }

    // == Consistency Check ==
    /// Scans both index structures and reports the first violated
    /// invariant, if any.
    ///
    /// Intended for tests and diagnostics; it touches every resident entry
    /// and is not meant for per-request use.
    pub fn check_consistency(&self) -> std::result::Result<(), String> {
        use std::collections::HashSet;

        let mut listed = HashSet::new();
        let mut keys = HashSet::new();
        let mut sum = 0usize;
        let mut prev = None;
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            let entry = self.slots[idx]
                .as_ref()
                .ok_or_else(|| format!("recency list references free slot {idx}"))?;
            if !listed.insert(idx) {
                return Err(format!("cycle in recency list at slot {idx}"));
            }
            if !keys.insert(entry.key.as_str()) {
                return Err(format!("duplicate key '{}'", entry.key));
            }
            if entry.prev != prev {
                return Err(format!("bad back link at slot {idx}"));
            }
            if entry.len() >= self.max_object_size {
                return Err(format!(
                    "entry '{}' of {} bytes is over the object limit",
                    entry.key,
                    entry.len()
                ));
            }
            sum += entry.len();
            prev = Some(idx);
            cursor = entry.next;
        }
        if prev != self.tail {
            return Err("tail does not terminate the recency list".to_string());
        }
        if sum != self.total_size {
            return Err(format!(
                "total_size {} does not match listed sum {sum}",
                self.total_size
            ));
        }
        if self.total_size > self.max_total_size {
            return Err(format!("total_size {} is over capacity", self.total_size));
        }
        if listed.len() != self.len() {
            return Err(format!(
                "recency list holds {} entries but {} slots are occupied",
                listed.len(),
                self.len()
            ));
        }

        let mut chained = HashSet::new();
        for (bucket, chain_head) in self.buckets.iter().enumerate() {
            let mut cursor = *chain_head;
            while let Some(idx) = cursor {
                let entry = self.slots[idx]
                    .as_ref()
                    .ok_or_else(|| format!("bucket {bucket} references free slot {idx}"))?;
                if Self::bucket_index(&entry.key) != bucket {
                    return Err(format!("entry '{}' chained in the wrong bucket", entry.key));
                }
                if !chained.insert(idx) {
                    return Err(format!("slot {idx} appears in more than one chain"));
                }
                cursor = entry.chain;
            }
        }
        if chained != listed {
            return Err("recency list and bucket chains disagree".to_string());
        }
        Ok(())
    }

    // == Internals ==
    fn bucket_index(key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % BUCKET_COUNT as u64) as usize
    }

    fn entry(&self, idx: usize) -> &CacheEntry {
        self.slots[idx]
            .as_ref()
            .expect("linked index refers to a free slot")
    }

    fn entry_mut(&mut self, idx: usize) -> &mut CacheEntry {
        self.slots[idx]
            .as_mut()
            .expect("linked index refers to a free slot")
    }

    /// Walks the key's bucket chain for an exact match.
    fn find(&self, key: &str) -> Option<usize> {
        let mut cursor = self.buckets[Self::bucket_index(key)];
        while let Some(idx) = cursor {
            let entry = self.entry(idx);
            if entry.key == key {
                return Some(idx);
            }
            cursor = entry.chain;
        }
        None
    }

    /// Unlinks an entry from the recency list.
    fn detach(&mut self, idx: usize) {
        let (prev, next) = {
            let entry = self.entry(idx);
            (entry.prev, entry.next)
        };
        match prev {
            Some(p) => self.entry_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.entry_mut(n).prev = prev,
            None => self.tail = prev,
        }
        let entry = self.entry_mut(idx);
        entry.prev = None;
        entry.next = None;
    }

    /// Links a detached entry at the most recently used position.
    fn attach_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let entry = self.entry_mut(idx);
            entry.prev = None;
            entry.next = old_head;
        }
        if let Some(h) = old_head {
            self.entry_mut(h).prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    /// Moves an entry to the most recently used position.
    fn promote(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.detach(idx);
        self.attach_front(idx);
    }

    /// Removes an entry from its bucket chain via the dedicated chain
    /// links, leaving collided neighbors intact.
    fn unlink_chain(&mut self, idx: usize) {
        let bucket = Self::bucket_index(&self.entry(idx).key);
        let successor = self.entry(idx).chain;
        if self.buckets[bucket] == Some(idx) {
            self.buckets[bucket] = successor;
            self.entry_mut(idx).chain = None;
            return;
        }
        let mut cursor = self.buckets[bucket];
        while let Some(cur) = cursor {
            let next_in_chain = self.entry(cur).chain;
            if next_in_chain == Some(idx) {
                self.entry_mut(cur).chain = successor;
                self.entry_mut(idx).chain = None;
                return;
            }
            cursor = next_in_chain;
        }
        // The chains and the recency list disagree; the entry is gone from
        // its bucket already, so removal proceeds without touching chains.
        error!(bucket, "entry missing from its hash bucket chain");
    }

    /// Evicts the least recently used entry, returning its key.
    fn evict_lru(&mut self) -> Option<String> {
        let idx = self.tail?;
        self.detach(idx);
        self.unlink_chain(idx);
        let entry = self.slots[idx]
            .take()
            .expect("tail index refers to a free slot");
        self.total_size -= entry.len();
        self.free.push(idx);
        self.stats.record_eviction();
        Some(entry.key)
    }

    // == Test Helpers ==
    #[cfg(test)]
    pub(crate) fn mru_key(&self) -> Option<&str> {
        self.head.map(|idx| self.entry(idx).key())
    }

    #[cfg(test)]
    pub(crate) fn lru_key(&self) -> Option<&str> {
        self.tail.map(|idx| self.entry(idx).key())
    }
}
