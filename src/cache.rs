//! Bounded, thread-safe cache of resolved field tables.
//!
//! ## Layout
//!
//! Entries live in a slot arena threaded by a doubly linked recency list
//! (head = most recently used, tail = next victim). A hash index maps each
//! struct's type name to its slot. All three are guarded by one mutex; field
//! resolution itself runs outside the lock, so two threads missing on the same
//! type may both resolve it, and the second insert collapses onto the first.
//!
//! Entries are keyed by [`Struct::type_name`]. That string is not a guaranteed
//! unique type identity: two types reporting the same name share one table.
//!
//! ```text
//! index: { "app::User" -> 2, "app::Address" -> 0 }
//! slots: [ Address | free | User ]
//! order: head -> User <-> Address <- tail
//! ```

use std::collections::HashMap;
use std::hash::BuildHasherDefault;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use serde::Serialize;
use twox_hash::XxHash64;

use crate::error::{JsonGroupError, Result};
use crate::options::DEFAULT_CACHE_CAPACITY;
use crate::reflect::Struct;
use crate::resolver::{resolve, FieldInfo};
use crate::rt::StructShape;

type IndexMap = HashMap<&'static str, usize, BuildHasherDefault<XxHash64>>;

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    /// Resident entries.
    pub size: usize,
    /// Maximum resident entries, `0` when caching is disabled.
    pub capacity: usize,
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that had to resolve.
    pub misses: u64,
    /// Entries dropped to honour the capacity.
    pub evictions: u64,
    /// `hits / (hits + misses)`, `0.0` before the first lookup.
    pub hit_ratio: f64,
}

struct CacheEntry {
    type_name: &'static str,
    tag_key: String,
    fields: Arc<[FieldInfo]>,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Default)]
struct LruState {
    index: IndexMap,
    slots: Vec<Option<CacheEntry>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    capacity: usize,
}

impl LruState {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn overflow(&self, detail: impl Into<String>) -> JsonGroupError {
        let detail = detail.into();
        tracing::warn!(capacity = self.capacity, %detail, "field cache inconsistent");
        JsonGroupError::CacheOverflow {
            capacity: self.capacity,
            detail,
        }
    }

    fn entry_mut(&mut self, slot: usize) -> Result<&mut CacheEntry> {
        let capacity = self.capacity;
        self.slots
            .get_mut(slot)
            .and_then(Option::as_mut)
            .ok_or_else(|| JsonGroupError::CacheOverflow {
                capacity,
                detail: format!("slot {slot} is indexed but empty"),
            })
    }

    fn unlink(&mut self, slot: usize) -> Result<()> {
        let (prev, next) = {
            let e = self.entry_mut(slot)?;
            let links = (e.prev, e.next);
            e.prev = None;
            e.next = None;
            links
        };
        match prev {
            Some(p) => self.entry_mut(p)?.next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.entry_mut(n)?.prev = prev,
            None => self.tail = prev,
        }
        Ok(())
    }

    fn push_front(&mut self, slot: usize) -> Result<()> {
        let old_head = self.head;
        {
            let e = self.entry_mut(slot)?;
            e.prev = None;
            e.next = old_head;
        }
        match old_head {
            Some(h) => self.entry_mut(h)?.prev = Some(slot),
            None => self.tail = Some(slot),
        }
        self.head = Some(slot);
        Ok(())
    }

    fn promote(&mut self, slot: usize) -> Result<()> {
        if self.head != Some(slot) {
            self.unlink(slot)?;
            self.push_front(slot)?;
        }
        Ok(())
    }

    fn lookup(&mut self, type_name: &str, tag_key: &str) -> Result<Option<Arc<[FieldInfo]>>> {
        let Some(&slot) = self.index.get(type_name) else {
            return Ok(None);
        };
        let entry = self.entry_mut(slot)?;
        if entry.tag_key != tag_key {
            return Ok(None);
        }
        let fields = Arc::clone(&entry.fields);
        self.promote(slot)?;
        Ok(Some(fields))
    }

    /// Stores `fields` unless an entry for the same type and tag key won the race.
    fn insert(
        &mut self,
        type_name: &'static str,
        tag_key: &str,
        fields: Arc<[FieldInfo]>,
    ) -> Result<(Arc<[FieldInfo]>, u64)> {
        if let Some(&slot) = self.index.get(type_name) {
            let entry = self.entry_mut(slot)?;
            if entry.tag_key != tag_key {
                entry.tag_key = tag_key.to_owned();
                entry.fields = Arc::clone(&fields);
            }
            let resident = Arc::clone(&entry.fields);
            self.promote(slot)?;
            return Ok((resident, 0));
        }

        if self.capacity == 0 {
            return Ok((fields, 0));
        }

        let mut evicted = 0;
        while self.len() >= self.capacity {
            self.evict_lru()?;
            evicted += 1;
        }

        let entry = CacheEntry {
            type_name,
            tag_key: tag_key.to_owned(),
            fields: Arc::clone(&fields),
            prev: None,
            next: None,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(entry);
                slot
            }
            None => {
                self.slots.push(Some(entry));
                self.slots.len() - 1
            }
        };
        self.push_front(slot)?;
        self.index.insert(type_name, slot);
        Ok((fields, evicted))
    }

    fn evict_lru(&mut self) -> Result<()> {
        let Some(slot) = self.tail else {
            return Err(self.overflow(format!(
                "{} entries indexed but the recency list is empty",
                self.len()
            )));
        };
        self.unlink(slot)?;
        let Some(entry) = self.slots.get_mut(slot).and_then(Option::take) else {
            return Err(self.overflow(format!("tail slot {slot} is empty")));
        };
        match self.index.get(entry.type_name) {
            Some(&indexed) if indexed == slot => {
                self.index.remove(entry.type_name);
            }
            _ => {
                return Err(self.overflow(format!(
                    "evicted {} from slot {slot} but the index disagrees",
                    entry.type_name
                )));
            }
        }
        self.free.push(slot);
        tracing::debug!(type_name = entry.type_name, "evicted field table");
        Ok(())
    }

    fn verify(&self) -> Result<()> {
        let mut seen = 0usize;
        let mut cursor = self.head;
        let mut prev = None;
        while let Some(slot) = cursor {
            let Some(entry) = self.slots.get(slot).and_then(Option::as_ref) else {
                return Err(self.overflow(format!("recency list reaches empty slot {slot}")));
            };
            if entry.prev != prev {
                return Err(self.overflow(format!("broken back link at slot {slot}")));
            }
            if self.index.get(entry.type_name) != Some(&slot) {
                return Err(self.overflow(format!("{} not indexed at slot {slot}", entry.type_name)));
            }
            seen += 1;
            if seen > self.len() {
                return Err(self.overflow("recency list longer than the index"));
            }
            prev = Some(slot);
            cursor = entry.next;
        }
        if self.tail != prev {
            return Err(self.overflow("tail does not end the recency list"));
        }
        if seen != self.len() {
            return Err(self.overflow(format!(
                "index holds {} entries, recency list {seen}",
                self.len()
            )));
        }
        if self.capacity > 0 && seen > self.capacity {
            return Err(self.overflow(format!("{seen} entries resident")));
        }
        Ok(())
    }
}

/// Memoizes resolved field tables per struct type, evicting the least
/// recently used table once `capacity` is reached.
///
/// ```rust
/// use jsongroup::{FieldCache, GroupObject, Marshaller, Options};
/// use std::sync::Arc;
///
/// #[derive(GroupObject)]
/// struct Point {
///     pub x: i32,
///     pub y: i32,
/// }
///
/// let cache = Arc::new(FieldCache::new(16));
/// let m = Marshaller::with_cache(Options::default(), Arc::clone(&cache));
/// m.marshal(&Point { x: 1, y: 2 }, &[]).unwrap();
/// m.marshal(&Point { x: 3, y: 4 }, &[]).unwrap();
///
/// let stats = cache.stats();
/// assert_eq!((stats.size, stats.hits, stats.misses), (1, 1, 1));
/// ```
pub struct FieldCache {
    state: Mutex<LruState>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl std::fmt::Debug for FieldCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("FieldCache")
            .field("size", &stats.size)
            .field("capacity", &stats.capacity)
            .finish()
    }
}

impl Default for FieldCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl FieldCache {
    /// Creates an empty cache holding at most `capacity` tables (`0` disables caching).
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(LruState::with_capacity(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Field table of `target`'s type, resolving and caching it on a miss.
    pub fn fields(&self, target: &dyn Struct, tag_key: &str) -> Result<Arc<[FieldInfo]>> {
        self.get_or_resolve(target.type_name(), tag_key, || target.shape())
    }

    /// Field table for `type_name`, building the shape only on a miss.
    pub fn get_or_resolve<F>(
        &self,
        type_name: &'static str,
        tag_key: &str,
        shape: F,
    ) -> Result<Arc<[FieldInfo]>>
    where
        F: FnOnce() -> StructShape,
    {
        if let Some(fields) = self.lock().lookup(type_name, tag_key)? {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(fields);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        // Resolve without holding the lock.
        let resolved: Arc<[FieldInfo]> = resolve(&shape(), tag_key)
            .map_err(|cause| JsonGroupError::reflection("", cause))?
            .into();
        tracing::debug!(type_name, tag_key, fields = resolved.len(), "resolved field table");

        let (fields, evicted) = self.lock().insert(type_name, tag_key, resolved)?;
        if evicted > 0 {
            self.evictions.fetch_add(evicted, Ordering::Relaxed);
        }
        Ok(fields)
    }

    /// Drops every entry and resets the counters.
    pub fn clear(&self) {
        let mut state = self.lock();
        let capacity = state.capacity;
        *state = LruState::with_capacity(capacity);
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        tracing::debug!("field cache cleared");
    }

    /// Changes the capacity, evicting least recently used entries down to the
    /// new bound before returning. `0` disables caching and empties the cache.
    pub fn set_capacity(&self, capacity: usize) -> Result<()> {
        let mut state = self.lock();
        state.capacity = capacity;
        let mut evicted = 0;
        while state.len() > capacity {
            state.evict_lru()?;
            evicted += 1;
        }
        drop(state);
        if evicted > 0 {
            self.evictions.fetch_add(evicted, Ordering::Relaxed);
        }
        tracing::debug!(capacity, evicted, "field cache capacity changed");
        Ok(())
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStats {
        let (size, capacity) = {
            let state = self.lock();
            (state.len(), state.capacity)
        };
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            size,
            capacity,
            hits,
            misses,
            evictions: self.evictions.load(Ordering::Relaxed),
            hit_ratio: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
        }
    }

    /// Whether a table for `type_name` is resident. Does not touch recency.
    pub fn contains(&self, type_name: &str) -> bool {
        self.lock().index.contains_key(type_name)
    }

    /// Walks the recency list and checks it against the index and the capacity.
    pub fn verify(&self) -> Result<()> {
        self.lock().verify()
    }
}

/// The process-wide cache used by the free functions.
pub fn global() -> &'static FieldCache {
    static GLOBAL: OnceLock<FieldCache> = OnceLock::new();
    GLOBAL.get_or_init(FieldCache::default)
}
