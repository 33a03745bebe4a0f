//! In-memory time-to-live cache shared by the manifest fetcher, the freshness
//! resolver and the report coalescer.
//!
//! Every mutation is a single entry replace under one lock, so readers never see a
//! half-written entry. Expired entries are kept so callers can opt into serving them
//! (stale-while-revalidate) or compare a fresh value against the previous one, until
//! the cache reaches its entry limit: inserting a new key into a full cache first drops
//! every expired entry, then the oldest insert if it is still full.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::DEFAULT_CACHE_MAX_ENTRIES;

/// A cached value and the instant it stops being fresh
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    pub value: T,
    pub expires_at: Instant,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn is_fresh(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Result of looking a key up, distinguishing fresh from expired entries
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Fresh(T),
    Stale(T),
    Missing,
}

impl<T> Lookup<T> {
    /// The value only if it is still within its time-to-live
    pub fn fresh(self) -> Option<T> {
        match self {
            Lookup::Fresh(value) => Some(value),
            Lookup::Stale(_) | Lookup::Missing => None,
        }
    }

    /// The value regardless of expiry
    pub fn any(self) -> Option<T> {
        match self {
            Lookup::Fresh(value) | Lookup::Stale(value) => Some(value),
            Lookup::Missing => None,
        }
    }
}

/// A cache entry tagged with its insertion order
struct Slot<V> {
    entry: CacheEntry<V>,
    seq: u64,
}

struct Entries<K, V> {
    slots: HashMap<K, Slot<V>>,
    next_seq: u64,
}

pub struct TtlCache<K, V> {
    entries: Mutex<Entries<K, V>>,
    ttl: Duration,
    max_entries: usize,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self::with_max_entries(ttl, DEFAULT_CACHE_MAX_ENTRIES)
    }

    pub fn with_max_entries(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(Entries {
                slots: HashMap::new(),
                next_seq: 0,
            }),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    fn lock_entries(&self) -> MutexGuard<'_, Entries<K, V>> {
        // A panic while holding the lock cannot leave a half-written entry behind,
        // every write is a single insert.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &K) -> Lookup<V> {
        match self.lock_entries().slots.get(key) {
            Some(slot) if slot.entry.is_fresh() => Lookup::Fresh(slot.entry.value.clone()),
            Some(slot) => Lookup::Stale(slot.entry.value.clone()),
            None => Lookup::Missing,
        }
    }

    /// Store `value`, returning the previous value (fresh or not)
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        let mut entries = self.lock_entries();
        if entries.slots.len() >= self.max_entries && !entries.slots.contains_key(&key) {
            self.evict(&mut entries);
        }

        let seq = entries.next_seq;
        entries.next_seq += 1;
        let slot = Slot {
            entry: CacheEntry::new(value, self.ttl),
            seq,
        };
        entries.slots.insert(key, slot).map(|slot| slot.entry.value)
    }

    /// Make room for one more entry: expired entries first, then the oldest insert
    fn evict(&self, entries: &mut Entries<K, V>) {
        let before = entries.slots.len();
        entries.slots.retain(|_, slot| slot.entry.is_fresh());

        if entries.slots.len() >= self.max_entries {
            let oldest = entries
                .slots
                .iter()
                .min_by_key(|(_, slot)| slot.seq)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                entries.slots.remove(&oldest);
            }
        }

        debug!("Cache full, evicted {} entries", before - entries.slots.len());
    }

    pub fn len(&self) -> usize {
        self.lock_entries().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock_entries().slots.clear();
    }
}
