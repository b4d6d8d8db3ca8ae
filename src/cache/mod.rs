//! Time-boxed memoization of provider reads.
//!
//! Entries expire purely by age; there is no size bound. A cache is owned by
//! exactly one session and is never shared.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use crate::domain::content::{CanonicalFilters, canonical_filters};
use crate::domain::{Collection, ContentLookup, ContentQuery};

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    captured_at: Instant,
}

/// A map whose entries stay valid while `now - captured_at < ttl`.
#[derive(Debug, Clone)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: HashMap<K, Entry<V>>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&mut self, key: &K) -> Option<V> {
        self.lookup_at(key, Instant::now())
    }

    /// Look `key` up as of `now`. Expired entries are evicted on the way.
    pub fn lookup_at(&mut self, key: &K, now: Instant) -> Option<V> {
        let entry = self.entries.get(key)?;
        if now.saturating_duration_since(entry.captured_at) < self.ttl {
            return Some(entry.value.clone());
        }
        self.entries.remove(key);
        None
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    pub fn insert_at(&mut self, key: K, value: V, captured_at: Instant) {
        self.entries.insert(key, Entry { value, captured_at });
    }

    pub fn invalidate(&mut self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop every entry whose key matches `predicate`. Returns how many went.
    pub fn invalidate_where(&mut self, mut predicate: impl FnMut(&K) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !predicate(key));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cache key: the collection plus the order-independent filter set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub collection: Collection,
    /// Set for single-record lookups, which live apart from list reads.
    pub single: bool,
    pub canonical: CanonicalFilters,
}

impl CacheKey {
    #[must_use]
    pub fn for_query(query: &ContentQuery) -> Self {
        Self {
            collection: query.collection(),
            single: false,
            canonical: canonical_filters(&query.filters()),
        }
    }

    #[must_use]
    pub fn for_lookup(lookup: &ContentLookup) -> Self {
        Self {
            collection: lookup.collection(),
            single: true,
            canonical: canonical_filters(&lookup.filters()),
        }
    }
}
