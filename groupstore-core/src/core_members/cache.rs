//! Membership cache
//!
//! Memoizes resolved member sets and enclosing-group sets. Invalidation is
//! all-or-nothing: any successful add or remove clears every entry.
//!
//! Every clear bumps a generation counter. A result computed while a clear
//! happened carries the old generation and is dropped on insert, so a
//! resolution racing with a mutation can never re-populate the cache with a
//! pre-mutation result.

use super::types::{Authorizable, MemberFilter};
use crate::core_store::NodeId;
use crate::metrics::record_counter;
use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};
use tracing::trace;

/// Shape of a cached query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Members of a group
    Members {
        group: NodeId,
        indirect: bool,
        filter: MemberFilter,
    },
    /// Groups enclosing an authorizable
    MemberOf { authorizable: NodeId, inherited: bool },
}

#[derive(Debug, Default)]
struct CacheState {
    generation: u64,
    entries: HashMap<CacheKey, HashSet<Authorizable>>,
}

/// Shared memo of membership queries
///
/// One instance is shared by every group of a manager; tests create their
/// own.
#[derive(Debug, Default)]
pub struct MembershipCache {
    state: RwLock<CacheState>,
}

impl MembershipCache {
    pub fn new() -> Self {
        Self::default()
    }

    // The cache only holds derived data, so a poisoned lock still guards a
    // usable map.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current generation; pass it to [`insert`](Self::insert) with the
    /// result computed after reading it
    pub fn generation(&self) -> u64 {
        self.read().generation
    }

    pub fn get(&self, key: &CacheKey) -> Option<HashSet<Authorizable>> {
        let hit = self.read().entries.get(key).cloned();
        if hit.is_some() {
            record_counter("membership.cache.hit", 1);
        } else {
            record_counter("membership.cache.miss", 1);
        }
        hit
    }

    /// Store a result computed at `generation`
    ///
    /// Returns false (and stores nothing) if the cache was cleared since.
    pub fn insert(&self, key: CacheKey, value: HashSet<Authorizable>, generation: u64) -> bool {
        let mut state = self.write();
        if state.generation != generation {
            trace!("Discarding stale membership result for {:?}", key);
            return false;
        }
        state.entries.insert(key, value);
        true
    }

    /// Drop every entry
    pub fn clear(&self) {
        let mut state = self.write();
        state.entries.clear();
        state.generation += 1;
        record_counter("membership.cache.clear", 1);
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(group: &str) -> CacheKey {
        CacheKey::Members {
            group: NodeId::new(group),
            indirect: true,
            filter: MemberFilter::All,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let cache = MembershipCache::new();
        assert!(cache.get(&key("g")).is_none());

        let generation = cache.generation();
        assert!(cache.insert(key("g"), HashSet::new(), generation));
        assert_eq!(cache.get(&key("g")), Some(HashSet::new()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear_drops_everything() {
        let cache = MembershipCache::new();
        let generation = cache.generation();
        cache.insert(key("a"), HashSet::new(), generation);
        cache.insert(key("b"), HashSet::new(), generation);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get(&key("a")).is_none());
    }

    #[test]
    fn test_stale_insert_rejected() {
        let cache = MembershipCache::new();
        let before = cache.generation();
        // a mutation lands while the result is being computed
        cache.clear();

        assert!(!cache.insert(key("g"), HashSet::new(), before));
        assert!(cache.get(&key("g")).is_none());
        assert!(cache.insert(key("g"), HashSet::new(), cache.generation()));
    }

    #[test]
    fn test_keys_distinguish_query_shape() {
        let cache = MembershipCache::new();
        let generation = cache.generation();
        cache.insert(key("g"), HashSet::new(), generation);

        let declared = CacheKey::Members {
            group: NodeId::new("g"),
            indirect: false,
            filter: MemberFilter::All,
        };
        assert!(cache.get(&declared).is_none());
    }
}
