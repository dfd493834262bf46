//! Panel instance cache
//!
//! Two indices keyed by panel kind:
//!
//! - **opened**: every kind that has been opened at least once and not yet destroyed.
//!   Unbounded; entries leave only through close policy or hotness decay.
//! - **preloaded**: instantiated-but-never-opened panels. Bounded by `capacity` and evicted in
//!   least-recently-accessed order. An entry is promoted into `opened` the first time it is
//!   requested and never goes back.
//!
//! A kind is present in at most one of the two indices at any time. The cache only tracks
//! handler ids; destroying instances is left to the manager, which owns the render host.

use std::collections::HashMap;
use std::time::Duration;

use lru::LruCache;

use crate::panel::{CacheMode, HandlerId, HandlerPool, PanelKey, PanelState};

/// Preloaded cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreloadEntry {
    pub handler: HandlerId,
    /// Access tick of the last preload request or refresh
    pub accessed: u64,
}

#[derive(Debug)]
pub struct PanelCache {
    opened: HashMap<PanelKey, HandlerId>,
    preloaded: LruCache<PanelKey, PreloadEntry>,
    capacity: usize,
    access_clock: u64,
    decay_interval: Duration,
    decay_elapsed: Duration,
    hot_weaken: i32,
}

impl PanelCache {
    pub fn new(capacity: usize, decay_interval: Duration, hot_weaken: i32) -> Self {
        Self {
            opened: HashMap::new(),
            preloaded: LruCache::unbounded(),
            capacity: capacity.max(1),
            access_clock: 0,
            decay_interval,
            decay_elapsed: Duration::ZERO,
            hot_weaken,
        }
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Look up a cached handler, promoting a preloaded hit into the opened index
    pub fn try_get(&mut self, key: &PanelKey) -> Option<HandlerId> {
        if let Some(id) = self.opened.get(key) {
            tracing::debug!("Cache hit for {} (opened)", key);
            return Some(*id);
        }
        let entry = self.preloaded.pop(key)?;
        tracing::debug!("Cache hit for {} (preloaded), promoting", key);
        self.opened.insert(key.clone(), entry.handler);
        Some(entry.handler)
    }

    pub fn opened(&self, key: &PanelKey) -> Option<HandlerId> {
        self.opened.get(key).copied()
    }

    pub fn preloaded(&self, key: &PanelKey) -> Option<PreloadEntry> {
        self.preloaded.peek(key).copied()
    }

    pub fn is_opened(&self, key: &PanelKey) -> bool {
        self.opened.contains_key(key)
    }

    pub fn is_preloaded(&self, key: &PanelKey) -> bool {
        self.preloaded.contains(key)
    }

    // ========================================================================
    // Preloaded index
    // ========================================================================

    /// Refresh the access time of a preloaded entry, returning whether it exists
    pub(crate) fn touch_preloaded(&mut self, key: &PanelKey) -> bool {
        let tick = self.next_access();
        match self.preloaded.get_mut(key) {
            Some(entry) => {
                entry.accessed = tick;
                true
            }
            None => false,
        }
    }

    /// Whether inserting one more preloaded entry requires an eviction first
    pub(crate) fn preload_needs_room(&self) -> bool {
        self.preloaded.len() >= self.capacity
    }

    /// Least recently accessed preloaded entry
    pub(crate) fn lru_victim(&self) -> Option<(PanelKey, HandlerId)> {
        self.preloaded
            .peek_lru()
            .map(|(key, entry)| (key.clone(), entry.handler))
    }

    pub(crate) fn insert_preloaded(&mut self, key: PanelKey, handler: HandlerId) {
        let accessed = self.next_access();
        debug_assert!(!self.opened.contains_key(&key));
        self.preloaded.put(key, PreloadEntry { handler, accessed });
    }

    pub(crate) fn remove_preloaded(&mut self, key: &PanelKey) -> Option<HandlerId> {
        self.preloaded.pop(key).map(|entry| entry.handler)
    }

    // ========================================================================
    // Opened index
    // ========================================================================

    pub(crate) fn insert_opened(&mut self, key: PanelKey, handler: HandlerId) {
        debug_assert!(!self.preloaded.contains(&key));
        if let Some(previous) = self.opened.insert(key.clone(), handler) {
            if previous != handler {
                tracing::warn!("Opened cache entry for {} replaced ({})", key, previous);
            }
        }
    }

    /// Drop whichever index entry references `handler`
    pub(crate) fn forget(&mut self, key: &PanelKey, handler: HandlerId) {
        if self.opened.get(key) == Some(&handler) {
            self.opened.remove(key);
        }
        if self.preloaded.peek(key).map(|e| e.handler) == Some(handler) {
            self.preloaded.pop(key);
        }
    }

    // ========================================================================
    // Hotness decay
    // ========================================================================

    /// Accumulate `delta` and weaken every opened handler once per elapsed interval
    ///
    /// Returns the handlers that became eligible for destruction: hotness at or below zero,
    /// closed, and not persistent.
    pub(crate) fn decay(&mut self, delta: Duration, pool: &mut HandlerPool) -> Vec<HandlerId> {
        self.decay_elapsed += delta;
        let interval = self.decay_interval.as_nanos();
        if interval == 0 {
            return Vec::new();
        }

        let elapsed = self.decay_elapsed.as_nanos();
        let steps = elapsed / interval;
        if steps == 0 {
            return Vec::new();
        }
        self.decay_elapsed = Duration::from_nanos((elapsed % interval) as u64);

        let steps = i32::try_from(steps).unwrap_or(i32::MAX);
        let weaken = self.hot_weaken.saturating_mul(steps);
        let mut expired = Vec::new();
        for (key, id) in &self.opened {
            let Some(handler) = pool.get_mut(*id) else {
                continue;
            };
            handler.hot = handler.hot.saturating_sub(weaken).max(0);
            if handler.hot <= 0
                && handler.state == PanelState::Closed
                && handler.cache_mode != CacheMode::Persistent
            {
                tracing::debug!("Panel {} cooled down, scheduling destruction", key);
                expired.push(*id);
            }
        }
        expired
    }

    /// Time accumulated toward the next decay step
    pub fn decay_elapsed(&self) -> Duration {
        self.decay_elapsed
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn opened_len(&self) -> usize {
        self.opened.len()
    }

    pub fn preloaded_len(&self) -> usize {
        self.preloaded.len()
    }

    /// Opened entries sorted by key
    pub fn opened_entries(&self) -> Vec<(PanelKey, HandlerId)> {
        let mut entries: Vec<_> = self
            .opened
            .iter()
            .map(|(key, id)| (key.clone(), *id))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Preloaded keys, least recently accessed first
    pub fn preloaded_keys(&self) -> Vec<PanelKey> {
        self.preloaded.iter().rev().map(|(key, _)| key.clone()).collect()
    }

    pub(crate) fn clear(&mut self) {
        self.opened.clear();
        self.preloaded.clear();
        self.decay_elapsed = Duration::ZERO;
    }

    fn next_access(&mut self) -> u64 {
        self.access_clock += 1;
        self.access_clock
    }
}
