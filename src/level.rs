//! Layer ordering and modal blocking
//!
//! Every registered panel sits in the bucket of its level. Within a bucket panels are ordered
//! by `(sub_level, open_timestamp)` ascending, and the host's sibling indices are rewritten to
//! match that order exactly, bottom first.
//!
//! Each visible modal panel owns one blocker node placed directly beneath it. Blockers come
//! from a pool and are only deactivated when released. Input reachability is recomputed from
//! scratch after every change: scanning from the topmost panel down, everything below the
//! first visible modal stops receiving input.

use std::collections::{BTreeMap, HashMap};

use crate::host::{NodeId, RenderHost};
use crate::panel::{HandlerId, HandlerPool};

/// Pooled modal blocker nodes
#[derive(Debug, Default)]
struct BlockerPool {
    free: Vec<NodeId>,
    assigned: HashMap<HandlerId, NodeId>,
}

impl BlockerPool {
    fn acquire(&mut self, owner: HandlerId, host: &mut dyn RenderHost) -> NodeId {
        if let Some(node) = self.assigned.get(&owner) {
            return *node;
        }
        let node = match self.free.pop() {
            Some(node) => node,
            None => {
                let node = host.create_blocker();
                tracing::debug!("Created modal blocker {:?}", node);
                node
            }
        };
        self.assigned.insert(owner, node);
        node
    }

    fn release(&mut self, owner: HandlerId, host: &mut dyn RenderHost) {
        if let Some(node) = self.assigned.remove(&owner) {
            host.set_active(node, false);
            self.free.push(node);
        }
    }
}

#[derive(Debug, Default)]
pub struct LevelManager {
    buckets: BTreeMap<i32, Vec<HandlerId>>,
    blockers: BlockerPool,
    clock: u64,
}

impl LevelManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a panel to the bucket of its level and stamp its open time
    pub(crate) fn register(
        &mut self,
        id: HandlerId,
        pool: &mut HandlerPool,
        host: &mut dyn RenderHost,
    ) {
        if let Some(previous) = self.level_of(id) {
            self.detach(id, previous);
        }
        let stamp = self.stamp();
        let Some(handler) = pool.get_mut(id) else {
            return;
        };
        handler.open_timestamp = stamp;
        let level = handler.level;
        if let Some(node) = handler.node {
            let container = host.layer_container(level);
            host.set_parent(node, container);
        }
        tracing::debug!("Registered {} on level {}", handler.key, level);

        self.buckets.entry(level).or_default().push(id);
        self.sort_level(level, pool, host);
        self.update_interactivity(pool, host);
    }

    /// Remove a panel from its bucket and release its blocker
    pub(crate) fn unregister(
        &mut self,
        id: HandlerId,
        pool: &mut HandlerPool,
        host: &mut dyn RenderHost,
    ) {
        self.blockers.release(id, host);
        if let Some(level) = self.level_of(id) {
            self.detach(id, level);
            self.sort_level(level, pool, host);
        }
        if let Some(handler) = pool.get_mut(id) {
            handler.interactive = true;
            if let Some(node) = handler.node {
                host.set_interactive(node, true);
            }
        }
        self.update_interactivity(pool, host);
    }

    /// Move a panel to another level, re-stamping it and re-parenting its node
    pub(crate) fn set_level(
        &mut self,
        id: HandlerId,
        level: i32,
        sub_level: i32,
        pool: &mut HandlerPool,
        host: &mut dyn RenderHost,
    ) {
        let registered_on = self.level_of(id);
        let stamp = self.stamp();
        let Some(handler) = pool.get_mut(id) else {
            return;
        };
        let old_level = handler.level;
        handler.level = level;
        handler.sub_level = sub_level;
        if let Some(node) = handler.node {
            let container = host.layer_container(level);
            host.set_parent(node, container);
        }

        let Some(current) = registered_on else {
            return;
        };
        handler.open_timestamp = stamp;
        tracing::debug!(
            "Moved {} from level {} to {} (sub level {})",
            handler.key,
            old_level,
            level,
            sub_level
        );
        self.detach(id, current);
        self.buckets.entry(level).or_default().push(id);
        if current != level {
            self.sort_level(current, pool, host);
            // The blocker follows its owner into the new container
            self.blockers.release(id, host);
        }
        self.sort_level(level, pool, host);
        self.update_interactivity(pool, host);
    }

    /// Stable sort of one bucket, then rewrite sibling indices and blocker placement
    pub(crate) fn sort_level(
        &mut self,
        level: i32,
        pool: &mut HandlerPool,
        host: &mut dyn RenderHost,
    ) {
        let Self {
            buckets, blockers, ..
        } = self;
        let Some(bucket) = buckets.get_mut(&level) else {
            return;
        };
        bucket.sort_by_key(|id| {
            pool.get(*id)
                .map(|h| (h.sub_level, h.open_timestamp))
                .unwrap_or((i32::MAX, u64::MAX))
        });

        let container = host.layer_container(level);
        let mut index = 0;
        for id in bucket.iter() {
            let Some(handler) = pool.get(*id) else {
                continue;
            };
            let Some(node) = handler.node else {
                continue;
            };
            if handler.is_modal && handler.state.is_visible() {
                let blocker = blockers.acquire(*id, host);
                host.set_parent(blocker, container);
                host.stretch_to_parent(blocker);
                host.set_active(blocker, true);
                host.set_sibling_index(blocker, index);
                index += 1;
            } else {
                blockers.release(*id, host);
            }
            host.set_sibling_index(node, index);
            index += 1;
        }
    }

    /// Re-evaluate blockers and input after a visibility or modal flag change
    pub(crate) fn refresh(&mut self, id: HandlerId, pool: &mut HandlerPool, host: &mut dyn RenderHost) {
        if let Some(level) = self.level_of(id) {
            self.sort_level(level, pool, host);
        }
        self.update_interactivity(pool, host);
    }

    /// Top-down scan disabling input below the first visible modal
    pub(crate) fn update_interactivity(&self, pool: &mut HandlerPool, host: &mut dyn RenderHost) {
        let mut blocked = false;
        for bucket in self.buckets.values().rev() {
            for id in bucket.iter().rev() {
                let Some(handler) = pool.get_mut(*id) else {
                    continue;
                };
                let interactive = !blocked;
                handler.interactive = interactive;
                if let Some(node) = handler.node {
                    host.set_interactive(node, interactive);
                }
                if handler.is_modal && handler.state.is_visible() {
                    blocked = true;
                }
            }
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Panels on `level`, bottom first
    pub fn panels(&self, level: i32) -> &[HandlerId] {
        self.buckets.get(&level).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Levels that currently hold at least one panel, lowest first
    pub fn levels(&self) -> Vec<i32> {
        self.buckets
            .iter()
            .filter(|(_, bucket)| !bucket.is_empty())
            .map(|(level, _)| *level)
            .collect()
    }

    pub fn level_of(&self, id: HandlerId) -> Option<i32> {
        self.buckets
            .iter()
            .find(|(_, bucket)| bucket.contains(&id))
            .map(|(level, _)| *level)
    }

    pub fn contains(&self, id: HandlerId) -> bool {
        self.level_of(id).is_some()
    }

    /// Blocker node currently owned by `id`
    pub fn blocker_of(&self, id: HandlerId) -> Option<NodeId> {
        self.blockers.assigned.get(&id).copied()
    }

    pub fn active_blockers(&self) -> usize {
        self.blockers.assigned.len()
    }

    /// Destroy every pooled blocker and forget all buckets
    pub(crate) fn clear(&mut self, host: &mut dyn RenderHost) {
        for (_, node) in self.blockers.assigned.drain() {
            host.destroy(node);
        }
        for node in self.blockers.free.drain(..) {
            host.destroy(node);
        }
        self.buckets.clear();
    }

    fn detach(&mut self, id: HandlerId, level: i32) {
        if let Some(bucket) = self.buckets.get_mut(&level) {
            bucket.retain(|other| *other != id);
            if bucket.is_empty() {
                self.buckets.remove(&level);
            }
        }
    }

    fn stamp(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}
