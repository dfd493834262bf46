//! Panel handlers and the slot-reusing handler pool
//!
//! A handler is the metadata record every subsystem operates on. It is bound 1:1 to one panel
//! instance for the instance's whole cached lifetime and is recycled when the instance is
//! destroyed. Recycled slots are reused, so handler ids carry a generation to keep stale ids
//! from aliasing a newer handler.

use std::fmt;

use serde::Serialize;
use slab::Slab;

use super::{CacheMode, Panel, PanelData, PanelKey, PanelState};
use crate::host::NodeId;

/// Generational reference to a pooled handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct HandlerId {
    slot: usize,
    generation: u64,
}

impl HandlerId {
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.slot, self.generation)
    }
}

/// Membership of a handler in a named stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackBinding {
    pub stack: String,
    /// Index of the node in the stack arena
    pub(crate) node: usize,
}

/// Per-instance metadata record
pub struct PanelHandler {
    pub(crate) id: HandlerId,
    pub(crate) key: PanelKey,
    pub(crate) level: i32,
    pub(crate) sub_level: i32,
    pub(crate) hot: i32,
    pub(crate) cache_mode: CacheMode,
    pub(crate) is_modal: bool,
    pub(crate) open_timestamp: u64,
    pub(crate) stack: Option<StackBinding>,
    pub(crate) data: PanelData,
    pub(crate) state: PanelState,
    pub(crate) node: Option<NodeId>,
    pub(crate) interactive: bool,
    pub(crate) auto_focus: bool,
    pub(crate) default_focus: Option<NodeId>,
    /// Whether `init` already ran (preloaded instances defer it to their first open)
    pub(crate) initialized: bool,
    pub(crate) panel: Option<Box<dyn Panel>>,
}

impl PanelHandler {
    fn new(id: HandlerId, key: PanelKey) -> Self {
        Self {
            id,
            key,
            level: 0,
            sub_level: 0,
            hot: 0,
            cache_mode: CacheMode::default(),
            is_modal: false,
            open_timestamp: 0,
            stack: None,
            data: PanelData::Null,
            state: PanelState::Closed,
            node: None,
            interactive: true,
            auto_focus: true,
            default_focus: None,
            initialized: false,
            panel: None,
        }
    }

    pub fn id(&self) -> HandlerId {
        self.id
    }

    pub fn key(&self) -> &PanelKey {
        &self.key
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn sub_level(&self) -> i32 {
        self.sub_level
    }

    pub fn hot(&self) -> i32 {
        self.hot
    }

    pub fn cache_mode(&self) -> CacheMode {
        self.cache_mode
    }

    pub fn is_modal(&self) -> bool {
        self.is_modal
    }

    pub fn open_timestamp(&self) -> u64 {
        self.open_timestamp
    }

    /// Name of the stack this panel is pushed on, if any
    pub fn stack_name(&self) -> Option<&str> {
        self.stack.as_ref().map(|b| b.stack.as_str())
    }

    pub fn data(&self) -> &PanelData {
        &self.data
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    /// Root node of the panel's render instance (None until instantiated)
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// Whether input currently reaches this panel (false when covered by a modal)
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn default_focus(&self) -> Option<NodeId> {
        self.default_focus
    }

    /// Run `f` against the panel behaviour, if the instance exists
    pub(crate) fn with_panel(&mut self, f: impl FnOnce(&mut dyn Panel)) {
        if let Some(panel) = self.panel.as_deref_mut() {
            f(panel);
        }
    }
}

impl fmt::Debug for PanelHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanelHandler")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("level", &self.level)
            .field("sub_level", &self.sub_level)
            .field("hot", &self.hot)
            .field("cache_mode", &self.cache_mode)
            .field("is_modal", &self.is_modal)
            .field("open_timestamp", &self.open_timestamp)
            .field("stack", &self.stack)
            .field("state", &self.state)
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}

/// Pool of handlers; freed slots are reused by later allocations
#[derive(Debug, Default)]
pub struct HandlerPool {
    slots: Slab<PanelHandler>,
    next_generation: u64,
}

impl HandlerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh handler for `key` with every field reset
    pub(crate) fn allocate(&mut self, key: PanelKey) -> HandlerId {
        let generation = self.next_generation;
        self.next_generation += 1;
        let entry = self.slots.vacant_entry();
        let id = HandlerId {
            slot: entry.key(),
            generation,
        };
        entry.insert(PanelHandler::new(id, key));
        id
    }

    /// Return a handler to the pool, handing back its last state
    pub(crate) fn recycle(&mut self, id: HandlerId) -> Option<PanelHandler> {
        if !self.contains(id) {
            return None;
        }
        Some(self.slots.remove(id.slot))
    }

    pub fn get(&self, id: HandlerId) -> Option<&PanelHandler> {
        self.slots.get(id.slot).filter(|h| h.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: HandlerId) -> Option<&mut PanelHandler> {
        self.slots.get_mut(id.slot).filter(|h| h.id == id)
    }

    pub fn contains(&self, id: HandlerId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PanelHandler> {
        self.slots.iter().map(|(_, h)| h)
    }

    pub(crate) fn ids(&self) -> Vec<HandlerId> {
        self.iter().map(|h| h.id).collect()
    }
}
