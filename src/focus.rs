//! Input focus tracking and per-panel focus memory
//!
//! Focus only moves automatically in [`InputMode::Navigation`], where a directional device
//! needs something selected at all times. When a panel hides while it contains the focused
//! node, that node is remembered and handed back when the panel shows again.
//!
//! Target resolution on show, first hit wins:
//! 1. remembered target, if still alive and active
//! 2. the panel's declared default target
//! 3. first active member of a registered fallback group
//! 4. first selectable descendant, depth-first

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::host::{NodeId, RenderHost};
use crate::panel::{HandlerId, PanelHandler};

/// How the user is currently driving input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Mouse/touch; nothing is focused automatically
    #[default]
    Pointer,
    /// Keyboard/gamepad directional navigation
    Navigation,
}

#[derive(Debug, Default)]
pub struct FocusManager {
    mode: InputMode,
    current: Option<NodeId>,
    memory: HashMap<HandlerId, NodeId>,
    groups: HashMap<HandlerId, Vec<NodeId>>,
}

impl FocusManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Switching modes never clears focus; it only changes whether shows auto-focus
    pub(crate) fn set_mode(&mut self, mode: InputMode) {
        if self.mode != mode {
            tracing::debug!("Input mode {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
        }
    }

    pub fn current(&self) -> Option<NodeId> {
        self.current
    }

    pub(crate) fn set_current(&mut self, target: Option<NodeId>) {
        self.current = target;
    }

    pub fn remembered(&self, id: HandlerId) -> Option<NodeId> {
        self.memory.get(&id).copied()
    }

    pub(crate) fn register_group(&mut self, id: HandlerId, members: Vec<NodeId>) {
        self.groups.insert(id, members);
    }

    /// Resolve and apply focus for a panel that just became visible
    pub(crate) fn on_panel_show(
        &mut self,
        handler: &PanelHandler,
        host: &dyn RenderHost,
    ) -> Option<NodeId> {
        if self.mode != InputMode::Navigation || !handler.auto_focus {
            return None;
        }
        let root = handler.node?;
        let usable = |node: &NodeId| host.is_alive(*node) && host.is_active_in_hierarchy(*node);

        let target = self
            .memory
            .remove(&handler.id)
            .filter(usable)
            .or_else(|| handler.default_focus.filter(usable))
            .or_else(|| {
                self.groups
                    .get(&handler.id)
                    .and_then(|group| group.iter().copied().find(usable))
            })
            .or_else(|| host.selectables(root).into_iter().find(usable));

        match target {
            Some(node) => {
                tracing::debug!("Focus -> {:?} on show of {}", node, handler.key);
                self.current = Some(node);
            }
            None => tracing::debug!("No focus target for {}", handler.key),
        }
        target
    }

    /// Remember and clear focus held inside a panel that is hiding
    pub(crate) fn on_panel_hide(&mut self, handler: &PanelHandler, host: &dyn RenderHost) {
        let (Some(root), Some(current)) = (handler.node, self.current) else {
            return;
        };
        if current == root || host.is_descendant(current, root) {
            tracing::debug!("Remembering focus {:?} for {}", current, handler.key);
            self.memory.insert(handler.id, current);
            self.current = None;
        }
    }

    /// Discard memory for a closing panel and drop focus held inside it
    pub(crate) fn on_panel_close(&mut self, handler: &PanelHandler, host: &dyn RenderHost) {
        self.memory.remove(&handler.id);
        let (Some(root), Some(current)) = (handler.node, self.current) else {
            return;
        };
        if current == root || host.is_descendant(current, root) {
            self.current = None;
        }
    }

    /// Forget everything tied to a destroyed handler
    pub(crate) fn forget(&mut self, id: HandlerId) {
        self.memory.remove(&id);
        self.groups.remove(&id);
    }

    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    pub(crate) fn clear(&mut self) {
        self.current = None;
        self.memory.clear();
        self.groups.clear();
    }
}
