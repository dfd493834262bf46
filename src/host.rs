//! Collaborator contracts - the render tree host and the template loader
//!
//! The manager never renders anything itself. It asks a [`RenderHost`] to create, parent,
//! order and toggle nodes, and a [`PanelLoader`] to turn a panel key into an instantiable
//! template. Asynchronous loads report back through a [`LoadCompletion`], which feeds a channel
//! the manager drains on its next `pump`, so a completion never re-enters the caller.

use std::sync::mpsc::Sender;

use serde::{Deserialize, Serialize};

use crate::panel::PanelKey;

/// Node in the host's render tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// Loaded visual template a node can be instantiated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateId(pub u64);

/// Render tree operations the manager relies on
pub trait RenderHost {
    /// Container node for a level, created on first use
    fn layer_container(&mut self, level: i32) -> NodeId;
    /// Create a new node from `template` under `parent`
    fn instantiate(&mut self, template: TemplateId, parent: NodeId) -> Option<NodeId>;
    fn set_name(&mut self, node: NodeId, name: &str);
    /// Re-parent `node`, appending it as the last child of `parent`
    fn set_parent(&mut self, node: NodeId, parent: NodeId);
    /// Move `node` to `index` among its siblings (0 = bottom)
    fn set_sibling_index(&mut self, node: NodeId, index: usize);
    fn set_active(&mut self, node: NodeId, active: bool);
    /// Enable or disable input raycasts on `node`
    fn set_interactive(&mut self, node: NodeId, interactive: bool);
    fn destroy(&mut self, node: NodeId);
    /// Create an input-blocking overlay node (parentless, inactive)
    fn create_blocker(&mut self) -> NodeId;
    /// Size `node` to fill its parent container
    fn stretch_to_parent(&mut self, node: NodeId);

    fn is_alive(&self, node: NodeId) -> bool;
    fn is_active_in_hierarchy(&self, node: NodeId) -> bool;
    fn is_descendant(&self, node: NodeId, ancestor: NodeId) -> bool;
    /// Interactive descendants of `root` in depth-first order
    fn selectables(&self, root: NodeId) -> Vec<NodeId>;
}

/// Turns panel keys into templates
///
/// Failures are reported as `None` (sync) or an empty completion (async), never as panics.
/// A key may be requested again after a failed load.
pub trait PanelLoader {
    fn load(&mut self, key: &PanelKey) -> Option<TemplateId>;
    fn load_async(&mut self, key: &PanelKey, completion: LoadCompletion);
}

/// Result of an asynchronous load, delivered through the manager's channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    pub key: PanelKey,
    pub template: Option<TemplateId>,
}

/// One-shot completion handle for an asynchronous load
///
/// Dropping the handle without completing it reports a failure, so an abandoned load never
/// leaves its key stuck in the loading set.
#[derive(Debug)]
pub struct LoadCompletion {
    key: PanelKey,
    tx: Option<Sender<LoadOutcome>>,
}

impl LoadCompletion {
    pub(crate) fn new(key: PanelKey, tx: Sender<LoadOutcome>) -> Self {
        Self { key, tx: Some(tx) }
    }

    pub fn key(&self) -> &PanelKey {
        &self.key
    }

    pub fn complete(mut self, template: Option<TemplateId>) {
        self.send(template);
    }

    pub fn fail(self) {
        self.complete(None);
    }

    fn send(&mut self, template: Option<TemplateId>) {
        let Some(tx) = self.tx.take() else {
            return;
        };
        let outcome = LoadOutcome {
            key: self.key.clone(),
            template,
        };
        if tx.send(outcome).is_err() {
            tracing::debug!("Load of {} completed after the manager shut down", self.key);
        }
    }
}

impl Drop for LoadCompletion {
    fn drop(&mut self) {
        if self.tx.is_some() {
            tracing::warn!("Load completion for {} dropped without a result", self.key);
            self.send(None);
        }
    }
}
