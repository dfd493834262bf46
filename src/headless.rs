//! Headless collaborators
//!
//! An in-memory render tree, a table-driven loader, and a panel that journals its hooks.
//! They back the scenario runner and the test suite, and double as reference implementations
//! of the [`RenderHost`] and [`PanelLoader`] contracts.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

use serde::Serialize;

use crate::host::{LoadCompletion, NodeId, PanelLoader, RenderHost, TemplateId};
use crate::panel::{Panel, PanelData, PanelDescriptor, PanelKey};

// ============================================================================
// Render tree
// ============================================================================

/// A node of the headless render tree
#[derive(Debug, Clone, Serialize)]
pub struct HeadlessNode {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub active: bool,
    pub interactive: bool,
    pub selectable: bool,
    pub blocker: bool,
    pub stretched: bool,
}

impl HeadlessNode {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parent: None,
            children: Vec::new(),
            active: true,
            interactive: true,
            selectable: false,
            blocker: false,
            stretched: false,
        }
    }
}

/// In-memory render tree host
#[derive(Debug)]
pub struct HeadlessHost {
    nodes: BTreeMap<NodeId, HeadlessNode>,
    next_id: u64,
    root: NodeId,
    containers: BTreeMap<i32, NodeId>,
    /// Number of selectable children each template spawns
    templates: HashMap<TemplateId, usize>,
    destroyed: usize,
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessHost {
    pub fn new() -> Self {
        let mut host = Self {
            nodes: BTreeMap::new(),
            next_id: 0,
            root: NodeId(0),
            containers: BTreeMap::new(),
            templates: HashMap::new(),
            destroyed: 0,
        };
        host.root = host.create("root", None);
        host
    }

    /// Declare how many selectable children instances of `template` get
    pub fn define_template(&mut self, template: TemplateId, selectables: usize) {
        self.templates.insert(template, selectables);
    }

    /// Add a child node under `parent`
    pub fn add_child(&mut self, parent: NodeId, name: &str, selectable: bool) -> NodeId {
        let node = self.create(name, Some(parent));
        if let Some(record) = self.nodes.get_mut(&node) {
            record.selectable = selectable;
        }
        node
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, node: NodeId) -> Option<&HeadlessNode> {
        self.nodes.get(&node)
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&node)
            .map(|record| record.children.clone())
            .unwrap_or_default()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|record| record.parent)
    }

    /// Position of `node` among its siblings (0 = bottom)
    pub fn sibling_index(&self, node: NodeId) -> Option<usize> {
        let parent = self.parent(node)?;
        self.nodes
            .get(&parent)?
            .children
            .iter()
            .position(|child| *child == node)
    }

    pub fn container(&self, level: i32) -> Option<NodeId> {
        self.containers.get(&level).copied()
    }

    pub fn is_active(&self, node: NodeId) -> bool {
        self.nodes.get(&node).is_some_and(|record| record.active)
    }

    pub fn is_interactive(&self, node: NodeId) -> bool {
        self.nodes.get(&node).is_some_and(|record| record.interactive)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn destroyed_count(&self) -> usize {
        self.destroyed
    }

    /// Active blocker nodes under `parent`, in sibling order
    pub fn active_blockers(&self, parent: NodeId) -> Vec<NodeId> {
        self.children(parent)
            .into_iter()
            .filter(|child| {
                self.nodes
                    .get(child)
                    .is_some_and(|record| record.blocker && record.active)
            })
            .collect()
    }

    fn create(&mut self, name: &str, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, HeadlessNode::new(name));
        if let Some(parent) = parent {
            self.attach(id, parent);
        }
        id
    }

    fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        if let Some(record) = self.nodes.get_mut(&parent) {
            record.children.retain(|child| *child != node);
        }
        if let Some(record) = self.nodes.get_mut(&node) {
            record.parent = None;
        }
    }

    fn attach(&mut self, node: NodeId, parent: NodeId) {
        if let Some(record) = self.nodes.get_mut(&parent) {
            record.children.push(node);
        }
        if let Some(record) = self.nodes.get_mut(&node) {
            record.parent = Some(parent);
        }
    }
}

impl RenderHost for HeadlessHost {
    fn layer_container(&mut self, level: i32) -> NodeId {
        if let Some(container) = self.containers.get(&level) {
            return *container;
        }
        let root = self.root;
        let container = self.create(&format!("level-{}", level), Some(root));
        self.containers.insert(level, container);

        // Keep containers ordered bottom-up by level under the root
        let order: Vec<NodeId> = self.containers.values().copied().collect();
        if let Some(record) = self.nodes.get_mut(&root) {
            record.children.retain(|child| !order.contains(child));
            record.children.extend(order);
        }
        container
    }

    fn instantiate(&mut self, template: TemplateId, parent: NodeId) -> Option<NodeId> {
        if !self.nodes.contains_key(&parent) {
            return None;
        }
        let node = self.create(&format!("template-{}", template.0), Some(parent));
        let selectables = self.templates.get(&template).copied().unwrap_or(0);
        for i in 0..selectables {
            self.add_child(node, &format!("selectable-{}", i), true);
        }
        Some(node)
    }

    fn set_name(&mut self, node: NodeId, name: &str) {
        if let Some(record) = self.nodes.get_mut(&node) {
            record.name = name.to_string();
        }
    }

    fn set_parent(&mut self, node: NodeId, parent: NodeId) {
        if !self.nodes.contains_key(&node) || !self.nodes.contains_key(&parent) {
            return;
        }
        self.detach(node);
        self.attach(node, parent);
    }

    fn set_sibling_index(&mut self, node: NodeId, index: usize) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        if let Some(record) = self.nodes.get_mut(&parent) {
            record.children.retain(|child| *child != node);
            let index = index.min(record.children.len());
            record.children.insert(index, node);
        }
    }

    fn set_active(&mut self, node: NodeId, active: bool) {
        if let Some(record) = self.nodes.get_mut(&node) {
            record.active = active;
        }
    }

    fn set_interactive(&mut self, node: NodeId, interactive: bool) {
        if let Some(record) = self.nodes.get_mut(&node) {
            record.interactive = interactive;
        }
    }

    fn destroy(&mut self, node: NodeId) {
        if !self.nodes.contains_key(&node) {
            return;
        }
        self.detach(node);
        let mut doomed = vec![node];
        while let Some(current) = doomed.pop() {
            if let Some(record) = self.nodes.remove(&current) {
                doomed.extend(record.children);
                self.destroyed += 1;
            }
        }
    }

    fn create_blocker(&mut self) -> NodeId {
        let node = self.create("modal-blocker", None);
        if let Some(record) = self.nodes.get_mut(&node) {
            record.blocker = true;
            record.active = false;
        }
        node
    }

    fn stretch_to_parent(&mut self, node: NodeId) {
        if let Some(record) = self.nodes.get_mut(&node) {
            record.stretched = true;
        }
    }

    fn is_alive(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    fn is_active_in_hierarchy(&self, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            match self.nodes.get(&current) {
                Some(record) if record.active => cursor = record.parent,
                _ => return false,
            }
        }
        true
    }

    fn is_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = self.parent(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    fn selectables(&self, root: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut pending: Vec<NodeId> = self.children(root).into_iter().rev().collect();
        while let Some(current) = pending.pop() {
            let Some(record) = self.nodes.get(&current) else {
                continue;
            };
            if record.selectable && record.interactive {
                found.push(current);
            }
            pending.extend(record.children.iter().rev());
        }
        found
    }
}

// ============================================================================
// Loader
// ============================================================================

/// Table-driven loader with injectable failures and deferred async completions
#[derive(Debug, Default)]
pub struct MemoryLoader {
    templates: HashMap<PanelKey, TemplateId>,
    failing: HashSet<PanelKey>,
    pending: Vec<LoadCompletion>,
    next_template: u64,
    sync_calls: usize,
    async_calls: usize,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self {
            next_template: 1,
            ..Self::default()
        }
    }

    /// Pin the template handed out for `key`
    pub fn with_template(mut self, key: impl Into<PanelKey>, template: TemplateId) -> Self {
        self.templates.insert(key.into(), template);
        self
    }

    /// Make every future load of `key` fail
    pub fn fail(&mut self, key: impl Into<PanelKey>) {
        self.failing.insert(key.into());
    }

    pub fn recover(&mut self, key: &PanelKey) {
        self.failing.remove(key);
    }

    /// Async loads waiting for `complete_all`
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Resolve every deferred async load, returning how many were resolved
    pub fn complete_all(&mut self) -> usize {
        let pending: Vec<LoadCompletion> = self.pending.drain(..).collect();
        let count = pending.len();
        for completion in pending {
            let template = self.template_for(completion.key());
            completion.complete(template);
        }
        count
    }

    /// Resolve the deferred load of one key
    pub fn complete(&mut self, key: &PanelKey) -> bool {
        let Some(index) = self.pending.iter().position(|c| c.key() == key) else {
            return false;
        };
        let completion = self.pending.remove(index);
        let template = self.template_for(key);
        completion.complete(template);
        true
    }

    pub fn sync_calls(&self) -> usize {
        self.sync_calls
    }

    pub fn async_calls(&self) -> usize {
        self.async_calls
    }

    fn template_for(&mut self, key: &PanelKey) -> Option<TemplateId> {
        if self.failing.contains(key) {
            return None;
        }
        if let Some(template) = self.templates.get(key) {
            return Some(*template);
        }
        let template = TemplateId(self.next_template);
        self.next_template += 1;
        self.templates.insert(key.clone(), template);
        Some(template)
    }
}

impl PanelLoader for MemoryLoader {
    fn load(&mut self, key: &PanelKey) -> Option<TemplateId> {
        self.sync_calls += 1;
        self.template_for(key)
    }

    fn load_async(&mut self, _key: &PanelKey, completion: LoadCompletion) {
        self.async_calls += 1;
        self.pending.push(completion);
    }
}

// ============================================================================
// Recording panel
// ============================================================================

/// Shared, ordered log of hook invocations (`"<panel>:<hook>"`)
#[derive(Debug, Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<String>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: String) {
        self.0.borrow_mut().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    /// Drain the journal
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    /// Hooks recorded for one panel, in order
    pub fn hooks_of(&self, panel: &str) -> Vec<String> {
        let prefix = format!("{}:", panel);
        self.0
            .borrow()
            .iter()
            .filter_map(|entry| entry.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

/// Panel that records every hook into a [`Journal`]
#[derive(Debug)]
pub struct RecordingPanel {
    name: String,
    journal: Journal,
}

impl RecordingPanel {
    pub fn new(name: impl Into<String>, journal: Journal) -> Self {
        Self {
            name: name.into(),
            journal,
        }
    }

    /// Descriptor for `key` producing recording panels named after the key
    pub fn descriptor(key: &str, journal: &Journal) -> PanelDescriptor {
        let name = key.to_string();
        let journal = journal.clone();
        PanelDescriptor::new(key, move || RecordingPanel::new(name.clone(), journal.clone()))
    }

    fn record(&self, hook: &str) {
        self.journal.record(format!("{}:{}", self.name, hook));
    }
}

impl Panel for RecordingPanel {
    fn init(&mut self, _data: &PanelData) {
        self.record("init");
    }

    fn open(&mut self, _data: &PanelData) {
        self.record("open");
    }

    fn show(&mut self) {
        self.record("show");
    }

    fn hide(&mut self) {
        self.record("hide");
    }

    fn close(&mut self) {
        self.record("close");
    }

    fn cleanup(&mut self) {
        self.record("cleanup");
    }

    fn focus(&mut self) {
        self.record("focus");
    }

    fn blur(&mut self) {
        self.record("blur");
    }

    fn resume(&mut self) {
        self.record("resume");
    }
}
