//! Panel manager - the context object tying every subsystem together
//!
//! `PanelManager` owns the handler pool, the cache, the level buckets, the stacks, the dialog
//! queue and the focus tracker, plus the two collaborators (render host and loader). Every
//! cross-subsystem side effect is applied here, in call order, on the caller's thread.
//!
//! ## Open flow
//!
//! ```text
//! open(key) ─┬─ cache hit ────────────────────────────────┐
//!            ├─ already loading ─> DuplicateLoadRejected   │
//!            └─ miss ─> loader ─┬─ sync  ─> instantiate ──┼─> hot++, init, register, open, show
//!                               └─ async ─> pump() ───────┘
//! ```
//!
//! Asynchronous loads complete through an mpsc channel that is only drained by [`PanelManager::pump`]
//! (or [`PanelManager::tick`]), so a loader can never re-enter the manager.

use std::collections::HashMap;
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use crate::cache::PanelCache;
use crate::config::PanelConfig;
use crate::dialog::{DialogQueue, DialogRequest, DialogResult};
use crate::error::PanelError;
use crate::focus::{FocusManager, InputMode};
use crate::host::{LoadCompletion, LoadOutcome, NodeId, PanelLoader, RenderHost, TemplateId};
use crate::level::LevelManager;
use crate::panel::{
    CacheMode, HandlerId, HandlerPool, LoadMode, Panel, PanelData, PanelDescriptor, PanelHandler,
    PanelKey, PanelRegistry, PanelState,
};
use crate::stack::{StackRemoval, StackSet};

/// Completion callback for open and preload requests
pub type OpenCallback = Box<dyn FnOnce(Result<HandlerId, PanelError>)>;

/// Where a load request stands when the call returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// The panel instance exists (cache hit or synchronous load)
    Ready(HandlerId),
    /// An asynchronous load was started; the result arrives on a later `pump`
    Pending,
}

impl LoadStatus {
    pub fn handler(&self) -> Option<HandlerId> {
        match self {
            LoadStatus::Ready(id) => Some(*id),
            LoadStatus::Pending => None,
        }
    }
}

/// Parameters of an open request
#[derive(Default)]
pub struct OpenRequest {
    level: Option<i32>,
    sub_level: Option<i32>,
    data: PanelData,
    stack: Option<String>,
    callback: Option<OpenCallback>,
}

impl OpenRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: i32) -> Self {
        self.level = Some(level);
        self
    }

    pub fn sub_level(mut self, sub_level: i32) -> Self {
        self.sub_level = Some(sub_level);
        self
    }

    pub fn data(mut self, data: PanelData) -> Self {
        self.data = data;
        self
    }

    /// Push the panel onto `stack` once it is shown
    pub fn stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn on_complete(
        mut self,
        callback: impl FnOnce(Result<HandlerId, PanelError>) + 'static,
    ) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    fn fail<T>(self, error: PanelError) -> Result<T, PanelError> {
        let _ = notify(self.callback, Err(error.clone()));
        Err(error)
    }
}

impl fmt::Debug for OpenRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenRequest")
            .field("level", &self.level)
            .field("sub_level", &self.sub_level)
            .field("data", &self.data)
            .field("stack", &self.stack)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// Report `result` to an optional callback and hand it back
fn notify(
    callback: Option<OpenCallback>,
    result: Result<HandlerId, PanelError>,
) -> Result<HandlerId, PanelError> {
    if let Some(callback) = callback {
        callback(result.clone());
    }
    result
}

/// A load in flight, keyed by panel kind in the loading set
enum PendingLoad {
    Open(OpenRequest),
    Preload {
        level: Option<i32>,
        callback: Option<OpenCallback>,
    },
    /// Dialog panel load whose dialog was resolved before the panel arrived
    Orphaned { level: Option<i32> },
}

pub struct PanelManager<H: RenderHost, L: PanelLoader> {
    config: PanelConfig,
    registry: PanelRegistry,
    pool: HandlerPool,
    cache: PanelCache,
    levels: LevelManager,
    stacks: StackSet,
    dialogs: DialogQueue,
    focus: FocusManager,
    loading: HashMap<PanelKey, PendingLoad>,
    load_tx: Sender<LoadOutcome>,
    load_rx: Receiver<LoadOutcome>,
    host: H,
    loader: L,
}

impl<H: RenderHost, L: PanelLoader> PanelManager<H, L> {
    pub fn create(config: PanelConfig, registry: PanelRegistry, host: H, loader: L) -> Self {
        let (load_tx, load_rx) = mpsc::channel();
        let cache = PanelCache::new(
            config.cache_capacity,
            config.decay_interval(),
            config.hot_weaken,
        );
        tracing::info!(
            "Panel manager created ({} panel kinds, preload capacity {})",
            registry.len(),
            cache.capacity()
        );

        Self {
            config,
            registry,
            pool: HandlerPool::new(),
            cache,
            levels: LevelManager::new(),
            stacks: StackSet::new(),
            dialogs: DialogQueue::new(),
            focus: FocusManager::new(),
            loading: HashMap::new(),
            load_tx,
            load_rx,
            host,
            loader,
        }
    }

    /// Tear everything down and hand the collaborators back
    ///
    /// Queued and showing dialogs are cancelled, pending loads are reported as failures, and
    /// every cached panel is closed and destroyed.
    pub fn shutdown(mut self) -> (H, L) {
        let cancelled = self.dialogs.cancel_queued();
        if let Some(active) = self.dialogs.take_active() {
            active.respond(DialogResult::Cancel);
        }

        let pending: Vec<(PanelKey, PendingLoad)> = self.loading.drain().collect();
        let dropped_loads = pending.len();
        for (key, load) in pending {
            let callback = match load {
                PendingLoad::Open(request) => request.callback,
                PendingLoad::Preload { callback, .. } => callback,
                PendingLoad::Orphaned { .. } => None,
            };
            let _ = notify(callback, Err(PanelError::LoadFailure(key)));
        }

        let panels = self.pool.ids();
        for id in &panels {
            if self.pool.get(*id).is_some_and(|h| h.state != PanelState::Closed) {
                self.hook(*id, |panel| panel.close());
            }
            self.destroy(*id);
        }

        self.stacks.clear(&mut self.pool);
        self.levels.clear(&mut self.host);
        self.focus.clear();
        self.cache.clear();

        tracing::info!(
            "Panel manager shut down ({} panels destroyed, {} dialogs cancelled, {} loads dropped)",
            panels.len(),
            cancelled,
            dropped_loads
        );

        let Self { host, loader, .. } = self;
        (host, loader)
    }

    /// Register (or replace) a panel kind
    pub fn register(&mut self, descriptor: PanelDescriptor) {
        self.registry.register(descriptor);
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Open the panel of kind `key`, reusing the cached instance when there is one
    ///
    /// Opening never advances hotness decay; elapsed time only reaches the cache through
    /// [`tick`](Self::tick) and [`decay_hotness`](Self::decay_hotness).
    pub fn open(
        &mut self,
        key: impl Into<PanelKey>,
        request: OpenRequest,
    ) -> Result<LoadStatus, PanelError> {
        let key = key.into();
        let Some(descriptor) = self.registry.get(&key) else {
            tracing::warn!("Open of unregistered panel {}", key);
            return request.fail(PanelError::UnknownPanel(key));
        };
        let load_mode = descriptor.load_mode_hint();

        if let Some(id) = self.cache.try_get(&key) {
            self.activate(id, request);
            return Ok(LoadStatus::Ready(id));
        }

        if self.loading.contains_key(&key) {
            tracing::warn!("Panel {} is already loading, rejecting open", key);
            return request.fail(PanelError::DuplicateLoadRejected(key));
        }

        match load_mode {
            LoadMode::Sync => {
                let template = self.loader.load(&key);
                self.finish_open(key, template, request)
                    .map(LoadStatus::Ready)
            }
            LoadMode::Async => {
                tracing::debug!("Loading panel {} asynchronously", key);
                self.loading.insert(key.clone(), PendingLoad::Open(request));
                let completion = LoadCompletion::new(key.clone(), self.load_tx.clone());
                self.loader.load_async(&key, completion);
                Ok(LoadStatus::Pending)
            }
        }
    }

    /// Show a hidden panel; a closed cached panel is reopened
    pub fn show(&mut self, id: HandlerId) -> Result<(), PanelError> {
        let Some(handler) = self.pool.get(id) else {
            return Err(self.stale(id));
        };
        let (state, key) = (handler.state, handler.key.clone());
        match state {
            PanelState::Open => tracing::debug!("Panel {} is already visible", key),
            PanelState::Hide => self.show_handler(id),
            PanelState::Closed => {
                // Reopening promotes a preloaded instance like any other cache hit
                self.cache.try_get(&key);
                self.activate(id, OpenRequest::new());
            }
        }
        Ok(())
    }

    pub fn hide(&mut self, id: HandlerId) -> Result<(), PanelError> {
        if !self.pool.contains(id) {
            return Err(self.stale(id));
        }
        self.hide_handler(id);
        Ok(())
    }

    /// Close a panel, then apply its cache mode's destroy policy
    pub fn close(&mut self, id: HandlerId) -> Result<(), PanelError> {
        let Some(handler) = self.pool.get(id) else {
            return Err(self.stale(id));
        };
        if handler.state == PanelState::Closed {
            tracing::debug!("Panel {} is already closed", handler.key);
            return Ok(());
        }
        self.close_handler(id);
        Ok(())
    }

    /// Close the opened instance of `key`, if any
    pub fn close_key(&mut self, key: &PanelKey) -> Result<(), PanelError> {
        match self.cache.opened(key) {
            Some(id) => self.close(id),
            None => Err(PanelError::UnknownPanel(key.clone())),
        }
    }

    /// Instantiate `key` ahead of time without opening it
    pub fn preload(
        &mut self,
        key: impl Into<PanelKey>,
        level: Option<i32>,
    ) -> Result<LoadStatus, PanelError> {
        self.start_preload(key.into(), level, None)
    }

    /// [`preload`](Self::preload) with a completion callback
    pub fn preload_with(
        &mut self,
        key: impl Into<PanelKey>,
        level: Option<i32>,
        callback: impl FnOnce(Result<HandlerId, PanelError>) + 'static,
    ) -> Result<LoadStatus, PanelError> {
        self.start_preload(key.into(), level, Some(Box::new(callback)))
    }

    /// Move a panel to another level; a pinned descriptor level still wins
    pub fn set_level(
        &mut self,
        id: HandlerId,
        level: i32,
        sub_level: Option<i32>,
    ) -> Result<(), PanelError> {
        let Some(handler) = self.pool.get(id) else {
            return Err(self.stale(id));
        };
        let sub_level = sub_level.unwrap_or(handler.sub_level);
        let level = self.resolve_level(&handler.key, level);
        self.levels
            .set_level(id, level, sub_level, &mut self.pool, &mut self.host);
        Ok(())
    }

    pub fn set_modal(&mut self, id: HandlerId, modal: bool) -> Result<(), PanelError> {
        let Some(handler) = self.pool.get_mut(id) else {
            return Err(self.stale(id));
        };
        handler.is_modal = modal;
        self.levels.refresh(id, &mut self.pool, &mut self.host);
        Ok(())
    }

    // ========================================================================
    // Time
    // ========================================================================

    /// Per-frame entry point: apply finished loads, then advance hotness decay
    pub fn tick(&mut self, delta: Duration) {
        self.pump();
        self.decay_hotness(delta);
    }

    /// Apply every asynchronous load that completed since the last call
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(outcome) = self.load_rx.try_recv() {
            self.complete_load(outcome);
            handled += 1;
        }
        handled
    }

    /// Advance the decay clock, destroying every panel that cooled down; returns how many
    pub fn decay_hotness(&mut self, delta: Duration) -> usize {
        let expired = self.cache.decay(delta, &mut self.pool);
        for id in &expired {
            self.destroy(*id);
        }
        expired.len()
    }

    // ========================================================================
    // Stacks
    // ========================================================================

    /// Push a panel onto `stack`, taking it out of any stack it is already on
    pub fn push(
        &mut self,
        id: HandlerId,
        stack: &str,
        hide_previous: bool,
    ) -> Result<(), PanelError> {
        if !self.pool.contains(id) {
            return Err(self.stale(id));
        }
        self.push_handler(id, stack, hide_previous);
        Ok(())
    }

    /// Pop the top of `stack`, returning the popped panel
    pub fn pop(
        &mut self,
        stack: &str,
        show_previous: bool,
        auto_close: bool,
    ) -> Result<HandlerId, PanelError> {
        let Some((popped, new_top)) = self.stacks.pop(stack, &mut self.pool) else {
            tracing::warn!("Pop on empty stack {}", stack);
            return Err(PanelError::EmptyStackPop(stack.to_string()));
        };
        tracing::debug!("Popped {} from stack {}", popped, stack);
        self.hook(popped, |panel| panel.blur());

        if let (true, Some(top)) = (show_previous, new_top) {
            if self.pool.get(top).is_some_and(|h| h.state != PanelState::Open) {
                self.show_handler(top);
            }
            self.hook(top, |panel| panel.resume());
            self.hook(top, |panel| panel.focus());
        }

        if auto_close && self.pool.get(popped).is_some_and(|h| h.state != PanelState::Closed) {
            self.close_handler(popped);
        }
        Ok(popped)
    }

    /// Take a panel out of its stack without hiding or closing it
    pub fn remove_from_stack(&mut self, id: HandlerId) -> Option<StackRemoval> {
        let removal = self.stacks.remove(id, &mut self.pool)?;
        self.after_stack_removal(&removal);
        Some(removal)
    }

    // ========================================================================
    // Dialogs
    // ========================================================================

    pub fn enqueue_dialog(&mut self, request: DialogRequest) {
        tracing::debug!("Dialog request queued: {:?}", request);
        self.dialogs.enqueue(request);
        self.drain_dialogs();
    }

    pub fn alert(
        &mut self,
        title: &str,
        message: &str,
        on_result: impl FnOnce(DialogResult) + 'static,
    ) {
        let panel = self.config.dialogs.alert.clone();
        self.enqueue_dialog(DialogRequest::alert(panel, title, message).on_result(on_result));
    }

    pub fn confirm(
        &mut self,
        title: &str,
        message: &str,
        on_result: impl FnOnce(DialogResult) + 'static,
    ) {
        let panel = self.config.dialogs.confirm.clone();
        self.enqueue_dialog(DialogRequest::confirm(panel, title, message).on_result(on_result));
    }

    pub fn prompt(
        &mut self,
        title: &str,
        placeholder: &str,
        on_result: impl FnOnce(DialogResult) + 'static,
    ) {
        let panel = self.config.dialogs.prompt.clone();
        self.enqueue_dialog(DialogRequest::prompt(panel, title, placeholder).on_result(on_result));
    }

    /// Deliver the showing dialog's result, close its panel and show the next request
    ///
    /// Returns false when no dialog is showing.
    pub fn resolve_dialog(&mut self, result: DialogResult) -> bool {
        let Some(active) = self.dialogs.take_active() else {
            tracing::debug!("No dialog is showing, dropping result {:?}", result);
            return false;
        };
        tracing::debug!("Dialog {} resolved with {:?}", active.panel, result);

        match active.handler {
            Some(id) => {
                if self.pool.get(id).is_some_and(|h| h.state != PanelState::Closed) {
                    self.close_handler(id);
                }
            }
            None => self.orphan_dialog_load(&active.panel),
        }
        active.respond(result);
        self.drain_dialogs();
        true
    }

    /// Cancel every queued dialog; the showing one is left alone
    pub fn clear_dialog_queue(&mut self) -> usize {
        let cancelled = self.dialogs.cancel_queued();
        if cancelled > 0 {
            tracing::debug!("Cancelled {} queued dialogs", cancelled);
        }
        cancelled
    }

    // ========================================================================
    // Focus
    // ========================================================================

    pub fn set_input_mode(&mut self, mode: InputMode) {
        self.focus.set_mode(mode);
    }

    /// Focus a node directly (reported by the input collaborator)
    pub fn set_focus(&mut self, target: Option<NodeId>) {
        self.focus.set_current(target);
    }

    pub fn set_default_focus(
        &mut self,
        id: HandlerId,
        target: Option<NodeId>,
    ) -> Result<(), PanelError> {
        let Some(handler) = self.pool.get_mut(id) else {
            return Err(self.stale(id));
        };
        handler.default_focus = target;
        Ok(())
    }

    /// Fallback focus candidates for a panel, tried in order before the depth-first scan
    pub fn register_focus_group(
        &mut self,
        id: HandlerId,
        members: Vec<NodeId>,
    ) -> Result<(), PanelError> {
        if !self.pool.contains(id) {
            return Err(self.stale(id));
        }
        self.focus.register_group(id, members);
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    pub fn registry(&self) -> &PanelRegistry {
        &self.registry
    }

    pub fn handler(&self, id: HandlerId) -> Option<&PanelHandler> {
        self.pool.get(id)
    }

    /// Cached handler of `key`, opened or preloaded, without promoting it
    pub fn handler_for(&self, key: &PanelKey) -> Option<&PanelHandler> {
        self.cache
            .opened(key)
            .or_else(|| self.cache.preloaded(key).map(|entry| entry.handler))
            .and_then(|id| self.pool.get(id))
    }

    pub fn handlers(&self) -> &HandlerPool {
        &self.pool
    }

    pub fn cache(&self) -> &PanelCache {
        &self.cache
    }

    pub fn levels(&self) -> &LevelManager {
        &self.levels
    }

    pub fn stacks(&self) -> &StackSet {
        &self.stacks
    }

    pub fn dialogs(&self) -> &DialogQueue {
        &self.dialogs
    }

    pub fn focus(&self) -> &FocusManager {
        &self.focus
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }

    /// Opened panels, sorted by key
    pub fn cached_panels(&self) -> Vec<(PanelKey, HandlerId)> {
        self.cache.opened_entries()
    }

    pub fn panels_on(&self, level: i32) -> &[HandlerId] {
        self.levels.panels(level)
    }

    pub fn stack_depth(&self, stack: &str) -> usize {
        self.stacks.depth(stack)
    }

    pub fn stack_peek(&self, stack: &str) -> Option<HandlerId> {
        self.stacks.peek(stack)
    }

    pub fn dialog_queue_len(&self) -> usize {
        self.dialogs.len()
    }

    pub fn current_focus(&self) -> Option<NodeId> {
        self.focus.current()
    }

    pub fn input_mode(&self) -> InputMode {
        self.focus.mode()
    }

    pub fn is_loading(&self, key: &PanelKey) -> bool {
        self.loading.contains_key(key)
    }

    /// Kinds with a load in flight, sorted
    pub fn loading_keys(&self) -> Vec<PanelKey> {
        let mut keys: Vec<PanelKey> = self.loading.keys().cloned().collect();
        keys.sort();
        keys
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn stale(&self, id: HandlerId) -> PanelError {
        tracing::warn!("Operation on stale handler {}", id);
        PanelError::StaleHandler(id)
    }

    fn resolve_level(&self, key: &PanelKey, requested: i32) -> i32 {
        self.registry
            .get(key)
            .map_or(requested, |descriptor| descriptor.resolve_level(Some(requested)))
    }

    fn hook(&mut self, id: HandlerId, f: impl FnOnce(&mut dyn Panel)) {
        if let Some(handler) = self.pool.get_mut(id) {
            handler.with_panel(f);
        }
    }

    /// Create an instance from `template` and bind a fresh handler to it
    fn instantiate(
        &mut self,
        key: &PanelKey,
        template: TemplateId,
        level: Option<i32>,
        sub_level: Option<i32>,
    ) -> Result<HandlerId, PanelError> {
        let Some(descriptor) = self.registry.get(key) else {
            tracing::warn!("Panel {} was unregistered while loading", key);
            return Err(PanelError::UnknownPanel(key.clone()));
        };
        let level = descriptor.resolve_level(level);
        let container = self.host.layer_container(level);
        let Some(node) = self.host.instantiate(template, container) else {
            tracing::warn!("Host could not instantiate panel {}", key);
            return Err(PanelError::LoadFailure(key.clone()));
        };
        self.host.set_name(node, key.as_str());

        let id = self.pool.allocate(key.clone());
        if let Some(handler) = self.pool.get_mut(id) {
            handler.level = level;
            handler.sub_level = sub_level.unwrap_or(descriptor.default_sub_level());
            handler.cache_mode = descriptor.cache_mode_hint();
            handler.is_modal = descriptor.is_modal();
            handler.auto_focus = descriptor.wants_auto_focus();
            handler.node = Some(node);
            handler.panel = Some(descriptor.instantiate());
        }
        tracing::info!("Instantiated panel {} as {} on level {}", key, id, level);
        Ok(id)
    }

    fn finish_open(
        &mut self,
        key: PanelKey,
        template: Option<TemplateId>,
        request: OpenRequest,
    ) -> Result<HandlerId, PanelError> {
        let Some(template) = template else {
            tracing::warn!("Loader returned nothing for panel {}", key);
            return request.fail(PanelError::LoadFailure(key));
        };
        let id = match self.instantiate(&key, template, request.level, request.sub_level) {
            Ok(id) => id,
            Err(e) => return request.fail(e),
        };
        self.cache.insert_opened(key, id);
        self.activate(id, request);
        Ok(id)
    }

    /// Drive a cached or freshly created instance through open and show
    fn activate(&mut self, id: HandlerId, request: OpenRequest) {
        let OpenRequest {
            level,
            sub_level,
            data,
            stack,
            callback,
        } = request;

        let increment = self.config.hot_increment;
        let Some(handler) = self.pool.get_mut(id) else {
            let _ = notify(callback, Err(PanelError::StaleHandler(id)));
            return;
        };
        handler.hot = handler.hot.saturating_add(increment);
        handler.data = data.clone();
        let needs_init = !handler.initialized;
        handler.initialized = true;
        let current = (handler.level, handler.sub_level);
        let key = handler.key.clone();

        let target = (
            level.map_or(current.0, |level| self.resolve_level(&key, level)),
            sub_level.unwrap_or(current.1),
        );
        if target != current {
            self.levels
                .set_level(id, target.0, target.1, &mut self.pool, &mut self.host);
        }

        if needs_init {
            self.hook(id, |panel| panel.init(&data));
        }
        self.levels.register(id, &mut self.pool, &mut self.host);
        self.hook(id, |panel| panel.open(&data));
        self.show_handler(id);

        if let Some(stack) = stack {
            self.push_handler(id, &stack, true);
        }
        tracing::debug!("Opened panel {} ({})", key, id);
        let _ = notify(callback, Ok(id));
    }

    fn show_handler(&mut self, id: HandlerId) {
        let Some(handler) = self.pool.get_mut(id) else {
            return;
        };
        handler.state = PanelState::Open;
        if let Some(node) = handler.node {
            self.host.set_active(node, true);
        }
        handler.with_panel(|panel| panel.show());

        self.levels.refresh(id, &mut self.pool, &mut self.host);
        if let Some(handler) = self.pool.get(id) {
            self.focus.on_panel_show(handler, &self.host);
        }
    }

    fn hide_handler(&mut self, id: HandlerId) {
        let Some(handler) = self.pool.get(id) else {
            return;
        };
        if handler.state != PanelState::Open {
            return;
        }
        self.focus.on_panel_hide(handler, &self.host);

        let Some(handler) = self.pool.get_mut(id) else {
            return;
        };
        handler.state = PanelState::Hide;
        if let Some(node) = handler.node {
            self.host.set_active(node, false);
        }
        handler.with_panel(|panel| panel.hide());
        self.levels.refresh(id, &mut self.pool, &mut self.host);
    }

    fn close_handler(&mut self, id: HandlerId) {
        self.hook(id, |panel| panel.close());

        if let Some(handler) = self.pool.get(id) {
            self.focus.on_panel_close(handler, &self.host);
        }
        if let Some(removal) = self.stacks.remove(id, &mut self.pool) {
            self.after_stack_removal(&removal);
        }
        self.levels.unregister(id, &mut self.pool, &mut self.host);

        let Some(handler) = self.pool.get_mut(id) else {
            return;
        };
        handler.state = PanelState::Closed;
        if let Some(node) = handler.node {
            self.host.set_active(node, false);
        }
        let destroy = match handler.cache_mode {
            CacheMode::Temporary => true,
            CacheMode::Persistent => false,
            CacheMode::Hot => handler.hot <= 0,
        };
        if destroy {
            self.destroy(id);
        } else {
            tracing::debug!(
                "Closed panel {}, kept cached (hot {})",
                handler.key,
                handler.hot
            );
        }

        // Closing the showing dialog's panel directly cancels it
        if self.dialogs.active_handler() == Some(id) {
            if let Some(active) = self.dialogs.take_active() {
                tracing::debug!("Dialog {} closed without a result", active.panel);
                active.respond(DialogResult::Cancel);
            }
            self.drain_dialogs();
        }
    }

    /// Fully release an instance: hooks, render node, handler and cache entry
    fn destroy(&mut self, id: HandlerId) {
        let Some(handler) = self.pool.get_mut(id) else {
            return;
        };
        handler.with_panel(|panel| panel.cleanup());
        let key = handler.key.clone();

        if let Some(handler) = self.pool.get(id) {
            self.focus.on_panel_close(handler, &self.host);
        }
        self.focus.forget(id);
        self.stacks.remove(id, &mut self.pool);
        if self.levels.contains(id) {
            self.levels.unregister(id, &mut self.pool, &mut self.host);
        }

        if let Some(node) = self.pool.get_mut(id).and_then(|h| h.node.take()) {
            self.host.destroy(node);
        }
        self.pool.recycle(id);
        self.cache.forget(&key, id);
        tracing::info!("Destroyed panel {} ({})", key, id);
    }

    fn start_preload(
        &mut self,
        key: PanelKey,
        level: Option<i32>,
        callback: Option<OpenCallback>,
    ) -> Result<LoadStatus, PanelError> {
        let Some(descriptor) = self.registry.get(&key) else {
            tracing::warn!("Preload of unregistered panel {}", key);
            return notify(callback, Err(PanelError::UnknownPanel(key))).map(LoadStatus::Ready);
        };
        let load_mode = descriptor.load_mode_hint();

        if let Some(id) = self.cache.opened(&key) {
            tracing::debug!("Preload of {} skipped, already opened", key);
            return notify(callback, Ok(id)).map(LoadStatus::Ready);
        }
        if let Some(entry) = self.cache.preloaded(&key) {
            tracing::debug!("Preload of {} refreshed", key);
            self.cache.touch_preloaded(&key);
            return notify(callback, Ok(entry.handler)).map(LoadStatus::Ready);
        }
        if self.loading.contains_key(&key) {
            tracing::warn!("Panel {} is already loading, rejecting preload", key);
            return notify(callback, Err(PanelError::DuplicateLoadRejected(key)))
                .map(LoadStatus::Ready);
        }

        self.make_room();
        match load_mode {
            LoadMode::Sync => {
                let template = self.loader.load(&key);
                self.finish_preload(key, template, level, callback)
                    .map(LoadStatus::Ready)
            }
            LoadMode::Async => {
                tracing::debug!("Preloading panel {} asynchronously", key);
                self.loading
                    .insert(key.clone(), PendingLoad::Preload { level, callback });
                let completion = LoadCompletion::new(key.clone(), self.load_tx.clone());
                self.loader.load_async(&key, completion);
                Ok(LoadStatus::Pending)
            }
        }
    }

    fn finish_preload(
        &mut self,
        key: PanelKey,
        template: Option<TemplateId>,
        level: Option<i32>,
        callback: Option<OpenCallback>,
    ) -> Result<HandlerId, PanelError> {
        let Some(template) = template else {
            tracing::warn!("Loader returned nothing for preloaded panel {}", key);
            return notify(callback, Err(PanelError::LoadFailure(key)));
        };
        // Other preloads may have landed while this one was in flight
        self.make_room();

        let id = match self.instantiate(&key, template, level, None) {
            Ok(id) => id,
            Err(e) => return notify(callback, Err(e)),
        };
        if let Some(node) = self.pool.get(id).and_then(|h| h.node) {
            self.host.set_active(node, false);
        }
        self.cache.insert_preloaded(key.clone(), id);
        tracing::debug!(
            "Preloaded panel {} ({}/{})",
            key,
            self.cache.preloaded_len(),
            self.cache.capacity()
        );
        notify(callback, Ok(id))
    }

    /// Evict least recently accessed preloads until one more fits
    fn make_room(&mut self) {
        while self.cache.preload_needs_room() {
            let Some((key, id)) = self.cache.lru_victim() else {
                break;
            };
            tracing::debug!("Evicting preloaded panel {}", key);
            self.destroy(id);
            self.cache.remove_preloaded(&key);
        }
    }

    fn complete_load(&mut self, outcome: LoadOutcome) {
        let LoadOutcome { key, template } = outcome;
        let Some(pending) = self.loading.remove(&key) else {
            tracing::warn!("Ignoring load completion for {} with no pending request", key);
            return;
        };

        match pending {
            PendingLoad::Open(request) => {
                let result = self.finish_open(key.clone(), template, request);
                if !self.dialogs.is_waiting_on(&key) {
                    return;
                }
                match result {
                    Ok(id) => {
                        self.dialogs.attach_handler(&key, id);
                    }
                    Err(_) => {
                        if let Some(active) = self.dialogs.take_active() {
                            active.respond(DialogResult::Cancel);
                        }
                        self.drain_dialogs();
                    }
                }
            }
            PendingLoad::Preload { level, callback } => {
                let _ = self.finish_preload(key, template, level, callback);
            }
            PendingLoad::Orphaned { level } => {
                tracing::debug!("Dialog panel {} arrived after its dialog, keeping it closed", key);
                let _ = self.finish_preload(key, template, level, None);
            }
        }
    }

    /// Stop a still-loading dialog panel from opening once its dialog is gone
    fn orphan_dialog_load(&mut self, key: &PanelKey) {
        if !matches!(self.loading.get(key), Some(PendingLoad::Open(_))) {
            return;
        }
        let Some(PendingLoad::Open(request)) = self.loading.remove(key) else {
            return;
        };
        let _ = notify(request.callback, Err(PanelError::LoadFailure(key.clone())));
        self.loading.insert(
            key.clone(),
            PendingLoad::Orphaned {
                level: request.level,
            },
        );
    }

    fn push_handler(&mut self, id: HandlerId, stack: &str, hide_previous: bool) {
        let previous = self.stacks.peek(stack).filter(|top| *top != id);
        if let Some(removal) = self.stacks.remove(id, &mut self.pool) {
            if removal.stack != stack {
                tracing::debug!("Moving {} from stack {} to {}", id, removal.stack, stack);
                self.after_stack_removal(&removal);
            }
        }
        if let (true, Some(previous)) = (hide_previous, previous) {
            self.hook(previous, |panel| panel.blur());
            self.hide_handler(previous);
        }
        self.stacks.push(id, stack, &mut self.pool);
        self.hook(id, |panel| panel.focus());
        tracing::debug!(
            "Pushed {} onto stack {} (depth {})",
            id,
            stack,
            self.stacks.depth(stack)
        );
    }

    fn after_stack_removal(&mut self, removal: &StackRemoval) {
        if let (true, Some(top)) = (removal.was_top, removal.new_top) {
            self.hook(top, |panel| panel.focus());
        }
    }

    /// Show queued dialogs until one occupies the slot or the queue runs dry
    fn drain_dialogs(&mut self) {
        if !self.dialogs.begin_drain() {
            return;
        }
        while let Some(request) = self.dialogs.next_request() {
            let (panel, config, level, callback) = request.into_parts();
            let Some(panel) = panel.filter(|key| self.registry.contains(key)) else {
                tracing::warn!("{}, cancelling", PanelError::MissingDialogType);
                if let Some(callback) = callback {
                    callback(DialogResult::Cancel);
                }
                continue;
            };

            let level = level.unwrap_or(self.config.dialog_level);
            self.dialogs.activate(panel.clone(), None, callback);
            let request = OpenRequest::new().level(level).data(config);
            match self.open(panel.clone(), request) {
                Ok(LoadStatus::Ready(id)) => {
                    self.dialogs.attach_handler(&panel, id);
                }
                Ok(LoadStatus::Pending) => {
                    tracing::debug!("Dialog {} waiting on its panel load", panel);
                }
                Err(e) => {
                    tracing::warn!("Dialog {} could not open: {}", panel, e);
                    if let Some(active) = self.dialogs.take_active() {
                        active.respond(DialogResult::Cancel);
                    }
                }
            }
        }
        self.dialogs.end_drain();
    }
}
