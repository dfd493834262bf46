//! Panel descriptor registry
//!
//! Maps a panel key to everything the manager needs to create and place an instance of that
//! kind. Resolution happens once, at registration time.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{CacheMode, Panel, PanelKey};

/// How the loader is asked for a panel's template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    /// `PanelLoader::load`, completes within the open call
    #[default]
    Sync,
    /// `PanelLoader::load_async`, completes on a later `pump`
    Async,
}

type PanelFactory = Box<dyn Fn() -> Box<dyn Panel>>;

/// Capabilities of one panel kind
pub struct PanelDescriptor {
    key: PanelKey,
    default_level: i32,
    sub_level: i32,
    cache_mode: CacheMode,
    modal: bool,
    load_mode: LoadMode,
    auto_focus: bool,
    pinned_level: Option<i32>,
    factory: PanelFactory,
}

impl PanelDescriptor {
    /// Describe a panel kind whose behaviour objects are produced by `factory`
    pub fn new<F, P>(key: impl Into<PanelKey>, factory: F) -> Self
    where
        F: Fn() -> P + 'static,
        P: Panel + 'static,
    {
        Self {
            key: key.into(),
            default_level: 0,
            sub_level: 0,
            cache_mode: CacheMode::default(),
            modal: false,
            load_mode: LoadMode::default(),
            auto_focus: true,
            pinned_level: None,
            factory: Box::new(move || Box::new(factory()) as Box<dyn Panel>),
        }
    }

    pub fn level(mut self, level: i32) -> Self {
        self.default_level = level;
        self
    }

    pub fn sub_level(mut self, sub_level: i32) -> Self {
        self.sub_level = sub_level;
        self
    }

    pub fn cache_mode(mut self, mode: CacheMode) -> Self {
        self.cache_mode = mode;
        self
    }

    pub fn modal(mut self, modal: bool) -> Self {
        self.modal = modal;
        self
    }

    pub fn load_mode(mut self, mode: LoadMode) -> Self {
        self.load_mode = mode;
        self
    }

    pub fn auto_focus(mut self, auto_focus: bool) -> Self {
        self.auto_focus = auto_focus;
        self
    }

    /// Pin the panel to a layer; a pinned layer wins over any requested level
    pub fn pinned_level(mut self, level: i32) -> Self {
        self.pinned_level = Some(level);
        self
    }

    pub fn key(&self) -> &PanelKey {
        &self.key
    }

    pub fn default_level(&self) -> i32 {
        self.default_level
    }

    pub fn default_sub_level(&self) -> i32 {
        self.sub_level
    }

    pub fn cache_mode_hint(&self) -> CacheMode {
        self.cache_mode
    }

    pub fn is_modal(&self) -> bool {
        self.modal
    }

    pub fn load_mode_hint(&self) -> LoadMode {
        self.load_mode
    }

    pub fn wants_auto_focus(&self) -> bool {
        self.auto_focus
    }

    /// Level a panel of this kind ends up on for a request
    pub fn resolve_level(&self, requested: Option<i32>) -> i32 {
        if let (Some(pinned), Some(requested)) = (self.pinned_level, requested) {
            if pinned != requested {
                tracing::debug!(
                    "Panel {} is pinned to level {}, ignoring requested level {}",
                    self.key,
                    pinned,
                    requested
                );
            }
        }
        self.pinned_level
            .or(requested)
            .unwrap_or(self.default_level)
    }

    pub(crate) fn instantiate(&self) -> Box<dyn Panel> {
        (self.factory)()
    }
}

impl fmt::Debug for PanelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanelDescriptor")
            .field("key", &self.key)
            .field("default_level", &self.default_level)
            .field("sub_level", &self.sub_level)
            .field("cache_mode", &self.cache_mode)
            .field("modal", &self.modal)
            .field("load_mode", &self.load_mode)
            .field("auto_focus", &self.auto_focus)
            .field("pinned_level", &self.pinned_level)
            .finish_non_exhaustive()
    }
}

/// Registry of every panel kind the manager can open
#[derive(Debug, Default)]
pub struct PanelRegistry {
    descriptors: HashMap<PanelKey, PanelDescriptor>,
}

impl PanelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor, returning the one it replaced
    pub fn register(&mut self, descriptor: PanelDescriptor) -> Option<PanelDescriptor> {
        let key = descriptor.key.clone();
        let previous = self.descriptors.insert(key.clone(), descriptor);
        if previous.is_some() {
            tracing::warn!("Panel descriptor for {} replaced", key);
        }
        previous
    }

    /// Builder-style registration
    pub fn with(mut self, descriptor: PanelDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    pub fn get(&self, key: &PanelKey) -> Option<&PanelDescriptor> {
        self.descriptors.get(key)
    }

    pub fn contains(&self, key: &PanelKey) -> bool {
        self.descriptors.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &PanelKey> {
        self.descriptors.keys()
    }
}
