//! Shared test helpers for integration tests
//!
//! Note: Functions may appear unused because each test file compiles separately.

#![allow(dead_code)]

use panelkit::headless::{HeadlessHost, Journal, MemoryLoader, RecordingPanel};
use panelkit::{
    HandlerId, OpenRequest, PanelConfig, PanelDescriptor, PanelKey, PanelManager, PanelRegistry,
};

pub type TestManager = PanelManager<HeadlessHost, MemoryLoader>;

pub fn key(name: &str) -> PanelKey {
    PanelKey::from(name)
}

/// Config with a small preload capacity and a 1s decay interval
pub fn test_config() -> PanelConfig {
    PanelConfig {
        cache_capacity: 2,
        decay_interval_secs: 1.0,
        hot_weaken: 1,
        hot_increment: 2,
        ..PanelConfig::default()
    }
}

/// Recording descriptor for `name` sharing `journal`
pub fn panel(name: &str, journal: &Journal) -> PanelDescriptor {
    RecordingPanel::descriptor(name, journal)
}

/// Manager over headless collaborators with one recording panel per name
pub fn test_manager(config: PanelConfig, names: &[&str]) -> (TestManager, Journal) {
    let journal = Journal::new();
    let mut registry = PanelRegistry::new();
    for name in names {
        registry.register(panel(name, &journal));
    }
    let manager = PanelManager::create(config, registry, HeadlessHost::new(), MemoryLoader::new());
    (manager, journal)
}

/// Manager whose descriptors are customized by `build`
pub fn custom_manager(
    config: PanelConfig,
    build: impl FnOnce(&Journal) -> Vec<PanelDescriptor>,
) -> (TestManager, Journal) {
    let journal = Journal::new();
    let mut registry = PanelRegistry::new();
    for descriptor in build(&journal) {
        registry.register(descriptor);
    }
    let manager = PanelManager::create(config, registry, HeadlessHost::new(), MemoryLoader::new());
    (manager, journal)
}

/// Open a synchronously loaded panel and return its handler
pub fn open(manager: &mut TestManager, name: &str) -> HandlerId {
    open_with(manager, name, OpenRequest::new())
}

pub fn open_with(manager: &mut TestManager, name: &str, request: OpenRequest) -> HandlerId {
    manager
        .open(name, request)
        .expect("open failed")
        .handler()
        .expect("open did not complete synchronously")
}
