//! Panel system - type keys, lifecycle hooks, handlers and the descriptor registry
//!
//! A panel is one instance of a UI screen identified by its [`PanelKey`]. The manager keeps at
//! most one live instance per key and drives it through [`PanelState`] transitions, calling the
//! [`Panel`] hooks along the way.
//!
//! ## Architecture
//!
//! - `PanelKey`: stable identifier for a panel kind (one concrete kind per key)
//! - `Panel` trait: lifecycle hooks implemented by panel behaviour objects
//! - `PanelHandler`: per-instance metadata (level, hotness, cache mode, stack binding)
//! - `HandlerPool`: slot-reusing storage for handlers, addressed by generational `HandlerId`
//! - `PanelRegistry`: key -> descriptor (instantiate, default level, cache mode hint)

pub mod handler;
pub mod registry;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use handler::{HandlerId, HandlerPool, PanelHandler, StackBinding};
pub use registry::{LoadMode, PanelDescriptor, PanelRegistry};

/// Opaque payload handed to `init`/`open` and used as dialog configuration
pub type PanelData = serde_json::Value;

/// Unique identifier for a panel kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PanelKey(String);

impl PanelKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PanelKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for PanelKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Display for PanelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a panel instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelState {
    /// Not visible and not registered with any level
    #[default]
    Closed,
    /// Registered and visible
    Open,
    /// Registered but hidden (e.g. covered by a stack push)
    Hide,
}

impl PanelState {
    pub fn is_visible(&self) -> bool {
        matches!(self, PanelState::Open)
    }
}

/// Destroy-on-close policy for a panel kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    /// Kept after close while its hotness is positive; decay reclaims it
    #[default]
    Hot,
    /// Never destroyed by close or decay
    Persistent,
    /// Destroyed as soon as it closes
    Temporary,
}

/// Lifecycle hooks invoked on a panel instance
///
/// Every hook has an empty default so panels only implement what they react to.
/// `focus`, `blur` and `resume` are fired by stack navigation.
pub trait Panel {
    /// Called once, right after the instance is created and before the first `open`
    fn init(&mut self, _data: &PanelData) {}
    /// Called on every open request, including reopening a cached instance
    fn open(&mut self, _data: &PanelData) {}
    fn show(&mut self) {}
    fn hide(&mut self) {}
    fn close(&mut self) {}
    /// Called right before the instance is destroyed
    fn cleanup(&mut self) {}
    fn focus(&mut self) {}
    fn blur(&mut self) {}
    fn resume(&mut self) {}
}
