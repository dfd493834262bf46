//! Panel lifecycle and cache manager
//!
//! Decides when a UI panel is created, shown, hidden, reused or destroyed, and keeps a
//! consistent picture of which panels occupy which layer, which are stacked for
//! back-navigation, and which dialog currently owns input.
//!
//! The render tree and the template loader are collaborators behind the [`host::RenderHost`]
//! and [`host::PanelLoader`] traits; [`headless`] provides in-memory versions of both.

pub mod cache;
pub mod cli;
pub mod config;
pub mod config_paths;
pub mod dialog;
pub mod error;
pub mod focus;
pub mod headless;
pub mod host;
pub mod level;
pub mod manager;
pub mod panel;
pub mod script;
pub mod snapshot;
pub mod stack;
pub mod tracing;

// Re-export commonly used types
pub use config::PanelConfig;
pub use dialog::{DialogRequest, DialogResult};
pub use error::PanelError;
pub use focus::InputMode;
pub use host::{NodeId, PanelLoader, RenderHost, TemplateId};
pub use manager::{LoadStatus, OpenRequest, PanelManager};
pub use panel::{
    CacheMode, HandlerId, LoadMode, Panel, PanelData, PanelDescriptor, PanelKey, PanelRegistry,
    PanelState,
};
