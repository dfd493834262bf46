//! Errors reported by panel operations
//!
//! None of these are fatal: every failing operation leaves the manager as if it had not been
//! called, and the caller is informed through the return value or its callback.

use crate::panel::{HandlerId, PanelKey};

/// Errors that can occur while driving panels
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelError {
    /// The loader or host produced no instance for the key
    LoadFailure(PanelKey),
    /// The key already has a load in flight
    DuplicateLoadRejected(PanelKey),
    /// Pop on an empty named stack
    EmptyStackPop(String),
    /// Dialog request without a resolvable panel kind
    MissingDialogType,
    /// The key was never registered
    UnknownPanel(PanelKey),
    /// The handler was destroyed or never existed
    StaleHandler(HandlerId),
}

impl std::fmt::Display for PanelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PanelError::LoadFailure(key) => write!(f, "failed to load panel {}", key),
            PanelError::DuplicateLoadRejected(key) => {
                write!(f, "panel {} is already loading", key)
            }
            PanelError::EmptyStackPop(name) => write!(f, "stack {} is empty", name),
            PanelError::MissingDialogType => write!(f, "dialog request has no panel type"),
            PanelError::UnknownPanel(key) => write!(f, "panel {} is not registered", key),
            PanelError::StaleHandler(id) => write!(f, "handler {} no longer exists", id),
        }
    }
}

impl std::error::Error for PanelError {}
