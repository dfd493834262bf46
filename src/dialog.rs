//! Serialized dialog queue
//!
//! Dialog requests are consumed strictly FIFO against a single active slot:
//! `Idle -> Showing -> (result) -> Idle`. The queue is plain state; the manager opens the
//! dialog panels and feeds results back in.

use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;
use serde_json::json;

use crate::panel::{HandlerId, PanelData, PanelKey};

/// Outcome delivered to a dialog's result callback
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogResult {
    Confirm,
    Cancel,
    /// Value produced by the dialog (e.g. prompt text)
    Value(PanelData),
}

type DialogCallback = Box<dyn FnOnce(DialogResult)>;

/// A queued dialog request
pub struct DialogRequest {
    panel: Option<PanelKey>,
    config: PanelData,
    level: Option<i32>,
    on_result: Option<DialogCallback>,
}

impl DialogRequest {
    pub fn new(panel: impl Into<PanelKey>) -> Self {
        Self::with_panel(Some(panel.into()))
    }

    /// Request whose panel kind may be unresolved
    pub fn with_panel(panel: Option<PanelKey>) -> Self {
        Self {
            panel,
            config: PanelData::Null,
            level: None,
            on_result: None,
        }
    }

    pub fn alert(panel: Option<PanelKey>, title: &str, message: &str) -> Self {
        Self::with_panel(panel).config(json!({
            "kind": "alert",
            "title": title,
            "message": message,
        }))
    }

    pub fn confirm(panel: Option<PanelKey>, title: &str, message: &str) -> Self {
        Self::with_panel(panel).config(json!({
            "kind": "confirm",
            "title": title,
            "message": message,
        }))
    }

    pub fn prompt(panel: Option<PanelKey>, title: &str, placeholder: &str) -> Self {
        Self::with_panel(panel).config(json!({
            "kind": "prompt",
            "title": title,
            "placeholder": placeholder,
        }))
    }

    pub fn config(mut self, config: PanelData) -> Self {
        self.config = config;
        self
    }

    pub fn level(mut self, level: i32) -> Self {
        self.level = Some(level);
        self
    }

    pub fn on_result(mut self, callback: impl FnOnce(DialogResult) + 'static) -> Self {
        self.on_result = Some(Box::new(callback));
        self
    }

    pub fn panel(&self) -> Option<&PanelKey> {
        self.panel.as_ref()
    }

    pub fn config_data(&self) -> &PanelData {
        &self.config
    }

    pub fn requested_level(&self) -> Option<i32> {
        self.level
    }

    pub(crate) fn into_parts(self) -> (Option<PanelKey>, PanelData, Option<i32>, Option<DialogCallback>) {
        (self.panel, self.config, self.level, self.on_result)
    }

    pub(crate) fn respond(self, result: DialogResult) {
        if let Some(callback) = self.on_result {
            callback(result);
        }
    }
}

impl fmt::Debug for DialogRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogRequest")
            .field("panel", &self.panel)
            .field("config", &self.config)
            .field("level", &self.level)
            .field("has_callback", &self.on_result.is_some())
            .finish()
    }
}

/// State of the single dialog slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogSlot {
    Idle,
    Showing,
}

/// The dialog currently owning the slot
pub struct ActiveDialog {
    pub panel: PanelKey,
    /// None while the dialog panel is still loading
    pub handler: Option<HandlerId>,
    callback: Option<DialogCallback>,
}

impl ActiveDialog {
    pub(crate) fn respond(mut self, result: DialogResult) {
        if let Some(callback) = self.callback.take() {
            callback(result);
        }
    }
}

impl fmt::Debug for ActiveDialog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveDialog")
            .field("panel", &self.panel)
            .field("handler", &self.handler)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct DialogQueue {
    queue: VecDeque<DialogRequest>,
    active: Option<ActiveDialog>,
    processing: bool,
}

impl DialogQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn enqueue(&mut self, request: DialogRequest) {
        self.queue.push_back(request);
    }

    /// Enter the drain loop; false if a drain is already running or a dialog is showing
    pub(crate) fn begin_drain(&mut self) -> bool {
        if self.processing || self.active.is_some() {
            return false;
        }
        self.processing = true;
        true
    }

    pub(crate) fn end_drain(&mut self) {
        self.processing = false;
    }

    /// Next request to show, if the slot is free
    pub(crate) fn next_request(&mut self) -> Option<DialogRequest> {
        if self.active.is_some() {
            return None;
        }
        self.queue.pop_front()
    }

    pub(crate) fn activate(
        &mut self,
        panel: PanelKey,
        handler: Option<HandlerId>,
        callback: Option<DialogCallback>,
    ) {
        debug_assert!(self.active.is_none());
        self.active = Some(ActiveDialog {
            panel,
            handler,
            callback,
        });
    }

    /// Bind the handler of an asynchronously loaded dialog panel
    pub(crate) fn attach_handler(&mut self, panel: &PanelKey, handler: HandlerId) -> bool {
        match self.active.as_mut() {
            Some(active) if &active.panel == panel && active.handler.is_none() => {
                active.handler = Some(handler);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn take_active(&mut self) -> Option<ActiveDialog> {
        self.active.take()
    }

    /// Whether the active dialog is still waiting on its panel load
    pub(crate) fn is_waiting_on(&self, panel: &PanelKey) -> bool {
        matches!(&self.active, Some(active) if &active.panel == panel && active.handler.is_none())
    }

    /// Cancel every queued request, returning how many were cancelled
    pub(crate) fn cancel_queued(&mut self) -> usize {
        let cancelled: Vec<DialogRequest> = self.queue.drain(..).collect();
        let count = cancelled.len();
        for request in cancelled {
            request.respond(DialogResult::Cancel);
        }
        count
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Number of requests waiting behind the active dialog
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn slot(&self) -> DialogSlot {
        if self.active.is_some() {
            DialogSlot::Showing
        } else {
            DialogSlot::Idle
        }
    }

    pub fn active_panel(&self) -> Option<&PanelKey> {
        self.active.as_ref().map(|active| &active.panel)
    }

    pub fn active_handler(&self) -> Option<HandlerId> {
        self.active.as_ref().and_then(|active| active.handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_cancel_queued_notifies_every_request() {
        let results = Rc::new(RefCell::new(Vec::new()));
        let mut queue = DialogQueue::new();
        for name in ["a", "b"] {
            let results = results.clone();
            queue.enqueue(
                DialogRequest::new(name).on_result(move |r| results.borrow_mut().push((name, r))),
            );
        }

        assert_eq!(queue.cancel_queued(), 2);
        assert!(queue.is_empty());
        assert_eq!(
            *results.borrow(),
            vec![("a", DialogResult::Cancel), ("b", DialogResult::Cancel)]
        );
    }

    #[test]
    fn test_drain_guard_blocks_nested_and_showing() {
        let mut queue = DialogQueue::new();
        assert!(queue.begin_drain());
        assert!(!queue.begin_drain());
        queue.end_drain();

        queue.activate(PanelKey::from("d"), None, None);
        assert!(!queue.begin_drain());
        assert_eq!(queue.slot(), DialogSlot::Showing);
        assert!(queue.is_waiting_on(&PanelKey::from("d")));
    }
}
