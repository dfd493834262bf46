//! Dialog queue tests
//!
//! FIFO serialization, result delivery, cancellation and async dialog panels

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{custom_manager, key, panel, test_config, test_manager, TestManager};

use panelkit::config::DialogPanels;
use panelkit::dialog::DialogSlot;
use panelkit::headless::Journal;
use panelkit::{DialogRequest, DialogResult, LoadMode, PanelConfig, PanelState};

type Results = Rc<RefCell<Vec<(String, DialogResult)>>>;

fn results() -> Results {
    Rc::new(RefCell::new(Vec::new()))
}

fn request(name: &str, results: &Results) -> DialogRequest {
    let results = results.clone();
    let tag = name.to_string();
    DialogRequest::new(name).on_result(move |result| results.borrow_mut().push((tag, result)))
}

fn dialog_config() -> PanelConfig {
    PanelConfig {
        dialog_level: 100,
        dialogs: DialogPanels {
            alert: Some(key("alert_box")),
            confirm: Some(key("confirm_box")),
            prompt: Some(key("prompt_box")),
        },
        ..test_config()
    }
}

fn dialog_manager() -> (TestManager, Journal) {
    test_manager(
        dialog_config(),
        &["d1", "d2", "d3", "alert_box", "confirm_box", "prompt_box"],
    )
}

#[test]
fn test_dialogs_shown_one_at_a_time_in_order() {
    let (mut manager, _journal) = dialog_manager();
    let results = results();

    manager.enqueue_dialog(request("d1", &results));
    manager.enqueue_dialog(request("d2", &results));
    manager.enqueue_dialog(request("d3", &results));

    let mut shown = Vec::new();
    while let Some(panel) = manager.dialogs().active_panel().cloned() {
        assert_eq!(manager.dialogs().slot(), DialogSlot::Showing);
        shown.push(panel.to_string());
        assert!(manager.resolve_dialog(DialogResult::Confirm));
    }

    assert_eq!(shown, vec!["d1", "d2", "d3"]);
    assert_eq!(
        *results.borrow(),
        vec![
            ("d1".to_string(), DialogResult::Confirm),
            ("d2".to_string(), DialogResult::Confirm),
            ("d3".to_string(), DialogResult::Confirm),
        ]
    );
    assert_eq!(manager.dialogs().slot(), DialogSlot::Idle);
    assert!(!manager.resolve_dialog(DialogResult::Confirm));
}

#[test]
fn test_queue_length_excludes_showing_dialog() {
    let (mut manager, _journal) = dialog_manager();
    let results = results();

    manager.enqueue_dialog(request("d1", &results));
    manager.enqueue_dialog(request("d2", &results));

    assert_eq!(manager.dialog_queue_len(), 1);
    assert_eq!(manager.dialogs().active_panel(), Some(&key("d1")));
}

#[test]
fn test_dialog_opens_on_dialog_level_and_closes_on_result() {
    let (mut manager, journal) = dialog_manager();
    let results = results();

    manager.enqueue_dialog(request("d1", &results));
    let id = manager.dialogs().active_handler().unwrap();
    assert_eq!(manager.handler(id).unwrap().level(), 100);

    manager.resolve_dialog(DialogResult::Cancel);
    assert_eq!(manager.handler(id).unwrap().state(), PanelState::Closed);
    assert_eq!(journal.hooks_of("d1"), vec!["init", "open", "show", "close"]);

    manager.enqueue_dialog(request("d2", &results).level(7));
    let id = manager.dialogs().active_handler().unwrap();
    assert_eq!(manager.handler(id).unwrap().level(), 7);
}

#[test]
fn test_wrappers_pass_config_as_panel_data() {
    let (mut manager, _journal) = dialog_manager();
    let answer = Rc::new(RefCell::new(None));
    let sink = answer.clone();

    manager.prompt("Name", "your name", move |result| {
        *sink.borrow_mut() = Some(result)
    });

    let id = manager.dialogs().active_handler().unwrap();
    let data = manager.handler(id).unwrap().data().clone();
    assert_eq!(data["kind"], "prompt");
    assert_eq!(data["title"], "Name");
    assert_eq!(data["placeholder"], "your name");

    manager.resolve_dialog(DialogResult::Value(serde_json::json!("Ada")));
    assert_eq!(
        *answer.borrow(),
        Some(DialogResult::Value(serde_json::json!("Ada")))
    );
}

#[test]
fn test_missing_dialog_type_cancels_immediately() {
    let (mut manager, _journal) = test_manager(test_config(), &["d1"]);
    let answer = Rc::new(RefCell::new(None));
    let sink = answer.clone();

    manager.alert("Oops", "no alert panel configured", move |result| {
        *sink.borrow_mut() = Some(result)
    });

    assert_eq!(*answer.borrow(), Some(DialogResult::Cancel));
    assert_eq!(manager.dialogs().slot(), DialogSlot::Idle);
    assert!(manager.handlers().is_empty());
}

#[test]
fn test_unregistered_dialog_panel_cancels_and_next_shows() {
    let (mut manager, _journal) = dialog_manager();
    let results = results();

    manager.enqueue_dialog(request("ghost", &results));
    manager.enqueue_dialog(request("d1", &results));

    assert_eq!(
        *results.borrow(),
        vec![("ghost".to_string(), DialogResult::Cancel)]
    );
    assert_eq!(manager.dialogs().active_panel(), Some(&key("d1")));
}

#[test]
fn test_clear_queue_cancels_only_waiting_requests() {
    let (mut manager, _journal) = dialog_manager();
    let results = results();
    manager.enqueue_dialog(request("d1", &results));
    manager.enqueue_dialog(request("d2", &results));
    manager.enqueue_dialog(request("d3", &results));

    assert_eq!(manager.clear_dialog_queue(), 2);

    assert_eq!(
        *results.borrow(),
        vec![
            ("d2".to_string(), DialogResult::Cancel),
            ("d3".to_string(), DialogResult::Cancel),
        ]
    );
    assert_eq!(manager.dialogs().active_panel(), Some(&key("d1")));
    assert_eq!(manager.dialog_queue_len(), 0);
}

#[test]
fn test_closing_dialog_panel_cancels_and_advances() {
    let (mut manager, _journal) = dialog_manager();
    let results = results();
    manager.enqueue_dialog(request("d1", &results));
    manager.enqueue_dialog(request("d2", &results));

    let d1 = manager.dialogs().active_handler().unwrap();
    manager.close(d1).unwrap();

    assert_eq!(
        *results.borrow(),
        vec![("d1".to_string(), DialogResult::Cancel)]
    );
    assert_eq!(manager.dialogs().active_panel(), Some(&key("d2")));
}

#[test]
fn test_async_dialog_panel_attaches_on_pump() {
    let (mut manager, _journal) = custom_manager(dialog_config(), |journal| {
        vec![panel("slow", journal).load_mode(LoadMode::Async)]
    });
    let results = results();

    manager.enqueue_dialog(request("slow", &results));
    assert_eq!(manager.dialogs().slot(), DialogSlot::Showing);
    assert!(manager.dialogs().active_handler().is_none());

    manager.loader_mut().complete_all();
    assert_eq!(manager.pump(), 1);

    let id = manager.dialogs().active_handler().unwrap();
    assert_eq!(manager.handler(id).unwrap().state(), PanelState::Open);
    assert_eq!(manager.handler(id).unwrap().level(), 100);
}

#[test]
fn test_async_dialog_load_failure_cancels_and_advances() {
    let (mut manager, _journal) = custom_manager(dialog_config(), |journal| {
        vec![
            panel("slow", journal).load_mode(LoadMode::Async),
            panel("d2", journal),
        ]
    });
    manager.loader_mut().fail("slow");
    let results = results();

    manager.enqueue_dialog(request("slow", &results));
    manager.enqueue_dialog(request("d2", &results));
    manager.loader_mut().complete_all();
    manager.pump();

    assert_eq!(
        *results.borrow(),
        vec![("slow".to_string(), DialogResult::Cancel)]
    );
    assert_eq!(manager.dialogs().active_panel(), Some(&key("d2")));
}

#[test]
fn test_dialog_resolved_while_loading_keeps_late_panel_closed() {
    let (mut manager, journal) = custom_manager(dialog_config(), |journal| {
        vec![
            panel("slow", journal).load_mode(LoadMode::Async),
            panel("d2", journal),
        ]
    });
    let results = results();
    manager.enqueue_dialog(request("slow", &results));
    manager.enqueue_dialog(request("d2", &results));

    assert!(manager.resolve_dialog(DialogResult::Cancel));
    assert_eq!(manager.dialogs().active_panel(), Some(&key("d2")));

    manager.loader_mut().complete_all();
    manager.pump();

    let d2 = manager.dialogs().active_handler().unwrap();
    assert_eq!(manager.panels_on(100), &[d2]);
    assert!(journal.hooks_of("slow").is_empty());
    assert!(!manager.is_loading(&key("slow")));

    // The late instance is kept for reuse, not shown
    let slow = manager.handler_for(&key("slow")).unwrap();
    assert_eq!(slow.state(), PanelState::Closed);
    assert!(!manager.host().is_active(slow.node().unwrap()));
    assert_eq!(manager.cache().preloaded_keys(), vec![key("slow")]);
    assert_eq!(
        *results.borrow(),
        vec![("slow".to_string(), DialogResult::Cancel)]
    );
}
