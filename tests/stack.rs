//! Stack tests
//!
//! Push/pop navigation, exclusivity and out-of-order removal

mod common;

use common::{key, open, open_with, test_config, test_manager};

use panelkit::{OpenRequest, PanelError, PanelState};

#[test]
fn test_push_pop_navigation_hooks() {
    let (mut manager, journal) = test_manager(test_config(), &["p1", "p2"]);
    let p1 = open(&mut manager, "p1");
    manager.push(p1, "main", true).unwrap();
    journal.take();

    let p2 = open(&mut manager, "p2");
    manager.push(p2, "main", true).unwrap();
    assert_eq!(
        journal.take(),
        vec!["p2:init", "p2:open", "p2:show", "p1:blur", "p1:hide", "p2:focus"]
    );
    assert_eq!(manager.handler(p1).unwrap().state(), PanelState::Hide);
    assert_eq!(manager.stack_peek("main"), Some(p2));

    let popped = manager.pop("main", true, true).unwrap();
    assert_eq!(popped, p2);
    assert_eq!(
        journal.take(),
        vec!["p2:blur", "p1:show", "p1:resume", "p1:focus", "p2:close"]
    );
    assert_eq!(manager.handler(p1).unwrap().state(), PanelState::Open);
    assert_eq!(manager.handler(p2).unwrap().state(), PanelState::Closed);
    assert!(manager.handler(p2).unwrap().stack_name().is_none());
    assert_eq!(manager.stack_depth("main"), 1);
}

#[test]
fn test_open_request_pushes_after_show() {
    let (mut manager, journal) = test_manager(test_config(), &["home", "settings"]);
    let home = open_with(&mut manager, "home", OpenRequest::new().stack("main"));
    let settings = open_with(&mut manager, "settings", OpenRequest::new().stack("main"));

    assert_eq!(manager.stacks().members("main"), vec![home, settings]);
    assert_eq!(
        journal.hooks_of("settings"),
        vec!["init", "open", "show", "focus"]
    );
    assert_eq!(
        journal.hooks_of("home"),
        vec!["init", "open", "show", "focus", "blur", "hide"]
    );
}

#[test]
fn test_pop_empty_stack_fails() {
    let (mut manager, _journal) = test_manager(test_config(), &[]);

    assert_eq!(
        manager.pop("main", true, true),
        Err(PanelError::EmptyStackPop("main".to_string()))
    );
}

#[test]
fn test_push_onto_other_stack_leaves_first() {
    let (mut manager, _journal) = test_manager(test_config(), &["p"]);
    let p = open(&mut manager, "p");
    manager.push(p, "a", true).unwrap();

    manager.push(p, "b", true).unwrap();

    assert_eq!(manager.stack_depth("a"), 0);
    assert_eq!(manager.stacks().members("b"), vec![p]);
    assert_eq!(manager.handler(p).unwrap().stack_name(), Some("b"));
}

#[test]
fn test_push_onto_other_stack_focuses_new_top_of_first() {
    let (mut manager, journal) = test_manager(test_config(), &["a1", "a2"]);
    let a1 = open_with(&mut manager, "a1", OpenRequest::new().stack("a"));
    let a2 = open_with(&mut manager, "a2", OpenRequest::new().stack("a"));
    journal.take();

    manager.push(a2, "b", true).unwrap();

    assert_eq!(journal.take(), vec!["a1:focus", "a2:focus"]);
    assert_eq!(manager.stack_peek("a"), Some(a1));
    assert_eq!(manager.stacks().members("b"), vec![a2]);
}

#[test]
fn test_repush_top_onto_same_stack_fires_only_focus() {
    let (mut manager, journal) = test_manager(test_config(), &["p1", "p2"]);
    let p1 = open_with(&mut manager, "p1", OpenRequest::new().stack("main"));
    let p2 = open_with(&mut manager, "p2", OpenRequest::new().stack("main"));
    journal.take();

    manager.push(p2, "main", true).unwrap();

    assert_eq!(journal.take(), vec!["p2:focus"]);
    assert_eq!(manager.stacks().members("main"), vec![p1, p2]);
}

#[test]
fn test_close_removes_from_stack_and_focuses_new_top() {
    let (mut manager, journal) = test_manager(test_config(), &["p1", "p2"]);
    let p1 = open_with(&mut manager, "p1", OpenRequest::new().stack("main"));
    let p2 = open_with(&mut manager, "p2", OpenRequest::new().stack("main"));
    journal.take();

    manager.close(p2).unwrap();

    assert_eq!(journal.take(), vec!["p2:close", "p1:focus"]);
    assert_eq!(manager.stacks().members("main"), vec![p1]);
    // Removal has no show side effects on the new top
    assert_eq!(manager.handler(p1).unwrap().state(), PanelState::Hide);
}

#[test]
fn test_remove_from_middle_fires_nothing() {
    let (mut manager, journal) = test_manager(test_config(), &["a", "b", "c"]);
    let a = open_with(&mut manager, "a", OpenRequest::new().stack("main"));
    let b = open_with(&mut manager, "b", OpenRequest::new().stack("main"));
    let c = open_with(&mut manager, "c", OpenRequest::new().stack("main"));
    journal.take();

    let removal = manager.remove_from_stack(b).unwrap();

    assert!(!removal.was_top);
    assert_eq!(removal.stack, "main");
    assert_eq!(removal.new_top, Some(c));
    assert!(journal.is_empty());
    assert_eq!(manager.stacks().members("main"), vec![a, c]);
    assert!(manager.remove_from_stack(b).is_none());
}

#[test]
fn test_pop_without_show_or_close() {
    let (mut manager, journal) = test_manager(test_config(), &["p1", "p2"]);
    let p1 = open_with(&mut manager, "p1", OpenRequest::new().stack("main"));
    let p2 = open_with(&mut manager, "p2", OpenRequest::new().stack("main"));
    journal.take();

    manager.pop("main", false, false).unwrap();

    assert_eq!(journal.take(), vec!["p2:blur"]);
    assert_eq!(manager.handler(p1).unwrap().state(), PanelState::Hide);
    assert_eq!(manager.handler(p2).unwrap().state(), PanelState::Open);
}

#[test]
fn test_push_without_hiding_previous() {
    let (mut manager, journal) = test_manager(test_config(), &["p1", "p2"]);
    let p1 = open(&mut manager, "p1");
    manager.push(p1, "main", true).unwrap();
    let p2 = open(&mut manager, "p2");
    journal.take();

    manager.push(p2, "main", false).unwrap();

    assert_eq!(journal.take(), vec!["p2:focus"]);
    assert_eq!(manager.handler(p1).unwrap().state(), PanelState::Open);
}

#[test]
fn test_pop_onto_visible_panel_skips_show() {
    let (mut manager, journal) = test_manager(test_config(), &["p1", "p2"]);
    let p1 = open(&mut manager, "p1");
    manager.push(p1, "main", true).unwrap();
    let p2 = open(&mut manager, "p2");
    manager.push(p2, "main", false).unwrap();
    journal.take();

    manager.pop("main", true, true).unwrap();

    assert_eq!(
        journal.take(),
        vec!["p2:blur", "p1:resume", "p1:focus", "p2:close"]
    );
    assert_eq!(manager.handler(p1).unwrap().state(), PanelState::Open);
}

#[test]
fn test_shutdown_destroys_stacked_panels() {
    let (mut manager, journal) = test_manager(test_config(), &["p1", "p2"]);
    open_with(&mut manager, "p1", OpenRequest::new().stack("main"));
    open_with(&mut manager, "p2", OpenRequest::new().stack("main"));
    assert!(manager.handler_for(&key("p2")).unwrap().stack_name().is_some());
    journal.take();

    let (host, _loader) = manager.shutdown();

    assert_eq!(host.destroyed_count(), 2);
    assert_eq!(journal.hooks_of("p1"), vec!["close", "cleanup"]);
    assert_eq!(journal.hooks_of("p2"), vec!["close", "cleanup"]);
}
