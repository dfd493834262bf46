//! Focus tests
//!
//! Navigation-mode auto focus, focus memory across hide/show, and fallbacks

mod common;

use common::{custom_manager, open, panel, test_config, test_manager, TestManager};

use panelkit::headless::Journal;
use panelkit::{HandlerId, InputMode, NodeId, RenderHost, TemplateId};

/// Manager where the first loaded kind gets three selectables and the second one
fn navigation_manager(names: &[&str]) -> (TestManager, Journal) {
    let (mut manager, journal) = test_manager(test_config(), names);
    manager.host_mut().define_template(TemplateId(1), 3);
    manager.host_mut().define_template(TemplateId(2), 1);
    manager.set_input_mode(InputMode::Navigation);
    (manager, journal)
}

fn selectables(manager: &TestManager, id: HandlerId) -> Vec<NodeId> {
    let root = manager.handler(id).unwrap().node().unwrap();
    manager.host().selectables(root)
}

#[test]
fn test_navigation_focuses_first_selectable_on_open() {
    let (mut manager, _journal) = navigation_manager(&["menu"]);
    let menu = open(&mut manager, "menu");

    let children = selectables(&manager, menu);
    assert_eq!(children.len(), 3);
    assert_eq!(manager.current_focus(), Some(children[0]));
}

#[test]
fn test_pointer_mode_leaves_focus_alone() {
    let (mut manager, _journal) = navigation_manager(&["menu"]);
    manager.set_input_mode(InputMode::Pointer);

    open(&mut manager, "menu");

    assert_eq!(manager.current_focus(), None);
}

#[test]
fn test_hide_remembers_and_show_restores_focus() {
    let (mut manager, _journal) = navigation_manager(&["menu", "other"]);
    let menu = open(&mut manager, "menu");
    let target = selectables(&manager, menu)[2];
    manager.set_focus(Some(target));

    manager.hide(menu).unwrap();
    assert_eq!(manager.current_focus(), None);
    assert_eq!(manager.focus().remembered(menu), Some(target));

    let other = open(&mut manager, "other");
    assert_eq!(
        manager.current_focus(),
        Some(selectables(&manager, other)[0])
    );

    manager.show(menu).unwrap();
    assert_eq!(manager.current_focus(), Some(target));
    assert_eq!(manager.focus().memory_len(), 0);
}

#[test]
fn test_hide_without_focus_inside_remembers_nothing() {
    let (mut manager, _journal) = navigation_manager(&["menu", "other"]);
    let menu = open(&mut manager, "menu");
    open(&mut manager, "other");

    manager.hide(menu).unwrap();

    assert!(manager.focus().remembered(menu).is_none());
    assert!(manager.current_focus().is_some());
}

#[test]
fn test_inactive_remembered_target_falls_back_to_default() {
    let (mut manager, _journal) = navigation_manager(&["menu"]);
    let menu = open(&mut manager, "menu");
    let children = selectables(&manager, menu);
    manager.set_focus(Some(children[2]));
    manager.set_default_focus(menu, Some(children[1])).unwrap();

    manager.hide(menu).unwrap();
    manager.host_mut().set_active(children[2], false);
    manager.show(menu).unwrap();

    assert_eq!(manager.current_focus(), Some(children[1]));
}

#[test]
fn test_group_fallback_before_depth_first_scan() {
    let (mut manager, _journal) = navigation_manager(&["menu"]);
    manager.set_input_mode(InputMode::Pointer);
    let menu = open(&mut manager, "menu");
    let children = selectables(&manager, menu);
    manager
        .register_focus_group(menu, vec![children[2], children[1]])
        .unwrap();
    manager.hide(menu).unwrap();

    manager.set_input_mode(InputMode::Navigation);
    manager.show(menu).unwrap();

    assert_eq!(manager.current_focus(), Some(children[2]));
}

#[test]
fn test_close_discards_focus_memory() {
    let (mut manager, _journal) = navigation_manager(&["menu"]);
    let menu = open(&mut manager, "menu");
    manager.hide(menu).unwrap();
    assert_eq!(manager.focus().memory_len(), 1);

    manager.close(menu).unwrap();

    assert_eq!(manager.focus().memory_len(), 0);
}

#[test]
fn test_closing_focused_panel_clears_focus() {
    let (mut manager, _journal) = navigation_manager(&["menu"]);
    let menu = open(&mut manager, "menu");
    assert!(manager.current_focus().is_some());

    manager.close(menu).unwrap();

    assert_eq!(manager.current_focus(), None);
}

#[test]
fn test_auto_focus_opt_out() {
    let (mut manager, _journal) = custom_manager(test_config(), |journal| {
        vec![panel("hud", journal).auto_focus(false)]
    });
    manager.host_mut().define_template(TemplateId(1), 2);
    manager.set_input_mode(InputMode::Navigation);

    open(&mut manager, "hud");

    assert_eq!(manager.current_focus(), None);
}

#[test]
fn test_mode_switch_keeps_current_focus() {
    let (mut manager, _journal) = navigation_manager(&["menu"]);
    let menu = open(&mut manager, "menu");
    let focused = manager.current_focus();

    manager.set_input_mode(InputMode::Pointer);

    assert_eq!(manager.input_mode(), InputMode::Pointer);
    assert_eq!(manager.current_focus(), focused);
    assert!(focused.is_some_and(|node| selectables(&manager, menu).contains(&node)));
}
