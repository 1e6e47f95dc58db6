use std::time::Duration;

use pretty_assertions::assert_eq;

use policy_crawler::driver::session::{BridgeRequest, BridgeResponse, parse_focused_window};
use policy_crawler::driver::tree::{Bounds, RawView, UiTree};
use policy_crawler::driver::{AutomationDriver, DriverSettings};
use policy_crawler::error::CrawlError;

mod common;

use common::{privacy_link_app, sid};

// ============================================================================
// Focused window parsing
// ============================================================================

#[test]
fn focused_app_line_yields_component() {
    let dumpsys = "\
WINDOW MANAGER WINDOWS (dumpsys window windows)
  mCurrentFocus=Window{3c1e2f0 u0 com.example.app/com.example.app.MainActivity}
  mFocusedApp=AppWindowToken{41d6a0b8 token=Token{41d1bc10 ActivityRecord{41d0c6b0 u0 com.example.app/.MainActivity t12}}}
";
    assert_eq!(
        parse_focused_window(dumpsys).unwrap(),
        Some("com.example.app/.MainActivity".to_string())
    );
}

#[test]
fn missing_focused_app_yields_none() {
    assert_eq!(parse_focused_window("mCurrentFocus=null\n").unwrap(), None);
}

// ============================================================================
// Bridge wire format
// ============================================================================

#[test]
fn requests_serialize_as_flat_commands() {
    let line = serde_json::to_string(&BridgeRequest::launch("com.example.app")).unwrap();
    assert_eq!(line, r#"{"cmd":"launch","package":"com.example.app"}"#);

    let line = serde_json::to_string(&BridgeRequest::wait_idle(Duration::from_millis(2500))).unwrap();
    assert_eq!(line, r#"{"cmd":"wait_idle","timeout_ms":2500}"#);
}

#[test]
fn tap_targets_center_of_bounds() {
    let mut root = RawView::new("android.widget.Button", "com.example.app")
        .text("OK")
        .clickable()
        .bounds(Bounds::new(0, 100, 200, 300));
    root.auto_layout();
    let tree = UiTree::from_raw(&root);

    let value = serde_json::to_value(BridgeRequest::tap(tree.node(0))).unwrap();
    assert_eq!(value["cmd"], "tap");
    assert_eq!(value["x"], 100);
    assert_eq!(value["y"], 200);
}

#[test]
fn hierarchy_response_parses_nested_views() {
    let line = r#"{"ok":true,"tree":{"class":"android.widget.FrameLayout","package":"com.example.app",
        "bounds":{"left":0,"top":0,"right":1080,"bottom":1920},
        "children":[{"class":"android.widget.Button","text":"Privacy","resourceId":"com.example.app:id/privacy","clickable":true}]}}"#;
    let response: BridgeResponse = serde_json::from_str(line).unwrap();
    assert!(response.ok);

    let tree = UiTree::from_raw(&response.tree.unwrap());
    assert_eq!(tree.len(), 2);
    let button = tree.node(1);
    assert!(button.is_class("Button"));
    assert!(button.clickable);
    assert_eq!(button.resource_id.as_deref(), Some("com.example.app:id/privacy"));
    assert_eq!(tree.parent(1), Some(0));
}

#[test]
fn stale_response_flag_defaults_to_false() {
    let response: BridgeResponse = serde_json::from_str(r#"{"ok":false,"error":"boom"}"#).unwrap();
    assert!(!response.stale);
    assert_eq!(response.error.as_deref(), Some("boom"));
}

// ============================================================================
// Simulated app
// ============================================================================

#[test]
fn simulated_app_replays_paths_from_launch() {
    let mut app = privacy_link_app();
    app.restart().unwrap();
    let privacy = app
        .actionable_elements()
        .unwrap()
        .into_iter()
        .find(|a| a.label() == Some("Privacy"))
        .unwrap();

    app.replay(&[privacy.clone()]).unwrap();
    assert_eq!(app.current(), sid("Policy"));

    app.replay(&[privacy]).unwrap();
    assert_eq!(app.counters().launches, 3);
    assert_eq!(app.counters().taps, 2);
}

#[test]
fn hidden_screen_id_is_unavailable() {
    let mut app = privacy_link_app().hide_screen_id(&sid("Main"));
    app.restart().unwrap();
    let err = app.current_screen_id().unwrap_err();
    assert!(matches!(err, CrawlError::ScreenIdentifierUnavailable { .. }));
    assert!(!err.is_fatal());
    assert!(!err.is_recoverable());
}

#[test]
fn simulated_settings_can_be_overridden() {
    let settings = DriverSettings {
        idle_timeout: Duration::from_millis(10),
        scroll_limit: 1,
    };
    let app = privacy_link_app().with_settings(settings);
    assert_eq!(app.settings(), settings);
    assert_eq!(DriverSettings::default().scroll_limit, 3);
}
