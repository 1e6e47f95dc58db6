#![allow(dead_code)]

use policy_crawler::driver::simulated::{SimScreen, SimulatedApp};
use policy_crawler::driver::tree::{RawView, UiTree};
use policy_crawler::screen::snapshot::ScreenSnapshot;

pub const APP: &str = "com.example.app";

// ============================================================================
// View builders
// ============================================================================

/// Screen identifier inside the test app: `com.example.app/.Name`.
pub fn sid(name: &str) -> String {
    format!("{}/.{}", APP, name)
}

pub fn button(text: &str) -> RawView {
    RawView::new("android.widget.Button", APP).text(text).clickable()
}

/// A clickable link inside rendered web content.
pub fn web_link(text: &str) -> RawView {
    RawView::new("android.view.View", APP).text(text).clickable()
}

pub fn label(text: &str) -> RawView {
    RawView::new("android.widget.TextView", APP).text(text)
}

pub fn column(children: Vec<RawView>) -> RawView {
    RawView::new("android.widget.LinearLayout", APP).children(children)
}

/// `FrameLayout > LinearLayout > children`, the shape of a plain activity.
pub fn window(children: Vec<RawView>) -> RawView {
    RawView::new("android.widget.FrameLayout", APP).child(column(children))
}

/// `FrameLayout > ScrollView > LinearLayout > items`.
pub fn scrolling_window(items: Vec<RawView>) -> RawView {
    RawView::new("android.widget.FrameLayout", APP).child(
        RawView::new("android.widget.ScrollView", APP)
            .scrollable()
            .child(column(items)),
    )
}

pub fn screen(name: &str, children: Vec<RawView>) -> SimScreen {
    SimScreen::new(&sid(name), window(children))
}

/// A screen showing a long policy text.
pub fn policy_screen(name: &str) -> SimScreen {
    screen(name, vec![label("Privacy Policy"), label(&policy_text(600, 30))])
}

pub fn snapshot_of(mut root: RawView) -> ScreenSnapshot {
    root.auto_layout();
    ScreenSnapshot::from_tree(&UiTree::from_raw(&root)).unwrap()
}

// ============================================================================
// Texts
// ============================================================================

/// `words` words, `hits` of which are "privacy" and the rest filler.
pub fn policy_text(words: usize, hits: usize) -> String {
    let mut parts = vec!["privacy"; hits.min(words)];
    parts.extend(std::iter::repeat_n("lorem", words.saturating_sub(hits)));
    parts.join(" ")
}

// ============================================================================
// Apps
// ============================================================================

/// Main screen with "Home" (stays put) and "Privacy" (leads to the policy).
pub fn privacy_link_app() -> SimulatedApp {
    SimulatedApp::new(APP, screen("Main", vec![label("Welcome"), button("Home"), button("Privacy")]))
        .screen(policy_screen("Policy"))
        .link(&sid("Main"), "Home", &sid("Main"))
        .link(&sid("Main"), "Privacy", &sid("Policy"))
}

/// A -> B, C; B -> D; C -> E. No policy anywhere.
pub fn tree_app() -> SimulatedApp {
    SimulatedApp::new(APP, screen("A", vec![label("screen a"), button("B"), button("C")]))
        .screen(screen("B", vec![label("screen b"), button("D")]))
        .screen(screen("C", vec![label("screen c"), button("E")]))
        .screen(screen("D", vec![label("screen d")]))
        .screen(screen("E", vec![label("screen e")]))
        .link(&sid("A"), "B", &sid("B"))
        .link(&sid("A"), "C", &sid("C"))
        .link(&sid("B"), "D", &sid("D"))
        .link(&sid("C"), "E", &sid("E"))
}
