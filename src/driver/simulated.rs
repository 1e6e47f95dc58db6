use std::collections::{HashMap, HashSet};
use std::fs;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, trace};

use crate::driver::tree::{NodeId, RawView, UiNode, UiTree};
use crate::driver::{AutomationDriver, DriverSettings};
use crate::error::CrawlError;

/// One screen of a [`SimulatedApp`]: a hierarchy per scroll position.
#[derive(Debug, Clone)]
pub struct SimScreen {
    pub id: String,
    frames: Vec<UiTree>,
}

impl SimScreen {
    /// A screen showing `root`, laid out automatically where bounds are missing.
    pub fn new(id: &str, root: RawView) -> Self {
        Self {
            id: id.to_string(),
            frames: vec![layout(root)],
        }
    }

    /// The hierarchy shown after one more scroll gesture.
    pub fn then_scrolled(mut self, root: RawView) -> Self {
        self.frames.push(layout(root));
        self
    }

    fn from_description(description: ScreenDescription) -> Result<Self, CrawlError> {
        let mut frames = description.frames.into_iter();
        let first = frames
            .next()
            .ok_or_else(|| CrawlError::Configuration(format!("screen '{}' has no frames", description.id)))?;
        Ok(frames.fold(SimScreen::new(&description.id, first), SimScreen::then_scrolled))
    }
}

// ============================================================================
// Description files
// ============================================================================

/// A simulated app as written in a YAML description, used for dry runs.
///
/// ```yaml
/// app_id: com.example.app
/// start: com.example.app/.Main
/// screens:
///   - id: com.example.app/.Main
///     frames:
///       - class: android.widget.Button
///         package: com.example.app
///         text: Privacy
///         clickable: true
/// links:
///   - { from: com.example.app/.Main, trigger: Privacy, to: com.example.app/.Policy }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct AppDescription {
    pub app_id: String,
    pub start: String,
    pub screens: Vec<ScreenDescription>,
    #[serde(default)]
    pub links: Vec<LinkDescription>,
    /// Screens whose identifier cannot be queried.
    #[serde(default)]
    pub hidden: Vec<String>,
}

/// One screen: its identifier and one hierarchy per scroll position.
#[derive(Debug, Clone, Deserialize)]
pub struct ScreenDescription {
    pub id: String,
    pub frames: Vec<RawView>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkDescription {
    pub from: String,
    pub trigger: String,
    pub to: String,
}

impl AppDescription {
    pub fn load(path: &str) -> Result<Self, CrawlError> {
        let content = fs::read_to_string(path)
            .map_err(|e| CrawlError::Configuration(format!("cannot read app description '{}': {}", path, e)))?;
        let description: AppDescription = serde_yaml::from_str(&content)
            .map_err(|e| CrawlError::Configuration(format!("malformed app description '{}': {}", path, e)))?;
        debug!(path, app = %description.app_id, screens = description.screens.len(), "loaded app description");
        Ok(description)
    }
}

fn layout(mut root: RawView) -> UiTree {
    root.auto_layout();
    UiTree::from_raw(&root)
}

/// Device calls made so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimCounters {
    pub launches: usize,
    pub taps: usize,
    pub stale_taps: usize,
    pub scrolls: usize,
    pub dumps: usize,
}

// ============================================================================
// SimulatedApp
// ============================================================================

/// Deterministic in-memory app used to exercise the crawler without a device.
///
/// Tapping an element whose own or descendant text (or resource id) is a
/// registered trigger on the current screen navigates to the linked screen.
/// Any other tap leaves the screen as is. Scrolling advances the current
/// screen's frame until the last one.
pub struct SimulatedApp {
    app_id: String,
    settings: DriverSettings,
    start: String,
    screens: HashMap<String, SimScreen>,
    links: HashMap<(String, String), String>,
    hidden: HashSet<String>,
    current: String,
    position: usize,
    counters: SimCounters,
    visits: Vec<String>,
}

impl SimulatedApp {
    pub fn new(app_id: &str, start: SimScreen) -> Self {
        let start_id = start.id.clone();
        let mut screens = HashMap::new();
        screens.insert(start_id.clone(), start);
        Self {
            app_id: app_id.to_string(),
            settings: DriverSettings {
                idle_timeout: Duration::ZERO,
                ..DriverSettings::default()
            },
            start: start_id.clone(),
            screens,
            links: HashMap::new(),
            hidden: HashSet::new(),
            current: start_id,
            position: 0,
            counters: SimCounters::default(),
            visits: Vec::new(),
        }
    }

    /// Build the app a description file describes.
    pub fn from_description(description: AppDescription) -> Result<Self, CrawlError> {
        let mut screens = description
            .screens
            .into_iter()
            .map(SimScreen::from_description)
            .collect::<Result<Vec<_>, _>>()?;
        let start = screens
            .iter()
            .position(|s| s.id == description.start)
            .map(|i| screens.remove(i))
            .ok_or_else(|| CrawlError::Configuration(format!("start screen '{}' is not described", description.start)))?;

        let mut app = SimulatedApp::new(&description.app_id, start);
        for screen in screens {
            app = app.screen(screen);
        }
        for link in &description.links {
            app = app.link(&link.from, &link.trigger, &link.to);
        }
        for screen in &description.hidden {
            app = app.hide_screen_id(screen);
        }
        Ok(app)
    }

    pub fn screen(mut self, screen: SimScreen) -> Self {
        self.screens.insert(screen.id.clone(), screen);
        self
    }

    /// On screen `from`, tapping `trigger` leads to screen `to`.
    pub fn link(mut self, from: &str, trigger: &str, to: &str) -> Self {
        self.links
            .insert((from.to_string(), trigger.to_string()), to.to_string());
        self
    }

    /// Make `current_screen_id` fail while `screen` is shown.
    pub fn hide_screen_id(mut self, screen: &str) -> Self {
        self.hidden.insert(screen.to_string());
        self
    }

    pub fn with_settings(mut self, settings: DriverSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn counters(&self) -> &SimCounters {
        &self.counters
    }

    /// Screens entered through taps, in order.
    pub fn visits(&self) -> &[String] {
        &self.visits
    }

    fn frame(&self) -> Result<&UiTree, CrawlError> {
        let screen = self
            .screens
            .get(&self.current)
            .ok_or_else(|| CrawlError::driver("hierarchy", format!("unknown screen '{}'", self.current)))?;
        let last = screen.frames.len().saturating_sub(1);
        screen
            .frames
            .get(self.position.min(last))
            .ok_or_else(|| CrawlError::driver("hierarchy", format!("screen '{}' has no frames", self.current)))
    }

    /// The live counterpart of a node from an earlier dump, if still on screen.
    fn live(tree: &UiTree, node: &UiNode) -> Option<NodeId> {
        tree.select(|n| {
            n.class_name == node.class_name && n.bounds == node.bounds && n.text == node.text
        })
        .into_iter()
        .next()
    }

    fn target_of(&self, tree: &UiTree, id: NodeId) -> Option<String> {
        std::iter::once(id).chain(tree.descendants(id)).find_map(|n| {
            let node = tree.node(n);
            [node.text.as_deref(), node.resource_id.as_deref()]
                .into_iter()
                .flatten()
                .find_map(|trigger| self.links.get(&(self.current.clone(), trigger.to_string())))
                .cloned()
        })
    }
}

impl AutomationDriver for SimulatedApp {
    fn app_id(&self) -> &str {
        &self.app_id
    }

    fn settings(&self) -> DriverSettings {
        self.settings
    }

    fn launch(&mut self) -> Result<(), CrawlError> {
        self.counters.launches += 1;
        self.current = self.start.clone();
        self.position = 0;
        Ok(())
    }

    fn hierarchy(&mut self) -> Result<UiTree, CrawlError> {
        self.counters.dumps += 1;
        self.frame().cloned()
    }

    fn tap(&mut self, node: &UiNode) -> Result<(), CrawlError> {
        let tree = self.frame()?.clone();
        let Some(live) = Self::live(&tree, node) else {
            self.counters.stale_taps += 1;
            return Err(CrawlError::stale(format!("{} is not on '{}'", node.class_name, self.current)));
        };
        self.counters.taps += 1;

        if let Some(target) = self.target_of(&tree, live) {
            if !self.screens.contains_key(&target) {
                return Err(CrawlError::driver("tap", format!("link to unknown screen '{}'", target)));
            }
            trace!(from = %self.current, to = %target, "simulated navigation");
            self.current = target.clone();
            self.position = 0;
            self.visits.push(target);
        }
        Ok(())
    }

    fn scroll_down(&mut self, node: &UiNode) -> Result<bool, CrawlError> {
        if !node.scrollable {
            return Ok(false);
        }
        self.counters.scrolls += 1;
        let frames = self.screens.get(&self.current).map(|s| s.frames.len()).unwrap_or(0);
        if self.position + 1 < frames {
            self.position += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn wait_for_idle(&mut self, _timeout: Duration) -> Result<(), CrawlError> {
        Ok(())
    }

    fn current_screen_id(&mut self) -> Result<String, CrawlError> {
        if self.hidden.contains(&self.current) {
            return Err(CrawlError::screen_id(format!("'{}' reports no window", self.current)));
        }
        Ok(self.current.clone())
    }
}
