pub mod session;
pub mod simulated;
pub mod tree;

use std::time::Duration;

use crate::error::CrawlError;
use crate::screen::capture;
use crate::screen::snapshot::ScreenSnapshot;
use crate::state::address::{self, ElementAddress};

use tree::{UiNode, UiTree};

/// Default wait after a launch or click before the screen is observed.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_millis(2500);

/// Default number of scroll gestures tried per scrollable container.
pub const DEFAULT_SCROLL_LIMIT: usize = 3;

/// Timing and scrolling bounds shared by every driver-backed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverSettings {
    pub idle_timeout: Duration,
    pub scroll_limit: usize,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            scroll_limit: DEFAULT_SCROLL_LIMIT,
        }
    }
}

// ============================================================================
// AutomationDriver
// ============================================================================

/// The only component that touches the live UI.
///
/// Implementors provide the device primitives; the navigation operations the
/// searches use (`restart`, `replay`, `click`, `current_screen`,
/// `actionable_elements`) are built on top of them here so that addressing and
/// capture behave the same on every backend.
///
/// Every call blocks and may fail. A wait that times out is not an error.
pub trait AutomationDriver {
    /// Identifier of the app under exploration (package name).
    fn app_id(&self) -> &str;

    /// Relaunch the app from a cleared task.
    fn launch(&mut self) -> Result<(), CrawlError>;

    /// Dump the current foreground hierarchy.
    fn hierarchy(&mut self) -> Result<UiTree, CrawlError>;

    /// Click the given node of the most recent dump.
    fn tap(&mut self, node: &UiNode) -> Result<(), CrawlError>;

    /// Scroll a container down by one gesture. Returns `false` when it could not move.
    fn scroll_down(&mut self, node: &UiNode) -> Result<bool, CrawlError>;

    /// Block until the UI settles or `timeout` elapses.
    fn wait_for_idle(&mut self, timeout: Duration) -> Result<(), CrawlError>;

    /// Logical identifier of the foreground screen (`package/Activity`).
    fn current_screen_id(&mut self) -> Result<String, CrawlError>;

    fn settings(&self) -> DriverSettings {
        DriverSettings::default()
    }

    /// Relaunch fresh and wait for the first screen.
    fn restart(&mut self) -> Result<(), CrawlError> {
        self.launch()?;
        let timeout = self.settings().idle_timeout;
        self.wait_for_idle(timeout)
    }

    /// Resolve `address` against the live UI, click it and wait for idle.
    fn click(&mut self, address: &ElementAddress) -> Result<(), CrawlError> {
        let node = address::resolve(self, address)?;
        self.tap(&node)?;
        let timeout = self.settings().idle_timeout;
        self.wait_for_idle(timeout)
    }

    /// Restart, then click every address of `path` in order.
    fn replay(&mut self, path: &[ElementAddress]) -> Result<(), CrawlError> {
        self.restart()?;
        for address in path {
            self.click(address)?;
        }
        Ok(())
    }

    /// Capture the current screen, merged across bounded scrolling.
    fn current_screen(&mut self) -> Result<ScreenSnapshot, CrawlError> {
        capture::capture_screen(self)
    }

    /// Addresses of every clickable element, including ones revealed by scrolling.
    fn actionable_elements(&mut self) -> Result<Vec<ElementAddress>, CrawlError> {
        capture::actionable_elements(self)
    }
}
