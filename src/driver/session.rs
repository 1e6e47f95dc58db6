use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::driver::tree::{Bounds, RawView, UiNode, UiTree};
use crate::driver::{AutomationDriver, DriverSettings};
use crate::error::CrawlError;

/// Request sent to the on-device bridge over stdin (one JSON line).
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BridgeRequest {
    Launch {
        cmd: &'static str,
        package: String,
    },
    Hierarchy {
        cmd: &'static str,
    },
    Tap {
        cmd: &'static str,
        x: i32,
        y: i32,
        class: String,
    },
    Scroll {
        cmd: &'static str,
        bounds: Bounds,
        steps: u32,
    },
    WaitIdle {
        cmd: &'static str,
        timeout_ms: u64,
    },
    CurrentWindow {
        cmd: &'static str,
    },
    Quit {
        cmd: &'static str,
    },
}

impl BridgeRequest {
    pub fn launch(package: &str) -> Self {
        BridgeRequest::Launch {
            cmd: "launch",
            package: package.to_string(),
        }
    }

    pub fn hierarchy() -> Self {
        BridgeRequest::Hierarchy { cmd: "hierarchy" }
    }

    pub fn tap(node: &UiNode) -> Self {
        let (x, y) = node.bounds.center();
        BridgeRequest::Tap {
            cmd: "tap",
            x,
            y,
            class: node.class_name.clone(),
        }
    }

    pub fn scroll(node: &UiNode) -> Self {
        BridgeRequest::Scroll {
            cmd: "scroll",
            bounds: node.bounds,
            steps: 1,
        }
    }

    pub fn wait_idle(timeout: Duration) -> Self {
        BridgeRequest::WaitIdle {
            cmd: "wait_idle",
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    pub fn current_window() -> Self {
        BridgeRequest::CurrentWindow { cmd: "current_window" }
    }

    pub fn quit() -> Self {
        BridgeRequest::Quit { cmd: "quit" }
    }
}

/// Response read from the bridge's stdout (one JSON line).
#[derive(Debug, Default, Deserialize)]
pub struct BridgeResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    /// The element the request referred to is gone.
    #[serde(default)]
    pub stale: bool,
    #[serde(default)]
    pub ready: Option<bool>,
    #[serde(default)]
    pub tree: Option<RawView>,
    /// Whether a scroll gesture moved the container.
    #[serde(default)]
    pub moved: Option<bool>,
    /// Foreground window as `package/Activity`, when the bridge resolves it itself.
    #[serde(default)]
    pub window: Option<String>,
    /// Raw `dumpsys window windows` output, when it does not.
    #[serde(default)]
    pub dumpsys: Option<String>,
}

/// How to start the bridge process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeCommand {
    pub program: String,
    pub args: Vec<String>,
}

// ============================================================================
// DeviceSession
// ============================================================================

/// A live device driven through a long-lived bridge process.
///
/// The bridge wraps the platform's UI automation API. Commands are sent as
/// NDJSON over its stdin, responses read from its stdout.
pub struct DeviceSession {
    app_id: String,
    settings: DriverSettings,
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
}

impl DeviceSession {
    /// Spawn the bridge and wait for its ready line.
    pub fn connect(bridge: &BridgeCommand, app_id: &str, settings: DriverSettings) -> Result<Self, CrawlError> {
        let mut child = Command::new(&bridge.program)
            .args(&bridge.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| CrawlError::driver_with("spawn", format!("could not start '{}'", bridge.program), Box::new(e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| CrawlError::driver("spawn", "failed to capture bridge stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CrawlError::driver("spawn", "failed to capture bridge stdout"))?;

        let mut session = DeviceSession {
            app_id: app_id.to_string(),
            settings,
            child,
            stdin,
            reader: BufReader::new(stdout),
        };

        let ready = session.read_response("ready")?;
        if !ready.ok || ready.ready != Some(true) {
            return Err(CrawlError::driver("ready", "bridge did not signal readiness"));
        }
        debug!(program = %bridge.program, app = app_id, "bridge ready");
        Ok(session)
    }

    fn read_response(&mut self, command: &str) -> Result<BridgeResponse, CrawlError> {
        let mut line = String::new();
        self.reader
            .read_line(&mut line)
            .map_err(|e| CrawlError::driver_with(command, "failed to read from bridge", Box::new(e)))?;

        if line.trim().is_empty() {
            return Err(CrawlError::driver(command, "empty response from bridge (process may have died)"));
        }

        serde_json::from_str(line.trim())
            .map_err(|e| CrawlError::driver_with(command, "malformed bridge response", Box::new(e)))
    }

    /// Send a request and read the response.
    fn send(&mut self, request: &BridgeRequest, command: &str) -> Result<BridgeResponse, CrawlError> {
        let json = serde_json::to_string(request)
            .map_err(|e| CrawlError::driver_with(command, "failed to encode request", Box::new(e)))?;
        trace!(request = %json, "bridge request");

        writeln!(self.stdin, "{}", json)
            .and_then(|_| self.stdin.flush())
            .map_err(|e| CrawlError::driver_with(command, "failed to write to bridge", Box::new(e)))?;

        self.read_response(command)
    }

    /// Send a request and verify it succeeded. `stale: true` maps to a stale reference.
    fn send_ok(&mut self, request: &BridgeRequest, command: &str) -> Result<BridgeResponse, CrawlError> {
        let response = self.send(request, command)?;
        if response.stale {
            return Err(CrawlError::stale(format!(
                "{}: {}",
                command,
                response.error.as_deref().unwrap_or("element is gone")
            )));
        }
        if !response.ok {
            return Err(CrawlError::driver(
                command,
                response.error.unwrap_or_else(|| "unknown error".into()),
            ));
        }
        Ok(response)
    }

    pub fn quit(&mut self) -> Result<(), CrawlError> {
        // Best-effort: the process may already be gone.
        let _ = self.send(&BridgeRequest::quit(), "quit");
        let _ = self.child.wait();
        Ok(())
    }
}

impl AutomationDriver for DeviceSession {
    fn app_id(&self) -> &str {
        &self.app_id
    }

    fn settings(&self) -> DriverSettings {
        self.settings
    }

    fn launch(&mut self) -> Result<(), CrawlError> {
        let request = BridgeRequest::launch(&self.app_id);
        self.send_ok(&request, "launch")?;
        Ok(())
    }

    fn hierarchy(&mut self) -> Result<UiTree, CrawlError> {
        let response = self.send_ok(&BridgeRequest::hierarchy(), "hierarchy")?;
        let root = response
            .tree
            .ok_or_else(|| CrawlError::driver("hierarchy", "no tree in response"))?;
        Ok(UiTree::from_raw(&root))
    }

    fn tap(&mut self, node: &UiNode) -> Result<(), CrawlError> {
        self.send_ok(&BridgeRequest::tap(node), "tap")?;
        Ok(())
    }

    fn scroll_down(&mut self, node: &UiNode) -> Result<bool, CrawlError> {
        let response = self.send_ok(&BridgeRequest::scroll(node), "scroll")?;
        Ok(response.moved.unwrap_or(false))
    }

    fn wait_for_idle(&mut self, timeout: Duration) -> Result<(), CrawlError> {
        let response = self.send(&BridgeRequest::wait_idle(timeout), "wait_idle")?;
        if !response.ok {
            // A wait that runs out is not a failure.
            debug!(error = ?response.error, "wait for idle ended without idle");
        }
        Ok(())
    }

    fn current_screen_id(&mut self) -> Result<String, CrawlError> {
        let response = self
            .send(&BridgeRequest::current_window(), "current_window")
            .map_err(|e| match e {
                CrawlError::Driver { message, source, .. } => CrawlError::ScreenIdentifierUnavailable {
                    reason: message,
                    source,
                },
                other => other,
            })?;

        if let Some(window) = response.window.filter(|w| !w.is_empty()) {
            return Ok(window);
        }
        match response.dumpsys.as_deref().map(parse_focused_window) {
            Some(Ok(Some(window))) => Ok(window),
            Some(Err(e)) => Err(e),
            _ => Err(CrawlError::screen_id(
                response.error.unwrap_or_else(|| "no focused window reported".into()),
            )),
        }
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        if let Err(e) = self.quit() {
            warn!(error = %e, "bridge did not quit cleanly");
        }
    }
}

/// Extract `package/Activity` from the `mFocusedApp=` line of a `dumpsys window windows` dump.
pub fn parse_focused_window(dumpsys: &str) -> Result<Option<String>, CrawlError> {
    let component = Regex::new(r"[\w.]+/[\w.$]+")
        .map_err(|e| CrawlError::screen_id(format!("bad component pattern: {}", e)))?;
    Ok(dumpsys
        .lines()
        .find(|line| line.contains("mFocusedApp="))
        .and_then(|line| {
            let after = line.split_once("mFocusedApp=").map(|(_, rest)| rest).unwrap_or(line);
            component.find(after).map(|m| m.as_str().to_string())
        }))
}
