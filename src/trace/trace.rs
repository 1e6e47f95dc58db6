use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::classify::policy::PolicyVerdict;
use crate::screen::snapshot::ScreenSnapshot;

/// What the crawler decided at one point of the exploration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Expand,
    Dropped,
    Discovered,
    Known,
    Skipped,
    Matched,
    StrategyFailed,
    Exhausted,
}

#[derive(Debug, Serialize)]
pub struct CrawlEvent {
    pub timestamp_ms: u128,
    pub step: u64,

    pub algorithm: String,
    pub app_id: String,
    pub decision: Decision,

    pub screen_id: Option<String>,
    pub depth: Option<usize>,
    pub target: Option<String>,

    pub words: Option<usize>,
    pub matches: Option<usize>,
    pub fingerprint: Option<String>,

    pub error: Option<String>,

    /// False for events of a disabled logger; their fingerprints are never computed.
    #[serde(skip)]
    recorded: bool,
}

impl CrawlEvent {
    pub fn now(step: u64, algorithm: &str, app_id: &str, decision: Decision) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default(),
            step,
            algorithm: algorithm.to_string(),
            app_id: app_id.to_string(),
            decision,
            screen_id: None,
            depth: None,
            target: None,
            words: None,
            matches: None,
            fingerprint: None,
            error: None,
            recorded: true,
        }
    }

    /// Mark the event as going nowhere.
    pub fn discarded(mut self) -> Self {
        self.recorded = false;
        self
    }

    pub fn is_recorded(&self) -> bool {
        self.recorded
    }

    pub fn with_screen(mut self, screen_id: impl ToString) -> Self {
        self.screen_id = Some(screen_id.to_string());
        self
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn with_target(mut self, target: impl ToString) -> Self {
        self.target = Some(target.to_string());
        self
    }

    pub fn with_verdict(mut self, verdict: &PolicyVerdict) -> Self {
        self.words = Some(verdict.words);
        self.matches = Some(verdict.matches);
        self
    }

    pub fn with_snapshot(mut self, snapshot: &ScreenSnapshot) -> Self {
        if self.recorded {
            self.fingerprint = Some(snapshot.fingerprint());
        }
        self
    }

    pub fn with_error(mut self, error: impl ToString) -> Self {
        self.error = Some(error.to_string());
        self
    }
}
