use std::{
    fs::OpenOptions,
    io::Write,
    sync::Mutex,
    sync::atomic::{AtomicU64, Ordering},
};

use tracing::warn;

use crate::trace::trace::{CrawlEvent, Decision};

/// Append-only JSONL sink for crawl events. A disabled logger drops everything.
pub struct TraceLogger {
    file: Option<Mutex<std::fs::File>>,
    step: AtomicU64,
}

impl TraceLogger {
    pub fn new(path: &str) -> Self {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path);

        match file {
            Ok(f) => Self {
                file: Some(Mutex::new(f)),
                step: AtomicU64::new(0),
            },
            Err(e) => {
                warn!("could not open trace file '{}': {}", path, e);
                Self::disabled()
            }
        }
    }

    pub fn disabled() -> Self {
        Self {
            file: None,
            step: AtomicU64::new(0),
        }
    }

    /// Start an event numbered after the previous one.
    pub fn event(&self, algorithm: &str, app_id: &str, decision: Decision) -> CrawlEvent {
        let step = self.step.fetch_add(1, Ordering::Relaxed);
        let event = CrawlEvent::now(step, algorithm, app_id, decision);
        if self.is_enabled() { event } else { event.discarded() }
    }

    pub fn is_enabled(&self) -> bool {
        self.file.is_some()
    }

    pub fn log(&self, event: &CrawlEvent) {
        let file_mutex = match &self.file {
            Some(f) => f,
            None => return,
        };

        let json = match serde_json::to_string(event) {
            Ok(j) => j,
            Err(e) => {
                warn!("failed to serialize trace event: {}", e);
                return;
            }
        };

        let mut file = match file_mutex.lock() {
            Ok(f) => f,
            Err(e) => {
                warn!("trace logger lock poisoned: {}", e);
                return;
            }
        };

        if let Err(e) = writeln!(file, "{}", json) {
            warn!("failed to write trace event: {}", e);
        }
    }
}

impl Default for TraceLogger {
    fn default() -> Self {
        Self::disabled()
    }
}
