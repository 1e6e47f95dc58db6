use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::{error, info, warn};

use crate::driver::AutomationDriver;
use crate::error::CrawlError;
use crate::explorer::algorithm::{self, CrawlSettings};
use crate::report::{json, xml};
use crate::trace::logger::TraceLogger;

/// Output format of the model extraction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Xml,
    Json,
}

impl ModelFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ModelFormat::Xml => "xml",
            ModelFormat::Json => "json",
        }
    }
}

/// What the worker does for every app.
#[derive(Debug, Clone)]
pub enum Job {
    /// Look for the policy text with the configured algorithm.
    Search(CrawlSettings),
    /// Build and serialize the full navigation model.
    Model {
        format: ModelFormat,
        max_expansions: Option<usize>,
    },
}

impl Job {
    pub fn extension(&self) -> &'static str {
        match self {
            Job::Search(_) => "txt",
            Job::Model { format, .. } => format.extension(),
        }
    }
}

/// Messages from the crawl worker to the collecting side.
#[derive(Debug)]
pub enum CrawlMessage {
    Result { app_id: String, payload: String },
    NotFound { app_id: String },
    Failed { app_id: String, error: String },
    Done,
}

/// Opens a driver for one app id.
pub type DriverFactory = Box<dyn Fn(&str) -> Result<Box<dyn AutomationDriver>, CrawlError> + Send>;

/// Crawl one app and produce the payload to deliver, if any.
pub fn crawl_app(
    driver: &mut dyn AutomationDriver,
    job: &Job,
    tracer: &TraceLogger,
) -> Result<Option<String>, CrawlError> {
    match job {
        Job::Search(settings) => {
            let algorithm = settings.algorithm.build(settings)?;
            let report = algorithm.crawl(driver, tracer)?;
            if let Ok(summary) = json::generate_summary_json(&report) {
                info!(app = %report.app_id, summary = %summary, "crawl summary");
            }
            Ok(report.policy_text().map(str::to_string))
        }
        Job::Model {
            format,
            max_expansions,
        } => {
            let model = algorithm::extract_model(driver, *max_expansions, tracer)?;
            let payload = match format {
                ModelFormat::Xml => xml::generate_model_xml(&model),
                ModelFormat::Json => json::generate_model_json(&model)
                    .map_err(|e| CrawlError::Configuration(format!("model serialization failed: {}", e)))?,
            };
            Ok(Some(payload))
        }
    }
}

/// Crawl `app_ids` one after another on a background thread.
///
/// Exactly one worker touches the device. A fatal error for one app is
/// reported as [`CrawlMessage::Failed`] and the next app is crawled.
pub fn spawn_batch(
    app_ids: Vec<String>,
    job: Job,
    factory: DriverFactory,
    tracer: Arc<TraceLogger>,
) -> (JoinHandle<()>, Receiver<CrawlMessage>) {
    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || run_batch(&app_ids, &job, &factory, &tracer, &tx));
    (handle, rx)
}

fn run_batch(
    app_ids: &[String],
    job: &Job,
    factory: &DriverFactory,
    tracer: &TraceLogger,
    tx: &Sender<CrawlMessage>,
) {
    for app_id in app_ids {
        let message = match factory(app_id).and_then(|mut driver| crawl_app(driver.as_mut(), job, tracer)) {
            Ok(Some(payload)) => CrawlMessage::Result {
                app_id: app_id.clone(),
                payload,
            },
            Ok(None) => CrawlMessage::NotFound {
                app_id: app_id.clone(),
            },
            Err(e) => {
                error!(app = %app_id, error = %e, "crawl failed");
                CrawlMessage::Failed {
                    app_id: app_id.clone(),
                    error: e.to_string(),
                }
            }
        };
        if tx.send(message).is_err() {
            warn!("result receiver gone, stopping batch");
            return;
        }
    }
    let _ = tx.send(CrawlMessage::Done);
}

/// Per-app outcome of a batch, in crawl order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub delivered: Vec<String>,
    pub not_found: Vec<String>,
    pub failed: Vec<(String, String)>,
}

/// Forward every result to `deliver` until the worker reports completion.
///
/// A delivery error stops draining and is returned.
pub fn drain<F>(rx: &Receiver<CrawlMessage>, mut deliver: F) -> Result<BatchSummary, CrawlError>
where
    F: FnMut(&str, &str) -> Result<(), CrawlError>,
{
    let mut summary = BatchSummary::default();
    for message in rx.iter() {
        match message {
            CrawlMessage::Result { app_id, payload } => {
                deliver(&app_id, &payload)?;
                summary.delivered.push(app_id);
            }
            CrawlMessage::NotFound { app_id } => summary.not_found.push(app_id),
            CrawlMessage::Failed { app_id, error } => summary.failed.push((app_id, error)),
            CrawlMessage::Done => break,
        }
    }
    Ok(summary)
}
