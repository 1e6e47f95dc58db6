use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::cli::config::{
    AppConfig, AppSelection, CrawlOverrides, Delivery, build_bridge_command, build_crawl_settings,
    build_driver_settings, resolve_app_ids,
};
use crate::driver::AutomationDriver;
use crate::driver::session::DeviceSession;
use crate::driver::simulated::{AppDescription, SimulatedApp};
use crate::error::CrawlError;
use crate::orchestrator::{BatchSummary, DriverFactory, Job, ModelFormat, drain, spawn_batch};
use crate::report::console::format_batch_report;
use crate::trace::logger::TraceLogger;
use crate::transport::{Block, ResultCollector, ResultSender};

// ============================================================================
// search subcommand
// ============================================================================

/// Search every selected app and return whether all crawls completed without a fatal error.
pub fn cmd_search(
    config: &AppConfig,
    apps: &AppSelection,
    delivery: &Delivery,
    overrides: &CrawlOverrides,
    trace: Option<&str>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let settings = build_crawl_settings(overrides, &config.crawl)?;
    let label = settings.algorithm.label();
    run_batch(config, apps, delivery, Job::Search(settings), label, trace)
}

// ============================================================================
// model subcommand
// ============================================================================

pub fn cmd_model(
    config: &AppConfig,
    apps: &AppSelection,
    delivery: &Delivery,
    format: ModelFormat,
    max_expansions: Option<usize>,
    trace: Option<&str>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let job = Job::Model {
        format,
        max_expansions: max_expansions.or(config.crawl.max_expansions),
    };
    run_batch(config, apps, delivery, job, "model", trace)
}

fn run_batch(
    config: &AppConfig,
    apps: &AppSelection,
    delivery: &Delivery,
    job: Job,
    label: &str,
    trace: Option<&str>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let (app_ids, factory) = driver_source(config, apps)?;
    let tracer = Arc::new(trace.map(TraceLogger::new).unwrap_or_default());
    let extension = job.extension();

    info!(apps = app_ids.len(), label, "starting batch");
    let start = Instant::now();
    let (handle, rx) = spawn_batch(app_ids, job, factory, tracer);

    let summary = match delivery.collector.as_deref().or(config.output.collector.as_deref()) {
        Some(addr) => {
            let mut sender = ResultSender::connect(addr)?;
            let summary = drain(&rx, |app_id, payload| sender.send(app_id, payload))?;
            sender.finish()?;
            summary
        }
        None => {
            let dir = delivery.out.clone().unwrap_or_else(|| config.output.dir.clone());
            let collector = ResultCollector::new(dir, extension);
            drain(&rx, |app_id, payload| {
                collector
                    .store(&Block {
                        app_id: app_id.to_string(),
                        payload: payload.to_string(),
                    })
                    .map(|_| ())
            })?
        }
    };

    handle
        .join()
        .map_err(|_| CrawlError::Configuration("crawl worker panicked".into()))?;

    print!("{}", format_batch_report(label, &summary, Some(start.elapsed())));
    Ok(all_completed(&summary))
}

/// App ids to crawl and the drivers for them.
///
/// Without `--simulate` every app gets a device session. With it, the described
/// apps are crawled in memory; their ids are the selection unless `--app` or
/// `--ids` narrow it.
pub fn driver_source(config: &AppConfig, apps: &AppSelection) -> Result<(Vec<String>, DriverFactory), CrawlError> {
    let driver_settings = build_driver_settings(&config.crawl);

    if apps.simulated.is_empty() {
        let app_ids = resolve_app_ids(apps)?;
        let bridge = build_bridge_command(&config.device);
        let factory: DriverFactory = Box::new(move |app_id: &str| {
            let session = DeviceSession::connect(&bridge, app_id, driver_settings)?;
            Ok(Box::new(session) as Box<dyn AutomationDriver>)
        });
        return Ok((app_ids, factory));
    }

    let descriptions = apps
        .simulated
        .iter()
        .map(|path| AppDescription::load(path))
        .collect::<Result<Vec<_>, _>>()?;
    let app_ids = if apps.apps.is_empty() && apps.ids.is_none() {
        let mut ids: Vec<String> = descriptions.iter().map(|d| d.app_id.clone()).collect();
        ids.dedup();
        ids
    } else {
        resolve_app_ids(apps)?
    };
    let by_id: HashMap<String, AppDescription> = descriptions
        .into_iter()
        .map(|d| (d.app_id.clone(), d))
        .collect();

    info!(apps = by_id.len(), "dry run on simulated apps");
    let factory: DriverFactory = Box::new(move |app_id: &str| {
        let description = by_id
            .get(app_id)
            .ok_or_else(|| CrawlError::driver("launch", format!("no simulated app described for {}", app_id)))?;
        let app = SimulatedApp::from_description(description.clone())?.with_settings(driver_settings);
        Ok(Box::new(app) as Box<dyn AutomationDriver>)
    });
    Ok((app_ids, factory))
}

fn all_completed(summary: &BatchSummary) -> bool {
    summary.failed.is_empty()
}

// ============================================================================
// collect subcommand
// ============================================================================

pub fn cmd_collect(
    config: &AppConfig,
    listen: &str,
    out: Option<&str>,
    extension: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = out.map(str::to_string).unwrap_or_else(|| config.output.dir.clone());
    let collector = ResultCollector::new(dir, extension);
    let listener = TcpListener::bind(listen).map_err(|e| CrawlError::transport(format!("cannot listen on {}", listen), e))?;

    info!(listen, dir = %collector.out_dir().display(), "collecting results");
    let files = collector.serve(&listener)?;

    println!("Collected {} result(s) into {}", files.len(), collector.out_dir().display());
    for file in &files {
        println!("  - {}", file.display());
    }
    Ok(())
}
