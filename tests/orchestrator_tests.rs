use std::collections::HashMap;
use std::sync::Arc;

use pretty_assertions::assert_eq;

use policy_crawler::driver::AutomationDriver;
use policy_crawler::driver::simulated::{SimScreen, SimulatedApp};
use policy_crawler::error::CrawlError;
use policy_crawler::explorer::algorithm::{Algorithm, CrawlSettings};
use policy_crawler::orchestrator::{
    BatchSummary, CrawlMessage, DriverFactory, Job, ModelFormat, crawl_app, drain, spawn_batch,
};
use policy_crawler::trace::logger::TraceLogger;

mod common;

use common::{button, label, policy_screen, screen, sid, window};

/// A simulated app per id: `*.policy` has a privacy link, `*.broken` cannot be opened.
fn factory() -> DriverFactory {
    Box::new(|app_id: &str| {
        if app_id.ends_with(".broken") {
            return Err(CrawlError::driver("launch", format!("{} is not installed", app_id)));
        }
        let main = format!("{}/.Main", app_id);
        let start = SimScreen::new(&main, window(vec![label("Welcome"), button("Privacy")]));
        let mut app = SimulatedApp::new(app_id, start);
        if app_id.ends_with(".policy") {
            let policy = format!("{}/.Policy", app_id);
            let mut target = policy_screen("Policy");
            target.id = policy.clone();
            app = app.screen(target).link(&main, "Privacy", &policy);
        }
        Ok(Box::new(app) as Box<dyn AutomationDriver>)
    })
}

fn search_job(algorithm: Algorithm) -> Job {
    Job::Search(CrawlSettings {
        algorithm,
        ..CrawlSettings::default()
    })
}

// ============================================================================
// Single app
// ============================================================================

#[test]
fn crawl_app_returns_policy_text() {
    let mut app = common::privacy_link_app();
    let payload = crawl_app(&mut app, &search_job(Algorithm::Optimized), &TraceLogger::disabled()).unwrap();
    assert!(payload.is_some_and(|p| p.starts_with("Privacy Policy")));
}

#[test]
fn crawl_app_without_policy_returns_none() {
    let mut app = SimulatedApp::new(common::APP, screen("Main", vec![label("nothing here")]));
    let payload = crawl_app(&mut app, &search_job(Algorithm::Bfs), &TraceLogger::disabled()).unwrap();
    assert_eq!(payload, None);
}

#[test]
fn model_job_renders_xml() {
    let mut app = common::tree_app();
    let job = Job::Model {
        format: ModelFormat::Xml,
        max_expansions: None,
    };
    let payload = crawl_app(&mut app, &job, &TraceLogger::disabled()).unwrap().unwrap();

    assert!(payload.starts_with("<?xml"));
    assert_eq!(payload.matches("<node ").count(), 5);
    assert!(payload.contains(&format!("activity=\"{}\"", sid("E"))));
    assert_eq!(job.extension(), "xml");
}

#[test]
fn model_job_renders_json() {
    let mut app = common::tree_app();
    let job = Job::Model {
        format: ModelFormat::Json,
        max_expansions: Some(1),
    };
    let payload = crawl_app(&mut app, &job, &TraceLogger::disabled()).unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(value["nodes"].as_array().map(Vec::len), Some(3));
}

// ============================================================================
// Batches
// ============================================================================

#[test]
fn batch_reports_every_app_in_order() {
    let apps = vec![
        "com.example.policy".to_string(),
        "com.example.plain".to_string(),
        "com.example.broken".to_string(),
    ];
    let (handle, rx) = spawn_batch(
        apps,
        search_job(Algorithm::Bfs),
        factory(),
        Arc::new(TraceLogger::disabled()),
    );

    let mut delivered = HashMap::new();
    let summary = drain(&rx, |app_id, payload| {
        delivered.insert(app_id.to_string(), payload.to_string());
        Ok(())
    })
    .unwrap();
    handle.join().unwrap();

    assert_eq!(summary.delivered, vec!["com.example.policy"]);
    assert_eq!(summary.not_found, vec!["com.example.plain"]);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, "com.example.broken");
    assert!(summary.failed[0].1.contains("not installed"));
    assert!(delivered["com.example.policy"].contains("privacy"));
}

#[test]
fn delivery_error_stops_draining() {
    let (handle, rx) = spawn_batch(
        vec!["com.example.policy".to_string()],
        search_job(Algorithm::Bfs),
        factory(),
        Arc::new(TraceLogger::disabled()),
    );

    let err = drain(&rx, |_, _| {
        Err(CrawlError::transport(
            "collector gone",
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"),
        ))
    })
    .unwrap_err();
    assert!(matches!(err, CrawlError::Transport { .. }));
    handle.join().unwrap();
}

#[test]
fn drain_stops_at_done() {
    let (tx, rx) = std::sync::mpsc::channel();
    tx.send(CrawlMessage::NotFound {
        app_id: "a".into(),
    })
    .unwrap();
    tx.send(CrawlMessage::Done).unwrap();
    tx.send(CrawlMessage::NotFound {
        app_id: "late".into(),
    })
    .unwrap();

    let summary = drain(&rx, |_, _| Ok(())).unwrap();
    assert_eq!(
        summary,
        BatchSummary {
            delivered: Vec::new(),
            not_found: vec!["a".into()],
            failed: Vec::new(),
        }
    );
}
