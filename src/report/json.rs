use serde::Serialize;

use crate::explorer::algorithm::CrawlReport;
use crate::explorer::frontier::SearchOutcome;
use crate::explorer::model::NavigationModel;

/// Summary of one crawl, as written next to the policy text.
#[derive(Debug, Serialize)]
pub struct CrawlSummary<'a> {
    pub app_id: &'a str,
    pub algorithm: &'a str,
    pub found: bool,
    pub depth: Option<usize>,
    pub fingerprint: Option<String>,
    pub expansions: usize,
    pub candidates: usize,
    pub failed_candidates: usize,
    pub dropped_pages: usize,
    pub screens: usize,
    pub pages: usize,
}

impl<'a> CrawlSummary<'a> {
    pub fn of(report: &'a CrawlReport) -> Self {
        let found = match &report.outcome {
            SearchOutcome::Found { page, .. } => Some(page),
            SearchOutcome::NotFound => None,
        };
        Self {
            app_id: &report.app_id,
            algorithm: &report.algorithm,
            found: found.is_some(),
            depth: found.map(|p| p.depth()),
            fingerprint: found.map(|p| p.snapshot().fingerprint()),
            expansions: report.stats.expansions,
            candidates: report.stats.candidates,
            failed_candidates: report.stats.failed_candidates,
            dropped_pages: report.stats.dropped_pages,
            screens: report.model.screen_count(),
            pages: report.model.page_count(),
        }
    }
}

/// Serialize a navigation model as pretty-printed JSON.
pub fn generate_model_json(model: &NavigationModel) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(model)
}

pub fn generate_summary_json(report: &CrawlReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&CrawlSummary::of(report))
}
