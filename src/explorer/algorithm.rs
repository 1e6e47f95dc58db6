use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::info;

use crate::classify::policy::PolicyClassifier;
use crate::driver::AutomationDriver;
use crate::error::CrawlError;
use crate::explorer::frontier::{FrontierConfig, FrontierSearch, SearchOutcome, SearchRun, SearchStats};
use crate::explorer::model::NavigationModel;
use crate::explorer::randomized::{DEFAULT_RANDOM_CLICKS, RandomizedSearch};
use crate::strategy::StrategyPipeline;
use crate::trace::logger::TraceLogger;

// ============================================================================
// Algorithm labels
// ============================================================================

/// The closed set of search algorithms, selected by label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Algorithm {
    Bfs,
    Dfs,
    Randomized,
    Optimized,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Bfs,
        Algorithm::Dfs,
        Algorithm::Randomized,
        Algorithm::Optimized,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Algorithm::Bfs => "BFS",
            Algorithm::Dfs => "DFS",
            Algorithm::Randomized => "RS",
            Algorithm::Optimized => "OS",
        }
    }

    /// Construct the implementation for this label.
    pub fn build(self, settings: &CrawlSettings) -> Result<Box<dyn SearchAlgorithm>, CrawlError> {
        let classifier = PolicyClassifier::default();
        let frontier = |config: FrontierConfig| FrontierConfig {
            max_expansions: settings.max_expansions,
            ..config
        };
        let algorithm: Box<dyn SearchAlgorithm> = match self {
            Algorithm::Bfs => Box::new(FrontierSearch::new(
                self.label(),
                frontier(FrontierConfig::breadth_first()),
                Some(classifier),
            )),
            Algorithm::Dfs => Box::new(FrontierSearch::new(
                self.label(),
                frontier(FrontierConfig::depth_first()),
                Some(classifier),
            )),
            Algorithm::Randomized => Box::new(RandomizedSearch::new(
                settings.random_clicks,
                settings.seed,
                classifier,
            )),
            Algorithm::Optimized => {
                let pipeline = StrategyPipeline::standard(classifier)?;
                if settings.fallback_to_frontier {
                    Box::new(pipeline.with_fallback(frontier(FrontierConfig::breadth_first())))
                } else {
                    Box::new(pipeline)
                }
            }
        };
        Ok(algorithm)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Algorithm {
    type Err = CrawlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::ALL
            .into_iter()
            .find(|a| a.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                CrawlError::Configuration(format!("unknown algorithm '{}', expected one of BFS, DFS, RS, OS", s))
            })
    }
}

// ============================================================================
// Settings and results
// ============================================================================

/// Resolved crawl knobs handed from the configuration layer to the core.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlSettings {
    pub algorithm: Algorithm,
    pub max_expansions: Option<usize>,
    pub fallback_to_frontier: bool,
    pub random_clicks: usize,
    pub seed: Option<u64>,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Optimized,
            max_expansions: None,
            fallback_to_frontier: false,
            random_clicks: DEFAULT_RANDOM_CLICKS,
            seed: None,
        }
    }
}

/// Everything one crawl of one app produced.
#[derive(Debug)]
pub struct CrawlReport {
    pub app_id: String,
    pub algorithm: String,
    pub outcome: SearchOutcome,
    pub model: NavigationModel,
    pub stats: SearchStats,
}

impl CrawlReport {
    fn from_run(app_id: &str, algorithm: &str, run: SearchRun) -> Self {
        Self {
            app_id: app_id.to_string(),
            algorithm: algorithm.to_string(),
            outcome: run.outcome,
            model: run.model,
            stats: run.stats,
        }
    }

    pub fn policy_text(&self) -> Option<&str> {
        self.outcome.text()
    }
}

// ============================================================================
// SearchAlgorithm
// ============================================================================

/// One search entry point: crawl the driver's app until it finds the policy or gives up.
pub trait SearchAlgorithm {
    fn label(&self) -> &str;

    fn search(&self, driver: &mut dyn AutomationDriver, tracer: &TraceLogger) -> Result<SearchRun, CrawlError>;

    /// Run [`search`](SearchAlgorithm::search) and package the result for reporting.
    fn crawl(&self, driver: &mut dyn AutomationDriver, tracer: &TraceLogger) -> Result<CrawlReport, CrawlError> {
        let app_id = driver.app_id().to_string();
        info!(app = %app_id, algorithm = self.label(), "starting crawl");
        let run = self.search(driver, tracer)?;
        info!(
            app = %app_id,
            algorithm = self.label(),
            found = run.outcome.is_found(),
            screens = run.model.screen_count(),
            "crawl finished"
        );
        Ok(CrawlReport::from_run(&app_id, self.label(), run))
    }
}

impl SearchAlgorithm for FrontierSearch {
    fn label(&self) -> &str {
        FrontierSearch::label(self)
    }

    fn search(&self, driver: &mut dyn AutomationDriver, tracer: &TraceLogger) -> Result<SearchRun, CrawlError> {
        FrontierSearch::run(self, driver, tracer)
    }
}

impl SearchAlgorithm for RandomizedSearch {
    fn label(&self) -> &str {
        "RS"
    }

    fn search(&self, driver: &mut dyn AutomationDriver, tracer: &TraceLogger) -> Result<SearchRun, CrawlError> {
        RandomizedSearch::run(self, driver, tracer)
    }
}

impl SearchAlgorithm for StrategyPipeline {
    fn label(&self) -> &str {
        "OS"
    }

    fn search(&self, driver: &mut dyn AutomationDriver, tracer: &TraceLogger) -> Result<SearchRun, CrawlError> {
        StrategyPipeline::run(self, driver, tracer)
    }
}

/// Exhaustive breadth-first crawl without a classifier; only the model is of interest.
pub fn extract_model(
    driver: &mut dyn AutomationDriver,
    max_expansions: Option<usize>,
    tracer: &TraceLogger,
) -> Result<NavigationModel, CrawlError> {
    let config = FrontierConfig {
        max_expansions,
        ..FrontierConfig::breadth_first()
    };
    let search = FrontierSearch::new("BFS", config, None);
    Ok(search.run(driver, tracer)?.model)
}
