pub mod compact;
pub mod drawer;
pub mod keyword;
pub mod patterns;
pub mod registration;

use tracing::{debug, info, warn};

use crate::classify::policy::PolicyClassifier;
use crate::driver::AutomationDriver;
use crate::driver::tree::{NodeId, UiNode, UiTree};
use crate::error::CrawlError;
use crate::explorer::frontier::{FrontierConfig, FrontierSearch, SearchOutcome, SearchRun, SearchStats};
use crate::explorer::model::NavigationModel;
use crate::state::address::ElementAddress;
use crate::state::page::Page;
use crate::trace::logger::TraceLogger;
use crate::trace::trace::Decision;

use compact::CompactMenu;
use drawer::DrawerMenu;
use keyword::KeywordText;
use patterns::KeywordPatterns;
use registration::Registration;

/// Upper bound on consecutive dialog dismissals after a restart.
pub const DIALOG_RETRIES: usize = 2;

const LABEL: &str = "OS";

/// Shared, read-only inputs of every strategy.
pub struct StrategyContext<'a> {
    pub classifier: &'a PolicyClassifier,
    pub patterns: &'a KeywordPatterns,
    pub tracer: &'a TraceLogger,
}

/// A targeted heuristic that reaches the policy in a few fixed hops.
///
/// `search` starts from a cold launch and returns the page whose text the
/// classifier accepted, or `None`. Recoverable errors abort the strategy;
/// the pipeline moves on to the next one.
pub trait Strategy {
    fn name(&self) -> &'static str;

    fn search(&self, driver: &mut dyn AutomationDriver, ctx: &StrategyContext<'_>) -> Result<Option<Page>, CrawlError>;
}

// ============================================================================
// StrategyPipeline
// ============================================================================

/// Strategies in a fixed order, optionally followed by an exhaustive breadth-first search.
pub struct StrategyPipeline {
    strategies: Vec<Box<dyn Strategy>>,
    patterns: KeywordPatterns,
    classifier: PolicyClassifier,
    fallback: Option<FrontierSearch>,
}

impl StrategyPipeline {
    /// Keyword text, registration page, compact menu, drawer menu.
    pub fn standard(classifier: PolicyClassifier) -> Result<Self, CrawlError> {
        let strategies: Vec<Box<dyn Strategy>> = vec![
            Box::new(KeywordText),
            Box::new(Registration),
            Box::new(CompactMenu),
            Box::new(DrawerMenu),
        ];
        Self::with_strategies(strategies, classifier)
    }

    pub fn with_strategies(strategies: Vec<Box<dyn Strategy>>, classifier: PolicyClassifier) -> Result<Self, CrawlError> {
        Ok(Self {
            strategies,
            patterns: KeywordPatterns::compile()?,
            classifier,
            fallback: None,
        })
    }

    /// Run `config` as a breadth-first fallback when no strategy matched.
    pub fn with_fallback(mut self, config: FrontierConfig) -> Self {
        self.fallback = Some(FrontierSearch::new("BFS", config, Some(self.classifier.clone())));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn run(&self, driver: &mut dyn AutomationDriver, tracer: &TraceLogger) -> Result<SearchRun, CrawlError> {
        let app_id = driver.app_id().to_string();
        let ctx = StrategyContext {
            classifier: &self.classifier,
            patterns: &self.patterns,
            tracer,
        };
        let mut stats = SearchStats::default();

        for strategy in &self.strategies {
            stats.candidates += 1;
            info!(strategy = strategy.name(), "trying strategy");
            match strategy.search(driver, &ctx) {
                Ok(Some(page)) => {
                    let text = page.text();
                    info!(strategy = strategy.name(), depth = page.depth(), "strategy found policy text");
                    if tracer.is_enabled() {
                        tracer.log(
                            &tracer
                                .event(LABEL, &app_id, Decision::Matched)
                                .with_target(strategy.name())
                                .with_depth(page.depth())
                                .with_verdict(&self.classifier.evaluate(&text))
                                .with_snapshot(page.snapshot()),
                        );
                    }
                    return Ok(SearchRun {
                        outcome: SearchOutcome::Found { page, text },
                        model: NavigationModel::new(&app_id),
                        stats,
                    });
                }
                Ok(None) => debug!(strategy = strategy.name(), "strategy did not match"),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    stats.failed_candidates += 1;
                    warn!(strategy = strategy.name(), error = %e, "strategy aborted");
                    tracer.log(
                        &tracer
                            .event(LABEL, &app_id, Decision::StrategyFailed)
                            .with_target(strategy.name())
                            .with_error(&e),
                    );
                }
            }
        }

        if let Some(fallback) = &self.fallback {
            info!("no strategy matched, falling back to breadth-first search");
            return fallback.run(driver, tracer);
        }

        tracer.log(&tracer.event(LABEL, &app_id, Decision::Exhausted));
        Ok(SearchRun {
            outcome: SearchOutcome::NotFound,
            model: NavigationModel::new(&app_id),
            stats,
        })
    }
}

// ============================================================================
// Helpers shared by the strategies
// ============================================================================

/// Restart the app and dismiss incidental dialogs.
///
/// Returns the clicks made, which belong at the front of every path recorded afterwards.
pub fn fresh_start(driver: &mut dyn AutomationDriver, patterns: &KeywordPatterns) -> Result<Vec<ElementAddress>, CrawlError> {
    driver.restart()?;
    dismiss_dialogs(driver, patterns)
}

/// Replay `path` and dismiss dialogs that appear on top of it.
pub fn replay_clean(
    driver: &mut dyn AutomationDriver,
    path: &[ElementAddress],
    patterns: &KeywordPatterns,
) -> Result<Vec<ElementAddress>, CrawlError> {
    driver.replay(path)?;
    let mut full = path.to_vec();
    full.extend(dismiss_dialogs(driver, patterns)?);
    Ok(full)
}

/// Click the first button of a dialog panel, at most [`DIALOG_RETRIES`] times.
pub fn dismiss_dialogs(driver: &mut dyn AutomationDriver, patterns: &KeywordPatterns) -> Result<Vec<ElementAddress>, CrawlError> {
    let mut clicks = Vec::new();
    for _ in 0..DIALOG_RETRIES {
        let tree = driver.hierarchy()?;
        let Some(panel) = first_where(&tree, None, |n| {
            n.resource_id.as_deref().is_some_and(|r| patterns.dialog_panel.is_match(r))
        }) else {
            break;
        };
        let Some(button) = first_where(&tree, Some(panel), |n| n.is_class("Button")) else {
            break;
        };
        let address = ElementAddress::capture(&tree, button)?;
        debug!(button = %address, "dismissing dialog");
        driver.click(&address)?;
        clicks.push(address);
    }
    Ok(clicks)
}

/// First node in enumeration order satisfying `pred`, within `scope` when given.
pub fn first_where(tree: &UiTree, scope: Option<NodeId>, pred: impl Fn(&UiNode) -> bool) -> Option<NodeId> {
    match scope {
        Some(scope) => tree.find_first(scope, pred),
        None => tree.select(pred).into_iter().next(),
    }
}

/// Address the first node satisfying `pred` on the live screen and click it.
pub fn click_first(
    driver: &mut dyn AutomationDriver,
    pred: impl Fn(&UiNode) -> bool,
) -> Result<Option<ElementAddress>, CrawlError> {
    let tree = driver.hierarchy()?;
    let Some(target) = first_where(&tree, None, pred) else {
        return Ok(None);
    };
    let address = ElementAddress::capture(&tree, target)?;
    driver.click(&address)?;
    Ok(Some(address))
}

/// Capture the current screen as a page reached by `path` and classify it.
pub fn classify_here(
    driver: &mut dyn AutomationDriver,
    ctx: &StrategyContext<'_>,
    path: Vec<ElementAddress>,
) -> Result<Option<Page>, CrawlError> {
    let page = Page::with_path(driver.current_screen()?, path);
    if ctx.classifier.is_policy(&page.text()) {
        Ok(Some(page))
    } else {
        Ok(None)
    }
}
