use std::collections::VecDeque;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::classify::policy::PolicyClassifier;
use crate::driver::AutomationDriver;
use crate::error::CrawlError;
use crate::explorer::model::NavigationModel;
use crate::screen::capture;
use crate::state::address::ElementAddress;
use crate::state::page::Page;
use crate::trace::logger::TraceLogger;
use crate::trace::trace::Decision;

// ============================================================================
// Configuration
// ============================================================================

/// Where newly discovered sibling pages go in the frontier.
#[derive(Debug, Clone, PartialEq)]
pub enum Order {
    /// Append to the tail in discovery order.
    Breadth,
    /// Insert at the head so the first-discovered child is expanded next.
    Depth,
    /// Pages whose text contains one of the (lowercase) anchors go to the head, others to the tail.
    Prioritized { anchors: Vec<String> },
}

/// Which elements of an expanded page are tried.
#[derive(Debug, Clone)]
pub enum Candidates {
    /// Every clickable element, including ones revealed by scrolling.
    Clickable,
    /// Clickable elements whose own or descendant text matches the pattern.
    Labelled(Regex),
}

#[derive(Debug, Clone)]
pub struct FrontierConfig {
    pub order: Order,
    pub candidates: Candidates,
    /// Children deeper than this many clicks are not queued.
    pub max_depth: Option<usize>,
    /// Stop after expanding this many pages.
    pub max_expansions: Option<usize>,
    /// Only queue screens whose identifier starts with the app id.
    pub restrict_to_app: bool,
}

impl FrontierConfig {
    pub fn breadth_first() -> Self {
        Self {
            order: Order::Breadth,
            candidates: Candidates::Clickable,
            max_depth: None,
            max_expansions: None,
            restrict_to_app: false,
        }
    }

    pub fn depth_first() -> Self {
        Self {
            order: Order::Depth,
            ..Self::breadth_first()
        }
    }
}

// ============================================================================
// Results
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// The classifier accepted the text of `page`.
    Found { page: Page, text: String },
    /// The frontier emptied (or the expansion cap was hit) without a match.
    NotFound,
}

impl SearchOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, SearchOutcome::Found { .. })
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            SearchOutcome::Found { text, .. } => Some(text),
            SearchOutcome::NotFound => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub expansions: usize,
    pub candidates: usize,
    pub failed_candidates: usize,
    pub dropped_pages: usize,
    /// Screen ids of expanded pages, in expansion order.
    pub visited: Vec<String>,
}

#[derive(Debug)]
pub struct SearchRun {
    pub outcome: SearchOutcome,
    pub model: NavigationModel,
    pub stats: SearchStats,
}

const UNKNOWN_SCREEN: &str = "<unknown>";

struct Entry {
    page: Page,
    screen_id: Option<String>,
}

enum Expansion {
    Found(Page, String),
    Children(Vec<Entry>),
}

enum Trial {
    Found(Page, String),
    Reached(Page, String),
}

// ============================================================================
// FrontierSearch
// ============================================================================

/// Queue-driven exploration of the app's screens.
///
/// Every popped page is replayed from a cold start, then each of its
/// candidates is tried on a fresh replay. The first screen the classifier
/// accepts ends the search. Without a classifier the search only builds the
/// navigation model.
pub struct FrontierSearch {
    label: &'static str,
    config: FrontierConfig,
    classifier: Option<PolicyClassifier>,
}

impl FrontierSearch {
    pub fn new(label: &'static str, config: FrontierConfig, classifier: Option<PolicyClassifier>) -> Self {
        Self {
            label,
            config,
            classifier,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn config(&self) -> &FrontierConfig {
        &self.config
    }

    /// Start from a cold launch of the app.
    pub fn run(&self, driver: &mut dyn AutomationDriver, tracer: &TraceLogger) -> Result<SearchRun, CrawlError> {
        driver.restart()?;
        let seed = Page::root(driver.current_screen()?);
        self.run_from(driver, seed, tracer)
    }

    /// Start from `seed`, which the driver must currently be showing.
    pub fn run_from(
        &self,
        driver: &mut dyn AutomationDriver,
        seed: Page,
        tracer: &TraceLogger,
    ) -> Result<SearchRun, CrawlError> {
        let app_id = driver.app_id().to_string();
        let mut model = NavigationModel::new(&app_id);
        let mut stats = SearchStats::default();

        let seed_screen = match driver.current_screen_id() {
            Ok(id) => {
                model.add(seed.clone(), &id);
                Some(id)
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                debug!(error = %e, "seed screen has no identifier");
                None
            }
        };

        let seed_text = seed.text();
        if self.accepts(&seed_text) {
            return Ok(self.found(driver.app_id(), seed, seed_text, model, stats, tracer));
        }

        let mut frontier = VecDeque::from([Entry {
            page: seed,
            screen_id: seed_screen,
        }]);

        while let Some(entry) = frontier.pop_front() {
            if let Some(cap) = self.config.max_expansions {
                if stats.expansions >= cap {
                    info!(algorithm = self.label, cap, "expansion cap reached");
                    break;
                }
            }

            stats.expansions += 1;
            let screen = entry.screen_id.clone().unwrap_or_else(|| UNKNOWN_SCREEN.to_string());
            stats.visited.push(screen.clone());
            info!(algorithm = self.label, screen = %screen, depth = entry.page.depth(), "expanding page");
            tracer.log(
                &tracer
                    .event(self.label, &app_id, Decision::Expand)
                    .with_screen(&screen)
                    .with_depth(entry.page.depth())
                    .with_snapshot(entry.page.snapshot()),
            );

            match self.expand(driver, &entry.page, &mut model, &mut stats, tracer)? {
                Expansion::Found(page, text) => {
                    return Ok(self.found(&app_id, page, text, model, stats, tracer));
                }
                Expansion::Children(children) => self.enqueue(&mut frontier, children),
            }
        }

        tracer.log(&tracer.event(self.label, &app_id, Decision::Exhausted));
        Ok(SearchRun {
            outcome: SearchOutcome::NotFound,
            model,
            stats,
        })
    }

    fn expand(
        &self,
        driver: &mut dyn AutomationDriver,
        page: &Page,
        model: &mut NavigationModel,
        stats: &mut SearchStats,
        tracer: &TraceLogger,
    ) -> Result<Expansion, CrawlError> {
        let app_id = driver.app_id().to_string();

        let candidates = match driver
            .replay(page.path())
            .and_then(|_| self.candidates(driver))
        {
            Ok(candidates) => candidates,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(algorithm = self.label, error = %e, "replay failed, dropping page");
                stats.dropped_pages += 1;
                tracer.log(
                    &tracer
                        .event(self.label, &app_id, Decision::Dropped)
                        .with_depth(page.depth())
                        .with_error(&e),
                );
                return Ok(Expansion::Children(Vec::new()));
            }
        };

        let mut children = Vec::new();
        for address in candidates {
            stats.candidates += 1;
            match self.try_candidate(driver, page, &address) {
                Ok(Trial::Found(found, text)) => return Ok(Expansion::Found(found, text)),
                Ok(Trial::Reached(child, screen_id)) => {
                    if let Some(entry) = self.admit(&app_id, child, screen_id, model, tracer) {
                        children.push(entry);
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e @ CrawlError::ScreenIdentifierUnavailable { .. }) => {
                    stats.failed_candidates += 1;
                    warn!(algorithm = self.label, target = %address, error = %e, "screen id unavailable, candidate skipped");
                    tracer.log(
                        &tracer
                            .event(self.label, &app_id, Decision::Skipped)
                            .with_target(&address)
                            .with_error(&e),
                    );
                }
                Err(e) => {
                    stats.failed_candidates += 1;
                    debug!(algorithm = self.label, target = %address, error = %e, "candidate failed");
                    tracer.log(
                        &tracer
                            .event(self.label, &app_id, Decision::Skipped)
                            .with_target(&address)
                            .with_error(&e),
                    );
                }
            }
        }

        Ok(Expansion::Children(children))
    }

    fn candidates(&self, driver: &mut dyn AutomationDriver) -> Result<Vec<ElementAddress>, CrawlError> {
        match &self.config.candidates {
            Candidates::Clickable => driver.actionable_elements(),
            Candidates::Labelled(pattern) => capture::elements_where(driver, |tree, id| {
                tree.node(id).clickable && tree.subtree_has(id, |n| pattern.is_match(n.label()))
            }),
        }
    }

    fn try_candidate(
        &self,
        driver: &mut dyn AutomationDriver,
        page: &Page,
        address: &ElementAddress,
    ) -> Result<Trial, CrawlError> {
        driver.replay(page.path())?;
        driver.click(address)?;
        let snapshot = driver.current_screen()?;
        let text = snapshot.text();
        let child = page.child(snapshot, address.clone());

        if self.accepts(&text) {
            return Ok(Trial::Found(child, text));
        }

        let screen_id = driver.current_screen_id()?;
        Ok(Trial::Reached(child, screen_id))
    }

    /// Record `child` in the model and decide whether it joins the frontier.
    fn admit(
        &self,
        app_id: &str,
        child: Page,
        screen_id: String,
        model: &mut NavigationModel,
        tracer: &TraceLogger,
    ) -> Option<Entry> {
        if self.config.restrict_to_app && !screen_id.starts_with(app_id) {
            debug!(algorithm = self.label, screen = %screen_id, "left the app, not queued");
            return None;
        }

        let depth = child.depth();
        let outcome = model.add(child.clone(), &screen_id);
        let decision = if outcome.is_new() {
            Decision::Discovered
        } else {
            Decision::Known
        };
        tracer.log(
            &tracer
                .event(self.label, app_id, decision)
                .with_screen(&screen_id)
                .with_depth(depth)
                .with_snapshot(child.snapshot()),
        );

        if !outcome.is_new() {
            return None;
        }
        if self.config.max_depth.is_some_and(|max| depth > max) {
            debug!(algorithm = self.label, depth, "depth bound reached, not queued");
            return None;
        }
        Some(Entry {
            page: child,
            screen_id: Some(screen_id),
        })
    }

    fn enqueue(&self, frontier: &mut VecDeque<Entry>, children: Vec<Entry>) {
        match &self.config.order {
            Order::Breadth => frontier.extend(children),
            Order::Depth => {
                for child in children.into_iter().rev() {
                    frontier.push_front(child);
                }
            }
            Order::Prioritized { anchors } => {
                let (anchored, rest): (Vec<Entry>, Vec<Entry>) = children.into_iter().partition(|child| {
                    let text = child.page.text().to_lowercase();
                    anchors.iter().any(|a| text.contains(a.as_str()))
                });
                // Anchored siblings go first, in discovery order.
                for child in anchored.into_iter().rev() {
                    frontier.push_front(child);
                }
                frontier.extend(rest);
            }
        }
    }

    fn accepts(&self, text: &str) -> bool {
        self.classifier.as_ref().is_some_and(|c| c.is_policy(text))
    }

    fn found(
        &self,
        app_id: &str,
        page: Page,
        text: String,
        model: NavigationModel,
        stats: SearchStats,
        tracer: &TraceLogger,
    ) -> SearchRun {
        info!(algorithm = self.label, depth = page.depth(), "policy text found");
        if let Some(classifier) = self.classifier.as_ref().filter(|_| tracer.is_enabled()) {
            tracer.log(
                &tracer
                    .event(self.label, app_id, Decision::Matched)
                    .with_depth(page.depth())
                    .with_verdict(&classifier.evaluate(&text))
                    .with_snapshot(page.snapshot()),
            );
        }
        SearchRun {
            outcome: SearchOutcome::Found { page, text },
            model,
            stats,
        }
    }
}
