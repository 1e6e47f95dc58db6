use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::classify::policy::PolicyClassifier;
use crate::driver::AutomationDriver;
use crate::error::CrawlError;
use crate::explorer::frontier::{SearchOutcome, SearchRun, SearchStats};
use crate::explorer::model::NavigationModel;
use crate::screen::snapshot::ScreenSnapshot;
use crate::state::address::ElementAddress;
use crate::state::page::Page;
use crate::trace::logger::TraceLogger;
use crate::trace::trace::Decision;

/// Default number of random clicks before giving up.
pub const DEFAULT_RANDOM_CLICKS: usize = 1000;

const LABEL: &str = "RS";

/// Monkey-style baseline: random scrolls and clicks, classifying every
/// in-app screen it lands on.
///
/// Leaving the app or losing an element restarts from a cold launch. The
/// recorded page paths hold the clicks since the last restart; scrolls in
/// between are not recorded, so those paths are informational.
pub struct RandomizedSearch {
    clicks: usize,
    seed: Option<u64>,
    classifier: PolicyClassifier,
}

impl RandomizedSearch {
    pub fn new(clicks: usize, seed: Option<u64>, classifier: PolicyClassifier) -> Self {
        Self {
            clicks,
            seed,
            classifier,
        }
    }

    pub fn run(&self, driver: &mut dyn AutomationDriver, tracer: &TraceLogger) -> Result<SearchRun, CrawlError> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let app_id = driver.app_id().to_string();
        let mut model = NavigationModel::new(&app_id);
        let mut stats = SearchStats::default();
        let mut path: Vec<ElementAddress> = Vec::new();

        driver.restart()?;

        for _ in 0..self.clicks {
            stats.candidates += 1;
            match self.step(driver, &mut rng, &mut path) {
                Ok(Some(snapshot)) => {
                    let screen_id = match driver.current_screen_id() {
                        Ok(id) => id,
                        Err(e) if e.is_fatal() => return Err(e),
                        Err(e) => {
                            debug!(error = %e, "no screen id after random click, restarting");
                            self.reset(driver, &mut path, &mut stats)?;
                            continue;
                        }
                    };

                    if !screen_id.starts_with(&app_id) {
                        debug!(screen = %screen_id, "left the app, restarting");
                        self.reset(driver, &mut path, &mut stats)?;
                        continue;
                    }

                    stats.visited.push(screen_id.clone());
                    let page = Page::with_path(snapshot, path.clone());
                    let text = page.text();
                    let verdict = self.classifier.evaluate(&text);
                    if verdict.is_policy {
                        info!(algorithm = LABEL, screen = %screen_id, clicks = stats.candidates, "policy text found");
                        tracer.log(
                            &tracer
                                .event(LABEL, &app_id, Decision::Matched)
                                .with_screen(&screen_id)
                                .with_depth(page.depth())
                                .with_verdict(&verdict)
                                .with_snapshot(page.snapshot()),
                        );
                        return Ok(SearchRun {
                            outcome: SearchOutcome::Found { page, text },
                            model,
                            stats,
                        });
                    }

                    let decision = if model.add(page, &screen_id).is_new() {
                        Decision::Discovered
                    } else {
                        Decision::Known
                    };
                    tracer.log(&tracer.event(LABEL, &app_id, decision).with_screen(&screen_id));
                }
                Ok(None) => self.reset(driver, &mut path, &mut stats)?,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    stats.failed_candidates += 1;
                    debug!(error = %e, "random step failed, restarting");
                    tracer.log(&tracer.event(LABEL, &app_id, Decision::Skipped).with_error(&e));
                    self.reset(driver, &mut path, &mut stats)?;
                }
            }
        }

        info!(algorithm = LABEL, clicks = self.clicks, "click budget exhausted");
        tracer.log(&tracer.event(LABEL, &app_id, Decision::Exhausted));
        Ok(SearchRun {
            outcome: SearchOutcome::NotFound,
            model,
            stats,
        })
    }

    /// One optional scroll plus one click. `None` when the screen offers nothing to click.
    fn step(
        &self,
        driver: &mut dyn AutomationDriver,
        rng: &mut StdRng,
        path: &mut Vec<ElementAddress>,
    ) -> Result<Option<ScreenSnapshot>, CrawlError> {
        let mut tree = driver.hierarchy()?;

        let scrollables = tree.select(|n| n.scrollable);
        if let Some(&container) = scrollables.choose(rng) {
            if rng.gen_bool(0.5) {
                let node = tree.node(container).clone();
                if driver.scroll_down(&node)? {
                    tree = driver.hierarchy()?;
                }
            }
        }

        let clickables = tree.select(|n| n.clickable);
        let Some(&target) = clickables.choose(rng) else {
            return Ok(None);
        };
        let address = ElementAddress::capture(&tree, target)?;
        debug!(target = %address, "random click");

        driver.tap(tree.node(target))?;
        let timeout = driver.settings().idle_timeout;
        driver.wait_for_idle(timeout)?;
        path.push(address);

        driver.current_screen().map(Some)
    }

    fn reset(
        &self,
        driver: &mut dyn AutomationDriver,
        path: &mut Vec<ElementAddress>,
        stats: &mut SearchStats,
    ) -> Result<(), CrawlError> {
        path.clear();
        stats.dropped_pages += 1;
        driver.restart()
    }
}
