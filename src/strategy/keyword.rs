use tracing::debug;

use crate::driver::AutomationDriver;
use crate::error::CrawlError;
use crate::state::address::ElementAddress;
use crate::state::page::Page;

use super::{Strategy, StrategyContext, classify_here, click_first, fresh_start, replay_clean};

/// Class of the clickable nodes a web page renders its links as.
const CONTENT_VIEW: &str = "android.view.View";

/// Follow one navigation keyword on the start screen, then optionally one narrower hop.
pub struct KeywordText;

impl KeywordText {
    /// Run from the screen reached by `path` instead of the launch screen.
    pub fn search_from(
        &self,
        driver: &mut dyn AutomationDriver,
        ctx: &StrategyContext<'_>,
        path: &[ElementAddress],
    ) -> Result<Option<Page>, CrawlError> {
        let mut path = replay_clean(driver, path, ctx.patterns)?;
        self.follow(driver, ctx, &mut path)
    }

    fn follow(
        &self,
        driver: &mut dyn AutomationDriver,
        ctx: &StrategyContext<'_>,
        path: &mut Vec<ElementAddress>,
    ) -> Result<Option<Page>, CrawlError> {
        let navigation = &ctx.patterns.navigation;
        let Some(first) = click_first(driver, |n| {
            n.clickable && n.text.as_deref().is_some_and(|t| navigation.is_match(t))
        })?
        else {
            debug!("no navigation keyword on screen");
            return Ok(None);
        };
        debug!(target = %first, "followed navigation keyword");
        path.push(first);

        // Only plain views (web content) lead further; toolbar widgets do not.
        let narrow = &ctx.patterns.narrow;
        if let Some(second) = click_first(driver, |n| {
            n.clickable && n.is_class(CONTENT_VIEW) && n.text.as_deref().is_some_and(|t| narrow.is_match(t))
        })? {
            debug!(target = %second, "followed narrower keyword");
            path.push(second);
        }

        classify_here(driver, ctx, path.clone())
    }
}

impl Strategy for KeywordText {
    fn name(&self) -> &'static str {
        "keyword-text"
    }

    fn search(&self, driver: &mut dyn AutomationDriver, ctx: &StrategyContext<'_>) -> Result<Option<Page>, CrawlError> {
        let mut path = fresh_start(driver, ctx.patterns)?;
        self.follow(driver, ctx, &mut path)
    }
}
