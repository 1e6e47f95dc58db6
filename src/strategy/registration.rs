use tracing::debug;

use crate::driver::AutomationDriver;
use crate::error::CrawlError;
use crate::screen::capture;
use crate::state::page::Page;

use super::keyword::KeywordText;
use super::{Strategy, StrategyContext, fresh_start};

/// Sign-up and login screens often link the policy; try the keyword hop from each.
pub struct Registration;

impl Strategy for Registration {
    fn name(&self) -> &'static str {
        "registration-page"
    }

    fn search(&self, driver: &mut dyn AutomationDriver, ctx: &StrategyContext<'_>) -> Result<Option<Page>, CrawlError> {
        let prefix = fresh_start(driver, ctx.patterns)?;
        let registration = &ctx.patterns.registration;
        let entries = capture::elements_where(driver, |tree, id| {
            let node = tree.node(id);
            node.clickable && node.text.as_deref().is_some_and(|t| registration.is_match(t))
        })?;
        debug!(count = entries.len(), "registration entries");

        for entry in entries {
            let mut path = prefix.clone();
            path.push(entry);
            match KeywordText.search_from(driver, ctx, &path) {
                Ok(Some(page)) => return Ok(Some(page)),
                Ok(None) => {}
                Err(e) if e.is_recoverable() => {
                    debug!(error = %e, "registration entry lost, trying the next one");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }
}
