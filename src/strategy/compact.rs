use tracing::debug;

use crate::driver::AutomationDriver;
use crate::driver::tree::{NodeId, UiTree};
use crate::error::CrawlError;
use crate::screen::capture;
use crate::state::address::ElementAddress;
use crate::state::page::Page;

use super::{Strategy, StrategyContext, classify_here, click_first, first_where, replay_clean};

const ICON_CLASSES: &[&str] = &["Button", "ImageButton", "ImageView"];

/// Open each small button or icon and look for a policy entry in the popup list it shows.
pub struct CompactMenu;

impl CompactMenu {
    fn try_icon(
        &self,
        driver: &mut dyn AutomationDriver,
        ctx: &StrategyContext<'_>,
        prefix: &[ElementAddress],
        icon: ElementAddress,
    ) -> Result<Option<Page>, CrawlError> {
        let mut path = replay_clean(driver, prefix, ctx.patterns)?;
        driver.click(&icon)?;
        path.push(icon);

        let screen = driver.current_screen_id()?;
        if !screen.starts_with(driver.app_id()) {
            debug!(screen = %screen, "icon left the app");
            return Ok(None);
        }

        let tree = driver.hierarchy()?;
        let Some(list) = popup_list(&tree) else {
            return Ok(None);
        };

        let entry = &ctx.patterns.compact_entry;
        if let Some(target) = first_where(&tree, Some(list), |n| entry.is_match(n.label())) {
            let address = ElementAddress::capture(&tree, target)?;
            driver.click(&address)?;
            path.push(address);
            return classify_here(driver, ctx, path);
        }

        // One more hop through a help or about entry.
        let help = &ctx.patterns.help_about;
        let Some(hop) = click_first(driver, |n| help.is_match(n.label()))? else {
            return Ok(None);
        };
        path.push(hop);
        let Some(last) = click_first(driver, |n| entry.is_match(n.label()))? else {
            return Ok(None);
        };
        path.push(last);
        classify_here(driver, ctx, path)
    }
}

impl Strategy for CompactMenu {
    fn name(&self) -> &'static str {
        "compact-menu"
    }

    fn search(&self, driver: &mut dyn AutomationDriver, ctx: &StrategyContext<'_>) -> Result<Option<Page>, CrawlError> {
        let prefix = super::fresh_start(driver, ctx.patterns)?;
        let mut icons = Vec::new();
        for class in ICON_CLASSES {
            icons.extend(capture::elements_where(driver, |tree, id| {
                let node = tree.node(id);
                node.clickable && node.is_class(class)
            })?);
        }
        debug!(count = icons.len(), "compact menu candidates");

        for icon in icons {
            match self.try_icon(driver, ctx, &prefix, icon) {
                Ok(Some(page)) => return Ok(Some(page)),
                Ok(None) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => debug!(error = %e, "icon failed, trying the next one"),
            }
        }
        Ok(None)
    }
}

/// A `FrameLayout > FrameLayout > ListView` popup, as overflow menus render.
fn popup_list(tree: &UiTree) -> Option<NodeId> {
    tree.select(|n| n.is_class("FrameLayout")).into_iter().find(|&outer| {
        tree.children(outer).iter().any(|&inner| {
            tree.node(inner).is_class("FrameLayout")
                && tree.children(inner).iter().any(|&list| tree.node(list).is_class("ListView"))
        })
    })
}
