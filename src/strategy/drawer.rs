use tracing::debug;

use crate::driver::AutomationDriver;
use crate::driver::tree::{NodeId, UiTree};
use crate::error::CrawlError;
use crate::explorer::frontier::{Candidates, FrontierConfig, FrontierSearch, Order, SearchOutcome};
use crate::state::address::ElementAddress;
use crate::state::page::Page;

use super::patterns::{DRAWER_KEYWORDS, KeywordPatterns};
use super::{Strategy, StrategyContext, fresh_start};

/// Deepest page the keyword search behind the drawer still expands from.
pub const DRAWER_SEARCH_DEPTH: usize = 5;

/// Open a navigation drawer, follow its most promising entry, then search
/// onwards along links labelled with navigation keywords.
pub struct DrawerMenu;

impl DrawerMenu {
    /// The narrowest top-level child of the drawer is taken to be the menu.
    fn menu(tree: &UiTree, patterns: &KeywordPatterns) -> Option<NodeId> {
        let drawer = tree.select(|n| patterns.drawer_class.is_match(&n.class_name)).into_iter().next()?;
        tree.children(drawer)
            .iter()
            .copied()
            .min_by_key(|&child| tree.node(child).bounds.area())
    }

    /// First menu entry mentioning a drawer keyword, keywords taken in order.
    fn entry(tree: &UiTree, menu: NodeId) -> Option<NodeId> {
        let items = tree.descendants(menu);
        let labels: Vec<String> = items.iter().map(|&id| tree.node(id).label().to_lowercase()).collect();
        DRAWER_KEYWORDS.iter().find_map(|keyword| {
            labels.iter().position(|l| l.contains(keyword)).map(|i| items[i])
        })
    }
}

impl Strategy for DrawerMenu {
    fn name(&self) -> &'static str {
        "drawer-menu"
    }

    fn search(&self, driver: &mut dyn AutomationDriver, ctx: &StrategyContext<'_>) -> Result<Option<Page>, CrawlError> {
        let mut path = fresh_start(driver, ctx.patterns)?;
        let tree = driver.hierarchy()?;
        if Self::menu(&tree, ctx.patterns).is_none() {
            debug!("no drawer on the start screen");
            return Ok(None);
        }

        // The first button is usually the hamburger toggle.
        let Some(toggle) = super::first_where(&tree, None, |n| n.class_name.ends_with("Button")) else {
            return Ok(None);
        };
        let toggle = ElementAddress::capture(&tree, toggle)?;
        driver.click(&toggle)?;
        path.push(toggle);

        let mut tree = driver.hierarchy()?;
        let Some(menu) = Self::menu(&tree, ctx.patterns) else {
            return Ok(None);
        };
        let menu_address = ElementAddress::capture(&tree, menu)?;

        let limit = driver.settings().scroll_limit;
        let mut picked = None;
        for offset in 0..=limit {
            let menu = menu_address.locate(&tree)?;
            if let Some(entry) = Self::entry(&tree, menu) {
                let address = if offset == 0 {
                    ElementAddress::capture(&tree, entry)?
                } else {
                    ElementAddress::capture_scrolled(&tree, entry, menu, offset)?
                };
                picked = Some((tree.node(entry).clone(), address));
                break;
            }
            if offset == limit || !driver.scroll_down(&tree.node(menu).clone())? {
                break;
            }
            tree = driver.hierarchy()?;
        }
        let Some((node, address)) = picked else {
            debug!("drawer has no keyword entry");
            return Ok(None);
        };

        // Already scrolled into view; tap directly rather than resolving from the top.
        debug!(target = %address, "following drawer entry");
        driver.tap(&node)?;
        let timeout = driver.settings().idle_timeout;
        driver.wait_for_idle(timeout)?;
        path.push(address);

        let seed = Page::with_path(driver.current_screen()?, path);
        let search = FrontierSearch::new(
            "OS",
            FrontierConfig {
                order: Order::Prioritized {
                    anchors: KeywordPatterns::anchors(),
                },
                candidates: Candidates::Labelled(ctx.patterns.navigation.clone()),
                max_depth: Some(DRAWER_SEARCH_DEPTH),
                max_expansions: None,
                restrict_to_app: true,
            },
            Some(ctx.classifier.clone()),
        );
        match search.run_from(driver, seed, ctx.tracer)?.outcome {
            SearchOutcome::Found { page, .. } => Ok(Some(page)),
            SearchOutcome::NotFound => Ok(None),
        }
    }
}
