use tracing::debug;

use crate::driver::AutomationDriver;
use crate::driver::tree::{NodeId, UiTree};
use crate::error::CrawlError;
use crate::screen::snapshot::ScreenSnapshot;
use crate::state::address::ElementAddress;

/// Snapshot the current screen as the union of what bounded scrolling reveals.
///
/// Every scrollable container is scrolled down up to the driver's scroll limit,
/// re-snapshotting after each gesture and merging into the running total. The
/// live scroll positions are left where the last gesture put them.
pub fn capture_screen<D>(driver: &mut D) -> Result<ScreenSnapshot, CrawlError>
where
    D: AutomationDriver + ?Sized,
{
    let mut tree = driver.hierarchy()?;
    let mut snapshot = ScreenSnapshot::from_tree(&tree)?;
    let limit = driver.settings().scroll_limit;

    for container in container_addresses(&tree)? {
        let outcome = scroll_container(driver, &mut tree, &container, limit, |tree, _, _| {
            snapshot.merge(&ScreenSnapshot::from_tree(tree)?);
            Ok(())
        });
        skip_recoverable(outcome, &container)?;
    }

    Ok(snapshot)
}

/// Every clickable element of the current screen.
///
/// Elements visible without scrolling come first in enumeration order; then,
/// per scrollable container, the clickables inside it after each scroll,
/// addressed with the number of scrolls that revealed them.
pub fn actionable_elements<D>(driver: &mut D) -> Result<Vec<ElementAddress>, CrawlError>
where
    D: AutomationDriver + ?Sized,
{
    elements_where(driver, |tree, id| tree.node(id).clickable)
}

/// Like [`actionable_elements`], restricted to elements accepted by `pred`.
pub fn elements_where<D, P>(driver: &mut D, pred: P) -> Result<Vec<ElementAddress>, CrawlError>
where
    D: AutomationDriver + ?Sized,
    P: Fn(&UiTree, NodeId) -> bool,
{
    let mut tree = driver.hierarchy()?;
    let mut addresses = Vec::new();
    let root_matches: Vec<NodeId> = match tree.root() {
        Some(root) => std::iter::once(root)
            .chain(tree.descendants(root))
            .filter(|&id| pred(&tree, id))
            .collect(),
        None => Vec::new(),
    };
    for id in root_matches {
        addresses.push(ElementAddress::capture(&tree, id)?);
    }

    let limit = driver.settings().scroll_limit;
    for container in container_addresses(&tree)? {
        let outcome = scroll_container(driver, &mut tree, &container, limit, |tree, host, offset| {
            for id in tree.descendants(host) {
                if pred(tree, id) {
                    addresses.push(ElementAddress::capture_scrolled(tree, id, host, offset)?);
                }
            }
            Ok(())
        });
        skip_recoverable(outcome, &container)?;
    }

    Ok(addresses)
}

fn container_addresses(tree: &UiTree) -> Result<Vec<ElementAddress>, CrawlError> {
    tree.select(|n| n.scrollable)
        .into_iter()
        .map(|id| ElementAddress::capture(tree, id))
        .collect()
}

/// Scroll one container up to `limit` times, calling `visit` with the fresh
/// tree, the container's id in it and the number of scrolls so far.
fn scroll_container<D, F>(
    driver: &mut D,
    tree: &mut UiTree,
    container: &ElementAddress,
    limit: usize,
    mut visit: F,
) -> Result<(), CrawlError>
where
    D: AutomationDriver + ?Sized,
    F: FnMut(&UiTree, NodeId, usize) -> Result<(), CrawlError>,
{
    for offset in 1..=limit {
        let host = container.locate(tree)?;
        let node = tree.node(host).clone();
        if !driver.scroll_down(&node)? {
            break;
        }
        *tree = driver.hierarchy()?;
        let host = container.locate(tree)?;
        visit(tree, host, offset)?;
    }
    Ok(())
}

fn skip_recoverable(outcome: Result<(), CrawlError>, container: &ElementAddress) -> Result<(), CrawlError> {
    match outcome {
        Err(e) if e.is_recoverable() => {
            debug!(container = %container, error = %e, "scroll container lost, skipping");
            Ok(())
        }
        other => other,
    }
}
