use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::driver::AutomationDriver;
use crate::driver::tree::{Bounds, NodeId, UiNode, UiTree};
use crate::error::CrawlError;

// ============================================================================
// Matcher
// ============================================================================

/// Structural predicate over one view.
///
/// `has_child` chains the matcher of the next step, except through scrollable
/// containers whose children are reached by scrolling instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Matcher {
    pub class_name: String,
    pub package: String,
    pub clickable: bool,
    pub scrollable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_child: Option<Box<Matcher>>,
}

impl Matcher {
    pub fn of(node: &UiNode) -> Self {
        Self {
            class_name: node.class_name.clone(),
            package: node.package.clone(),
            clickable: node.clickable,
            scrollable: node.scrollable,
            has_child: None,
        }
    }

    pub fn with_child(mut self, child: Matcher) -> Self {
        self.has_child = Some(Box::new(child));
        self
    }

    pub fn matches(&self, tree: &UiTree, id: NodeId) -> bool {
        let node = tree.node(id);
        let own = node.class_name == self.class_name
            && node.package == self.package
            && node.clickable == self.clickable
            && node.scrollable == self.scrollable;
        own && match &self.has_child {
            Some(child) => tree.children(id).iter().any(|&c| child.matches(tree, c)),
            None => true,
        }
    }
}

// ============================================================================
// AddressStep / ElementAddress
// ============================================================================

/// One hop of an [`ElementAddress`].
///
/// `index` picks among the matches below the previous step in enumeration
/// order. A non-zero `scroll_offset` means the matched container must be
/// scrolled down that many times before the next step is resolved.
/// `bounds` and `text` are display metadata and never take part in resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressStep {
    pub matcher: Matcher,
    pub index: usize,
    #[serde(default)]
    pub scroll_offset: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl AddressStep {
    fn select(&self, tree: &UiTree, from: NodeId, position: usize) -> Result<NodeId, CrawlError> {
        let matches: Vec<NodeId> = tree
            .descendants(from)
            .into_iter()
            .filter(|&id| self.matcher.matches(tree, id))
            .collect();
        matches.get(self.index).copied().ok_or_else(|| {
            CrawlError::resolution(
                position,
                format!(
                    "index {} out of range ({} matches for {})",
                    self.index,
                    matches.len(),
                    self.matcher.class_name
                ),
            )
        })
    }
}

/// Replayable description of how to reach one element from the screen root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementAddress {
    pub steps: Vec<AddressStep>,
}

impl ElementAddress {
    /// Address of `target` as seen in `tree`, without scrolling.
    pub fn capture(tree: &UiTree, target: NodeId) -> Result<Self, CrawlError> {
        Self::build(tree, target, None)
    }

    /// Address of `target`, revealed after `offset` scrolls of the container `host`.
    pub fn capture_scrolled(
        tree: &UiTree,
        target: NodeId,
        host: NodeId,
        offset: usize,
    ) -> Result<Self, CrawlError> {
        Self::build(tree, target, Some((host, offset)))
    }

    fn build(
        tree: &UiTree,
        target: NodeId,
        scrolled: Option<(NodeId, usize)>,
    ) -> Result<Self, CrawlError> {
        if tree.root().is_none() || tree.get(target).is_none() {
            return Err(CrawlError::resolution(0, "element is not part of the hierarchy"));
        }

        let mut steps = VecDeque::new();
        let mut current = target;
        let mut matcher = Matcher::of(tree.node(target));

        while let Some(parent) = tree.parent(current) {
            let candidates: Vec<NodeId> = tree
                .descendants(parent)
                .into_iter()
                .filter(|&id| matcher.matches(tree, id))
                .collect();
            let node = tree.node(current);
            let scroll_offset = match scrolled {
                Some((host, offset)) if host == current => offset,
                _ => 0,
            };
            steps.push_front(AddressStep {
                matcher: matcher.clone(),
                index: pick_index(tree, &candidates, current),
                scroll_offset,
                bounds: Some(node.bounds),
                text: node.text.clone(),
            });

            let parent_node = tree.node(parent);
            matcher = if parent_node.scrollable {
                Matcher::of(parent_node)
            } else {
                Matcher::of(parent_node).with_child(matcher)
            };
            current = parent;
        }

        Ok(Self {
            steps: steps.into(),
        })
    }

    /// Find the addressed element in an already captured tree. Never scrolls.
    pub fn locate(&self, tree: &UiTree) -> Result<NodeId, CrawlError> {
        locate_steps(tree, &self.steps)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Display label of the addressed element, if it had text.
    pub fn label(&self) -> Option<&str> {
        self.steps.last().and_then(|s| s.text.as_deref())
    }
}

impl fmt::Display for ElementAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .steps
            .iter()
            .map(|s| {
                let short = s.matcher.class_name.rsplit('.').next().unwrap_or("");
                if s.scroll_offset > 0 {
                    format!("{}[{}]+{}", short, s.index, s.scroll_offset)
                } else {
                    format!("{}[{}]", short, s.index)
                }
            })
            .collect();
        write!(f, "/{}", parts.join("/"))
    }
}

/// Among several matches, take the one whose bounds equal the element's own.
/// Identical bounds are settled by identity within this dump.
fn pick_index(tree: &UiTree, candidates: &[NodeId], current: NodeId) -> usize {
    if candidates.len() <= 1 {
        return 0;
    }
    let bounds = tree.node(current).bounds;
    let same_bounds: Vec<usize> = candidates
        .iter()
        .enumerate()
        .filter(|(_, id)| tree.node(**id).bounds == bounds)
        .map(|(i, _)| i)
        .collect();
    match same_bounds.as_slice() {
        [only] => *only,
        _ => candidates.iter().position(|&c| c == current).unwrap_or(0),
    }
}

fn locate_steps(tree: &UiTree, steps: &[AddressStep]) -> Result<NodeId, CrawlError> {
    let mut current = tree
        .root()
        .ok_or_else(|| CrawlError::resolution(0, "hierarchy has no root"))?;
    for (position, step) in steps.iter().enumerate() {
        current = step.select(tree, current, position)?;
    }
    Ok(current)
}

/// Resolve `address` against the live UI, scrolling containers as recorded.
///
/// Returns an owned copy of the element from the last dump taken.
pub fn resolve<D>(driver: &mut D, address: &ElementAddress) -> Result<UiNode, CrawlError>
where
    D: AutomationDriver + ?Sized,
{
    let mut tree = driver.hierarchy()?;
    let mut current = tree
        .root()
        .ok_or_else(|| CrawlError::resolution(0, "hierarchy has no root"))?;

    for (position, step) in address.steps.iter().enumerate() {
        current = step.select(&tree, current, position)?;
        if step.scroll_offset > 0 {
            let container = tree.node(current).clone();
            for _ in 0..step.scroll_offset {
                driver.scroll_down(&container)?;
            }
            tree = driver.hierarchy()?;
            current = locate_steps(&tree, &address.steps[..=position])?;
        }
    }

    Ok(tree.node(current).clone())
}
