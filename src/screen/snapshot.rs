use std::collections::BTreeSet;

use serde::Serialize;
use sha1::{Digest, Sha1};

use crate::driver::tree::{NodeId, UiTree};
use crate::error::CrawlError;

// ============================================================================
// ElementNode
// ============================================================================

/// Structural capture of one view and its subtree.
///
/// `text` accumulates every variant observed for the view while the screen was
/// sampled at different scroll positions. A view without text contributes the
/// empty variant, so the set is never empty for a freshly captured node.
///
/// Derived equality is the strict relation: tags, flags, text sets and children
/// pairwise in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElementNode {
    pub class_name: String,
    pub package: String,
    pub clickable: bool,
    pub scrollable: bool,
    pub text: BTreeSet<String>,
    pub children: Vec<ElementNode>,
}

impl ElementNode {
    pub fn from_tree(tree: &UiTree, id: NodeId) -> Self {
        let node = tree.node(id);
        let mut text = BTreeSet::new();
        text.insert(node.text.clone().unwrap_or_default());
        Self {
            class_name: node.class_name.clone(),
            package: node.package.clone(),
            clickable: node.clickable,
            scrollable: node.scrollable,
            text,
            children: node
                .children
                .iter()
                .map(|&child| ElementNode::from_tree(tree, child))
                .collect(),
        }
    }

    fn attributes_match(&self, other: &ElementNode) -> bool {
        self.class_name == other.class_name
            && self.package == other.package
            && self.clickable == other.clickable
            && self.scrollable == other.scrollable
            && self.text == other.text
    }

    /// Equality, except that below a scrollable view nothing is compared.
    pub fn is_equivalent(&self, other: &ElementNode) -> bool {
        if !self.attributes_match(other) {
            return false;
        }
        if self.scrollable {
            return true;
        }
        self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(&other.children)
                .all(|(a, b)| a.is_equivalent(b))
    }

    /// Fold `other` into `self`. Idempotent.
    ///
    /// Text sets are unioned. Under a scrollable view the items of its content
    /// container are unioned as a set; elsewhere children are merged pairwise.
    pub fn merge(&mut self, other: &ElementNode) {
        self.text.extend(other.text.iter().cloned());

        if self.scrollable && other.scrollable {
            self.merge_items(other);
            return;
        }

        for (mine, theirs) in self.children.iter_mut().zip(&other.children) {
            mine.merge(theirs);
        }
    }

    /// Union the scrolled items of two captures of the same scroller.
    ///
    /// A scroller wrapping a single layout (ScrollView > LinearLayout > items)
    /// holds its items one level down; list-style scrollers hold them directly.
    /// The wrapper is only looked through when both captures show the same one,
    /// so a one-row list merged with a longer capture keeps its rows side by side.
    fn merge_items(&mut self, other: &ElementNode) {
        let wrapped = match (self.children.as_slice(), other.children.as_slice()) {
            ([mine], [theirs]) => {
                !mine.children.is_empty()
                    && !theirs.children.is_empty()
                    && mine.class_name == theirs.class_name
                    && mine.package == theirs.package
            }
            _ => false,
        };
        let (target, incoming) = if wrapped {
            (&mut self.children[0], &other.children[0])
        } else {
            (self, other)
        };
        for item in &incoming.children {
            if !target.children.contains(item) {
                target.children.push(item.clone());
            }
        }
    }

    fn collect_text(&self, out: &mut Vec<String>) {
        out.extend(self.text.iter().filter(|t| !t.trim().is_empty()).cloned());
        for child in &self.children {
            child.collect_text(out);
        }
    }

    pub fn count(&self) -> usize {
        1 + self.children.iter().map(ElementNode::count).sum::<usize>()
    }
}

// ============================================================================
// ScreenSnapshot
// ============================================================================

/// Immutable structural capture of one rendered screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreenSnapshot {
    pub root: ElementNode,
}

impl ScreenSnapshot {
    pub fn from_tree(tree: &UiTree) -> Result<Self, CrawlError> {
        let root = tree
            .root()
            .ok_or_else(|| CrawlError::resolution(0, "hierarchy has no root"))?;
        Ok(Self {
            root: ElementNode::from_tree(tree, root),
        })
    }

    pub fn is_equivalent(&self, other: &ScreenSnapshot) -> bool {
        self.root.is_equivalent(&other.root)
    }

    pub fn merge(&mut self, other: &ScreenSnapshot) {
        self.root.merge(&other.root);
    }

    /// All non-empty text variants in pre-order, one per line.
    pub fn text(&self) -> String {
        let mut parts = Vec::new();
        self.root.collect_text(&mut parts);
        parts.join("\n")
    }

    /// SHA-1 of the text dump, used to correlate trace events.
    pub fn fingerprint(&self) -> String {
        text_fingerprint(&self.text())
    }
}

pub fn text_fingerprint(text: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
