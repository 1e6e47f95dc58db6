use serde::Serialize;

use crate::state::page::Page;

/// What [`NavigationModel::add`] did with a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// No equivalent page existed; the page was appended.
    New,
    /// An equal page was already present.
    Duplicate,
    /// An equivalent page absorbed the incoming one.
    Merged,
}

impl AddOutcome {
    pub fn is_new(self) -> bool {
        matches!(self, AddOutcome::New)
    }
}

// ============================================================================
// ModelNode
// ============================================================================

/// Pairwise non-equivalent pages observed under one screen identifier.
#[derive(Debug, Clone, Serialize)]
pub struct ModelNode {
    pub screen_id: String,
    pub pages: Vec<Page>,
}

impl ModelNode {
    pub fn new(screen_id: &str) -> Self {
        Self {
            screen_id: screen_id.to_string(),
            pages: Vec::new(),
        }
    }

    pub fn add(&mut self, page: Page) -> AddOutcome {
        for existing in &mut self.pages {
            if existing.same_screen(&page) {
                return AddOutcome::Duplicate;
            }
            if existing.is_equivalent(&page) {
                existing.snapshot_mut().merge(page.snapshot());
                return AddOutcome::Merged;
            }
        }
        self.pages.push(page);
        AddOutcome::New
    }
}

// ============================================================================
// NavigationModel
// ============================================================================

/// Deduplicated screens of one crawl, in order of first appearance.
///
/// Lives for a single crawl invocation and is never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct NavigationModel {
    pub app_id: String,
    pub nodes: Vec<ModelNode>,
}

impl NavigationModel {
    pub fn new(app_id: &str) -> Self {
        Self {
            app_id: app_id.to_string(),
            nodes: Vec::new(),
        }
    }

    /// Record `page` under `screen_id`; only a [`AddOutcome::New`] page needs exploring.
    pub fn add(&mut self, page: Page, screen_id: &str) -> AddOutcome {
        let position = match self.nodes.iter().position(|n| n.screen_id == screen_id) {
            Some(i) => i,
            None => {
                self.nodes.push(ModelNode::new(screen_id));
                self.nodes.len() - 1
            }
        };
        self.nodes[position].add(page)
    }

    pub fn node(&self, screen_id: &str) -> Option<&ModelNode> {
        self.nodes.iter().find(|n| n.screen_id == screen_id)
    }

    pub fn screen_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn page_count(&self) -> usize {
        self.nodes.iter().map(|n| n.pages.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
