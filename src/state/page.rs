use serde::Serialize;

use crate::screen::snapshot::ScreenSnapshot;
use crate::state::address::ElementAddress;

/// A captured screen plus the clicks that reach it from a cold start.
///
/// The path is fixed at construction; a derived page copies its parent's path
/// and appends the address that was clicked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    snapshot: ScreenSnapshot,
    path: Vec<ElementAddress>,
}

impl Page {
    /// The page shown right after launch.
    pub fn root(snapshot: ScreenSnapshot) -> Self {
        Self {
            snapshot,
            path: Vec::new(),
        }
    }

    pub fn with_path(snapshot: ScreenSnapshot, path: Vec<ElementAddress>) -> Self {
        Self { snapshot, path }
    }

    /// The page reached by clicking `address` on this page.
    pub fn child(&self, snapshot: ScreenSnapshot, address: ElementAddress) -> Self {
        let mut path = self.path.clone();
        path.push(address);
        Self { snapshot, path }
    }

    pub fn snapshot(&self) -> &ScreenSnapshot {
        &self.snapshot
    }

    pub(crate) fn snapshot_mut(&mut self) -> &mut ScreenSnapshot {
        &mut self.snapshot
    }

    pub fn path(&self) -> &[ElementAddress] {
        &self.path
    }

    /// Number of clicks from a cold start.
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub fn text(&self) -> String {
        self.snapshot.text()
    }

    pub fn is_equivalent(&self, other: &Page) -> bool {
        self.snapshot.is_equivalent(&other.snapshot)
    }

    /// Structural equality of the captured screens; paths are not compared.
    pub fn same_screen(&self, other: &Page) -> bool {
        self.snapshot == other.snapshot
    }
}
