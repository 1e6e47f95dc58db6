use serde::{Deserialize, Serialize};

// ============================================================================
// Geometry
// ============================================================================

/// On-screen rectangle of a view, in device pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i64 {
        (self.right - self.left).max(0) as i64
    }

    pub fn height(&self) -> i64 {
        (self.bottom - self.top).max(0) as i64
    }

    pub fn area(&self) -> i64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> (i32, i32) {
        ((self.left + self.right) / 2, (self.top + self.bottom) / 2)
    }

    pub fn is_empty(&self) -> bool {
        self.area() == 0
    }
}

// ============================================================================
// Nested dump, as delivered by the on-device bridge
// ============================================================================

/// One view of a hierarchy dump in its nested wire form.
///
/// The bridge serializes the accessibility tree as nested JSON; tests and the
/// simulated app build the same structure with the builder methods below.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawView {
    #[serde(rename = "class", default)]
    pub class_name: String,
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(rename = "resourceId", default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub clickable: bool,
    #[serde(default)]
    pub scrollable: bool,
    #[serde(default)]
    pub bounds: Bounds,
    #[serde(default)]
    pub children: Vec<RawView>,
}

impl RawView {
    pub fn new(class_name: &str, package: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            package: package.to_string(),
            ..Default::default()
        }
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn resource_id(mut self, id: &str) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }

    pub fn clickable(mut self) -> Self {
        self.clickable = true;
        self
    }

    pub fn scrollable(mut self) -> Self {
        self.scrollable = true;
        self
    }

    pub fn bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn child(mut self, child: RawView) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = RawView>) -> Self {
        self.children.extend(children);
        self
    }

    /// Give every view without bounds a distinct rectangle nested inside its parent's.
    ///
    /// Views are stacked in pre-order rows of 10px; a view spans the rows of its whole subtree.
    pub fn auto_layout(&mut self) {
        let mut row = 0;
        layout_rows(self, &mut row);
    }

    fn subtree_len(&self) -> i32 {
        1 + self.children.iter().map(RawView::subtree_len).sum::<i32>()
    }
}

fn layout_rows(view: &mut RawView, row: &mut i32) {
    if view.bounds.is_empty() {
        let top = *row * 10;
        view.bounds = Bounds::new(0, top, 1080, top + view.subtree_len() * 10);
    }
    *row += 1;
    for child in &mut view.children {
        layout_rows(child, row);
    }
}

// ============================================================================
// Arena
// ============================================================================

pub type NodeId = usize;

/// One view of a flattened dump. Links are arena indices, valid only within the dump.
#[derive(Debug, Clone, PartialEq)]
pub struct UiNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub class_name: String,
    pub package: String,
    pub text: Option<String>,
    pub resource_id: Option<String>,
    pub clickable: bool,
    pub scrollable: bool,
    pub bounds: Bounds,
}

impl UiNode {
    /// Whether the unqualified class name equals `short` (`Button` matches `android.widget.Button`).
    pub fn is_class(&self, short: &str) -> bool {
        self.class_name == short || self.class_name.rsplit('.').next() == Some(short)
    }

    pub fn label(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// Owned capture of one live hierarchy. Index 0 is the window root.
///
/// Nothing here refers back into the device: once dumped, the tree is plain data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiTree {
    nodes: Vec<UiNode>,
}

impl UiTree {
    pub fn empty() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn from_raw(root: &RawView) -> Self {
        let mut nodes = Vec::new();
        flatten(root, None, &mut nodes);
        Self { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<NodeId> {
        if self.nodes.is_empty() { None } else { Some(0) }
    }

    pub fn node(&self, id: NodeId) -> &UiNode {
        &self.nodes[id]
    }

    pub fn get(&self, id: NodeId) -> Option<&UiNode> {
        self.nodes.get(id)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Proper descendants of `id` in pre-order (enumeration order).
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(p) = current {
            out.push(p);
            current = self.parent(p);
        }
        out
    }

    /// Descendants of `from` satisfying `pred`, in enumeration order.
    pub fn find_all(&self, from: NodeId, pred: impl Fn(&UiNode) -> bool) -> Vec<NodeId> {
        self.descendants(from)
            .into_iter()
            .filter(|&id| pred(&self.nodes[id]))
            .collect()
    }

    pub fn find_first(&self, from: NodeId, pred: impl Fn(&UiNode) -> bool) -> Option<NodeId> {
        self.descendants(from)
            .into_iter()
            .find(|&id| pred(&self.nodes[id]))
    }

    /// Every node (root included) satisfying `pred`, in enumeration order.
    pub fn select(&self, pred: impl Fn(&UiNode) -> bool) -> Vec<NodeId> {
        match self.root() {
            Some(root) => std::iter::once(root)
                .chain(self.descendants(root))
                .filter(|&id| pred(&self.nodes[id]))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Whether `id` or one of its descendants satisfies `pred`.
    pub fn subtree_has(&self, id: NodeId, pred: impl Fn(&UiNode) -> bool) -> bool {
        pred(&self.nodes[id]) || self.descendants(id).into_iter().any(|d| pred(&self.nodes[d]))
    }
}

fn flatten(view: &RawView, parent: Option<NodeId>, nodes: &mut Vec<UiNode>) -> NodeId {
    let id = nodes.len();
    nodes.push(UiNode {
        id,
        parent,
        children: Vec::new(),
        class_name: view.class_name.clone(),
        package: view.package.clone(),
        text: view.text.clone(),
        resource_id: view.resource_id.clone(),
        clickable: view.clickable,
        scrollable: view.scrollable,
        bounds: view.bounds,
    });
    for child in &view.children {
        let child_id = flatten(child, Some(id), nodes);
        nodes[id].children.push(child_id);
    }
    id
}
