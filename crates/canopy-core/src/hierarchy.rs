#![forbid(unsafe_code)]

//! Hierarchy builder: flat rows to a rooted aggregation tree.
//!
//! Each row walks the dimension fields in order. At every level the grouping
//! cell is resolved and its canonical text selects (or creates) a child of
//! the current node. The row's measure contribution is added to the node
//! where the walk ends, and one post-order pass rolls the amounts up.
//!
//! # Missing values
//!
//! A row whose grouping value is missing at some level stops descending
//! there: its contribution is attributed to the node reached so far, which
//! may be an internal node or the root. No placeholder child is created.
//!
//! # Invariants
//!
//! 1. Siblings are unique by name and kept in first-seen order.
//! 2. After [`HierarchyBuilder::finish`], every node's `value` equals its
//!    directly attributed amount plus the sum of its children's values.
//! 3. `root.value()` equals the sum of all row contributions.
//!
//! Sibling lookup is a linear scan by name. That is fine for the
//! cardinalities a readable tree shows; the widest sibling group is reported
//! on finish (with the `tracing` feature) so hot paths can be spotted.

use serde::Serialize;

use crate::cell::{Scalar, parse_measure, resolve};
use crate::field::{FieldAddress, Row};

/// Name of the synthetic node standing for the whole dataset.
pub const ROOT_NAME: &str = "root";

/// One node of the aggregated hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    name: String,
    raw_value: Option<Scalar>,
    children: Vec<TreeNode>,
    value: f64,
    #[serde(skip)]
    attributed: f64,
}

impl TreeNode {
    fn root() -> Self {
        Self {
            name: ROOT_NAME.to_owned(),
            raw_value: None,
            children: Vec::new(),
            value: 0.0,
            attributed: 0.0,
        }
    }

    fn group(name: String, raw_value: Scalar) -> Self {
        Self {
            name,
            raw_value: Some(raw_value),
            children: Vec::new(),
            value: 0.0,
            attributed: 0.0,
        }
    }

    /// Canonical text of this node's grouping value (`"root"` for the root).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The native-typed grouping value. `None` only for the root.
    #[must_use]
    pub fn raw_value(&self) -> Option<&Scalar> {
        self.raw_value.as_ref()
    }

    #[must_use]
    pub fn children(&self) -> &[TreeNode] {
        &self.children
    }

    /// Rolled-up measure over every row reachable under this node.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Amount attributed to this node directly, i.e. by rows whose walk
    /// ended here.
    #[must_use]
    pub fn attributed(&self) -> f64 {
        self.attributed
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Child with the given name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&TreeNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Descend by child names from this node.
    #[must_use]
    pub fn find_path(&self, path: &[&str]) -> Option<&TreeNode> {
        path.iter().try_fold(self, |node, name| node.child(name))
    }

    /// Number of nodes in this subtree, including this one.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Self::node_count).sum::<usize>()
    }

    /// Number of leaves in this subtree.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            self.children.iter().map(Self::leaf_count).sum()
        }
    }

    /// Height of this subtree (a lone node has height 0).
    #[must_use]
    pub fn height(&self) -> usize {
        self.children
            .iter()
            .map(|c| c.height() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Pre-order walk with each node's depth relative to `self`.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a TreeNode, usize)) {
        self.walk_at(0, visit);
    }

    fn walk_at<'a>(&'a self, depth: usize, visit: &mut impl FnMut(&'a TreeNode, usize)) {
        visit(self, depth);
        for child in &self.children {
            child.walk_at(depth + 1, visit);
        }
    }

    fn rollup(&mut self) -> f64 {
        let below: f64 = self.children.iter_mut().map(Self::rollup).sum();
        self.value = self.attributed + below;
        self.value
    }

    #[cfg(any(test, feature = "tracing"))]
    fn widest_group(&self) -> usize {
        self.children
            .iter()
            .map(Self::widest_group)
            .fold(self.children.len(), usize::max)
    }
}

/// Incremental builder: push rows, then [`finish`](Self::finish).
#[derive(Debug, Clone)]
pub struct HierarchyBuilder {
    dimensions: Vec<FieldAddress>,
    measure: Option<FieldAddress>,
    root: TreeNode,
    rows: usize,
}

impl HierarchyBuilder {
    /// Create a builder grouping by `dimensions` in order. Without a measure
    /// every row contributes 1 (row count).
    #[must_use]
    pub fn new(dimensions: Vec<FieldAddress>, measure: Option<FieldAddress>) -> Self {
        Self {
            dimensions,
            measure,
            root: TreeNode::root(),
            rows: 0,
        }
    }

    /// Rows pushed so far.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Measure contribution of one row.
    fn contribution(&self, row: &Row) -> f64 {
        match &self.measure {
            None => 1.0,
            Some(measure) => measure
                .lookup(row)
                .map_or(0.0, |cell| parse_measure(cell, 0.0)),
        }
    }

    /// Insert one row into the tree (amounts are not rolled up yet).
    pub fn push_row(&mut self, row: &Row) {
        let amount = self.contribution(row);
        let mut node = &mut self.root;
        for dimension in &self.dimensions {
            let Some(value) = dimension.lookup(row).and_then(resolve) else {
                break;
            };
            let key = value.to_string();
            let index = match node.children.iter().position(|c| c.name == key) {
                Some(index) => index,
                None => {
                    node.children.push(TreeNode::group(key, value.clone()));
                    node.children.len() - 1
                }
            };
            node = &mut node.children[index];
        }
        node.attributed += amount;
        self.rows += 1;
    }

    /// Roll amounts up and return the root.
    #[must_use]
    pub fn finish(mut self) -> TreeNode {
        let total = self.root.rollup();
        #[cfg(feature = "tracing")]
        tracing::debug!(
            message = "hierarchy.build",
            rows = self.rows,
            nodes = self.root.node_count(),
            widest_group = self.root.widest_group(),
            total
        );
        #[cfg(not(feature = "tracing"))]
        let _ = total;
        self.root
    }
}

/// Build the aggregated tree for `rows` in one call.
///
/// Empty input and fewer than two dimensions are caller-level preconditions;
/// the builder accepts them and returns a root-only (or shallow) tree.
#[must_use]
pub fn build(
    rows: &[Row],
    dimensions: &[FieldAddress],
    measure: Option<&FieldAddress>,
) -> TreeNode {
    let mut builder = HierarchyBuilder::new(dimensions.to_vec(), measure.cloned());
    for row in rows {
        builder.push_row(row);
    }
    builder.finish()
}
