#![forbid(unsafe_code)]

//! Layout primitives and the tidy tree solver.
//!
//! The solver never owns a tree. It reads one through [`TreeView`], which
//! exposes only the *visible* children of each slot, so collapsed subtrees
//! contribute their single visible node and nothing else.

pub mod canvas;
pub mod tidy;

pub use canvas::{Canvas, Chrome, Size};
pub use tidy::{TidyTree, TreeLayout};

use serde::{Deserialize, Serialize};

/// A 2D position. `x` runs across rows (perpendicular to depth), `y` runs
/// along depth.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// The origin.
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Per-node size budget: `dx` between adjacent rows, `dy` per depth level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeSize {
    pub dx: f64,
    pub dy: f64,
}

impl NodeSize {
    #[must_use]
    pub const fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }
}

impl Default for NodeSize {
    fn default() -> Self {
        Self { dx: 24.0, dy: 180.0 }
    }
}

/// Bounds of the visible nodes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Extent {
    pub min_x: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    /// Span across rows (`max_x - min_x`).
    #[must_use]
    pub fn breadth(&self) -> f64 {
        self.max_x - self.min_x
    }
}

/// A visible parent→child edge, by slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Link {
    pub source: usize,
    pub target: usize,
}

/// Read-only view of a tree addressed by slot indices.
pub trait TreeView {
    /// Total number of slots (visible or not).
    fn slot_count(&self) -> usize;

    /// Slot of the root.
    fn root(&self) -> usize;

    /// Children of `slot` that take part in layout, in display order.
    /// Collapsed nodes return an empty slice.
    fn visible_children(&self, slot: usize) -> &[usize];
}
