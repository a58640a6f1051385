#![forbid(unsafe_code)]

//! Linear-time tidy tree layout (Walker, improved by Buchheim, Jünger and
//! Leipert).
//!
//! # Algorithm
//!
//! 1. **First walk** (post-order): give each node a preliminary coordinate
//!    relative to its left sibling, merge subtree contours using threads,
//!    and defer subtree moves as `shift`/`change` pairs.
//! 2. **Second walk** (pre-order): accumulate modifiers into final
//!    coordinates. The root ends at `x = 0`.
//! 3. **Scale**: `x *= dx`, `y = depth * dy`.
//!
//! Separation is 1 between siblings and 2 between cousins (in units of
//! `dx`), and every parent is centered over its first and last child.
//!
//! # Invariants
//!
//! 1. Pure: the result depends only on the visible view and the node size.
//! 2. Visible nodes on the same depth never come closer than `dx`.
//! 3. Only slots reachable through [`TreeView::visible_children`] get a
//!    position.

use crate::{Extent, Link, NodeSize, Point, TreeView};

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Result of one layout pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TreeLayout {
    positions: Vec<Option<Point>>,
    depths: Vec<usize>,
    order: Vec<usize>,
    links: Vec<Link>,
    extent: Extent,
}

impl TreeLayout {
    fn empty(slots: usize) -> Self {
        Self {
            positions: vec![None; slots],
            depths: vec![0; slots],
            ..Self::default()
        }
    }

    /// Position of `slot`, if it is visible.
    #[must_use]
    pub fn position(&self, slot: usize) -> Option<Point> {
        self.positions.get(slot).copied().flatten()
    }

    /// Depth of a visible slot (0 for the root or hidden slots).
    #[must_use]
    pub fn depth(&self, slot: usize) -> usize {
        self.depths.get(slot).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn is_visible(&self, slot: usize) -> bool {
        self.position(slot).is_some()
    }

    /// Visible slots in pre-order.
    #[must_use]
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Visible parent→child edges in pre-order of their targets.
    #[must_use]
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    #[must_use]
    pub fn extent(&self) -> Extent {
        self.extent
    }

    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.order.len()
    }
}

// ---------------------------------------------------------------------------
// Working state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Walker {
    slot: usize,
    parent: Option<usize>,
    children: Vec<usize>,
    /// Index among siblings.
    number: usize,
    depth: usize,
    prelim: f64,
    modifier: f64,
    change: f64,
    shift: f64,
    ancestor: usize,
    thread: Option<usize>,
    /// Default ancestor carried by a parent while its children are walked.
    default_ancestor: Option<usize>,
}

fn next_left(nodes: &[Walker], v: usize) -> Option<usize> {
    nodes[v].children.first().copied().or(nodes[v].thread)
}

fn next_right(nodes: &[Walker], v: usize) -> Option<usize> {
    nodes[v].children.last().copied().or(nodes[v].thread)
}

fn separation(nodes: &[Walker], a: usize, b: usize) -> f64 {
    if nodes[a].parent == nodes[b].parent {
        1.0
    } else {
        2.0
    }
}

fn move_subtree(nodes: &mut [Walker], wm: usize, wp: usize, shift: f64) {
    let subtrees = nodes[wp].number.saturating_sub(nodes[wm].number).max(1) as f64;
    let change = shift / subtrees;
    nodes[wp].change -= change;
    nodes[wp].shift += shift;
    nodes[wm].change += change;
    nodes[wp].prelim += shift;
    nodes[wp].modifier += shift;
}

fn execute_shifts(nodes: &mut [Walker], v: usize) {
    let mut shift = 0.0;
    let mut change = 0.0;
    for i in (0..nodes[v].children.len()).rev() {
        let w = nodes[v].children[i];
        nodes[w].prelim += shift;
        nodes[w].modifier += shift;
        change += nodes[w].change;
        shift += nodes[w].shift + change;
    }
}

fn next_ancestor(nodes: &[Walker], vim: usize, v: usize, ancestor: usize) -> usize {
    let candidate = nodes[vim].ancestor;
    if nodes[candidate].parent == nodes[v].parent {
        candidate
    } else {
        ancestor
    }
}

fn apportion(nodes: &mut [Walker], v: usize, left: Option<usize>, mut ancestor: usize) -> usize {
    let Some(w) = left else {
        return ancestor;
    };
    let Some(parent) = nodes[v].parent else {
        return ancestor;
    };

    let mut vip = v;
    let mut vop = v;
    let mut vim = w;
    let mut vom = nodes[parent].children[0];
    let mut sip = nodes[vip].modifier;
    let mut sop = nodes[vop].modifier;
    let mut sim = nodes[vim].modifier;
    let mut som = nodes[vom].modifier;

    let mut inner_right;
    let mut inner_left;
    loop {
        inner_right = next_right(nodes, vim);
        inner_left = next_left(nodes, vip);
        let (Some(im), Some(ip)) = (inner_right, inner_left) else {
            break;
        };
        let (Some(om), Some(op)) = (next_left(nodes, vom), next_right(nodes, vop)) else {
            break;
        };
        vim = im;
        vip = ip;
        vom = om;
        vop = op;
        nodes[vop].ancestor = v;

        let shift =
            nodes[vim].prelim + sim - nodes[vip].prelim - sip + separation(nodes, vim, vip);
        if shift > 0.0 {
            let wm = next_ancestor(nodes, vim, v, ancestor);
            move_subtree(nodes, wm, v, shift);
            sip += shift;
            sop += shift;
        }

        sim += nodes[vim].modifier;
        sip += nodes[vip].modifier;
        som += nodes[vom].modifier;
        sop += nodes[vop].modifier;
    }

    if let Some(im) = inner_right
        && next_right(nodes, vop).is_none()
    {
        nodes[vop].thread = Some(im);
        nodes[vop].modifier += sim - sop;
    }
    if let Some(ip) = inner_left
        && next_left(nodes, vom).is_none()
    {
        nodes[vom].thread = Some(ip);
        nodes[vom].modifier += sip - som;
        ancestor = v;
    }
    ancestor
}

fn first_walk(nodes: &mut [Walker], v: usize) {
    let parent = nodes[v].parent;
    let left = match parent {
        Some(p) if nodes[v].number > 0 => Some(nodes[p].children[nodes[v].number - 1]),
        _ => None,
    };

    if let (Some(&first), Some(&last)) = (nodes[v].children.first(), nodes[v].children.last()) {
        execute_shifts(nodes, v);
        let midpoint = (nodes[first].prelim + nodes[last].prelim) / 2.0;
        match left {
            Some(w) => {
                nodes[v].prelim = nodes[w].prelim + separation(nodes, v, w);
                nodes[v].modifier = nodes[v].prelim - midpoint;
            }
            None => nodes[v].prelim = midpoint,
        }
    } else if let Some(w) = left {
        nodes[v].prelim = nodes[w].prelim + separation(nodes, v, w);
    }

    if let Some(p) = parent {
        let ancestor = nodes[p]
            .default_ancestor
            .unwrap_or(nodes[p].children[0]);
        nodes[p].default_ancestor = Some(apportion(nodes, v, left, ancestor));
    }
}

// ---------------------------------------------------------------------------
// Solver
// ---------------------------------------------------------------------------

/// Tidy tree solver with a fixed per-node size budget.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TidyTree {
    size: NodeSize,
}

impl TidyTree {
    #[must_use]
    pub const fn new(size: NodeSize) -> Self {
        Self { size }
    }

    #[must_use]
    pub const fn size(&self) -> NodeSize {
        self.size
    }

    /// Lay out the visible part of `view`.
    #[must_use]
    pub fn layout(&self, view: &impl TreeView) -> TreeLayout {
        let slots = view.slot_count();
        let root = view.root();
        if root >= slots {
            return TreeLayout::empty(slots);
        }

        let mut nodes = collect_visible(view, slots, root);

        // Post-order with siblings left to right.
        let mut stack = vec![0usize];
        let mut post = Vec::with_capacity(nodes.len());
        while let Some(v) = stack.pop() {
            post.push(v);
            stack.extend(nodes[v].children.iter().copied());
        }
        for &v in post.iter().rev() {
            first_walk(&mut nodes, v);
        }

        // Walkers are stored in pre-order, so parents settle first.
        let mut layout = TreeLayout::empty(slots);
        let mut extent = Extent {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: 0.0,
        };
        for v in 0..nodes.len() {
            let parent_modifier = match nodes[v].parent {
                Some(p) => nodes[p].modifier,
                None => -nodes[v].prelim,
            };
            let x = nodes[v].prelim + parent_modifier;
            nodes[v].modifier += parent_modifier;

            let node = &nodes[v];
            let point = Point::new(x * self.size.dx, node.depth as f64 * self.size.dy);
            extent.min_x = extent.min_x.min(point.x);
            extent.max_x = extent.max_x.max(point.x);
            extent.max_y = extent.max_y.max(point.y);

            layout.positions[node.slot] = Some(point);
            layout.depths[node.slot] = node.depth;
            layout.order.push(node.slot);
            if let Some(p) = node.parent {
                layout.links.push(Link {
                    source: nodes[p].slot,
                    target: node.slot,
                });
            }
        }
        layout.extent = extent;
        layout
    }
}

/// Pre-order walk of the visible view into walker records.
fn collect_visible(view: &impl TreeView, slots: usize, root: usize) -> Vec<Walker> {
    let mut seen = vec![false; slots];
    let mut nodes: Vec<Walker> = Vec::new();
    // (slot, parent walker, depth)
    let mut stack: Vec<(usize, Option<usize>, usize)> = vec![(root, None, 0)];
    while let Some((slot, parent, depth)) = stack.pop() {
        if slot >= slots || seen[slot] {
            continue;
        }
        seen[slot] = true;
        let index = nodes.len();
        let number = match parent {
            Some(p) => {
                let siblings: &mut Vec<usize> = &mut nodes[p].children;
                siblings.push(index);
                siblings.len() - 1
            }
            None => 0,
        };
        nodes.push(Walker {
            slot,
            parent,
            children: Vec::new(),
            number,
            depth,
            prelim: 0.0,
            modifier: 0.0,
            change: 0.0,
            shift: 0.0,
            ancestor: index,
            thread: None,
            default_ancestor: None,
        });
        for &child in view.visible_children(slot).iter().rev() {
            stack.push((child, Some(index), depth + 1));
        }
    }
    nodes
}
