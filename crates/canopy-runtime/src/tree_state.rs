#![forbid(unsafe_code)]

//! Interaction state for an aggregated tree.
//!
//! [`TreeState`] flattens a [`TreeNode`] into a pre-order arena of
//! [`PositionedNode`]s. Each node keeps its full child list plus an
//! `expanded` flag; the tidy solver only sees children of expanded nodes.
//!
//! # Invariants
//!
//! 1. Slot 0 is the root and is always visible.
//! 2. A node is visible iff every ancestor is expanded.
//! 3. Toggling never changes a [`NodeId`], a value, or the child lists.
//! 4. Values never change after materialization, so the value reachable
//!    from the root is the same under any expand/collapse sequence.
//!
//! # Failure Modes
//!
//! - Unknown ids and leaves are ignored by [`TreeState::toggle`] (`None`).
//! - Hidden nodes keep their last position; it is only meaningful as the
//!   start of an entering animation.

use std::fmt;
use std::time::Duration;

use canopy_core::{Scalar, TreeNode};
use canopy_layout::{NodeSize, Point, TidyTree, TreeLayout, TreeView};
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::config::{IdentityPolicy, ViewConfig};
use crate::host::{FilterEvent, InteractionCaps};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Stable identifier of one logical node within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Wrap a raw id, e.g. one handed back by a renderer.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Monotonic id source, one per session.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    last: u64,
}

impl IdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&mut self) -> NodeId {
        self.last += 1;
        NodeId(self.last)
    }
}

// ---------------------------------------------------------------------------
// Nodes and deltas
// ---------------------------------------------------------------------------

/// One node of the interactive tree.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedNode {
    id: NodeId,
    depth: usize,
    name: String,
    raw_value: Option<Scalar>,
    value: f64,
    attributed: f64,
    parent: Option<usize>,
    children: Vec<usize>,
    expanded: bool,
    visible: bool,
    position: Point,
    previous: Point,
}

impl PositionedNode {
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Grouping value in its native type; `None` for the root.
    #[must_use]
    pub fn raw_value(&self) -> Option<&Scalar> {
        self.raw_value.as_ref()
    }

    /// Rolled-up measure.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Measure attributed directly to this node (rows that stopped here).
    #[must_use]
    pub fn attributed(&self) -> f64 {
        self.attributed
    }

    /// Slot of the parent; `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    /// Every child slot, whether shown or not.
    #[must_use]
    pub fn all_children(&self) -> &[usize] {
        &self.children
    }

    /// Child slots currently shown.
    #[must_use]
    pub fn children(&self) -> &[usize] {
        if self.expanded { &self.children } else { &[] }
    }

    /// Child slots currently hidden by a collapse.
    #[must_use]
    pub fn hidden_children(&self) -> &[usize] {
        if self.expanded { &[] } else { &self.children }
    }

    #[must_use]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    #[must_use]
    pub fn has_hidden_children(&self) -> bool {
        !self.hidden_children().is_empty()
    }

    #[must_use]
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Current layout position.
    #[must_use]
    pub fn position(&self) -> Point {
        self.position
    }

    /// Position at the last snapshot, before the most recent re-layout.
    #[must_use]
    pub fn previous(&self) -> Point {
        self.previous
    }
}

/// Movement of one node across a re-layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PositionDelta {
    pub id: NodeId,
    pub from: Point,
    pub to: Point,
}

/// Everything a renderer needs to animate one state change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    /// Node whose toggle (or the root, for a rebuild) caused the change.
    pub source: NodeId,
    pub source_from: Point,
    pub source_to: Point,
    /// Newly visible: from `source_from` to their new position.
    pub entering: Vec<PositionDelta>,
    /// Visible before and after.
    pub updating: Vec<PositionDelta>,
    /// No longer visible: from their last position to `source_to`.
    pub exiting: Vec<PositionDelta>,
    pub duration: Duration,
}

// ---------------------------------------------------------------------------
// TreeState
// ---------------------------------------------------------------------------

/// Arena of positioned nodes plus the current layout.
#[derive(Debug, Clone)]
pub struct TreeState {
    nodes: Vec<PositionedNode>,
    index: FxHashMap<NodeId, usize>,
    solver: TidyTree,
    layout: TreeLayout,
    duration: Duration,
}

impl TreeView for TreeState {
    fn slot_count(&self) -> usize {
        self.nodes.len()
    }

    fn root(&self) -> usize {
        0
    }

    fn visible_children(&self, slot: usize) -> &[usize] {
        match self.nodes.get(slot) {
            Some(node) => node.children(),
            None => &[],
        }
    }
}

impl TreeState {
    /// Materialize `tree`, lay it out, and describe the change from
    /// `previous` (an empty view when there is none).
    ///
    /// With [`IdentityPolicy::PreserveByPath`], nodes whose name path
    /// exists in `previous` keep its id, expand flag and position. Otherwise
    /// every node gets a fresh id and the initial expand state.
    pub fn build(
        tree: &TreeNode,
        size: NodeSize,
        view: &ViewConfig,
        ids: &mut IdGenerator,
        previous: Option<&TreeState>,
    ) -> (Self, Transition) {
        let previous = previous.filter(|_| view.identity_policy == IdentityPolicy::PreserveByPath);
        let carried = previous.map(TreeState::path_index);
        let mut matched = vec![false; previous.map_or(0, |p| p.nodes.len())];

        let mut nodes: Vec<PositionedNode> = Vec::with_capacity(tree.node_count());
        let mut before: Vec<Option<Point>> = Vec::with_capacity(tree.node_count());
        let mut stack: Vec<(&TreeNode, Option<usize>, usize, Vec<String>)> =
            vec![(tree, None, 0, Vec::new())];

        while let Some((node, parent, depth, path)) = stack.pop() {
            let slot = nodes.len();
            let prior = carried
                .as_ref()
                .and_then(|index| index.get(&path).copied())
                .zip(previous)
                .map(|(old_slot, prev)| (old_slot, &prev.nodes[old_slot]));

            let (id, expanded, position) = match prior {
                Some((old_slot, old)) => {
                    matched[old_slot] = true;
                    (old.id, old.expanded, old.position)
                }
                None => (ids.mint(), depth <= view.initial_expand_depth, Point::ORIGIN),
            };
            before.push(prior.and_then(|(_, old)| old.visible.then_some(old.position)));

            nodes.push(PositionedNode {
                id,
                depth,
                name: node.name().to_owned(),
                raw_value: node.raw_value().cloned(),
                value: node.value(),
                attributed: node.attributed(),
                parent,
                children: Vec::with_capacity(node.children().len()),
                expanded,
                visible: false,
                position,
                previous: position,
            });
            if let Some(p) = parent {
                nodes[p].children.push(slot);
            }

            for child in node.children().iter().rev() {
                let mut child_path = path.clone();
                child_path.push(child.name().to_owned());
                stack.push((child, Some(slot), depth + 1, child_path));
            }
        }

        let index = nodes.iter().enumerate().map(|(slot, n)| (n.id, slot)).collect();
        let mut state = Self {
            nodes,
            index,
            solver: TidyTree::new(size),
            layout: TreeLayout::default(),
            duration: view.transition(),
        };
        state.relayout();

        let root_to = state.nodes[0].position;
        let vanished: Vec<PositionDelta> = previous
            .into_iter()
            .flat_map(|prev| prev.nodes.iter().zip(&matched))
            .filter(|(old, matched)| old.visible && !**matched)
            .map(|(old, _)| PositionDelta {
                id: old.id,
                from: old.position,
                to: root_to,
            })
            .collect();

        tracing::debug!(
            message = "tree.materialize",
            nodes = state.nodes.len(),
            visible = state.layout.visible_count(),
            carried = matched.iter().filter(|m| **m).count(),
            vanished = vanished.len()
        );

        let transition = state.transition(0, Point::ORIGIN, &before, vanished);
        (state, transition)
    }

    /// Flip the expand flag of `id` and re-layout.
    ///
    /// Returns `None` for unknown ids and for leaves.
    pub fn toggle(&mut self, id: NodeId) -> Option<Transition> {
        let slot = self.slot_of(id)?;
        if !self.nodes[slot].has_children() {
            return None;
        }

        let before: Vec<Option<Point>> = self
            .nodes
            .iter()
            .map(|n| n.visible.then_some(n.position))
            .collect();
        for node in self.nodes.iter_mut().filter(|n| n.visible) {
            node.previous = node.position;
        }
        let source_from = self.nodes[slot].position;

        let node = &mut self.nodes[slot];
        node.expanded = !node.expanded;
        let action = if node.expanded { "expand" } else { "collapse" };
        self.relayout();

        tracing::debug!(
            message = "tree.toggle",
            action,
            node = %id,
            label = self.nodes[slot].name.as_str(),
            visible = self.layout.visible_count()
        );
        Some(self.transition(slot, source_from, &before, Vec::new()))
    }

    /// Cross-filter request for the path from the root to `id`.
    ///
    /// `dimensions` are the dimension ids, outermost first. The root maps to
    /// [`FilterEvent::Clear`]. `None` when the host does not accept filters
    /// or the id is unknown.
    #[must_use]
    pub fn emit_filter(
        &self,
        id: NodeId,
        dimensions: &[String],
        caps: InteractionCaps,
    ) -> Option<FilterEvent> {
        if !caps.supports_filter {
            return None;
        }
        let slot = self.slot_of(id)?;

        let mut values = Vec::with_capacity(self.nodes[slot].depth);
        let mut cursor = slot;
        while let Some(parent) = self.nodes[cursor].parent {
            if let Some(raw) = &self.nodes[cursor].raw_value {
                values.push(raw.clone());
            }
            cursor = parent;
        }
        values.reverse();

        let concepts: Vec<String> = dimensions.iter().take(values.len()).cloned().collect();
        values.truncate(concepts.len());
        let event = if values.is_empty() {
            FilterEvent::Clear
        } else {
            FilterEvent::Set {
                concepts,
                values: vec![values],
            }
        };
        tracing::debug!(message = "tree.filter", node = %id, event = ?event);
        Some(event)
    }

    // -- Queries --------------------------------------------------------------

    #[must_use]
    pub fn root(&self) -> &PositionedNode {
        &self.nodes[0]
    }

    #[must_use]
    pub fn slot_of(&self, id: NodeId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&PositionedNode> {
        self.slot_of(id).map(|slot| &self.nodes[slot])
    }

    /// Node by slot. Panics on an out-of-range slot, like slice indexing.
    #[must_use]
    pub fn node(&self, slot: usize) -> &PositionedNode {
        &self.nodes[slot]
    }

    /// All nodes in pre-order, visible or not.
    #[must_use]
    pub fn nodes(&self) -> &[PositionedNode] {
        &self.nodes
    }

    /// Visible nodes in pre-order.
    pub fn visible(&self) -> impl Iterator<Item = &PositionedNode> + '_ {
        self.layout.order().iter().map(|&slot| &self.nodes[slot])
    }

    #[must_use]
    pub fn layout(&self) -> &TreeLayout {
        &self.layout
    }

    /// Id of the node reached by following child names from the root.
    #[must_use]
    pub fn find_path(&self, path: &[&str]) -> Option<NodeId> {
        let mut slot = 0;
        for name in path {
            slot = *self.nodes[slot]
                .children
                .iter()
                .find(|&&c| self.nodes[c].name == *name)?;
        }
        Some(self.nodes[slot].id)
    }

    /// Measure reachable from the visible frontier: directly attributed
    /// amounts of nodes showing children, full values of the rest. Equals
    /// the root value under any expand state.
    #[must_use]
    pub fn visible_total(&self) -> f64 {
        self.visible()
            .map(|n| {
                if n.children().is_empty() {
                    n.value
                } else {
                    n.attributed
                }
            })
            .sum()
    }

    // -- Internals ------------------------------------------------------------

    fn relayout(&mut self) {
        let layout = self.solver.layout(&*self);
        for (slot, node) in self.nodes.iter_mut().enumerate() {
            match layout.position(slot) {
                Some(point) => {
                    node.visible = true;
                    node.position = point;
                }
                None => node.visible = false,
            }
        }
        self.layout = layout;
    }

    /// Deltas between the `before` snapshot (per slot, `Some` if visible)
    /// and the current layout.
    fn transition(
        &self,
        source: usize,
        source_from: Point,
        before: &[Option<Point>],
        mut exiting: Vec<PositionDelta>,
    ) -> Transition {
        let source_to = self.nodes[source].position;
        let mut entering = Vec::new();
        let mut updating = Vec::new();
        for &slot in self.layout.order() {
            let node = &self.nodes[slot];
            match before.get(slot).copied().flatten() {
                Some(from) => updating.push(PositionDelta {
                    id: node.id,
                    from,
                    to: node.position,
                }),
                None => entering.push(PositionDelta {
                    id: node.id,
                    from: source_from,
                    to: node.position,
                }),
            }
        }
        for (slot, from) in before.iter().enumerate() {
            if let Some(from) = *from
                && !self.nodes[slot].visible
            {
                exiting.push(PositionDelta {
                    id: self.nodes[slot].id,
                    from,
                    to: source_to,
                });
            }
        }
        Transition {
            source: self.nodes[source].id,
            source_from,
            source_to,
            entering,
            updating,
            exiting,
            duration: self.duration,
        }
    }

    /// Name path (root excluded) to slot.
    fn path_index(&self) -> FxHashMap<Vec<String>, usize> {
        let mut paths: Vec<Vec<String>> = Vec::with_capacity(self.nodes.len());
        let mut index = FxHashMap::default();
        for (slot, node) in self.nodes.iter().enumerate() {
            let path = match node.parent {
                None => Vec::new(),
                Some(p) => {
                    let mut path = paths[p].clone();
                    path.push(node.name.clone());
                    path
                }
            };
            index.insert(path.clone(), slot);
            paths.push(path);
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_core::{FieldAddress, Row, build};
    use serde_json::json;

    fn sales_tree() -> TreeNode {
        sales_tree_with(json!([]))
    }

    fn sales_tree_with(extra: serde_json::Value) -> TreeNode {
        let mut rows: Vec<Row> = [
            json!({"country": "FR", "city": "Paris", "sales": 10}),
            json!({"country": "FR", "city": "Lyon", "sales": 5}),
            json!({"country": "US", "city": "NYC", "sales": 20}),
        ]
        .iter()
        .map(Row::from_json)
        .collect();
        if let Some(items) = extra.as_array() {
            rows.extend(items.iter().map(Row::from_json));
        }
        build(
            &rows,
            &[FieldAddress::direct("country"), FieldAddress::direct("city")],
            Some(&FieldAddress::direct("sales")),
        )
    }

    fn state(view: &ViewConfig) -> (TreeState, IdGenerator) {
        let mut ids = IdGenerator::new();
        let (state, _) = TreeState::build(&sales_tree(), NodeSize::default(), view, &mut ids, None);
        (state, ids)
    }

    fn ids_of(deltas: &[PositionDelta]) -> Vec<NodeId> {
        deltas.iter().map(|d| d.id).collect()
    }

    fn x_of(state: &TreeState, path: &[&str]) -> f64 {
        state.get(state.find_path(path).unwrap()).unwrap().position().x
    }

    fn dims() -> Vec<String> {
        vec!["country".to_owned(), "city".to_owned()]
    }

    #[test]
    fn initial_state_expands_to_depth_one() {
        let (state, _) = state(&ViewConfig::default());
        assert_eq!(state.layout().visible_count(), 6);
        assert_eq!(x_of(&state, &["FR"]), -30.0);
        assert_eq!(x_of(&state, &["US"]), 30.0);
        assert_eq!(x_of(&state, &["FR", "Paris"]), -42.0);

        let shallow = ViewConfig {
            initial_expand_depth: 0,
            ..ViewConfig::default()
        };
        let (state, _) = self::state(&shallow);
        assert_eq!(state.layout().visible_count(), 3);
        assert!(state.get(state.find_path(&["FR"]).unwrap()).unwrap().has_hidden_children());
    }

    #[test]
    fn build_transition_enters_from_origin() {
        let mut ids = IdGenerator::new();
        let (state, transition) = TreeState::build(
            &sales_tree(),
            NodeSize::default(),
            &ViewConfig::default(),
            &mut ids,
            None,
        );
        assert_eq!(transition.source, state.root().id());
        assert_eq!(transition.entering.len(), 6);
        assert!(transition.entering.iter().all(|d| d.from == Point::ORIGIN));
        assert!(transition.updating.is_empty());
        assert!(transition.exiting.is_empty());
    }

    #[test]
    fn collapse_moves_children_into_source() {
        let (mut state, _) = state(&ViewConfig::default());
        let fr = state.find_path(&["FR"]).unwrap();
        let paris = state.find_path(&["FR", "Paris"]).unwrap();
        let lyon = state.find_path(&["FR", "Lyon"]).unwrap();

        let t = state.toggle(fr).unwrap();
        assert_eq!(t.source, fr);
        assert_eq!(t.source_from, Point::new(-30.0, 180.0));
        assert_eq!(t.source_to, Point::new(-12.0, 180.0));
        assert!(t.entering.is_empty());
        assert_eq!(ids_of(&t.exiting), vec![paris, lyon]);
        assert!(t.exiting.iter().all(|d| d.to == t.source_to));
        assert_eq!(t.updating.len(), 4);
        assert_eq!(t.duration, Duration::from_millis(250));

        let fr_node = state.get(fr).unwrap();
        assert!(!fr_node.is_expanded());
        assert_eq!(fr_node.hidden_children().len(), 2);
        assert_eq!(fr_node.previous(), Point::new(-30.0, 180.0));
        assert!(!state.get(paris).unwrap().is_visible());
    }

    #[test]
    fn expand_enters_from_source_previous_position() {
        let (mut state, _) = state(&ViewConfig::default());
        let fr = state.find_path(&["FR"]).unwrap();
        state.toggle(fr);
        let t = state.toggle(fr).unwrap();
        assert_eq!(t.entering.len(), 2);
        assert!(t.entering.iter().all(|d| d.from == Point::new(-12.0, 180.0)));
        assert!(t.exiting.is_empty());
        assert_eq!(x_of(&state, &["FR", "Paris"]), -42.0);
    }

    #[test]
    fn toggle_twice_restores_layout() {
        let (mut state, _) = state(&ViewConfig::default());
        let original = state.layout().clone();
        let us = state.find_path(&["US"]).unwrap();
        state.toggle(us);
        state.toggle(us);
        assert_eq!(state.layout(), &original);
    }

    #[test]
    fn leaves_and_unknown_ids_are_ignored() {
        let (mut state, _) = state(&ViewConfig::default());
        let nyc = state.find_path(&["US", "NYC"]).unwrap();
        assert!(state.toggle(nyc).is_none());
        assert!(state.toggle(NodeId::new(999)).is_none());
    }

    #[test]
    fn filter_on_city_pairs_path_with_dimensions() {
        let (state, _) = state(&ViewConfig::default());
        let paris = state.find_path(&["FR", "Paris"]).unwrap();
        let event = state.emit_filter(paris, &dims(), InteractionCaps::with_filter());
        assert_eq!(
            event,
            Some(FilterEvent::Set {
                concepts: dims(),
                values: vec![vec![Scalar::from("FR"), Scalar::from("Paris")]],
            })
        );

        let fr = state.find_path(&["FR"]).unwrap();
        match state.emit_filter(fr, &dims(), InteractionCaps::with_filter()) {
            Some(FilterEvent::Set { concepts, .. }) => assert_eq!(concepts, vec!["country"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn filter_on_root_clears_and_respects_caps() {
        let (state, _) = state(&ViewConfig::default());
        let root = state.root().id();
        assert_eq!(
            state.emit_filter(root, &dims(), InteractionCaps::with_filter()),
            Some(FilterEvent::Clear)
        );
        assert_eq!(
            state.emit_filter(root, &dims(), InteractionCaps::default()),
            None
        );
    }

    #[test]
    fn regenerate_mints_fresh_ids() {
        let view = ViewConfig::default();
        let (mut first, mut ids) = state(&view);
        let fr = first.find_path(&["FR"]).unwrap();
        first.toggle(fr);

        let (second, _) =
            TreeState::build(&sales_tree(), NodeSize::default(), &view, &mut ids, Some(&first));
        let fr_again = second.find_path(&["FR"]).unwrap();
        assert_ne!(fr, fr_again);
        assert!(second.get(fr_again).unwrap().is_expanded());
        assert!(first.nodes().iter().all(|n| second.get(n.id()).is_none()));
    }

    #[test]
    fn preserve_by_path_carries_ids_and_flags() {
        let view = ViewConfig {
            identity_policy: IdentityPolicy::PreserveByPath,
            ..ViewConfig::default()
        };
        let (mut first, mut ids) = state(&view);
        let fr = first.find_path(&["FR"]).unwrap();
        let nyc = first.find_path(&["US", "NYC"]).unwrap();
        first.toggle(fr);

        let tree = sales_tree_with(json!([{"country": "DE", "city": "Berlin", "sales": 1}]));
        let (second, t) =
            TreeState::build(&tree, NodeSize::default(), &view, &mut ids, Some(&first));
        assert_eq!(second.find_path(&["FR"]), Some(fr));
        assert_eq!(second.find_path(&["US", "NYC"]), Some(nyc));
        assert!(!second.get(fr).unwrap().is_expanded());

        let de = second.find_path(&["DE"]).unwrap();
        assert!(de > nyc);
        assert!(ids_of(&t.entering).contains(&de));
        assert!(ids_of(&t.updating).contains(&fr));
    }

    #[test]
    fn preserve_by_path_exits_vanished_nodes() {
        let view = ViewConfig {
            identity_policy: IdentityPolicy::PreserveByPath,
            ..ViewConfig::default()
        };
        let (first, mut ids) = state(&view);
        let us = first.find_path(&["US"]).unwrap();
        let rows = vec![Row::from_json(&json!({"country": "FR", "city": "Paris", "sales": 1}))];
        let tree = build(
            &rows,
            &[FieldAddress::direct("country"), FieldAddress::direct("city")],
            Some(&FieldAddress::direct("sales")),
        );
        let (_, t) = TreeState::build(&tree, NodeSize::default(), &view, &mut ids, Some(&first));
        assert!(ids_of(&t.exiting).contains(&us));
    }

    #[test]
    fn visible_total_matches_root_value() {
        let (mut state, _) = state(&ViewConfig::default());
        assert_eq!(state.visible_total(), 35.0);
        let fr = state.find_path(&["FR"]).unwrap();
        state.toggle(fr);
        assert_eq!(state.visible_total(), 35.0);
        state.toggle(state.root().id());
        assert_eq!(state.visible_total(), 35.0);
        assert_eq!(state.layout().visible_count(), 1);
    }
}
