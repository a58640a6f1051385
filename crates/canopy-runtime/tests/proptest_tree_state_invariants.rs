#![forbid(unsafe_code)]

//! Property-based invariant tests for the interaction state machine.
//!
//! 1. Collapse conservation: the visible frontier always sums to the root
//! 2. Toggling a node twice restores the visible ids and positions
//! 3. Ids never change under toggles and are unique
//! 4. A node is visible iff all its ancestors are expanded
//! 5. Every transition partitions the old and new visible sets

use std::collections::HashSet;

use canopy_core::{FieldAddress, Row, build};
use canopy_layout::NodeSize;
use canopy_runtime::{IdGenerator, NodeId, TreeState, ViewConfig};
use proptest::prelude::*;
use serde_json::json;

fn rows_strategy() -> impl Strategy<Value = Vec<Row>> {
    prop::collection::vec(
        (
            prop::sample::select(vec!["FR", "US", "DE", "JP"]),
            prop::option::weighted(0.9, prop::sample::select(vec!["a", "b", "c", "d", "e"])),
            prop::option::weighted(0.9, prop::sample::select(vec!["x", "y"])),
            0u32..1000,
        ),
        1..40,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .map(|(country, city, street, amount)| {
                Row::from_json(&json!({
                    "country": country,
                    "city": city,
                    "street": street,
                    "amount": amount,
                }))
            })
            .collect()
    })
}

fn materialize(rows: &[Row], depth: usize) -> TreeState {
    let tree = build(
        rows,
        &[
            FieldAddress::direct("country"),
            FieldAddress::direct("city"),
            FieldAddress::direct("street"),
        ],
        Some(&FieldAddress::direct("amount")),
    );
    let view = ViewConfig {
        initial_expand_depth: depth,
        ..ViewConfig::default()
    };
    TreeState::build(&tree, NodeSize::default(), &view, &mut IdGenerator::new(), None).0
}

fn visible_ids(state: &TreeState) -> Vec<NodeId> {
    state.visible().map(|n| n.id()).collect()
}

fn all_ids(state: &TreeState) -> Vec<NodeId> {
    state.nodes().iter().map(|n| n.id()).collect()
}

proptest! {
    #[test]
    fn collapse_conserves_value(
        rows in rows_strategy(),
        depth in 0usize..4,
        picks in prop::collection::vec(any::<prop::sample::Index>(), 0..12),
    ) {
        let mut state = materialize(&rows, depth);
        let total = state.root().value();
        for pick in picks {
            let id = state.nodes()[pick.index(state.nodes().len())].id();
            state.toggle(id);
            prop_assert!((state.visible_total() - total).abs() < 1e-6);
        }
    }

    #[test]
    fn double_toggle_is_identity(
        rows in rows_strategy(),
        depth in 0usize..4,
        pick in any::<prop::sample::Index>(),
    ) {
        let mut state = materialize(&rows, depth);
        let ids = visible_ids(&state);
        let layout = state.layout().clone();
        let id = state.nodes()[pick.index(state.nodes().len())].id();
        state.toggle(id);
        state.toggle(id);
        prop_assert_eq!(visible_ids(&state), ids);
        prop_assert_eq!(state.layout(), &layout);
    }

    #[test]
    fn ids_are_stable_and_unique(
        rows in rows_strategy(),
        picks in prop::collection::vec(any::<prop::sample::Index>(), 0..12),
    ) {
        let mut state = materialize(&rows, 1);
        let before = all_ids(&state);
        let unique: HashSet<NodeId> = before.iter().copied().collect();
        prop_assert_eq!(unique.len(), before.len());
        for pick in picks {
            let id = before[pick.index(before.len())];
            state.toggle(id);
        }
        prop_assert_eq!(all_ids(&state), before);
    }

    #[test]
    fn visibility_follows_ancestors(
        rows in rows_strategy(),
        depth in 0usize..4,
        picks in prop::collection::vec(any::<prop::sample::Index>(), 0..8),
    ) {
        let mut state = materialize(&rows, depth);
        for pick in picks {
            let id = state.nodes()[pick.index(state.nodes().len())].id();
            state.toggle(id);
        }
        for node in state.nodes() {
            let mut expected = true;
            let mut cursor = node.parent();
            while let Some(p) = cursor {
                expected &= state.node(p).is_expanded();
                cursor = state.node(p).parent();
            }
            prop_assert_eq!(node.is_visible(), expected, "{}", node.name());
        }
    }

    #[test]
    fn transitions_partition_visible_sets(
        rows in rows_strategy(),
        depth in 0usize..4,
        pick in any::<prop::sample::Index>(),
    ) {
        let mut state = materialize(&rows, depth);
        let old: HashSet<NodeId> = visible_ids(&state).into_iter().collect();
        let id = state.nodes()[pick.index(state.nodes().len())].id();
        if let Some(t) = state.toggle(id) {
            let new: HashSet<NodeId> = visible_ids(&state).into_iter().collect();
            let entering: HashSet<NodeId> = t.entering.iter().map(|d| d.id).collect();
            let updating: HashSet<NodeId> = t.updating.iter().map(|d| d.id).collect();
            let exiting: HashSet<NodeId> = t.exiting.iter().map(|d| d.id).collect();
            prop_assert_eq!(&entering, &new.difference(&old).copied().collect::<HashSet<_>>());
            prop_assert_eq!(&updating, &new.intersection(&old).copied().collect::<HashSet<_>>());
            prop_assert_eq!(&exiting, &old.difference(&new).copied().collect::<HashSet<_>>());
            prop_assert!(t.exiting.iter().all(|d| d.to == t.source_to));
            prop_assert!(t.entering.iter().all(|d| d.from == t.source_from));
        }
    }
}
