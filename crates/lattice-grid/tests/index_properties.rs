//! Property tests for index transforms stacked over a data layer.

use std::collections::HashSet;
use std::sync::Arc;

use lattice_grid::{DataLayer, DummyDataProvider, HideShowLayer, Layer, ReorderLayer};
use proptest::prelude::*;

const COLUMNS: usize = 12;

#[derive(Debug, Clone)]
enum Op {
    Reorder(usize, usize),
    MultiReorder(Vec<usize>, usize),
    Hide(usize),
    Show(usize),
    ShowAll,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..COLUMNS, 0..COLUMNS).prop_map(|(from, to)| Op::Reorder(from, to)),
        (prop::collection::vec(0..COLUMNS, 1..4), 0..COLUMNS).prop_map(|(from, to)| Op::MultiReorder(from, to)),
        (0..COLUMNS).prop_map(Op::Hide),
        (0..COLUMNS).prop_map(Op::Show),
        Just(Op::ShowAll),
    ]
}

proptest! {
    #[test]
    fn positions_and_indices_stay_a_dense_bijection(ops in prop::collection::vec(op_strategy(), 0..25)) {
        let data = DataLayer::new(Arc::new(DummyDataProvider::new(COLUMNS, 3)), 100, 20);
        let reorder = ReorderLayer::new(data);
        let hide_show = HideShowLayer::new(reorder.clone());
        let mut hidden: HashSet<usize> = HashSet::new();

        for op in ops {
            match op {
                Op::Reorder(from, to) => {
                    reorder.reorder_column_position(from, to);
                }
                Op::MultiReorder(mut from, to) => {
                    from.sort_unstable();
                    from.dedup();
                    reorder.multi_reorder_column_positions(&from, to);
                }
                Op::Hide(index) => {
                    hide_show.hide_column_indices(&[index]);
                    hidden.insert(index);
                }
                Op::Show(index) => {
                    hide_show.show_column_indices(&[index]);
                    hidden.remove(&index);
                }
                Op::ShowAll => {
                    hide_show.show_all_columns();
                    hidden.clear();
                }
            }
        }

        // The reorder layer is always a permutation of the data indices.
        let mut order = reorder.column_index_order();
        prop_assert_eq!(order.len(), COLUMNS);
        order.sort_unstable();
        prop_assert_eq!(order, (0..COLUMNS).collect::<Vec<_>>());

        // Visible positions are dense and round-trip through their indices.
        prop_assert_eq!(hide_show.column_count(), COLUMNS - hidden.len());
        let mut seen = HashSet::new();
        for position in 0..hide_show.column_count() {
            let index = hide_show.column_index_by_position(position);
            prop_assert!(index.is_some());
            let index = index.unwrap_or_default();
            prop_assert!(!hidden.contains(&index));
            prop_assert!(seen.insert(index));
            prop_assert_eq!(hide_show.column_position_by_index(index), Some(position));
        }
        prop_assert_eq!(hide_show.column_index_by_position(hide_show.column_count()), None);
        for index in &hidden {
            prop_assert_eq!(hide_show.column_position_by_index(*index), None);
        }

        // Hiding keeps the reorder layer's relative order.
        let expected: Vec<usize> = reorder
            .column_index_order()
            .into_iter()
            .filter(|index| !hidden.contains(index))
            .collect();
        let actual: Vec<usize> = (0..hide_show.column_count())
            .filter_map(|position| hide_show.column_index_by_position(position))
            .collect();
        prop_assert_eq!(actual, expected);
    }
}
