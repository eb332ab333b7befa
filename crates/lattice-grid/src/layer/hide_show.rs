//! Hiding and showing columns and rows.

use std::collections::BTreeSet;
use std::sync::{Arc, Weak};

use lattice_grid_core::logging::targets;
use lattice_grid_core::{LayerId, Orientation};
use parking_lot::RwLock;

use super::reorder::{IndexOrder, shift_for_delete, shift_for_insert};
use super::{Layer, LayerBase, LayerListener, OffsetCache, axis, forward_command, propagate_converted};
use crate::command::LayerCommand;
use crate::event::{LayerEvent, StructuralChangeEvent, StructuralKind};

#[derive(Debug, Default)]
struct HiddenAxis {
    hidden: BTreeSet<usize>,
    visible: IndexOrder,
}

impl HiddenAxis {
    fn rebuild(&mut self, underlying: Vec<usize>) {
        let visible = underlying
            .into_iter()
            .filter(|index| !self.hidden.contains(index))
            .collect();
        self.visible.set(visible);
    }
}

/// Drops hidden indices from the position space.
///
/// Hidden state is kept by index, so it survives reordering below. Visible
/// positions keep the relative order of the underlying layer.
pub struct HideShowLayer {
    base: LayerBase,
    underlying: Arc<dyn Layer>,
    columns: RwLock<HiddenAxis>,
    rows: RwLock<HiddenAxis>,
    column_offsets: OffsetCache,
    row_offsets: OffsetCache,
}

impl HideShowLayer {
    /// Wraps `underlying` with nothing hidden.
    pub fn new(underlying: Arc<dyn Layer>) -> Arc<Self> {
        let mut columns = HiddenAxis::default();
        columns.rebuild(axis::indices(underlying.as_ref(), Orientation::Horizontal));
        let mut rows = HiddenAxis::default();
        rows.rebuild(axis::indices(underlying.as_ref(), Orientation::Vertical));

        Arc::new_cyclic(|this: &Weak<Self>| {
            underlying.add_layer_listener(this.clone());
            Self {
                base: LayerBase::new(this.clone()),
                underlying,
                columns: RwLock::new(columns),
                rows: RwLock::new(rows),
                column_offsets: OffsetCache::default(),
                row_offsets: OffsetCache::default(),
            }
        })
    }

    fn axis_state(&self, orientation: Orientation) -> &RwLock<HiddenAxis> {
        match orientation {
            Orientation::Horizontal => &self.columns,
            Orientation::Vertical => &self.rows,
        }
    }

    fn offsets(&self, orientation: Orientation) -> &OffsetCache {
        match orientation {
            Orientation::Horizontal => &self.column_offsets,
            Orientation::Vertical => &self.row_offsets,
        }
    }

    // =========================================================================
    // Hide / Show
    // =========================================================================

    /// Hides columns by local position.
    pub fn hide_column_positions(&self, column_positions: &[usize]) -> bool {
        self.hide_positions(Orientation::Horizontal, column_positions)
    }

    /// Hides rows by local position.
    pub fn hide_row_positions(&self, row_positions: &[usize]) -> bool {
        self.hide_positions(Orientation::Vertical, row_positions)
    }

    /// Hides columns by index.
    pub fn hide_column_indices(&self, column_indices: &[usize]) -> bool {
        self.hide_indices(Orientation::Horizontal, column_indices)
    }

    /// Hides rows by index.
    pub fn hide_row_indices(&self, row_indices: &[usize]) -> bool {
        self.hide_indices(Orientation::Vertical, row_indices)
    }

    /// Shows hidden columns by index.
    pub fn show_column_indices(&self, column_indices: &[usize]) -> bool {
        self.show_indices(Orientation::Horizontal, column_indices)
    }

    /// Shows hidden rows by index.
    pub fn show_row_indices(&self, row_indices: &[usize]) -> bool {
        self.show_indices(Orientation::Vertical, row_indices)
    }

    /// Shows every hidden column.
    pub fn show_all_columns(&self) -> bool {
        let hidden = self.hidden_column_indices();
        self.show_indices(Orientation::Horizontal, &hidden)
    }

    /// Shows every hidden row.
    pub fn show_all_rows(&self) -> bool {
        let hidden = self.hidden_row_indices();
        self.show_indices(Orientation::Vertical, &hidden)
    }

    /// Hidden column indices, ascending.
    pub fn hidden_column_indices(&self) -> Vec<usize> {
        self.columns.read().hidden.iter().copied().collect()
    }

    /// Hidden row indices, ascending.
    pub fn hidden_row_indices(&self) -> Vec<usize> {
        self.rows.read().hidden.iter().copied().collect()
    }

    /// Whether a column index is hidden.
    pub fn is_column_index_hidden(&self, column_index: usize) -> bool {
        self.columns.read().hidden.contains(&column_index)
    }

    /// Whether a row index is hidden.
    pub fn is_row_index_hidden(&self, row_index: usize) -> bool {
        self.rows.read().hidden.contains(&row_index)
    }

    fn hide_positions(&self, orientation: Orientation, positions: &[usize]) -> bool {
        let indices: Vec<usize> = {
            let state = self.axis_state(orientation).read();
            positions.iter().filter_map(|p| state.visible.index(*p)).collect()
        };
        self.hide_indices(orientation, &indices)
    }

    fn hide_indices(&self, orientation: Orientation, indices: &[usize]) -> bool {
        let underlying = axis::indices(self.underlying.as_ref(), orientation);
        let (before, hidden) = {
            let mut state = self.axis_state(orientation).write();
            let hidden: Vec<usize> = indices
                .iter()
                .copied()
                .filter(|index| state.visible.position(*index).is_some())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            let before = state.visible.positions_of(&hidden);
            state.hidden.extend(hidden.iter().copied());
            state.rebuild(underlying);
            (before, hidden)
        };
        self.offsets(orientation).invalidate();

        tracing::debug!(target: targets::LAYER, ?orientation, ?hidden, "hidden");
        match StructuralChangeEvent::from_positions(self.id(), orientation, StructuralKind::Hide, &before, &[], hidden) {
            Some(event) => {
                self.fire_layer_event(event.into());
                true
            }
            None => false,
        }
    }

    fn show_indices(&self, orientation: Orientation, indices: &[usize]) -> bool {
        let underlying = axis::indices(self.underlying.as_ref(), orientation);
        let (after, shown) = {
            let mut state = self.axis_state(orientation).write();
            let shown: Vec<usize> = indices
                .iter()
                .copied()
                .filter(|index| state.hidden.remove(index))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            state.rebuild(underlying);
            (state.visible.positions_of(&shown), shown)
        };
        self.offsets(orientation).invalidate();

        tracing::debug!(target: targets::LAYER, ?orientation, ?shown, "shown");
        match StructuralChangeEvent::from_positions(self.id(), orientation, StructuralKind::Show, &[], &after, shown) {
            Some(event) => {
                self.fire_layer_event(event.into());
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // Events From Below
    // =========================================================================

    fn rebuild(&self, event: &StructuralChangeEvent) {
        let orientation = event.orientation;
        let mut indices = event.indices.clone();
        indices.sort_unstable();
        indices.dedup();

        let underlying = axis::indices(self.underlying.as_ref(), orientation);
        let (before, after) = {
            let mut state = self.axis_state(orientation).write();
            let before = match event.kind {
                StructuralKind::Delete | StructuralKind::Hide | StructuralKind::Reorder => {
                    state.visible.positions_of(&indices)
                }
                _ => Vec::new(),
            };
            match event.kind {
                StructuralKind::Delete => {
                    state.hidden = state
                        .hidden
                        .iter()
                        .filter_map(|index| shift_for_delete(*index, &indices))
                        .collect();
                }
                StructuralKind::Insert => {
                    state.hidden = state
                        .hidden
                        .iter()
                        .map(|index| shift_for_insert(*index, &indices))
                        .collect();
                }
                _ => {}
            }
            state.rebuild(underlying);
            let after = match event.kind {
                StructuralKind::Insert | StructuralKind::Show | StructuralKind::Reorder => {
                    state.visible.positions_of(&indices)
                }
                _ => Vec::new(),
            };
            (before, after)
        };
        self.offsets(orientation).invalidate();

        match StructuralChangeEvent::from_positions(self.id(), orientation, event.kind, &before, &after, indices) {
            Some(local) => self.fire_layer_event(local.into()),
            None => tracing::trace!(target: targets::EVENT, layer = %self.id(), "structural change not visible"),
        }
    }

    fn refresh(&self) {
        for orientation in [Orientation::Horizontal, Orientation::Vertical] {
            let underlying = axis::indices(self.underlying.as_ref(), orientation);
            self.axis_state(orientation).write().rebuild(underlying);
            self.offsets(orientation).invalidate();
        }
        self.fire_layer_event(LayerEvent::StructuralRefresh { layer: self.id() });
    }
}

impl LayerListener for HideShowLayer {
    fn handle_layer_event(&self, event: &LayerEvent) {
        match event {
            LayerEvent::Structural(structural) if structural.kind == StructuralKind::Resize => {
                self.offsets(structural.orientation).invalidate();
                propagate_converted(self, event);
            }
            LayerEvent::Structural(structural) => self.rebuild(structural),
            LayerEvent::StructuralRefresh { .. } => self.refresh(),
            _ => propagate_converted(self, event),
        }
    }
}

impl Layer for HideShowLayer {
    fn base(&self) -> &LayerBase {
        &self.base
    }

    fn underlying(&self) -> Option<&Arc<dyn Layer>> {
        Some(&self.underlying)
    }

    fn column_count(&self) -> usize {
        self.columns.read().visible.len()
    }

    fn column_index_by_position(&self, column_position: usize) -> Option<usize> {
        self.columns.read().visible.index(column_position)
    }

    fn column_position_by_index(&self, column_index: usize) -> Option<usize> {
        self.columns.read().visible.position(column_index)
    }

    fn local_to_underlying_column_position(&self, column_position: usize) -> Option<usize> {
        let index = self.column_index_by_position(column_position)?;
        self.underlying.column_position_by_index(index)
    }

    fn underlying_to_local_column_position(&self, _source: LayerId, column_position: usize) -> Option<usize> {
        let index = self.underlying.column_index_by_position(column_position)?;
        self.column_position_by_index(index)
    }

    fn width(&self) -> i32 {
        self.column_offsets
            .total(self.column_count(), |p| self.column_width_by_position(p))
    }

    fn start_x_of_column_position(&self, column_position: usize) -> Option<i32> {
        self.column_offsets
            .start_of(column_position, self.column_count(), |p| self.column_width_by_position(p))
    }

    fn column_position_by_x(&self, x: i32) -> Option<usize> {
        self.column_offsets
            .position_at(x, self.column_count(), |p| self.column_width_by_position(p))
    }

    fn row_count(&self) -> usize {
        self.rows.read().visible.len()
    }

    fn row_index_by_position(&self, row_position: usize) -> Option<usize> {
        self.rows.read().visible.index(row_position)
    }

    fn row_position_by_index(&self, row_index: usize) -> Option<usize> {
        self.rows.read().visible.position(row_index)
    }

    fn local_to_underlying_row_position(&self, row_position: usize) -> Option<usize> {
        let index = self.row_index_by_position(row_position)?;
        self.underlying.row_position_by_index(index)
    }

    fn underlying_to_local_row_position(&self, _source: LayerId, row_position: usize) -> Option<usize> {
        let index = self.underlying.row_index_by_position(row_position)?;
        self.row_position_by_index(index)
    }

    fn height(&self) -> i32 {
        self.row_offsets
            .total(self.row_count(), |p| self.row_height_by_position(p))
    }

    fn start_y_of_row_position(&self, row_position: usize) -> Option<i32> {
        self.row_offsets
            .start_of(row_position, self.row_count(), |p| self.row_height_by_position(p))
    }

    fn row_position_by_y(&self, y: i32) -> Option<usize> {
        self.row_offsets
            .position_at(y, self.row_count(), |p| self.row_height_by_position(p))
    }

    #[tracing::instrument(skip_all, target = "lattice_grid::command", level = "trace", fields(command = command.name()))]
    fn do_command(&self, command: &LayerCommand) -> bool {
        match command {
            LayerCommand::HideColumns { .. } | LayerCommand::HideRows { .. } => {
                match command.convert_to_target_layer(self) {
                    Some(LayerCommand::HideColumns {
                        column_positions, ..
                    }) => {
                        self.hide_column_positions(&column_positions);
                        true
                    }
                    Some(LayerCommand::HideRows { row_positions, .. }) => {
                        self.hide_row_positions(&row_positions);
                        true
                    }
                    _ => forward_command(self, command),
                }
            }
            LayerCommand::ShowColumnIndices { column_indices } => {
                self.show_column_indices(column_indices);
                true
            }
            LayerCommand::ShowRowIndices { row_indices } => {
                self.show_row_indices(row_indices);
                true
            }
            LayerCommand::ShowAllColumns => {
                self.show_all_columns();
                true
            }
            LayerCommand::ShowAllRows => {
                self.show_all_rows();
                true
            }
            _ => forward_command(self, command),
        }
    }
}

static_assertions::assert_impl_all!(HideShowLayer: Send, Sync);

#[cfg(test)]
mod tests {
    use lattice_grid_core::{Range, StructuralDiff};
    use parking_lot::Mutex;

    use super::*;
    use crate::data::DummyDataProvider;
    use crate::layer::{DataLayer, ReorderLayer, register_listener};

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<LayerEvent>>,
    }

    impl LayerListener for Recorder {
        fn handle_layer_event(&self, event: &LayerEvent) {
            self.events.lock().push(event.clone());
        }
    }

    fn stack(columns: usize) -> (Arc<ReorderLayer>, Arc<HideShowLayer>, Arc<Recorder>) {
        let data = DataLayer::new(Arc::new(DummyDataProvider::new(columns, 2)), 100, 20);
        let reorder = ReorderLayer::new(data);
        let hide_show = HideShowLayer::new(reorder.clone());
        let recorder = Arc::new(Recorder::default());
        let as_layer: Arc<dyn Layer> = hide_show.clone();
        register_listener(&as_layer, &recorder);
        (reorder, hide_show, recorder)
    }

    #[test]
    fn test_hide_and_show_index() {
        let (_reorder, layer, recorder) = stack(10);
        assert!(layer.hide_column_indices(&[3]));
        assert_eq!(layer.column_count(), 9);
        assert_eq!(layer.column_index_by_position(3), Some(4));
        assert_eq!(layer.column_position_by_index(3), None);
        assert_eq!(layer.width(), 900);

        assert!(layer.show_column_indices(&[3]));
        assert_eq!(layer.column_count(), 10);
        assert_eq!(axis::indices(layer.as_ref(), Orientation::Horizontal), (0..10).collect::<Vec<_>>());

        let events = recorder.events.lock();
        assert_eq!(
            events[0].column_diffs().unwrap().to_vec(),
            vec![StructuralDiff::delete(Range::single(3))]
        );
        assert_eq!(
            events[1].column_diffs().unwrap().to_vec(),
            vec![StructuralDiff::add(Range::single(3))]
        );
    }

    #[test]
    fn test_hide_everything_yields_empty_layer() {
        let (_reorder, layer, _) = stack(3);
        layer.hide_column_positions(&[0, 1, 2]);
        assert_eq!(layer.column_count(), 0);
        assert_eq!(layer.width(), 0);
        assert_eq!(layer.column_position_by_x(0), None);
        assert!(layer.cell_by_position(0, 0).is_none());
    }

    #[test]
    fn test_hiding_twice_fires_once() {
        let (_reorder, layer, recorder) = stack(4);
        assert!(layer.hide_column_indices(&[1]));
        assert!(!layer.hide_column_indices(&[1]));
        assert!(!layer.show_column_indices(&[2]));
        assert_eq!(recorder.events.lock().len(), 1);
    }

    #[test]
    fn test_hidden_state_survives_reorder_below() {
        let (reorder, layer, recorder) = stack(5);
        layer.hide_column_indices(&[1]);
        reorder.reorder_column_position(4, 0);

        assert_eq!(axis::indices(layer.as_ref(), Orientation::Horizontal), vec![4, 0, 2, 3]);
        assert_eq!(layer.local_to_underlying_column_position(1), Some(1));
        assert_eq!(layer.local_to_underlying_column_position(2), Some(3));

        let events = recorder.events.lock();
        assert_eq!(
            events.last().and_then(|e| e.column_diffs()).map(|d| d.to_vec()),
            Some(vec![
                StructuralDiff::delete(Range::single(3)),
                StructuralDiff::add(Range::single(0)),
            ])
        );
    }

    #[test]
    fn test_reorder_of_hidden_column_is_invisible() {
        let (reorder, layer, recorder) = stack(4);
        layer.hide_column_indices(&[3]);
        reorder.reorder_column_position(3, 0);
        assert_eq!(axis::indices(layer.as_ref(), Orientation::Horizontal), vec![0, 1, 2]);
        assert_eq!(recorder.events.lock().len(), 1);
    }

    #[test]
    fn test_show_all() {
        let (_reorder, layer, _) = stack(6);
        layer.hide_column_positions(&[0, 2, 4]);
        assert_eq!(layer.hidden_column_indices(), vec![0, 2, 4]);
        assert!(layer.show_all_columns());
        assert_eq!(layer.column_count(), 6);
        assert!(!layer.is_column_index_hidden(2));
    }
}
