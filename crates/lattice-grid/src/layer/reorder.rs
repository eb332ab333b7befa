//! Column and row reordering.
//!
//! The layer keeps, per axis, the list of indices in local position order plus
//! its inverse. Indices are stable across every frame, so the order survives
//! anything the layers below do except inserting or deleting data.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

use lattice_grid_core::logging::targets;
use lattice_grid_core::{LayerId, Orientation};
use parking_lot::RwLock;

use super::{Layer, LayerBase, LayerListener, OffsetCache, axis, forward_command, propagate_converted};
use crate::command::LayerCommand;
use crate::event::{LayerEvent, StructuralChangeEvent, StructuralKind};

/// Index order of one axis.
#[derive(Debug, Clone, Default)]
pub(crate) struct IndexOrder {
    order: Vec<usize>,
    positions: HashMap<usize, usize>,
}

impl IndexOrder {
    pub(crate) fn new(order: Vec<usize>) -> Self {
        let mut this = Self::default();
        this.set(order);
        this
    }

    pub(crate) fn set(&mut self, order: Vec<usize>) {
        self.positions = order.iter().enumerate().map(|(p, i)| (*i, p)).collect();
        self.order = order;
    }

    pub(crate) fn order(&self) -> &[usize] {
        &self.order
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    pub(crate) fn index(&self, position: usize) -> Option<usize> {
        self.order.get(position).copied()
    }

    pub(crate) fn position(&self, index: usize) -> Option<usize> {
        self.positions.get(&index).copied()
    }

    pub(crate) fn positions_of(&self, indices: &[usize]) -> Vec<usize> {
        let mut positions: Vec<usize> = indices.iter().filter_map(|i| self.position(*i)).collect();
        positions.sort_unstable();
        positions
    }

    /// Keeps known indices in their order; unknown ones go to their underlying position.
    pub(crate) fn reconcile(&mut self, underlying: &[usize]) {
        let present: HashSet<usize> = underlying.iter().copied().collect();
        let mut order: Vec<usize> = self.order.iter().copied().filter(|i| present.contains(i)).collect();
        let known: HashSet<usize> = order.iter().copied().collect();
        for (underlying_position, index) in underlying.iter().enumerate() {
            if !known.contains(index) {
                order.insert(underlying_position.min(order.len()), *index);
            }
        }
        self.set(order);
    }

    /// Drops deleted indices and renumbers the rest.
    pub(crate) fn apply_delete(&mut self, deleted: &[usize]) {
        let order = self
            .order
            .iter()
            .filter_map(|i| shift_for_delete(*i, deleted))
            .collect();
        self.set(order);
    }

    /// Renumbers indices around inserted ones (given in the new frame).
    pub(crate) fn apply_insert(&mut self, inserted: &[usize]) {
        let order = self
            .order
            .iter()
            .map(|i| shift_for_insert(*i, inserted))
            .collect();
        self.set(order);
    }
}

/// New number of `index` after `deleted` (sorted) were removed.
pub(crate) fn shift_for_delete(index: usize, deleted: &[usize]) -> Option<usize> {
    if deleted.binary_search(&index).is_ok() {
        return None;
    }
    Some(index - deleted.partition_point(|d| *d < index))
}

/// New number of `index` after `inserted` (sorted, new frame) were added.
pub(crate) fn shift_for_insert(index: usize, inserted: &[usize]) -> usize {
    inserted
        .iter()
        .fold(index, |index, new| if index >= *new { index + 1 } else { index })
}

/// Moves columns and rows around without touching the data.
pub struct ReorderLayer {
    base: LayerBase,
    underlying: Arc<dyn Layer>,
    columns: RwLock<IndexOrder>,
    rows: RwLock<IndexOrder>,
    column_offsets: OffsetCache,
    row_offsets: OffsetCache,
}

impl ReorderLayer {
    /// Wraps `underlying` in its natural order.
    pub fn new(underlying: Arc<dyn Layer>) -> Arc<Self> {
        let columns = IndexOrder::new(axis::indices(underlying.as_ref(), Orientation::Horizontal));
        let rows = IndexOrder::new(axis::indices(underlying.as_ref(), Orientation::Vertical));
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

    fn order(&self, orientation: Orientation) -> &RwLock<IndexOrder> {
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

    /// Column indices in position order.
    pub fn column_index_order(&self) -> Vec<usize> {
        self.columns.read().order().to_vec()
    }

    /// Row indices in position order.
    pub fn row_index_order(&self) -> Vec<usize> {
        self.rows.read().order().to_vec()
    }

    // =========================================================================
    // Reordering
    // =========================================================================

    /// Moves a column into the gap before `to_position`.
    pub fn reorder_column_position(&self, from_position: usize, to_position: usize) -> bool {
        self.multi_reorder(Orientation::Horizontal, &[from_position], to_position)
    }

    /// Moves a row into the gap before `to_position`.
    pub fn reorder_row_position(&self, from_position: usize, to_position: usize) -> bool {
        self.multi_reorder(Orientation::Vertical, &[from_position], to_position)
    }

    /// Moves columns as one block into the gap before `to_position`.
    pub fn multi_reorder_column_positions(&self, from_positions: &[usize], to_position: usize) -> bool {
        self.multi_reorder(Orientation::Horizontal, from_positions, to_position)
    }

    /// Moves rows as one block into the gap before `to_position`.
    pub fn multi_reorder_row_positions(&self, from_positions: &[usize], to_position: usize) -> bool {
        self.multi_reorder(Orientation::Vertical, from_positions, to_position)
    }

    /// Restores the column order of the underlying layer.
    pub fn reset_column_reordering(&self) {
        self.reset(Orientation::Horizontal);
    }

    /// Restores the row order of the underlying layer.
    pub fn reset_row_reordering(&self) {
        self.reset(Orientation::Vertical);
    }

    /// Moves `from_positions` (relative order kept) into the gap before `to_position`.
    ///
    /// Returns `false` without firing when nothing moves.
    fn multi_reorder(&self, orientation: Orientation, from_positions: &[usize], to_position: usize) -> bool {
        let event = {
            let mut order = self.order(orientation).write();
            let count = order.len();
            let mut from: Vec<usize> = from_positions.iter().copied().filter(|p| *p < count).collect();
            from.sort_unstable();
            from.dedup();
            if from.is_empty() {
                return false;
            }

            let to = to_position.min(count);
            let moved: Vec<usize> = from.iter().filter_map(|p| order.index(*p)).collect();
            let remaining: Vec<usize> = order
                .order()
                .iter()
                .enumerate()
                .filter(|(p, _)| from.binary_search(p).is_err())
                .map(|(_, i)| *i)
                .collect();
            let insert_at = (0..to).filter(|p| from.binary_search(p).is_err()).count();

            let mut reordered = Vec::with_capacity(count);
            reordered.extend_from_slice(&remaining[..insert_at]);
            reordered.extend_from_slice(&moved);
            reordered.extend_from_slice(&remaining[insert_at..]);
            if reordered == order.order() {
                tracing::trace!(target: targets::LAYER, ?orientation, ?from, to, "reorder is a no-op");
                return false;
            }
            order.set(reordered);

            let after: Vec<usize> = (insert_at..insert_at + moved.len()).collect();
            StructuralChangeEvent::from_positions(
                self.id(),
                orientation,
                StructuralKind::Reorder,
                &from,
                &after,
                moved,
            )
        };
        self.offsets(orientation).invalidate();

        tracing::debug!(target: targets::LAYER, ?orientation, ?from_positions, to_position, "reordered");
        if let Some(event) = event {
            self.fire_layer_event(event.into());
        }
        true
    }

    fn reset(&self, orientation: Orientation) {
        let natural = axis::indices(self.underlying.as_ref(), orientation);
        {
            let mut order = self.order(orientation).write();
            if order.order() == natural.as_slice() {
                return;
            }
            order.set(natural);
        }
        self.offsets(orientation).invalidate();
        tracing::debug!(target: targets::LAYER, ?orientation, "reordering reset");
        self.fire_layer_event(LayerEvent::StructuralRefresh { layer: self.id() });
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
            let mut order = self.order(orientation).write();
            let before = match event.kind {
                StructuralKind::Delete | StructuralKind::Hide => order.positions_of(&indices),
                _ => Vec::new(),
            };
            match event.kind {
                StructuralKind::Delete => order.apply_delete(&indices),
                StructuralKind::Insert => order.apply_insert(&indices),
                _ => {}
            }
            order.reconcile(&underlying);
            let after = match event.kind {
                StructuralKind::Insert | StructuralKind::Show => order.positions_of(&indices),
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
            self.order(orientation).write().reconcile(&underlying);
            self.offsets(orientation).invalidate();
        }
        self.fire_layer_event(LayerEvent::StructuralRefresh { layer: self.id() });
    }
}

impl LayerListener for ReorderLayer {
    fn handle_layer_event(&self, event: &LayerEvent) {
        match event {
            LayerEvent::Structural(structural) => match structural.kind {
                StructuralKind::Resize => {
                    self.offsets(structural.orientation).invalidate();
                    propagate_converted(self, event);
                }
                // Local order is kept in indices; the move below changes nothing here.
                StructuralKind::Reorder => {}
                _ => self.rebuild(structural),
            },
            LayerEvent::StructuralRefresh { .. } => self.refresh(),
            _ => propagate_converted(self, event),
        }
    }
}

impl Layer for ReorderLayer {
    fn base(&self) -> &LayerBase {
        &self.base
    }

    fn underlying(&self) -> Option<&Arc<dyn Layer>> {
        Some(&self.underlying)
    }

    // =========================================================================
    // Horizontal
    // =========================================================================

    fn column_count(&self) -> usize {
        self.columns.read().len()
    }

    fn column_index_by_position(&self, column_position: usize) -> Option<usize> {
        self.columns.read().index(column_position)
    }

    fn column_position_by_index(&self, column_index: usize) -> Option<usize> {
        self.columns.read().position(column_index)
    }

    fn local_to_underlying_column_position(&self, column_position: usize) -> Option<usize> {
        let index = self.column_index_by_position(column_position)?;
        self.underlying.column_position_by_index(index)
    }

    fn underlying_to_local_column_position(&self, _source: LayerId, column_position: usize) -> Option<usize> {
        let index = self.underlying.column_index_by_position(column_position)?;
        self.column_position_by_index(index)
    }

    fn start_x_of_column_position(&self, column_position: usize) -> Option<i32> {
        self.column_offsets
            .start_of(column_position, self.column_count(), |p| self.column_width_by_position(p))
    }

    fn column_position_by_x(&self, x: i32) -> Option<usize> {
        self.column_offsets
            .position_at(x, self.column_count(), |p| self.column_width_by_position(p))
    }

    // =========================================================================
    // Vertical
    // =========================================================================

    fn row_count(&self) -> usize {
        self.rows.read().len()
    }

    fn row_index_by_position(&self, row_position: usize) -> Option<usize> {
        self.rows.read().index(row_position)
    }

    fn row_position_by_index(&self, row_index: usize) -> Option<usize> {
        self.rows.read().position(row_index)
    }

    fn local_to_underlying_row_position(&self, row_position: usize) -> Option<usize> {
        let index = self.row_index_by_position(row_position)?;
        self.underlying.row_position_by_index(index)
    }

    fn underlying_to_local_row_position(&self, _source: LayerId, row_position: usize) -> Option<usize> {
        let index = self.underlying.row_index_by_position(row_position)?;
        self.row_position_by_index(index)
    }

    fn start_y_of_row_position(&self, row_position: usize) -> Option<i32> {
        self.row_offsets
            .start_of(row_position, self.row_count(), |p| self.row_height_by_position(p))
    }

    fn row_position_by_y(&self, y: i32) -> Option<usize> {
        self.row_offsets
            .position_at(y, self.row_count(), |p| self.row_height_by_position(p))
    }

    // =========================================================================
    // Commands
    // =========================================================================

    #[tracing::instrument(skip_all, target = "lattice_grid::command", level = "trace", fields(command = command.name()))]
    fn do_command(&self, command: &LayerCommand) -> bool {
        match command {
            LayerCommand::ReorderColumn { .. }
            | LayerCommand::ReorderRow { .. }
            | LayerCommand::MultiReorderColumns { .. }
            | LayerCommand::MultiReorderRows { .. } => {
                let Some(local) = command.convert_to_target_layer(self) else {
                    return forward_command(self, command);
                };
                match local {
                    LayerCommand::ReorderColumn {
                        from_position,
                        to_position,
                        ..
                    } => self.reorder_column_position(from_position, to_position),
                    LayerCommand::ReorderRow {
                        from_position,
                        to_position,
                        ..
                    } => self.reorder_row_position(from_position, to_position),
                    LayerCommand::MultiReorderColumns {
                        from_positions,
                        to_position,
                        ..
                    } => self.multi_reorder_column_positions(&from_positions, to_position),
                    LayerCommand::MultiReorderRows {
                        from_positions,
                        to_position,
                        ..
                    } => self.multi_reorder_row_positions(&from_positions, to_position),
                    _ => false,
                };
                true
            }
            LayerCommand::ResetColumnReordering => {
                self.reset_column_reordering();
                true
            }
            LayerCommand::ResetRowReordering => {
                self.reset_row_reordering();
                true
            }
            _ => forward_command(self, command),
        }
    }
}

static_assertions::assert_impl_all!(ReorderLayer: Send, Sync);
