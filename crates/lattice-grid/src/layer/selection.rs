//! Selection state as a layer of the stack.
//!
//! Selection is stored by index, so it follows columns and rows through
//! reordering and scrolling without any bookkeeping. Structural changes
//! below only matter when they renumber or hide indices.
//!
//! # Example
//!
//! ```ignore
//! use lattice_grid::layer::{SelectionLayer, SelectionModifiers};
//!
//! selection.select_cell(2, 3, SelectionModifiers::NONE);
//! selection.select_cell(4, 5, SelectionModifiers::SHIFT);
//! assert!(selection.is_cell_position_selected(3, 4));
//! ```

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Weak};

use lattice_grid_core::logging::targets;
use lattice_grid_core::{Orientation, ranges_from_positions};
use parking_lot::RwLock;

use super::reorder::{shift_for_delete, shift_for_insert};
use super::{
    DisplayMode, Layer, LayerBase, LayerListener, accumulated_labels, axis, forward_command,
    propagate_converted, underlying_display_mode,
};
use crate::command::LayerCommand;
use crate::event::{LayerEvent, StructuralKind};
use crate::label::{LabelStack, SELECTION_ANCHOR};

/// Keyboard modifiers of a selection gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SelectionModifiers {
    /// Extend from the anchor.
    pub shift: bool,
    /// Add to or toggle within the existing selection.
    pub ctrl: bool,
}

impl SelectionModifiers {
    /// Replace the selection.
    pub const NONE: Self = Self::empty();

    /// Extend from the anchor, replacing the rest.
    pub const SHIFT: Self = Self {
        shift: true,
        ..Self::empty()
    };

    /// Toggle without touching the rest.
    pub const CTRL: Self = Self {
        ctrl: true,
        ..Self::empty()
    };

    /// Extend from the anchor, keeping the rest.
    pub const SHIFT_CTRL: Self = Self {
        shift: true,
        ctrl: true,
    };

    const fn empty() -> Self {
        Self {
            shift: false,
            ctrl: false,
        }
    }

    /// Creates modifiers with shift set.
    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    /// Creates modifiers with ctrl set.
    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }
}

/// Selected cells, columns and rows, all by index.
#[derive(Debug, Default)]
struct SelectionState {
    cells: HashSet<(usize, usize)>,
    columns: BTreeSet<usize>,
    rows: BTreeSet<usize>,
    all: bool,
    anchor: Option<(usize, usize)>,
    last_selected: Option<(usize, usize)>,
}

impl SelectionState {
    fn clear(&mut self) {
        self.cells.clear();
        self.columns.clear();
        self.rows.clear();
        self.all = false;
    }

    fn is_empty(&self) -> bool {
        !self.all && self.cells.is_empty() && self.columns.is_empty() && self.rows.is_empty()
    }

    fn contains(&self, column_index: usize, row_index: usize) -> bool {
        self.all
            || self.columns.contains(&column_index)
            || self.rows.contains(&row_index)
            || self.cells.contains(&(column_index, row_index))
    }

    fn touches_column(&self, column_index: usize) -> bool {
        self.all
            || self.columns.contains(&column_index)
            || !self.rows.is_empty()
            || self.cells.iter().any(|(c, _)| *c == column_index)
    }

    fn touches_row(&self, row_index: usize) -> bool {
        self.all
            || self.rows.contains(&row_index)
            || !self.columns.is_empty()
            || self.cells.iter().any(|(_, r)| *r == row_index)
    }

    /// Applies a renumbering of one axis; `None` drops the index.
    fn remap(&mut self, orientation: Orientation, map: impl Fn(usize) -> Option<usize>) {
        let pick = |cell: (usize, usize)| match orientation {
            Orientation::Horizontal => map(cell.0).map(|c| (c, cell.1)),
            Orientation::Vertical => map(cell.1).map(|r| (cell.0, r)),
        };
        self.cells = self.cells.iter().filter_map(|cell| pick(*cell)).collect();
        self.anchor = self.anchor.and_then(pick);
        self.last_selected = self.last_selected.and_then(pick);
        let line = match orientation {
            Orientation::Horizontal => &mut self.columns,
            Orientation::Vertical => &mut self.rows,
        };
        *line = line.iter().filter_map(|index| map(*index)).collect();
    }
}

/// Tracks what is selected and marks it for painting.
pub struct SelectionLayer {
    base: LayerBase,
    underlying: Arc<dyn Layer>,
    state: RwLock<SelectionState>,
}

impl SelectionLayer {
    /// Wraps `underlying` with an empty selection.
    pub fn new(underlying: Arc<dyn Layer>) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| {
            underlying.add_layer_listener(this.clone());
            Self {
                base: LayerBase::new(this.clone()),
                underlying,
                state: RwLock::new(SelectionState::default()),
            }
        })
    }

    fn cell_indices(&self, column_position: usize, row_position: usize) -> Option<(usize, usize)> {
        Some((
            self.column_index_by_position(column_position)?,
            self.row_index_by_position(row_position)?,
        ))
    }

    fn cell_positions(&self, cell: (usize, usize)) -> Option<(usize, usize)> {
        Some((
            self.column_position_by_index(cell.0)?,
            self.row_position_by_index(cell.1)?,
        ))
    }

    // =========================================================================
    // Selecting
    // =========================================================================

    /// Selects a cell.
    pub fn select_cell(&self, column_position: usize, row_position: usize, modifiers: SelectionModifiers) {
        let Some(cell) = self.cell_indices(column_position, row_position) else {
            return;
        };
        let anchor = self.state.read().anchor.and_then(|a| self.cell_positions(a));
        let range: Vec<(usize, usize)> = match (modifiers.shift, anchor) {
            (true, Some((anchor_column, anchor_row))) => {
                let columns = anchor_column.min(column_position)..=anchor_column.max(column_position);
                let rows = anchor_row.min(row_position)..=anchor_row.max(row_position);
                columns
                    .flat_map(|c| rows.clone().map(move |r| (c, r)))
                    .filter_map(|(c, r)| self.cell_indices(c, r))
                    .collect()
            }
            _ => vec![cell],
        };

        {
            let mut state = self.state.write();
            if modifiers.shift {
                if !modifiers.ctrl {
                    state.clear();
                }
                state.cells.extend(range);
                if state.anchor.is_none() {
                    state.anchor = Some(cell);
                }
            } else if modifiers.ctrl {
                if state.contains(cell.0, cell.1) {
                    state.cells.remove(&cell);
                } else {
                    state.cells.insert(cell);
                }
                state.anchor = Some(cell);
            } else {
                state.clear();
                state.cells.insert(cell);
                state.anchor = Some(cell);
            }
            state.last_selected = Some(cell);
        }

        tracing::debug!(target: targets::SELECTION, column_position, row_position, ?modifiers, "cell selected");
        self.fire_layer_event(LayerEvent::CellSelection {
            layer: self.id(),
            column_position,
            row_position,
        });
    }

    /// Selects a whole column.
    pub fn select_column(&self, column_position: usize, modifiers: SelectionModifiers) {
        self.select_line(Orientation::Horizontal, column_position, modifiers);
    }

    /// Selects a whole row.
    pub fn select_row(&self, row_position: usize, modifiers: SelectionModifiers) {
        self.select_line(Orientation::Vertical, row_position, modifiers);
    }

    fn select_line(&self, orientation: Orientation, position: usize, modifiers: SelectionModifiers) {
        let Some(index) = axis::index_by_position(self, orientation, position) else {
            return;
        };
        let cross = orientation.flip();
        let anchor_position = self
            .state
            .read()
            .anchor
            .and_then(|a| self.cell_positions(a))
            .map(|(c, r)| match orientation {
                Orientation::Horizontal => c,
                Orientation::Vertical => r,
            });
        let positions: Vec<usize> = match (modifiers.shift, anchor_position) {
            (true, Some(anchor)) => (anchor.min(position)..=anchor.max(position)).collect(),
            _ => vec![position],
        };
        let indices: Vec<usize> = positions
            .iter()
            .filter_map(|p| axis::index_by_position(self, orientation, *p))
            .collect();
        let anchor_cell = axis::index_by_position(self, cross, 0).map(|cross_index| match orientation {
            Orientation::Horizontal => (index, cross_index),
            Orientation::Vertical => (cross_index, index),
        });

        {
            let mut state = self.state.write();
            let toggle_off = modifiers.ctrl
                && !modifiers.shift
                && match orientation {
                    Orientation::Horizontal => state.columns.contains(&index),
                    Orientation::Vertical => state.rows.contains(&index),
                };
            if !modifiers.ctrl {
                state.clear();
            }
            let line = match orientation {
                Orientation::Horizontal => &mut state.columns,
                Orientation::Vertical => &mut state.rows,
            };
            if toggle_off {
                line.remove(&index);
            } else {
                line.extend(indices);
            }
            if !modifiers.shift || state.anchor.is_none() {
                state.anchor = anchor_cell;
            }
            state.last_selected = anchor_cell;
        }

        let ranges = ranges_from_positions(positions);
        tracing::debug!(target: targets::SELECTION, ?orientation, position, ?modifiers, "line selected");
        let event = match orientation {
            Orientation::Horizontal => LayerEvent::ColumnSelection {
                layer: self.id(),
                ranges,
            },
            Orientation::Vertical => LayerEvent::RowSelection {
                layer: self.id(),
                ranges,
            },
        };
        self.fire_layer_event(event);
    }

    /// Selects every cell.
    pub fn select_all(&self) {
        {
            let mut state = self.state.write();
            state.all = true;
            let first = self.cell_indices(0, 0);
            state.anchor = first;
            state.last_selected = self
                .column_count()
                .checked_sub(1)
                .zip(self.row_count().checked_sub(1))
                .and_then(|(c, r)| self.cell_indices(c, r));
        }
        self.fire_layer_event(LayerEvent::VisualRefresh { layer: self.id() });
    }

    /// Clears the selection and the anchor.
    pub fn clear(&self) {
        {
            let mut state = self.state.write();
            if state.is_empty() && state.anchor.is_none() {
                return;
            }
            state.clear();
            state.anchor = None;
            state.last_selected = None;
        }
        tracing::debug!(target: targets::SELECTION, "selection cleared");
        self.fire_layer_event(LayerEvent::VisualRefresh { layer: self.id() });
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Whether nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.state.read().is_empty()
    }

    /// Whether the cell is selected.
    pub fn is_cell_position_selected(&self, column_position: usize, row_position: usize) -> bool {
        self.cell_indices(column_position, row_position)
            .is_some_and(|(c, r)| self.state.read().contains(c, r))
    }

    /// Whether any cell of the column is selected.
    pub fn is_column_position_selected(&self, column_position: usize) -> bool {
        self.column_index_by_position(column_position)
            .is_some_and(|c| self.is_column_index_selected(c))
    }

    /// Whether any cell of the row is selected.
    pub fn is_row_position_selected(&self, row_position: usize) -> bool {
        self.row_index_by_position(row_position)
            .is_some_and(|r| self.is_row_index_selected(r))
    }

    /// Whether any cell of the column index is selected.
    pub fn is_column_index_selected(&self, column_index: usize) -> bool {
        self.state.read().touches_column(column_index)
    }

    /// Whether any cell of the row index is selected.
    pub fn is_row_index_selected(&self, row_index: usize) -> bool {
        self.state.read().touches_row(row_index)
    }

    /// Whether every cell of the column is selected.
    pub fn is_column_position_fully_selected(&self, column_position: usize) -> bool {
        (0..self.row_count()).all(|r| self.is_cell_position_selected(column_position, r))
            && self.row_count() > 0
    }

    /// Whether every cell of the row is selected.
    pub fn is_row_position_fully_selected(&self, row_position: usize) -> bool {
        (0..self.column_count()).all(|c| self.is_cell_position_selected(c, row_position))
            && self.column_count() > 0
    }

    /// Positions of columns selected as a whole.
    pub fn fully_selected_column_positions(&self) -> Vec<usize> {
        let state = self.state.read();
        if state.all {
            return (0..self.column_count()).collect();
        }
        let mut positions: Vec<usize> = state
            .columns
            .iter()
            .filter_map(|c| self.column_position_by_index(*c))
            .collect();
        positions.sort_unstable();
        positions
    }

    /// Positions of rows selected as a whole.
    pub fn fully_selected_row_positions(&self) -> Vec<usize> {
        let state = self.state.read();
        if state.all {
            return (0..self.row_count()).collect();
        }
        let mut positions: Vec<usize> = state
            .rows
            .iter()
            .filter_map(|r| self.row_position_by_index(*r))
            .collect();
        positions.sort_unstable();
        positions
    }

    /// Position of the selection anchor, if visible.
    pub fn anchor_position(&self) -> Option<(usize, usize)> {
        let anchor = self.state.read().anchor?;
        self.cell_positions(anchor)
    }

    /// Position of the most recently selected cell, if visible.
    pub fn last_selected_position(&self) -> Option<(usize, usize)> {
        let last = self.state.read().last_selected?;
        self.cell_positions(last)
    }
}

impl LayerListener for SelectionLayer {
    fn handle_layer_event(&self, event: &LayerEvent) {
        if let LayerEvent::Structural(structural) = event {
            let mut indices = structural.indices.clone();
            indices.sort_unstable();
            indices.dedup();
            let mut state = self.state.write();
            match structural.kind {
                StructuralKind::Delete => {
                    state.remap(structural.orientation, |i| shift_for_delete(i, &indices));
                }
                StructuralKind::Insert => {
                    state.remap(structural.orientation, |i| Some(shift_for_insert(i, &indices)));
                }
                StructuralKind::Hide => {
                    state.remap(structural.orientation, |i| {
                        indices.binary_search(&i).is_err().then_some(i)
                    });
                }
                _ => {}
            }
        }
        propagate_converted(self, event);
    }
}

impl Layer for SelectionLayer {
    fn base(&self) -> &LayerBase {
        &self.base
    }

    fn underlying(&self) -> Option<&Arc<dyn Layer>> {
        Some(&self.underlying)
    }

    #[tracing::instrument(skip_all, target = "lattice_grid::command", level = "trace", fields(command = command.name()))]
    fn do_command(&self, command: &LayerCommand) -> bool {
        match command {
            LayerCommand::SelectCell { .. } | LayerCommand::SelectColumn { .. } | LayerCommand::SelectRow { .. } => {
                match command.convert_to_target_layer(self) {
                    Some(LayerCommand::SelectCell {
                        column_position,
                        row_position,
                        modifiers,
                        ..
                    }) => self.select_cell(column_position, row_position, modifiers),
                    Some(LayerCommand::SelectColumn {
                        column_position,
                        modifiers,
                        ..
                    }) => self.select_column(column_position, modifiers),
                    Some(LayerCommand::SelectRow {
                        row_position,
                        modifiers,
                        ..
                    }) => self.select_row(row_position, modifiers),
                    _ => return forward_command(self, command),
                }
                true
            }
            LayerCommand::SelectAll => {
                self.select_all();
                true
            }
            LayerCommand::ClearSelection => {
                self.clear();
                true
            }
            _ => forward_command(self, command),
        }
    }

    fn config_labels_by_position(&self, column_position: usize, row_position: usize) -> LabelStack {
        let mut labels = accumulated_labels(self, column_position, row_position);
        if self.anchor_position() == Some((column_position, row_position)) {
            labels.add_label_on_top(SELECTION_ANCHOR);
        }
        labels
    }

    fn display_mode_by_position(&self, column_position: usize, row_position: usize) -> DisplayMode {
        if self.is_cell_position_selected(column_position, row_position) {
            DisplayMode::Select
        } else {
            underlying_display_mode(self, column_position, row_position)
        }
    }
}

static_assertions::assert_impl_all!(SelectionLayer: Send, Sync);
