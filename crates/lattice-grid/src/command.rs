//! Commands travelling down the layer stack.
//!
//! A command carries the layer whose frame its positions are expressed in.
//! A layer that wants to handle a command first converts it into its own frame
//! with [`LayerCommand::convert_to_target_layer`]; when that fails the layer
//! leaves the command alone and forwards it unchanged.

use std::fmt;
use std::sync::Arc;

use lattice_grid_core::Orientation;

use crate::data::CellValue;
use crate::layer::{Layer, LayerCell, SelectionModifiers, axis};

/// Measures cells for auto-resizing. Supplied by the host, which owns fonts.
pub trait CellMeasure: Send + Sync {
    /// Width the cell needs to show its content.
    fn preferred_width(&self, cell: &LayerCell) -> i32;
}

/// A command for the layer stack.
#[derive(Clone)]
#[non_exhaustive]
pub enum LayerCommand {
    // =========================================================================
    // Resize
    // =========================================================================
    /// Sets the width of one column.
    ResizeColumn {
        /// Frame of the position.
        layer: Arc<dyn Layer>,
        /// Column position.
        column_position: usize,
        /// New width in pixels.
        width: i32,
    },
    /// Sets the height of one row.
    ResizeRow {
        /// Frame of the position.
        layer: Arc<dyn Layer>,
        /// Row position.
        row_position: usize,
        /// New height in pixels.
        height: i32,
    },
    /// Sets the widths of several columns.
    MultiResizeColumns {
        /// Frame of the positions.
        layer: Arc<dyn Layer>,
        /// Column positions and their new widths.
        columns: Vec<(usize, i32)>,
    },
    /// Sets the heights of several rows.
    MultiResizeRows {
        /// Frame of the positions.
        layer: Arc<dyn Layer>,
        /// Row positions and their new heights.
        rows: Vec<(usize, i32)>,
    },

    // =========================================================================
    // Reorder
    // =========================================================================
    /// Moves one column. `to_position` is a gap in `[0, count]`.
    ReorderColumn {
        /// Frame of the positions.
        layer: Arc<dyn Layer>,
        /// Column to move.
        from_position: usize,
        /// Gap to drop it into.
        to_position: usize,
    },
    /// Moves one row. `to_position` is a gap in `[0, count]`.
    ReorderRow {
        /// Frame of the positions.
        layer: Arc<dyn Layer>,
        /// Row to move.
        from_position: usize,
        /// Gap to drop it into.
        to_position: usize,
    },
    /// Moves several columns as one block.
    MultiReorderColumns {
        /// Frame of the positions.
        layer: Arc<dyn Layer>,
        /// Columns to move.
        from_positions: Vec<usize>,
        /// Gap to drop them into.
        to_position: usize,
    },
    /// Moves several rows as one block.
    MultiReorderRows {
        /// Frame of the positions.
        layer: Arc<dyn Layer>,
        /// Rows to move.
        from_positions: Vec<usize>,
        /// Gap to drop them into.
        to_position: usize,
    },
    /// Restores the natural column order.
    ResetColumnReordering,
    /// Restores the natural row order.
    ResetRowReordering,

    // =========================================================================
    // Hide / Show
    // =========================================================================
    /// Hides columns.
    HideColumns {
        /// Frame of the positions.
        layer: Arc<dyn Layer>,
        /// Columns to hide.
        column_positions: Vec<usize>,
    },
    /// Hides rows.
    HideRows {
        /// Frame of the positions.
        layer: Arc<dyn Layer>,
        /// Rows to hide.
        row_positions: Vec<usize>,
    },
    /// Shows hidden columns by index.
    ShowColumnIndices {
        /// Column indices.
        column_indices: Vec<usize>,
    },
    /// Shows hidden rows by index.
    ShowRowIndices {
        /// Row indices.
        row_indices: Vec<usize>,
    },
    /// Shows every hidden column.
    ShowAllColumns,
    /// Shows every hidden row.
    ShowAllRows,

    // =========================================================================
    // Selection
    // =========================================================================
    /// Selects one cell.
    SelectCell {
        /// Frame of the positions.
        layer: Arc<dyn Layer>,
        /// Column position.
        column_position: usize,
        /// Row position.
        row_position: usize,
        /// Shift/ctrl state.
        modifiers: SelectionModifiers,
    },
    /// Selects a whole column.
    SelectColumn {
        /// Frame of the position.
        layer: Arc<dyn Layer>,
        /// Column position.
        column_position: usize,
        /// Shift/ctrl state.
        modifiers: SelectionModifiers,
    },
    /// Selects a whole row.
    SelectRow {
        /// Frame of the position.
        layer: Arc<dyn Layer>,
        /// Row position.
        row_position: usize,
        /// Shift/ctrl state.
        modifiers: SelectionModifiers,
    },
    /// Selects everything.
    SelectAll,
    /// Clears the selection.
    ClearSelection,

    // =========================================================================
    // Viewport
    // =========================================================================
    /// Makes viewports expose their whole underlying extent.
    TurnViewportOff,
    /// Restores scrolling after [`LayerCommand::TurnViewportOff`].
    TurnViewportOn,
    /// The host's client area changed size.
    ClientAreaResize {
        /// Width in pixels.
        width: i32,
        /// Height in pixels.
        height: i32,
    },
    /// Scrolls the cell into view.
    ShowCellInViewport {
        /// Frame of the positions.
        layer: Arc<dyn Layer>,
        /// Column position.
        column_position: usize,
        /// Row position.
        row_position: usize,
    },
    /// Scrolls the column into view.
    ShowColumnInViewport {
        /// Frame of the position.
        layer: Arc<dyn Layer>,
        /// Column position.
        column_position: usize,
    },
    /// Scrolls the row into view.
    ShowRowInViewport {
        /// Frame of the position.
        layer: Arc<dyn Layer>,
        /// Row position.
        row_position: usize,
    },

    // =========================================================================
    // Freeze
    // =========================================================================
    /// Freezes the columns up to and including a position.
    FreezeColumn {
        /// Frame of the position.
        layer: Arc<dyn Layer>,
        /// Last frozen column.
        column_position: usize,
    },
    /// Freezes the rows up to and including a position.
    FreezeRow {
        /// Frame of the position.
        layer: Arc<dyn Layer>,
        /// Last frozen row.
        row_position: usize,
    },
    /// Freezes the columns and rows up to and including a cell.
    FreezePosition {
        /// Frame of the positions.
        layer: Arc<dyn Layer>,
        /// Last frozen column.
        column_position: usize,
        /// Last frozen row.
        row_position: usize,
    },
    /// Freezes up to the last selected cell.
    FreezeSelection,
    /// Removes any freeze.
    Unfreeze,

    // =========================================================================
    // Other
    // =========================================================================
    /// Asks every layer to rebuild its derived state.
    StructuralRefresh,
    /// Asks for a repaint.
    VisualRefresh,
    /// Writes a value through to the data provider.
    UpdateData {
        /// Frame of the positions.
        layer: Arc<dyn Layer>,
        /// Column position.
        column_position: usize,
        /// Row position.
        row_position: usize,
        /// New value.
        value: CellValue,
    },
    /// Resizes columns to the widest cell of each.
    AutoResizeColumns {
        /// Frame of the positions.
        layer: Arc<dyn Layer>,
        /// Columns to resize.
        column_positions: Vec<usize>,
        /// Host measurement hook.
        measure: Arc<dyn CellMeasure>,
    },
    /// Releases listeners all the way down the stack.
    Dispose,
}

impl LayerCommand {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            LayerCommand::ResizeColumn { .. } => "ResizeColumn",
            LayerCommand::ResizeRow { .. } => "ResizeRow",
            LayerCommand::MultiResizeColumns { .. } => "MultiResizeColumns",
            LayerCommand::MultiResizeRows { .. } => "MultiResizeRows",
            LayerCommand::ReorderColumn { .. } => "ReorderColumn",
            LayerCommand::ReorderRow { .. } => "ReorderRow",
            LayerCommand::MultiReorderColumns { .. } => "MultiReorderColumns",
            LayerCommand::MultiReorderRows { .. } => "MultiReorderRows",
            LayerCommand::ResetColumnReordering => "ResetColumnReordering",
            LayerCommand::ResetRowReordering => "ResetRowReordering",
            LayerCommand::HideColumns { .. } => "HideColumns",
            LayerCommand::HideRows { .. } => "HideRows",
            LayerCommand::ShowColumnIndices { .. } => "ShowColumnIndices",
            LayerCommand::ShowRowIndices { .. } => "ShowRowIndices",
            LayerCommand::ShowAllColumns => "ShowAllColumns",
            LayerCommand::ShowAllRows => "ShowAllRows",
            LayerCommand::SelectCell { .. } => "SelectCell",
            LayerCommand::SelectColumn { .. } => "SelectColumn",
            LayerCommand::SelectRow { .. } => "SelectRow",
            LayerCommand::SelectAll => "SelectAll",
            LayerCommand::ClearSelection => "ClearSelection",
            LayerCommand::TurnViewportOff => "TurnViewportOff",
            LayerCommand::TurnViewportOn => "TurnViewportOn",
            LayerCommand::ClientAreaResize { .. } => "ClientAreaResize",
            LayerCommand::ShowCellInViewport { .. } => "ShowCellInViewport",
            LayerCommand::ShowColumnInViewport { .. } => "ShowColumnInViewport",
            LayerCommand::ShowRowInViewport { .. } => "ShowRowInViewport",
            LayerCommand::FreezeColumn { .. } => "FreezeColumn",
            LayerCommand::FreezeRow { .. } => "FreezeRow",
            LayerCommand::FreezePosition { .. } => "FreezePosition",
            LayerCommand::FreezeSelection => "FreezeSelection",
            LayerCommand::Unfreeze => "Unfreeze",
            LayerCommand::StructuralRefresh => "StructuralRefresh",
            LayerCommand::VisualRefresh => "VisualRefresh",
            LayerCommand::UpdateData { .. } => "UpdateData",
            LayerCommand::AutoResizeColumns { .. } => "AutoResizeColumns",
            LayerCommand::Dispose => "Dispose",
        }
    }

    /// The layer whose frame the command's positions are expressed in.
    ///
    /// `None` for commands without positions.
    pub fn origin(&self) -> Option<&Arc<dyn Layer>> {
        match self {
            LayerCommand::ResizeColumn { layer, .. }
            | LayerCommand::ResizeRow { layer, .. }
            | LayerCommand::MultiResizeColumns { layer, .. }
            | LayerCommand::MultiResizeRows { layer, .. }
            | LayerCommand::ReorderColumn { layer, .. }
            | LayerCommand::ReorderRow { layer, .. }
            | LayerCommand::MultiReorderColumns { layer, .. }
            | LayerCommand::MultiReorderRows { layer, .. }
            | LayerCommand::HideColumns { layer, .. }
            | LayerCommand::HideRows { layer, .. }
            | LayerCommand::SelectCell { layer, .. }
            | LayerCommand::SelectColumn { layer, .. }
            | LayerCommand::SelectRow { layer, .. }
            | LayerCommand::ShowCellInViewport { layer, .. }
            | LayerCommand::ShowColumnInViewport { layer, .. }
            | LayerCommand::ShowRowInViewport { layer, .. }
            | LayerCommand::FreezeColumn { layer, .. }
            | LayerCommand::FreezeRow { layer, .. }
            | LayerCommand::FreezePosition { layer, .. }
            | LayerCommand::UpdateData { layer, .. }
            | LayerCommand::AutoResizeColumns { layer, .. } => Some(layer),
            _ => None,
        }
    }

    /// Rewrites the command's positions into `target`'s frame.
    ///
    /// The walk starts at the origin layer and follows the position down the
    /// stack until it reaches `target`. Returns `None` if `target` is not below
    /// the origin or a position vanishes on the way. Multi-position commands
    /// drop vanished positions and fail only when none survive. Commands
    /// without positions convert to themselves.
    pub fn convert_to_target_layer(&self, target: &dyn Layer) -> Option<LayerCommand> {
        let Some(origin) = self.origin() else {
            return Some(self.clone());
        };
        if origin.id() == target.id() {
            return Some(self.clone());
        }

        let layer = target.base().this()?;
        let column = |p| convert_position(origin, target, Orientation::Horizontal, p);
        let row = |p| convert_position(origin, target, Orientation::Vertical, p);
        let column_gap = |p| convert_gap(origin, target, Orientation::Horizontal, p);
        let row_gap = |p| convert_gap(origin, target, Orientation::Vertical, p);

        let converted = match self {
            LayerCommand::ResizeColumn {
                column_position,
                width,
                ..
            } => LayerCommand::ResizeColumn {
                layer,
                column_position: column(*column_position)?,
                width: *width,
            },
            LayerCommand::ResizeRow {
                row_position,
                height,
                ..
            } => LayerCommand::ResizeRow {
                layer,
                row_position: row(*row_position)?,
                height: *height,
            },
            LayerCommand::MultiResizeColumns { columns, .. } => LayerCommand::MultiResizeColumns {
                layer,
                columns: non_empty(
                    columns
                        .iter()
                        .filter_map(|(p, width)| Some((column(*p)?, *width)))
                        .collect(),
                )?,
            },
            LayerCommand::MultiResizeRows { rows, .. } => LayerCommand::MultiResizeRows {
                layer,
                rows: non_empty(
                    rows.iter()
                        .filter_map(|(p, height)| Some((row(*p)?, *height)))
                        .collect(),
                )?,
            },
            LayerCommand::ReorderColumn {
                from_position,
                to_position,
                ..
            } => LayerCommand::ReorderColumn {
                layer,
                from_position: column(*from_position)?,
                to_position: column_gap(*to_position)?,
            },
            LayerCommand::ReorderRow {
                from_position,
                to_position,
                ..
            } => LayerCommand::ReorderRow {
                layer,
                from_position: row(*from_position)?,
                to_position: row_gap(*to_position)?,
            },
            LayerCommand::MultiReorderColumns {
                from_positions,
                to_position,
                ..
            } => LayerCommand::MultiReorderColumns {
                layer,
                from_positions: non_empty(from_positions.iter().filter_map(|p| column(*p)).collect())?,
                to_position: column_gap(*to_position)?,
            },
            LayerCommand::MultiReorderRows {
                from_positions,
                to_position,
                ..
            } => LayerCommand::MultiReorderRows {
                layer,
                from_positions: non_empty(from_positions.iter().filter_map(|p| row(*p)).collect())?,
                to_position: row_gap(*to_position)?,
            },
            LayerCommand::HideColumns {
                column_positions, ..
            } => LayerCommand::HideColumns {
                layer,
                column_positions: non_empty(
                    column_positions.iter().filter_map(|p| column(*p)).collect(),
                )?,
            },
            LayerCommand::HideRows { row_positions, .. } => LayerCommand::HideRows {
                layer,
                row_positions: non_empty(row_positions.iter().filter_map(|p| row(*p)).collect())?,
            },
            LayerCommand::SelectCell {
                column_position,
                row_position,
                modifiers,
                ..
            } => LayerCommand::SelectCell {
                layer,
                column_position: column(*column_position)?,
                row_position: row(*row_position)?,
                modifiers: *modifiers,
            },
            LayerCommand::SelectColumn {
                column_position,
                modifiers,
                ..
            } => LayerCommand::SelectColumn {
                layer,
                column_position: column(*column_position)?,
                modifiers: *modifiers,
            },
            LayerCommand::SelectRow {
                row_position,
                modifiers,
                ..
            } => LayerCommand::SelectRow {
                layer,
                row_position: row(*row_position)?,
                modifiers: *modifiers,
            },
            LayerCommand::ShowCellInViewport {
                column_position,
                row_position,
                ..
            } => LayerCommand::ShowCellInViewport {
                layer,
                column_position: column(*column_position)?,
                row_position: row(*row_position)?,
            },
            LayerCommand::ShowColumnInViewport {
                column_position, ..
            } => LayerCommand::ShowColumnInViewport {
                layer,
                column_position: column(*column_position)?,
            },
            LayerCommand::ShowRowInViewport { row_position, .. } => {
                LayerCommand::ShowRowInViewport {
                    layer,
                    row_position: row(*row_position)?,
                }
            }
            LayerCommand::FreezeColumn {
                column_position, ..
            } => LayerCommand::FreezeColumn {
                layer,
                column_position: column(*column_position)?,
            },
            LayerCommand::FreezeRow { row_position, .. } => LayerCommand::FreezeRow {
                layer,
                row_position: row(*row_position)?,
            },
            LayerCommand::FreezePosition {
                column_position,
                row_position,
                ..
            } => LayerCommand::FreezePosition {
                layer,
                column_position: column(*column_position)?,
                row_position: row(*row_position)?,
            },
            LayerCommand::UpdateData {
                column_position,
                row_position,
                value,
                ..
            } => LayerCommand::UpdateData {
                layer,
                column_position: column(*column_position)?,
                row_position: row(*row_position)?,
                value: value.clone(),
            },
            LayerCommand::AutoResizeColumns {
                column_positions,
                measure,
                ..
            } => LayerCommand::AutoResizeColumns {
                layer,
                column_positions: non_empty(
                    column_positions.iter().filter_map(|p| column(*p)).collect(),
                )?,
                measure: measure.clone(),
            },
            other => other.clone(),
        };
        Some(converted)
    }
}

/// Follows `position` from `layer` down to `target`.
fn convert_position(
    layer: &Arc<dyn Layer>,
    target: &dyn Layer,
    orientation: Orientation,
    position: usize,
) -> Option<usize> {
    if layer.id() == target.id() {
        return Some(position);
    }
    let underlying_position = axis::local_to_underlying(layer.as_ref(), orientation, position)?;
    axis::underlying_layers_by_position(layer.as_ref(), orientation, position)
        .iter()
        .find_map(|underlying| convert_position(underlying, target, orientation, underlying_position))
}

/// Converts a drop gap; the gap after the last position follows the last position.
fn convert_gap(
    layer: &Arc<dyn Layer>,
    target: &dyn Layer,
    orientation: Orientation,
    gap: usize,
) -> Option<usize> {
    let count = axis::count(layer.as_ref(), orientation);
    if gap < count {
        convert_position(layer, target, orientation, gap)
    } else {
        let last = count.checked_sub(1)?;
        convert_position(layer, target, orientation, last).map(|p| p + 1)
    }
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}

impl fmt::Debug for LayerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct(self.name());
        if let Some(layer) = self.origin() {
            debug.field("layer", &layer.id());
        }
        match self {
            LayerCommand::ResizeColumn {
                column_position,
                width,
                ..
            } => debug.field("column_position", column_position).field("width", width),
            LayerCommand::ResizeRow {
                row_position,
                height,
                ..
            } => debug.field("row_position", row_position).field("height", height),
            LayerCommand::MultiResizeColumns { columns, .. } => debug.field("columns", columns),
            LayerCommand::MultiResizeRows { rows, .. } => debug.field("rows", rows),
            LayerCommand::ReorderColumn {
                from_position,
                to_position,
                ..
            }
            | LayerCommand::ReorderRow {
                from_position,
                to_position,
                ..
            } => debug
                .field("from_position", from_position)
                .field("to_position", to_position),
            LayerCommand::MultiReorderColumns {
                from_positions,
                to_position,
                ..
            }
            | LayerCommand::MultiReorderRows {
                from_positions,
                to_position,
                ..
            } => debug
                .field("from_positions", from_positions)
                .field("to_position", to_position),
            LayerCommand::HideColumns {
                column_positions, ..
            }
            | LayerCommand::AutoResizeColumns {
                column_positions, ..
            } => debug.field("column_positions", column_positions),
            LayerCommand::HideRows { row_positions, .. } => debug.field("row_positions", row_positions),
            LayerCommand::ShowColumnIndices { column_indices } => {
                debug.field("column_indices", column_indices)
            }
            LayerCommand::ShowRowIndices { row_indices } => debug.field("row_indices", row_indices),
            LayerCommand::SelectCell {
                column_position,
                row_position,
                modifiers,
                ..
            } => debug
                .field("column_position", column_position)
                .field("row_position", row_position)
                .field("modifiers", modifiers),
            LayerCommand::SelectColumn {
                column_position,
                modifiers,
                ..
            } => debug
                .field("column_position", column_position)
                .field("modifiers", modifiers),
            LayerCommand::SelectRow {
                row_position,
                modifiers,
                ..
            } => debug
                .field("row_position", row_position)
                .field("modifiers", modifiers),
            LayerCommand::ClientAreaResize { width, height } => {
                debug.field("width", width).field("height", height)
            }
            LayerCommand::ShowCellInViewport {
                column_position,
                row_position,
                ..
            }
            | LayerCommand::FreezePosition {
                column_position,
                row_position,
                ..
            } => debug
                .field("column_position", column_position)
                .field("row_position", row_position),
            LayerCommand::ShowColumnInViewport {
                column_position, ..
            }
            | LayerCommand::FreezeColumn {
                column_position, ..
            } => debug.field("column_position", column_position),
            LayerCommand::ShowRowInViewport { row_position, .. }
            | LayerCommand::FreezeRow { row_position, .. } => debug.field("row_position", row_position),
            LayerCommand::UpdateData {
                column_position,
                row_position,
                value,
                ..
            } => debug
                .field("column_position", column_position)
                .field("row_position", row_position)
                .field("value", value),
            _ => &mut debug,
        };
        debug.finish()
    }
}
