//! Events travelling up the layer stack.
//!
//! A layer fires an event in its own frame. Every wrapping layer gets a chance
//! to translate it into its frame with [`LayerEvent::convert_to_local`]; an
//! event that no longer addresses anything in that frame is swallowed there.

use lattice_grid_core::{
    DiffType, LayerId, Orientation, Range, Rectangle, StructuralDiff, ranges_from_positions,
};

use crate::layer::{Layer, axis};

/// What kind of structural change happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructuralKind {
    /// Sizes changed; positions stayed.
    Resize,
    /// Positions moved.
    Reorder,
    /// Positions were hidden.
    Hide,
    /// Positions were revealed.
    Show,
    /// Positions were inserted into the data.
    Insert,
    /// Positions were removed from the data.
    Delete,
}

/// A change of the position space along one axis.
///
/// `ranges` are the affected positions; `diffs` map them from the frame before
/// the change to the frame after it. `indices` are the affected indices and
/// stay valid in every frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralChangeEvent {
    /// Frame of `ranges` and `diffs`.
    pub layer: LayerId,
    /// Axis that changed.
    pub orientation: Orientation,
    /// Kind of change.
    pub kind: StructuralKind,
    /// Affected positions.
    pub ranges: Vec<Range>,
    /// Before/after mapping.
    pub diffs: Vec<StructuralDiff>,
    /// Affected indices.
    pub indices: Vec<usize>,
}

impl StructuralChangeEvent {
    /// Builds an event from the affected positions before and after the change.
    ///
    /// Deletions and hides are described by `before`, insertions and shows by
    /// `after`, reorders by both. Resizes report `Change` diffs on both axes.
    /// Returns `None` when the change is empty.
    pub fn from_positions(
        layer: LayerId,
        orientation: Orientation,
        kind: StructuralKind,
        before: &[usize],
        after: &[usize],
        indices: Vec<usize>,
    ) -> Option<Self> {
        let before = ranges_from_positions(before.iter().copied());
        let after = ranges_from_positions(after.iter().copied());

        let (ranges, diffs): (Vec<Range>, Vec<StructuralDiff>) = match kind {
            StructuralKind::Delete | StructuralKind::Hide => {
                let diffs = before.iter().copied().map(StructuralDiff::delete).collect();
                (before, diffs)
            }
            StructuralKind::Insert | StructuralKind::Show => {
                let diffs = after.iter().copied().map(StructuralDiff::add).collect();
                (after, diffs)
            }
            StructuralKind::Reorder => {
                let diffs = before
                    .iter()
                    .copied()
                    .map(StructuralDiff::delete)
                    .chain(after.iter().copied().map(StructuralDiff::add))
                    .collect();
                (Range::normalize(before.into_iter().chain(after)), diffs)
            }
            StructuralKind::Resize => {
                let ranges = Range::normalize(before.into_iter().chain(after));
                let diffs = ranges.iter().copied().map(StructuralDiff::change).collect();
                (ranges, diffs)
            }
        };

        if diffs.is_empty() {
            return None;
        }
        Some(Self {
            layer,
            orientation,
            kind,
            ranges,
            diffs,
            indices,
        })
    }

    /// Builds a resize event for the given positions.
    pub fn resize(
        layer: LayerId,
        orientation: Orientation,
        positions: &[usize],
        indices: Vec<usize>,
    ) -> Option<Self> {
        Self::from_positions(layer, orientation, StructuralKind::Resize, positions, positions, indices)
    }

    /// Whether the change moved positions (anything but a resize).
    pub fn changes_positions(&self) -> bool {
        self.kind != StructuralKind::Resize
    }

    fn convert_to_local(&mut self, layer: &dyn Layer) -> bool {
        let source = self.layer;
        let orientation = self.orientation;
        self.convert_with(layer, |range| {
            axis::underlying_to_local_ranges(layer, orientation, source, &[range])
        })
    }

    /// Translates the event into `layer`'s frame, resolving deleted and hidden
    /// positions with `removed` instead of `layer`'s current state.
    ///
    /// Removed positions are given in the frame before the change, so a layer
    /// whose window moved or shrank with the change maps them against the
    /// window it had before. Added and changed positions still go through
    /// `layer`. Returns `false` if nothing survives the conversion.
    pub fn convert_to_local_with(
        &mut self,
        layer: &dyn Layer,
        removed: impl Fn(usize) -> Option<usize>,
    ) -> bool {
        let source = self.layer;
        let orientation = self.orientation;
        let removes = matches!(self.kind, StructuralKind::Delete | StructuralKind::Hide);
        self.convert_with(layer, |range| {
            if removes {
                map_removed(&[range], &removed)
            } else {
                axis::underlying_to_local_ranges(layer, orientation, source, &[range])
            }
        })
    }

    fn convert_with(&mut self, layer: &dyn Layer, convert: impl Fn(Range) -> Vec<Range>) -> bool {
        let ranges: Vec<Range> = self.ranges.iter().flat_map(|range| convert(*range)).collect();

        let mut diffs = Vec::with_capacity(self.diffs.len());
        for diff in &self.diffs {
            let converted = convert(diff.meaningful_range());
            diffs.extend(converted.into_iter().map(|range| match diff.diff_type {
                DiffType::Add => StructuralDiff::add(range),
                DiffType::Delete => StructuralDiff::delete(range),
                DiffType::Change => StructuralDiff::change(range),
            }));
        }

        if diffs.is_empty() {
            return false;
        }
        self.layer = layer.id();
        self.ranges = Range::normalize(ranges);
        self.diffs = diffs;
        true
    }
}

fn map_removed(ranges: &[Range], removed: &impl Fn(usize) -> Option<usize>) -> Vec<Range> {
    ranges_from_positions(
        ranges
            .iter()
            .flat_map(Range::positions)
            .filter_map(removed),
    )
}

/// An event fired by a layer.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum LayerEvent {
    /// Everything in the layer must be repainted.
    VisualRefresh {
        /// Firing layer.
        layer: LayerId,
    },
    /// One cell must be repainted.
    CellVisualChange {
        /// Frame of the positions.
        layer: LayerId,
        /// Column position.
        column_position: usize,
        /// Row position.
        row_position: usize,
    },
    /// Some columns must be repainted.
    ColumnVisualChange {
        /// Frame of the ranges.
        layer: LayerId,
        /// Column positions.
        ranges: Vec<Range>,
    },
    /// Some rows must be repainted.
    RowVisualChange {
        /// Frame of the ranges.
        layer: LayerId,
        /// Row positions.
        ranges: Vec<Range>,
    },
    /// A viewport scrolled.
    Scroll {
        /// Frame of the event.
        layer: LayerId,
        /// Axis that scrolled.
        orientation: Orientation,
    },
    /// A cell was selected or deselected.
    CellSelection {
        /// Frame of the positions.
        layer: LayerId,
        /// Column position.
        column_position: usize,
        /// Row position.
        row_position: usize,
    },
    /// Whole columns were selected or deselected.
    ColumnSelection {
        /// Frame of the ranges.
        layer: LayerId,
        /// Column positions.
        ranges: Vec<Range>,
    },
    /// Whole rows were selected or deselected.
    RowSelection {
        /// Frame of the ranges.
        layer: LayerId,
        /// Row positions.
        ranges: Vec<Range>,
    },
    /// A data value changed.
    ///
    /// Positions are `None` in frames where the cell is not visible; the
    /// indices always identify it.
    DataUpdate {
        /// Frame of the positions.
        layer: LayerId,
        /// Column position, if visible.
        column_position: Option<usize>,
        /// Row position, if visible.
        row_position: Option<usize>,
        /// Column index.
        column_index: usize,
        /// Row index.
        row_index: usize,
    },
    /// The position space changed along one axis.
    Structural(StructuralChangeEvent),
    /// The position space may have changed along both axes in unknown ways.
    StructuralRefresh {
        /// Firing layer.
        layer: LayerId,
    },
}

impl LayerEvent {
    /// The frame the event's positions are expressed in.
    pub fn layer_id(&self) -> LayerId {
        match self {
            LayerEvent::VisualRefresh { layer }
            | LayerEvent::CellVisualChange { layer, .. }
            | LayerEvent::ColumnVisualChange { layer, .. }
            | LayerEvent::RowVisualChange { layer, .. }
            | LayerEvent::Scroll { layer, .. }
            | LayerEvent::CellSelection { layer, .. }
            | LayerEvent::ColumnSelection { layer, .. }
            | LayerEvent::RowSelection { layer, .. }
            | LayerEvent::DataUpdate { layer, .. }
            | LayerEvent::StructuralRefresh { layer } => *layer,
            LayerEvent::Structural(event) => event.layer,
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            LayerEvent::VisualRefresh { .. } => "VisualRefresh",
            LayerEvent::CellVisualChange { .. } => "CellVisualChange",
            LayerEvent::ColumnVisualChange { .. } => "ColumnVisualChange",
            LayerEvent::RowVisualChange { .. } => "RowVisualChange",
            LayerEvent::Scroll { .. } => "Scroll",
            LayerEvent::CellSelection { .. } => "CellSelection",
            LayerEvent::ColumnSelection { .. } => "ColumnSelection",
            LayerEvent::RowSelection { .. } => "RowSelection",
            LayerEvent::DataUpdate { .. } => "DataUpdate",
            LayerEvent::Structural(_) => "Structural",
            LayerEvent::StructuralRefresh { .. } => "StructuralRefresh",
        }
    }

    /// Whether the event only asks for repainting.
    pub fn is_visual(&self) -> bool {
        !self.is_structural()
    }

    /// Whether the event changed the position space.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            LayerEvent::Structural(_) | LayerEvent::StructuralRefresh { .. }
        )
    }

    /// Whether column positions may have moved.
    pub fn is_horizontal_structure_changed(&self) -> bool {
        match self {
            LayerEvent::Structural(event) => event.orientation == Orientation::Horizontal,
            LayerEvent::StructuralRefresh { .. } => true,
            _ => false,
        }
    }

    /// Whether row positions may have moved.
    pub fn is_vertical_structure_changed(&self) -> bool {
        match self {
            LayerEvent::Structural(event) => event.orientation == Orientation::Vertical,
            LayerEvent::StructuralRefresh { .. } => true,
            _ => false,
        }
    }

    /// Column diffs of a horizontal structural change.
    ///
    /// `None` means the change cannot be described by diffs (a refresh) or the
    /// event is not a horizontal structural change.
    pub fn column_diffs(&self) -> Option<&[StructuralDiff]> {
        self.diffs(Orientation::Horizontal)
    }

    /// Row diffs of a vertical structural change.
    pub fn row_diffs(&self) -> Option<&[StructuralDiff]> {
        self.diffs(Orientation::Vertical)
    }

    /// Diffs along `orientation`.
    pub fn diffs(&self, orientation: Orientation) -> Option<&[StructuralDiff]> {
        match self {
            LayerEvent::Structural(event) if event.orientation == orientation => {
                Some(&event.diffs)
            }
            _ => None,
        }
    }

    /// A copy that can be converted and re-fired independently.
    pub fn clone_event(&self) -> LayerEvent {
        self.clone()
    }

    /// Translates the event from its firing layer into `layer`'s frame.
    ///
    /// `layer` must wrap the firing layer. Returns `false` if nothing the
    /// event addresses exists in the new frame.
    pub fn convert_to_local(&mut self, layer: &dyn Layer) -> bool {
        let source = self.layer_id();
        match self {
            LayerEvent::VisualRefresh { layer: id }
            | LayerEvent::StructuralRefresh { layer: id }
            | LayerEvent::Scroll { layer: id, .. } => {
                *id = layer.id();
                true
            }
            LayerEvent::CellVisualChange {
                layer: id,
                column_position,
                row_position,
            }
            | LayerEvent::CellSelection {
                layer: id,
                column_position,
                row_position,
            } => {
                let column = layer.underlying_to_local_column_position(source, *column_position);
                let row = layer.underlying_to_local_row_position(source, *row_position);
                match (column, row) {
                    (Some(column), Some(row)) => {
                        *id = layer.id();
                        *column_position = column;
                        *row_position = row;
                        true
                    }
                    _ => false,
                }
            }
            LayerEvent::ColumnVisualChange { layer: id, ranges }
            | LayerEvent::ColumnSelection { layer: id, ranges } => {
                convert_ranges(layer, Orientation::Horizontal, source, id, ranges)
            }
            LayerEvent::RowVisualChange { layer: id, ranges }
            | LayerEvent::RowSelection { layer: id, ranges } => {
                convert_ranges(layer, Orientation::Vertical, source, id, ranges)
            }
            LayerEvent::DataUpdate {
                layer: id,
                column_position,
                row_position,
                ..
            } => {
                *column_position = column_position
                    .and_then(|p| layer.underlying_to_local_column_position(source, p));
                *row_position =
                    row_position.and_then(|p| layer.underlying_to_local_row_position(source, p));
                *id = layer.id();
                true
            }
            LayerEvent::Structural(event) => event.convert_to_local(layer),
        }
    }

    /// Regions of `layer` that must be repainted, in `layer`'s frame.
    ///
    /// Structural changes mark everything from the first affected position to
    /// the end of the axis, since every later position shifted.
    pub fn changed_position_rectangles(&self, layer: &dyn Layer) -> Vec<Rectangle> {
        let columns = layer.column_count();
        let rows = layer.row_count();
        let whole = Rectangle::new(0, 0, columns, rows);

        match self {
            LayerEvent::VisualRefresh { .. }
            | LayerEvent::StructuralRefresh { .. }
            | LayerEvent::Scroll { .. } => vec![whole],
            LayerEvent::CellVisualChange {
                column_position,
                row_position,
                ..
            }
            | LayerEvent::CellSelection {
                column_position,
                row_position,
                ..
            } => vec![Rectangle::new(*column_position, *row_position, 1, 1)],
            LayerEvent::DataUpdate {
                column_position: Some(column),
                row_position: Some(row),
                ..
            } => vec![Rectangle::new(*column, *row, 1, 1)],
            LayerEvent::DataUpdate { .. } => Vec::new(),
            LayerEvent::ColumnVisualChange { ranges, .. }
            | LayerEvent::ColumnSelection { ranges, .. } => ranges
                .iter()
                .map(|range| Rectangle::new(range.start, 0, range.len(), rows))
                .collect(),
            LayerEvent::RowVisualChange { ranges, .. } | LayerEvent::RowSelection { ranges, .. } => {
                ranges
                    .iter()
                    .map(|range| Rectangle::new(0, range.start, columns, range.len()))
                    .collect()
            }
            LayerEvent::Structural(event) => {
                let Some(start) = event
                    .diffs
                    .iter()
                    .map(|diff| diff.meaningful_range().start)
                    .min()
                else {
                    return Vec::new();
                };
                // One extra position covers the space vacated at the end.
                match event.orientation {
                    Orientation::Horizontal => {
                        vec![Rectangle::new(start, 0, (columns + 1).saturating_sub(start), rows)]
                    }
                    Orientation::Vertical => {
                        vec![Rectangle::new(0, start, columns, (rows + 1).saturating_sub(start))]
                    }
                }
            }
        }
    }
}

fn convert_ranges(
    layer: &dyn Layer,
    orientation: Orientation,
    source: LayerId,
    id: &mut LayerId,
    ranges: &mut Vec<Range>,
) -> bool {
    let converted = axis::underlying_to_local_ranges(layer, orientation, source, ranges);
    if converted.is_empty() {
        return false;
    }
    *id = layer.id();
    *ranges = converted;
    true
}

impl From<StructuralChangeEvent> for LayerEvent {
    fn from(event: StructuralChangeEvent) -> Self {
        LayerEvent::Structural(event)
    }
}
