//! Layers composed of child layers laid out in a 2D grid of regions.
//!
//! Child `(x, y)` contributes the columns of layout column `x` and the rows of
//! layout row `y`. Children sharing a layout column are expected to agree on
//! its columns, which is how a column header lines up with the body.

use std::sync::{Arc, Weak};

use lattice_grid_core::logging::targets;
use lattice_grid_core::{GridError, LayerId, Orientation, Result};
use parking_lot::RwLock;

use super::{
    DisplayMode, Layer, LayerBase, LayerListener, ListenerId, axis, propagate_converted,
};
use crate::command::LayerCommand;
use crate::data::CellValue;
use crate::event::LayerEvent;
use crate::label::LabelStack;

/// Handles commands on behalf of a composite before they are routed to the
/// children.
pub trait CompositeCommandHandler: Send + Sync {
    /// Returns `true` if the command was consumed.
    fn do_command(&self, composite: &CompositeLayer, command: &LayerCommand) -> bool;
}

struct ChildSlot {
    label: String,
    layer: Arc<dyn Layer>,
    x: usize,
    y: usize,
    listener: ListenerId,
}

impl ChildSlot {
    fn slot(&self, orientation: Orientation) -> usize {
        match orientation {
            Orientation::Horizontal => self.x,
            Orientation::Vertical => self.y,
        }
    }
}

/// A fixed layout of child layers, each tagged with a region label.
pub struct CompositeLayer {
    base: LayerBase,
    layout_columns: usize,
    layout_rows: usize,
    children: RwLock<Vec<ChildSlot>>,
    handlers: RwLock<Vec<Arc<dyn CompositeCommandHandler>>>,
}

impl CompositeLayer {
    /// Creates an empty layout of `layout_columns` by `layout_rows` regions.
    pub fn new(layout_columns: usize, layout_rows: usize) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| Self {
            base: LayerBase::new(this.clone()),
            layout_columns,
            layout_rows,
            children: RwLock::new(Vec::new()),
            handlers: RwLock::new(Vec::new()),
        })
    }

    /// Places `layer` at `(x, y)` under the region `label`.
    ///
    /// Children receive context-free commands in the order they were first
    /// placed; replacing a child keeps its place in that order.
    pub fn set_child_layer(
        self: &Arc<Self>,
        label: impl Into<String>,
        layer: Arc<dyn Layer>,
        x: usize,
        y: usize,
    ) -> Result<()> {
        if x >= self.layout_columns || y >= self.layout_rows {
            return Err(GridError::LayoutOutOfBounds {
                x,
                y,
                columns: self.layout_columns,
                rows: self.layout_rows,
            });
        }

        let weak: Weak<Self> = Arc::downgrade(self);
        let listener = layer.add_layer_listener(weak);
        let label = label.into();
        tracing::debug!(target: targets::LAYER, composite = %self.id(), child = %layer.id(), %label, x, y, "child layer set");

        let slot = ChildSlot {
            label,
            layer,
            x,
            y,
            listener,
        };
        let mut children = self.children.write();
        match children.iter_mut().find(|child| child.x == x && child.y == y) {
            Some(existing) => {
                existing.layer.remove_layer_listener(existing.listener);
                *existing = slot;
            }
            None => children.push(slot),
        }
        Ok(())
    }

    /// Registers a handler that sees every command before the children do.
    pub fn add_command_handler(&self, handler: Arc<dyn CompositeCommandHandler>) {
        self.handlers.write().push(handler);
    }

    /// Layout size as `(columns, rows)`.
    pub fn layout_size(&self) -> (usize, usize) {
        (self.layout_columns, self.layout_rows)
    }

    /// The child at a layout slot.
    pub fn child_layer(&self, x: usize, y: usize) -> Option<Arc<dyn Layer>> {
        self.children
            .read()
            .iter()
            .find(|child| child.x == x && child.y == y)
            .map(|child| child.layer.clone())
    }

    /// The child registered under a region label.
    pub fn child_layer_by_label(&self, label: &str) -> Option<Arc<dyn Layer>> {
        self.children
            .read()
            .iter()
            .find(|child| child.label == label)
            .map(|child| child.layer.clone())
    }

    /// Width in pixels of a layout column.
    pub fn layout_column_width(&self, x: usize) -> i32 {
        self.slot_extent(Orientation::Horizontal, x)
    }

    /// Height in pixels of a layout row.
    pub fn layout_row_height(&self, y: usize) -> i32 {
        self.slot_extent(Orientation::Vertical, y)
    }

    // =========================================================================
    // Layout Geometry
    // =========================================================================

    fn slot_count(&self, orientation: Orientation) -> usize {
        match orientation {
            Orientation::Horizontal => self.layout_columns,
            Orientation::Vertical => self.layout_rows,
        }
    }

    /// The child defining the positions of a layout column or row.
    fn axis_child(&self, orientation: Orientation, slot: usize) -> Option<Arc<dyn Layer>> {
        let cross = orientation.flip();
        self.children
            .read()
            .iter()
            .filter(|child| child.slot(orientation) == slot)
            .min_by_key(|child| child.slot(cross))
            .map(|child| child.layer.clone())
    }

    fn slot_len(&self, orientation: Orientation, slot: usize) -> usize {
        self.axis_child(orientation, slot)
            .map_or(0, |child| axis::count(child.as_ref(), orientation))
    }

    fn slot_extent(&self, orientation: Orientation, slot: usize) -> i32 {
        self.axis_child(orientation, slot)
            .map_or(0, |child| axis::extent(child.as_ref(), orientation))
    }

    fn position_offset(&self, orientation: Orientation, slot: usize) -> usize {
        (0..slot).map(|s| self.slot_len(orientation, s)).sum()
    }

    fn pixel_offset(&self, orientation: Orientation, slot: usize) -> i32 {
        (0..slot).map(|s| self.slot_extent(orientation, s)).sum()
    }

    /// The layout slot containing a position and the position inside it.
    fn locate(&self, orientation: Orientation, position: usize) -> Option<(usize, usize)> {
        let mut offset = 0;
        for slot in 0..self.slot_count(orientation) {
            let len = self.slot_len(orientation, slot);
            if position < offset + len {
                return Some((slot, position - offset));
            }
            offset += len;
        }
        None
    }

    fn locate_child(&self, orientation: Orientation, position: usize) -> Option<(Arc<dyn Layer>, usize)> {
        let (slot, local) = self.locate(orientation, position)?;
        Some((self.axis_child(orientation, slot)?, local))
    }

    fn locate_cell(&self, column_position: usize, row_position: usize) -> Option<(usize, usize, usize, usize)> {
        let (x, column) = self.locate(Orientation::Horizontal, column_position)?;
        let (y, row) = self.locate(Orientation::Vertical, row_position)?;
        Some((x, y, column, row))
    }

    fn count(&self, orientation: Orientation) -> usize {
        (0..self.slot_count(orientation))
            .map(|slot| self.slot_len(orientation, slot))
            .sum()
    }

    fn extent(&self, orientation: Orientation) -> i32 {
        (0..self.slot_count(orientation))
            .map(|slot| self.slot_extent(orientation, slot))
            .sum()
    }

    fn index_by_position(&self, orientation: Orientation, position: usize) -> Option<usize> {
        let (child, local) = self.locate_child(orientation, position)?;
        axis::index_by_position(child.as_ref(), orientation, local)
    }

    /// First registered child that shows the index wins.
    fn position_by_index(&self, orientation: Orientation, index: usize) -> Option<usize> {
        let children: Vec<(Arc<dyn Layer>, usize)> = self
            .children
            .read()
            .iter()
            .map(|child| (child.layer.clone(), child.slot(orientation)))
            .collect();
        children.into_iter().find_map(|(child, slot)| {
            let local = axis::position_by_index(child.as_ref(), orientation, index)?;
            Some(self.position_offset(orientation, slot) + local)
        })
    }

    fn underlying_to_local(&self, orientation: Orientation, source: LayerId, position: usize) -> Option<usize> {
        let slot = self
            .children
            .read()
            .iter()
            .find(|child| child.layer.id() == source)
            .map(|child| child.slot(orientation))?;
        Some(self.position_offset(orientation, slot) + position)
    }

    fn layers_at(&self, orientation: Orientation, position: usize) -> Vec<Arc<dyn Layer>> {
        let Some((slot, _)) = self.locate(orientation, position) else {
            return Vec::new();
        };
        let cross = orientation.flip();
        let children = self.children.read();
        let mut layers: Vec<&ChildSlot> = children
            .iter()
            .filter(|child| child.slot(orientation) == slot)
            .collect();
        layers.sort_by_key(|child| child.slot(cross));
        layers.into_iter().map(|child| child.layer.clone()).collect()
    }

    fn size_by_position(&self, orientation: Orientation, position: usize) -> i32 {
        self.locate_child(orientation, position)
            .map_or(0, |(child, local)| axis::size_by_position(child.as_ref(), orientation, local))
    }

    fn start_by_position(&self, orientation: Orientation, position: usize) -> Option<i32> {
        let (slot, local) = self.locate(orientation, position)?;
        let child = self.axis_child(orientation, slot)?;
        let start = axis::start_by_position(child.as_ref(), orientation, local)?;
        Some(self.pixel_offset(orientation, slot) + start)
    }

    fn position_by_offset(&self, orientation: Orientation, offset: i32) -> Option<usize> {
        if offset < 0 {
            return None;
        }
        let mut pixels = 0;
        let mut positions = 0;
        for slot in 0..self.slot_count(orientation) {
            let Some(child) = self.axis_child(orientation, slot) else {
                continue;
            };
            let extent = axis::extent(child.as_ref(), orientation);
            if offset < pixels + extent {
                let local = axis::position_by_offset(child.as_ref(), orientation, offset - pixels)?;
                return Some(positions + local);
            }
            pixels += extent;
            positions += axis::count(child.as_ref(), orientation);
        }
        None
    }

    fn children_snapshot(&self) -> Vec<Arc<dyn Layer>> {
        self.children.read().iter().map(|child| child.layer.clone()).collect()
    }
}

impl LayerListener for CompositeLayer {
    fn handle_layer_event(&self, event: &LayerEvent) {
        propagate_converted(self, event);
    }
}

impl Layer for CompositeLayer {
    fn base(&self) -> &LayerBase {
        &self.base
    }

    fn column_count(&self) -> usize {
        self.count(Orientation::Horizontal)
    }

    fn column_index_by_position(&self, column_position: usize) -> Option<usize> {
        self.index_by_position(Orientation::Horizontal, column_position)
    }

    fn column_position_by_index(&self, column_index: usize) -> Option<usize> {
        self.position_by_index(Orientation::Horizontal, column_index)
    }

    fn local_to_underlying_column_position(&self, column_position: usize) -> Option<usize> {
        self.locate(Orientation::Horizontal, column_position)
            .map(|(_, local)| local)
    }

    fn underlying_to_local_column_position(&self, source: LayerId, column_position: usize) -> Option<usize> {
        self.underlying_to_local(Orientation::Horizontal, source, column_position)
    }

    fn underlying_layers_by_column_position(&self, column_position: usize) -> Vec<Arc<dyn Layer>> {
        self.layers_at(Orientation::Horizontal, column_position)
    }

    fn width(&self) -> i32 {
        self.extent(Orientation::Horizontal)
    }

    fn column_width_by_position(&self, column_position: usize) -> i32 {
        self.size_by_position(Orientation::Horizontal, column_position)
    }

    fn start_x_of_column_position(&self, column_position: usize) -> Option<i32> {
        self.start_by_position(Orientation::Horizontal, column_position)
    }

    fn column_position_by_x(&self, x: i32) -> Option<usize> {
        self.position_by_offset(Orientation::Horizontal, x)
    }

    fn is_column_position_resizable(&self, column_position: usize) -> bool {
        self.locate_child(Orientation::Horizontal, column_position)
            .is_some_and(|(child, local)| child.is_column_position_resizable(local))
    }

    fn row_count(&self) -> usize {
        self.count(Orientation::Vertical)
    }

    fn row_index_by_position(&self, row_position: usize) -> Option<usize> {
        self.index_by_position(Orientation::Vertical, row_position)
    }

    fn row_position_by_index(&self, row_index: usize) -> Option<usize> {
        self.position_by_index(Orientation::Vertical, row_index)
    }

    fn local_to_underlying_row_position(&self, row_position: usize) -> Option<usize> {
        self.locate(Orientation::Vertical, row_position)
            .map(|(_, local)| local)
    }

    fn underlying_to_local_row_position(&self, source: LayerId, row_position: usize) -> Option<usize> {
        self.underlying_to_local(Orientation::Vertical, source, row_position)
    }

    fn underlying_layers_by_row_position(&self, row_position: usize) -> Vec<Arc<dyn Layer>> {
        self.layers_at(Orientation::Vertical, row_position)
    }

    fn height(&self) -> i32 {
        self.extent(Orientation::Vertical)
    }

    fn row_height_by_position(&self, row_position: usize) -> i32 {
        self.size_by_position(Orientation::Vertical, row_position)
    }

    fn start_y_of_row_position(&self, row_position: usize) -> Option<i32> {
        self.start_by_position(Orientation::Vertical, row_position)
    }

    fn row_position_by_y(&self, y: i32) -> Option<usize> {
        self.position_by_offset(Orientation::Vertical, y)
    }

    fn is_row_position_resizable(&self, row_position: usize) -> bool {
        self.locate_child(Orientation::Vertical, row_position)
            .is_some_and(|(child, local)| child.is_row_position_resizable(local))
    }

    #[tracing::instrument(skip_all, target = "lattice_grid::command", level = "trace", fields(command = command.name()))]
    fn do_command(&self, command: &LayerCommand) -> bool {
        let handlers = self.handlers.read().clone();
        if handlers.iter().any(|handler| handler.do_command(self, command)) {
            return true;
        }

        let children = self.children_snapshot();
        if matches!(command, LayerCommand::Dispose) {
            self.base.dispose();
            let mut consumed = false;
            for child in &children {
                consumed |= child.do_command(command);
            }
            return consumed;
        }

        if command.origin().is_some_and(|origin| origin.id() == self.id()) {
            // Addressed to a region: only the children holding the positions see it.
            for child in &children {
                if let Some(converted) = command.convert_to_target_layer(child.as_ref())
                    && child.do_command(&converted)
                {
                    return true;
                }
            }
            tracing::trace!(target: targets::COMMAND, command = command.name(), layer = %self.id(), "no region consumed command");
            return false;
        }

        children.iter().any(|child| child.do_command(command))
    }

    fn config_labels_by_position(&self, column_position: usize, row_position: usize) -> LabelStack {
        let Some((x, y, column, row)) = self.locate_cell(column_position, row_position) else {
            return LabelStack::new();
        };
        let (child, label) = {
            let children = self.children.read();
            match children.iter().find(|child| child.x == x && child.y == y) {
                Some(slot) => (slot.layer.clone(), slot.label.clone()),
                None => return LabelStack::new(),
            }
        };
        let mut labels = child.config_labels_by_position(column, row);
        labels.add_label(label);
        if let Some(accumulator) = self.base.config_label_accumulator()
            && let Some(this) = self.base.this()
        {
            accumulator.accumulate_config_labels(this.as_ref(), &mut labels, column_position, row_position);
        }
        labels
    }

    fn display_mode_by_position(&self, column_position: usize, row_position: usize) -> DisplayMode {
        self.locate_cell(column_position, row_position)
            .and_then(|(x, y, column, row)| {
                self.child_layer(x, y)
                    .map(|child| child.display_mode_by_position(column, row))
            })
            .unwrap_or_default()
    }

    fn data_value_by_position(&self, column_position: usize, row_position: usize) -> Option<CellValue> {
        let (x, y, column, row) = self.locate_cell(column_position, row_position)?;
        self.child_layer(x, y)?.data_value_by_position(column, row)
    }

    fn underlying_layer_by_position(&self, column_position: usize, row_position: usize) -> Option<Arc<dyn Layer>> {
        let (x, y, _, _) = self.locate_cell(column_position, row_position)?;
        self.child_layer(x, y)
    }

    fn region_label_by_position(&self, column_position: usize, row_position: usize) -> Option<String> {
        let (x, y, _, _) = self.locate_cell(column_position, row_position)?;
        self.children
            .read()
            .iter()
            .find(|child| child.x == x && child.y == y)
            .map(|child| child.label.clone())
    }
}

impl std::fmt::Debug for CompositeLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let regions: Vec<(String, usize, usize)> = self
            .children
            .read()
            .iter()
            .map(|child| (child.label.clone(), child.x, child.y))
            .collect();
        f.debug_struct("CompositeLayer")
            .field("id", &self.id())
            .field("layout", &(self.layout_columns, self.layout_rows))
            .field("regions", &regions)
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(CompositeLayer: Send, Sync);

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::data::DummyDataProvider;
    use crate::label::{BODY, COLUMN_HEADER, CORNER, ROW_HEADER};
    use crate::layer::{DataLayer, register_listener};

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<LayerEvent>>,
    }

    impl LayerListener for Recorder {
        fn handle_layer_event(&self, event: &LayerEvent) {
            self.events.lock().push(event.clone());
        }
    }

    struct Regions {
        composite: Arc<CompositeLayer>,
        body: Arc<DataLayer>,
        column_header: Arc<DataLayer>,
    }

    fn regions() -> Regions {
        let body = DataLayer::new(Arc::new(DummyDataProvider::new(5, 3)), 100, 20);
        let column_header = DataLayer::new(Arc::new(DummyDataProvider::new(5, 1)), 100, 20);
        let row_header = DataLayer::new(Arc::new(DummyDataProvider::new(1, 3)), 40, 20);
        let corner = DataLayer::new(Arc::new(DummyDataProvider::new(1, 1)), 40, 20);

        let composite = CompositeLayer::new(2, 2);
        composite.set_child_layer(BODY, body.clone(), 1, 1).unwrap();
        composite
            .set_child_layer(COLUMN_HEADER, column_header.clone(), 1, 0)
            .unwrap();
        composite.set_child_layer(ROW_HEADER, row_header, 0, 1).unwrap();
        composite.set_child_layer(CORNER, corner, 0, 0).unwrap();
        Regions {
            composite,
            body,
            column_header,
        }
    }

    #[test]
    fn test_geometry_sums_regions() {
        let Regions { composite, .. } = regions();
        assert_eq!(composite.column_count(), 6);
        assert_eq!(composite.row_count(), 4);
        assert_eq!(composite.width(), 540);
        assert_eq!(composite.height(), 80);
        assert_eq!(composite.start_x_of_column_position(2), Some(140));
        assert_eq!(composite.column_position_by_x(139), Some(1));
        assert_eq!(composite.row_position_by_y(25), Some(1));
        assert_eq!(composite.layout_column_width(0), 40);
    }

    #[test]
    fn test_position_routing() {
        let Regions { composite, body, .. } = regions();
        assert_eq!(composite.column_index_by_position(3), Some(2));
        assert_eq!(composite.local_to_underlying_column_position(3), Some(2));
        assert_eq!(
            composite.underlying_to_local_column_position(body.id(), 0),
            Some(1)
        );
        assert_eq!(composite.region_label_by_position(3, 2).as_deref(), Some(BODY));
        assert_eq!(composite.region_label_by_position(0, 0).as_deref(), Some(CORNER));
        assert!(composite.config_labels_by_position(3, 0).contains(COLUMN_HEADER));
        assert_eq!(
            composite.underlying_layer_by_position(3, 2).map(|l| l.id()),
            Some(body.id())
        );
    }

    #[test]
    fn test_out_of_bounds_lookups() {
        let Regions { composite, .. } = regions();
        assert!(composite.cell_by_position(6, 0).is_none());
        assert!(composite.region_label_by_position(0, 4).is_none());
        assert_eq!(composite.column_width_by_position(6), 0);
        assert!(composite.data_value_by_position(6, 6).is_none());

        let err = composite
            .set_child_layer("EXTRA", DataLayer::new(Arc::new(DummyDataProvider::new(1, 1)), 1, 1), 2, 0)
            .unwrap_err();
        assert!(matches!(err, GridError::LayoutOutOfBounds { x: 2, y: 0, .. }));
    }

    #[test]
    fn test_region_command_reaches_only_its_region() {
        let Regions {
            composite,
            body,
            column_header,
        } = regions();
        let recorder = Arc::new(Recorder::default());
        let as_layer: Arc<dyn Layer> = composite.clone();
        register_listener(&as_layer, &recorder);

        assert!(composite.do_command(&LayerCommand::ResizeColumn {
            layer: as_layer.clone(),
            column_position: 2,
            width: 150,
        }));
        assert_eq!(body.column_width_by_position(1), 150);
        assert_eq!(column_header.column_width_by_position(1), 100);

        let events = recorder.events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].layer_id(), composite.id());
        assert_eq!(
            events[0].column_diffs().map(|d| d[0].before.start),
            Some(2)
        );
    }

    #[test]
    fn test_handlers_run_first() {
        struct Swallow;
        impl CompositeCommandHandler for Swallow {
            fn do_command(&self, _composite: &CompositeLayer, command: &LayerCommand) -> bool {
                matches!(command, LayerCommand::SelectAll)
            }
        }

        let Regions { composite, .. } = regions();
        composite.add_command_handler(Arc::new(Swallow));
        assert!(composite.do_command(&LayerCommand::SelectAll));
        assert!(!composite.do_command(&LayerCommand::ClearSelection));
    }
}
