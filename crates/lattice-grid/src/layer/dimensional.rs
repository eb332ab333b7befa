//! A layer whose axes come from two other layers.
//!
//! Headers are built this way: a column header takes its columns from the
//! body (so it scrolls, reorders and hides with it) and its rows and data
//! from its own data layer.

use std::sync::{Arc, Weak};

use lattice_grid_core::{LayerId, Orientation};
use parking_lot::RwLock;

use super::{DisplayMode, Layer, LayerBase, LayerListener, ListenerId, SelectionLayer, axis, propagate_converted};
use crate::command::LayerCommand;
use crate::data::CellValue;
use crate::event::LayerEvent;
use crate::label::LabelStack;

struct SelectionLink {
    layer: Weak<SelectionLayer>,
    orientation: Orientation,
    source: LayerId,
    listener: ListenerId,
}

/// Columns from `horizontal_dependency`, rows from `vertical_dependency`,
/// data and labels from `base`.
///
/// Cells are mapped into the base by index, so each dependency must share
/// the base's index space along its axis.
pub struct DimensionallyDependentLayer {
    layer_base: LayerBase,
    base_layer: Arc<dyn Layer>,
    horizontal: Arc<dyn Layer>,
    vertical: Arc<dyn Layer>,
    selection: RwLock<Option<SelectionLink>>,
}

impl DimensionallyDependentLayer {
    /// Creates the layer. It listens to `base` only; changes of the
    /// dependencies reach the grid through their own regions.
    pub fn new(base: Arc<dyn Layer>, horizontal: Arc<dyn Layer>, vertical: Arc<dyn Layer>) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| {
            base.add_layer_listener(this.clone());
            Self {
                layer_base: LayerBase::new(this.clone()),
                base_layer: base,
                horizontal,
                vertical,
                selection: RwLock::new(None),
            }
        })
    }

    /// The layer data and labels come from.
    pub fn base_layer(&self) -> &Arc<dyn Layer> {
        &self.base_layer
    }

    /// The layer columns come from.
    pub fn horizontal_dependency(&self) -> &Arc<dyn Layer> {
        &self.horizontal
    }

    /// The layer rows come from.
    pub fn vertical_dependency(&self) -> &Arc<dyn Layer> {
        &self.vertical
    }

    /// Marks cells of selected columns (`Horizontal`) or rows (`Vertical`)
    /// with [`DisplayMode::Select`] and repaints when the selection changes.
    pub fn set_selection_layer(self: &Arc<Self>, selection: &Arc<SelectionLayer>, orientation: Orientation) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let listener = selection.add_layer_listener(weak);
        let link = SelectionLink {
            layer: Arc::downgrade(selection),
            orientation,
            source: selection.id(),
            listener,
        };
        if let Some(old) = self.selection.write().replace(link)
            && let Some(layer) = old.layer.upgrade()
        {
            layer.remove_layer_listener(old.listener);
        }
    }

    fn dependency(&self, orientation: Orientation) -> &Arc<dyn Layer> {
        match orientation {
            Orientation::Horizontal => &self.horizontal,
            Orientation::Vertical => &self.vertical,
        }
    }

    /// Maps a local position to the base frame through its index.
    fn base_position(&self, orientation: Orientation, position: usize) -> Option<usize> {
        let dependency = self.dependency(orientation);
        if dependency.id() == self.base_layer.id() {
            return (position < axis::count(dependency.as_ref(), orientation)).then_some(position);
        }
        let index = axis::index_by_position(dependency.as_ref(), orientation, position)?;
        axis::position_by_index(self.base_layer.as_ref(), orientation, index)
    }

    fn from_source(&self, orientation: Orientation, source: LayerId, position: usize) -> Option<usize> {
        let dependency = self.dependency(orientation);
        if source == dependency.id() {
            return Some(position);
        }
        if source == self.base_layer.id() {
            let index = axis::index_by_position(self.base_layer.as_ref(), orientation, position)?;
            return axis::position_by_index(dependency.as_ref(), orientation, index);
        }
        None
    }

    fn base_cell(&self, column_position: usize, row_position: usize) -> Option<(usize, usize)> {
        Some((
            self.base_position(Orientation::Horizontal, column_position)?,
            self.base_position(Orientation::Vertical, row_position)?,
        ))
    }

    fn is_selected(&self, column_position: usize, row_position: usize) -> bool {
        let guard = self.selection.read();
        let Some(link) = guard.as_ref() else {
            return false;
        };
        let Some(selection) = link.layer.upgrade() else {
            return false;
        };
        match link.orientation {
            Orientation::Horizontal => self
                .column_index_by_position(column_position)
                .is_some_and(|index| selection.is_column_index_selected(index)),
            Orientation::Vertical => self
                .row_index_by_position(row_position)
                .is_some_and(|index| selection.is_row_index_selected(index)),
        }
    }
}

impl LayerListener for DimensionallyDependentLayer {
    fn handle_layer_event(&self, event: &LayerEvent) {
        let selection_source = self.selection.read().as_ref().map(|link| link.source);
        if selection_source == Some(event.layer_id()) && selection_source != Some(self.base_layer.id()) {
            if matches!(
                event,
                LayerEvent::CellSelection { .. }
                    | LayerEvent::ColumnSelection { .. }
                    | LayerEvent::RowSelection { .. }
                    | LayerEvent::VisualRefresh { .. }
            ) {
                self.fire_layer_event(LayerEvent::VisualRefresh { layer: self.id() });
            }
            return;
        }

        // Structure along a borrowed axis is reported by the dependency itself.
        let borrowed = |orientation: Orientation| self.dependency(orientation).id() != self.base_layer.id();
        match event {
            LayerEvent::Structural(structural) if borrowed(structural.orientation) => {}
            _ => propagate_converted(self, event),
        }
    }
}

impl Layer for DimensionallyDependentLayer {
    fn base(&self) -> &LayerBase {
        &self.layer_base
    }

    fn underlying(&self) -> Option<&Arc<dyn Layer>> {
        Some(&self.base_layer)
    }

    fn column_count(&self) -> usize {
        self.horizontal.column_count()
    }

    fn column_index_by_position(&self, column_position: usize) -> Option<usize> {
        self.horizontal.column_index_by_position(column_position)
    }

    fn column_position_by_index(&self, column_index: usize) -> Option<usize> {
        self.horizontal.column_position_by_index(column_index)
    }

    fn local_to_underlying_column_position(&self, column_position: usize) -> Option<usize> {
        (column_position < self.column_count()).then_some(column_position)
    }

    fn underlying_to_local_column_position(&self, source: LayerId, column_position: usize) -> Option<usize> {
        self.from_source(Orientation::Horizontal, source, column_position)
    }

    fn underlying_layers_by_column_position(&self, _column_position: usize) -> Vec<Arc<dyn Layer>> {
        vec![self.horizontal.clone()]
    }

    fn width(&self) -> i32 {
        self.horizontal.width()
    }

    fn column_width_by_position(&self, column_position: usize) -> i32 {
        self.horizontal.column_width_by_position(column_position)
    }

    fn start_x_of_column_position(&self, column_position: usize) -> Option<i32> {
        self.horizontal.start_x_of_column_position(column_position)
    }

    fn column_position_by_x(&self, x: i32) -> Option<usize> {
        self.horizontal.column_position_by_x(x)
    }

    fn is_column_position_resizable(&self, column_position: usize) -> bool {
        self.horizontal.is_column_position_resizable(column_position)
    }

    fn row_count(&self) -> usize {
        self.vertical.row_count()
    }

    fn row_index_by_position(&self, row_position: usize) -> Option<usize> {
        self.vertical.row_index_by_position(row_position)
    }

    fn row_position_by_index(&self, row_index: usize) -> Option<usize> {
        self.vertical.row_position_by_index(row_index)
    }

    fn local_to_underlying_row_position(&self, row_position: usize) -> Option<usize> {
        (row_position < self.row_count()).then_some(row_position)
    }

    fn underlying_to_local_row_position(&self, source: LayerId, row_position: usize) -> Option<usize> {
        self.from_source(Orientation::Vertical, source, row_position)
    }

    fn underlying_layers_by_row_position(&self, _row_position: usize) -> Vec<Arc<dyn Layer>> {
        vec![self.vertical.clone()]
    }

    fn height(&self) -> i32 {
        self.vertical.height()
    }

    fn row_height_by_position(&self, row_position: usize) -> i32 {
        self.vertical.row_height_by_position(row_position)
    }

    fn start_y_of_row_position(&self, row_position: usize) -> Option<i32> {
        self.vertical.start_y_of_row_position(row_position)
    }

    fn row_position_by_y(&self, y: i32) -> Option<usize> {
        self.vertical.row_position_by_y(y)
    }

    fn is_row_position_resizable(&self, row_position: usize) -> bool {
        self.vertical.is_row_position_resizable(row_position)
    }

    /// Tries the base, then each dependency, each layer once.
    fn do_command(&self, command: &LayerCommand) -> bool {
        if matches!(command, LayerCommand::Dispose) {
            self.layer_base.dispose();
        }
        let mut seen: Vec<LayerId> = Vec::with_capacity(3);
        for layer in [&self.base_layer, &self.horizontal, &self.vertical] {
            if seen.contains(&layer.id()) {
                continue;
            }
            seen.push(layer.id());
            if layer.do_command(command) {
                return true;
            }
        }
        false
    }

    fn config_labels_by_position(&self, column_position: usize, row_position: usize) -> LabelStack {
        let mut labels = match self.base_cell(column_position, row_position) {
            Some((column, row)) => self.base_layer.config_labels_by_position(column, row),
            None => LabelStack::new(),
        };
        if let Some(accumulator) = self.layer_base.config_label_accumulator()
            && let Some(this) = self.layer_base.this()
        {
            accumulator.accumulate_config_labels(this.as_ref(), &mut labels, column_position, row_position);
        }
        labels
    }

    fn display_mode_by_position(&self, column_position: usize, row_position: usize) -> DisplayMode {
        if self.is_selected(column_position, row_position) {
            return DisplayMode::Select;
        }
        self.base_cell(column_position, row_position)
            .map(|(column, row)| self.base_layer.display_mode_by_position(column, row))
            .unwrap_or_default()
    }

    fn data_value_by_position(&self, column_position: usize, row_position: usize) -> Option<CellValue> {
        let (column, row) = self.base_cell(column_position, row_position)?;
        self.base_layer.data_value_by_position(column, row)
    }
}

static_assertions::assert_impl_all!(DimensionallyDependentLayer: Send, Sync);

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::data::{ColumnHeaderDataProvider, DataProvider, DummyDataProvider};
    use crate::layer::{DataLayer, ReorderLayer, SelectionModifiers, ViewportLayer, register_listener};

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<LayerEvent>>,
    }

    impl LayerListener for Recorder {
        fn handle_layer_event(&self, event: &LayerEvent) {
            self.events.lock().push(event.clone());
        }
    }

    struct Header {
        reorder: Arc<ReorderLayer>,
        selection: Arc<SelectionLayer>,
        viewport: Arc<ViewportLayer>,
        header: Arc<DimensionallyDependentLayer>,
    }

    fn header() -> Header {
        let provider: Arc<dyn DataProvider> = Arc::new(DummyDataProvider::new(6, 4));
        let data = DataLayer::new(provider.clone(), 100, 20);
        let reorder = ReorderLayer::new(data);
        let selection = SelectionLayer::new(reorder.clone());
        let viewport = ViewportLayer::new(selection.clone());
        viewport.set_client_area(300, 80);

        let names = (0..6).map(|i| format!("C{i}")).collect();
        let header_data = DataLayer::new(Arc::new(ColumnHeaderDataProvider::new(provider, names)), 100, 25);
        let header = DimensionallyDependentLayer::new(header_data.clone(), viewport.clone(), header_data);
        header.set_selection_layer(&selection, Orientation::Horizontal);
        Header {
            reorder,
            selection,
            viewport,
            header,
        }
    }

    #[test]
    fn test_axes_come_from_dependencies() {
        let Header { header, .. } = header();
        assert_eq!(header.column_count(), 3);
        assert_eq!(header.row_count(), 1);
        assert_eq!(header.height(), 25);
        assert_eq!(header.width(), 300);
    }

    #[test]
    fn test_data_follows_body_columns() {
        let Header {
            reorder,
            viewport,
            header,
            ..
        } = header();
        assert_eq!(header.data_value_by_position(0, 0), Some(CellValue::Text("C0".into())));

        reorder.reorder_column_position(0, 6);
        assert_eq!(header.data_value_by_position(0, 0), Some(CellValue::Text("C1".into())));

        viewport.set_origin_x(200);
        assert_eq!(header.data_value_by_position(0, 0), Some(CellValue::Text("C3".into())));
    }

    #[test]
    fn test_selected_column_is_highlighted() {
        let Header {
            selection, header, ..
        } = header();
        let recorder = Arc::new(Recorder::default());
        let as_layer: Arc<dyn Layer> = header.clone();
        register_listener(&as_layer, &recorder);

        selection.select_cell(1, 2, SelectionModifiers::NONE);
        assert_eq!(header.display_mode_by_position(1, 0), DisplayMode::Select);
        assert_eq!(header.display_mode_by_position(0, 0), DisplayMode::Normal);
        assert!(recorder
            .events
            .lock()
            .iter()
            .any(|event| matches!(event, LayerEvent::VisualRefresh { .. })));
    }

    #[test]
    fn test_commands_reach_dependencies() {
        let Header {
            viewport, header, ..
        } = header();
        assert!(header.do_command(&LayerCommand::TurnViewportOff));
        assert!(viewport.is_viewport_off());
        assert_eq!(header.column_count(), 6);
    }
}
