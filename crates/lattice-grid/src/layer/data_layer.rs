//! The innermost layer: positions are indices of a [`DataProvider`].

use std::sync::{Arc, Weak};

use lattice_grid_core::logging::targets;
use lattice_grid_core::{GridConfig, Orientation};
use parking_lot::RwLock;

use super::{Layer, LayerBase, LayerListener, forward_command};
use crate::command::LayerCommand;
use crate::data::{CellValue, DataProvider};
use crate::event::{LayerEvent, StructuralChangeEvent, StructuralKind};
use crate::size::SizeConfig;

/// Wraps a data provider and owns column widths and row heights.
///
/// Insertions and deletions in the provider are not observed automatically;
/// the host reports them through [`DataLayer::rows_inserted`] and friends so
/// that the layers above can adjust.
pub struct DataLayer {
    base: LayerBase,
    provider: Arc<dyn DataProvider>,
    column_widths: RwLock<SizeConfig>,
    row_heights: RwLock<SizeConfig>,
}

impl DataLayer {
    /// Creates a data layer with the given default sizes.
    pub fn new(provider: Arc<dyn DataProvider>, default_column_width: i32, default_row_height: i32) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| Self {
            base: LayerBase::new(this.clone()),
            provider,
            column_widths: RwLock::new(SizeConfig::new(default_column_width)),
            row_heights: RwLock::new(SizeConfig::new(default_row_height)),
        })
    }

    /// Creates a body data layer sized from the configuration.
    pub fn from_config(provider: Arc<dyn DataProvider>, config: &GridConfig) -> Arc<Self> {
        Self::new(
            provider,
            config.default_column_width as i32,
            config.default_row_height as i32,
        )
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &Arc<dyn DataProvider> {
        &self.provider
    }

    fn sizes(&self, orientation: Orientation) -> &RwLock<SizeConfig> {
        match orientation {
            Orientation::Horizontal => &self.column_widths,
            Orientation::Vertical => &self.row_heights,
        }
    }

    fn count(&self, orientation: Orientation) -> usize {
        match orientation {
            Orientation::Horizontal => self.provider.column_count(),
            Orientation::Vertical => self.provider.row_count(),
        }
    }

    // =========================================================================
    // Sizes
    // =========================================================================

    /// Sets the width of a column. Returns `true` if it changed.
    pub fn set_column_width_by_position(&self, column_position: usize, width: i32) -> bool {
        self.resize(Orientation::Horizontal, &[(column_position, width)])
    }

    /// Sets the height of a row. Returns `true` if it changed.
    pub fn set_row_height_by_position(&self, row_position: usize, height: i32) -> bool {
        self.resize(Orientation::Vertical, &[(row_position, height)])
    }

    /// Sets the width used by columns without an explicit width.
    pub fn set_default_column_width(&self, width: i32) {
        self.column_widths.write().set_default_size(width);
        self.fire_layer_event(LayerEvent::StructuralRefresh { layer: self.id() });
    }

    /// Sets the height used by rows without an explicit height.
    pub fn set_default_row_height(&self, height: i32) {
        self.row_heights.write().set_default_size(height);
        self.fire_layer_event(LayerEvent::StructuralRefresh { layer: self.id() });
    }

    /// Allows or forbids resizing a column.
    pub fn set_column_resizable(&self, column_index: usize, resizable: bool) {
        self.column_widths.write().set_resizable(column_index, resizable);
    }

    /// Allows or forbids resizing a row.
    pub fn set_row_resizable(&self, row_index: usize, resizable: bool) {
        self.row_heights.write().set_resizable(row_index, resizable);
    }

    fn resize(&self, orientation: Orientation, sizes: &[(usize, i32)]) -> bool {
        let count = self.count(orientation);
        let changed: Vec<usize> = {
            let mut config = self.sizes(orientation).write();
            sizes
                .iter()
                .filter(|(position, _)| *position < count)
                .filter(|(position, size)| config.set_size(*position, *size))
                .map(|(position, _)| *position)
                .collect()
        };

        tracing::debug!(
            target: targets::LAYER,
            ?orientation,
            changed = changed.len(),
            "resized"
        );
        match StructuralChangeEvent::resize(self.id(), orientation, &changed, changed.clone()) {
            Some(event) => {
                self.fire_layer_event(event.into());
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // Row / Column Changes
    // =========================================================================

    /// Reports rows the host inserted into the provider, as new indices.
    pub fn rows_inserted(&self, row_indices: &[usize]) {
        self.structure_changed(Orientation::Vertical, StructuralKind::Insert, row_indices);
    }

    /// Reports rows the host deleted from the provider, as former indices.
    pub fn rows_deleted(&self, row_indices: &[usize]) {
        self.structure_changed(Orientation::Vertical, StructuralKind::Delete, row_indices);
    }

    /// Reports columns the host inserted into the provider, as new indices.
    pub fn columns_inserted(&self, column_indices: &[usize]) {
        self.structure_changed(Orientation::Horizontal, StructuralKind::Insert, column_indices);
    }

    /// Reports columns the host deleted from the provider, as former indices.
    pub fn columns_deleted(&self, column_indices: &[usize]) {
        self.structure_changed(Orientation::Horizontal, StructuralKind::Delete, column_indices);
    }

    fn structure_changed(&self, orientation: Orientation, kind: StructuralKind, indices: &[usize]) {
        let mut indices = indices.to_vec();
        indices.sort_unstable();
        indices.dedup();

        let event = {
            let mut sizes = self.sizes(orientation).write();
            match kind {
                StructuralKind::Insert => {
                    sizes.shift_for_insert(&indices);
                    StructuralChangeEvent::from_positions(self.id(), orientation, kind, &[], &indices, indices.clone())
                }
                _ => {
                    sizes.shift_for_delete(&indices);
                    StructuralChangeEvent::from_positions(self.id(), orientation, kind, &indices, &[], indices.clone())
                }
            }
        };

        tracing::debug!(target: targets::LAYER, ?orientation, ?kind, ?indices, "data structure changed");
        if let Some(event) = event {
            self.fire_layer_event(event.into());
        }
    }
}

impl LayerListener for DataLayer {
    fn handle_layer_event(&self, _event: &LayerEvent) {}
}

impl Layer for DataLayer {
    fn base(&self) -> &LayerBase {
        &self.base
    }

    // =========================================================================
    // Horizontal
    // =========================================================================

    fn column_count(&self) -> usize {
        self.provider.column_count()
    }

    fn column_index_by_position(&self, column_position: usize) -> Option<usize> {
        (column_position < self.column_count()).then_some(column_position)
    }

    fn column_position_by_index(&self, column_index: usize) -> Option<usize> {
        (column_index < self.column_count()).then_some(column_index)
    }

    fn width(&self) -> i32 {
        self.column_widths.read().aggregate_size(self.column_count())
    }

    fn column_width_by_position(&self, column_position: usize) -> i32 {
        if column_position < self.column_count() {
            self.column_widths.read().size(column_position)
        } else {
            0
        }
    }

    fn start_x_of_column_position(&self, column_position: usize) -> Option<i32> {
        (column_position < self.column_count())
            .then(|| self.column_widths.read().start_of(column_position))
    }

    fn column_position_by_x(&self, x: i32) -> Option<usize> {
        self.column_widths.read().position_at(x, self.column_count())
    }

    fn is_column_position_resizable(&self, column_position: usize) -> bool {
        column_position < self.column_count() && self.column_widths.read().is_resizable(column_position)
    }

    // =========================================================================
    // Vertical
    // =========================================================================

    fn row_count(&self) -> usize {
        self.provider.row_count()
    }

    fn row_index_by_position(&self, row_position: usize) -> Option<usize> {
        (row_position < self.row_count()).then_some(row_position)
    }

    fn row_position_by_index(&self, row_index: usize) -> Option<usize> {
        (row_index < self.row_count()).then_some(row_index)
    }

    fn height(&self) -> i32 {
        self.row_heights.read().aggregate_size(self.row_count())
    }

    fn row_height_by_position(&self, row_position: usize) -> i32 {
        if row_position < self.row_count() {
            self.row_heights.read().size(row_position)
        } else {
            0
        }
    }

    fn start_y_of_row_position(&self, row_position: usize) -> Option<i32> {
        (row_position < self.row_count()).then(|| self.row_heights.read().start_of(row_position))
    }

    fn row_position_by_y(&self, y: i32) -> Option<usize> {
        self.row_heights.read().position_at(y, self.row_count())
    }

    fn is_row_position_resizable(&self, row_position: usize) -> bool {
        row_position < self.row_count() && self.row_heights.read().is_resizable(row_position)
    }

    // =========================================================================
    // Commands and Cells
    // =========================================================================

    #[tracing::instrument(skip_all, target = "lattice_grid::command", level = "trace", fields(command = command.name()))]
    fn do_command(&self, command: &LayerCommand) -> bool {
        match command {
            LayerCommand::ResizeColumn { .. }
            | LayerCommand::ResizeRow { .. }
            | LayerCommand::MultiResizeColumns { .. }
            | LayerCommand::MultiResizeRows { .. }
            | LayerCommand::UpdateData { .. } => {
                let Some(local) = command.convert_to_target_layer(self) else {
                    return false;
                };
                match local {
                    LayerCommand::ResizeColumn {
                        column_position,
                        width,
                        ..
                    } => {
                        if self.is_column_position_resizable(column_position) {
                            self.set_column_width_by_position(column_position, width);
                        }
                    }
                    LayerCommand::ResizeRow {
                        row_position,
                        height,
                        ..
                    } => {
                        if self.is_row_position_resizable(row_position) {
                            self.set_row_height_by_position(row_position, height);
                        }
                    }
                    LayerCommand::MultiResizeColumns { columns, .. } => {
                        let columns: Vec<(usize, i32)> = columns
                            .into_iter()
                            .filter(|(p, _)| self.is_column_position_resizable(*p))
                            .collect();
                        self.resize(Orientation::Horizontal, &columns);
                    }
                    LayerCommand::MultiResizeRows { rows, .. } => {
                        let rows: Vec<(usize, i32)> = rows
                            .into_iter()
                            .filter(|(p, _)| self.is_row_position_resizable(*p))
                            .collect();
                        self.resize(Orientation::Vertical, &rows);
                    }
                    LayerCommand::UpdateData {
                        column_position,
                        row_position,
                        value,
                        ..
                    } => self.update_data(column_position, row_position, value),
                    _ => {}
                }
                true
            }
            LayerCommand::StructuralRefresh => {
                self.fire_layer_event(LayerEvent::StructuralRefresh { layer: self.id() });
                true
            }
            LayerCommand::VisualRefresh => {
                self.fire_layer_event(LayerEvent::VisualRefresh { layer: self.id() });
                true
            }
            _ => forward_command(self, command),
        }
    }

    fn data_value_by_position(&self, column_position: usize, row_position: usize) -> Option<CellValue> {
        self.provider.data_value(column_position, row_position)
    }
}

impl DataLayer {
    fn update_data(&self, column_index: usize, row_index: usize, value: CellValue) {
        if !self.provider.set_data_value(column_index, row_index, value) {
            tracing::debug!(target: targets::LAYER, column_index, row_index, "provider rejected value");
            return;
        }
        self.fire_layer_event(LayerEvent::DataUpdate {
            layer: self.id(),
            column_position: Some(column_index),
            row_position: Some(row_index),
            column_index,
            row_index,
        });
    }
}

static_assertions::assert_impl_all!(DataLayer: Send, Sync);

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lattice_grid_core::{DiffType, Range, StructuralDiff};
    use parking_lot::Mutex;

    use super::*;
    use crate::data::{DummyDataProvider, VecDataProvider};
    use crate::layer::register_listener;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<LayerEvent>>,
    }

    impl LayerListener for Recorder {
        fn handle_layer_event(&self, event: &LayerEvent) {
            self.events.lock().push(event.clone());
        }
    }

    fn layer(columns: usize, rows: usize) -> Arc<DataLayer> {
        DataLayer::new(Arc::new(DummyDataProvider::new(columns, rows)), 100, 20)
    }

    #[test]
    fn test_geometry() {
        let data = layer(5, 3);
        assert_eq!(data.width(), 500);
        assert_eq!(data.height(), 60);
        assert_eq!(data.start_x_of_column_position(2), Some(200));
        assert_eq!(data.start_x_of_column_position(5), None);
        assert_eq!(data.column_position_by_x(250), Some(2));
        assert_eq!(data.row_position_by_y(60), None);
        assert_eq!(data.column_index_by_position(4), Some(4));
        assert_eq!(data.column_index_by_position(5), None);
    }

    #[test]
    fn test_resize_command_fires_change_event() {
        let data = layer(5, 3);
        let recorder = Arc::new(Recorder::default());
        let as_layer: Arc<dyn Layer> = data.clone();
        register_listener(&as_layer, &recorder);

        assert!(data.do_command(&LayerCommand::ResizeColumn {
            layer: as_layer.clone(),
            column_position: 1,
            width: 150,
        }));
        assert_eq!(data.column_width_by_position(1), 150);
        assert_eq!(data.width(), 550);

        let events = recorder.events.lock();
        assert_eq!(events.len(), 1);
        let diffs = events[0].column_diffs().unwrap();
        assert_eq!(diffs.to_vec(), vec![StructuralDiff::change(Range::single(1))]);
    }

    #[test]
    fn test_row_resize_is_reported_as_change() {
        let data = layer(2, 4);
        let recorder = Arc::new(Recorder::default());
        let as_layer: Arc<dyn Layer> = data.clone();
        register_listener(&as_layer, &recorder);

        data.set_row_height_by_position(2, 35);
        let events = recorder.events.lock();
        let diffs = events[0].row_diffs().unwrap();
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].diff_type, DiffType::Change);
        assert_eq!(diffs[0].before, Range::single(2));
    }

    #[test]
    fn test_unchanged_resize_fires_nothing() {
        let data = layer(2, 2);
        let recorder = Arc::new(Recorder::default());
        let as_layer: Arc<dyn Layer> = data.clone();
        register_listener(&as_layer, &recorder);

        assert!(!data.set_column_width_by_position(0, 100));
        assert!(!data.set_column_width_by_position(9, 10));
        assert!(recorder.events.lock().is_empty());
    }

    #[test]
    fn test_non_resizable_column_ignores_command() {
        let data = layer(3, 1);
        data.set_column_resizable(0, false);
        let as_layer: Arc<dyn Layer> = data.clone();
        assert!(data.do_command(&LayerCommand::ResizeColumn {
            layer: as_layer,
            column_position: 0,
            width: 10,
        }));
        assert_eq!(data.column_width_by_position(0), 100);
    }

    #[test]
    fn test_update_data() {
        let provider = Arc::new(VecDataProvider::new(1, vec![vec!["a".into()]]));
        let data = DataLayer::new(provider, 10, 10);
        let recorder = Arc::new(Recorder::default());
        let as_layer: Arc<dyn Layer> = data.clone();
        register_listener(&as_layer, &recorder);

        data.do_command(&LayerCommand::UpdateData {
            layer: as_layer,
            column_position: 0,
            row_position: 0,
            value: "b".into(),
        });
        assert_eq!(data.data_value_by_position(0, 0), Some(CellValue::from("b")));
        assert!(matches!(
            recorder.events.lock()[0],
            LayerEvent::DataUpdate { column_index: 0, row_index: 0, .. }
        ));
    }

    #[test]
    fn test_rows_deleted_shifts_heights() {
        let provider = Arc::new(VecDataProvider::new(1, vec![vec![]; 4]));
        let data = DataLayer::new(provider.clone(), 10, 10);
        data.set_row_height_by_position(3, 40);

        provider.remove_row(1);
        data.rows_deleted(&[1]);
        assert_eq!(data.row_count(), 3);
        assert_eq!(data.row_height_by_position(2), 40);
    }
}
