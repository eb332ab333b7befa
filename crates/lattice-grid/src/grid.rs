//! Assembled grids.
//!
//! [`BodyLayerStack`] builds the standard body over a data provider,
//! [`GridLayer`] puts a body and its headers into the four grid regions, and
//! [`DefaultGridLayer`] does both with headers generated from the body's
//! provider.

use std::sync::Arc;

use lattice_grid_core::logging::targets;
use lattice_grid_core::{GridConfig, Orientation, Result};

use crate::command::{CellMeasure, LayerCommand};
use crate::data::{ColumnHeaderDataProvider, CornerDataProvider, DataProvider, RowHeaderDataProvider};
use crate::label::{BODY, COLUMN_HEADER, CORNER, ROW_HEADER};
use crate::layer::{
    ColumnGroupModel, ColumnGroupReorderLayer, CompositeCommandHandler, CompositeFreezeLayer, CompositeLayer,
    DataLayer, DimensionallyDependentLayer, HideShowLayer, Layer, ReorderLayer, SelectionLayer, ViewportLayer,
};

// =============================================================================
// Body
// =============================================================================

/// data → reorder → column groups → hide/show → selection → viewport, with
/// the viewport wrapped into a [`CompositeFreezeLayer`].
#[derive(Clone)]
pub struct BodyLayerStack {
    data: Arc<DataLayer>,
    reorder: Arc<ReorderLayer>,
    column_groups: Arc<ColumnGroupReorderLayer>,
    hide_show: Arc<HideShowLayer>,
    selection: Arc<SelectionLayer>,
    viewport: Arc<ViewportLayer>,
    freeze: CompositeFreezeLayer,
}

impl BodyLayerStack {
    /// Builds a body with no column groups.
    pub fn new(provider: Arc<dyn DataProvider>, config: &GridConfig) -> Result<Self> {
        Self::with_column_groups(provider, Arc::new(ColumnGroupModel::new()), config)
    }

    /// Builds a body whose column reordering respects `groups`.
    pub fn with_column_groups(
        provider: Arc<dyn DataProvider>,
        groups: Arc<ColumnGroupModel>,
        config: &GridConfig,
    ) -> Result<Self> {
        config.validate()?;

        let data = DataLayer::from_config(provider, config);
        let reorder = ReorderLayer::new(data.clone());
        let column_groups = ColumnGroupReorderLayer::new(reorder.clone(), groups);
        let hide_show = HideShowLayer::new(column_groups.clone());
        let selection = SelectionLayer::new(hide_show.clone());
        let viewport = ViewportLayer::new(selection.clone());
        let freeze = CompositeFreezeLayer::new(selection.clone(), viewport.clone())?;

        tracing::debug!(
            target: targets::LAYER,
            data = %data.id(),
            body = %freeze.composite().id(),
            "body layer stack built"
        );
        Ok(Self {
            data,
            reorder,
            column_groups,
            hide_show,
            selection,
            viewport,
            freeze,
        })
    }

    /// The top of the stack.
    pub fn layer(&self) -> Arc<dyn Layer> {
        self.freeze.layer()
    }

    /// The data layer.
    pub fn data_layer(&self) -> &Arc<DataLayer> {
        &self.data
    }

    /// The reorder layer.
    pub fn reorder_layer(&self) -> &Arc<ReorderLayer> {
        &self.reorder
    }

    /// The column group validation layer.
    pub fn column_group_layer(&self) -> &Arc<ColumnGroupReorderLayer> {
        &self.column_groups
    }

    /// The hide/show layer.
    pub fn hide_show_layer(&self) -> &Arc<HideShowLayer> {
        &self.hide_show
    }

    /// The selection layer.
    pub fn selection_layer(&self) -> &Arc<SelectionLayer> {
        &self.selection
    }

    /// The scrolling viewport.
    pub fn viewport_layer(&self) -> &Arc<ViewportLayer> {
        &self.viewport
    }

    /// The freeze composite on top.
    pub fn freeze_layer(&self) -> &CompositeFreezeLayer {
        &self.freeze
    }
}

impl std::fmt::Debug for BodyLayerStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyLayerStack")
            .field("data", &self.data.id())
            .field("selection", &self.selection.id())
            .field("viewport", &self.viewport.id())
            .field("freeze", &self.freeze)
            .finish()
    }
}

// =============================================================================
// Grid
// =============================================================================

/// Grid-level commands: client area split and column auto-sizing.
struct GridCommandHandler;

impl GridCommandHandler {
    fn body(grid: &CompositeLayer) -> Option<Arc<dyn Layer>> {
        grid.child_layer(1, 1)
    }

    /// The body gets what the headers leave.
    fn resize_client_area(grid: &CompositeLayer, width: i32, height: i32) -> bool {
        let Some(body) = Self::body(grid) else {
            return false;
        };
        let body_width = (width - grid.layout_column_width(0)).max(0);
        let body_height = (height - grid.layout_row_height(0)).max(0);
        tracing::debug!(target: targets::LAYER, width, height, body_width, body_height, "grid client area resized");
        body.do_command(&LayerCommand::ClientAreaResize {
            width: body_width,
            height: body_height,
        });
        true
    }

    /// Sizes columns to their widest cell over every row, scrolled or not.
    fn auto_resize_columns(
        grid: &CompositeLayer,
        column_positions: &[usize],
        measure: &Arc<dyn CellMeasure>,
    ) -> bool {
        let (Some(this), Some(body)) = (grid.base().this(), Self::body(grid)) else {
            return false;
        };
        let header_columns = grid.child_layer(0, 0).map_or(0, |corner| corner.column_count());

        // Body columns move when the viewport opens up; remember them by index.
        let targets: Vec<(bool, usize)> = column_positions
            .iter()
            .filter_map(|&position| {
                if position < header_columns {
                    Some((true, position))
                } else {
                    grid.column_index_by_position(position).map(|index| (false, index))
                }
            })
            .collect();

        body.do_command(&LayerCommand::TurnViewportOff);
        let rows = grid.row_count();
        let columns: Vec<(usize, i32)> = targets
            .into_iter()
            .filter_map(|(is_header, key)| {
                let position = if is_header {
                    key
                } else {
                    grid.column_position_by_index(key)?
                };
                let width = (0..rows)
                    .filter_map(|row| grid.cell_by_position(position, row))
                    .map(|cell| measure.preferred_width(&cell))
                    .max()?;
                Some((position, width))
            })
            .collect();

        tracing::debug!(target: targets::LAYER, ?columns, "auto-resizing columns");
        if !columns.is_empty() {
            this.do_command(&LayerCommand::MultiResizeColumns {
                layer: this.clone(),
                columns,
            });
        }
        body.do_command(&LayerCommand::TurnViewportOn);
        true
    }
}

impl CompositeCommandHandler for GridCommandHandler {
    fn do_command(&self, composite: &CompositeLayer, command: &LayerCommand) -> bool {
        match command {
            LayerCommand::ClientAreaResize { width, height } => {
                Self::resize_client_area(composite, *width, *height)
            }
            LayerCommand::AutoResizeColumns { .. } => match command.convert_to_target_layer(composite) {
                Some(LayerCommand::AutoResizeColumns {
                    column_positions,
                    measure,
                    ..
                }) => Self::auto_resize_columns(composite, &column_positions, &measure),
                _ => false,
            },
            _ => false,
        }
    }
}

/// The four-region composite of a grid.
///
/// Regions are registered body first, so context-free commands reach the
/// body before any header.
#[derive(Clone)]
pub struct GridLayer {
    composite: Arc<CompositeLayer>,
}

impl GridLayer {
    /// Places the regions and installs the grid command handler.
    pub fn new(
        body: Arc<dyn Layer>,
        column_header: Arc<dyn Layer>,
        row_header: Arc<dyn Layer>,
        corner: Arc<dyn Layer>,
    ) -> Result<Self> {
        let composite = CompositeLayer::new(2, 2);
        composite.set_child_layer(BODY, body, 1, 1)?;
        composite.set_child_layer(COLUMN_HEADER, column_header, 1, 0)?;
        composite.set_child_layer(ROW_HEADER, row_header, 0, 1)?;
        composite.set_child_layer(CORNER, corner, 0, 0)?;
        composite.add_command_handler(Arc::new(GridCommandHandler));
        Ok(Self { composite })
    }

    /// The grid, as a layer.
    pub fn layer(&self) -> Arc<dyn Layer> {
        self.composite.clone()
    }

    /// The grid composite.
    pub fn composite(&self) -> &Arc<CompositeLayer> {
        &self.composite
    }

    /// The layer in a region, by its label.
    pub fn region(&self, label: &str) -> Option<Arc<dyn Layer>> {
        self.composite.child_layer_by_label(label)
    }
}

impl std::fmt::Debug for GridLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("GridLayer").field(&self.composite).finish()
    }
}

// =============================================================================
// Default Grid
// =============================================================================

/// A body stack with a named column header, a numbered row header and a
/// corner.
#[derive(Clone)]
pub struct DefaultGridLayer {
    grid: GridLayer,
    body: BodyLayerStack,
    column_header: Arc<DimensionallyDependentLayer>,
    row_header: Arc<DimensionallyDependentLayer>,
    corner: Arc<DimensionallyDependentLayer>,
}

impl DefaultGridLayer {
    /// Builds the grid. Columns without a name in `column_names` are numbered.
    pub fn new(provider: Arc<dyn DataProvider>, column_names: Vec<String>, config: &GridConfig) -> Result<Self> {
        let body = BodyLayerStack::new(provider.clone(), config)?;
        Self::with_body(body, provider, column_names, config)
    }

    /// Builds headers and a corner around an existing body.
    pub fn with_body(
        body: BodyLayerStack,
        provider: Arc<dyn DataProvider>,
        column_names: Vec<String>,
        config: &GridConfig,
    ) -> Result<Self> {
        config.validate()?;
        let body_layer = body.layer();
        let column_width = config.default_column_width as i32;
        let row_height = config.default_row_height as i32;
        let header_height = config.column_header_height as i32;
        let header_width = config.row_header_width as i32;

        let column_header_data = DataLayer::new(
            Arc::new(ColumnHeaderDataProvider::new(provider.clone(), column_names)),
            column_width,
            header_height,
        );
        let column_header =
            DimensionallyDependentLayer::new(column_header_data.clone(), body_layer.clone(), column_header_data);
        column_header.set_selection_layer(body.selection_layer(), Orientation::Horizontal);

        let row_header_data = DataLayer::new(
            Arc::new(RowHeaderDataProvider::new(provider)),
            header_width,
            row_height,
        );
        let row_header = DimensionallyDependentLayer::new(row_header_data.clone(), row_header_data, body_layer.clone());
        row_header.set_selection_layer(body.selection_layer(), Orientation::Vertical);

        let corner_data = DataLayer::new(Arc::new(CornerDataProvider), header_width, header_height);
        let corner = DimensionallyDependentLayer::new(corner_data, row_header.clone(), column_header.clone());

        let grid = GridLayer::new(body_layer, column_header.clone(), row_header.clone(), corner.clone())?;
        tracing::debug!(target: targets::LAYER, grid = %grid.composite().id(), "default grid built");
        Ok(Self {
            grid,
            body,
            column_header,
            row_header,
            corner,
        })
    }

    /// The grid, as a layer.
    pub fn layer(&self) -> Arc<dyn Layer> {
        self.grid.layer()
    }

    /// The grid composite.
    pub fn grid(&self) -> &GridLayer {
        &self.grid
    }

    /// The body stack.
    pub fn body(&self) -> &BodyLayerStack {
        &self.body
    }

    /// The column header region.
    pub fn column_header(&self) -> &Arc<DimensionallyDependentLayer> {
        &self.column_header
    }

    /// The row header region.
    pub fn row_header(&self) -> &Arc<DimensionallyDependentLayer> {
        &self.row_header
    }

    /// The corner region.
    pub fn corner(&self) -> &Arc<DimensionallyDependentLayer> {
        &self.corner
    }
}

impl std::fmt::Debug for DefaultGridLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultGridLayer")
            .field("grid", &self.grid)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(BodyLayerStack: Send, Sync);
static_assertions::assert_impl_all!(DefaultGridLayer: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CellValue, DummyDataProvider};
    use crate::layer::{DisplayMode, LayerCell, SelectionModifiers};

    fn grid(columns: usize, rows: usize) -> DefaultGridLayer {
        let provider = Arc::new(DummyDataProvider::new(columns, rows));
        let names = vec!["Name".to_string(), "Age".to_string()];
        let grid = DefaultGridLayer::new(provider, names, &GridConfig::default()).unwrap();
        assert!(grid.layer().do_command(&LayerCommand::ClientAreaResize {
            width: 540,
            height: 220,
        }));
        grid
    }

    #[test]
    fn test_client_area_is_split_between_regions() {
        let grid = grid(20, 20);
        let layer = grid.layer();
        assert_eq!(grid.body().viewport_layer().client_area(), Some((500, 200)));
        assert_eq!(layer.column_count(), 1 + 5);
        assert_eq!(layer.row_count(), 1 + 10);
        assert_eq!(layer.width(), 540);
        assert_eq!(layer.height(), 220);
    }

    #[test]
    fn test_regions_and_headers() {
        let grid = grid(20, 20);
        let layer = grid.layer();
        assert_eq!(layer.region_label_by_position(0, 0).as_deref(), Some(CORNER));
        assert_eq!(layer.region_label_by_position(1, 0).as_deref(), Some(COLUMN_HEADER));
        assert_eq!(layer.region_label_by_position(0, 1).as_deref(), Some(ROW_HEADER));
        assert_eq!(layer.region_label_by_position(1, 1).as_deref(), Some(BODY));

        assert_eq!(layer.data_value_by_position(1, 0), Some(CellValue::Text("Name".into())));
        assert_eq!(layer.data_value_by_position(3, 0), Some(CellValue::Text("Column 3".into())));
        assert_eq!(layer.data_value_by_position(0, 2), Some(CellValue::Int(2)));
        assert_eq!(layer.data_value_by_position(1, 1), Some(CellValue::Text("0, 0".into())));
        assert!(layer.config_labels_by_position(2, 2).contains(BODY));
    }

    #[test]
    fn test_headers_follow_body() {
        let grid = grid(20, 20);
        let layer = grid.layer();
        grid.body().reorder_layer().reorder_column_position(0, 3);
        assert_eq!(layer.data_value_by_position(1, 0), Some(CellValue::Text("Age".into())));
        assert_eq!(layer.data_value_by_position(3, 0), Some(CellValue::Text("Name".into())));

        grid.body().viewport_layer().set_origin_y(40);
        assert_eq!(layer.data_value_by_position(0, 1), Some(CellValue::Int(3)));
    }

    #[test]
    fn test_header_highlights_selected_column() {
        let grid = grid(20, 20);
        let layer = grid.layer();
        assert!(layer.do_command(&LayerCommand::SelectColumn {
            layer: layer.clone(),
            column_position: 2,
            modifiers: SelectionModifiers::NONE,
        }));
        assert_eq!(layer.display_mode_by_position(2, 0), DisplayMode::Select);
        assert_eq!(layer.display_mode_by_position(3, 0), DisplayMode::Normal);
        assert_eq!(layer.display_mode_by_position(2, 5), DisplayMode::Select);
    }

    #[test]
    fn test_resize_through_grid_moves_header_too() {
        let grid = grid(20, 20);
        let layer = grid.layer();
        assert!(layer.do_command(&LayerCommand::ResizeColumn {
            layer: layer.clone(),
            column_position: 2,
            width: 150,
        }));
        assert_eq!(grid.body().data_layer().column_width_by_position(1), 150);
        assert_eq!(layer.column_width_by_position(2), 150);
        assert_eq!(layer.start_x_of_column_position(3), Some(40 + 100 + 150));
    }

    struct TextWidth;

    impl CellMeasure for TextWidth {
        fn preferred_width(&self, cell: &LayerCell) -> i32 {
            cell.data_value
                .as_ref()
                .map_or(0, |value| value.to_string().len() as i32 * 10)
        }
    }

    #[test]
    fn test_auto_resize_measures_scrolled_out_rows() {
        let provider = Arc::new(crate::data::VecDataProvider::new(
            2,
            (0..20)
                .map(|r| {
                    let text = if r == 19 { "x".repeat(30) } else { "x".into() };
                    vec![CellValue::Text(text), CellValue::Empty]
                })
                .collect(),
        ));
        let grid = DefaultGridLayer::new(provider, Vec::new(), &GridConfig::default()).unwrap();
        let layer = grid.layer();
        layer.do_command(&LayerCommand::ClientAreaResize {
            width: 540,
            height: 220,
        });

        assert!(layer.do_command(&LayerCommand::AutoResizeColumns {
            layer: layer.clone(),
            column_positions: vec![1],
            measure: Arc::new(TextWidth),
        }));
        assert_eq!(grid.body().data_layer().column_width_by_position(0), 300);
        assert_eq!(grid.body().data_layer().column_width_by_position(1), 100);
        assert!(!grid.body().viewport_layer().is_viewport_off());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = GridConfig {
            default_row_height: 0,
            ..GridConfig::default()
        };
        let provider = Arc::new(DummyDataProvider::new(2, 2));
        assert!(DefaultGridLayer::new(provider, Vec::new(), &config).is_err());
    }
}
