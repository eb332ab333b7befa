//! End-to-end behaviour of assembled layer stacks.

use std::sync::Arc;
use std::time::Duration;

use lattice_grid::layer::register_listener;
use lattice_grid::{
    CellValue, DataLayer, DataProvider, DefaultGridLayer, DummyDataProvider, GridConfig, HideShowLayer, Layer,
    LayerCommand, LayerEvent, LayerListener, Range, ReorderLayer, StructuralKind, UpdateCacheConfig,
    UpdateEventsCache, VecDataProvider, ViewportLayer,
};
use lattice_grid_core::{DiffType, Orientation, StructuralDiff};
use parking_lot::Mutex;

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<LayerEvent>>,
}

impl LayerListener for Recorder {
    fn handle_layer_event(&self, event: &LayerEvent) {
        self.events.lock().push(event.clone());
    }
}

impl Recorder {
    fn structural(&self, kind: StructuralKind) -> Vec<LayerEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| matches!(event, LayerEvent::Structural(s) if s.kind == kind))
            .cloned()
            .collect()
    }
}

/// Set `RUST_LOG=lattice_grid=trace` to see the command and event flow.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn default_grid(columns: usize, rows: usize) -> DefaultGridLayer {
    init_tracing();
    let provider = Arc::new(DummyDataProvider::new(columns, rows));
    let grid = DefaultGridLayer::new(provider, Vec::new(), &GridConfig::default()).unwrap();
    grid.layer().do_command(&LayerCommand::ClientAreaResize {
        width: 540,
        height: 220,
    });
    grid
}

#[test]
fn scenario_a_resize_one_grid_column() {
    let grid = default_grid(20, 20);
    let layer = grid.layer();
    let recorder = Arc::new(Recorder::default());
    register_listener(&layer, &recorder);

    let before: Vec<i32> = (0..layer.column_count())
        .map(|p| layer.column_width_by_position(p))
        .collect();
    assert!(layer.do_command(&LayerCommand::ResizeColumn {
        layer: layer.clone(),
        column_position: 2,
        width: 150,
    }));

    assert_eq!(layer.column_width_by_position(2), 150);
    for (position, width) in before.iter().enumerate().filter(|(p, _)| *p != 2) {
        assert_eq!(layer.column_width_by_position(position), *width);
    }
    let data = grid.body().data_layer();
    for index in 0..20 {
        let expected = if index == 1 { 150 } else { 100 };
        assert_eq!(data.column_width_by_position(index), expected);
    }

    let resizes = recorder.structural(StructuralKind::Resize);
    assert!(!resizes.is_empty());
    assert!(resizes.iter().all(|event| match event {
        LayerEvent::Structural(s) => {
            s.layer == layer.id()
                && s.orientation == Orientation::Horizontal
                && s.diffs == vec![StructuralDiff::change(Range::new(2, 3))]
        }
        _ => false,
    }));
}

#[test]
fn scenario_b_hide_and_show_column_index() {
    let data = DataLayer::new(Arc::new(DummyDataProvider::new(10, 10)), 100, 20);
    let hide_show = HideShowLayer::new(data);

    assert!(hide_show.hide_column_indices(&[3]));
    assert_eq!(hide_show.column_count(), 9);
    assert_eq!(hide_show.column_index_by_position(3), Some(4));
    assert_eq!(hide_show.column_position_by_index(3), None);

    assert!(hide_show.show_column_indices(&[3]));
    assert_eq!(hide_show.column_count(), 10);
    for position in 0..10 {
        assert_eq!(hide_show.column_index_by_position(position), Some(position));
    }
}

#[test]
fn scenario_c_update_cache_expires() {
    let cache = UpdateEventsCache::new(&UpdateCacheConfig {
        time_to_live_ms: 100,
        initial_delay_ms: 50,
    })
    .unwrap();
    for column_index in 0..2 {
        cache.add_event(&LayerEvent::DataUpdate {
            layer: lattice_grid::LayerId::next(),
            column_position: Some(column_index),
            row_position: Some(0),
            column_index,
            row_index: 0,
        });
    }
    assert_eq!(cache.count(), 2);

    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(cache.count(), 0);
}

#[test]
fn grid_updates_reach_the_cache() {
    let values = (0..5)
        .map(|r| vec![CellValue::Int(r), CellValue::Int(r * 10)])
        .collect();
    let provider = Arc::new(VecDataProvider::new(2, values));
    let grid = DefaultGridLayer::new(provider, Vec::new(), &GridConfig::default()).unwrap();
    let layer = grid.layer();
    let cache = Arc::new(
        UpdateEventsCache::new(&UpdateCacheConfig {
            time_to_live_ms: 60_000,
            initial_delay_ms: 60_000,
        })
        .unwrap(),
    );
    register_listener(&layer, &cache);

    grid.body().reorder_layer().reorder_column_position(1, 0);
    assert!(layer.do_command(&LayerCommand::UpdateData {
        layer: layer.clone(),
        column_position: 1,
        row_position: 3,
        value: CellValue::Int(99),
    }));
    assert_eq!(layer.data_value_by_position(1, 3), Some(CellValue::Int(99)));
    assert!(cache.contains(1, 2));
    assert_eq!(cache.count(), 1);
}

#[test]
fn reorder_onto_itself_is_a_silent_no_op() {
    let data = DataLayer::new(Arc::new(DummyDataProvider::new(5, 5)), 100, 20);
    let reorder = ReorderLayer::new(data);
    let recorder = Arc::new(Recorder::default());
    register_listener(&(reorder.clone() as Arc<dyn Layer>), &recorder);

    assert!(!reorder.reorder_column_position(2, 2));
    assert!(!reorder.reorder_column_position(2, 3));
    assert_eq!(reorder.column_index_order(), vec![0, 1, 2, 3, 4]);
    assert!(recorder.events.lock().is_empty());
}

#[test]
fn viewport_origin_clamps_to_scrollable_range() {
    let data = DataLayer::new(Arc::new(DummyDataProvider::new(10, 10)), 100, 20);
    let viewport = ViewportLayer::new(data);
    viewport.set_client_area(250, 100);

    viewport.set_origin_x(10_000);
    assert_eq!(viewport.origin_x(), 1000 - 250);
    viewport.set_origin_x(-40);
    assert_eq!(viewport.origin_x(), 0);
}

#[test]
fn row_resize_reports_change_diffs_through_the_grid() {
    let grid = default_grid(5, 20);
    let layer = grid.layer();
    let recorder = Arc::new(Recorder::default());
    register_listener(&layer, &recorder);

    assert!(layer.do_command(&LayerCommand::ResizeRow {
        layer: layer.clone(),
        row_position: 3,
        height: 45,
    }));
    assert_eq!(layer.row_height_by_position(3), 45);

    let resizes = recorder.structural(StructuralKind::Resize);
    assert!(!resizes.is_empty());
    for event in resizes {
        let LayerEvent::Structural(s) = event else {
            unreachable!()
        };
        assert_eq!(s.orientation, Orientation::Vertical);
        assert!(!s.diffs.is_empty());
        assert!(s.diffs.iter().all(|diff| diff.diff_type == DiffType::Change));
        assert_eq!(s.diffs[0].after, Range::new(3, 4));
    }
}

#[test]
fn frozen_boundary_follows_deleted_rows() {
    let values = (0..10).map(|r| vec![CellValue::Int(r)]).collect();
    let provider = Arc::new(VecDataProvider::new(1, values));
    let grid = DefaultGridLayer::new(provider.clone(), Vec::new(), &GridConfig::default()).unwrap();
    let body = grid.body();
    body.freeze_layer().freeze_row(4);
    assert_eq!(body.freeze_layer().freeze_layer().bottom_right().row_position, 5);

    provider.remove_row(3);
    provider.remove_row(2);
    body.data_layer().rows_deleted(&[2, 3]);
    assert_eq!(body.freeze_layer().freeze_layer().bottom_right().row_position, 3);
    assert_eq!(body.viewport_layer().minimum_origin().1, 3);
}

fn wide_grid(provider: Arc<dyn DataProvider>) -> DefaultGridLayer {
    init_tracing();
    let grid = DefaultGridLayer::new(provider, Vec::new(), &GridConfig::default()).unwrap();
    grid.layer().do_command(&LayerCommand::ClientAreaResize {
        width: 2000,
        height: 2000,
    });
    grid
}

#[test]
fn hiding_the_last_column_reaches_the_grid() {
    let grid = wide_grid(Arc::new(DummyDataProvider::new(5, 5)));
    let layer = grid.layer();
    let recorder = Arc::new(Recorder::default());
    register_listener(&layer, &recorder);

    let columns = layer.column_count();
    let last = columns - 1;
    assert_eq!(layer.column_index_by_position(last), Some(4));
    assert!(layer.do_command(&LayerCommand::HideColumns {
        layer: layer.clone(),
        column_positions: vec![last],
    }));

    assert_eq!(layer.column_count(), columns - 1);
    let hides = recorder.structural(StructuralKind::Hide);
    assert_eq!(hides.len(), 1);
    let LayerEvent::Structural(hide) = &hides[0] else {
        unreachable!()
    };
    assert_eq!(hide.layer, layer.id());
    assert_eq!(hide.orientation, Orientation::Horizontal);
    assert_eq!(hide.diffs, vec![StructuralDiff::delete(Range::single(last))]);
}

#[test]
fn deleting_the_last_row_reaches_the_grid() {
    let values = (0..5).map(|r| vec![CellValue::Int(r)]).collect();
    let provider = Arc::new(VecDataProvider::new(1, values));
    let grid = wide_grid(provider.clone());
    let layer = grid.layer();
    let recorder = Arc::new(Recorder::default());
    register_listener(&layer, &recorder);

    let rows = layer.row_count();
    let last = rows - 1;
    provider.remove_row(4);
    grid.body().data_layer().rows_deleted(&[4]);

    assert_eq!(layer.row_count(), rows - 1);
    let deletes = recorder.structural(StructuralKind::Delete);
    assert!(!deletes.is_empty());
    for event in deletes {
        let LayerEvent::Structural(delete) = event else {
            unreachable!()
        };
        assert_eq!(delete.orientation, Orientation::Vertical);
        assert_eq!(delete.diffs, vec![StructuralDiff::delete(Range::single(last))]);
    }
}

#[test]
fn hiding_the_last_frozen_column_reaches_the_freeze_layer() {
    let grid = wide_grid(Arc::new(DummyDataProvider::new(5, 5)));
    let body = grid.body();
    body.freeze_layer().freeze_column(2);
    let freeze = body.freeze_layer().freeze_layer();
    assert_eq!(freeze.column_count(), 3);

    let recorder = Arc::new(Recorder::default());
    let freeze_layer: Arc<dyn Layer> = freeze.clone();
    register_listener(&freeze_layer, &recorder);
    let grid_recorder = Arc::new(Recorder::default());
    register_listener(&grid.layer(), &grid_recorder);

    assert!(body.hide_show_layer().hide_column_indices(&[2]));
    assert_eq!(freeze.column_count(), 2);
    let hides = recorder.structural(StructuralKind::Hide);
    assert_eq!(hides.len(), 1);
    let LayerEvent::Structural(hide) = &hides[0] else {
        unreachable!()
    };
    assert_eq!(hide.layer, freeze.id());
    assert_eq!(hide.ranges, vec![Range::single(2)]);
    assert!(!grid_recorder.structural(StructuralKind::Hide).is_empty());
}

#[test]
fn dispose_releases_listeners() {
    let grid = default_grid(3, 3);
    let layer = grid.layer();
    let recorder = Arc::new(Recorder::default());
    register_listener(&layer, &recorder);
    assert_eq!(layer.base().listener_count(), 1);

    layer.do_command(&LayerCommand::Dispose);
    assert_eq!(layer.base().listener_count(), 0);
    assert_eq!(grid.body().data_layer().base().listener_count(), 0);
}
