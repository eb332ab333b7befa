//! The scrollable window over a layer.
//!
//! The viewport keeps a pixel origin per axis and a client area supplied by
//! the host. Its positions are the underlying positions that intersect the
//! client area, starting at the origin. The origin is pinned to an underlying
//! position, so it follows inserts and deletes before it and keeps showing
//! the same cells.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use lattice_grid_core::logging::targets;
use lattice_grid_core::{DiffType, LayerId, Orientation, Range, StructuralDiff, shift_boundary};
use parking_lot::RwLock;

use super::{
    Layer, LayerBase, LayerListener, axis, forward_command, propagate_converted, propagate_converted_with,
};
use crate::command::LayerCommand;
use crate::event::{LayerEvent, StructuralKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ViewportAxis {
    /// Underlying position at the leading edge.
    origin_position: usize,
    /// Pixels of the origin position scrolled out of view.
    origin_offset: i32,
    /// Positions before this one are never shown.
    min_origin_position: usize,
    /// Visible extent; `None` until the host reports a client area.
    client_size: Option<i32>,
}

/// A scrollable window over the underlying layer.
pub struct ViewportLayer {
    base: LayerBase,
    underlying: Arc<dyn Layer>,
    columns: RwLock<ViewportAxis>,
    rows: RwLock<ViewportAxis>,
    off: AtomicBool,
}

impl ViewportLayer {
    /// Wraps `underlying` with the origin at 0 and no client area.
    pub fn new(underlying: Arc<dyn Layer>) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| {
            underlying.add_layer_listener(this.clone());
            Self {
                base: LayerBase::new(this.clone()),
                underlying,
                columns: RwLock::new(ViewportAxis::default()),
                rows: RwLock::new(ViewportAxis::default()),
                off: AtomicBool::new(false),
            }
        })
    }

    fn state(&self, orientation: Orientation) -> &RwLock<ViewportAxis> {
        match orientation {
            Orientation::Horizontal => &self.columns,
            Orientation::Vertical => &self.rows,
        }
    }

    // =========================================================================
    // Underlying Geometry
    // =========================================================================

    /// Start of an underlying position; the end of the axis past the last one.
    fn underlying_start(&self, orientation: Orientation, position: usize) -> i32 {
        let underlying = self.underlying.as_ref();
        if position >= axis::count(underlying, orientation) {
            return axis::extent(underlying, orientation);
        }
        axis::start_by_position(underlying, orientation, position)
            .unwrap_or_else(|| axis::extent(underlying, orientation))
    }

    fn origin_px_of(&self, orientation: Orientation, state: &ViewportAxis) -> i32 {
        self.underlying_start(orientation, state.origin_position) + state.origin_offset
    }

    /// Splits a pixel origin into a position and an offset into it, after
    /// clamping it to `[min_origin, max(min_origin, extent - client)]`.
    fn clamp_origin(&self, orientation: Orientation, state: &ViewportAxis, px: i32) -> (usize, i32) {
        let underlying = self.underlying.as_ref();
        let count = axis::count(underlying, orientation);
        let extent = axis::extent(underlying, orientation);
        let min_px = self.underlying_start(orientation, state.min_origin_position);
        let max_px = match state.client_size {
            Some(client) => min_px.max(extent - client),
            None => min_px,
        };
        let px = px.clamp(min_px, max_px);

        let position = if px >= extent {
            count
        } else {
            axis::position_by_offset(underlying, orientation, px).unwrap_or(count)
        };
        let position = position.max(state.min_origin_position.min(count));
        (position, px - self.underlying_start(orientation, position))
    }

    /// Number of positions intersecting the client area.
    fn visible_count(&self, orientation: Orientation) -> usize {
        let state = *self.state(orientation).read();
        let count = axis::count(self.underlying.as_ref(), orientation);
        if self.is_viewport_off() {
            return count.saturating_sub(state.min_origin_position);
        }
        let Some(client) = state.client_size else {
            return count.saturating_sub(state.origin_position);
        };
        let end_px = self.origin_px_of(orientation, &state).saturating_add(client);
        let mut position = state.origin_position;
        while position < count && self.underlying_start(orientation, position) < end_px {
            position += 1;
        }
        position.saturating_sub(state.origin_position)
    }

    /// The underlying position shown at local position 0.
    fn first_position(&self, orientation: Orientation) -> usize {
        let state = self.state(orientation).read();
        if self.is_viewport_off() {
            state.min_origin_position
        } else {
            state.origin_position
        }
    }

    /// Pixel origin used for local offsets.
    fn local_origin_px(&self, orientation: Orientation) -> i32 {
        let state = *self.state(orientation).read();
        if self.is_viewport_off() {
            self.underlying_start(orientation, state.min_origin_position)
        } else {
            self.origin_px_of(orientation, &state)
        }
    }

    fn local_to_underlying(&self, orientation: Orientation, position: usize) -> Option<usize> {
        (position < self.visible_count(orientation)).then(|| self.first_position(orientation) + position)
    }

    fn underlying_to_local(&self, orientation: Orientation, position: usize) -> Option<usize> {
        let local = position.checked_sub(self.first_position(orientation))?;
        (local < self.visible_count(orientation)).then_some(local)
    }

    fn extent(&self, orientation: Orientation) -> i32 {
        let total = axis::extent(self.underlying.as_ref(), orientation);
        let remaining = (total - self.local_origin_px(orientation)).max(0);
        match self.state(orientation).read().client_size {
            Some(client) if !self.is_viewport_off() => remaining.min(client.max(0)),
            _ => remaining,
        }
    }

    fn start_of(&self, orientation: Orientation, position: usize) -> Option<i32> {
        let underlying = self.local_to_underlying(orientation, position)?;
        let start = axis::start_by_position(self.underlying.as_ref(), orientation, underlying)?;
        Some(start - self.local_origin_px(orientation))
    }

    fn position_at(&self, orientation: Orientation, offset: i32) -> Option<usize> {
        if offset < 0 || offset >= self.extent(orientation) {
            return None;
        }
        let underlying = axis::position_by_offset(
            self.underlying.as_ref(),
            orientation,
            offset + self.local_origin_px(orientation),
        )?;
        self.underlying_to_local(orientation, underlying)
    }

    // =========================================================================
    // Origin
    // =========================================================================

    /// Pixel origin of the columns, in the underlying frame.
    pub fn origin_x(&self) -> i32 {
        let state = *self.columns.read();
        self.origin_px_of(Orientation::Horizontal, &state)
    }

    /// Pixel origin of the rows, in the underlying frame.
    pub fn origin_y(&self) -> i32 {
        let state = *self.rows.read();
        self.origin_px_of(Orientation::Vertical, &state)
    }

    /// Underlying column position at the left edge.
    pub fn origin_column_position(&self) -> usize {
        self.columns.read().origin_position
    }

    /// Underlying row position at the top edge.
    pub fn origin_row_position(&self) -> usize {
        self.rows.read().origin_position
    }

    /// Scrolls horizontally. Returns `true` if the origin moved.
    pub fn set_origin_x(&self, x: i32) -> bool {
        self.set_origin(Orientation::Horizontal, x)
    }

    /// Scrolls vertically. Returns `true` if the origin moved.
    pub fn set_origin_y(&self, y: i32) -> bool {
        self.set_origin(Orientation::Vertical, y)
    }

    fn set_origin(&self, orientation: Orientation, px: i32) -> bool {
        let state = *self.state(orientation).read();
        let (origin_position, origin_offset) = self.clamp_origin(orientation, &state, px);
        if (origin_position, origin_offset) == (state.origin_position, state.origin_offset) {
            return false;
        }
        {
            let mut state = self.state(orientation).write();
            state.origin_position = origin_position;
            state.origin_offset = origin_offset;
        }
        tracing::debug!(
            target: targets::VIEWPORT,
            ?orientation,
            requested = px,
            origin_position,
            origin_offset,
            "viewport scrolled"
        );
        self.fire_layer_event(LayerEvent::Scroll {
            layer: self.id(),
            orientation,
        });
        true
    }

    /// Re-applies the clamp after the underlying layer changed.
    fn reclamp(&self, orientation: Orientation) {
        let state = *self.state(orientation).read();
        let px = self.origin_px_of(orientation, &state);
        let (origin_position, origin_offset) = self.clamp_origin(orientation, &state, px);
        let mut state = self.state(orientation).write();
        state.origin_position = origin_position;
        state.origin_offset = origin_offset;
    }

    /// Underlying positions, in the frame before a removal, covered by the
    /// window that started at `first`.
    ///
    /// The window keeps the surviving positions it shows now and every removed
    /// position between them, including removed positions at its end.
    fn shown_before_removal(&self, orientation: Orientation, first: usize, diffs: &[StructuralDiff]) -> Range {
        let removed: Vec<Range> = diffs
            .iter()
            .filter(|diff| diff.diff_type == DiffType::Delete)
            .map(|diff| diff.before)
            .collect();
        let removed_count: usize = removed.iter().map(Range::len).sum();
        let limit = axis::count(self.underlying.as_ref(), orientation) + removed_count;

        let shown_end = self.first_position(orientation) + self.visible_count(orientation);
        let mut survivors = shown_end.saturating_sub(shift_boundary(first, diffs));
        let mut end = first;
        while end < limit {
            if !removed.iter().any(|range| range.contains(end)) {
                if survivors == 0 {
                    break;
                }
                survivors -= 1;
            }
            end += 1;
        }
        Range::new(first, end)
    }

    /// Positions before the minimum origin are never scrolled into view.
    ///
    /// Used by freezing, which shows those positions in a separate region.
    pub fn set_minimum_origin(&self, column_position: usize, row_position: usize) {
        self.columns.write().min_origin_position = column_position;
        self.rows.write().min_origin_position = row_position;
        self.reclamp(Orientation::Horizontal);
        self.reclamp(Orientation::Vertical);
    }

    /// Minimum origin as underlying positions.
    pub fn minimum_origin(&self) -> (usize, usize) {
        (
            self.columns.read().min_origin_position,
            self.rows.read().min_origin_position,
        )
    }

    /// Moves the origin to the start of the given underlying positions.
    pub fn reset_origin(&self, column_position: usize, row_position: usize) {
        let x = self.underlying_start(Orientation::Horizontal, column_position);
        let y = self.underlying_start(Orientation::Vertical, row_position);
        self.set_origin_x(x);
        self.set_origin_y(y);
    }

    // =========================================================================
    // Client Area
    // =========================================================================

    /// Sets the visible extent in pixels.
    pub fn set_client_area(&self, width: i32, height: i32) {
        self.columns.write().client_size = Some(width.max(0));
        self.rows.write().client_size = Some(height.max(0));
        self.reclamp(Orientation::Horizontal);
        self.reclamp(Orientation::Vertical);
        tracing::debug!(target: targets::VIEWPORT, width, height, "client area resized");
        self.fire_layer_event(LayerEvent::VisualRefresh { layer: self.id() });
    }

    /// The visible extent, if known.
    pub fn client_area(&self) -> Option<(i32, i32)> {
        self.columns.read().client_size.zip(self.rows.read().client_size)
    }

    /// Whether the viewport currently exposes the whole underlying extent.
    pub fn is_viewport_off(&self) -> bool {
        self.off.load(Ordering::Acquire)
    }

    /// Exposes every underlying position past the minimum origin.
    pub fn turn_viewport_off(&self) {
        if !self.off.swap(true, Ordering::AcqRel) {
            tracing::debug!(target: targets::VIEWPORT, layer = %self.id(), "viewport off");
            self.fire_layer_event(LayerEvent::StructuralRefresh { layer: self.id() });
        }
    }

    /// Restores scrolling.
    pub fn turn_viewport_on(&self) {
        if self.off.swap(false, Ordering::AcqRel) {
            tracing::debug!(target: targets::VIEWPORT, layer = %self.id(), "viewport on");
            self.fire_layer_event(LayerEvent::StructuralRefresh { layer: self.id() });
        }
    }

    // =========================================================================
    // Scrolling Into View
    // =========================================================================

    /// Scrolls the least distance that shows the underlying column.
    pub fn show_column_position(&self, column_position: usize) -> bool {
        self.show_position(Orientation::Horizontal, column_position)
    }

    /// Scrolls the least distance that shows the underlying row.
    pub fn show_row_position(&self, row_position: usize) -> bool {
        self.show_position(Orientation::Vertical, row_position)
    }

    /// Scrolls the least distance that shows the underlying cell.
    pub fn show_cell_position(&self, column_position: usize, row_position: usize) -> bool {
        let horizontal = self.show_column_position(column_position);
        let vertical = self.show_row_position(row_position);
        horizontal || vertical
    }

    fn show_position(&self, orientation: Orientation, position: usize) -> bool {
        let state = *self.state(orientation).read();
        let underlying = self.underlying.as_ref();
        if self.is_viewport_off()
            || position < state.min_origin_position
            || position >= axis::count(underlying, orientation)
        {
            return false;
        }
        let Some(client) = state.client_size else {
            return false;
        };

        let start = self.underlying_start(orientation, position);
        let end = start + axis::size_by_position(underlying, orientation, position);
        let origin = self.origin_px_of(orientation, &state);
        let target = if start < origin {
            start
        } else if end > origin + client {
            (end - client).min(start)
        } else {
            return false;
        };
        self.set_origin(orientation, target)
    }
}

impl LayerListener for ViewportLayer {
    fn handle_layer_event(&self, event: &LayerEvent) {
        let mut shown_before = None;
        match event {
            LayerEvent::Structural(structural) => {
                let orientation = structural.orientation;
                let first = self.first_position(orientation);
                if structural.changes_positions() {
                    let mut state = self.state(orientation).write();
                    state.origin_position = shift_boundary(state.origin_position, &structural.diffs);
                    state.min_origin_position = shift_boundary(state.min_origin_position, &structural.diffs);
                }
                self.reclamp(orientation);
                if matches!(structural.kind, StructuralKind::Delete | StructuralKind::Hide) {
                    shown_before = Some(self.shown_before_removal(orientation, first, &structural.diffs));
                }
            }
            LayerEvent::StructuralRefresh { .. } => {
                self.reclamp(Orientation::Horizontal);
                self.reclamp(Orientation::Vertical);
            }
            _ => {}
        }

        match shown_before {
            Some(window) => propagate_converted_with(self, event, |position| {
                window.contains(position).then(|| position - window.start)
            }),
            None => propagate_converted(self, event),
        }

        if let LayerEvent::CellSelection {
            layer,
            column_position,
            row_position,
        } = event
            && *layer == self.underlying.id()
        {
            self.show_cell_position(*column_position, *row_position);
        }
    }
}

impl Layer for ViewportLayer {
    fn base(&self) -> &LayerBase {
        &self.base
    }

    fn underlying(&self) -> Option<&Arc<dyn Layer>> {
        Some(&self.underlying)
    }

    fn column_count(&self) -> usize {
        self.visible_count(Orientation::Horizontal)
    }

    fn local_to_underlying_column_position(&self, column_position: usize) -> Option<usize> {
        self.local_to_underlying(Orientation::Horizontal, column_position)
    }

    fn underlying_to_local_column_position(&self, _source: LayerId, column_position: usize) -> Option<usize> {
        self.underlying_to_local(Orientation::Horizontal, column_position)
    }

    fn width(&self) -> i32 {
        self.extent(Orientation::Horizontal)
    }

    fn start_x_of_column_position(&self, column_position: usize) -> Option<i32> {
        self.start_of(Orientation::Horizontal, column_position)
    }

    fn column_position_by_x(&self, x: i32) -> Option<usize> {
        self.position_at(Orientation::Horizontal, x)
    }

    fn row_count(&self) -> usize {
        self.visible_count(Orientation::Vertical)
    }

    fn local_to_underlying_row_position(&self, row_position: usize) -> Option<usize> {
        self.local_to_underlying(Orientation::Vertical, row_position)
    }

    fn underlying_to_local_row_position(&self, _source: LayerId, row_position: usize) -> Option<usize> {
        self.underlying_to_local(Orientation::Vertical, row_position)
    }

    fn height(&self) -> i32 {
        self.extent(Orientation::Vertical)
    }

    fn start_y_of_row_position(&self, row_position: usize) -> Option<i32> {
        self.start_of(Orientation::Vertical, row_position)
    }

    fn row_position_by_y(&self, y: i32) -> Option<usize> {
        self.position_at(Orientation::Vertical, y)
    }

    #[tracing::instrument(skip_all, target = "lattice_grid::command", level = "trace", fields(command = command.name()))]
    fn do_command(&self, command: &LayerCommand) -> bool {
        match command {
            LayerCommand::TurnViewportOff => {
                self.turn_viewport_off();
                true
            }
            LayerCommand::TurnViewportOn => {
                self.turn_viewport_on();
                true
            }
            LayerCommand::ClientAreaResize { width, height } => {
                self.set_client_area(*width, *height);
                true
            }
            LayerCommand::ShowCellInViewport { .. }
            | LayerCommand::ShowColumnInViewport { .. }
            | LayerCommand::ShowRowInViewport { .. } => {
                // Targets may be scrolled out, so positions are resolved below the viewport.
                match command.convert_to_target_layer(self.underlying.as_ref()) {
                    Some(LayerCommand::ShowCellInViewport {
                        column_position,
                        row_position,
                        ..
                    }) => {
                        self.show_cell_position(column_position, row_position);
                        true
                    }
                    Some(LayerCommand::ShowColumnInViewport { column_position, .. }) => {
                        self.show_column_position(column_position);
                        true
                    }
                    Some(LayerCommand::ShowRowInViewport { row_position, .. }) => {
                        self.show_row_position(row_position);
                        true
                    }
                    _ => forward_command(self, command),
                }
            }
            _ => forward_command(self, command),
        }
    }
}

static_assertions::assert_impl_all!(ViewportLayer: Send, Sync);

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::data::{CellValue, DummyDataProvider, VecDataProvider};
    use crate::layer::{DataLayer, HideShowLayer, register_listener};

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
        fn structural(&self, kind: StructuralKind) -> Vec<Vec<Range>> {
            self.events
                .lock()
                .iter()
                .filter_map(|event| match event {
                    LayerEvent::Structural(structural) if structural.kind == kind => {
                        Some(structural.ranges.clone())
                    }
                    _ => None,
                })
                .collect()
        }
    }

    fn record(viewport: &Arc<ViewportLayer>) -> Arc<Recorder> {
        let recorder = Arc::new(Recorder::default());
        let layer: Arc<dyn Layer> = viewport.clone();
        register_listener(&layer, &recorder);
        recorder
    }

    fn row_viewport(rows: usize) -> (Arc<VecDataProvider>, Arc<DataLayer>, Arc<ViewportLayer>) {
        let values = (0..rows).map(|r| vec![CellValue::Int(r as i64)]).collect();
        let provider = Arc::new(VecDataProvider::new(1, values));
        let data = DataLayer::new(provider.clone(), 100, 20);
        let viewport = ViewportLayer::new(data.clone());
        (provider, data, viewport)
    }

    fn viewport(columns: usize, rows: usize) -> (Arc<DataLayer>, Arc<ViewportLayer>) {
        let data = DataLayer::new(Arc::new(DummyDataProvider::new(columns, rows)), 100, 20);
        let viewport = ViewportLayer::new(data.clone());
        (data, viewport)
    }

    #[test]
    fn test_origin_is_clamped() {
        let (_, viewport) = viewport(10, 10);
        viewport.set_client_area(250, 100);

        viewport.set_origin_x(5000);
        assert_eq!(viewport.origin_x(), 750);
        viewport.set_origin_x(-10);
        assert_eq!(viewport.origin_x(), 0);
    }

    #[test]
    fn test_client_larger_than_content_pins_origin() {
        let (_, viewport) = viewport(2, 2);
        viewport.set_client_area(1000, 1000);
        assert!(!viewport.set_origin_x(50));
        assert_eq!(viewport.origin_x(), 0);
        assert_eq!(viewport.column_count(), 2);
    }

    #[test]
    fn test_visible_window() {
        let (_, viewport) = viewport(10, 10);
        viewport.set_client_area(250, 100);
        assert_eq!(viewport.column_count(), 3);
        assert_eq!(viewport.row_count(), 5);
        assert_eq!(viewport.width(), 250);

        viewport.set_origin_x(150);
        assert_eq!(viewport.origin_column_position(), 1);
        assert_eq!(viewport.column_count(), 3);
        assert_eq!(viewport.column_index_by_position(0), Some(1));
        assert_eq!(viewport.start_x_of_column_position(0), Some(-50));
        assert_eq!(viewport.start_x_of_column_position(1), Some(50));
        assert_eq!(viewport.column_position_by_x(60), Some(1));
        assert_eq!(viewport.column_position_by_index(0), None);
        assert_eq!(viewport.column_position_by_index(3), Some(2));
    }

    #[test]
    fn test_scroll_fires_event() {
        let (_, viewport) = viewport(10, 10);
        viewport.set_client_area(250, 100);
        let recorder = Arc::new(Recorder::default());
        let as_layer: Arc<dyn Layer> = viewport.clone();
        register_listener(&as_layer, &recorder);

        viewport.set_origin_y(40);
        let events = recorder.events.lock();
        assert_eq!(
            events.as_slice(),
            &[LayerEvent::Scroll {
                layer: viewport.id(),
                orientation: Orientation::Vertical,
            }]
        );
    }

    #[test]
    fn test_show_column_scrolls_minimally() {
        let (_, viewport) = viewport(10, 10);
        viewport.set_client_area(250, 100);

        assert!(viewport.show_column_position(5));
        assert_eq!(viewport.origin_x(), 350);
        assert!(!viewport.show_column_position(4));
        assert!(viewport.show_column_position(1));
        assert_eq!(viewport.origin_x(), 100);
    }

    #[test]
    fn test_viewport_off_exposes_everything() {
        let (_, viewport) = viewport(10, 10);
        viewport.set_client_area(250, 100);
        viewport.set_origin_x(300);

        viewport.turn_viewport_off();
        assert_eq!(viewport.column_count(), 10);
        assert_eq!(viewport.width(), 1000);
        assert_eq!(viewport.column_index_by_position(0), Some(0));

        viewport.turn_viewport_on();
        assert_eq!(viewport.column_index_by_position(0), Some(3));
    }

    #[test]
    fn test_delete_before_origin_keeps_cells_in_view() {
        let rows = (0..10).map(|r| vec![CellValue::Int(r)]).collect();
        let provider = Arc::new(VecDataProvider::new(1, rows));
        let data = DataLayer::new(provider.clone(), 100, 20);
        let viewport = ViewportLayer::new(data.clone());
        viewport.set_client_area(100, 50);
        viewport.set_origin_y(100);
        assert_eq!(viewport.origin_row_position(), 5);

        let recorder = Arc::new(Recorder::default());
        let as_layer: Arc<dyn Layer> = viewport.clone();
        register_listener(&as_layer, &recorder);

        provider.remove_row(1);
        data.rows_deleted(&[1]);
        assert_eq!(viewport.origin_row_position(), 4);
        assert_eq!(viewport.origin_y(), 80);
        assert_eq!(viewport.data_value_by_position(0, 0), Some(CellValue::Int(5)));
        // The deleted row was outside the window.
        assert!(recorder.events.lock().is_empty());
    }

    #[test]
    fn test_deleting_last_row_is_reported() {
        let (provider, data, viewport) = row_viewport(5);
        viewport.set_client_area(100, 2000);
        let recorder = record(&viewport);

        provider.remove_row(4);
        data.rows_deleted(&[4]);
        assert_eq!(viewport.row_count(), 4);
        assert_eq!(recorder.structural(StructuralKind::Delete), vec![vec![Range::single(4)]]);
    }

    #[test]
    fn test_delete_at_end_of_scrolled_window() {
        let (provider, data, viewport) = row_viewport(10);
        viewport.set_client_area(100, 50);
        viewport.set_origin_y(1000);
        assert_eq!(viewport.origin_y(), 150);
        assert_eq!(viewport.origin_row_position(), 7);
        let recorder = record(&viewport);

        provider.remove_row(9);
        data.rows_deleted(&[9]);
        assert_eq!(viewport.origin_y(), 130);
        // Reported in the window as it was before the delete.
        assert_eq!(recorder.structural(StructuralKind::Delete), vec![vec![Range::single(2)]]);
    }

    #[test]
    fn test_hiding_last_column_is_reported() {
        let data = DataLayer::new(Arc::new(DummyDataProvider::new(5, 5)), 100, 20);
        let hide_show = HideShowLayer::new(data);
        let viewport = ViewportLayer::new(hide_show.clone());
        viewport.set_client_area(2000, 2000);
        let recorder = record(&viewport);

        hide_show.hide_column_indices(&[4]);
        assert_eq!(viewport.column_count(), 4);
        assert_eq!(recorder.structural(StructuralKind::Hide), vec![vec![Range::single(4)]]);

        hide_show.hide_column_indices(&[0]);
        assert_eq!(recorder.structural(StructuralKind::Hide).len(), 2);
    }

    #[test]
    fn test_reset_origin_scrolls_to_positions() {
        let (_, viewport) = viewport(10, 10);
        viewport.set_client_area(250, 100);
        viewport.set_origin_x(420);

        viewport.reset_origin(3, 2);
        assert_eq!(viewport.origin_x(), 300);
        assert_eq!(viewport.origin_y(), 40);
        assert_eq!(viewport.column_index_by_position(0), Some(3));
    }

    #[test]
    fn test_minimum_origin() {
        let (_, viewport) = viewport(10, 10);
        viewport.set_client_area(250, 100);
        viewport.set_minimum_origin(2, 0);
        assert_eq!(viewport.origin_column_position(), 2);
        viewport.set_origin_x(0);
        assert_eq!(viewport.origin_x(), 200);
        assert_eq!(viewport.column_position_by_index(1), None);
    }
}
