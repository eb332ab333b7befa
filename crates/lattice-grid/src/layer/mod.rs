//! The layer contract and the layers built on it.
//!
//! A grid is a stack of layers. Each layer exposes a dense position space
//! per axis and translates those positions to and from its underlying
//! layer(s). Commands travel down the stack through [`Layer::do_command`];
//! events travel up through [`LayerListener::handle_layer_event`].
//!
//! Wrapping layers own their underlying layer through an `Arc` and register
//! themselves on it as a `Weak` listener, so ownership always points down the
//! stack and notification always points up.
//!
//! # Identity Defaults
//!
//! Every method of [`Layer`] except [`Layer::base`] has a default that treats
//! the layer as an identity transform over [`Layer::underlying`]. A layer that
//! only adds state (labels, display modes) overrides nothing else; a layer
//! that remaps positions overrides the translation methods of that axis.

mod column_group;
mod composite;
mod data_layer;
mod dimensional;
mod freeze;
mod hide_show;
mod reorder;
mod selection;
mod viewport;

pub use column_group::{ColumnGroup, ColumnGroupModel, ColumnGroupReorderLayer};
pub use composite::{CompositeCommandHandler, CompositeLayer};
pub use data_layer::DataLayer;
pub use dimensional::DimensionallyDependentLayer;
pub use freeze::{CompositeFreezeLayer, FreezeLayer};
pub use hide_show::HideShowLayer;
pub use reorder::ReorderLayer;
pub use selection::{SelectionLayer, SelectionModifiers};
pub use viewport::ViewportLayer;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use lattice_grid_core::logging::{span_names, targets};
use lattice_grid_core::{LayerId, Orientation, Range, ranges_from_positions};
use parking_lot::{Mutex, RwLock};

use crate::command::LayerCommand;
use crate::data::CellValue;
use crate::event::LayerEvent;
use crate::label::{ConfigLabelAccumulator, LabelStack};

/// Receives events fired by a layer.
pub trait LayerListener: Send + Sync {
    /// Handles an event expressed in the frame of the firing layer.
    fn handle_layer_event(&self, event: &LayerEvent);
}

/// Identifier of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// How a cell is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DisplayMode {
    /// Plain cell.
    #[default]
    Normal,
    /// Selected cell, or header of a selected column or row.
    Select,
}

/// Pixel bounds of a cell, relative to the layer's origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellBounds {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

/// Everything a painter needs to know about one cell of a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerCell {
    /// The layer whose frame the positions belong to.
    pub layer: LayerId,
    /// Column position of the cell.
    pub column_position: usize,
    /// Row position of the cell.
    pub row_position: usize,
    /// Column position where a spanned cell starts.
    pub origin_column_position: usize,
    /// Row position where a spanned cell starts.
    pub origin_row_position: usize,
    /// Number of columns the cell spans.
    pub column_span: usize,
    /// Number of rows the cell spans.
    pub row_span: usize,
    /// Column index of the cell.
    pub column_index: Option<usize>,
    /// Row index of the cell.
    pub row_index: Option<usize>,
    /// Pixel bounds.
    pub bounds: CellBounds,
    /// Display mode.
    pub display_mode: DisplayMode,
    /// Config labels, most proximal first.
    pub labels: LabelStack,
    /// Cell value.
    pub data_value: Option<CellValue>,
}

/// Identity and listener bookkeeping shared by every layer.
///
/// Listeners are notified in registration order. They are held weakly; a
/// listener that has been dropped is pruned the next time an event fires.
pub struct LayerBase {
    id: LayerId,
    this: Weak<dyn Layer>,
    listeners: Mutex<Vec<(ListenerId, Weak<dyn LayerListener>)>>,
    next_listener_id: AtomicU64,
    label_accumulator: RwLock<Option<Arc<dyn ConfigLabelAccumulator>>>,
}

impl LayerBase {
    /// Creates the base of a layer built with `Arc::new_cyclic`.
    pub fn new(this: Weak<dyn Layer>) -> Self {
        Self {
            id: LayerId::next(),
            this,
            listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
            label_accumulator: RwLock::new(None),
        }
    }

    /// The identity of the layer.
    pub fn id(&self) -> LayerId {
        self.id
    }

    /// A strong handle to the layer owning this base.
    pub fn this(&self) -> Option<Arc<dyn Layer>> {
        self.this.upgrade()
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Registers a listener.
    pub fn add_listener(&self, listener: Weak<dyn LayerListener>) -> ListenerId {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, listener));
        id
    }

    /// Unregisters a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Number of live listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .iter()
            .filter(|(_, listener)| listener.strong_count() > 0)
            .count()
    }

    /// Notifies every listener, in registration order.
    pub fn fire(&self, event: &LayerEvent) {
        let _span = tracing::trace_span!(target: targets::EVENT, span_names::FIRE_EVENT).entered();
        let snapshot: Vec<Weak<dyn LayerListener>> = {
            let mut listeners = self.listeners.lock();
            listeners.retain(|(_, listener)| listener.strong_count() > 0);
            listeners.iter().map(|(_, l)| l.clone()).collect()
        };

        tracing::trace!(
            target: targets::EVENT,
            layer = %self.id,
            event = event.name(),
            listeners = snapshot.len(),
            "firing layer event"
        );
        for listener in snapshot {
            if let Some(listener) = listener.upgrade() {
                listener.handle_layer_event(event);
            }
        }
    }

    /// Drops every listener.
    pub fn dispose(&self) {
        self.listeners.lock().clear();
        tracing::debug!(target: targets::LAYER, layer = %self.id, "layer disposed");
    }

    // =========================================================================
    // Labels
    // =========================================================================

    /// Attaches a label accumulator to the layer.
    pub fn set_config_label_accumulator(&self, accumulator: Option<Arc<dyn ConfigLabelAccumulator>>) {
        *self.label_accumulator.write() = accumulator;
    }

    /// The label accumulator attached to the layer.
    pub fn config_label_accumulator(&self) -> Option<Arc<dyn ConfigLabelAccumulator>> {
        self.label_accumulator.read().clone()
    }
}

impl std::fmt::Debug for LayerBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerBase")
            .field("id", &self.id)
            .field("listeners", &self.listeners.lock().len())
            .finish_non_exhaustive()
    }
}

/// A layer of a grid.
///
/// Positions are dense and 0-based per axis. Translation methods answer
/// `None` for positions that do not exist in the requested frame; none of
/// them panic on out-of-range input.
pub trait Layer: LayerListener {
    /// Identity and listener bookkeeping.
    fn base(&self) -> &LayerBase;

    /// The single underlying layer of a wrapping layer.
    fn underlying(&self) -> Option<&Arc<dyn Layer>> {
        None
    }

    /// The identity of this layer.
    fn id(&self) -> LayerId {
        self.base().id()
    }

    // =========================================================================
    // Horizontal
    // =========================================================================

    /// Number of columns.
    fn column_count(&self) -> usize {
        self.underlying().map_or(0, |u| u.column_count())
    }

    /// Column index at a position, `None` when out of range.
    fn column_index_by_position(&self, column_position: usize) -> Option<usize> {
        let underlying = self.underlying()?;
        let position = self.local_to_underlying_column_position(column_position)?;
        underlying.column_index_by_position(position)
    }

    /// Column position of an index, `None` when hidden or unknown.
    fn column_position_by_index(&self, column_index: usize) -> Option<usize> {
        let underlying = self.underlying()?;
        let position = underlying.column_position_by_index(column_index)?;
        self.underlying_to_local_column_position(underlying.id(), position)
    }

    /// Translates a local column position one layer down.
    fn local_to_underlying_column_position(&self, column_position: usize) -> Option<usize> {
        (column_position < self.column_count()).then_some(column_position)
    }

    /// Translates a column position of the layer `source` one layer up.
    fn underlying_to_local_column_position(
        &self,
        _source: LayerId,
        column_position: usize,
    ) -> Option<usize> {
        Some(column_position)
    }

    /// Translates column ranges of the layer `source` one layer up.
    fn underlying_to_local_column_positions(&self, source: LayerId, ranges: &[Range]) -> Vec<Range> {
        ranges_from_positions(
            ranges
                .iter()
                .flat_map(Range::positions)
                .filter_map(|p| self.underlying_to_local_column_position(source, p)),
        )
    }

    /// The layers a local column position translates into.
    fn underlying_layers_by_column_position(&self, _column_position: usize) -> Vec<Arc<dyn Layer>> {
        self.underlying().cloned().into_iter().collect()
    }

    /// Total width in pixels.
    fn width(&self) -> i32 {
        self.underlying().map_or(0, |u| u.width())
    }

    /// Width of a column, 0 when out of range.
    fn column_width_by_position(&self, column_position: usize) -> i32 {
        match (
            self.underlying(),
            self.local_to_underlying_column_position(column_position),
        ) {
            (Some(underlying), Some(position)) => underlying.column_width_by_position(position),
            _ => 0,
        }
    }

    /// Pixel offset of the left edge of a column.
    fn start_x_of_column_position(&self, column_position: usize) -> Option<i32> {
        let underlying = self.underlying()?;
        let position = self.local_to_underlying_column_position(column_position)?;
        underlying.start_x_of_column_position(position)
    }

    /// The column containing pixel `x`.
    fn column_position_by_x(&self, x: i32) -> Option<usize> {
        let underlying = self.underlying()?;
        let position = underlying.column_position_by_x(x)?;
        self.underlying_to_local_column_position(underlying.id(), position)
    }

    /// Whether a column may be resized.
    fn is_column_position_resizable(&self, column_position: usize) -> bool {
        match (
            self.underlying(),
            self.local_to_underlying_column_position(column_position),
        ) {
            (Some(underlying), Some(position)) => underlying.is_column_position_resizable(position),
            _ => false,
        }
    }

    // =========================================================================
    // Vertical
    // =========================================================================

    /// Number of rows.
    fn row_count(&self) -> usize {
        self.underlying().map_or(0, |u| u.row_count())
    }

    /// Row index at a position, `None` when out of range.
    fn row_index_by_position(&self, row_position: usize) -> Option<usize> {
        let underlying = self.underlying()?;
        let position = self.local_to_underlying_row_position(row_position)?;
        underlying.row_index_by_position(position)
    }

    /// Row position of an index, `None` when hidden or unknown.
    fn row_position_by_index(&self, row_index: usize) -> Option<usize> {
        let underlying = self.underlying()?;
        let position = underlying.row_position_by_index(row_index)?;
        self.underlying_to_local_row_position(underlying.id(), position)
    }

    /// Translates a local row position one layer down.
    fn local_to_underlying_row_position(&self, row_position: usize) -> Option<usize> {
        (row_position < self.row_count()).then_some(row_position)
    }

    /// Translates a row position of the layer `source` one layer up.
    fn underlying_to_local_row_position(&self, _source: LayerId, row_position: usize) -> Option<usize> {
        Some(row_position)
    }

    /// Translates row ranges of the layer `source` one layer up.
    fn underlying_to_local_row_positions(&self, source: LayerId, ranges: &[Range]) -> Vec<Range> {
        ranges_from_positions(
            ranges
                .iter()
                .flat_map(Range::positions)
                .filter_map(|p| self.underlying_to_local_row_position(source, p)),
        )
    }

    /// The layers a local row position translates into.
    fn underlying_layers_by_row_position(&self, _row_position: usize) -> Vec<Arc<dyn Layer>> {
        self.underlying().cloned().into_iter().collect()
    }

    /// Total height in pixels.
    fn height(&self) -> i32 {
        self.underlying().map_or(0, |u| u.height())
    }

    /// Height of a row, 0 when out of range.
    fn row_height_by_position(&self, row_position: usize) -> i32 {
        match (
            self.underlying(),
            self.local_to_underlying_row_position(row_position),
        ) {
            (Some(underlying), Some(position)) => underlying.row_height_by_position(position),
            _ => 0,
        }
    }

    /// Pixel offset of the top edge of a row.
    fn start_y_of_row_position(&self, row_position: usize) -> Option<i32> {
        let underlying = self.underlying()?;
        let position = self.local_to_underlying_row_position(row_position)?;
        underlying.start_y_of_row_position(position)
    }

    /// The row containing pixel `y`.
    fn row_position_by_y(&self, y: i32) -> Option<usize> {
        let underlying = self.underlying()?;
        let position = underlying.row_position_by_y(y)?;
        self.underlying_to_local_row_position(underlying.id(), position)
    }

    /// Whether a row may be resized.
    fn is_row_position_resizable(&self, row_position: usize) -> bool {
        match (
            self.underlying(),
            self.local_to_underlying_row_position(row_position),
        ) {
            (Some(underlying), Some(position)) => underlying.is_row_position_resizable(position),
            _ => false,
        }
    }

    // =========================================================================
    // Commands and Events
    // =========================================================================

    /// Handles a command or forwards it down the stack.
    ///
    /// Returns `true` once some layer consumed the command.
    fn do_command(&self, command: &LayerCommand) -> bool {
        forward_command(self, command)
    }

    /// Notifies this layer's listeners.
    fn fire_layer_event(&self, event: LayerEvent) {
        self.base().fire(&event);
    }

    /// Registers a listener.
    fn add_layer_listener(&self, listener: Weak<dyn LayerListener>) -> ListenerId {
        self.base().add_listener(listener)
    }

    /// Unregisters a listener.
    fn remove_layer_listener(&self, id: ListenerId) -> bool {
        self.base().remove_listener(id)
    }

    // =========================================================================
    // Cells
    // =========================================================================

    /// Labels of a cell, most proximal first.
    fn config_labels_by_position(&self, column_position: usize, row_position: usize) -> LabelStack {
        accumulated_labels(self, column_position, row_position)
    }

    /// Display mode of a cell.
    fn display_mode_by_position(&self, column_position: usize, row_position: usize) -> DisplayMode {
        underlying_display_mode(self, column_position, row_position)
    }

    /// Value of a cell.
    fn data_value_by_position(&self, column_position: usize, row_position: usize) -> Option<CellValue> {
        let underlying = self.underlying()?;
        let column = self.local_to_underlying_column_position(column_position)?;
        let row = self.local_to_underlying_row_position(row_position)?;
        underlying.data_value_by_position(column, row)
    }

    /// The layer a cell translates into.
    fn underlying_layer_by_position(
        &self,
        _column_position: usize,
        _row_position: usize,
    ) -> Option<Arc<dyn Layer>> {
        self.underlying().cloned()
    }

    /// Region label of a cell; only composites have regions.
    fn region_label_by_position(&self, _column_position: usize, _row_position: usize) -> Option<String> {
        None
    }

    /// Full description of a cell, `None` when out of range.
    fn cell_by_position(&self, column_position: usize, row_position: usize) -> Option<LayerCell> {
        if column_position >= self.column_count() || row_position >= self.row_count() {
            return None;
        }
        Some(LayerCell {
            layer: self.id(),
            column_position,
            row_position,
            origin_column_position: column_position,
            origin_row_position: row_position,
            column_span: 1,
            row_span: 1,
            column_index: self.column_index_by_position(column_position),
            row_index: self.row_index_by_position(row_position),
            bounds: CellBounds {
                x: self.start_x_of_column_position(column_position).unwrap_or(0),
                y: self.start_y_of_row_position(row_position).unwrap_or(0),
                width: self.column_width_by_position(column_position),
                height: self.row_height_by_position(row_position),
            },
            display_mode: self.display_mode_by_position(column_position, row_position),
            labels: self.config_labels_by_position(column_position, row_position),
            data_value: self.data_value_by_position(column_position, row_position),
        })
    }
}

/// Labels of the underlying cell plus this layer's accumulator on top.
pub fn accumulated_labels<L: Layer + ?Sized>(
    layer: &L,
    column_position: usize,
    row_position: usize,
) -> LabelStack {
    let mut labels = match (
        layer.underlying(),
        layer.local_to_underlying_column_position(column_position),
        layer.local_to_underlying_row_position(row_position),
    ) {
        (Some(underlying), Some(column), Some(row)) => underlying.config_labels_by_position(column, row),
        _ => LabelStack::new(),
    };
    if let Some(accumulator) = layer.base().config_label_accumulator()
        && let Some(this) = layer.base().this()
    {
        accumulator.accumulate_config_labels(this.as_ref(), &mut labels, column_position, row_position);
    }
    labels
}

/// Display mode of the underlying cell.
pub fn underlying_display_mode<L: Layer + ?Sized>(
    layer: &L,
    column_position: usize,
    row_position: usize,
) -> DisplayMode {
    match (
        layer.underlying(),
        layer.local_to_underlying_column_position(column_position),
        layer.local_to_underlying_row_position(row_position),
    ) {
        (Some(underlying), Some(column), Some(row)) => underlying.display_mode_by_position(column, row),
        _ => DisplayMode::Normal,
    }
}

/// Cached start offsets of the positions along one axis.
///
/// Layers that reorder or drop positions cannot take pixel offsets from the
/// layer below. They rebuild the table lazily and drop it on every
/// structural change.
#[derive(Debug, Default)]
pub(crate) struct OffsetCache {
    starts: RwLock<Option<Arc<Vec<i32>>>>,
}

impl OffsetCache {
    pub(crate) fn invalidate(&self) {
        *self.starts.write() = None;
    }

    /// Start offsets of `[0, count]`; the last entry is the total extent.
    fn starts(&self, count: usize, size: impl Fn(usize) -> i32) -> Arc<Vec<i32>> {
        if let Some(starts) = self.starts.read().as_ref()
            && starts.len() == count + 1
        {
            return starts.clone();
        }
        let mut starts = Vec::with_capacity(count + 1);
        let mut offset = 0i32;
        starts.push(0);
        for position in 0..count {
            offset = offset.saturating_add(size(position).max(0));
            starts.push(offset);
        }
        let starts = Arc::new(starts);
        *self.starts.write() = Some(starts.clone());
        starts
    }

    pub(crate) fn total(&self, count: usize, size: impl Fn(usize) -> i32) -> i32 {
        self.starts(count, size)[count]
    }

    pub(crate) fn start_of(&self, position: usize, count: usize, size: impl Fn(usize) -> i32) -> Option<i32> {
        (position < count).then(|| self.starts(count, size)[position])
    }

    pub(crate) fn position_at(&self, offset: i32, count: usize, size: impl Fn(usize) -> i32) -> Option<usize> {
        let starts = self.starts(count, size);
        if offset < 0 || offset >= starts[count] {
            return None;
        }
        // Zero-sized positions share their start with the next one and are skipped.
        let after = starts.partition_point(|start| *start <= offset);
        after.checked_sub(1)
    }
}

/// Default command handling: dispose bookkeeping, then forward down.
pub fn forward_command<L: Layer + ?Sized>(layer: &L, command: &LayerCommand) -> bool {
    if matches!(command, LayerCommand::Dispose) {
        layer.base().dispose();
    }
    match layer.underlying() {
        Some(underlying) => {
            tracing::trace!(
                target: targets::COMMAND,
                command = command.name(),
                from = %layer.id(),
                to = %underlying.id(),
                "forwarding command"
            );
            underlying.do_command(command)
        }
        None => false,
    }
}

/// Converts an event into `layer`'s frame and re-fires it, or swallows it.
pub fn propagate_converted(layer: &dyn Layer, event: &LayerEvent) {
    let mut local = event.clone_event();
    let converted = local.convert_to_local(layer);
    fire_or_swallow(layer, event, local, converted);
}

/// Like [`propagate_converted`], but structural removals are mapped with
/// `removed`, which sees positions in the frame before the change.
pub fn propagate_converted_with(
    layer: &dyn Layer,
    event: &LayerEvent,
    removed: impl Fn(usize) -> Option<usize>,
) {
    let mut local = event.clone_event();
    let converted = match &mut local {
        LayerEvent::Structural(structural) => structural.convert_to_local_with(layer, removed),
        other => other.convert_to_local(layer),
    };
    fire_or_swallow(layer, event, local, converted);
}

fn fire_or_swallow(layer: &dyn Layer, event: &LayerEvent, local: LayerEvent, converted: bool) {
    if converted {
        layer.fire_layer_event(local);
    } else {
        tracing::trace!(
            target: targets::EVENT,
            layer = %layer.id(),
            event = event.name(),
            "event swallowed"
        );
    }
}

/// Registers `listener` on `layer` without taking ownership of it.
pub fn register_listener<L: LayerListener + 'static>(
    layer: &Arc<dyn Layer>,
    listener: &Arc<L>,
) -> ListenerId {
    let weak: Weak<dyn LayerListener> = Arc::downgrade(listener) as Weak<dyn LayerListener>;
    layer.add_layer_listener(weak)
}

/// Orientation-generic access to the [`Layer`] axis methods.
pub mod axis {
    use super::*;

    /// Number of positions along `orientation`.
    pub fn count(layer: &dyn Layer, orientation: Orientation) -> usize {
        match orientation {
            Orientation::Horizontal => layer.column_count(),
            Orientation::Vertical => layer.row_count(),
        }
    }

    /// Index at a position.
    pub fn index_by_position(layer: &dyn Layer, orientation: Orientation, position: usize) -> Option<usize> {
        match orientation {
            Orientation::Horizontal => layer.column_index_by_position(position),
            Orientation::Vertical => layer.row_index_by_position(position),
        }
    }

    /// Position of an index.
    pub fn position_by_index(layer: &dyn Layer, orientation: Orientation, index: usize) -> Option<usize> {
        match orientation {
            Orientation::Horizontal => layer.column_position_by_index(index),
            Orientation::Vertical => layer.row_position_by_index(index),
        }
    }

    /// One-hop translation down.
    pub fn local_to_underlying(layer: &dyn Layer, orientation: Orientation, position: usize) -> Option<usize> {
        match orientation {
            Orientation::Horizontal => layer.local_to_underlying_column_position(position),
            Orientation::Vertical => layer.local_to_underlying_row_position(position),
        }
    }

    /// One-hop translation up.
    pub fn underlying_to_local(
        layer: &dyn Layer,
        orientation: Orientation,
        source: LayerId,
        position: usize,
    ) -> Option<usize> {
        match orientation {
            Orientation::Horizontal => layer.underlying_to_local_column_position(source, position),
            Orientation::Vertical => layer.underlying_to_local_row_position(source, position),
        }
    }

    /// One-hop translation of ranges up.
    pub fn underlying_to_local_ranges(
        layer: &dyn Layer,
        orientation: Orientation,
        source: LayerId,
        ranges: &[Range],
    ) -> Vec<Range> {
        match orientation {
            Orientation::Horizontal => layer.underlying_to_local_column_positions(source, ranges),
            Orientation::Vertical => layer.underlying_to_local_row_positions(source, ranges),
        }
    }

    /// Layers a position translates into.
    pub fn underlying_layers_by_position(
        layer: &dyn Layer,
        orientation: Orientation,
        position: usize,
    ) -> Vec<Arc<dyn Layer>> {
        match orientation {
            Orientation::Horizontal => layer.underlying_layers_by_column_position(position),
            Orientation::Vertical => layer.underlying_layers_by_row_position(position),
        }
    }

    /// Total extent in pixels.
    pub fn extent(layer: &dyn Layer, orientation: Orientation) -> i32 {
        match orientation {
            Orientation::Horizontal => layer.width(),
            Orientation::Vertical => layer.height(),
        }
    }

    /// Size of a position in pixels.
    pub fn size_by_position(layer: &dyn Layer, orientation: Orientation, position: usize) -> i32 {
        match orientation {
            Orientation::Horizontal => layer.column_width_by_position(position),
            Orientation::Vertical => layer.row_height_by_position(position),
        }
    }

    /// Pixel offset of a position.
    pub fn start_by_position(layer: &dyn Layer, orientation: Orientation, position: usize) -> Option<i32> {
        match orientation {
            Orientation::Horizontal => layer.start_x_of_column_position(position),
            Orientation::Vertical => layer.start_y_of_row_position(position),
        }
    }

    /// Position containing a pixel offset.
    pub fn position_by_offset(layer: &dyn Layer, orientation: Orientation, offset: i32) -> Option<usize> {
        match orientation {
            Orientation::Horizontal => layer.column_position_by_x(offset),
            Orientation::Vertical => layer.row_position_by_y(offset),
        }
    }

    /// Indices of every position, in position order.
    pub fn indices(layer: &dyn Layer, orientation: Orientation) -> Vec<usize> {
        (0..count(layer, orientation))
            .filter_map(|p| index_by_position(layer, orientation, p))
            .collect()
    }
}
