//! Frozen columns and rows.
//!
//! [`FreezeLayer`] shows a pinned block of the underlying layer. The block is
//! kept as a pair of coordinates in the underlying frame and moved with
//! [`shift_boundary`] whenever positions are inserted, deleted, hidden,
//! shown or reordered below it.
//!
//! [`CompositeFreezeLayer`] puts a freeze layer and a viewport over the same
//! selection layer into a 2x2 composite:
//!
//! ```text
//! +----------------+---------------------+
//! | FROZEN_REGION  | FROZEN_ROW_REGION   |
//! +----------------+---------------------+
//! | FROZEN_COLUMN_ | NONFROZEN_REGION    |
//! | REGION         | (viewport)          |
//! +----------------+---------------------+
//! ```

use std::sync::{Arc, Weak};

use lattice_grid_core::logging::targets;
use lattice_grid_core::{LayerId, Orientation, PositionCoordinate, Result, shift_boundary};
use parking_lot::{Mutex, RwLock};

use super::{
    CompositeCommandHandler, CompositeLayer, DimensionallyDependentLayer, Layer, LayerBase, LayerListener,
    SelectionLayer, ViewportLayer, axis, propagate_converted, propagate_converted_with,
};
use crate::command::LayerCommand;
use crate::event::LayerEvent;
use crate::label::{FROZEN_COLUMN_REGION, FROZEN_REGION, FROZEN_ROW_REGION, NONFROZEN_REGION};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrozenBlock {
    top_left: PositionCoordinate,
    /// Exclusive.
    bottom_right: PositionCoordinate,
}

impl FrozenBlock {
    fn range(&self, orientation: Orientation) -> (usize, usize) {
        let start = self.top_left.position(orientation);
        let end = self.bottom_right.position(orientation).max(start);
        (start, end)
    }
}

/// Shows the frozen block of the underlying layer.
///
/// An axis is unfrozen when both corners agree on it; the layer then has no
/// positions along that axis.
pub struct FreezeLayer {
    base: LayerBase,
    underlying: Arc<dyn Layer>,
    block: RwLock<FrozenBlock>,
}

impl FreezeLayer {
    /// Wraps `underlying` with nothing frozen.
    pub fn new(underlying: Arc<dyn Layer>) -> Arc<Self> {
        let origin = PositionCoordinate::new(underlying.id(), 0, 0);
        Arc::new_cyclic(|this: &Weak<Self>| {
            underlying.add_layer_listener(this.clone());
            Self {
                base: LayerBase::new(this.clone()),
                underlying,
                block: RwLock::new(FrozenBlock {
                    top_left: origin,
                    bottom_right: origin,
                }),
            }
        })
    }

    /// First frozen cell, in the underlying frame.
    pub fn top_left(&self) -> PositionCoordinate {
        self.block.read().top_left
    }

    /// Exclusive end of the frozen block, in the underlying frame.
    pub fn bottom_right(&self) -> PositionCoordinate {
        self.block.read().bottom_right
    }

    /// Whether anything is frozen.
    pub fn is_frozen(&self) -> bool {
        self.column_count() > 0 || self.row_count() > 0
    }

    /// Freezes the block `[top_left, bottom_right)` of underlying positions.
    pub fn set_frozen(&self, top_left: (usize, usize), bottom_right: (usize, usize)) {
        let layer = self.underlying.id();
        {
            let mut block = self.block.write();
            block.top_left = PositionCoordinate::new(layer, top_left.0, top_left.1);
            block.bottom_right = PositionCoordinate::new(layer, bottom_right.0, bottom_right.1);
        }
        self.clamp();
        tracing::debug!(target: targets::FREEZE, ?top_left, ?bottom_right, "frozen block set");
        self.fire_layer_event(LayerEvent::StructuralRefresh { layer: self.id() });
    }

    /// Clears the frozen block.
    pub fn unfreeze(&self) {
        self.set_frozen((0, 0), (0, 0));
    }

    fn clamp(&self) {
        let columns = self.underlying.column_count();
        let rows = self.underlying.row_count();
        let mut block = self.block.write();
        for (orientation, count) in [(Orientation::Horizontal, columns), (Orientation::Vertical, rows)] {
            let (start, end) = block.range(orientation);
            block.top_left.set_position(orientation, start.min(count));
            block.bottom_right.set_position(orientation, end.min(count));
        }
    }

    fn range(&self, orientation: Orientation) -> (usize, usize) {
        self.block.read().range(orientation)
    }

    fn underlying_start(&self, orientation: Orientation, position: usize) -> i32 {
        let underlying = self.underlying.as_ref();
        if position >= axis::count(underlying, orientation) {
            return axis::extent(underlying, orientation);
        }
        axis::start_by_position(underlying, orientation, position)
            .unwrap_or_else(|| axis::extent(underlying, orientation))
    }

    fn count(&self, orientation: Orientation) -> usize {
        let (start, end) = self.range(orientation);
        end - start
    }

    fn local_to_underlying(&self, orientation: Orientation, position: usize) -> Option<usize> {
        let (start, end) = self.range(orientation);
        (start + position < end).then_some(start + position)
    }

    fn underlying_to_local(&self, orientation: Orientation, position: usize) -> Option<usize> {
        let (start, end) = self.range(orientation);
        (start..end).contains(&position).then(|| position - start)
    }

    fn extent(&self, orientation: Orientation) -> i32 {
        let (start, end) = self.range(orientation);
        self.underlying_start(orientation, end) - self.underlying_start(orientation, start)
    }

    fn start_of(&self, orientation: Orientation, position: usize) -> Option<i32> {
        let underlying = self.local_to_underlying(orientation, position)?;
        let (start, _) = self.range(orientation);
        Some(self.underlying_start(orientation, underlying) - self.underlying_start(orientation, start))
    }

    fn position_at(&self, orientation: Orientation, offset: i32) -> Option<usize> {
        if offset < 0 || offset >= self.extent(orientation) {
            return None;
        }
        let (start, _) = self.range(orientation);
        let origin = self.underlying_start(orientation, start);
        let underlying = axis::position_by_offset(self.underlying.as_ref(), orientation, offset + origin)?;
        self.underlying_to_local(orientation, underlying)
    }
}

impl LayerListener for FreezeLayer {
    fn handle_layer_event(&self, event: &LayerEvent) {
        match event {
            LayerEvent::Structural(structural) if structural.changes_positions() => {
                let orientation = structural.orientation;
                let (before, after) = {
                    let mut block = self.block.write();
                    let before = block.range(orientation);
                    let top_left = shift_boundary(before.0, &structural.diffs);
                    let bottom_right = shift_boundary(before.1, &structural.diffs);
                    block.top_left.set_position(orientation, top_left);
                    block.bottom_right.set_position(orientation, bottom_right);
                    (before, (top_left, bottom_right))
                };
                self.clamp();
                if before != after {
                    tracing::debug!(target: targets::FREEZE, ?orientation, ?before, ?after, "frozen block shifted");
                }
                let (start, end) = before;
                propagate_converted_with(self, event, |position| {
                    (start..end).contains(&position).then(|| position - start)
                });
                return;
            }
            LayerEvent::StructuralRefresh { .. } => self.clamp(),
            _ => {}
        }
        propagate_converted(self, event);
    }
}

impl Layer for FreezeLayer {
    fn base(&self) -> &LayerBase {
        &self.base
    }

    fn underlying(&self) -> Option<&Arc<dyn Layer>> {
        Some(&self.underlying)
    }

    fn column_count(&self) -> usize {
        self.count(Orientation::Horizontal)
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
        self.count(Orientation::Vertical)
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
}

static_assertions::assert_impl_all!(FreezeLayer: Send, Sync);

// =============================================================================
// Composite
// =============================================================================

/// Keeps the freeze layer, the viewport and the client area consistent.
struct FreezeControl {
    freeze: Arc<FreezeLayer>,
    viewport: Arc<ViewportLayer>,
    selection: Arc<SelectionLayer>,
    client_area: Mutex<Option<(i32, i32)>>,
}

impl FreezeControl {
    /// Freezes up to and including the given selection-frame positions;
    /// `None` leaves that axis as it is.
    fn freeze(&self, column_position: Option<usize>, row_position: Option<usize>) {
        let top_left = self.freeze.top_left();
        let bottom_right = self.freeze.bottom_right();
        let origin = (
            self.viewport.origin_column_position(),
            self.viewport.origin_row_position(),
        );

        let (left, right) = match column_position {
            Some(last) => (origin.0.min(last), last + 1),
            None => (top_left.column_position, bottom_right.column_position),
        };
        let (top, bottom) = match row_position {
            Some(last) => (origin.1.min(last), last + 1),
            None => (top_left.row_position, bottom_right.row_position),
        };

        self.viewport.set_minimum_origin(right, bottom);
        self.freeze.set_frozen((left, top), (right, bottom));
        self.apply_client_area();
    }

    fn freeze_selection(&self) {
        match self.selection.last_selected_position() {
            Some((column, row)) => self.freeze(Some(column), Some(row)),
            None => tracing::debug!(target: targets::FREEZE, "nothing selected to freeze"),
        }
    }

    fn unfreeze(&self) {
        let top_left = self.freeze.top_left();
        self.viewport.set_minimum_origin(0, 0);
        self.freeze.unfreeze();
        self.viewport
            .reset_origin(top_left.column_position, top_left.row_position);
        self.apply_client_area();
    }

    fn set_client_area(&self, width: i32, height: i32) {
        *self.client_area.lock() = Some((width, height));
        self.apply_client_area();
    }

    /// The viewport gets what the frozen block leaves of the client area.
    fn apply_client_area(&self) {
        let Some((width, height)) = *self.client_area.lock() else {
            return;
        };
        self.viewport.set_client_area(
            (width - self.freeze.width()).max(0),
            (height - self.freeze.height()).max(0),
        );
    }
}

impl CompositeCommandHandler for FreezeControl {
    fn do_command(&self, _composite: &CompositeLayer, command: &LayerCommand) -> bool {
        match command {
            LayerCommand::FreezeColumn { .. } | LayerCommand::FreezeRow { .. } | LayerCommand::FreezePosition { .. } => {
                match command.convert_to_target_layer(self.selection.as_ref()) {
                    Some(LayerCommand::FreezeColumn { column_position, .. }) => {
                        self.freeze(Some(column_position), None);
                    }
                    Some(LayerCommand::FreezeRow { row_position, .. }) => self.freeze(None, Some(row_position)),
                    Some(LayerCommand::FreezePosition {
                        column_position,
                        row_position,
                        ..
                    }) => self.freeze(Some(column_position), Some(row_position)),
                    _ => return false,
                }
                true
            }
            LayerCommand::FreezeSelection => {
                self.freeze_selection();
                true
            }
            LayerCommand::Unfreeze => {
                self.unfreeze();
                true
            }
            LayerCommand::ClientAreaResize { width, height } => {
                self.set_client_area(*width, *height);
                true
            }
            _ => false,
        }
    }
}

/// A body with frozen columns and rows.
///
/// `viewport` must wrap `selection` directly. The composite itself is the
/// layer to put into a grid; see [`CompositeFreezeLayer::layer`].
#[derive(Clone)]
pub struct CompositeFreezeLayer {
    composite: Arc<CompositeLayer>,
    control: Arc<FreezeControl>,
}

impl CompositeFreezeLayer {
    /// Builds the four regions over `selection` and `viewport`.
    pub fn new(selection: Arc<SelectionLayer>, viewport: Arc<ViewportLayer>) -> Result<Self> {
        let freeze = FreezeLayer::new(selection.clone());
        let frozen_rows =
            DimensionallyDependentLayer::new(selection.clone(), viewport.clone(), freeze.clone());
        let frozen_columns =
            DimensionallyDependentLayer::new(selection.clone(), freeze.clone(), viewport.clone());

        let composite = CompositeLayer::new(2, 2);
        composite.set_child_layer(NONFROZEN_REGION, viewport.clone(), 1, 1)?;
        composite.set_child_layer(FROZEN_ROW_REGION, frozen_rows, 1, 0)?;
        composite.set_child_layer(FROZEN_COLUMN_REGION, frozen_columns, 0, 1)?;
        composite.set_child_layer(FROZEN_REGION, freeze.clone(), 0, 0)?;

        let control = Arc::new(FreezeControl {
            freeze,
            viewport,
            selection,
            client_area: Mutex::new(None),
        });
        composite.add_command_handler(control.clone());
        Ok(Self { composite, control })
    }

    /// The composite, as a layer.
    pub fn layer(&self) -> Arc<dyn Layer> {
        self.composite.clone()
    }

    /// The composite.
    pub fn composite(&self) -> &Arc<CompositeLayer> {
        &self.composite
    }

    /// The frozen block.
    pub fn freeze_layer(&self) -> &Arc<FreezeLayer> {
        &self.control.freeze
    }

    /// The scrolling region.
    pub fn viewport_layer(&self) -> &Arc<ViewportLayer> {
        &self.control.viewport
    }

    /// The selection layer below both.
    pub fn selection_layer(&self) -> &Arc<SelectionLayer> {
        &self.control.selection
    }

    /// Freezes columns up to and including a selection-frame position.
    pub fn freeze_column(&self, column_position: usize) {
        self.control.freeze(Some(column_position), None);
    }

    /// Freezes rows up to and including a selection-frame position.
    pub fn freeze_row(&self, row_position: usize) {
        self.control.freeze(None, Some(row_position));
    }

    /// Freezes columns and rows up to and including a selection-frame cell.
    pub fn freeze_position(&self, column_position: usize, row_position: usize) {
        self.control.freeze(Some(column_position), Some(row_position));
    }

    /// Freezes up to the last selected cell.
    pub fn freeze_selection(&self) {
        self.control.freeze_selection();
    }

    /// Removes the freeze and scrolls back to where it started.
    pub fn unfreeze(&self) {
        self.control.unfreeze();
    }

    /// Whether anything is frozen.
    pub fn is_frozen(&self) -> bool {
        self.control.freeze.is_frozen()
    }
}

impl std::fmt::Debug for CompositeFreezeLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeFreezeLayer")
            .field("composite", &self.composite.id())
            .field("top_left", &self.control.freeze.top_left())
            .field("bottom_right", &self.control.freeze.bottom_right())
            .finish()
    }
}

static_assertions::assert_impl_all!(CompositeFreezeLayer: Send, Sync);
