//! Lattice Grid - a virtualized table core built from layers.
//!
//! A grid is a stack of [`Layer`]s over a [`DataProvider`]. Each layer owns
//! a dense position space per axis and maps it to the layer below:
//!
//! - [`DataLayer`]: positions are provider indices; owns sizes
//! - [`ReorderLayer`], [`HideShowLayer`]: index transforms
//! - [`ColumnGroupReorderLayer`]: rejects reorders that break unbreakable groups
//! - [`SelectionLayer`]: selection state and display modes
//! - [`ViewportLayer`], [`FreezeLayer`], [`CompositeFreezeLayer`]: scrolling and freezing
//! - [`CompositeLayer`], [`DimensionallyDependentLayer`], [`GridLayer`]: regions
//!
//! Commands ([`LayerCommand`]) travel down the stack until a layer consumes
//! them; events ([`LayerEvent`]) travel up, converted into each layer's frame.
//! [`EventConflaterChain`] batches visual events into one refresh per tick and
//! [`UpdateEventsCache`] remembers recent data updates.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use lattice_grid::{DefaultGridLayer, DummyDataProvider, GridConfig, Layer, LayerCommand};
//!
//! let provider = Arc::new(DummyDataProvider::new(20, 20));
//! let grid = DefaultGridLayer::new(provider, Vec::new(), &GridConfig::default())?;
//! let layer = grid.layer();
//!
//! // 40px row header + five 100px columns; 20px column header + ten 20px rows.
//! layer.do_command(&LayerCommand::ClientAreaResize { width: 540, height: 220 });
//! assert_eq!(layer.column_count(), 6);
//! assert_eq!(layer.row_count(), 11);
//! # Ok::<(), lattice_grid::GridError>(())
//! ```

pub mod command;
pub mod conflation;
pub mod data;
pub mod event;
pub mod event_cache;
pub mod grid;
pub mod label;
pub mod layer;
pub mod size;

pub use command::{CellMeasure, LayerCommand};
pub use conflation::{EventConflater, EventConflaterChain, RefreshCallback, VisualChangeEventConflater};
pub use data::{
    CellValue, ColumnHeaderDataProvider, CornerDataProvider, DataProvider, DummyDataProvider, RowHeaderDataProvider,
    VecDataProvider,
};
pub use event::{LayerEvent, StructuralChangeEvent, StructuralKind};
pub use event_cache::UpdateEventsCache;
pub use grid::{BodyLayerStack, DefaultGridLayer, GridLayer};
pub use label::{AggregateLabelAccumulator, ColumnOverrideLabelAccumulator, ConfigLabelAccumulator, LabelStack};
pub use layer::{
    CellBounds, ColumnGroup, ColumnGroupModel, ColumnGroupReorderLayer, CompositeCommandHandler, CompositeFreezeLayer,
    CompositeLayer, DataLayer, DimensionallyDependentLayer, DisplayMode, FreezeLayer, HideShowLayer, Layer, LayerBase,
    LayerCell, LayerListener, ListenerId, ReorderLayer, SelectionLayer, SelectionModifiers, ViewportLayer,
    register_listener,
};
pub use size::SizeConfig;

pub use lattice_grid_core::{
    ConflationConfig, GridConfig, GridError, LayerId, Orientation, PositionCoordinate, Range, Rectangle, Result,
    UiExecutor, UiQueue, UiThread, UpdateCacheConfig,
};
