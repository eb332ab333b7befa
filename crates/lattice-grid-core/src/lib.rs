//! Core primitives for Lattice Grid.
//!
//! This crate provides the value types and background machinery the layer
//! stack in `lattice-grid` is built on:
//!
//! - **Coordinates**: [`Range`], [`Rectangle`], [`PositionCoordinate`] and
//!   [`LayerId`]
//! - **Structural diffs**: [`StructuralDiff`] and the [`shift_boundary`]
//!   arithmetic used to keep pinned positions valid across changes
//! - **Configuration**: [`GridConfig`] loaded from TOML
//! - **Scheduling**: [`TaskScheduler`] and its threaded wrapper
//!   [`BackgroundScheduler`]
//! - **UI marshalling**: the [`UiExecutor`] trait with [`UiQueue`] and
//!   [`UiThread`]
//!
//! # Example
//!
//! ```
//! use lattice_grid_core::{shift_boundary, Range, StructuralDiff};
//!
//! // Two columns were removed in front of a frozen boundary at position 5.
//! let diffs = [StructuralDiff::delete(Range::new(2, 4))];
//! assert_eq!(shift_boundary(5, &diffs), 3);
//! ```

pub mod config;
pub mod coordinate;
pub mod diff;
pub mod error;
pub mod executor;
pub mod logging;
pub mod scheduler;

pub use config::{ConflationConfig, GridConfig, UpdateCacheConfig};
pub use coordinate::{
    LayerId, Orientation, PositionCoordinate, Range, Rectangle, ranges_from_positions,
};
pub use diff::{DiffType, StructuralDiff, net_delta, shift_boundary};
pub use error::{GridError, Result};
pub use executor::{UiExecutor, UiQueue, UiTask, UiThread};
pub use scheduler::{BackgroundScheduler, ScheduledTaskId, ScheduledTaskKind, TaskScheduler};
