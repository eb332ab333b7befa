//! Tracing targets and span names for the grid.
//!
//! The grid uses the `tracing` crate for instrumentation and never installs a
//! subscriber itself. To see logs, install one in the hosting application and
//! filter by the targets below:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("lattice_grid::viewport=debug,lattice_grid::command=trace")
//!     .init();
//! ```

/// Span names used by instrumented dispatch paths.
pub mod span_names {
    /// Event propagation up the layer stack.
    pub const FIRE_EVENT: &str = "lattice_grid::fire_event";
    /// Conflation tick.
    pub const CONFLATE: &str = "lattice_grid::conflate";
    /// Scheduler processing.
    pub const SCHEDULER: &str = "lattice_grid::scheduler";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Layer construction and state mutation.
    pub const LAYER: &str = "lattice_grid::layer";
    /// Command conversion and routing.
    pub const COMMAND: &str = "lattice_grid::command";
    /// Event conversion and propagation.
    pub const EVENT: &str = "lattice_grid::event";
    /// Viewport scrolling and clamping.
    pub const VIEWPORT: &str = "lattice_grid::viewport";
    /// Freeze boundaries.
    pub const FREEZE: &str = "lattice_grid::freeze";
    /// Selection model.
    pub const SELECTION: &str = "lattice_grid::selection";
    /// Visual-change conflation.
    pub const CONFLATION: &str = "lattice_grid::conflation";
    /// Background scheduler and UI executor.
    pub const SCHEDULER: &str = "lattice_grid::scheduler";
    /// Update event cache.
    pub const CACHE: &str = "lattice_grid::cache";
}
