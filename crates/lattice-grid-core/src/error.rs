//! Error types for the grid core.
//!
//! Coordinate queries never fail: an out-of-range lookup answers `None`.
//! The variants here cover setup-time misuse, which should fail loudly while
//! a table is being assembled.

use std::path::PathBuf;

/// Result type alias for grid operations.
pub type Result<T> = std::result::Result<T, GridError>;

/// Errors raised while building or configuring a grid.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    /// A range was constructed with `start > end`.
    #[error("Invalid range: start {start} is after end {end}")]
    InvalidRange { start: usize, end: usize },

    /// A child layer was placed outside the composite layout.
    #[error("Layout slot ({x}, {y}) is outside a {columns}x{rows} composite")]
    LayoutOutOfBounds {
        x: usize,
        y: usize,
        columns: usize,
        rows: usize,
    },

    /// A configuration value was rejected.
    #[error("Invalid value for '{key}': {message}")]
    InvalidConfig { key: String, message: String },

    /// The configuration file could not be read.
    #[error("Failed to read configuration '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration text is not valid TOML for this schema.
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A background scheduler could not be started.
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// The background scheduler has already been stopped.
    #[error("The scheduler has already been stopped")]
    SchedulerStopped,
}

impl GridError {
    /// Create a configuration error.
    pub fn invalid_config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = GridError::InvalidRange { start: 4, end: 1 };
        assert_eq!(err.to_string(), "Invalid range: start 4 is after end 1");

        let err = GridError::invalid_config("default_column_width", "must be positive");
        assert_eq!(
            err.to_string(),
            "Invalid value for 'default_column_width': must be positive"
        );

        let err = GridError::LayoutOutOfBounds {
            x: 2,
            y: 0,
            columns: 2,
            rows: 2,
        };
        assert!(err.to_string().contains("(2, 0)"));
    }

    #[test]
    fn test_io_error_has_source() {
        use std::error::Error as _;

        let err = GridError::io(
            "grid.toml",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(err.source().is_some());
        assert!(err.to_string().contains("grid.toml"));
    }
}
