//! Grid configuration.
//!
//! [`GridConfig`] carries the default sizes used when a grid is assembled and
//! the timings of the background work (visual-change conflation and the
//! update event cache). Every field has a default, so a TOML document only
//! needs to name what it overrides:
//!
//! ```
//! use lattice_grid_core::GridConfig;
//!
//! let config = GridConfig::from_toml_str(
//!     r#"
//!     default_column_width = 80
//!
//!     [conflation]
//!     refresh_interval_ms = 40
//!     "#,
//! )?;
//! assert_eq!(config.default_column_width, 80);
//! assert_eq!(config.default_row_height, 20);
//! assert_eq!(config.conflation.refresh_interval().as_millis(), 40);
//! # Ok::<(), lattice_grid_core::GridError>(())
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};

/// Sizes and timings for a grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    /// Width in pixels of a body column without an explicit size.
    pub default_column_width: u32,
    /// Height in pixels of a body row without an explicit size.
    pub default_row_height: u32,
    /// Height in pixels of the column header row.
    pub column_header_height: u32,
    /// Width in pixels of the row header column.
    pub row_header_width: u32,
    /// Visual-change conflation timings.
    pub conflation: ConflationConfig,
    /// Update event cache timings.
    pub update_cache: UpdateCacheConfig,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            default_column_width: 100,
            default_row_height: 20,
            column_header_height: 20,
            row_header_width: 40,
            conflation: ConflationConfig::default(),
            update_cache: UpdateCacheConfig::default(),
        }
    }
}

/// Timings of the conflation chain's periodic flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConflationConfig {
    /// Delay before the first flush, in milliseconds.
    pub initial_delay_ms: u64,
    /// Interval between flushes, in milliseconds.
    pub refresh_interval_ms: u64,
}

impl Default for ConflationConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 100,
            refresh_interval_ms: 20,
        }
    }
}

impl ConflationConfig {
    /// Delay before the first flush.
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Interval between flushes.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

/// Timings of the update event cache sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpdateCacheConfig {
    /// How long a cached update stays alive, in milliseconds.
    pub time_to_live_ms: u64,
    /// Delay before the first sweep, in milliseconds.
    pub initial_delay_ms: u64,
}

impl Default for UpdateCacheConfig {
    fn default() -> Self {
        Self {
            time_to_live_ms: 500,
            initial_delay_ms: 100,
        }
    }
}

impl UpdateCacheConfig {
    /// How long a cached update stays alive. Also the sweep period.
    pub fn time_to_live(&self) -> Duration {
        Duration::from_millis(self.time_to_live_ms)
    }

    /// Delay before the first sweep.
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }
}

impl GridConfig {
    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: GridConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| GridError::io(path, e))?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(
            target: crate::logging::targets::LAYER,
            path = %path.display(),
            "loaded grid configuration"
        );
        Ok(config)
    }

    /// Rejects zero sizes and zero intervals.
    pub fn validate(&self) -> Result<()> {
        let sizes = [
            ("default_column_width", self.default_column_width),
            ("default_row_height", self.default_row_height),
            ("column_header_height", self.column_header_height),
            ("row_header_width", self.row_header_width),
        ];
        for (key, value) in sizes {
            if value == 0 {
                return Err(GridError::invalid_config(key, "size must be positive"));
            }
        }

        let intervals = [
            (
                "conflation.refresh_interval_ms",
                self.conflation.refresh_interval_ms,
            ),
            (
                "update_cache.time_to_live_ms",
                self.update_cache.time_to_live_ms,
            ),
        ];
        for (key, value) in intervals {
            if value == 0 {
                return Err(GridError::invalid_config(key, "interval must be positive"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GridConfig::default();
        assert_eq!(config.default_column_width, 100);
        assert_eq!(config.default_row_height, 20);
        assert_eq!(config.column_header_height, 20);
        assert_eq!(config.row_header_width, 40);
        assert_eq!(config.conflation.initial_delay(), Duration::from_millis(100));
        assert_eq!(config.conflation.refresh_interval(), Duration::from_millis(20));
        assert_eq!(config.update_cache.time_to_live(), Duration::from_millis(500));
        assert_eq!(config.update_cache.initial_delay(), Duration::from_millis(100));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = GridConfig::from_toml_str("").unwrap();
        assert_eq!(config, GridConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = GridConfig::from_toml_str(
            "row_header_width = 60\n[update_cache]\ntime_to_live_ms = 100\n",
        )
        .unwrap();
        assert_eq!(config.row_header_width, 60);
        assert_eq!(config.update_cache.time_to_live_ms, 100);
        assert_eq!(config.update_cache.initial_delay_ms, 100);
    }

    #[test]
    fn test_zero_size_rejected() {
        let err = GridConfig::from_toml_str("default_row_height = 0").unwrap_err();
        assert!(matches!(
            err,
            GridError::InvalidConfig { ref key, .. } if key == "default_row_height"
        ));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = GridConfig::from_toml_str("[conflation]\nrefresh_interval_ms = 0").unwrap_err();
        assert!(matches!(err, GridError::InvalidConfig { .. }));
    }

    #[test]
    fn test_unknown_key_is_parse_error() {
        let err = GridConfig::from_toml_str("column_width = 5").unwrap_err();
        assert!(matches!(err, GridError::Parse(_)));
    }
}
