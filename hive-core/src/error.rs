//! Error types for hive-core.

use crate::hit::SensorKey;
use thiserror::Error;

/// Result type alias for hive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for hive operations.
///
/// Every variant is a configuration or geometry error. Per-event data
/// anomalies (unknown sensors, empty series) are never reported here; the
/// engines absorb them into ordinary connectivity results.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Multiplicity below one.
    #[error("invalid multiplicity {0}: at least one sensor is required")]
    InvalidMultiplicity(usize),

    /// A window with a NaN bound or an inverted range.
    #[error("invalid window `{name}`: [{lower}, {upper}]")]
    InvalidWindow {
        /// Parameter name.
        name: String,
        /// Lower bound as configured.
        lower: f64,
        /// Upper bound as configured.
        upper: f64,
    },

    /// Inconsistent ring-limit lists.
    #[error("invalid ring limits `{name}`: {reason}")]
    InvalidRingLimits {
        /// Parameter name.
        name: String,
        /// What is wrong with them.
        reason: String,
    },

    /// A non-positive or non-finite ring spacing.
    #[error("invalid ring spacing `{name}`: {value}")]
    InvalidSpacing {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },

    /// The same sensor appears twice in a geometry.
    #[error("duplicate sensor {0} in geometry")]
    DuplicateSensor(SensorKey),

    /// A sensor position with a non-finite coordinate.
    #[error("non-finite position for sensor {0}")]
    InvalidPosition(SensorKey),

    /// A synthetic layout that cannot be generated.
    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    /// Generic configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}
