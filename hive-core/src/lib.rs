//! hive-core: Core types for causal sub-event splitting.
//!
//! This crate provides the hit model, detector geometry with its dense
//! sensor index, ring and time-window limits, and the pairwise lookup
//! tables the splitting and cleaning engines are built on.
//!

pub mod error;
pub mod geometry;
pub mod hit;
pub mod limits;
pub mod matrix;
pub mod splitting;

pub use error::{Error, Result};
pub use geometry::{DetectorGeometry, GridLayout, Population, PopulationRule, Position, SensorIndex};
pub use hit::{Hit, HitSeries, HitSeriesSeries, Pulse, PulseMap, SensorKey};
pub use limits::{DensityLevel, RingLimitSet, RingLimits, RingSpacing, Window};
pub use matrix::{AsymmetricMatrix, SymmetricMatrix};
pub use splitting::{CleanStatistics, HitCleaner, SplitStatistics, SubEventSplitter};
