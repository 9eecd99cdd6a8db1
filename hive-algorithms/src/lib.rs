//! hive-algorithms: Causal hit splitting and isolated-hit cleaning.
//!
//! This crate provides:
//! - **Vicinity map** - precomputed pairwise ring connectivity over a geometry
//! - **Hive splitter** - union-find sweep into causally connected sub-events
//! - **Hive cleaning** - single-pass removal of hits without vicinity neighbours
//!
#![warn(missing_docs)]

mod cleaning;
mod processing;
mod splitter;
mod union_find;
pub mod vicinity;

pub use cleaning::{CleaningConfig, HiveCleaning};
pub use processing::{clean_and_split, process_events, ProcessingStatistics};
pub use splitter::{HiveSplitter, SplitterConfig, SplitterSetup};
pub use vicinity::{
    default_light_limits, default_vicinity_limits, ConnectionLimits, Ring, VicinityMap,
    VicinityStatistics, GROUP_INDEX_ICE, SPEED_OF_LIGHT_ICE, SPEED_OF_LIGHT_VACUUM,
};

// Re-export core engine traits
pub use hive_core::splitting::{CleanStatistics, HitCleaner, SplitStatistics, SubEventSplitter};
