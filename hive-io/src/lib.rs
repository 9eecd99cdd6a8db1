//! hive-io: JSON geometry, event and configuration I/O for hive.
//!
//! This crate reads detector geometries, recorded events and engine
//! configurations, and writes split or cleaned output as JSON or CSV.
//!

pub mod config;
mod error;
pub mod events;
pub mod geometry;
mod writer;

pub use config::HiveConfig;
pub use error::{Error, Result};
pub use events::{events_from_json, read_events, EventRecord};
pub use geometry::{geometry_from_json, read_geometry, write_geometry};
pub use writer::{OutputFormat, SubEventWriter};
