//! Event files.
//!
//! ```json
//! {
//!   "events": [
//!     { "id": 7, "sensors": [
//!         { "string": 1, "module": 5, "pulses": [ { "time": 10.0, "charge": 1.2 } ] }
//!     ] }
//!   ]
//! }
//! ```
//!
//! `flags` on a pulse is optional. Split output adds a `sub_event` index to
//! each entry and is readable with the same schema.

use crate::Result;
use hive_core::hit::{HitSeries, Pulse, PulseMap, SensorKey};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Serialize, Deserialize, Default)]
pub(crate) struct JsonEvents {
    pub(crate) events: Vec<JsonEvent>,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct JsonEvent {
    pub(crate) id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) sub_event: Option<usize>,
    pub(crate) sensors: Vec<JsonSensorPulses>,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct JsonSensorPulses {
    pub(crate) string: u32,
    pub(crate) module: u32,
    pub(crate) pulses: Vec<Pulse>,
}

impl JsonEvent {
    pub(crate) fn from_hits(id: u64, sub_event: Option<usize>, hits: &HitSeries) -> Self {
        Self {
            id,
            sub_event,
            sensors: hits
                .to_pulse_map()
                .into_iter()
                .map(|(key, pulses)| JsonSensorPulses {
                    string: key.string,
                    module: key.module,
                    pulses,
                })
                .collect(),
        }
    }
}

/// One recorded event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    /// Event identifier.
    pub id: u64,
    /// Sub-event index, present on split output.
    pub sub_event: Option<usize>,
    /// Pulses per sensor.
    pub pulses: PulseMap,
}

impl EventRecord {
    /// Flattens the pulses into a time-ordered hit series.
    #[must_use]
    pub fn hits(&self) -> HitSeries {
        HitSeries::from_pulse_map(&self.pulses)
    }
}

impl From<JsonEvent> for EventRecord {
    fn from(event: JsonEvent) -> Self {
        let mut pulses = PulseMap::new();
        for sensor in event.sensors {
            pulses
                .entry(SensorKey::new(sensor.string, sensor.module))
                .or_default()
                .extend(sensor.pulses);
        }
        for list in pulses.values_mut() {
            list.sort_by(|a, b| a.time.total_cmp(&b.time));
        }
        Self {
            id: event.id,
            sub_event: event.sub_event,
            pulses,
        }
    }
}

/// Parses events from a JSON string.
///
/// # Errors
/// Returns an error for malformed JSON.
pub fn events_from_json(json: &str) -> Result<Vec<EventRecord>> {
    let parsed: JsonEvents = serde_json::from_str(json)?;
    Ok(parsed.events.into_iter().map(EventRecord::from).collect())
}

/// Loads an event file.
///
/// # Errors
/// Returns an error if the file cannot be read or is malformed.
pub fn read_events<P: AsRef<Path>>(path: P) -> Result<Vec<EventRecord>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let parsed: JsonEvents = serde_json::from_reader(reader)?;
    let events: Vec<EventRecord> = parsed.events.into_iter().map(EventRecord::from).collect();
    info!("loaded {} events from {}", events.len(), path.display());
    Ok(events)
}
