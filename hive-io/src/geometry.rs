//! Detector geometry files.
//!
//! ```json
//! {
//!   "population": { "dense_string_start": 79, "surface_module_start": 61 },
//!   "sensors": [ { "string": 1, "module": 1, "x": 0.0, "y": 0.0, "z": 500.0 } ]
//! }
//! ```
//!
//! `population` is optional and defaults to the standard numbering rule.

use crate::Result;
use hive_core::geometry::{DetectorGeometry, PopulationRule, Position};
use hive_core::hit::SensorKey;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

#[derive(Serialize, Deserialize)]
struct JsonGeometry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    population: Option<PopulationRule>,
    sensors: Vec<JsonSensor>,
}

#[derive(Serialize, Deserialize)]
struct JsonSensor {
    string: u32,
    module: u32,
    x: f64,
    y: f64,
    z: f64,
}

impl JsonGeometry {
    fn into_geometry(self) -> Result<DetectorGeometry> {
        let rule = self.population.unwrap_or_default();
        let sensors = self
            .sensors
            .into_iter()
            .map(|s| (SensorKey::new(s.string, s.module), Position::new(s.x, s.y, s.z)));
        Ok(DetectorGeometry::new(sensors, rule)?)
    }

    fn from_geometry(geometry: &DetectorGeometry) -> Self {
        Self {
            population: Some(geometry.rule()),
            sensors: geometry
                .sensors()
                .map(|(key, p)| JsonSensor {
                    string: key.string,
                    module: key.module,
                    x: p.x,
                    y: p.y,
                    z: p.z,
                })
                .collect(),
        }
    }
}

/// Parses a geometry from a JSON string.
///
/// # Errors
/// Returns an error for malformed JSON, duplicate sensors or non-finite
/// positions.
pub fn geometry_from_json(json: &str) -> Result<DetectorGeometry> {
    let parsed: JsonGeometry = serde_json::from_str(json)?;
    parsed.into_geometry()
}

/// Loads a geometry file.
///
/// # Errors
/// Returns an error if the file cannot be read or its contents are invalid.
pub fn read_geometry<P: AsRef<Path>>(path: P) -> Result<DetectorGeometry> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let parsed: JsonGeometry = serde_json::from_reader(reader)?;
    let geometry = parsed.into_geometry()?;
    info!(
        "loaded geometry from {}: {} sensors on {} strings",
        path.display(),
        geometry.len(),
        geometry.string_count()
    );
    Ok(geometry)
}

/// Writes a geometry file.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_geometry<P: AsRef<Path>>(path: P, geometry: &DetectorGeometry) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &JsonGeometry::from_geometry(geometry))?;
    writer.flush()?;
    Ok(())
}
