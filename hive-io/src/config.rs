//! Engine configuration files.
//!
//! Every key is optional; missing keys keep their defaults. Ring limits use
//! the flat `[lo0, hi0, lo1, hi1, ...]` form and windows are `[lo, hi]`.
//!
//! ```json
//! {
//!   "spacing": { "single": 125.0, "double": 72.17, "triple": 41.67, "tolerance": 0.1 },
//!   "splitter": {
//!     "multiplicity": 4,
//!     "time_static": 200.0,
//!     "causal_vacuum": [-300.0, 300.0],
//!     "causal_ice": [-200.0, 200.0],
//!     "self_connect": false,
//!     "single_dense_ring_limits": [-255.0, 255.0, -272.7, 272.7, -165.8, 165.8],
//!     "single_dense_ring_vicinity": [-70.0, 70.0, -70.0, 70.0]
//!   },
//!   "cleaning": { "multiplicity": 1, "time_static": [-600.0, 600.0] }
//! }
//! ```

use crate::Result;
use hive_algorithms::{CleaningConfig, SplitterConfig};
use hive_core::limits::{RingLimitSet, RingLimits, RingSpacing, Window};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

// Intermediate structs for the flat-parameter JSON schema
#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct JsonConfig {
    spacing: JsonSpacing,
    splitter: JsonSplitter,
    cleaning: JsonCleaning,
}

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct JsonSpacing {
    single: Option<f64>,
    double: Option<f64>,
    triple: Option<f64>,
    tolerance: Option<f64>,
}

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct JsonSplitter {
    multiplicity: Option<usize>,
    time_static: Option<f64>,
    causal_vacuum: Option<[f64; 2]>,
    causal_ice: Option<[f64; 2]>,
    self_connect: Option<bool>,
    single_dense_ring_limits: Option<Vec<f64>>,
    double_dense_ring_limits: Option<Vec<f64>>,
    triple_dense_ring_limits: Option<Vec<f64>>,
    single_dense_ring_vicinity: Option<Vec<f64>>,
    double_dense_ring_vicinity: Option<Vec<f64>>,
    triple_dense_ring_vicinity: Option<Vec<f64>>,
}

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct JsonCleaning {
    multiplicity: Option<usize>,
    time_static: Option<[f64; 2]>,
    self_connect: Option<bool>,
    single_dense_ring_limits: Option<Vec<f64>>,
    double_dense_ring_limits: Option<Vec<f64>>,
    triple_dense_ring_limits: Option<Vec<f64>>,
}

fn window(value: Option<[f64; 2]>, default: Window) -> Window {
    value.map_or(default, |[lower, upper]| Window::new(lower, upper))
}

fn ring_limits(name: &str, value: Option<Vec<f64>>, default: &RingLimits) -> Result<RingLimits> {
    match value {
        Some(flat) => Ok(RingLimits::from_flat(name, &flat)?),
        None => Ok(default.clone()),
    }
}

fn ring_limit_set(
    names: [&str; 3],
    values: [Option<Vec<f64>>; 3],
    default: &RingLimitSet,
) -> Result<RingLimitSet> {
    let [single, double, triple] = values;
    Ok(RingLimitSet::new(
        ring_limits(names[0], single, &default.single)?,
        ring_limits(names[1], double, &default.double)?,
        ring_limits(names[2], triple, &default.triple)?,
    ))
}

impl JsonSpacing {
    fn into_spacing(self) -> RingSpacing {
        let default = RingSpacing::default();
        RingSpacing {
            single: self.single.unwrap_or(default.single),
            double: self.double.unwrap_or(default.double),
            triple: self.triple.unwrap_or(default.triple),
            tolerance: self.tolerance.unwrap_or(default.tolerance),
        }
    }
}

impl JsonSplitter {
    fn into_config(self, spacing: RingSpacing) -> Result<SplitterConfig> {
        let default = SplitterConfig::default();
        Ok(SplitterConfig {
            multiplicity: self.multiplicity.unwrap_or(default.multiplicity),
            time_static: self.time_static.unwrap_or(default.time_static),
            causal_vacuum: window(self.causal_vacuum, default.causal_vacuum),
            causal_ice: window(self.causal_ice, default.causal_ice),
            self_connect: self.self_connect.unwrap_or(default.self_connect),
            light_limits: ring_limit_set(
                [
                    "single_dense_ring_limits",
                    "double_dense_ring_limits",
                    "triple_dense_ring_limits",
                ],
                [
                    self.single_dense_ring_limits,
                    self.double_dense_ring_limits,
                    self.triple_dense_ring_limits,
                ],
                &default.light_limits,
            )?,
            vicinity_limits: ring_limit_set(
                [
                    "single_dense_ring_vicinity",
                    "double_dense_ring_vicinity",
                    "triple_dense_ring_vicinity",
                ],
                [
                    self.single_dense_ring_vicinity,
                    self.double_dense_ring_vicinity,
                    self.triple_dense_ring_vicinity,
                ],
                &default.vicinity_limits,
            )?,
            spacing,
        })
    }
}

impl JsonCleaning {
    fn into_config(self, spacing: RingSpacing) -> Result<CleaningConfig> {
        let default = CleaningConfig::default();
        Ok(CleaningConfig {
            multiplicity: self.multiplicity.unwrap_or(default.multiplicity),
            time_static: window(self.time_static, default.time_static),
            self_connect: self.self_connect.unwrap_or(default.self_connect),
            vicinity_limits: ring_limit_set(
                [
                    "single_dense_ring_limits",
                    "double_dense_ring_limits",
                    "triple_dense_ring_limits",
                ],
                [
                    self.single_dense_ring_limits,
                    self.double_dense_ring_limits,
                    self.triple_dense_ring_limits,
                ],
                &default.vicinity_limits,
            )?,
            spacing,
        })
    }
}

/// Splitter and cleaning configuration loaded from one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HiveConfig {
    /// Splitter parameters.
    pub splitter: SplitterConfig,
    /// Cleaning parameters.
    pub cleaning: CleaningConfig,
}

impl HiveConfig {
    /// Load configuration from a JSON file.
    ///
    /// Both engine configurations are validated.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is malformed, or holds
    /// invalid parameters.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let json_config: JsonConfig = serde_json::from_reader(reader)?;
        Self::from_json_config(json_config)
    }

    /// Load configuration from a JSON string.
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed or holds invalid parameters.
    pub fn from_json(json: &str) -> Result<Self> {
        let json_config: JsonConfig = serde_json::from_str(json)?;
        Self::from_json_config(json_config)
    }

    fn from_json_config(config: JsonConfig) -> Result<Self> {
        let spacing = config.spacing.into_spacing();
        let loaded = Self {
            splitter: config.splitter.into_config(spacing)?,
            cleaning: config.cleaning.into_config(spacing)?,
        };
        loaded.validate()?;
        Ok(loaded)
    }

    /// Validates both engine configurations.
    ///
    /// # Errors
    /// Returns the first validation error.
    pub fn validate(&self) -> Result<()> {
        self.splitter.validate()?;
        self.cleaning.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = HiveConfig::from_json("{}").unwrap();
        assert_eq!(config, HiveConfig::default());
    }

    #[test]
    fn test_partial_config() {
        let json = r#"{
            "spacing": {"single": 120.0},
            "splitter": {
                "multiplicity": 3,
                "causal_ice": [-150.0, 250.0],
                "single_dense_ring_limits": [-100.0, 100.0, -50.0, 50.0]
            },
            "cleaning": {"time_static": [-300.0, 500.0], "self_connect": true}
        }"#;
        let config = HiveConfig::from_json(json).unwrap();

        assert_eq!(config.splitter.multiplicity, 3);
        assert_eq!(config.splitter.causal_ice, Window::new(-150.0, 250.0));
        assert_eq!(config.splitter.causal_vacuum, Window::symmetric(300.0));
        assert_eq!(
            config.splitter.light_limits.single,
            RingLimits::symmetric(&[100.0, 50.0])
        );
        assert_eq!(
            config.splitter.light_limits.double,
            SplitterConfig::default().light_limits.double
        );
        assert!((config.splitter.spacing.single - 120.0).abs() < f64::EPSILON);
        assert_eq!(config.cleaning.spacing, config.splitter.spacing);
        assert_eq!(config.cleaning.time_static, Window::new(-300.0, 500.0));
        assert!(config.cleaning.self_connect);
        assert_eq!(config.cleaning.multiplicity, 1);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let zero = r#"{"splitter": {"multiplicity": 0}}"#;
        assert!(matches!(
            HiveConfig::from_json(zero),
            Err(Error::CoreError(hive_core::Error::InvalidMultiplicity(0)))
        ));

        let odd = r#"{"cleaning": {"single_dense_ring_limits": [-70.0, 70.0, -70.0]}}"#;
        assert!(matches!(
            HiveConfig::from_json(odd),
            Err(Error::CoreError(hive_core::Error::InvalidRingLimits { .. }))
        ));

        let inverted = r#"{"splitter": {"causal_vacuum": [10.0, -10.0]}}"#;
        assert!(HiveConfig::from_json(inverted).is_err());

        let unknown = r#"{"splitter": {"multiplicty": 2}}"#;
        assert!(matches!(HiveConfig::from_json(unknown), Err(Error::Json(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{"cleaning": {"multiplicity": 2}}"#).unwrap();
        let config = HiveConfig::from_file(file.path()).unwrap();
        assert_eq!(config.cleaning.multiplicity, 2);
    }
}
