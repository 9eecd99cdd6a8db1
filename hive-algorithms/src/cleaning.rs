//! Isolated-hit cleaning.
//!
//! A hit survives if enough distinct sensors in its static vicinity have a
//! hit inside the time window around it. Every hit is judged against the
//! unfiltered input, so removing one hit never affects the verdict on
//! another.
#![allow(clippy::module_name_repetitions)]

use crate::vicinity::{default_vicinity_limits, ConnectionLimits, VicinityMap};
use hive_core::error::{Error, Result};
use hive_core::geometry::DetectorGeometry;
use hive_core::hit::HitSeries;
use hive_core::limits::{RingLimitSet, RingSpacing, Window};
use hive_core::splitting::{CleanStatistics, HitCleaner};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Cleaning configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CleaningConfig {
    /// Distinct neighbour sensors required to keep a hit.
    pub multiplicity: usize,
    /// Window on `t_neighbour - t_hit` (nanoseconds).
    pub time_static: Window,
    /// Whether other hits on the same sensor count as neighbours.
    pub self_connect: bool,
    /// Rings of static vicinity.
    pub vicinity_limits: RingLimitSet,
    /// String spacing used for ring counting.
    pub spacing: RingSpacing,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            multiplicity: 1,
            time_static: Window::symmetric(600.0),
            self_connect: false,
            vicinity_limits: default_vicinity_limits(),
            spacing: RingSpacing::default(),
        }
    }
}

impl CleaningConfig {
    /// Set the neighbour multiplicity.
    #[must_use]
    pub fn with_multiplicity(mut self, multiplicity: usize) -> Self {
        self.multiplicity = multiplicity;
        self
    }

    /// Set the neighbour time window.
    #[must_use]
    pub fn with_time_static(mut self, window: Window) -> Self {
        self.time_static = window;
        self
    }

    /// Allow or forbid same-sensor neighbours.
    #[must_use]
    pub fn with_self_connect(mut self, self_connect: bool) -> Self {
        self.self_connect = self_connect;
        self
    }

    /// Set the vicinity rings.
    #[must_use]
    pub fn with_vicinity_limits(mut self, limits: RingLimitSet) -> Self {
        self.vicinity_limits = limits;
        self
    }

    /// Set the ring spacing.
    #[must_use]
    pub fn with_spacing(mut self, spacing: RingSpacing) -> Self {
        self.spacing = spacing;
        self
    }

    /// Limits the vicinity map must be built with. Cleaning never tests
    /// light causality.
    #[must_use]
    pub fn connection_limits(&self) -> ConnectionLimits {
        ConnectionLimits {
            vicinity: self.vicinity_limits.clone(),
            light: RingLimitSet::empty(),
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns an error for a multiplicity below one, an invalid time
    /// window, inconsistent or empty vicinity limits, or an invalid spacing.
    pub fn validate(&self) -> Result<()> {
        if self.multiplicity == 0 {
            return Err(Error::InvalidMultiplicity(self.multiplicity));
        }
        self.time_static.validate("time_static")?;
        self.vicinity_limits.validate("vicinity_limits")?;
        if self.vicinity_limits.is_empty() {
            return Err(Error::InvalidRingLimits {
                name: "vicinity_limits".to_string(),
                reason: "no ring configured at any density level".to_string(),
            });
        }
        self.spacing.validate()
    }
}

/// Vicinity-based cleaner over a shared [`VicinityMap`].
#[derive(Debug, Clone)]
pub struct HiveCleaning {
    config: CleaningConfig,
    map: Arc<VicinityMap>,
}

impl HiveCleaning {
    /// Validates `config` and builds the vicinity map for `geometry`.
    ///
    /// # Errors
    /// Returns the validation error of [`CleaningConfig::validate`].
    pub fn new(config: CleaningConfig, geometry: Arc<DetectorGeometry>) -> Result<Self> {
        config.validate()?;
        let map = VicinityMap::build(
            geometry,
            &config.spacing,
            &config.connection_limits(),
            config.self_connect,
        );
        Self::with_map(config, Arc::new(map))
    }

    /// Reuses a prebuilt map.
    ///
    /// # Errors
    /// Returns a validation error, or [`Error::ConfigError`] if the map was
    /// built with a different spacing, limits or self-connection flag.
    pub fn with_map(config: CleaningConfig, map: Arc<VicinityMap>) -> Result<Self> {
        config.validate()?;
        if map.spacing() != &config.spacing
            || map.limits() != &config.connection_limits()
            || map.self_connect() != config.self_connect
        {
            return Err(Error::ConfigError(
                "vicinity map was built with different limits".to_string(),
            ));
        }
        info!(
            "hive cleaning ready: multiplicity {}, window [{}, {}] ns",
            config.multiplicity, config.time_static.lower, config.time_static.upper
        );
        Ok(Self { config, map })
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// The shared vicinity map.
    #[must_use]
    pub fn map(&self) -> &Arc<VicinityMap> {
        &self.map
    }

    /// Returns the surviving hits in input order.
    #[must_use]
    pub fn clean(&self, hits: &HitSeries) -> HitSeries {
        self.clean_with_statistics(hits).0
    }

    /// Cleans `hits` and reports how many survived.
    #[must_use]
    pub fn clean_with_statistics(&self, hits: &HitSeries) -> (HitSeries, CleanStatistics) {
        let slice = hits.as_slice();
        let n = slice.len();
        let window = self.config.time_static;

        let sensors: Vec<Option<usize>> = slice
            .iter()
            .map(|hit| self.map.index_of(hit.sensor()))
            .collect();
        let unknown = sensors.iter().filter(|s| s.is_none()).count();
        if unknown > 0 {
            warn!("{unknown} of {n} hits on sensors outside the geometry; removed as isolated");
        }

        // stamp[s] == j marks sensor s as already counted for hit j.
        let mut stamp = vec![usize::MAX; self.map.len()];
        let mut keep = vec![false; n];

        for (j, hit) in slice.iter().enumerate() {
            let t = hit.time();
            if !t.is_finite() {
                continue;
            }
            let Some(a) = sensors[j] else {
                continue;
            };

            let start = slice.partition_point(|other| other.time() < t + window.lower);
            let mut count = 0;
            for (k, other) in slice.iter().enumerate().skip(start) {
                let dt = other.time() - t;
                if dt > window.upper {
                    break;
                }
                if k == j || !window.contains(dt) {
                    continue;
                }
                let Some(b) = sensors[k] else {
                    continue;
                };
                if stamp[b] == j || !self.map.in_vicinity(a, b) {
                    continue;
                }
                stamp[b] = j;
                count += 1;
                if count >= self.config.multiplicity {
                    keep[j] = true;
                    break;
                }
            }
        }

        let cleaned = hits.retain_mask(&keep);
        let stats = CleanStatistics {
            hits_processed: n,
            hits_kept: cleaned.len(),
        };
        debug!(
            "cleaned {n} hits: {} kept, {} removed",
            stats.hits_kept,
            stats.hits_removed()
        );
        (cleaned, stats)
    }

    /// Cleans many events in parallel.
    #[must_use]
    pub fn clean_events(&self, events: &[HitSeries]) -> Vec<HitSeries> {
        events.par_iter().map(|hits| self.clean(hits)).collect()
    }
}

impl HitCleaner for HiveCleaning {
    fn clean(&self, hits: &HitSeries) -> HitSeries {
        HiveCleaning::clean(self, hits)
    }

    fn name(&self) -> &'static str {
        "HiveCleaning"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_core::geometry::GridLayout;
    use hive_core::hit::{Hit, SensorKey};

    fn cleaner(config: CleaningConfig) -> HiveCleaning {
        let geometry = GridLayout::hexagonal(2).with_modules(30, 17.0).build().unwrap();
        HiveCleaning::new(config, Arc::new(geometry)).unwrap()
    }

    fn hit(string: u32, module: u32, time: f64) -> Hit {
        Hit::new(SensorKey::new(string, module), time, 1.0)
    }

    #[test]
    fn test_isolated_hit_removed() {
        let cleaning = cleaner(CleaningConfig::default());
        let hits = HitSeries::from_hits(vec![
            hit(1, 10, 0.0),
            hit(1, 11, 100.0),
            hit(19, 29, 50.0),
        ]);
        let (cleaned, stats) = cleaning.clean_with_statistics(&hits);
        assert_eq!(cleaned.len(), 2);
        assert!(cleaned.iter().all(|h| h.sensor().string == 1));
        assert_eq!(stats.hits_removed(), 1);
    }

    #[test]
    fn test_time_window_bounds() {
        let cleaning = cleaner(CleaningConfig::default());
        let inside = HitSeries::from_hits(vec![hit(1, 10, 0.0), hit(1, 11, 600.0)]);
        assert_eq!(cleaning.clean(&inside).len(), 2);

        let outside = HitSeries::from_hits(vec![hit(1, 10, 0.0), hit(1, 11, 600.5)]);
        assert!(cleaning.clean(&outside).is_empty());
    }

    #[test]
    fn test_asymmetric_window() {
        // Only neighbours that come later count.
        let cleaning = cleaner(CleaningConfig::default().with_time_static(Window::new(0.0, 500.0)));
        let hits = HitSeries::from_hits(vec![hit(1, 10, 0.0), hit(1, 11, 100.0)]);
        let cleaned = cleaning.clean(&hits);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned.as_slice()[0].sensor(), SensorKey::new(1, 10));
    }

    #[test]
    fn test_multiplicity_counts_distinct_sensors() {
        let cleaning = cleaner(CleaningConfig::default().with_multiplicity(2));
        // Two hits on one neighbour sensor are a single neighbour.
        let hits = HitSeries::from_hits(vec![
            hit(1, 10, 0.0),
            hit(1, 11, 10.0),
            hit(1, 11, 20.0),
        ]);
        let cleaned = cleaning.clean(&hits);
        assert!(cleaned
            .iter()
            .all(|h| h.sensor() != SensorKey::new(1, 10)));

        let with_second = HitSeries::from_hits(vec![
            hit(1, 10, 0.0),
            hit(1, 11, 10.0),
            hit(1, 9, 20.0),
        ]);
        let cleaned = cleaning.clean(&with_second);
        assert!(cleaned.iter().any(|h| h.sensor() == SensorKey::new(1, 10)));
    }

    #[test]
    fn test_self_connect_counts_same_sensor() {
        let hits = HitSeries::from_hits(vec![hit(1, 10, 0.0), hit(1, 10, 50.0)]);
        assert!(cleaner(CleaningConfig::default()).clean(&hits).is_empty());

        let cleaning = cleaner(CleaningConfig::default().with_self_connect(true));
        assert_eq!(cleaning.clean(&hits).len(), 2);
    }

    #[test]
    fn test_non_finite_and_unknown_hits_removed() {
        let cleaning = cleaner(CleaningConfig::default());
        let hits = HitSeries::from_hits(vec![
            hit(1, 10, 0.0),
            hit(1, 11, f64::NAN),
            hit(1, 12, 10.0),
            hit(99, 1, 5.0),
        ]);
        let cleaned = cleaning.clean(&hits);
        assert_eq!(cleaned.len(), 2);
        assert!(cleaned.iter().all(|h| h.time().is_finite()));
    }

    #[test]
    fn test_validation() {
        assert_eq!(
            CleaningConfig::default().with_multiplicity(0).validate(),
            Err(Error::InvalidMultiplicity(0))
        );
        assert!(CleaningConfig::default()
            .with_time_static(Window::new(1.0, -1.0))
            .validate()
            .is_err());
        assert!(matches!(
            CleaningConfig::default()
                .with_vicinity_limits(RingLimitSet::empty())
                .validate(),
            Err(Error::InvalidRingLimits { .. })
        ));
    }

    #[test]
    fn test_trait_and_batch() {
        let cleaning = cleaner(CleaningConfig::default());
        let dynamic: &dyn HitCleaner = &cleaning;
        assert_eq!(dynamic.name(), "HiveCleaning");

        let events = vec![
            HitSeries::from_hits(vec![hit(1, 10, 0.0), hit(1, 11, 5.0)]),
            HitSeries::from_hits(vec![hit(1, 10, 0.0)]),
            HitSeries::new(),
        ];
        let cleaned = cleaning.clean_events(&events);
        assert_eq!(cleaned.iter().map(HitSeries::len).collect::<Vec<_>>(), vec![2, 0, 0]);
    }
}
