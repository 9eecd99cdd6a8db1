//! Causal sub-event splitter.
//!
//! Sweeps a time-ordered hit series once, testing each new hit against
//! the hits still inside the sweep horizon, and merges causally connected
//! hits with union-find. Components with enough distinct sensors become
//! sub-events.
#![allow(clippy::cast_precision_loss, clippy::module_name_repetitions)]

use crate::union_find::UnionFind;
use crate::vicinity::{
    default_light_limits, default_vicinity_limits, ConnectionLimits, VicinityMap,
    SPEED_OF_LIGHT_ICE, SPEED_OF_LIGHT_VACUUM,
};
use hive_core::error::{Error, Result};
use hive_core::geometry::DetectorGeometry;
use hive_core::hit::{HitSeries, HitSeriesSeries};
use hive_core::limits::{DensityLevel, RingLimitSet, RingSpacing, Window};
use hive_core::splitting::{SplitStatistics, SubEventSplitter};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Splitter configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SplitterConfig {
    /// Minimum number of distinct sensors in a sub-event.
    pub multiplicity: usize,
    /// Static time bound of ring 0 (nanoseconds); ring `r` allows
    /// `time_static * (r + 1)`.
    pub time_static: f64,
    /// Window on `dt - d / c_vacuum` (nanoseconds).
    pub causal_vacuum: Window,
    /// Window on `dt - d / c_ice` (nanoseconds).
    pub causal_ice: Window,
    /// Whether hits on the same sensor may connect.
    pub self_connect: bool,
    /// Rings inside which light causality is tested.
    pub light_limits: RingLimitSet,
    /// Rings of static vicinity.
    pub vicinity_limits: RingLimitSet,
    /// String spacing used for ring counting.
    pub spacing: RingSpacing,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            multiplicity: 4,
            time_static: 200.0,
            causal_vacuum: Window::symmetric(300.0),
            causal_ice: Window::symmetric(200.0),
            self_connect: false,
            light_limits: default_light_limits(),
            vicinity_limits: default_vicinity_limits(),
            spacing: RingSpacing::default(),
        }
    }
}

impl SplitterConfig {
    /// Set the multiplicity threshold.
    #[must_use]
    pub fn with_multiplicity(mut self, multiplicity: usize) -> Self {
        self.multiplicity = multiplicity;
        self
    }

    /// Set the static time bound of ring 0.
    #[must_use]
    pub fn with_time_static(mut self, time_static: f64) -> Self {
        self.time_static = time_static;
        self
    }

    /// Set the vacuum-light residual window.
    #[must_use]
    pub fn with_causal_vacuum(mut self, window: Window) -> Self {
        self.causal_vacuum = window;
        self
    }

    /// Set the ice-light residual window.
    #[must_use]
    pub fn with_causal_ice(mut self, window: Window) -> Self {
        self.causal_ice = window;
        self
    }

    /// Allow or forbid same-sensor connections.
    #[must_use]
    pub fn with_self_connect(mut self, self_connect: bool) -> Self {
        self.self_connect = self_connect;
        self
    }

    /// Set the light-connection rings.
    #[must_use]
    pub fn with_light_limits(mut self, limits: RingLimitSet) -> Self {
        self.light_limits = limits;
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

    /// Limits the vicinity map must be built with.
    #[must_use]
    pub fn connection_limits(&self) -> ConnectionLimits {
        ConnectionLimits {
            vicinity: self.vicinity_limits.clone(),
            light: self.light_limits.clone(),
        }
    }

    /// Validates the configuration and derives the per-ring static bounds.
    ///
    /// # Errors
    /// Returns an error for a multiplicity below one, a negative or NaN
    /// `time_static`, an invalid window, inconsistent ring limits, no
    /// configured ring at all, or an invalid spacing.
    pub fn validate(&self) -> Result<SplitterSetup> {
        if self.multiplicity == 0 {
            return Err(Error::InvalidMultiplicity(self.multiplicity));
        }
        if self.time_static.is_nan() || self.time_static < 0.0 {
            return Err(Error::ConfigError(format!(
                "time_static must be non-negative, got {}",
                self.time_static
            )));
        }
        self.causal_vacuum.validate("causal_vacuum")?;
        self.causal_ice.validate("causal_ice")?;
        self.light_limits.validate("light_limits")?;
        self.vicinity_limits.validate("vicinity_limits")?;
        if self.light_limits.is_empty() && self.vicinity_limits.is_empty() {
            return Err(Error::InvalidRingLimits {
                name: "ring_limits".to_string(),
                reason: "no ring configured at any density level".to_string(),
            });
        }
        self.spacing.validate()?;

        let static_bounds = DensityLevel::ALL.map(|level| {
            (0..self.vicinity_limits.get(level).len())
                .map(|ring| self.time_static * (ring as f64 + 1.0))
                .collect::<Vec<f64>>()
        });
        Ok(SplitterSetup { static_bounds })
    }
}

/// Values derived from a validated [`SplitterConfig`].
#[derive(Clone, Debug, PartialEq)]
pub struct SplitterSetup {
    static_bounds: [Vec<f64>; 3],
}

impl SplitterSetup {
    /// Static time bound of `ring` at `level`; `None` outside the vicinity rings.
    #[inline]
    #[must_use]
    pub fn static_bound(&self, level: DensityLevel, ring: usize) -> Option<f64> {
        self.static_bounds[level.as_index()].get(ring).copied()
    }

    /// Widest static bound over all levels.
    #[must_use]
    pub fn max_static_bound(&self) -> Option<f64> {
        self.static_bounds
            .iter()
            .filter_map(|bounds| bounds.last().copied())
            .reduce(f64::max)
    }
}

/// Union-find splitter over a shared [`VicinityMap`].
#[derive(Debug, Clone)]
pub struct HiveSplitter {
    config: SplitterConfig,
    setup: SplitterSetup,
    map: Arc<VicinityMap>,
    horizon: f64,
}

impl HiveSplitter {
    /// Validates `config` and builds the vicinity map for `geometry`.
    ///
    /// # Errors
    /// Returns the validation error of [`SplitterConfig::validate`].
    pub fn new(config: SplitterConfig, geometry: Arc<DetectorGeometry>) -> Result<Self> {
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
    pub fn with_map(config: SplitterConfig, map: Arc<VicinityMap>) -> Result<Self> {
        let setup = config.validate()?;
        if map.spacing() != &config.spacing
            || map.limits() != &config.connection_limits()
            || map.self_connect() != config.self_connect
        {
            return Err(Error::ConfigError(
                "vicinity map was built with different limits".to_string(),
            ));
        }

        let horizon = sweep_horizon(&config, &map);
        info!(
            "hive splitter ready: multiplicity {}, sweep horizon {horizon:.1} ns",
            config.multiplicity
        );
        Ok(Self {
            config,
            setup,
            map,
            horizon,
        })
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    /// The shared vicinity map.
    #[must_use]
    pub fn map(&self) -> &Arc<VicinityMap> {
        &self.map
    }

    /// Largest time difference at which two hits can still connect.
    #[must_use]
    pub fn horizon(&self) -> f64 {
        self.horizon
    }

    /// Splits `hits` into sub-events.
    #[must_use]
    pub fn split(&self, hits: &HitSeries) -> HitSeriesSeries {
        self.split_with_statistics(hits).0
    }

    /// Splits `hits` and reports what happened.
    #[must_use]
    pub fn split_with_statistics(&self, hits: &HitSeries) -> (HitSeriesSeries, SplitStatistics) {
        let slice = hits.as_slice();
        let n = slice.len();
        let mut stats = SplitStatistics {
            hits_processed: n,
            ..SplitStatistics::default()
        };
        if n == 0 {
            return (Vec::new(), stats);
        }

        let sensors: Vec<Option<usize>> = slice
            .iter()
            .map(|hit| self.map.index_of(hit.sensor()))
            .collect();
        let unknown = sensors.iter().filter(|s| s.is_none()).count();
        if unknown > 0 {
            warn!("{unknown} of {n} hits on sensors outside the geometry; kept isolated");
        }

        let mut uf = UnionFind::new(n);
        // (hit index, sensor index) of hits still within the horizon.
        let mut open: VecDeque<(usize, usize)> = VecDeque::new();

        for (j, hit) in slice.iter().enumerate() {
            let t = hit.time();
            while let Some(&(front, _)) = open.front() {
                let dt = t - slice[front].time();
                if matches!(
                    dt.partial_cmp(&self.horizon),
                    Some(Ordering::Less | Ordering::Equal)
                ) {
                    break;
                }
                open.pop_front();
            }

            let Some(b) = sensors[j] else {
                continue;
            };
            for &(i, a) in &open {
                if uf.connected(i, j) {
                    continue;
                }
                if self.causally_connected(a, b, t - slice[i].time()) {
                    uf.union(i, j);
                }
            }
            open.push_back((j, b));
        }

        // Slots are opened in hit order, so groups come out ordered by
        // their earliest hit.
        let mut slots: HashMap<usize, usize> = HashMap::new();
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for j in 0..n {
            let root = uf.find(j);
            let slot = *slots.entry(root).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(j);
        }

        stats.components_found = groups.len();
        let mut sub_events = Vec::new();
        for members in groups {
            let distinct = members
                .iter()
                .map(|&i| slice[i].sensor())
                .collect::<HashSet<_>>()
                .len();
            if distinct >= self.config.multiplicity {
                sub_events.push(hits.select(&members));
            } else {
                stats.hits_dropped += members.len();
            }
        }
        stats.sub_events = sub_events.len();

        debug!(
            "split {n} hits: {} components, {} sub-events, {} hits dropped",
            stats.components_found, stats.sub_events, stats.hits_dropped
        );
        (sub_events, stats)
    }

    /// Splits many events in parallel.
    #[must_use]
    pub fn split_events(&self, events: &[HitSeries]) -> Vec<HitSeriesSeries> {
        events.par_iter().map(|hits| self.split(hits)).collect()
    }

    /// Splits many events in parallel and sums their statistics.
    #[must_use]
    pub fn split_events_with_statistics(
        &self,
        events: &[HitSeries],
    ) -> (Vec<HitSeriesSeries>, SplitStatistics) {
        let results: Vec<_> = events
            .par_iter()
            .map(|hits| self.split_with_statistics(hits))
            .collect();
        let mut total = SplitStatistics::default();
        let split = results
            .into_iter()
            .map(|(sub_events, stats)| {
                total.merge(&stats);
                sub_events
            })
            .collect();
        (split, total)
    }

    /// Connection test for an earlier hit on sensor `a` and a later hit on
    /// sensor `b`, `dt` apart.
    fn causally_connected(&self, a: usize, b: usize, dt: f64) -> bool {
        if !self.map.may_connect(a, b) {
            return false;
        }
        let Some(ring) = self.map.ring(a, b) else {
            return false;
        };

        if self.map.in_vicinity(a, b) {
            if let Some(bound) = self.setup.static_bound(ring.level, usize::from(ring.index)) {
                if dt <= bound {
                    return true;
                }
            }
        }

        if self.map.light_connected(a, b) {
            if let Some(d) = self.map.distance(a, b) {
                return self
                    .config
                    .causal_vacuum
                    .contains(dt - d / SPEED_OF_LIGHT_VACUUM)
                    || self.config.causal_ice.contains(dt - d / SPEED_OF_LIGHT_ICE);
            }
        }
        false
    }
}

impl SubEventSplitter for HiveSplitter {
    fn split(&self, hits: &HitSeries) -> HitSeriesSeries {
        HiveSplitter::split(self, hits)
    }

    fn name(&self) -> &'static str {
        "HiveSplitter"
    }
}

fn sweep_horizon(config: &SplitterConfig, map: &VicinityMap) -> f64 {
    let mut horizon: f64 = 0.0;
    if let Some(ring) = map.max_vicinity_ring() {
        horizon = horizon.max(config.time_static * (ring as f64 + 1.0));
    }
    if let Some(d) = map.max_light_distance() {
        horizon = horizon.max(d / SPEED_OF_LIGHT_VACUUM + config.causal_vacuum.upper);
        horizon = horizon.max(d / SPEED_OF_LIGHT_ICE + config.causal_ice.upper);
    }
    horizon
}
