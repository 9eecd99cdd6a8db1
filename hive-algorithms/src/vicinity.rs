//! Vicinity geometry builder.
//!
//! Classifies every sensor pair of a [`DetectorGeometry`] into rings and
//! caches the answers to "may these two sensors ever be connected, and how"
//! in dense tables addressed by the sensor index.
//!
//! Key characteristics:
//! - Built once per geometry and limit set, O(N^2) in sensor count
//! - Immutable afterwards; shared between engines and threads via `Arc`
//! - O(1) queries per sensor pair
//!
//! Ring classification uses the horizontal distance between string
//! centres at the pair's density level. Within a ring, the vertical offset
//! `dz = z_b - z_a` must lie in that ring's window:
//! - *light* connectivity is directional: `(a, b)` tests `dz`, `(b, a)` tests `-dz`
//! - *vicinity* connectivity is symmetric: either orientation suffices
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::module_name_repetitions
)]

use hive_core::geometry::DetectorGeometry;
use hive_core::hit::SensorKey;
use hive_core::limits::{DensityLevel, RingLimitSet, RingLimits, RingSpacing};
use hive_core::matrix::{AsymmetricMatrix, SymmetricMatrix};
use log::{debug, info};
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Speed of light in vacuum (m/ns).
pub const SPEED_OF_LIGHT_VACUUM: f64 = 0.299_792_458;

/// Group refractive index of deep glacial ice.
pub const GROUP_INDEX_ICE: f64 = 1.3195;

/// Group velocity of light in ice (m/ns).
pub const SPEED_OF_LIGHT_ICE: f64 = SPEED_OF_LIGHT_VACUUM / GROUP_INDEX_ICE;

/// Ring limits of both connection categories.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConnectionLimits {
    /// Static (non-causal) proximity rings.
    pub vicinity: RingLimitSet,
    /// Rings inside which light-travel causality is tested.
    pub light: RingLimitSet,
}

/// Ring assignment of a sensor pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ring {
    /// Density level the ring was counted on.
    pub level: DensityLevel,
    /// Ring index, 0 being the same string.
    pub index: u16,
}

/// Counts gathered while building a map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VicinityStatistics {
    /// Sensors in the geometry.
    pub sensors: usize,
    /// Ordered pairs connectable by light.
    pub light_pairs: usize,
    /// Unordered pairs in static vicinity.
    pub vicinity_pairs: usize,
}

/// Default vicinity rings: +-70 m on every ring, two rings on the standard
/// grid and one more per density step.
#[must_use]
pub fn default_vicinity_limits() -> RingLimitSet {
    RingLimitSet::new(
        RingLimits::symmetric(&[70.0, 70.0]),
        RingLimits::symmetric(&[70.0, 70.0, 70.0]),
        RingLimits::symmetric(&[70.0, 70.0, 70.0, 70.0]),
    )
}

/// Default light-connection rings.
#[must_use]
pub fn default_light_limits() -> RingLimitSet {
    RingLimitSet::new(
        RingLimits::symmetric(&[255.0, 272.7, 165.8]),
        RingLimits::symmetric(&[70.0, 131.5, 40.8]),
        RingLimits::symmetric(&[70.0, 144.1, 124.7, 82.8]),
    )
}

/// Precomputed pairwise connectivity over a detector geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct VicinityMap {
    geometry: Arc<DetectorGeometry>,
    spacing: RingSpacing,
    limits: ConnectionLimits,
    self_connect: bool,
    rings: SymmetricMatrix<Option<Ring>>,
    reach: AsymmetricMatrix<bool>,
    light: AsymmetricMatrix<bool>,
    vicinity: SymmetricMatrix<bool>,
    distances: SymmetricMatrix<Option<f32>>,
    max_light_distance: Option<f64>,
    max_vicinity_ring: Option<usize>,
    statistics: VicinityStatistics,
}

#[inline]
fn within(limits: &RingLimits, ring: usize, dz: f64) -> bool {
    limits.get(ring).is_some_and(|window| window.contains(dz))
}

impl VicinityMap {
    /// Builds the tables for `geometry`.
    ///
    /// Limits are taken as given; engines validate them before building.
    #[must_use]
    pub fn build(
        geometry: Arc<DetectorGeometry>,
        spacing: &RingSpacing,
        limits: &ConnectionLimits,
        self_connect: bool,
    ) -> Self {
        let n = geometry.len();
        let mut rings = SymmetricMatrix::new(n, None);
        let mut reach = AsymmetricMatrix::new(n, false);
        let mut light = AsymmetricMatrix::new(n, false);
        let mut vicinity = SymmetricMatrix::new(n, false);
        let mut distances = SymmetricMatrix::new(n, None);
        let mut max_light_distance: Option<f64> = None;
        let mut max_vicinity_ring: Option<usize> = None;
        let mut statistics = VicinityStatistics {
            sensors: n,
            ..VicinityStatistics::default()
        };

        for b in 0..n {
            for a in 0..=b {
                let Some(level) =
                    DensityLevel::for_pair(geometry.population(a), geometry.population(b))
                else {
                    continue;
                };

                let (key_a, key_b) = (geometry.key(a), geometry.key(b));
                let ring_index = if a == b {
                    if !self_connect {
                        continue;
                    }
                    0
                } else if key_a.string == key_b.string {
                    0
                } else {
                    let Some(d) = geometry.string_distance(key_a.string, key_b.string) else {
                        continue;
                    };
                    spacing.ring_index(level, d)
                };

                let (pa, pb) = (geometry.position(a), geometry.position(b));
                let dz = pb.z - pa.z;
                let light_limits = limits.light.get(level);
                let vicinity_limits = limits.vicinity.get(level);
                let light_ab = within(light_limits, ring_index, dz);
                let light_ba = within(light_limits, ring_index, -dz);
                let near = within(vicinity_limits, ring_index, dz)
                    || within(vicinity_limits, ring_index, -dz);

                if !(light_ab || light_ba || near) {
                    continue;
                }

                rings.set(
                    a,
                    b,
                    Some(Ring {
                        level,
                        index: ring_index as u16,
                    }),
                );

                if light_ab {
                    light.set(a, b, true);
                    reach.set(a, b, true);
                    statistics.light_pairs += 1;
                }
                if light_ba && a != b {
                    light.set(b, a, true);
                    reach.set(b, a, true);
                    statistics.light_pairs += 1;
                }
                if light_ab || light_ba {
                    let stored = pa.distance(&pb) as f32;
                    distances.set(a, b, Some(stored));
                    let d = f64::from(stored);
                    max_light_distance = Some(max_light_distance.map_or(d, |m| m.max(d)));
                }
                if near {
                    vicinity.set(a, b, true);
                    reach.set(a, b, true);
                    reach.set(b, a, true);
                    statistics.vicinity_pairs += 1;
                    max_vicinity_ring = Some(max_vicinity_ring.map_or(ring_index, |m| m.max(ring_index)));
                }
            }
        }

        debug!(
            "vicinity map: {} sensors, {} light pairs, {} vicinity pairs, max light distance {:?}",
            statistics.sensors, statistics.light_pairs, statistics.vicinity_pairs, max_light_distance
        );
        info!("built vicinity map over {n} sensors");

        Self {
            geometry,
            spacing: *spacing,
            limits: limits.clone(),
            self_connect,
            rings,
            reach,
            light,
            vicinity,
            distances,
            max_light_distance,
            max_vicinity_ring,
            statistics,
        }
    }

    /// The geometry the map addresses.
    #[must_use]
    pub fn geometry(&self) -> &Arc<DetectorGeometry> {
        &self.geometry
    }

    /// Number of sensors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.geometry.len()
    }

    /// Returns true if the geometry holds no sensors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
    }

    /// Dense index of a sensor; `None` for sensors outside the geometry.
    #[inline]
    #[must_use]
    pub fn index_of(&self, key: SensorKey) -> Option<usize> {
        self.geometry.index().get(key)
    }

    /// Spacing the rings were counted with.
    #[must_use]
    pub fn spacing(&self) -> &RingSpacing {
        &self.spacing
    }

    /// Limits the map was built from.
    #[must_use]
    pub fn limits(&self) -> &ConnectionLimits {
        &self.limits
    }

    /// Whether a sensor may connect to itself.
    #[must_use]
    pub fn self_connect(&self) -> bool {
        self.self_connect
    }

    /// Ring of the pair, `None` if the pair never connects.
    #[inline]
    #[must_use]
    pub fn ring(&self, a: usize, b: usize) -> Option<Ring> {
        *self.rings.get(a, b)
    }

    /// Whether a hit on `a` may ever connect to a later hit on `b`.
    #[inline]
    #[must_use]
    pub fn may_connect(&self, a: usize, b: usize) -> bool {
        *self.reach.get(a, b)
    }

    /// Whether light-travel causality is tested from `a` to `b`.
    #[inline]
    #[must_use]
    pub fn light_connected(&self, a: usize, b: usize) -> bool {
        *self.light.get(a, b)
    }

    /// Whether the pair is in static vicinity.
    #[inline]
    #[must_use]
    pub fn in_vicinity(&self, a: usize, b: usize) -> bool {
        *self.vicinity.get(a, b)
    }

    /// Distance of a light-connectable pair (metres).
    #[inline]
    #[must_use]
    pub fn distance(&self, a: usize, b: usize) -> Option<f64> {
        self.distances.get(a, b).map(f64::from)
    }

    /// [`VicinityMap::may_connect`] by key; unknown sensors never connect.
    #[must_use]
    pub fn may_connect_keys(&self, a: SensorKey, b: SensorKey) -> bool {
        match (self.index_of(a), self.index_of(b)) {
            (Some(a), Some(b)) => self.may_connect(a, b),
            _ => false,
        }
    }

    /// [`VicinityMap::in_vicinity`] by key; unknown sensors never connect.
    #[must_use]
    pub fn in_vicinity_keys(&self, a: SensorKey, b: SensorKey) -> bool {
        match (self.index_of(a), self.index_of(b)) {
            (Some(a), Some(b)) => self.in_vicinity(a, b),
            _ => false,
        }
    }

    /// [`VicinityMap::ring`] by key.
    #[must_use]
    pub fn ring_keys(&self, a: SensorKey, b: SensorKey) -> Option<Ring> {
        self.ring(self.index_of(a)?, self.index_of(b)?)
    }

    /// Largest distance over light-connectable pairs.
    #[must_use]
    pub fn max_light_distance(&self) -> Option<f64> {
        self.max_light_distance
    }

    /// Largest ring index over pairs in vicinity.
    #[must_use]
    pub fn max_vicinity_ring(&self) -> Option<usize> {
        self.max_vicinity_ring
    }

    /// Build statistics.
    #[must_use]
    pub fn statistics(&self) -> VicinityStatistics {
        self.statistics
    }
}
