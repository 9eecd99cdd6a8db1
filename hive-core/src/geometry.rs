//! Detector geometry and the dense sensor index.
//!
//! A [`DetectorGeometry`] is built once per detector configuration and is
//! the address space for every pairwise lookup table: each sensor is given
//! a dense index in `[0, N)` in ascending [`SensorKey`] order.
#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]

use crate::error::{Error, Result};
use crate::hit::SensorKey;
use std::collections::{BTreeMap, HashMap};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A sensor position in detector coordinates (metres).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Position {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate (depth axis, up is positive).
    pub z: f64,
}

impl Position {
    /// Creates a new position.
    #[inline]
    #[must_use]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another position.
    #[inline]
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Distance projected onto the horizontal plane.
    #[inline]
    #[must_use]
    pub fn horizontal_distance(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Sensor population, derivable from the sensor key alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Population {
    /// Standard in-ice array.
    Standard,
    /// Densely instrumented sub-array.
    Dense,
    /// Surface stations; never connected.
    Surface,
}

/// Rule mapping a sensor key to its population.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PopulationRule {
    /// First string number of the dense sub-array.
    pub dense_string_start: u32,
    /// First module number that sits on the surface.
    pub surface_module_start: u32,
}

impl Default for PopulationRule {
    fn default() -> Self {
        Self {
            dense_string_start: 79,
            surface_module_start: 61,
        }
    }
}

impl PopulationRule {
    /// Classifies a sensor key.
    #[inline]
    #[must_use]
    pub fn classify(&self, key: SensorKey) -> Population {
        if key.module >= self.surface_module_start {
            Population::Surface
        } else if key.string >= self.dense_string_start {
            Population::Dense
        } else {
            Population::Standard
        }
    }
}

/// Bijection between sensor keys and dense indices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorIndex {
    keys: Vec<SensorKey>,
    lookup: HashMap<SensorKey, usize>,
}

impl SensorIndex {
    fn from_sorted(keys: Vec<SensorKey>) -> Self {
        let lookup = keys.iter().enumerate().map(|(i, &k)| (k, i)).collect();
        Self { keys, lookup }
    }

    /// Dense index of `key`, if the sensor is part of the geometry.
    #[inline]
    #[must_use]
    pub fn get(&self, key: SensorKey) -> Option<usize> {
        self.lookup.get(&key).copied()
    }

    /// Sensor key at dense index `index`.
    #[inline]
    #[must_use]
    pub fn key(&self, index: usize) -> Option<SensorKey> {
        self.keys.get(index).copied()
    }

    /// Number of indexed sensors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if no sensor is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterates over the keys in index order.
    pub fn keys(&self) -> impl Iterator<Item = SensorKey> + '_ {
        self.keys.iter().copied()
    }
}

/// Static detector geometry, addressed by the dense [`SensorIndex`].
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorGeometry {
    index: SensorIndex,
    positions: Vec<Position>,
    populations: Vec<Population>,
    string_centers: BTreeMap<u32, (f64, f64)>,
    rule: PopulationRule,
}

impl DetectorGeometry {
    /// Builds a geometry from sensor positions.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateSensor`] if a key repeats and
    /// [`Error::InvalidPosition`] for non-finite coordinates.
    pub fn new<I>(sensors: I, rule: PopulationRule) -> Result<Self>
    where
        I: IntoIterator<Item = (SensorKey, Position)>,
    {
        let mut sorted = BTreeMap::new();
        for (key, position) in sensors {
            if !position.is_finite() {
                return Err(Error::InvalidPosition(key));
            }
            if sorted.insert(key, position).is_some() {
                return Err(Error::DuplicateSensor(key));
            }
        }

        let mut sums: BTreeMap<u32, (f64, f64, usize)> = BTreeMap::new();
        for (key, position) in &sorted {
            let entry = sums.entry(key.string).or_insert((0.0, 0.0, 0));
            entry.0 += position.x;
            entry.1 += position.y;
            entry.2 += 1;
        }
        let string_centers = sums
            .into_iter()
            .map(|(string, (sx, sy, n))| (string, (sx / n as f64, sy / n as f64)))
            .collect();

        let populations = sorted.keys().map(|&key| rule.classify(key)).collect();
        let (keys, positions): (Vec<_>, Vec<_>) = sorted.into_iter().unzip();

        Ok(Self {
            index: SensorIndex::from_sorted(keys),
            positions,
            populations,
            string_centers,
            rule,
        })
    }

    /// The dense sensor index.
    #[must_use]
    pub fn index(&self) -> &SensorIndex {
        &self.index
    }

    /// Number of sensors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns true if the geometry holds no sensors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// The population rule the geometry was built with.
    #[must_use]
    pub fn rule(&self) -> PopulationRule {
        self.rule
    }

    /// Position of the sensor at dense index `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    #[inline]
    #[must_use]
    pub fn position(&self, index: usize) -> Position {
        self.positions[index]
    }

    /// Population of the sensor at dense index `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    #[inline]
    #[must_use]
    pub fn population(&self, index: usize) -> Population {
        self.populations[index]
    }

    /// Key of the sensor at dense index `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    #[inline]
    #[must_use]
    pub fn key(&self, index: usize) -> SensorKey {
        self.index.keys[index]
    }

    /// Position of a sensor by key.
    #[must_use]
    pub fn position_of(&self, key: SensorKey) -> Option<Position> {
        self.index.get(key).map(|i| self.positions[i])
    }

    /// Mean horizontal position of a string's sensors.
    #[must_use]
    pub fn string_center(&self, string: u32) -> Option<(f64, f64)> {
        self.string_centers.get(&string).copied()
    }

    /// Horizontal distance between the centres of two strings.
    #[must_use]
    pub fn string_distance(&self, a: u32, b: u32) -> Option<f64> {
        let (ax, ay) = self.string_center(a)?;
        let (bx, by) = self.string_center(b)?;
        Some((ax - bx).hypot(ay - by))
    }

    /// Number of distinct strings.
    #[must_use]
    pub fn string_count(&self) -> usize {
        self.string_centers.len()
    }

    /// Iterates over `(key, position)` in index order.
    pub fn sensors(&self) -> impl Iterator<Item = (SensorKey, Position)> + '_ {
        self.index.keys().zip(self.positions.iter().copied())
    }
}

/// Synthetic hexagonal string grid.
///
/// Standard strings sit on a hexagonal lattice of `rings` rings around a
/// centre string and are numbered from 1 outwards; optional dense strings
/// are placed at explicit horizontal positions and numbered from the
/// population rule's `dense_string_start`.
#[derive(Debug, Clone)]
pub struct GridLayout {
    /// Rings of standard strings around the centre string.
    pub rings: u32,
    /// Horizontal spacing between neighbouring standard strings (metres).
    pub spacing: f64,
    /// Modules per standard string.
    pub modules_per_string: u32,
    /// Vertical spacing between modules on a standard string (metres).
    pub module_spacing: f64,
    /// Z coordinate of the topmost module.
    pub top_z: f64,
    /// Horizontal positions of dense strings.
    pub dense_strings: Vec<(f64, f64)>,
    /// Modules per dense string.
    pub dense_modules_per_string: u32,
    /// Vertical spacing on dense strings (metres).
    pub dense_module_spacing: f64,
    /// Population rule used for numbering and classification.
    pub rule: PopulationRule,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            rings: 2,
            spacing: 125.0,
            modules_per_string: 60,
            module_spacing: 17.0,
            top_z: 500.0,
            dense_strings: Vec::new(),
            dense_modules_per_string: 60,
            dense_module_spacing: 7.0,
            rule: PopulationRule::default(),
        }
    }
}

impl GridLayout {
    /// Creates a layout with `rings` rings of standard strings.
    #[must_use]
    pub fn hexagonal(rings: u32) -> Self {
        Self {
            rings,
            ..Self::default()
        }
    }

    /// Sets the string spacing.
    #[must_use]
    pub fn with_spacing(mut self, spacing: f64) -> Self {
        self.spacing = spacing;
        self
    }

    /// Sets modules per standard string and their vertical spacing.
    #[must_use]
    pub fn with_modules(mut self, count: u32, spacing: f64) -> Self {
        self.modules_per_string = count;
        self.module_spacing = spacing;
        self
    }

    /// Adds a dense string at a horizontal position.
    #[must_use]
    pub fn with_dense_string(mut self, x: f64, y: f64) -> Self {
        self.dense_strings.push((x, y));
        self
    }

    /// Sets modules per dense string and their vertical spacing.
    #[must_use]
    pub fn with_dense_modules(mut self, count: u32, spacing: f64) -> Self {
        self.dense_modules_per_string = count;
        self.dense_module_spacing = spacing;
        self
    }

    /// Horizontal positions of the standard strings, in numbering order.
    #[must_use]
    pub fn string_positions(&self) -> Vec<(f64, f64)> {
        let rings = i64::from(self.rings);
        let half_sqrt3 = 3.0_f64.sqrt() / 2.0;
        let mut cells = Vec::new();
        for q in -rings..=rings {
            for r in -rings..=rings {
                let s = -q - r;
                let ring = q.abs().max(r.abs()).max(s.abs());
                if ring <= rings {
                    cells.push((ring, q, r));
                }
            }
        }
        cells.sort_unstable();
        cells
            .into_iter()
            .map(|(_, q, r)| {
                let (q, r) = (q as f64, r as f64);
                (self.spacing * (q + r / 2.0), self.spacing * r * half_sqrt3)
            })
            .collect()
    }

    /// Generates the geometry.
    ///
    /// # Errors
    /// Returns [`Error::InvalidLayout`] if the standard strings would spill
    /// into the dense numbering range or modules into the surface range.
    pub fn build(&self) -> Result<DetectorGeometry> {
        let standard = self.string_positions();
        if standard.len() >= self.rule.dense_string_start as usize {
            return Err(Error::InvalidLayout(format!(
                "{} standard strings overlap dense numbering starting at {}",
                standard.len(),
                self.rule.dense_string_start
            )));
        }
        let modules = self.modules_per_string.max(self.dense_modules_per_string);
        if modules >= self.rule.surface_module_start {
            return Err(Error::InvalidLayout(format!(
                "{modules} modules per string overlap surface numbering starting at {}",
                self.rule.surface_module_start
            )));
        }

        let mut sensors = Vec::new();
        for (i, &(x, y)) in standard.iter().enumerate() {
            let string = i as u32 + 1;
            for m in 0..self.modules_per_string {
                let z = self.top_z - f64::from(m) * self.module_spacing;
                sensors.push((SensorKey::new(string, m + 1), Position::new(x, y, z)));
            }
        }
        for (i, &(x, y)) in self.dense_strings.iter().enumerate() {
            let string = self.rule.dense_string_start + i as u32;
            for m in 0..self.dense_modules_per_string {
                let z = self.top_z - f64::from(m) * self.dense_module_spacing;
                sensors.push((SensorKey::new(string, m + 1), Position::new(x, y, z)));
            }
        }
        DetectorGeometry::new(sensors, self.rule)
    }
}
