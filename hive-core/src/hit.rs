//! Hit model: sensor identities, pulses, hits and time-ordered hit series.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identity of a sensor: the string (structural unit) and the module position on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorKey {
    /// String number.
    pub string: u32,
    /// Module position on the string.
    pub module: u32,
}

impl SensorKey {
    /// Creates a new sensor key.
    #[inline]
    #[must_use]
    pub fn new(string: u32, module: u32) -> Self {
        Self { string, module }
    }
}

impl fmt::Display for SensorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.string, self.module)
    }
}

/// A single detection on one sensor, as carried in a [`PulseMap`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pulse {
    /// Arrival time in nanoseconds.
    pub time: f64,
    /// Deposited charge in photo-electrons.
    pub charge: f64,
    /// Opaque per-pulse flag bits, carried through unchanged.
    #[cfg_attr(feature = "serde", serde(default))]
    pub flags: u8,
}

impl Pulse {
    /// Creates a pulse without flags.
    #[inline]
    #[must_use]
    pub fn new(time: f64, charge: f64) -> Self {
        Self {
            time,
            charge,
            flags: 0,
        }
    }

    /// Sets the flag bits.
    #[must_use]
    pub fn with_flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }
}

/// Per-sensor detection lists, the format exchanged with surrounding stages.
///
/// Each list is expected to be time-ordered.
pub type PulseMap = BTreeMap<SensorKey, Vec<Pulse>>;

/// A single detector hit.
///
/// Hits are immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Hit {
    sensor: SensorKey,
    time: f64,
    charge: f64,
    flags: u8,
}

impl Hit {
    /// Creates a hit without flags.
    #[inline]
    #[must_use]
    pub fn new(sensor: SensorKey, time: f64, charge: f64) -> Self {
        Self {
            sensor,
            time,
            charge,
            flags: 0,
        }
    }

    /// Creates a hit from a pulse recorded on `sensor`.
    #[inline]
    #[must_use]
    pub fn from_pulse(sensor: SensorKey, pulse: &Pulse) -> Self {
        Self {
            sensor,
            time: pulse.time,
            charge: pulse.charge,
            flags: pulse.flags,
        }
    }

    /// Returns the sensor that recorded the hit.
    #[inline]
    #[must_use]
    pub fn sensor(&self) -> SensorKey {
        self.sensor
    }

    /// Returns the hit time in nanoseconds.
    #[inline]
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Returns the hit charge.
    #[inline]
    #[must_use]
    pub fn charge(&self) -> f64 {
        self.charge
    }

    /// Returns the pulse flag bits.
    #[inline]
    #[must_use]
    pub fn flags(&self) -> u8 {
        self.flags
    }

    /// Converts back into the pulse it was built from.
    #[inline]
    #[must_use]
    pub fn to_pulse(&self) -> Pulse {
        Pulse {
            time: self.time,
            charge: self.charge,
            flags: self.flags,
        }
    }

    /// Strict hit order: time, then sensor key.
    ///
    /// Hits equal under this order keep their insertion order, since
    /// [`HitSeries`] sorts stably.
    #[inline]
    #[must_use]
    pub fn time_order(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.sensor.cmp(&other.sensor))
    }
}

/// A sequence of hits, always sorted by [`Hit::time_order`].
///
/// Series are never mutated in place; engines build new series from
/// subsequences with [`HitSeries::select`] or [`HitSeries::retain_mask`].
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "Vec<Hit>", into = "Vec<Hit>"))]
pub struct HitSeries {
    hits: Vec<Hit>,
}

/// One hit series per sub-event, ordered by each sub-event's earliest hit.
pub type HitSeriesSeries = Vec<HitSeries>;

impl HitSeries {
    /// Creates an empty series.
    #[must_use]
    pub fn new() -> Self {
        Self { hits: Vec::new() }
    }

    /// Creates a series from hits in any order.
    #[must_use]
    pub fn from_hits(mut hits: Vec<Hit>) -> Self {
        hits.sort_by(Hit::time_order);
        Self { hits }
    }

    /// Flattens a per-sensor pulse map into a time-ordered series.
    #[must_use]
    pub fn from_pulse_map(map: &PulseMap) -> Self {
        let total = map.values().map(Vec::len).sum();
        let mut hits = Vec::with_capacity(total);
        for (&sensor, pulses) in map {
            hits.extend(pulses.iter().map(|pulse| Hit::from_pulse(sensor, pulse)));
        }
        Self::from_hits(hits)
    }

    /// Regroups the series into a per-sensor pulse map.
    ///
    /// For maps whose per-sensor lists are time-ordered this is the exact
    /// inverse of [`HitSeries::from_pulse_map`].
    #[must_use]
    pub fn to_pulse_map(&self) -> PulseMap {
        let mut map = PulseMap::new();
        for hit in &self.hits {
            map.entry(hit.sensor).or_default().push(hit.to_pulse());
        }
        map
    }

    /// Returns the number of hits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Returns true if the series holds no hits.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Returns an iterator over the hits in time order.
    pub fn iter(&self) -> std::slice::Iter<'_, Hit> {
        self.hits.iter()
    }

    /// Returns the hits as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Hit] {
        &self.hits
    }

    /// Returns the hit at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Hit> {
        self.hits.get(index)
    }

    /// Times of the first and last hit.
    #[must_use]
    pub fn time_range(&self) -> Option<(f64, f64)> {
        match (self.hits.first(), self.hits.last()) {
            (Some(first), Some(last)) => Some((first.time, last.time)),
            _ => None,
        }
    }

    /// Number of distinct sensors contributing hits.
    #[must_use]
    pub fn distinct_sensors(&self) -> usize {
        self.hits
            .iter()
            .map(Hit::sensor)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Builds the subsequence at the given strictly ascending indices.
    ///
    /// # Panics
    /// Panics if an index is out of range.
    #[must_use]
    pub fn select(&self, indices: &[usize]) -> Self {
        debug_assert!(
            indices.windows(2).all(|w| w[0] < w[1]),
            "indices must be strictly ascending"
        );
        Self {
            hits: indices.iter().map(|&i| self.hits[i]).collect(),
        }
    }

    /// Builds the subsequence of hits whose mask entry is `true`.
    #[must_use]
    pub fn retain_mask(&self, keep: &[bool]) -> Self {
        debug_assert_eq!(keep.len(), self.hits.len());
        Self {
            hits: self
                .hits
                .iter()
                .zip(keep)
                .filter_map(|(hit, &k)| k.then_some(*hit))
                .collect(),
        }
    }

    /// Consumes the series, returning the hits.
    #[must_use]
    pub fn into_hits(self) -> Vec<Hit> {
        self.hits
    }
}

impl From<Vec<Hit>> for HitSeries {
    fn from(hits: Vec<Hit>) -> Self {
        Self::from_hits(hits)
    }
}

impl From<HitSeries> for Vec<Hit> {
    fn from(series: HitSeries) -> Self {
        series.hits
    }
}

impl FromIterator<Hit> for HitSeries {
    fn from_iter<I: IntoIterator<Item = Hit>>(iter: I) -> Self {
        Self::from_hits(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a HitSeries {
    type Item = &'a Hit;
    type IntoIter = std::slice::Iter<'a, Hit>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(string: u32, module: u32) -> SensorKey {
        SensorKey::new(string, module)
    }

    #[test]
    fn test_sensor_key_order_and_display() {
        assert!(key(1, 60) < key(2, 1));
        assert!(key(3, 4) < key(3, 5));
        assert_eq!(key(21, 30).to_string(), "(21,30)");
    }

    #[test]
    fn test_series_sorted_by_time_then_sensor() {
        let series = HitSeries::from_hits(vec![
            Hit::new(key(5, 1), 30.0, 1.0),
            Hit::new(key(2, 1), 10.0, 1.0),
            Hit::new(key(1, 7), 10.0, 1.0),
            Hit::new(key(3, 3), 20.0, 1.0),
        ]);

        let order: Vec<_> = series.iter().map(|h| (h.sensor(), h.time())).collect();
        assert_eq!(
            order,
            vec![
                (key(1, 7), 10.0),
                (key(2, 1), 10.0),
                (key(3, 3), 20.0),
                (key(5, 1), 30.0),
            ]
        );
    }

    #[test]
    fn test_equal_hits_keep_insertion_order() {
        let series = HitSeries::from_hits(vec![
            Hit::new(key(1, 1), 5.0, 2.0),
            Hit::new(key(1, 1), 5.0, 1.0),
        ]);
        assert!((series.as_slice()[0].charge() - 2.0).abs() < f64::EPSILON);
        assert!((series.as_slice()[1].charge() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pulse_map_round_trip() {
        let mut map = PulseMap::new();
        map.insert(
            key(1, 1),
            vec![Pulse::new(10.0, 1.5), Pulse::new(40.0, 0.5).with_flags(3)],
        );
        map.insert(key(1, 2), vec![Pulse::new(12.0, 2.0)]);
        map.insert(
            key(7, 44),
            vec![Pulse::new(10.0, 0.25), Pulse::new(10.0, 0.75)],
        );

        let series = HitSeries::from_pulse_map(&map);
        assert_eq!(series.len(), 5);
        assert_eq!(series.to_pulse_map(), map);
    }

    #[test]
    fn test_empty_series() {
        let series = HitSeries::from_pulse_map(&PulseMap::new());
        assert!(series.is_empty());
        assert_eq!(series.time_range(), None);
        assert_eq!(series.distinct_sensors(), 0);
        assert!(series.to_pulse_map().is_empty());
    }

    #[test]
    fn test_select_and_retain() {
        let series: HitSeries = (0..5)
            .map(|i| Hit::new(key(1, i), f64::from(i) * 10.0, 1.0))
            .collect();

        let picked = series.select(&[1, 3]);
        assert_eq!(picked.len(), 2);
        assert_eq!(picked.as_slice()[0].sensor(), key(1, 1));
        assert_eq!(picked.as_slice()[1].sensor(), key(1, 3));

        let kept = series.retain_mask(&[true, false, false, true, true]);
        assert_eq!(kept.len(), 3);
        assert_eq!(kept.time_range(), Some((0.0, 40.0)));
    }

    #[test]
    fn test_distinct_sensors() {
        let series = HitSeries::from_hits(vec![
            Hit::new(key(1, 1), 0.0, 1.0),
            Hit::new(key(1, 1), 5.0, 1.0),
            Hit::new(key(2, 1), 6.0, 1.0),
        ]);
        assert_eq!(series.distinct_sensors(), 2);
    }
}
