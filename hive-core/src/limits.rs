//! Time windows, ring limits and density levels.
//!
//! A ring is a discrete proximity class between two strings: ring 0 is
//! the string itself, ring 1 its nearest neighbours on the hexagonal grid,
//! and so on. Each ring carries a [`Window`] on the vertical offset between
//! the two sensors. Which grid (and therefore which ring list) applies to a
//! sensor pair is decided by the pair's [`DensityLevel`].
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use crate::error::{Error, Result};
use crate::geometry::Population;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A closed interval `[lower, upper]`.
///
/// Infinite bounds are the explicit "unbounded" sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Window {
    /// Lower bound, usually not positive.
    pub lower: f64,
    /// Upper bound, usually not negative.
    pub upper: f64,
}

impl Window {
    /// The window accepting every value.
    pub const UNBOUNDED: Self = Self {
        lower: f64::NEG_INFINITY,
        upper: f64::INFINITY,
    };

    /// Creates a window.
    #[inline]
    #[must_use]
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Creates the window `[-half_width, half_width]`.
    #[inline]
    #[must_use]
    pub fn symmetric(half_width: f64) -> Self {
        Self {
            lower: -half_width,
            upper: half_width,
        }
    }

    /// Returns true if `value` lies inside the window, bounds included.
    #[inline]
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    /// Returns true if neither bound is NaN and `lower <= upper`.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.lower.is_nan() && !self.upper.is_nan() && self.lower <= self.upper
    }

    /// Checks validity, naming the parameter in the error.
    ///
    /// # Errors
    /// Returns [`Error::InvalidWindow`] for a NaN bound or an inverted range.
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(Error::InvalidWindow {
                name: name.to_string(),
                lower: self.lower,
                upper: self.upper,
            })
        }
    }
}

/// Per-ring vertical windows; index 0 is the direct ring.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct RingLimits(Vec<Window>);

impl RingLimits {
    /// Creates ring limits from per-ring windows.
    #[must_use]
    pub fn new(windows: Vec<Window>) -> Self {
        Self(windows)
    }

    /// Ring limits that connect nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Symmetric windows, one per ring.
    #[must_use]
    pub fn symmetric(half_widths: &[f64]) -> Self {
        Self(half_widths.iter().map(|&w| Window::symmetric(w)).collect())
    }

    /// Parses the flat `[lo0, hi0, lo1, hi1, ...]` form.
    ///
    /// # Errors
    /// Returns [`Error::InvalidRingLimits`] if the list has odd length.
    pub fn from_flat(name: &str, values: &[f64]) -> Result<Self> {
        if values.len() % 2 != 0 {
            return Err(Error::InvalidRingLimits {
                name: name.to_string(),
                reason: format!("{} values do not form bound pairs", values.len()),
            });
        }
        Ok(Self(
            values
                .chunks_exact(2)
                .map(|pair| Window::new(pair[0], pair[1]))
                .collect(),
        ))
    }

    /// Flattens back into `[lo0, hi0, lo1, hi1, ...]`.
    #[must_use]
    pub fn to_flat(&self) -> Vec<f64> {
        self.0.iter().flat_map(|w| [w.lower, w.upper]).collect()
    }

    /// Window of `ring`, if configured.
    #[inline]
    #[must_use]
    pub fn get(&self, ring: usize) -> Option<Window> {
        self.0.get(ring).copied()
    }

    /// Number of configured windows, ring 0 included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no ring is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of rings beyond the direct ring.
    #[must_use]
    pub fn ring_count(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    /// Iterates over the per-ring windows.
    pub fn iter(&self) -> std::slice::Iter<'_, Window> {
        self.0.iter()
    }
}

/// Grid density relevant for a sensor pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DensityLevel {
    /// Both sensors on standard strings.
    Single,
    /// One standard and one dense string.
    Double,
    /// Both sensors on dense strings.
    Triple,
}

impl DensityLevel {
    /// All levels, sparsest first.
    pub const ALL: [Self; 3] = [Self::Single, Self::Double, Self::Triple];

    /// Level for a pair of populations; `None` if either side is on the surface.
    #[must_use]
    pub fn for_pair(a: Population, b: Population) -> Option<Self> {
        match (a, b) {
            (Population::Surface, _) | (_, Population::Surface) => None,
            (Population::Standard, Population::Standard) => Some(Self::Single),
            (Population::Dense, Population::Dense) => Some(Self::Triple),
            _ => Some(Self::Double),
        }
    }

    /// Position in [`DensityLevel::ALL`].
    #[inline]
    #[must_use]
    pub fn as_index(self) -> usize {
        match self {
            Self::Single => 0,
            Self::Double => 1,
            Self::Triple => 2,
        }
    }

    /// Lower-case name used in parameter names.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Double => "double",
            Self::Triple => "triple",
        }
    }
}

/// Ring limits for every density level.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RingLimitSet {
    /// Standard-standard pairs.
    pub single: RingLimits,
    /// Standard-dense pairs.
    pub double: RingLimits,
    /// Dense-dense pairs.
    pub triple: RingLimits,
}

impl RingLimitSet {
    /// Creates a set from the three levels.
    #[must_use]
    pub fn new(single: RingLimits, double: RingLimits, triple: RingLimits) -> Self {
        Self {
            single,
            double,
            triple,
        }
    }

    /// A set that connects nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Ring limits for `level`.
    #[inline]
    #[must_use]
    pub fn get(&self, level: DensityLevel) -> &RingLimits {
        match level {
            DensityLevel::Single => &self.single,
            DensityLevel::Double => &self.double,
            DensityLevel::Triple => &self.triple,
        }
    }

    /// Returns true if no level has any ring.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        DensityLevel::ALL.iter().all(|&l| self.get(l).is_empty())
    }

    /// Largest configured ring count over all levels.
    #[must_use]
    pub fn max_len(&self) -> usize {
        DensityLevel::ALL
            .iter()
            .map(|&l| self.get(l).len())
            .max()
            .unwrap_or(0)
    }

    /// Checks every window and the coverage ordering between levels.
    ///
    /// Non-empty levels must have non-decreasing length from single to
    /// triple density.
    ///
    /// # Errors
    /// Returns [`Error::InvalidWindow`] or [`Error::InvalidRingLimits`].
    pub fn validate(&self, name: &str) -> Result<()> {
        for level in DensityLevel::ALL {
            for (ring, window) in self.get(level).iter().enumerate() {
                window.validate(&format!("{name}.{}[{ring}]", level.name()))?;
            }
        }

        let mut previous: Option<(DensityLevel, usize)> = None;
        for level in DensityLevel::ALL {
            let len = self.get(level).len();
            if len == 0 {
                continue;
            }
            if let Some((prev_level, prev_len)) = previous {
                if len < prev_len {
                    return Err(Error::InvalidRingLimits {
                        name: name.to_string(),
                        reason: format!(
                            "{} density covers {len} rings, fewer than {} density ({prev_len})",
                            level.name(),
                            prev_level.name()
                        ),
                    });
                }
            }
            previous = Some((level, len));
        }
        Ok(())
    }
}

/// Horizontal string spacing per density level.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RingSpacing {
    /// Spacing of the standard grid (metres).
    pub single: f64,
    /// Spacing between standard and dense strings (metres).
    pub double: f64,
    /// Spacing between dense strings (metres).
    pub triple: f64,
    /// Fraction of a spacing by which a string may sit beyond its ring.
    pub tolerance: f64,
}

impl Default for RingSpacing {
    fn default() -> Self {
        Self {
            single: 125.0,
            double: 72.17,
            triple: 41.67,
            tolerance: 0.1,
        }
    }
}

impl RingSpacing {
    /// Spacing for `level`.
    #[inline]
    #[must_use]
    pub fn get(&self, level: DensityLevel) -> f64 {
        match level {
            DensityLevel::Single => self.single,
            DensityLevel::Double => self.double,
            DensityLevel::Triple => self.triple,
        }
    }

    /// Ring index of two distinct strings `distance` metres apart.
    ///
    /// Distinct strings are never in ring 0.
    #[must_use]
    pub fn ring_index(&self, level: DensityLevel, distance: f64) -> usize {
        let scaled = (distance / self.get(level) - self.tolerance).ceil();
        if scaled < 1.0 {
            1
        } else {
            scaled as usize
        }
    }

    /// Checks that spacings are finite and positive and the tolerance is sane.
    ///
    /// # Errors
    /// Returns [`Error::InvalidSpacing`].
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("single", self.single),
            ("double", self.double),
            ("triple", self.triple),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidSpacing { name, value });
            }
        }
        if !(0.0..0.5).contains(&self.tolerance) {
            return Err(Error::InvalidSpacing {
                name: "tolerance",
                value: self.tolerance,
            });
        }
        Ok(())
    }
}
