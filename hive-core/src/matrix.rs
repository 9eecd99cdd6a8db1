//! Dense pairwise lookup tables over the sensor index space.
//!
//! Two addressing schemes exist and are deliberately separate types:
//!
//! - [`SymmetricMatrix`] stores one cell per unordered pair (packed lower
//!   triangle, diagonal included), so `get(a, b)` and `get(b, a)` are the
//!   same cell.
//! - [`AsymmetricMatrix`] stores the full square, so `(a, b)` and `(b, a)`
//!   are independent. Directional tests (earlier hit `a`, later hit `b`)
//!   must use this one.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Pairwise table where pair order is irrelevant.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SymmetricMatrix<T> {
    dim: usize,
    cells: Vec<T>,
}

impl<T: Clone> SymmetricMatrix<T> {
    /// Creates a `dim x dim` table filled with `fill`.
    #[must_use]
    pub fn new(dim: usize, fill: T) -> Self {
        Self {
            dim,
            cells: vec![fill; dim * (dim + 1) / 2],
        }
    }
}

impl<T> SymmetricMatrix<T> {
    /// Linear offset of the unordered pair `{a, b}`.
    #[inline]
    #[must_use]
    pub fn offset(&self, a: usize, b: usize) -> usize {
        assert!(
            a < self.dim && b < self.dim,
            "index ({a}, {b}) out of range for dimension {}",
            self.dim
        );
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        hi * (hi + 1) / 2 + lo
    }

    /// Cell of the pair `{a, b}`.
    #[inline]
    #[must_use]
    pub fn get(&self, a: usize, b: usize) -> &T {
        &self.cells[self.offset(a, b)]
    }

    /// Overwrites the cell of the pair `{a, b}`.
    #[inline]
    pub fn set(&mut self, a: usize, b: usize, value: T) {
        let offset = self.offset(a, b);
        self.cells[offset] = value;
    }

    /// Side length of the table.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of stored cells.
    #[must_use]
    pub fn cells(&self) -> usize {
        self.cells.len()
    }

    /// Iterates over all stored cells.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.cells.iter()
    }
}

/// Pairwise table where `(a, b)` and `(b, a)` are distinct cells.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AsymmetricMatrix<T> {
    dim: usize,
    cells: Vec<T>,
}

impl<T: Clone> AsymmetricMatrix<T> {
    /// Creates a `dim x dim` table filled with `fill`.
    #[must_use]
    pub fn new(dim: usize, fill: T) -> Self {
        Self {
            dim,
            cells: vec![fill; dim * dim],
        }
    }
}

impl<T> AsymmetricMatrix<T> {
    /// Linear offset of the ordered pair `(a, b)`.
    #[inline]
    #[must_use]
    pub fn offset(&self, a: usize, b: usize) -> usize {
        assert!(
            a < self.dim && b < self.dim,
            "index ({a}, {b}) out of range for dimension {}",
            self.dim
        );
        a * self.dim + b
    }

    /// Cell of the ordered pair `(a, b)`.
    #[inline]
    #[must_use]
    pub fn get(&self, a: usize, b: usize) -> &T {
        &self.cells[self.offset(a, b)]
    }

    /// Overwrites the cell of the ordered pair `(a, b)`.
    #[inline]
    pub fn set(&mut self, a: usize, b: usize, value: T) {
        let offset = self.offset(a, b);
        self.cells[offset] = value;
    }

    /// Side length of the table.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of stored cells.
    #[must_use]
    pub fn cells(&self) -> usize {
        self.cells.len()
    }

    /// Iterates over all stored cells in row-major order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.cells.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric_addressing() {
        let mut m = SymmetricMatrix::new(4, 0u32);
        assert_eq!(m.cells(), 10);

        m.set(1, 3, 7);
        assert_eq!(*m.get(1, 3), 7);
        assert_eq!(*m.get(3, 1), 7);

        m.set(3, 1, 9);
        assert_eq!(*m.get(1, 3), 9);
        assert_eq!(*m.get(2, 2), 0);
    }

    #[test]
    fn test_symmetric_offsets_are_a_bijection() {
        let m = SymmetricMatrix::new(6, ());
        let mut seen = vec![false; m.cells()];
        for a in 0..6 {
            for b in 0..=a {
                let offset = m.offset(a, b);
                assert!(!seen[offset], "offset {offset} reused");
                seen[offset] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_asymmetric_addressing() {
        let mut m = AsymmetricMatrix::new(3, false);
        assert_eq!(m.cells(), 9);

        m.set(0, 2, true);
        assert!(*m.get(0, 2));
        assert!(!*m.get(2, 0));
        assert_eq!(m.offset(2, 1), 7);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_out_of_range_panics() {
        let m = SymmetricMatrix::new(2, 0u8);
        let _ = m.get(0, 2);
    }

    #[test]
    fn test_empty_matrices() {
        let s = SymmetricMatrix::new(0, 0u8);
        let a = AsymmetricMatrix::new(0, 0u8);
        assert_eq!(s.cells(), 0);
        assert_eq!(a.cells(), 0);
    }
}
