//! Engine traits and statistics.

use crate::hit::{HitSeries, HitSeriesSeries};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Statistics of one or more split calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SplitStatistics {
    /// Number of input hits.
    pub hits_processed: usize,
    /// Connected components before the multiplicity cut.
    pub components_found: usize,
    /// Components that passed the multiplicity cut.
    pub sub_events: usize,
    /// Hits in components that failed the multiplicity cut.
    pub hits_dropped: usize,
}

impl SplitStatistics {
    /// Accumulates another set of statistics.
    pub fn merge(&mut self, other: &Self) {
        self.hits_processed += other.hits_processed;
        self.components_found += other.components_found;
        self.sub_events += other.sub_events;
        self.hits_dropped += other.hits_dropped;
    }
}

/// Statistics of one or more cleaning calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CleanStatistics {
    /// Number of input hits.
    pub hits_processed: usize,
    /// Hits that survived.
    pub hits_kept: usize,
}

impl CleanStatistics {
    /// Number of discarded hits.
    #[must_use]
    pub fn hits_removed(&self) -> usize {
        self.hits_processed - self.hits_kept
    }

    /// Accumulates another set of statistics.
    pub fn merge(&mut self, other: &Self) {
        self.hits_processed += other.hits_processed;
        self.hits_kept += other.hits_kept;
    }
}

/// Partitions a hit series into causally connected sub-events.
///
/// Implementations are immutable after construction, so one instance can
/// serve concurrent calls from many threads.
pub trait SubEventSplitter: Send + Sync {
    /// Splits `hits` into sub-events.
    fn split(&self, hits: &HitSeries) -> HitSeriesSeries;

    /// Returns the name of the algorithm.
    fn name(&self) -> &'static str;
}

/// Removes isolated hits from a hit series.
pub trait HitCleaner: Send + Sync {
    /// Returns the surviving hits in input order.
    fn clean(&self, hits: &HitSeries) -> HitSeries;

    /// Returns the name of the algorithm.
    fn name(&self) -> &'static str;
}
