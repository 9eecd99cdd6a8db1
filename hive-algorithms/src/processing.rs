//! High-level processing helpers that combine cleaning and splitting.

use hive_core::hit::{HitSeries, HitSeriesSeries};
use hive_core::splitting::{CleanStatistics, HitCleaner, SubEventSplitter};
use log::debug;
use rayon::prelude::*;

/// Totals over a processed batch of events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProcessingStatistics {
    /// Events processed.
    pub events: usize,
    /// Cleaning totals; zero when no cleaner ran.
    pub cleaning: CleanStatistics,
    /// Sub-events emitted.
    pub sub_events: usize,
    /// Hits that ended up in a sub-event.
    pub hits_in_sub_events: usize,
}

/// Optionally cleans one event, then splits it.
pub fn clean_and_split(
    hits: &HitSeries,
    cleaner: Option<&dyn HitCleaner>,
    splitter: &dyn SubEventSplitter,
) -> (HitSeriesSeries, CleanStatistics) {
    match cleaner {
        Some(cleaner) => {
            let cleaned = cleaner.clean(hits);
            let stats = CleanStatistics {
                hits_processed: hits.len(),
                hits_kept: cleaned.len(),
            };
            (splitter.split(&cleaned), stats)
        }
        None => (splitter.split(hits), CleanStatistics::default()),
    }
}

/// Cleans and splits many events in parallel.
///
/// Output order follows input order.
pub fn process_events(
    events: &[HitSeries],
    cleaner: Option<&dyn HitCleaner>,
    splitter: &dyn SubEventSplitter,
) -> (Vec<HitSeriesSeries>, ProcessingStatistics) {
    let results: Vec<_> = events
        .par_iter()
        .map(|hits| clean_and_split(hits, cleaner, splitter))
        .collect();

    let mut stats = ProcessingStatistics {
        events: events.len(),
        ..ProcessingStatistics::default()
    };
    let split = results
        .into_iter()
        .map(|(sub_events, cleaning)| {
            stats.cleaning.merge(&cleaning);
            stats.sub_events += sub_events.len();
            stats.hits_in_sub_events += sub_events.iter().map(HitSeries::len).sum::<usize>();
            sub_events
        })
        .collect();

    debug!(
        "processed {} events with {}: {} sub-events",
        stats.events,
        splitter.name(),
        stats.sub_events
    );
    (split, stats)
}
