use hive_algorithms::{
    CleaningConfig, ConnectionLimits, HiveCleaning, HiveSplitter, SplitterConfig, VicinityMap,
};
use hive_core::geometry::{DetectorGeometry, PopulationRule, Position};
use hive_core::hit::{Hit, HitSeries, SensorKey};
use hive_core::limits::RingSpacing;
use proptest::prelude::*;
use std::sync::Arc;

fn grid_geometry() -> Arc<DetectorGeometry> {
    let sensors = (1..=4u32).flat_map(|s| {
        (1..=8u32).map(move |m| {
            let x = 125.0 * f64::from((s - 1) % 2);
            let y = 125.0 * f64::from((s - 1) / 2);
            (SensorKey::new(s, m), Position::new(x, y, -17.0 * f64::from(m)))
        })
    });
    Arc::new(DetectorGeometry::new(sensors, PopulationRule::default()).unwrap())
}

/// Hits with unique charges so output hits can be traced back to the input.
fn hits_strategy() -> impl Strategy<Value = HitSeries> {
    prop::collection::vec((1..=5u32, 1..=8u32, 0.0..3000.0f64), 0..60).prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, (s, m, t))| Hit::new(SensorKey::new(s, m), t.round(), i as f64))
            .collect()
    })
}

fn is_subsequence(part: &HitSeries, whole: &HitSeries) -> bool {
    let mut rest = whole.iter();
    part.iter().all(|hit| rest.any(|other| other == hit))
}

fn is_time_sorted(series: &HitSeries) -> bool {
    series
        .as_slice()
        .windows(2)
        .all(|w| w[0].time() <= w[1].time())
}

proptest! {
    #[test]
    fn prop_split_preserves_time_order(hits in hits_strategy(), multiplicity in 1usize..5) {
        let splitter = HiveSplitter::new(
            SplitterConfig::default().with_multiplicity(multiplicity),
            grid_geometry(),
        ).unwrap();
        for sub_event in splitter.split(&hits) {
            prop_assert!(is_time_sorted(&sub_event));
            prop_assert!(is_subsequence(&sub_event, &hits));
        }
    }

    #[test]
    fn prop_split_neither_duplicates_nor_loses(hits in hits_strategy(), multiplicity in 1usize..5) {
        let splitter = HiveSplitter::new(
            SplitterConfig::default().with_multiplicity(multiplicity),
            grid_geometry(),
        ).unwrap();
        let (sub_events, stats) = splitter.split_with_statistics(&hits);

        let mut seen = vec![false; hits.len()];
        for hit in sub_events.iter().flat_map(HitSeries::iter) {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let id = hit.charge() as usize;
            prop_assert!(!seen[id], "hit {} emitted twice", id);
            seen[id] = true;
        }
        let emitted = seen.iter().filter(|&&s| s).count();
        prop_assert_eq!(emitted + stats.hits_dropped, hits.len());
        prop_assert!(sub_events.iter().all(|s| s.distinct_sensors() >= multiplicity));
    }

    #[test]
    fn prop_clean_preserves_time_order(hits in hits_strategy(), multiplicity in 1usize..4) {
        let cleaning = HiveCleaning::new(
            CleaningConfig::default().with_multiplicity(multiplicity),
            grid_geometry(),
        ).unwrap();
        let cleaned = cleaning.clean(&hits);
        prop_assert!(is_time_sorted(&cleaned));
        prop_assert!(is_subsequence(&cleaned, &hits));
    }

    #[test]
    fn prop_parallel_split_matches_sequential(events in prop::collection::vec(hits_strategy(), 0..6)) {
        let splitter = HiveSplitter::new(
            SplitterConfig::default().with_multiplicity(2),
            grid_geometry(),
        ).unwrap();
        let sequential: Vec<_> = events.iter().map(|e| splitter.split(e)).collect();
        prop_assert_eq!(splitter.split_events(&events), sequential);
    }

    #[test]
    fn prop_vicinity_build_is_idempotent(
        sensors in prop::collection::btree_map(
            (1..10u32, 1..20u32),
            (-400.0..400.0f64, -400.0..400.0f64, -500.0..0.0f64),
            0..40,
        ),
    ) {
        let geometry = Arc::new(
            DetectorGeometry::new(
                sensors.into_iter().map(|((s, m), (x, y, z))| {
                    (SensorKey::new(s, m), Position::new(x, y, z))
                }),
                PopulationRule::default(),
            )
            .unwrap(),
        );
        let config = SplitterConfig::default();
        let limits: ConnectionLimits = config.connection_limits();
        let spacing = RingSpacing::default();
        let first = VicinityMap::build(Arc::clone(&geometry), &spacing, &limits, false);
        let second = VicinityMap::build(geometry, &spacing, &limits, false);
        prop_assert_eq!(first, second);
    }
}
