#![allow(clippy::uninlined_format_args)]
use hive_algorithms::{
    CleaningConfig, HiveCleaning, HiveSplitter, SplitterConfig, SPEED_OF_LIGHT_VACUUM,
};
use hive_core::geometry::{DetectorGeometry, GridLayout, PopulationRule, Position};
use hive_core::hit::{Hit, HitSeries, SensorKey};
use hive_core::limits::{RingLimitSet, RingLimits, Window};
use std::sync::Arc;

/// Strings on a straight line along x, 125 m apart, modules 17 m apart.
fn line_geometry(strings: u32, modules: u32) -> Arc<DetectorGeometry> {
    let sensors = (1..=strings).flat_map(|s| {
        (1..=modules).map(move |m| {
            (
                SensorKey::new(s, m),
                Position::new(125.0 * f64::from(s - 1), 0.0, -17.0 * f64::from(m)),
            )
        })
    });
    Arc::new(DetectorGeometry::new(sensors, PopulationRule::default()).unwrap())
}

fn hit(string: u32, module: u32, time: f64) -> Hit {
    Hit::new(SensorKey::new(string, module), time, 1.0)
}

/// One hit per string at module 5, timed at vacuum light speed along the line.
fn light_track(strings: u32, t0: f64) -> Vec<Hit> {
    (1..=strings)
        .map(|s| hit(s, 5, t0 + 125.0 * f64::from(s - 1) / SPEED_OF_LIGHT_VACUUM))
        .collect()
}

#[test]
fn test_cleaning_drops_self_coincidence() {
    let cleaning = HiveCleaning::new(CleaningConfig::default(), line_geometry(4, 10)).unwrap();
    let hits = HitSeries::from_hits(vec![hit(2, 5, 1000.0), hit(2, 5, 1000.0)]);
    assert!(cleaning.clean(&hits).is_empty());
}

#[test]
fn test_cleaning_keeps_full_detector() {
    let geometry = Arc::new(GridLayout::hexagonal(2).with_modules(20, 17.0).build().unwrap());
    let hits: HitSeries = geometry
        .sensors()
        .map(|(key, _)| Hit::new(key, 5000.0, 1.0))
        .collect();
    let cleaning = HiveCleaning::new(CleaningConfig::default(), geometry).unwrap();

    let (cleaned, stats) = cleaning.clean_with_statistics(&hits);
    assert_eq!(cleaned.len(), hits.len());
    assert_eq!(cleaned, hits);
    assert_eq!(stats.hits_removed(), 0);
}

#[test]
fn test_splitter_completeness() {
    let splitter = HiveSplitter::new(SplitterConfig::default(), line_geometry(6, 10)).unwrap();
    let hits = HitSeries::from_hits(light_track(6, 0.0));

    let sub_events = splitter.split(&hits);
    assert_eq!(sub_events.len(), 1, "got {} sub-events", sub_events.len());
    assert_eq!(sub_events[0], hits);
}

#[test]
fn test_splitter_time_separation() {
    let splitter = HiveSplitter::new(SplitterConfig::default(), line_geometry(6, 10)).unwrap();
    let first = light_track(6, 0.0);
    let second = light_track(6, 100_000.0);
    assert!(100_000.0 > splitter.horizon());

    let hits = HitSeries::from_hits(first.iter().chain(&second).copied().collect());
    let sub_events = splitter.split(&hits);
    assert_eq!(sub_events.len(), 2);
    assert_eq!(sub_events[0], HitSeries::from_hits(first));
    assert_eq!(sub_events[1], HitSeries::from_hits(second));
}

#[test]
fn test_splitter_bridging() {
    let splitter = HiveSplitter::new(SplitterConfig::default(), line_geometry(6, 10)).unwrap();

    // String 1 and string 4 are three rings apart and never connect.
    let left: Vec<Hit> = (1..=4).map(|m| hit(1, m, 5.0 * f64::from(m))).collect();
    let right: Vec<Hit> = (1..=4).map(|m| hit(4, m, 1267.0)).collect();
    // Two rings from string 1, one ring from string 4.
    let bridge = hit(3, 3, 850.0);

    let apart = HitSeries::from_hits(left.iter().chain(&right).copied().collect());
    assert_eq!(splitter.split(&apart).len(), 2);

    let mut with_bridge: Vec<Hit> = left.iter().chain(&right).copied().collect();
    with_bridge.push(bridge);
    let joined = splitter.split(&HitSeries::from_hits(with_bridge));
    assert_eq!(joined.len(), 1);
    assert_eq!(joined[0].len(), 9);

    assert_eq!(splitter.split(&apart).len(), 2);
}

#[test]
fn test_splitter_multiplicity_drop() {
    let splitter = HiveSplitter::new(SplitterConfig::default(), line_geometry(4, 10)).unwrap();
    let hits = HitSeries::from_hits(vec![hit(1, 1, 0.0), hit(1, 2, 10.0), hit(1, 3, 20.0)]);

    let (sub_events, stats) = splitter.split_with_statistics(&hits);
    assert!(sub_events.is_empty());
    assert_eq!(stats.components_found, 1);
    assert_eq!(stats.hits_dropped, 3);
}

#[test]
fn test_repeated_sensor_counts_once() {
    let splitter = HiveSplitter::new(
        SplitterConfig::default().with_self_connect(true),
        line_geometry(4, 10),
    )
    .unwrap();
    // Four hits but only three sensors.
    let hits = HitSeries::from_hits(vec![
        hit(1, 1, 0.0),
        hit(1, 1, 30.0),
        hit(1, 2, 10.0),
        hit(1, 3, 20.0),
    ]);
    let (sub_events, stats) = splitter.split_with_statistics(&hits);
    assert!(sub_events.is_empty());
    assert_eq!(stats.components_found, 1);
}

#[test]
fn test_directional_light_connection() {
    // Light may only reach sensors below the earlier hit.
    let config = SplitterConfig::default()
        .with_multiplicity(2)
        .with_vicinity_limits(RingLimitSet::empty())
        .with_light_limits(RingLimitSet::new(
            RingLimits::new(vec![Window::new(-200.0, 0.0)]),
            RingLimits::empty(),
            RingLimits::empty(),
        ))
        .with_causal_vacuum(Window::new(-10.0, 10.0))
        .with_causal_ice(Window::new(-10.0, 10.0));
    let splitter = HiveSplitter::new(config, line_geometry(2, 10)).unwrap();
    let travel = 68.0 / SPEED_OF_LIGHT_VACUUM;

    let downward = HitSeries::from_hits(vec![hit(1, 1, 0.0), hit(1, 5, travel)]);
    assert_eq!(splitter.split(&downward).len(), 1);

    let upward = HitSeries::from_hits(vec![hit(1, 5, 0.0), hit(1, 1, travel)]);
    assert!(splitter.split(&upward).is_empty());
}

#[test]
fn test_empty_input() {
    let geometry = line_geometry(3, 5);
    let splitter = HiveSplitter::new(SplitterConfig::default(), Arc::clone(&geometry)).unwrap();
    let cleaning = HiveCleaning::new(CleaningConfig::default(), geometry).unwrap();

    let (sub_events, stats) = splitter.split_with_statistics(&HitSeries::new());
    assert!(sub_events.is_empty());
    assert_eq!(stats.hits_processed, 0);
    assert!(cleaning.clean(&HitSeries::new()).is_empty());
}

#[test]
fn test_engines_share_one_map() {
    let splitter = HiveSplitter::new(SplitterConfig::default(), line_geometry(3, 5)).unwrap();
    let again = HiveSplitter::with_map(
        SplitterConfig::default().with_multiplicity(1),
        Arc::clone(splitter.map()),
    )
    .unwrap();
    assert!(Arc::ptr_eq(splitter.map(), again.map()));
}
