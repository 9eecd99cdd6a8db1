use hive_algorithms::{HiveCleaning, HiveSplitter};
use hive_core::geometry::GridLayout;
use hive_io::{read_events, read_geometry, write_geometry, HiveConfig, SubEventWriter};
use std::sync::Arc;
use tempfile::tempdir;

const EVENTS: &str = r#"{
    "events": [
        {"id": 11, "sensors": [
            {"string": 1, "module": 4, "pulses": [{"time": 100.0, "charge": 1.0}]},
            {"string": 1, "module": 5, "pulses": [{"time": 120.0, "charge": 0.8}]},
            {"string": 1, "module": 6, "pulses": [{"time": 140.0, "charge": 1.1}]},
            {"string": 1, "module": 7, "pulses": [{"time": 160.0, "charge": 0.9, "flags": 1}]},
            {"string": 7, "module": 19, "pulses": [{"time": 9000.0, "charge": 0.3}]}
        ]},
        {"id": 12, "sensors": [
            {"string": 3, "module": 2, "pulses": [{"time": 50.0, "charge": 2.0}]}
        ]}
    ]
}"#;

#[test]
fn test_split_and_clean_through_files() {
    let dir = tempdir().unwrap();
    let geometry_path = dir.path().join("geometry.json");
    let events_path = dir.path().join("events.json");
    let config_path = dir.path().join("config.json");

    let layout = GridLayout::hexagonal(1).with_modules(20, 17.0).build().unwrap();
    write_geometry(&geometry_path, &layout).unwrap();
    std::fs::write(&events_path, EVENTS).unwrap();
    std::fs::write(
        &config_path,
        r#"{"splitter": {"multiplicity": 3}, "cleaning": {"multiplicity": 1}}"#,
    )
    .unwrap();

    let geometry = Arc::new(read_geometry(&geometry_path).unwrap());
    let events = read_events(&events_path).unwrap();
    let config = HiveConfig::from_file(&config_path).unwrap();

    let splitter = HiveSplitter::new(config.splitter, Arc::clone(&geometry)).unwrap();
    let cleaning = HiveCleaning::new(config.cleaning, geometry).unwrap();

    let series: Vec<_> = events.iter().map(|e| e.hits()).collect();
    let split = splitter.split_events(&series);
    assert_eq!(split[0].len(), 1);
    assert_eq!(split[0][0].len(), 4);
    assert!(split[1].is_empty());

    let split_path = dir.path().join("split.json");
    let mut writer = SubEventWriter::create(&split_path).unwrap();
    for (record, sub_events) in events.iter().zip(&split) {
        writer.write_split(record.id, sub_events).unwrap();
    }
    writer.finish().unwrap();

    let written = read_events(&split_path).unwrap();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].id, 11);
    assert_eq!(written[0].sub_event, Some(0));
    assert_eq!(written[0].hits(), split[0][0]);

    let cleaned = cleaning.clean_events(&series);
    let clean_path = dir.path().join("clean.csv");
    let mut writer = SubEventWriter::create(&clean_path).unwrap();
    for (record, hits) in events.iter().zip(&cleaned) {
        writer.write_cleaned(record.id, hits).unwrap();
    }
    assert_eq!(writer.rows(), 4);
    writer.finish().unwrap();

    let csv = std::fs::read_to_string(&clean_path).unwrap();
    assert_eq!(csv.lines().count(), 5);
    assert!(csv.contains("11,,1,7,160,0.9,1"));
    assert!(!csv.contains(",7,19,"));
}
