//! Configuration persistence and context bootstrap tests

use std::fs;
use std::path::PathBuf;

use quire_logging::{LogConfig, LogContext, RotationStrategy, ZoneConfig, parse};
use quire_storage::{DurableFile, ReadOutcome};
use tempfile::TempDir;

#[test]
fn test_config_survives_durable_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = DurableFile::new(dir.path().join("logging.json")).with_sync(false);

    let mut config = LogConfig::production(PathBuf::from("/var/log/quire"));
    config.zone = ZoneConfig::Offset { seconds_east: -5 * 3600 };
    config.queue_capacity = 4096;

    store.write_json(&config, true).unwrap();
    assert_eq!(store.read_json::<LogConfig>(), ReadOutcome::Primary(config.clone()));

    // A corrupted primary falls back to the previous version
    let mut updated = config.clone();
    updated.sync_on_write = false;
    store.write_json(&updated, true).unwrap();
    fs::write(store.path(), b"{\"queue_capacity\":").unwrap();
    assert_eq!(store.read_json::<LogConfig>(), ReadOutcome::Fallback(config));
}

#[test]
fn test_context_from_persisted_config() {
    let dir = TempDir::new().unwrap();
    let log_dir = dir.path().join("logs");
    let store = DurableFile::new(dir.path().join("logging.json")).with_sync(false);

    let mut config = LogConfig::production(log_dir.clone());
    if let Some(file) = config.file.as_mut() {
        file.prefix = "svc".to_string();
        file.rotation = RotationStrategy::Never;
    }
    config.zone = ZoneConfig::Utc;
    store.write_json(&config, false).unwrap();

    let loaded = store.read_json::<LogConfig>().into_option().unwrap();
    let context = LogContext::new(loaded);
    let engine = context.initialize_from_config().unwrap();
    assert_eq!(engine.path(), log_dir.join("svc"));

    context.info("Boot", "configured from disk");
    context.teardown();

    let lines = parse(&fs::read_to_string(log_dir.join("svc")).unwrap());
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].tag, "Boot");
    assert!(lines[0].timestamp.ends_with("+00:00"));
}
