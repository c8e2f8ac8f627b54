//! Rotation tests for the log engine
//!
//! Run with: cargo test -p quire-logging --test rotation

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use parking_lot::Mutex;
use quire_core::Topic;
use quire_logging::{
    Clock, Level, LogConfig, LogEngine, LogEngineBuilder, LogFileResolver, LogFilter, LogZone,
    RollingFileResolver, RotationStrategy, parse,
};
use tempfile::TempDir;

fn messages(path: &Path) -> Vec<String> {
    parse(&fs::read_to_string(path).unwrap_or_default())
        .into_iter()
        .map(|line| line.message)
        .collect()
}

/// Switches to `next` when the given record is about to be written
struct SwitchOnRecord {
    first: PathBuf,
    next: PathBuf,
    switch_at: usize,
    seen: AtomicUsize,
    rotation: Mutex<Option<Topic<PathBuf>>>,
}

impl LogFileResolver for SwitchOnRecord {
    fn on_create(&self, rotation: Topic<PathBuf>) {
        *self.rotation.lock() = Some(rotation);
    }

    fn on_log(&self) {
        let seen = self.seen.fetch_add(1, Ordering::SeqCst) + 1;
        if seen == self.switch_at
            && let Some(rotation) = self.rotation.lock().clone()
        {
            rotation.fire(self.next.clone());
        }
    }

    fn current_file(&self) -> PathBuf {
        self.first.clone()
    }

    fn zone(&self) -> LogZone {
        LogZone::Utc
    }
}

/// Answers `current_file` from a slot the test controls
struct Switchable {
    current: Mutex<PathBuf>,
}

impl LogFileResolver for Switchable {
    fn current_file(&self) -> PathBuf {
        self.current.lock().clone()
    }
}

struct PanicsOnLog {
    path: PathBuf,
}

impl LogFileResolver for PanicsOnLog {
    fn on_log(&self) {
        panic!("resolver bug");
    }

    fn current_file(&self) -> PathBuf {
        self.path.clone()
    }
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

// ============================================================================
// Resolver-driven Rotation
// ============================================================================

/// A rotation fired from on_log applies to the record being written
#[test]
fn test_rotation_applies_before_triggering_record() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("a.log");
    let next = dir.path().join("b.log");
    let resolver = Arc::new(SwitchOnRecord {
        first: first.clone(),
        next: next.clone(),
        switch_at: 3,
        seen: AtomicUsize::new(0),
        rotation: Mutex::new(None),
    });

    let engine = LogEngineBuilder::with_resolver(resolver)
        .config(LogConfig::testing())
        .build();
    engine.startup().unwrap();
    for i in 1..=5 {
        engine.info("Rot", format!("r{i}"));
    }
    engine.shutdown();

    assert_eq!(messages(&first), vec!["r1", "r2"]);
    assert_eq!(messages(&next), vec!["r3", "r4", "r5"]);
    assert_eq!(engine.path(), next);
}

#[test]
fn test_rolling_resolver_switches_on_day_boundary() {
    let dir = TempDir::new().unwrap();
    let start = Utc.with_ymd_and_hms(2024, 3, 9, 23, 59, 59).unwrap();
    let seconds = Arc::new(AtomicI64::new(start.timestamp()));
    let handle = Arc::clone(&seconds);
    let clock: Clock = Arc::new(move || {
        DateTime::from_timestamp(handle.load(Ordering::SeqCst), 0).unwrap_or_default()
    });

    let resolver = RollingFileResolver::new(dir.path(), "app", RotationStrategy::Daily)
        .with_zone(LogZone::Utc)
        .with_clock(Arc::clone(&clock));
    let engine = LogEngineBuilder::with_resolver(Arc::new(resolver))
        .config(LogConfig::testing())
        .clock(clock)
        .build();

    engine.startup().unwrap();
    engine.info("Day", "before midnight");
    engine.shutdown();

    seconds.fetch_add(2, Ordering::SeqCst);
    engine.startup().unwrap();
    engine.info("Day", "after midnight");
    engine.shutdown();

    assert_eq!(messages(&dir.path().join("app.2024-03-09")), vec!["before midnight"]);
    assert_eq!(messages(&dir.path().join("app.2024-03-10")), vec!["after midnight"]);
}

#[test]
fn test_rolling_resolver_rotates_while_running() {
    let dir = TempDir::new().unwrap();
    let start = Utc.with_ymd_and_hms(2024, 3, 9, 10, 59, 59).unwrap();
    let seconds = Arc::new(AtomicI64::new(start.timestamp()));
    let handle = Arc::clone(&seconds);
    let clock: Clock = Arc::new(move || {
        DateTime::from_timestamp(handle.load(Ordering::SeqCst), 0).unwrap_or_default()
    });

    let resolver = RollingFileResolver::new(dir.path(), "app", RotationStrategy::Hourly)
        .with_zone(LogZone::Utc)
        .with_clock(Arc::clone(&clock));
    let engine = LogEngineBuilder::with_resolver(Arc::new(resolver))
        .config(LogConfig::testing())
        .clock(clock)
        .build();
    engine.startup().unwrap();

    engine.info("Hour", "ten");
    // Once the writer has taken "ten", move the clock past the hour
    assert!(wait_until(|| !messages(&dir.path().join("app.2024-03-09-10")).is_empty()));
    seconds.fetch_add(1, Ordering::SeqCst);
    engine.info("Hour", "eleven");
    engine.shutdown();

    assert_eq!(messages(&dir.path().join("app.2024-03-09-10")), vec!["ten"]);
    assert_eq!(messages(&dir.path().join("app.2024-03-09-11")), vec!["eleven"]);
}

#[test]
fn test_resolver_panic_is_contained() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    let engine = LogEngineBuilder::with_resolver(Arc::new(PanicsOnLog { path: path.clone() }))
        .config(LogConfig::testing())
        .build();

    engine.startup().unwrap();
    engine.info("T", "still written");
    engine.shutdown();

    assert_eq!(messages(&path), vec!["still written"]);
}

// ============================================================================
// Externally Fired Rotation
// ============================================================================

#[test]
fn test_rotation_fired_from_another_thread() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("a.log");
    let next = dir.path().join("nested/b.log");
    let engine = LogEngine::builder(&first).config(LogConfig::testing()).build();
    engine.startup().unwrap();

    engine.info("T", "before");
    let topic = engine.rotation_topic().unwrap();
    let fire_path = next.clone();
    thread::spawn(move || {
        topic.fire(fire_path);
    })
    .join()
    .unwrap();
    engine.info("T", "after");
    engine.shutdown();

    assert_eq!(messages(&first), vec!["before"]);
    assert_eq!(messages(&next), vec!["after"]);
}

/// Another engine's writer is an outside thread: the request queues behind
/// records already waiting
#[test]
fn test_rotation_fired_from_another_engines_writer() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("a.log");
    let next = dir.path().join("b.log");

    let target = LogEngine::builder(&first).config(LogConfig::testing()).build();
    target.startup().unwrap();
    let slow: LogFilter = Arc::new(|_: &DateTime<FixedOffset>, _: Level, _: &str, _: &str| {
        thread::sleep(Duration::from_millis(50));
        true
    });
    target.set_filter(Some(slow));
    target.info("T", "one");
    target.info("T", "two");

    let topic = target.rotation_topic().unwrap();
    let fire_path = next.clone();
    let trigger: LogFilter = Arc::new(move |_: &DateTime<FixedOffset>, _: Level, _: &str, _: &str| {
        topic.fire(fire_path.clone());
        true
    });
    let driver = LogEngine::builder(dir.path().join("driver.log"))
        .config(LogConfig::testing())
        .filter(trigger)
        .build();
    driver.startup().unwrap();
    driver.info("D", "switch");
    driver.shutdown();

    target.info("T", "three");
    target.shutdown();

    assert_eq!(messages(&first), vec!["one", "two"]);
    assert_eq!(messages(&next), vec!["three"]);
}

#[test]
fn test_rotation_to_current_file_is_noop() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.log");
    let engine = LogEngine::builder(&path).config(LogConfig::testing()).build();
    engine.startup().unwrap();

    engine.info("T", "one");
    engine.rotation_topic().unwrap().fire(path.clone());
    engine.info("T", "two");
    engine.shutdown();

    assert_eq!(messages(&path), vec!["one", "two"]);
}

/// Firing without a payload asks the resolver for the current file
#[test]
fn test_rotation_without_payload_asks_resolver() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("a.log");
    let next = dir.path().join("b.log");
    let resolver = Arc::new(Switchable {
        current: Mutex::new(first.clone()),
    });

    let engine = LogEngineBuilder::with_resolver(resolver.clone())
        .config(LogConfig::testing())
        .build();
    engine.startup().unwrap();
    engine.info("T", "one");

    *resolver.current.lock() = next.clone();
    engine.rotation_topic().unwrap().fire(None::<PathBuf>);
    engine.info("T", "two");
    engine.shutdown();

    assert_eq!(messages(&first), vec!["one"]);
    assert_eq!(messages(&next), vec!["two"]);
}

#[test]
fn test_rotation_topic_absent_while_closed() {
    let dir = TempDir::new().unwrap();
    let engine = LogEngine::builder(dir.path().join("a.log"))
        .config(LogConfig::testing())
        .build();
    assert!(engine.rotation_topic().is_none());

    engine.startup().unwrap();
    let topic = engine.rotation_topic().unwrap();
    assert_eq!(topic.subscriber_count(), 1);

    engine.shutdown();
    assert!(engine.rotation_topic().is_none());
    assert_eq!(topic.subscriber_count(), 0);
}

// ============================================================================
// Failed Rotation
// ============================================================================

#[test]
fn test_failed_rotation_halts_until_startup() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.log");
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();

    let engine = LogEngine::builder(&path).config(LogConfig::testing()).build();
    engine.startup().unwrap();
    engine.info("T", "before");

    engine.rotation_topic().unwrap().fire(blocker.join("unreachable.log"));
    engine.info("T", "lost");
    assert!(wait_until(|| !engine.is_open()), "engine should halt");

    engine.info("T", "ignored");

    // Restart reopens the configured destination
    engine.startup().unwrap();
    assert!(engine.is_open());
    engine.info("T", "recovered");
    engine.shutdown();

    assert_eq!(messages(&path), vec!["before", "recovered"]);
}
