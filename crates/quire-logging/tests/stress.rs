//! Lifecycle stress tests for the log engine
//!
//! Run with: cargo test -p quire-logging --test stress

use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use quire_logging::{LogConfig, LogEngine, parse};
use tempfile::TempDir;

fn config(capacity: usize) -> LogConfig {
    LogConfig {
        queue_capacity: capacity,
        ..LogConfig::testing()
    }
}

#[test]
fn test_concurrent_shutdown_calls_all_wait_for_drain() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    let engine = LogEngine::builder(&path).config(config(8192)).build();
    engine.startup().unwrap();

    for i in 0..5000 {
        engine.info("Bulk", i.to_string());
    }

    const CLOSERS: usize = 4;
    let barrier = Arc::new(Barrier::new(CLOSERS));
    let handles: Vec<_> = (0..CLOSERS)
        .map(|_| {
            let engine = engine.clone();
            let barrier = Arc::clone(&barrier);
            let path = path.clone();
            thread::spawn(move || {
                barrier.wait();
                engine.shutdown();
                // Whichever call returns, the drain is complete
                fs::read_to_string(&path).unwrap().lines().count()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 5000);
    }
    assert!(!engine.is_open());
}

#[test]
fn test_restart_cycles_under_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    let engine = LogEngine::builder(&path).config(config(32)).build();
    engine.startup().unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let producers: Vec<_> = (0..4)
        .map(|t| {
            let engine = engine.clone();
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut i = 0u64;
                while !stop.load(Ordering::Relaxed) {
                    engine.warn(&format!("P{t}"), format!("message {i}\nsecond line"));
                    i += 1;
                }
            })
        })
        .collect();

    for _ in 0..20 {
        engine.shutdown();
        assert!(!engine.is_open());
        engine.startup().unwrap();
        assert!(engine.is_open());
    }

    stop.store(true, Ordering::Relaxed);
    for producer in producers {
        producer.join().unwrap();
    }
    engine.shutdown();

    let contents = fs::read_to_string(&path).unwrap();
    let lines = parse(&contents);
    assert_eq!(lines.len(), contents.lines().count(), "every line is well formed");

    // Both physical lines of a record are written together
    for pair in lines.chunks(2) {
        assert!(pair[0].message.starts_with("message "));
        assert_eq!(pair[1].message, "second line");
        assert_eq!(pair[0].tag, pair[1].tag);
        assert_eq!(pair[0].timestamp, pair[1].timestamp);
    }
}
