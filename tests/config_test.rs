use std::time::Duration;

use expresslane::config::Config;

// Env vars are process-wide, so every case that touches them lives in one
// test to keep them from racing each other.
#[test]
fn config_from_env_reads_tick() {
    unsafe {
        std::env::remove_var("EXPRESSLANE_TICK_MS");
    }
    let config = Config::from_env().unwrap();
    assert_eq!(config.tick, Duration::from_millis(100));
    assert!(!config.log_level.is_empty());

    unsafe {
        std::env::set_var("EXPRESSLANE_TICK_MS", "25");
    }
    let config = Config::from_env().unwrap();
    assert_eq!(config.tick, Duration::from_millis(25));
    assert_eq!(config.queue_config().tick, Duration::from_millis(25));

    unsafe {
        std::env::set_var("EXPRESSLANE_TICK_MS", "0");
    }
    assert!(Config::from_env().is_err());

    unsafe {
        std::env::set_var("EXPRESSLANE_TICK_MS", "soon");
    }
    assert!(Config::from_env().is_err());

    // Clean up
    unsafe {
        std::env::remove_var("EXPRESSLANE_TICK_MS");
    }
}

#[test]
fn queue_config_builds_a_queue_with_that_tick() {
    let config = Config {
        tick: Duration::from_millis(7),
        otel_endpoint: None,
        log_level: "debug".to_string(),
    };
    let q = expresslane::Queue::with_config(config.queue_config());
    assert_eq!(q.tick(), Duration::from_millis(7));
}
