use std::time::Duration;

use workpool::config::PoolConfig;

#[test]
fn defaults_match_reference_demo() {
    let config = PoolConfig::default();
    assert_eq!(config.worker_count, 10);
    assert_eq!(config.queue_capacity, None);
    assert_eq!(config.wait_timeout, None);
    assert_eq!(config.thread_name_prefix, "worker");
}

#[test]
fn toml_overrides_defaults() {
    let config = PoolConfig::from_toml_str(
        r#"
        [pool]
        workers = 4
        queue_capacity = 16
        wait_timeout_ms = 2500
        thread_name_prefix = "crunch"
        "#,
    )
    .unwrap();
    assert_eq!(config.worker_count, 4);
    assert_eq!(config.queue_capacity, Some(16));
    assert_eq!(config.wait_timeout, Some(Duration::from_millis(2500)));
    assert_eq!(config.thread_name_prefix, "crunch");
    assert_eq!(config.log_level, "info");
}

#[test]
fn empty_toml_is_default() {
    assert_eq!(
        PoolConfig::from_toml_str("").unwrap(),
        PoolConfig::default()
    );
}

#[test]
fn toml_rejects_unknown_keys_and_zero_workers() {
    assert!(PoolConfig::from_toml_str("[pool]\nthreads = 3\n").is_err());
    assert!(PoolConfig::from_toml_str("[pool]\nworkers = 0\n").is_err());
    assert!(PoolConfig::from_toml_str("[pool]\nqueue_capacity = 0\n").is_err());
}

#[test]
fn thread_prefix_with_nul_is_rejected() {
    let config = PoolConfig {
        thread_name_prefix: "bad\0name".to_string(),
        ..PoolConfig::default()
    };
    assert!(config.validate().is_err());
    assert!(PoolConfig::from_toml_str("[pool]\nthread_name_prefix = \"\"\n").is_err());
}

#[test]
fn from_file_reports_missing_path() {
    let path = std::env::temp_dir().join(format!("workpool-missing-{}.toml", uuid::Uuid::new_v4()));
    let err = PoolConfig::from_file(&path).unwrap_err();
    assert!(err.to_string().contains("cannot read"));
}

#[test]
fn from_file_loads_pool_table() {
    let path = std::env::temp_dir().join(format!("workpool-{}.toml", uuid::Uuid::new_v4()));
    std::fs::write(&path, "[pool]\nworkers = 3\n").unwrap();
    let config = PoolConfig::from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(config.worker_count, 3);
}

// All environment mutation lives in one test so parallel tests never observe it.
#[test]
fn env_overrides_and_validation() {
    unsafe {
        std::env::set_var("WORKPOOL_WORKERS", "6");
        std::env::set_var("WORKPOOL_QUEUE_CAPACITY", "8");
        std::env::set_var("WORKPOOL_WAIT_TIMEOUT_MS", "100");
        std::env::set_var("WORKPOOL_THREAD_PREFIX", "env");
    }

    let config = PoolConfig::from_env().unwrap();
    assert_eq!(config.worker_count, 6);
    assert_eq!(config.queue_capacity, Some(8));
    assert_eq!(config.wait_timeout, Some(Duration::from_millis(100)));
    assert_eq!(config.thread_name_prefix, "env");

    unsafe {
        std::env::set_var("WORKPOOL_WORKERS", "many");
    }
    assert!(PoolConfig::from_env().is_err());

    unsafe {
        std::env::set_var("WORKPOOL_WORKERS", "0");
    }
    assert!(PoolConfig::from_env().is_err());

    // Clean up
    unsafe {
        std::env::remove_var("WORKPOOL_WORKERS");
        std::env::remove_var("WORKPOOL_QUEUE_CAPACITY");
        std::env::remove_var("WORKPOOL_WAIT_TIMEOUT_MS");
        std::env::remove_var("WORKPOOL_THREAD_PREFIX");
    }
}
