//! Integration tests for environment-based configuration

use serial_test::serial;
use std::env;
use std::time::Duration;
use switchboard_router::{AgentRole, ConfigError, SettingsFile, SwitchboardConfigBuilder};

const VARS: &[&str] = &[
    "SWITCHBOARD_CALL_TIMEOUT_SECS",
    "SWITCHBOARD_DISCOVERY_CONCURRENCY",
    "SWITCHBOARD_MAX_FANOUT",
    "SWITCHBOARD_FALLBACK_ROLE",
];

fn set_env(key: &str, value: &str) {
    unsafe {
        env::set_var(key, value);
    }
}

fn clear_all_switchboard_env_vars() {
    for key in VARS {
        unsafe {
            env::remove_var(key);
        }
    }
}

#[test]
#[serial]
fn test_env_config_default_when_no_vars_set() {
    clear_all_switchboard_env_vars();

    let config = SwitchboardConfigBuilder::from_env()
        .expect("should load defaults when no env vars set")
        .build()
        .expect("should build valid config");

    assert_eq!(config.call_timeout, Duration::from_secs(30));
    assert_eq!(config.discovery_concurrency, 8);
    assert_eq!(config.max_fanout, 4);
    assert_eq!(config.fallback_role, AgentRole::Testing);
}

#[test]
#[serial]
fn test_env_config_overrides() {
    clear_all_switchboard_env_vars();
    set_env("SWITCHBOARD_CALL_TIMEOUT_SECS", "5");
    set_env("SWITCHBOARD_DISCOVERY_CONCURRENCY", "2");
    set_env("SWITCHBOARD_MAX_FANOUT", "16");
    set_env("SWITCHBOARD_FALLBACK_ROLE", " Information ");

    let config = SwitchboardConfigBuilder::from_env()
        .expect("should load config")
        .build()
        .expect("should build valid config");

    assert_eq!(config.call_timeout, Duration::from_secs(5));
    assert_eq!(config.discovery_concurrency, 2);
    assert_eq!(config.max_fanout, 16);
    assert_eq!(config.fallback_role, AgentRole::Information);

    clear_all_switchboard_env_vars();
}

#[test]
#[serial]
fn test_env_config_invalid_number() {
    clear_all_switchboard_env_vars();
    set_env("SWITCHBOARD_CALL_TIMEOUT_SECS", "soon");

    let err = SwitchboardConfigBuilder::from_env().unwrap_err();
    match err {
        ConfigError::InvalidEnvVar { key, .. } => assert_eq!(key, "SWITCHBOARD_CALL_TIMEOUT_SECS"),
        other => panic!("unexpected error: {other}"),
    }

    clear_all_switchboard_env_vars();
}

#[test]
#[serial]
fn test_env_config_invalid_role() {
    clear_all_switchboard_env_vars();
    set_env("SWITCHBOARD_FALLBACK_ROLE", "wizard");

    let err = SwitchboardConfigBuilder::from_env().unwrap_err();
    assert!(err.to_string().contains("SWITCHBOARD_FALLBACK_ROLE"));

    clear_all_switchboard_env_vars();
}

#[test]
#[serial]
fn test_env_config_out_of_range_fails_validation() {
    clear_all_switchboard_env_vars();
    set_env("SWITCHBOARD_MAX_FANOUT", "0");

    let err = SwitchboardConfigBuilder::from_env()
        .expect("value parses")
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError(_)));

    clear_all_switchboard_env_vars();
}

#[test]
#[serial]
fn test_env_wins_over_file_settings() {
    clear_all_switchboard_env_vars();
    set_env("SWITCHBOARD_CALL_TIMEOUT_SECS", "12");

    let settings = SettingsFile {
        call_timeout_secs: Some(3),
        max_fanout: Some(2),
        ..Default::default()
    };
    let config = SwitchboardConfigBuilder::new()
        .apply_settings(&settings)
        .apply_env()
        .expect("should load config")
        .build()
        .expect("should build valid config");

    assert_eq!(config.call_timeout, Duration::from_secs(12));
    assert_eq!(config.max_fanout, 2);

    clear_all_switchboard_env_vars();
}
