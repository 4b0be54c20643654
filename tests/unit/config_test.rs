//! Tests for configuration validation

use std::path::Path;

use prometheus_exequeue::config::QueueConfig;
use prometheus_exequeue::core::{ConfigError, KeyPolicy};

#[test]
fn test_default_is_unbounded() {
    let cfg = QueueConfig::new();
    assert_eq!(cfg.max_concurrent, None);
    assert_eq!(cfg.key_policy, KeyPolicy::Digest);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_zero_cap_invalid() {
    let cfg = QueueConfig::new().with_max_concurrent(0);
    assert!(matches!(cfg.validate(), Err(ConfigError::InvalidMaxConcurrent(_))));
}

#[test]
fn test_per_cpu_is_positive() {
    let cfg = QueueConfig::per_cpu();
    assert!(cfg.max_concurrent.is_some_and(|n| n >= 1));
}

#[test]
fn test_from_json_str() {
    let cfg = QueueConfig::from_json_str(
        r#"{"max_concurrent": 4, "shell": "/bin/bash", "key_policy": "canonical"}"#,
    )
    .unwrap();
    assert_eq!(cfg.max_concurrent, Some(4));
    assert_eq!(cfg.resolve_shell(), Path::new("/bin/bash"));
    assert_eq!(cfg.key_policy, KeyPolicy::Canonical);

    let cfg = QueueConfig::from_json_str("{}").unwrap();
    assert_eq!(cfg, QueueConfig::new());
}

#[test]
fn test_from_json_str_rejects_invalid() {
    assert!(matches!(
        QueueConfig::from_json_str(r#"{"max_concurrent": 0}"#),
        Err(ConfigError::InvalidMaxConcurrent(_))
    ));
    assert!(matches!(
        QueueConfig::from_json_str(r#"{"max_concurrent": -1}"#),
        Err(ConfigError::Parse(_))
    ));
    assert!(matches!(
        QueueConfig::from_json_str(r#"{"key_policy": "md5"}"#),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_resolved_shell_is_never_empty() {
    assert!(!QueueConfig::new().resolve_shell().as_os_str().is_empty());
}
