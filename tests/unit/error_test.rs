//! Tests for error types

use prometheus_exequeue::core::{ConfigError, ExecError, KillReason};

#[test]
fn test_spawn_failed_from_io_error() {
    let io = std::io::Error::from_raw_os_error(13);
    let err = ExecError::spawn_failed(&io);
    assert_eq!(format!("{err}"), "Program execution failed.");
    assert_eq!(err.errno(), Some(13));
    assert_eq!(err.exit_code(), Some(-1));
    assert_eq!(err.signal(), None);
}

#[test]
fn test_spawn_failed_without_os_error() {
    let err = ExecError::spawn_failed(&std::io::Error::other("no pid"));
    assert_eq!(err.errno(), None);
}

#[test]
fn test_cancelled_messages() {
    let timeout = ExecError::Cancelled {
        reason: KillReason::Timeout,
    };
    let killed = ExecError::Cancelled {
        reason: KillReason::ExplicitKill,
    };
    assert_eq!(format!("{timeout}"), "Program execution cancelled because of timeout.");
    assert_eq!(format!("{killed}"), "Program execution cancelled because of explicit kill.");
    assert_eq!(killed.kill_reason(), Some(KillReason::ExplicitKill));
}

#[test]
fn test_abnormal_exit_details() {
    let err = ExecError::AbnormalExit {
        exit_code: 42,
        stdout: None,
        stderr: None,
    };
    assert_eq!(format!("{err}"), "Program terminated by abnormal exit code.");
    assert_eq!(err.exit_code(), Some(42));
    assert!(!err.is_cancelled());
}

#[test]
fn test_config_error_display() {
    assert_eq!(
        format!("{}", ConfigError::InvalidCwd("rel".into())),
        "invalid cwd: rel"
    );
    assert_eq!(
        format!("{}", ConfigError::UnknownEncoding("ebcdic".into())),
        "unknown encoding: ebcdic"
    );
}

#[test]
fn test_kill_reason_serializes_snake_case() {
    assert_eq!(
        serde_json::to_string(&KillReason::ExplicitKill).unwrap(),
        "\"explicit_kill\""
    );
}
