//! Final teardown of the console.

use std::time::{Duration, Instant};

use crate::common::harness::{shell_config, BridgeTestHarness};
use console_bridge::app::TERMINATION_NOTICE;
use console_bridge::model::state::BridgeState;

#[test]
#[cfg_attr(not(unix), ignore = "Console tests require a Unix shell")]
fn test_shutdown_delivers_remaining_output_and_notice() {
    let mut harness = BridgeTestHarness::with_shell("/bin/sh");
    harness.activate();
    harness.submit("echo last-words");
    harness
        .wait_until(|h| h.bridge().transcript().contains("last-words"))
        .unwrap();

    harness.bridge_mut().shutdown();

    assert!(!harness.bridge().has_session());
    assert_eq!(harness.bridge().status(), BridgeState::Idle);
    assert!(!harness.timer_running());
    let screen = harness.screen();
    assert!(screen.contains("last-words\n"));
    assert!(screen.ends_with(TERMINATION_NOTICE));
}

#[test]
fn test_shutdown_without_session_returns_immediately() {
    let mut harness = BridgeTestHarness::with_shell("/bin/sh");
    let started = Instant::now();

    harness.bridge_mut().shutdown();

    assert!(started.elapsed() < Duration::from_millis(200));
    assert!(harness.log().replacements.is_empty());
    assert_eq!(harness.log().timer_stops, 0);
}

#[test]
#[cfg_attr(not(unix), ignore = "Console tests require a Unix shell")]
fn test_shutdown_is_bounded_when_process_ignores_sigterm() {
    let mut config = shell_config("/bin/sh");
    config.shell_args = vec!["-c".to_string(), "trap '' TERM; sleep 30".to_string()];
    config.shutdown_timeout_ms = 300;
    let mut harness = BridgeTestHarness::new(config).unwrap();
    harness.activate();
    let started = Instant::now();

    harness.bridge_mut().shutdown();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(!harness.bridge().has_session());
}

#[test]
#[cfg(target_os = "linux")]
fn test_dropping_bridge_reaps_live_process() {
    let mut harness = BridgeTestHarness::with_shell("/bin/sh");
    harness.activate();
    let pid = harness.bridge().session_pid().unwrap();
    let proc_entry = std::path::PathBuf::from(format!("/proc/{pid}"));

    drop(harness);

    // Exited and waited on: not even a zombie entry remains
    let deadline = Instant::now() + Duration::from_secs(5);
    while proc_entry.exists() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(!proc_entry.exists(), "pid {pid} was left unreaped");
}
