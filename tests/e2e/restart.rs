//! Breaking the running process, with and without restart.

use crate::common::harness::{shell_config, BridgeTestHarness};
use console_bridge::app::TERMINATION_NOTICE;
use console_bridge::config::IoModeSetting;
use console_bridge::model::state::BridgeState;

#[test]
#[cfg_attr(not(unix), ignore = "Console tests require a Unix shell")]
fn test_break_with_restart_validates_exactly_one_new_session() {
    let mut harness = BridgeTestHarness::with_shell("/bin/sh");
    harness.activate();
    let first = harness.bridge().session_id().unwrap();

    harness.bridge_mut().break_session(true);
    assert!(harness.bridge().restart_pending());

    harness
        .wait_until(|h| h.bridge().session_id().is_some_and(|id| id != first))
        .unwrap();

    assert_eq!(harness.bridge().session_id(), Some(first.next()));
    assert_eq!(harness.bridge().status(), BridgeState::Running);
    assert!(!harness.bridge().restart_pending());
    assert!(harness.timer_running());
    assert_eq!(harness.log().timer_starts, 2);
    assert_eq!(harness.log().timer_stops, 1);
    assert!(harness.bridge().transcript().contains(TERMINATION_NOTICE));

    // The new shell is usable
    harness.submit("echo after-restart");
    harness.wait_for_screen_contains("after-restart").unwrap();
}

#[test]
#[cfg_attr(not(unix), ignore = "Console tests require a Unix shell")]
fn test_activation_while_process_is_dying_keeps_restart() {
    let mut config = shell_config("/bin/sh");
    // Outlives SIGTERM long enough for the view to be shown again
    config.shell_args = vec![
        "-c".to_string(),
        "trap 'sleep 0.3; exit 0' TERM; while :; do sleep 0.05; done".to_string(),
    ];
    let mut harness = BridgeTestHarness::new(config).unwrap();
    harness.activate();
    let first = harness.bridge().session_id().unwrap();

    harness.bridge_mut().break_session(true);
    harness.activate();

    // Still the old, exiting process: the restart is kept for the exit tick
    assert_eq!(harness.bridge().session_id(), Some(first));
    assert!(harness.bridge().restart_pending());

    harness
        .wait_until(|h| h.bridge().session_id().is_some_and(|id| id != first))
        .unwrap();
    assert_eq!(harness.bridge().session_id(), Some(first.next()));
    assert_eq!(harness.bridge().status(), BridgeState::Running);
    assert!(!harness.bridge().restart_pending());
    assert!(harness.timer_running());
    assert!(harness.bridge().transcript().contains(TERMINATION_NOTICE));
}

#[test]
#[cfg_attr(not(unix), ignore = "Console tests require a Unix shell")]
fn test_break_with_restart_in_poll_mode_waits_for_exit() {
    let mut config = shell_config("/bin/sh");
    config.io_mode = IoModeSetting::Poll;
    let mut harness = BridgeTestHarness::new(config).unwrap();
    harness.activate();
    let first = harness.bridge().session_id().unwrap();

    harness.bridge_mut().break_session(true);

    harness
        .wait_until(|h| h.bridge().session_id().is_some_and(|id| id > first))
        .unwrap();
    assert_eq!(harness.bridge().session_id(), Some(first.next()));
    assert_eq!(harness.bridge().status(), BridgeState::Running);
}

#[test]
#[cfg_attr(not(unix), ignore = "Console tests require a Unix shell")]
fn test_break_without_restart_stops_for_good() {
    let mut harness = BridgeTestHarness::with_shell("/bin/sh");
    harness.activate();

    harness.bridge_mut().break_session(false);

    harness.wait_until(|h| !h.timer_running()).unwrap();
    assert!(!harness.bridge().has_session());
    assert_eq!(harness.bridge().status(), BridgeState::Idle);
    harness.assert_screen_contains("Console process was terminated.");
}

#[test]
#[cfg_attr(not(unix), ignore = "Console tests require a Unix shell")]
fn test_restart_without_session_activates_immediately() {
    let mut harness = BridgeTestHarness::with_shell("/bin/sh");
    assert!(!harness.bridge().has_session());

    harness.bridge_mut().break_session(true);

    assert!(harness.bridge().has_session());
    assert_eq!(harness.bridge().status(), BridgeState::Running);
    assert!(!harness.bridge().restart_pending());
    assert_eq!(harness.log().timer_starts, 1);
}

#[test]
#[cfg_attr(not(unix), ignore = "Console tests require a Unix shell")]
fn test_break_while_hidden_restarts_on_next_activation() {
    let mut harness = BridgeTestHarness::with_shell("/bin/sh");
    harness.activate();
    let first = harness.bridge().session_id().unwrap();
    harness.bridge_mut().hide();
    harness.wait_until(|h| !h.timer_running()).unwrap();

    harness.bridge_mut().break_session(true);
    harness.wait_until(|h| !h.bridge().has_session()).unwrap();
    // Hidden: the exit is recorded but nothing restarts yet
    assert_eq!(harness.bridge().status(), BridgeState::Idle);
    assert!(harness.bridge().restart_pending());

    // The old process is gone, so this activation spawns and consumes the restart
    harness.activate();
    assert_eq!(harness.bridge().session_id(), Some(first.next()));
    assert!(!harness.bridge().restart_pending());
    harness.wait_for_screen_contains(TERMINATION_NOTICE).unwrap();
}
