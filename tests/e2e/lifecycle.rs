//! Activation, output delivery, hide and process exit.

use crate::common::harness::{shell_config, BridgeTestHarness};
use console_bridge::app::TERMINATION_NOTICE;
use console_bridge::config::IoModeSetting;
use console_bridge::model::state::BridgeState;

#[test]
#[cfg_attr(not(unix), ignore = "Console tests require a Unix shell")]
fn test_activation_starts_one_session_and_timer() {
    let mut harness = BridgeTestHarness::with_shell("/bin/sh");
    assert!(!harness.bridge().has_session());
    assert_eq!(harness.bridge().status(), BridgeState::Idle);

    harness.activate();

    assert_eq!(harness.bridge().status(), BridgeState::Running);
    assert!(harness.bridge().session_pid().is_some());
    assert_eq!(harness.log().timer_starts, 1);
    assert_eq!(
        harness.log().timer_period,
        Some(std::time::Duration::from_millis(20))
    );
}

#[test]
#[cfg_attr(not(unix), ignore = "Console tests require a Unix shell")]
fn test_second_activation_reuses_live_session() {
    let mut harness = BridgeTestHarness::with_shell("/bin/sh");
    harness.activate();
    let id = harness.bridge().session_id();
    let pid = harness.bridge().session_pid();

    harness.activate();

    assert_eq!(harness.bridge().session_id(), id);
    assert_eq!(harness.bridge().session_pid(), pid);
    // Already running: the timer is not started twice
    assert_eq!(harness.log().timer_starts, 1);
}

#[test]
#[cfg_attr(not(unix), ignore = "Console tests require a Unix shell")]
fn test_output_and_errors_reach_surface() {
    let mut harness = BridgeTestHarness::with_shell("/bin/sh");
    harness.activate();

    harness.submit("echo hello-bridge; echo oops-bridge 1>&2");

    harness.wait_for_screen_contains("oops-bridge").unwrap();
    harness.assert_screen_contains("hello-bridge\n");
    assert!(harness.log().go_to_end_calls >= 1);
}

#[test]
#[cfg_attr(not(unix), ignore = "Console tests require a Unix shell")]
fn test_transcript_grows_monotonically() {
    let mut harness = BridgeTestHarness::with_shell("/bin/sh");
    harness.activate();

    harness.submit("echo first");
    harness.wait_for_screen_contains("first").unwrap();
    harness.submit("echo second");
    harness.wait_for_screen_contains("second").unwrap();

    let log = harness.log();
    for pair in log.replacements.windows(2) {
        assert!(
            pair[1].starts_with(&pair[0]),
            "transcript rolled back: {:?} -> {:?}",
            pair[0],
            pair[1]
        );
    }
}

#[test]
#[cfg_attr(not(unix), ignore = "Console tests require a Unix shell")]
fn test_exit_appends_notice_and_stops_timer() {
    let mut harness = BridgeTestHarness::with_shell("/bin/sh");
    harness.activate();

    harness.submit("echo bye; exit 3");

    harness
        .wait_until(|h| h.screen().ends_with("Console process was terminated.\n\n"))
        .unwrap();
    harness.assert_screen_contains("bye\n");
    harness.wait_until(|h| !h.timer_running()).unwrap();

    assert!(!harness.bridge().has_session());
    assert_eq!(harness.bridge().status(), BridgeState::Idle);
    assert_eq!(harness.log().timer_stops, 1);

    // No further reads for that session: the transcript stays put
    let final_transcript = harness.bridge().transcript();
    std::thread::sleep(std::time::Duration::from_millis(100));
    assert_eq!(harness.bridge().transcript(), final_transcript);
    assert!(final_transcript.ends_with(TERMINATION_NOTICE));
}

#[test]
#[cfg_attr(not(unix), ignore = "Console tests require a Unix shell")]
fn test_poll_seek_mode_delivers_output_and_exit() {
    let mut config = shell_config("/bin/sh");
    config.io_mode = IoModeSetting::Poll;
    let mut harness = BridgeTestHarness::new(config).unwrap();
    harness.activate();

    harness.submit("echo polled-output");
    harness.wait_for_screen_contains("polled-output").unwrap();

    harness.submit("exit 0");
    harness
        .wait_until(|h| h.screen().ends_with(TERMINATION_NOTICE))
        .unwrap();
    harness.wait_until(|h| !h.bridge().has_session()).unwrap();
}

#[test]
#[cfg_attr(not(unix), ignore = "Console tests require a Unix shell")]
fn test_hide_keeps_process_and_activation_resumes_it() {
    let mut harness = BridgeTestHarness::with_shell("/bin/sh");
    harness.activate();
    let id = harness.bridge().session_id();

    harness.bridge_mut().hide();
    assert_eq!(harness.bridge().status(), BridgeState::Stopping);
    harness.wait_until(|h| !h.timer_running()).unwrap();
    assert_eq!(harness.bridge().status(), BridgeState::Idle);

    // Output produced while hidden is kept and delivered after reactivation
    harness.submit("echo while-hidden");
    harness
        .wait_until(|h| h.bridge().transcript().contains("while-hidden"))
        .unwrap();
    assert!(!harness.screen().contains("while-hidden"));

    harness.activate();
    assert_eq!(harness.bridge().session_id(), id);
    harness.wait_for_screen_contains("while-hidden").unwrap();
    assert_eq!(harness.log().timer_starts, 2);
}

#[test]
#[cfg_attr(not(unix), ignore = "Console tests require a Unix shell")]
fn test_spawn_failure_leaves_no_session_and_shows_notice() {
    let mut harness = BridgeTestHarness::with_shell("/nonexistent/console/shell");
    harness.activate();

    assert!(!harness.bridge().has_session());
    assert_eq!(harness.bridge().status(), BridgeState::Running);
    harness
        .wait_for_screen_contains("Failed to start console process '/nonexistent/console/shell'")
        .unwrap();

    // Submitting retries the spawn and fails the same way, without panicking
    harness.submit("ls");
    assert!(!harness.bridge().has_session());
    assert_eq!(harness.bridge().history().entries(), &["ls".to_string()]);
}

#[test]
fn test_invalid_config_fails_construction() {
    let mut config = shell_config("/bin/sh");
    config.encoding = "no-such-encoding".to_string();
    assert!(BridgeTestHarness::new(config).is_err());

    let mut config = shell_config("/bin/sh");
    config.password_prompt_pattern = "(".to_string();
    assert!(BridgeTestHarness::new(config).is_err());
}

#[test]
fn test_surface_options_applied_at_construction() {
    let mut config = shell_config("/bin/sh");
    config.font_size = 14;
    config.show_line_numbers = true;
    let harness = BridgeTestHarness::new(config).unwrap();

    let options = harness.log().applied_options.unwrap();
    assert_eq!(options.font_size, 14);
    assert!(options.show_line_numbers);
    // Nothing is spawned before the first activation
    assert!(!harness.bridge().has_session());
}
