//! What submitted text turns into on the shell's input.
//!
//! `cat` echoes its input back, so the transcript shows exactly the bytes the
//! bridge wrote.

use crate::common::harness::{shell_config, BridgeTestHarness, RecordingMenu};
use console_bridge::model::state::BridgeState;
use console_bridge::services::process::SessionId;

#[test]
#[cfg_attr(not(unix), ignore = "Console tests require a Unix shell")]
fn test_sudo_is_rewritten_to_read_stdin() {
    let mut harness = BridgeTestHarness::with_shell("cat");
    harness.activate();

    harness.submit("sudo apt update");

    harness
        .wait_for_screen_contains("sudo --stdin apt update\n")
        .unwrap();
    assert_eq!(harness.screen(), "sudo --stdin apt update\n");
}

#[test]
#[cfg_attr(not(unix), ignore = "Console tests require a Unix shell")]
fn test_prompt_echo_is_written_before_command() {
    let mut config = shell_config("cat");
    config.add_prompt = true;
    let mut harness = BridgeTestHarness::new(config).unwrap();
    harness.activate();

    harness.submit("  ls  ");

    harness.wait_for_screen_contains("\nls\n").unwrap();
    assert_eq!(harness.screen(), "echo [`pwd`]$ 'ls'\nls\n");
}

#[test]
#[cfg_attr(not(unix), ignore = "Console tests require a Unix shell")]
fn test_prompt_echo_runs_through_shell() {
    let mut config = shell_config("/bin/sh");
    config.add_prompt = true;
    config.working_dir = Some(std::env::temp_dir());
    let mut harness = BridgeTestHarness::new(config).unwrap();
    harness.activate();

    harness.submit("echo 'quoted' && echo done-marker");

    harness.wait_for_screen_contains("\ndone-marker\n").unwrap();
    let screen = harness.screen();
    // The echoed pseudo-prompt shows the command without running it
    assert!(screen.contains("]$ echo 'quoted' && echo done-marker\n"), "{screen}");
    assert!(screen.contains("\nquoted\n"), "{screen}");
}

#[test]
#[cfg_attr(not(unix), ignore = "Console tests require a Unix shell")]
fn test_no_prompt_echo_while_password_is_requested() {
    let mut config = shell_config("/bin/sh");
    config.add_prompt = true;
    let mut harness = BridgeTestHarness::new(config).unwrap();
    harness.activate();

    // Stand-in for sudo's prompt, left without a trailing newline
    harness.submit("printf '[sudo] password for tester: '; read secret; echo got-$secret");
    harness
        .wait_until(|h| h.screen().ends_with("[sudo] password for tester: "))
        .unwrap();

    harness.submit("hunter2");

    harness.wait_for_screen_contains("got-hunter2").unwrap();
    assert!(!harness.screen().contains("'hunter2'"));
    // Every submission is recorded, the answer included
    assert_eq!(
        harness.bridge().history().entries().last().map(String::as_str),
        Some("hunter2")
    );
}

#[test]
#[cfg_attr(not(unix), ignore = "Console tests require a Unix shell")]
fn test_close_keyword_closes_view_without_writing() {
    let mut harness = BridgeTestHarness::with_shell("cat");
    harness.activate();

    harness.submit("exit");

    assert_eq!(harness.log().close_calls, 1);
    assert_eq!(harness.bridge().status(), BridgeState::Stopping);
    assert_eq!(harness.bridge().history().entries(), &["exit".to_string()]);

    // The process keeps running; the next write proves "exit" never reached it
    harness.submit("marker");
    harness
        .wait_until(|h| h.bridge().transcript().contains("marker"))
        .unwrap();
    assert_eq!(harness.bridge().transcript(), "marker\n");
}

#[test]
#[cfg_attr(not(unix), ignore = "Console tests require a Unix shell")]
fn test_submit_without_session_spawns_one() {
    let mut harness = BridgeTestHarness::with_shell("cat");
    assert!(!harness.bridge().has_session());

    harness.submit("first words");

    assert!(harness.bridge().has_session());
    assert_eq!(harness.bridge().status(), BridgeState::Running);
    harness.wait_for_screen_contains("first words\n").unwrap();
}

#[test]
#[cfg_attr(not(unix), ignore = "Console tests require a Unix shell")]
fn test_failed_write_replaces_session_on_next_submit() {
    let mut config = shell_config("/bin/sh");
    // The shell closes its input and keeps running, so writes fail with EPIPE
    config.shell_args = vec!["-c".to_string(), "exec 0<&-; sleep 30".to_string()];
    let mut harness = BridgeTestHarness::new(config).unwrap();
    harness.activate();
    let first = harness.bridge().session_id().unwrap();
    assert_eq!(first, SessionId(1));

    harness
        .wait_until(|h| {
            h.submit("ping");
            h.bridge().session_id().is_some_and(|id| id > first)
        })
        .unwrap();
    assert!(harness.bridge().has_session());
}

#[test]
#[cfg_attr(not(unix), ignore = "Console tests require a Unix shell")]
fn test_history_menu_lists_most_recent_first() {
    let mut harness = BridgeTestHarness::with_shell("cat");
    harness.activate();

    harness.submit("alpha");
    harness.submit("beta");
    harness.submit("  alpha ");
    harness.submit("   ");

    let mut menu = RecordingMenu(Default::default());
    harness.bridge().show_history(&mut menu);
    let shown = menu.0.borrow().menus_shown.clone();
    assert_eq!(shown, vec![vec!["alpha".to_string(), "beta".to_string()]]);
}
