//! Submitted text → writes to the shell.

use std::sync::Arc;

use super::{lock_shared, Bridge};

/// Host platform family, as far as command rewriting is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Unix,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }
}

/// Settings that decide what a submitted command turns into
#[derive(Debug, Clone, Copy)]
pub struct DispatchRules<'a> {
    pub close_keywords: &'a [String],
    pub add_prompt: bool,
    pub platform: Platform,
}

/// What to do with one submitted command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandPlan {
    /// Blank input
    Ignore,
    /// A close keyword: hide and close the view, write nothing
    Close,
    /// Write each line, in order, to the shell's input
    Send { lines: Vec<String> },
}

impl CommandPlan {
    /// Plan the writes for `input`.
    ///
    /// `at_password_prompt` is whether the transcript currently ends in a
    /// password prompt; the prompt echo is suppressed then, since the input is
    /// a password rather than a command.
    pub fn for_input(input: &str, at_password_prompt: bool, rules: &DispatchRules<'_>) -> Self {
        let command = input.trim();
        if command.is_empty() {
            return CommandPlan::Ignore;
        }

        if rules.close_keywords.iter().any(|keyword| keyword == command) {
            return CommandPlan::Close;
        }

        let is_unix = rules.platform == Platform::Unix;

        // Without a pty sudo cannot ask the terminal; make it read stdin
        let to_send = match command.strip_prefix("sudo ") {
            Some(rest) if is_unix => format!("sudo --stdin {rest}"),
            _ => command.to_string(),
        };

        let mut lines = Vec::with_capacity(2);
        if rules.add_prompt && is_unix && !at_password_prompt {
            lines.push(prompt_echo_line(command));
        }
        lines.push(to_send);

        CommandPlan::Send { lines }
    }
}

/// `echo [`pwd`]$ '<command>'`: a pseudo-prompt the shell itself would not
/// print without a pty. The command is single quoted so it is shown, not run.
pub fn prompt_echo_line(command: &str) -> String {
    format!("echo [`pwd`]$ '{}'", command.replace('\'', r"'\''"))
}

impl Bridge {
    /// Handle one line of user input.
    ///
    /// Records it in the history, closes the view for a close keyword, and otherwise writes it to the
    /// shell, spawning a new session first if there is none. Failures are
    /// logged, never returned.
    pub fn submit(&mut self, raw: &str) {
        let command = raw.trim();
        if command.is_empty() {
            return;
        }

        let at_password_prompt = self
            .surface
            .last_line()
            .is_some_and(|line| self.password_prompt.is_match(&line));
        self.history.record(command);

        let rules = DispatchRules {
            close_keywords: &self.close_keywords,
            add_prompt: self.add_prompt,
            platform: self.platform,
        };
        match CommandPlan::for_input(command, at_password_prompt, &rules) {
            CommandPlan::Ignore => {}
            CommandPlan::Close => {
                tracing::info!("Close keyword '{}' submitted", command);
                self.close();
            }
            CommandPlan::Send { lines } => self.send_lines(&lines),
        }
    }

    fn send_lines(&mut self, lines: &[String]) {
        if !lock_shared(&self.shared).has_usable_session() {
            self.activate_blocking();
        }

        let shared = Arc::clone(&self.shared);
        let mut guard = lock_shared(&shared);
        let Some(session) = guard.session.as_mut() else {
            tracing::warn!("No console process, dropping input");
            return;
        };

        for line in lines {
            if let Err(e) = session.write_line(line, self.encoding) {
                tracing::warn!("{}", e);
                return;
            }
        }
    }
}
