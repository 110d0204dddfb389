//! Collaborators supplied by the hosting application.
//!
//! The bridge never draws anything itself. It hands full-transcript text to a
//! [`Surface`], asks a [`FlushTimer`] for periodic ticks, and populates a
//! [`HistoryMenu`] on request.

use std::time::Duration;

/// Display options carried over from configuration, applied once when the
/// bridge is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceOptions {
    pub font_size: u16,
    pub show_line_numbers: bool,
}

/// The text view showing the transcript
pub trait Surface {
    /// Replace the entire visible text with `text`
    fn replace_text(&mut self, text: &str);

    /// Scroll to and place the cursor at the end of the text
    fn go_to_end(&mut self);

    /// Last line of the visible text, if any
    fn last_line(&self) -> Option<String>;

    fn apply_options(&mut self, _options: &SurfaceOptions) {}
}

/// Closes the view hosting the console
pub trait ViewControl {
    fn close_view(&mut self);
}

/// Periodic callback driving [`crate::app::Bridge::tick`].
///
/// The host must not deliver a tick while the previous one is still running.
pub trait FlushTimer {
    fn start(&mut self, period: Duration);
    fn stop(&mut self);
}

/// List of previously submitted commands. Choosing an entry should call
/// [`crate::app::Bridge::submit`] with its text.
pub trait HistoryMenu {
    /// Show `entries`, most recent first
    fn show(&mut self, entries: &[String]);
}

/// The line holding the end of `text`; empty when `text` ends with a newline
pub fn last_line_of(text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    text.rsplit('\n').next().map(str::to_string)
}
