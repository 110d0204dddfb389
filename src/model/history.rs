//! Command history for submitted console input
//!
//! Entries are kept oldest-first (most recent last) with no duplicates:
//! re-submitting a command moves it to the end instead of adding a second copy.

/// Maximum number of commands kept in history
pub const MAX_HISTORY: usize = 20;

/// Bounded, de-duplicated history of submitted commands
#[derive(Debug, Clone)]
pub struct CommandHistory {
    /// Most recent last
    entries: Vec<String>,
    capacity: usize,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandHistory {
    /// Create an empty history holding at most [`MAX_HISTORY`] entries
    pub fn new() -> Self {
        Self::with_capacity(MAX_HISTORY)
    }

    /// Create an empty history with a custom bound (at least one entry)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Record a submitted command.
    ///
    /// Removes an existing equal entry, appends the command and evicts the
    /// oldest entries beyond capacity.
    pub fn record(&mut self, command: &str) {
        self.entries.retain(|entry| entry != command);
        self.entries.push(command.to_string());

        if self.entries.len() > self.capacity {
            let excess = self.entries.len() - self.capacity;
            self.entries.drain(..excess);
        }
    }

    /// Entries oldest first
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Entries most recent first, the order a history menu shows them in
    pub fn display_order(&self) -> Vec<String> {
        self.entries.iter().rev().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
