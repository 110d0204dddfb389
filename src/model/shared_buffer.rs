//! Byte accumulator shared between the output reader and the flush scheduler.
//!
//! The buffer is append-only for the lifetime of the bridge: a drain hands out
//! a snapshot of everything received so far and clears the dirty flag, but it
//! never removes bytes. This is what keeps the transcript delivered to the
//! surface prefix-consistent across drains.
//!
//! The type itself is not synchronized; it lives inside the bridge lock.

/// Accumulated process output plus a dirty flag.
#[derive(Debug, Default, Clone)]
pub struct SharedBuffer {
    bytes: Vec<u8>,
    dirty: bool,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append output and mark the buffer dirty.
    ///
    /// An empty slice is ignored so a no-op read never triggers a flush.
    pub fn append(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.bytes.extend_from_slice(bytes);
        self.dirty = true;
    }

    /// True iff bytes were appended since the last drain.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Snapshot the full content if dirty, clearing the flag.
    ///
    /// Returns `None` when nothing changed since the previous drain.
    pub fn drain(&mut self) -> Option<Vec<u8>> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(self.bytes.clone())
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
