//! Flush cadence: moving the shared buffer onto the surface.

use std::sync::Arc;

use super::{lock_shared, Bridge};
use crate::model::state::BridgeState;

impl Bridge {
    /// One flush tick, called by the host every [`Bridge::tick_period`] while
    /// the flush timer is started.
    ///
    /// A tick never overlaps another one (`&mut self`). While stopping, it
    /// delivers once more, halts the timer and performs a pending restart.
    pub fn tick(&mut self) {
        // Give the reader a moment to finish a burst before snapshotting
        self.time.sleep(self.debounce);

        let shared = Arc::clone(&self.shared);
        let mut guard = lock_shared(&shared);
        match guard.state {
            BridgeState::Stopping => {
                let snapshot = guard.buffer.drain();
                guard.state = BridgeState::Idle;
                let restart = std::mem::take(&mut guard.restart_pending);
                drop(guard);

                if let Some(bytes) = snapshot {
                    self.deliver(&bytes);
                }
                self.timer.stop();
                tracing::debug!("Flush timer stopped");

                if restart {
                    tracing::info!("Restarting console process");
                    self.activate_blocking();
                }
            }
            BridgeState::Running => {
                let snapshot = guard.buffer.drain();
                drop(guard);

                if let Some(bytes) = snapshot {
                    self.deliver(&bytes);
                }
            }
            BridgeState::Idle | BridgeState::Validating => {}
        }
    }

    /// Append `text` to the transcript and show it right away.
    ///
    /// The text becomes part of the buffer, so later full-transcript flushes
    /// keep it.
    pub fn inject_output(&mut self, text: &str) {
        let snapshot = {
            let mut guard = lock_shared(&self.shared);
            guard.buffer.append(&self.encoding.encode(text));
            guard.buffer.drain()
        };

        match snapshot {
            Some(bytes) => self.deliver(&bytes),
            None => self.surface.go_to_end(),
        }
    }

    /// Decode a full snapshot and hand it to the surface. Runs outside the lock.
    pub(super) fn deliver(&mut self, bytes: &[u8]) {
        let text = self.encoding.decode(bytes);
        self.surface.replace_text(&text);
        self.surface.go_to_end();
    }
}
