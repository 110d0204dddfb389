//! Activation, stopping, restart and teardown.

use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::Duration;

use super::reader::OutputReader;
use super::{lock_shared, Bridge, SessionLauncher, Shared};
use crate::model::state::BridgeState;
use crate::services::process::{Session, SessionError, SpawnedSession};

/// Pause after teardown so the process can release its resources
pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

impl SessionLauncher {
    /// Make sure a usable session exists, spawning one if needed.
    ///
    /// Returns whether a new session was spawned. A session whose input
    /// stream failed is released first. Its reader notices the replacement
    /// and stops without touching the new session.
    pub(super) fn ensure_session(
        &mut self,
        shared: &Arc<Mutex<Shared>>,
        guard: &mut Shared,
    ) -> Result<bool, SessionError> {
        if guard.has_usable_session() {
            return Ok(false);
        }

        if let Some(stale) = guard.session.take() {
            tracing::info!(
                "Session {} lost its input stream, replacing it",
                stale.id()
            );
            stale.release();
        }

        let id = self.last_id.next();
        self.last_id = id;
        let SpawnedSession { session, reader } = Session::spawn(id, &self.spec)?;

        let output_reader = OutputReader::new(
            Arc::clone(shared),
            id,
            reader,
            self.encoding,
            self.time.clone(),
        );
        if let Err(source) = output_reader.spawn() {
            let shell = session.shell().to_string();
            session.release();
            return Err(SessionError::SpawnFailed { shell, source });
        }

        guard.session = Some(session);
        Ok(true)
    }
}

impl Bridge {
    /// Become visible: validate the session and start the flush timer.
    ///
    /// Skipped, returning `false`, when the lock is momentarily held by the
    /// reader. Activating a running bridge only revalidates the session.
    pub fn activate(&mut self) -> bool {
        let shared = Arc::clone(&self.shared);
        let guard = match shared.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                tracing::debug!("Bridge busy, skipping activation");
                return false;
            }
        };
        self.activate_with(guard);
        true
    }

    /// Activation that waits for the lock; used for restarts and resubmits
    pub(super) fn activate_blocking(&mut self) {
        let shared = Arc::clone(&self.shared);
        let guard = lock_shared(&shared);
        self.activate_with(guard);
    }

    fn activate_with(&mut self, mut guard: MutexGuard<'_, Shared>) {
        let previous = guard.state;
        guard.state = BridgeState::Validating;

        // A pending restart survives activation until a new process exists;
        // a session that is still dying is consumed by the stopping tick.
        match self.launcher.ensure_session(&self.shared, &mut guard) {
            Ok(spawned) => {
                if spawned {
                    guard.restart_pending = false;
                }
            }
            Err(e) => {
                tracing::error!("{}", e);
                guard.buffer.append(&self.encoding.encode(&format!("{e}\n")));
                guard.restart_pending = false;
            }
        }

        guard.state = BridgeState::Running;
        drop(guard);

        if !previous.timer_active() {
            self.timer.start(self.tick_period);
            tracing::debug!("Flush timer started ({:?})", self.tick_period);
        }
    }

    /// Stop flushing without touching the process. The session survives and
    /// is revalidated on the next activation.
    pub fn hide(&mut self) {
        let mut guard = lock_shared(&self.shared);
        guard.state = guard.state.request_stop();
        tracing::debug!("Bridge hidden, now {}", guard.state);
    }

    /// Hide and ask the host to close the view
    pub fn close(&mut self) {
        self.hide();
        self.view.close_view();
    }

    /// Terminate the running process, optionally starting a new one once it
    /// has exited.
    ///
    /// In poll-seek mode this blocks until the process is gone. The restart
    /// itself happens on the tick that observes the exit.
    pub fn break_session(&mut self, restart: bool) {
        let mut guard = lock_shared(&self.shared);
        if restart {
            guard.restart_pending = true;
        }

        if let Some(session) = guard.session.as_mut() {
            tracing::info!("Breaking session {} (restart: {})", session.id(), restart);
            session.terminate();
            if session.io_mode().requires_wait_after_terminate() {
                session.wait();
            }
            return;
        }
        drop(guard);

        if restart {
            // No exit will ever be observed; restart right away
            self.activate_blocking();
        }
    }

    /// Tear the session down, delivering everything it printed.
    ///
    /// Waits for the reader to record the exit, bounded by the configured
    /// shutdown timeout, then flushes and sleeps a short grace period.
    pub fn shutdown(&mut self) {
        let (was_active, had_session) = {
            let mut guard = lock_shared(&self.shared);
            let was_active = guard.state.timer_active();
            guard.state = BridgeState::Idle;
            guard.restart_pending = false;

            let had_session = guard.session.is_some();
            if let Some(session) = guard.session.as_mut() {
                tracing::info!("Shutting down session {}", session.id());
                session.terminate();
                if session.io_mode().requires_wait_after_terminate() {
                    session.wait();
                }
            }
            (was_active, had_session)
        };

        if was_active {
            self.timer.stop();
        }
        if !had_session {
            return;
        }

        let started = self.time.now();
        loop {
            let (session_gone, snapshot) = {
                let mut guard = lock_shared(&self.shared);
                (guard.session.is_none(), guard.buffer.drain())
            };
            if let Some(bytes) = snapshot {
                self.deliver(&bytes);
            }
            if session_gone {
                break;
            }
            if self.time.elapsed_since(started) >= self.shutdown_timeout {
                tracing::warn!(
                    "Console process did not exit within {:?}, detaching it",
                    self.shutdown_timeout
                );
                let detached = lock_shared(&self.shared).session.take();
                if let Some(session) = detached {
                    session.release();
                }
                break;
            }
            self.time.sleep(self.debounce);
        }

        self.time.sleep(SHUTDOWN_GRACE);
    }
}
