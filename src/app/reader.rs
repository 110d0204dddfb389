//! Background reader: one thread per session, moving output into the shared
//! buffer until the process exits.

use std::io;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use super::{lock_shared, Shared};
use crate::services::encoding::TextEncoding;
use crate::services::process::{ProbePolicy, ReadStrategy, SessionId};
use crate::services::time_source::SharedTimeSource;

/// Appended to the transcript once the process is gone
pub const TERMINATION_NOTICE: &str = "\nConsole process was terminated.\n\n";

enum Liveness {
    Alive,
    Exited,
    /// The session was replaced or detached; this reader has nothing left to do
    Detached,
}

pub(crate) struct OutputReader {
    shared: Arc<Mutex<Shared>>,
    id: SessionId,
    strategy: Box<dyn ReadStrategy>,
    encoding: TextEncoding,
    time: SharedTimeSource,
}

impl OutputReader {
    pub fn new(
        shared: Arc<Mutex<Shared>>,
        id: SessionId,
        strategy: Box<dyn ReadStrategy>,
        encoding: TextEncoding,
        time: SharedTimeSource,
    ) -> Self {
        Self {
            shared,
            id,
            strategy,
            encoding,
            time,
        }
    }

    /// Run on a thread named `console-reader-<id>`
    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(format!("console-reader-{}", self.id))
            .spawn(move || self.run())
    }

    fn run(mut self) {
        tracing::debug!("Reader for session {} started", self.id);
        let policy = self.strategy.probe_policy();

        loop {
            let mut chunk = Vec::new();
            let read = match self.strategy.read_chunk(&mut chunk) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::debug!("Read error on session {}: {}", self.id, e);
                    0
                }
            };

            if read > 0 && !self.append(&chunk) {
                break;
            }

            let probe = match policy {
                ProbePolicy::OnEmptyRead => read == 0,
                ProbePolicy::EveryIteration => true,
            };
            if probe {
                match self.probe() {
                    Liveness::Alive => {}
                    Liveness::Exited => {
                        if policy == ProbePolicy::EveryIteration {
                            self.drain_pending();
                        }
                        self.finish();
                        break;
                    }
                    Liveness::Detached => break,
                }
            }

            if read == 0 || policy == ProbePolicy::EveryIteration {
                self.time.sleep(self.strategy.idle_delay());
            }
        }

        tracing::debug!("Reader for session {} stopped", self.id);
    }

    /// Append under the lock; false once this reader's session is no longer current
    fn append(&self, chunk: &[u8]) -> bool {
        let mut guard = lock_shared(&self.shared);
        if !guard.is_current(self.id) {
            return false;
        }
        tracing::trace!("Session {}: {} bytes", self.id, chunk.len());
        guard.buffer.append(chunk);
        true
    }

    fn probe(&self) -> Liveness {
        let mut guard = lock_shared(&self.shared);
        match guard.session.as_mut() {
            Some(session) if session.id() == self.id => {
                if session.is_alive() {
                    Liveness::Alive
                } else {
                    Liveness::Exited
                }
            }
            _ => Liveness::Detached,
        }
    }

    /// Output still sitting in the pipe after the process exited
    fn drain_pending(&mut self) {
        loop {
            let mut chunk = Vec::new();
            match self.strategy.read_chunk(&mut chunk) {
                Ok(0) => break,
                Ok(_) => {
                    if !self.append(&chunk) {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
    }

    /// Record the exit: notice, session cleared and scheduler told to stop,
    /// all in one critical section.
    fn finish(&self) {
        let mut guard = lock_shared(&self.shared);
        if !guard.is_current(self.id) {
            return;
        }
        guard
            .buffer
            .append(&self.encoding.encode(TERMINATION_NOTICE));
        if let Some(session) = guard.session.take() {
            session.release();
        }
        guard.state = guard.state.request_stop();
        tracing::info!(
            "Console process for session {} exited, bridge now {}",
            self.id,
            guard.state
        );
    }
}
