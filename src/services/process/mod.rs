//! Shell process sessions.
//!
//! A [`Session`] is one child shell with a piped stdin and a single output pipe
//! shared by its stdout and stderr. Spawning hands back the read end of that
//! pipe wrapped in the session's [`ReadStrategy`]; the bridge moves it onto a
//! reader thread and keeps the session itself behind its lock.

pub mod env;
pub mod strategy;

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::time::Duration;

pub use strategy::{IoMode, ProbePolicy, ReadStrategy};

use crate::services::encoding::TextEncoding;

/// Generation number distinguishing a session from its replacements
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u64);

impl SessionId {
    pub fn next(self) -> SessionId {
        SessionId(self.0 + 1)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Failed to start console process '{shell}': {source}")]
    SpawnFailed {
        shell: String,
        #[source]
        source: io::Error,
    },

    #[error("Console process input stream is closed: {0}")]
    StreamClosed(#[source] io::Error),
}

/// Everything needed to launch a shell
#[derive(Debug, Clone)]
pub struct SpawnSpec {
    /// Shell executable; `$VAR` style placeholders are expanded at spawn time
    pub shell: String,
    pub args: Vec<String>,
    /// Appended to the inherited PATH of the child only
    pub extra_path: String,
    pub env: BTreeMap<String, String>,
    pub cwd: Option<PathBuf>,
    pub io_mode: IoMode,
    /// Reader pause between empty reads
    pub poll_interval: Duration,
}

impl SpawnSpec {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            args: Vec::new(),
            extra_path: String::new(),
            env: BTreeMap::new(),
            cwd: None,
            io_mode: IoMode::detect(),
            poll_interval: Duration::from_millis(20),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_io_mode(mut self, io_mode: IoMode) -> Self {
        self.io_mode = io_mode;
        self
    }
}

/// A freshly started session and the reader for its output pipe
pub struct SpawnedSession {
    pub session: Session,
    pub reader: Box<dyn ReadStrategy>,
}

/// One live child shell
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    shell: String,
    child: Child,
    /// `None` once a write has failed
    stdin: Option<ChildStdin>,
    io_mode: IoMode,
}

impl Session {
    /// Launch the shell described by `spec`.
    pub fn spawn(id: SessionId, spec: &SpawnSpec) -> Result<SpawnedSession, SessionError> {
        let shell = env::expand_env_vars(&spec.shell);
        let spawn_failed = |source: io::Error| SessionError::SpawnFailed {
            shell: shell.clone(),
            source,
        };

        let (output_reader, output_writer) = io::pipe().map_err(spawn_failed)?;
        let error_writer = output_writer.try_clone().map_err(spawn_failed)?;

        let mut command = Command::new(&shell);
        command
            .args(&spec.args)
            .envs(&spec.env)
            .stdin(Stdio::piped())
            .stdout(output_writer)
            .stderr(error_writer);

        let inherited_path = std::env::var("PATH").ok();
        if let Some(path) = env::augmented_path(inherited_path.as_deref(), &spec.extra_path) {
            command.env("PATH", path);
        }

        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            command.creation_flags(windows_sys::Win32::System::Threading::CREATE_NO_WINDOW);
        }

        let mut child = command.spawn().map_err(spawn_failed)?;
        // Release our copies of the write end so the reader sees end of stream
        // once the child exits.
        drop(command);

        let stdin = child.stdin.take();
        tracing::info!(
            "Started console process {} (session {}, pid {}, {})",
            shell,
            id,
            child.id(),
            spec.io_mode
        );

        let session = Session {
            id,
            shell,
            child,
            stdin,
            io_mode: spec.io_mode,
        };
        let reader = spec.io_mode.strategy(output_reader, spec.poll_interval);
        Ok(SpawnedSession { session, reader })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn io_mode(&self) -> IoMode {
        self.io_mode
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }

    /// Whether the input stream is still usable
    pub fn has_input(&self) -> bool {
        self.stdin.is_some()
    }

    /// Write `line` plus a newline to the shell's input.
    ///
    /// A failed write drops the input stream; later writes fail immediately.
    pub fn write_line(&mut self, line: &str, encoding: TextEncoding) -> Result<(), SessionError> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(SessionError::StreamClosed(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "input stream already closed",
            )));
        };

        let mut bytes = encoding.encode(line).into_owned();
        bytes.extend_from_slice(&encoding.encode("\n"));

        let result = stdin.write_all(&bytes).and_then(|()| stdin.flush());
        if let Err(e) = result {
            self.stdin = None;
            return Err(SessionError::StreamClosed(e));
        }
        Ok(())
    }

    /// Ask the process to exit. Failures are logged and ignored.
    #[cfg(unix)]
    pub fn terminate(&mut self) {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Ok(Some(status)) = self.child.try_wait() {
            tracing::debug!("Session {} already exited ({}), not signalling", self.id, status);
            return;
        }

        let pid = Pid::from_raw(self.child.id() as i32);
        match kill(pid, Signal::SIGTERM) {
            Ok(()) => tracing::debug!("Sent SIGTERM to session {} (pid {})", self.id, pid),
            Err(e) => tracing::debug!("Failed to signal session {} (pid {}): {}", self.id, pid, e),
        }
    }

    /// Ask the process to exit. Failures are logged and ignored.
    #[cfg(not(unix))]
    pub fn terminate(&mut self) {
        match self.child.kill() {
            Ok(()) => tracing::debug!("Terminated session {} (pid {})", self.id, self.pid()),
            Err(e) => tracing::debug!("Failed to terminate session {}: {}", self.id, e),
        }
    }

    /// Block until the process exits
    pub fn wait(&mut self) {
        match self.child.wait() {
            Ok(status) => tracing::debug!("Session {} exited with {}", self.id, status),
            Err(e) => tracing::debug!("Waiting for session {} failed: {}", self.id, e),
        }
    }

    /// Non-blocking liveness probe; a failed probe counts as exited
    pub fn is_alive(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                tracing::debug!("Session {} probe: exited with {}", self.id, status);
                false
            }
            Err(e) => {
                tracing::debug!("Session {} probe failed: {}", self.id, e);
                false
            }
        }
    }

    /// Terminate a session the bridge no longer tracks.
    ///
    /// A process that has not exited yet is handed to a waiter thread so it
    /// is reaped once it does.
    pub fn release(mut self) {
        self.stdin = None;
        self.terminate();
        if !self.is_alive() {
            return;
        }

        let id = self.id;
        let mut child = self.child;
        let spawned = std::thread::Builder::new()
            .name(format!("console-reaper-{id}"))
            .spawn(move || match child.wait() {
                Ok(status) => tracing::debug!("Released session {} exited with {}", id, status),
                Err(e) => tracing::debug!("Waiting for released session {} failed: {}", id, e),
            });
        if let Err(e) = spawned {
            tracing::warn!("Could not start waiter for session {}: {}", id, e);
        }
    }
}
