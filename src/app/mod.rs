//! The console bridge.
//!
//! [`Bridge`] owns one shell session at a time, a reader thread draining its
//! output, and the flush cadence that hands the transcript to the host's
//! [`Surface`]. The implementation is split across files by concern:
//!
//! - `reader`: background thread per session
//! - `flush`: the periodic tick and manual output injection
//! - `lifecycle`: activation, hide/close, break and shutdown
//! - `dispatch`: turning submitted text into writes to the shell

mod dispatch;
mod flush;
mod lifecycle;
mod reader;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub use dispatch::{CommandPlan, DispatchRules, Platform};
pub use reader::TERMINATION_NOTICE;

use regex::Regex;

use crate::config::{BridgeConfig, ConfigError};
use crate::host::{FlushTimer, HistoryMenu, Surface, ViewControl};
use crate::model::history::CommandHistory;
use crate::model::shared_buffer::SharedBuffer;
use crate::model::state::BridgeState;
use crate::services::encoding::TextEncoding;
use crate::services::process::{Session, SessionId, SpawnSpec};
use crate::services::time_source::{RealTimeSource, SharedTimeSource};

/// Everything the reader thread and the control thread both touch
#[derive(Debug, Default)]
pub(crate) struct Shared {
    pub buffer: SharedBuffer,
    pub state: BridgeState,
    pub restart_pending: bool,
    pub session: Option<Session>,
}

impl Shared {
    /// Whether `id` names the live session
    pub fn is_current(&self, id: SessionId) -> bool {
        self.session.as_ref().map(Session::id) == Some(id)
    }

    /// Live session whose input stream still works
    pub fn has_usable_session(&self) -> bool {
        self.session.as_ref().is_some_and(Session::has_input)
    }
}

/// Lock the shared state, recovering from a poisoned lock.
///
/// Every critical section is a handful of field updates, so the data behind a
/// poisoned lock is still consistent.
pub(crate) fn lock_shared(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The host-side collaborators a bridge talks to
pub struct BridgeHost {
    pub surface: Box<dyn Surface>,
    pub view: Box<dyn ViewControl>,
    pub timer: Box<dyn FlushTimer>,
}

/// Spawns sessions and their reader threads
pub(crate) struct SessionLauncher {
    spec: SpawnSpec,
    encoding: TextEncoding,
    time: SharedTimeSource,
    last_id: SessionId,
}

pub struct Bridge {
    shared: Arc<Mutex<Shared>>,
    launcher: SessionLauncher,
    encoding: TextEncoding,
    history: CommandHistory,
    close_keywords: Vec<String>,
    password_prompt: Regex,
    add_prompt: bool,
    platform: Platform,
    tick_period: Duration,
    debounce: Duration,
    shutdown_timeout: Duration,
    time: SharedTimeSource,
    surface: Box<dyn Surface>,
    view: Box<dyn ViewControl>,
    timer: Box<dyn FlushTimer>,
}

impl Bridge {
    /// Create a bridge. No process is started until the first activation.
    pub fn new(config: &BridgeConfig, host: BridgeHost) -> Result<Self, ConfigError> {
        config.validate()?;
        let encoding = config.text_encoding()?;
        let password_prompt = config.password_prompt_regex()?;
        let time = RealTimeSource::shared();

        let BridgeHost {
            mut surface,
            view,
            timer,
        } = host;
        surface.apply_options(&config.surface_options());

        tracing::debug!(
            "Creating console bridge: shell={} encoding={} tick={}ms",
            config.shell_path,
            encoding.name(),
            config.tick_ms
        );

        Ok(Self {
            shared: Arc::new(Mutex::new(Shared::default())),
            launcher: SessionLauncher {
                spec: config.spawn_spec(),
                encoding,
                time: time.clone(),
                last_id: SessionId(0),
            },
            encoding,
            history: CommandHistory::new(),
            close_keywords: config.close_keywords(),
            password_prompt,
            add_prompt: config.add_prompt,
            platform: Platform::current(),
            tick_period: config.tick_period(),
            debounce: config.debounce(),
            shutdown_timeout: config.shutdown_timeout(),
            time,
            surface,
            view,
            timer,
        })
    }

    /// Replace the clock used for every delay, including the reader's
    pub fn with_time_source(mut self, time: SharedTimeSource) -> Self {
        self.launcher.time = time.clone();
        self.time = time;
        self
    }

    pub fn status(&self) -> BridgeState {
        lock_shared(&self.shared).state
    }

    pub fn has_session(&self) -> bool {
        lock_shared(&self.shared).session.is_some()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        lock_shared(&self.shared).session.as_ref().map(Session::id)
    }

    pub fn session_pid(&self) -> Option<u32> {
        lock_shared(&self.shared).session.as_ref().map(Session::pid)
    }

    pub fn restart_pending(&self) -> bool {
        lock_shared(&self.shared).restart_pending
    }

    /// Decoded text of everything captured so far, delivered or not
    pub fn transcript(&self) -> String {
        let guard = lock_shared(&self.shared);
        self.encoding.decode(guard.buffer.as_bytes()).into_owned()
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    /// Populate `menu` with submitted commands, most recent first
    pub fn show_history(&self, menu: &mut dyn HistoryMenu) {
        menu.show(&self.history.display_order());
    }

    pub fn tick_period(&self) -> Duration {
        self.tick_period
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        let live = lock_shared(&self.shared).session.take();
        if let Some(session) = live {
            tracing::debug!("Bridge dropped with live session {}, releasing", session.id());
            session.release();
        }
    }
}
