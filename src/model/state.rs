/// Lifecycle state of the bridge's flush scheduler.
///
/// Together with the restart intent this replaces the loose
/// timer-active / stop-requested booleans: every transition happens while the
/// bridge lock is held.
///
/// ```text
/// Idle -> Validating -> Running -> Stopping -> Idle
///                          ^           |
///                          +-----------+  (restart pending)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BridgeState {
    /// Flush timer stopped. A session may outlive a hide and is revalidated
    /// on the next activation.
    #[default]
    Idle,
    /// Activation in progress: checking or spawning the session.
    Validating,
    /// Timer started; ticks drain the shared buffer.
    Running,
    /// Stop requested by hide, close or process exit. The next tick drains
    /// once more and halts the timer.
    Stopping,
}

impl BridgeState {
    /// Whether the host timer should currently be delivering ticks
    pub fn timer_active(self) -> bool {
        matches!(self, BridgeState::Running | BridgeState::Stopping)
    }

    /// Whether a stop has been requested but not yet observed by a tick
    pub fn stop_requested(self) -> bool {
        self == BridgeState::Stopping
    }

    /// State after a stop request (hide, close or exit).
    ///
    /// Only an active scheduler can be stopping; an idle bridge stays idle.
    pub fn request_stop(self) -> BridgeState {
        match self {
            BridgeState::Running | BridgeState::Validating | BridgeState::Stopping => {
                BridgeState::Stopping
            }
            BridgeState::Idle => BridgeState::Idle,
        }
    }
}

impl std::fmt::Display for BridgeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BridgeState::Idle => "idle",
            BridgeState::Validating => "validating",
            BridgeState::Running => "running",
            BridgeState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}
