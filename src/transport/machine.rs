//! Session state machine.
//!
//! DESIGN
//! ======
//! `handle` is pure: it maps `(state, event)` to a [`Transition`] carrying the
//! new state, an optional status-line update, and an optional [`Action`] for
//! the driver. The driver owns every side effect.
//!
//! ```text
//! Connecting --Opened--------------> Open
//! Connecting --ConnectFailed/Errored-> Reconnecting  (ScheduleReconnect)
//! Open       --Errored/ClosedByRemote-> Reconnecting  (ScheduleReconnect)
//! Reconnecting --TimerFired--------> Connecting      (Connect)
//! *          --CloseRequested------> Closed          (Release)
//! ```
//!
//! At most one reconnect timer is outstanding: failures reported while a
//! timer is already pending update the status line and nothing else.

use std::fmt;

/// Lifecycle of the live channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Reconnecting,
    Closed,
}

/// Inputs reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Handshake completed.
    Opened,
    /// The connect attempt failed before the handshake completed.
    ConnectFailed,
    /// The open channel failed (I/O error).
    Errored,
    /// The remote side closed the channel.
    ClosedByRemote,
    /// The reconnect delay elapsed.
    TimerFired,
    /// Local teardown: explicit close, handle drop, or identity change.
    CloseRequested,
}

/// Side effects the driver must perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Start a connect attempt now.
    Connect,
    /// Arm the reconnect timer.
    ScheduleReconnect,
    /// Release the channel and stop.
    Release,
}

/// Text shown in the chat header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusLine {
    Connecting,
    Connected,
    DisconnectedRetrying,
    ConnectionError,
    NotConnected,
    Closed,
    /// No identity: the chat surface is inert.
    Unavailable,
    /// Server status notice (`connected`, `user-offline`, ...).
    Notice(String),
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => f.write_str("Connecting"),
            Self::Connected => f.write_str("Connected"),
            Self::DisconnectedRetrying => f.write_str("Disconnected — retrying"),
            Self::ConnectionError => f.write_str("Connection error"),
            Self::NotConnected => f.write_str("Not connected"),
            Self::Closed => f.write_str("Closed"),
            Self::Unavailable => f.write_str("Chat not available"),
            Self::Notice(message) => f.write_str(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: SessionState,
    pub status: Option<StatusLine>,
    pub action: Option<Action>,
}

#[derive(Debug, Clone)]
pub struct SessionMachine {
    state: SessionState,
    reconnect_pending: bool,
}

impl SessionMachine {
    /// A machine for a session that is about to make its first attempt.
    #[must_use]
    pub fn new() -> Self {
        Self { state: SessionState::Connecting, reconnect_pending: false }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// `true` while a reconnect timer is armed and has not fired.
    #[must_use]
    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    pub fn handle(&mut self, event: SessionEvent) -> Transition {
        use SessionEvent as E;
        use SessionState as S;

        match (self.state, event) {
            (S::Closed, _) => self.stay(None),

            (_, E::CloseRequested) => {
                self.reconnect_pending = false;
                self.go(S::Closed, Some(StatusLine::Closed), Some(Action::Release))
            }

            (S::Connecting, E::Opened) => self.go(S::Open, Some(StatusLine::Connected), None),

            (S::Connecting | S::Open | S::Reconnecting, E::ConnectFailed | E::Errored) => {
                self.fail(StatusLine::ConnectionError)
            }
            (S::Connecting | S::Open | S::Reconnecting, E::ClosedByRemote) => {
                self.fail(StatusLine::DisconnectedRetrying)
            }

            (S::Reconnecting, E::TimerFired) if self.reconnect_pending => {
                self.reconnect_pending = false;
                self.go(S::Connecting, Some(StatusLine::Connecting), Some(Action::Connect))
            }

            // Stale timer or duplicate open report.
            (_, E::TimerFired | E::Opened) => self.stay(None),
        }
    }

    fn fail(&mut self, status: StatusLine) -> Transition {
        if self.reconnect_pending {
            return self.stay(Some(status));
        }
        self.reconnect_pending = true;
        self.go(SessionState::Reconnecting, Some(status), Some(Action::ScheduleReconnect))
    }

    fn go(&mut self, state: SessionState, status: Option<StatusLine>, action: Option<Action>) -> Transition {
        self.state = state;
        Transition { state, status, action }
    }

    fn stay(&self, status: Option<StatusLine>) -> Transition {
        Transition { state: self.state, status, action: None }
    }
}

impl Default for SessionMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "machine_test.rs"]
mod tests;
