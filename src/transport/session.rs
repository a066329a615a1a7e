//! Transport session: handle plus driver task.
//!
//! DESIGN
//! ======
//! `TransportSession::open` spawns one driver task per session. The driver
//! owns the channel and the [`SessionMachine`]; the handle talks to it over
//! an unbounded command queue and observes it through `watch` channels
//! (state, status line) and a `broadcast` channel (parsed inbound frames).
//!
//! The reconnect timer is a single pinned `sleep` inside the driver, armed
//! only when the machine emits `ScheduleReconnect`. Dropping the last handle
//! aborts the driver, which drops the channel and any pending timer.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::machine::{Action, SessionEvent, SessionMachine, SessionState, StatusLine};
use super::{Channel, ChannelEvent, Connector};
use crate::config::ChatConfig;
use crate::frame::{Inbound, OutboundFrame, parse_inbound};
use crate::identity::{LocalUserId, PeerId};

/// Knobs for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub reconnect_delay: Duration,
    pub event_capacity: usize,
    /// Tag outbound frames with `clientId`.
    pub correlation_ids: bool,
}

impl From<&ChatConfig> for SessionOptions {
    fn from(config: &ChatConfig) -> Self {
        Self {
            reconnect_delay: config.reconnect_delay,
            event_capacity: config.event_capacity,
            correlation_ids: config.correlation_ids,
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&ChatConfig::default())
    }
}

/// Result of a send request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// Queued on an open channel.
    Sent,
    /// Dropped: the channel is not open.
    NotConnected,
}

enum Command {
    Send(OutboundFrame),
    Close,
}

/// Cloneable handle to one live session.
#[derive(Clone)]
pub struct TransportSession {
    shared: Arc<Shared>,
}

struct Shared {
    user: LocalUserId,
    options: SessionOptions,
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<SessionState>,
    status: Arc<watch::Sender<StatusLine>>,
    events: broadcast::Sender<Inbound>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Ok(mut driver) = self.driver.lock() {
            if let Some(task) = driver.take() {
                task.abort();
            }
        }
    }
}

impl TransportSession {
    /// Start a session for `user`. Must be called inside a tokio runtime.
    ///
    /// The first connect attempt starts immediately; the returned handle is
    /// in `Connecting`.
    #[must_use]
    pub fn open(user: LocalUserId, connector: Arc<dyn Connector>, options: SessionOptions) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionState::Connecting);
        let status = Arc::new(watch::channel(StatusLine::Connecting).0);
        let (events, _) = broadcast::channel(options.event_capacity.max(1));

        let driver = Driver {
            user: user.clone(),
            connector,
            reconnect_delay: options.reconnect_delay,
            machine: SessionMachine::new(),
            commands: commands_rx,
            state: state_tx,
            status: Arc::clone(&status),
            events: events.clone(),
        };
        info!(user_id = %user, "session: opening");
        let task = tokio::spawn(driver.run());

        Self {
            shared: Arc::new(Shared {
                user,
                options,
                commands: commands_tx,
                state: state_rx,
                status,
                events,
                driver: Mutex::new(Some(task)),
            }),
        }
    }

    #[must_use]
    pub fn user(&self) -> &LocalUserId {
        &self.shared.user
    }

    #[must_use]
    pub fn correlation_ids(&self) -> bool {
        self.shared.options.correlation_ids
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.shared.state.borrow()
    }

    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.shared.state.clone()
    }

    #[must_use]
    pub fn status(&self) -> StatusLine {
        self.shared.status.borrow().clone()
    }

    #[must_use]
    pub fn watch_status(&self) -> watch::Receiver<StatusLine> {
        self.shared.status.subscribe()
    }

    /// Subscribe to parsed inbound frames, in arrival order.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Inbound> {
        self.shared.events.subscribe()
    }

    /// Spawn a task that calls `handler` for every inbound frame until the
    /// session closes. Abort the returned handle to unregister early.
    pub fn on_message<F>(&self, handler: F) -> JoinHandle<()>
    where
        F: Fn(Inbound) + Send + 'static,
    {
        let mut events = self.subscribe();
        let mut state = self.watch_state();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    received = events.recv() => match received {
                        Ok(inbound) => handler(inbound),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "session: message handler lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    closed = wait_closed(&mut state) => {
                        if !closed {
                            debug!("session: driver gone; stopping message handler");
                        }
                        break;
                    }
                }
            }
        })
    }

    /// Send a chat message to `peer` as this session's user.
    pub fn send(&self, peer: &PeerId, content: &str) -> SendStatus {
        self.send_frame(OutboundFrame {
            to: peer.clone(),
            content: content.to_owned(),
            from: self.shared.user.clone(),
            client_id: None,
        })
    }

    /// Send a prepared frame. Only an `Open` session transmits; otherwise the
    /// frame is dropped and the status line reads "Not connected".
    pub fn send_frame(&self, frame: OutboundFrame) -> SendStatus {
        if self.state() != SessionState::Open {
            warn!(user_id = %self.shared.user, to = %frame.to, "session: send while not connected; dropped");
            self.shared.status.send_replace(StatusLine::NotConnected);
            return SendStatus::NotConnected;
        }
        if self.shared.commands.send(Command::Send(frame)).is_err() {
            self.shared.status.send_replace(StatusLine::NotConnected);
            return SendStatus::NotConnected;
        }
        SendStatus::Sent
    }

    /// Close the session and wait for the driver to release the channel.
    /// Idempotent; later sends report `NotConnected`.
    pub async fn close(&self) {
        if self.shared.commands.send(Command::Close).is_err() {
            debug!(user_id = %self.shared.user, "session: driver already stopped");
        }
        let task = match self.shared.driver.lock() {
            Ok(mut driver) => driver.take(),
            Err(_) => None,
        };
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "session: driver task failed");
            }
        }
    }
}

/// `true` once the session reaches `Closed`; `false` if the driver vanished.
async fn wait_closed(state: &mut watch::Receiver<SessionState>) -> bool {
    state.wait_for(|s| *s == SessionState::Closed).await.is_ok()
}

// =============================================================================
// DRIVER
// =============================================================================

struct Driver {
    user: LocalUserId,
    connector: Arc<dyn Connector>,
    reconnect_delay: Duration,
    machine: SessionMachine,
    commands: mpsc::UnboundedReceiver<Command>,
    state: watch::Sender<SessionState>,
    status: Arc<watch::Sender<StatusLine>>,
    events: broadcast::Sender<Inbound>,
}

impl Driver {
    async fn run(mut self) {
        let mut next = Some(Action::Connect);
        while let Some(action) = next {
            next = match action {
                Action::Connect => self.connect_and_pump().await,
                Action::ScheduleReconnect => self.wait_for_retry().await,
                Action::Release => None,
            };
        }
        if self.machine.state() != SessionState::Closed {
            self.apply(SessionEvent::CloseRequested);
        }
        info!(user_id = %self.user, "session: closed");
    }

    /// One connect attempt, then pump the channel until it ends.
    async fn connect_and_pump(&mut self) -> Option<Action> {
        let connector = Arc::clone(&self.connector);
        let user = self.user.clone();
        let attempt = async move { connector.connect(&user).await };
        tokio::pin!(attempt);

        let channel = loop {
            tokio::select! {
                result = &mut attempt => match result {
                    Ok(channel) => break channel,
                    Err(e) => {
                        warn!(user_id = %self.user, error = %e, "session: connect failed");
                        return self.apply(SessionEvent::ConnectFailed);
                    }
                },
                command = self.commands.recv() => match command {
                    Some(Command::Send(frame)) => self.drop_frame(&frame),
                    Some(Command::Close) | None => return self.apply(SessionEvent::CloseRequested),
                },
            }
        };

        info!(user_id = %self.user, "session: connected");
        self.apply(SessionEvent::Opened);
        self.pump(channel).await
    }

    async fn pump(&mut self, mut channel: Box<dyn Channel>) -> Option<Action> {
        loop {
            tokio::select! {
                event = channel.recv() => match event {
                    Ok(ChannelEvent::Text(text)) => self.dispatch(&text),
                    Ok(ChannelEvent::Closed { code, reason }) => {
                        info!(user_id = %self.user, ?code, %reason, "session: closed by remote");
                        return self.apply(SessionEvent::ClosedByRemote);
                    }
                    Err(e) => {
                        warn!(user_id = %self.user, error = %e, "session: channel error");
                        return self.apply(SessionEvent::Errored);
                    }
                },
                command = self.commands.recv() => match command {
                    Some(Command::Send(frame)) => {
                        let text = match frame.to_text() {
                            Ok(text) => text,
                            Err(e) => {
                                warn!(error = %e, "session: frame encode failed");
                                continue;
                            }
                        };
                        if let Err(e) = channel.send_text(text).await {
                            warn!(user_id = %self.user, error = %e, "session: send failed");
                            return self.apply(SessionEvent::Errored);
                        }
                        debug!(to = %frame.to, "session: frame sent");
                    }
                    Some(Command::Close) | None => {
                        channel.close().await;
                        return self.apply(SessionEvent::CloseRequested);
                    }
                },
            }
        }
    }

    /// Hold the single reconnect timer. Sends are dropped meanwhile; a close
    /// cancels the timer.
    async fn wait_for_retry(&mut self) -> Option<Action> {
        info!(user_id = %self.user, delay = ?self.reconnect_delay, "session: reconnect scheduled");
        let timer = tokio::time::sleep(self.reconnect_delay);
        tokio::pin!(timer);

        loop {
            tokio::select! {
                () = &mut timer => return self.apply(SessionEvent::TimerFired),
                command = self.commands.recv() => match command {
                    Some(Command::Send(frame)) => self.drop_frame(&frame),
                    Some(Command::Close) | None => return self.apply(SessionEvent::CloseRequested),
                },
            }
        }
    }

    fn dispatch(&mut self, text: &str) {
        let inbound = match parse_inbound(text) {
            Ok(inbound) => inbound,
            Err(e) => {
                warn!(user_id = %self.user, error = %e, "session: dropping malformed frame");
                return;
            }
        };

        match &inbound {
            Inbound::System { message } => {
                debug!(%message, "session: status notice");
                self.status.send_replace(StatusLine::Notice(message.clone()));
            }
            Inbound::ServerError { message } => {
                warn!(%message, "session: server rejected a frame");
                self.status.send_replace(StatusLine::Notice(message.clone()));
            }
            Inbound::Chat(_) => {}
        }

        if self.events.send(inbound).is_err() {
            debug!("session: no subscribers for inbound frame");
        }
    }

    fn drop_frame(&self, frame: &OutboundFrame) {
        warn!(user_id = %self.user, to = %frame.to, "session: channel not open; frame dropped");
        self.status.send_replace(StatusLine::NotConnected);
    }

    fn apply(&mut self, event: SessionEvent) -> Option<Action> {
        let transition = self.machine.handle(event);
        debug!(?event, state = ?transition.state, action = ?transition.action, "session: transition");
        if let Some(status) = transition.status {
            self.status.send_replace(status);
        }
        self.state.send_if_modified(|state| {
            let changed = *state != transition.state;
            *state = transition.state;
            changed
        });
        transition.action
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
