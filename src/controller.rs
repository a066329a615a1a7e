//! Chat view controller: one open conversation on the shared session.
//!
//! Opening subscribes to the session before fetching history, so frames
//! that arrive during the fetch queue up and are merged after the seed.
//! Frames that belong to other conversations are reported, not merged.

use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::api::ChatApi;
use crate::frame::{ChatFrame, Inbound, OutboundFrame};
use crate::identity::PeerId;
use crate::message::Message;
use crate::reconcile::{Applied, MatchPolicy, Reconciler};
use crate::transport::{SendStatus, StatusLine, TransportSession};

/// Errors from the input box.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InputError {
    #[error("message is empty")]
    Empty,
}

/// What happened after a send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    /// Transcript index of the pending entry.
    pub index: usize,
    pub local_key: Option<String>,
    pub delivery: SendStatus,
}

/// Something the view should render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    /// The transcript changed at `index`.
    Transcript(Applied),
    /// A chat frame for a different conversation.
    Foreign(ChatFrame),
    /// Server notice (`user-offline`, send rejected, ...).
    Notice(String),
    /// The session status line changed.
    Status(StatusLine),
}

pub struct ChatViewController {
    session: TransportSession,
    peer: PeerId,
    reconciler: Reconciler,
    input: String,
    inbound: broadcast::Receiver<Inbound>,
    status: watch::Receiver<StatusLine>,
    closed: bool,
}

impl ChatViewController {
    /// Open the conversation with `peer`: subscribe, fetch history, seed.
    ///
    /// A failed history fetch is logged and leaves an empty transcript.
    pub async fn open(session: TransportSession, api: &dyn ChatApi, peer: PeerId) -> Self {
        let inbound = session.subscribe();
        let status = session.watch_status();
        let policy = if session.correlation_ids() {
            MatchPolicy::CorrelationId
        } else {
            MatchPolicy::ContentHeuristic
        };
        let mut reconciler = Reconciler::new(session.user().clone(), policy);

        match api.history(session.user(), &peer).await {
            Ok(history) => reconciler.seed(history),
            Err(e) => warn!(user_id = %session.user(), peer_id = %peer, error = %e, "controller: history fetch failed"),
        }
        info!(user_id = %session.user(), peer_id = %peer, count = reconciler.len(), "controller: conversation opened");

        let closed = *status.borrow() == StatusLine::Closed;
        Self { session, peer, reconciler, input: String::new(), inbound, status, closed }
    }

    #[must_use]
    pub fn peer(&self) -> &PeerId {
        &self.peer
    }

    #[must_use]
    pub fn transcript(&self) -> &[Message] {
        self.reconciler.transcript()
    }

    #[must_use]
    pub fn status(&self) -> StatusLine {
        self.status.borrow().clone()
    }

    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Send the input box contents.
    ///
    /// Appends a pending entry and clears the input before returning, even
    /// when the session is not connected; the entry then stays pending.
    pub fn send_current_input(&mut self) -> Result<SendReceipt, InputError> {
        if self.input.trim().is_empty() {
            return Err(InputError::Empty);
        }
        let content = std::mem::take(&mut self.input);

        let index = self.reconciler.len();
        let local_key = self.reconciler.push_local(content.clone()).local_key.clone();
        let frame = OutboundFrame {
            to: self.peer.clone(),
            content,
            from: self.session.user().clone(),
            client_id: if self.session.correlation_ids() { local_key.clone() } else { None },
        };
        let delivery = self.session.send_frame(frame);
        debug!(peer_id = %self.peer, index, ?delivery, "controller: local send");

        Ok(SendReceipt { index, local_key, delivery })
    }

    /// Merge or report one inbound frame.
    pub fn handle_inbound(&mut self, inbound: Inbound) -> ViewEvent {
        match inbound {
            Inbound::Chat(frame) if self.belongs(&frame) => {
                ViewEvent::Transcript(self.reconciler.apply_inbound(&frame))
            }
            Inbound::Chat(frame) => {
                debug!(peer_id = %self.peer, from = %frame.from, "controller: frame for another conversation");
                ViewEvent::Foreign(frame)
            }
            Inbound::System { message } | Inbound::ServerError { message } => ViewEvent::Notice(message),
        }
    }

    /// Wait for the next inbound frame or status change.
    ///
    /// After the session closes, the `Closed` status is reported once and
    /// every later call returns `None`.
    pub async fn next_event(&mut self) -> Option<ViewEvent> {
        if self.closed {
            return None;
        }
        loop {
            tokio::select! {
                received = self.inbound.recv() => match received {
                    Ok(inbound) => return Some(self.handle_inbound(inbound)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(peer_id = %self.peer, skipped, "controller: inbound lagged; frames lost");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                },
                changed = self.status.changed() => {
                    if changed.is_err() {
                        return None;
                    }
                    let status = self.status.borrow_and_update().clone();
                    self.closed = status == StatusLine::Closed;
                    return Some(ViewEvent::Status(status));
                }
            }
        }
    }

    /// A frame belongs here when the peer sent it, or when it is the local
    /// user's own message addressed to the peer (or unaddressed).
    fn belongs(&self, frame: &ChatFrame) -> bool {
        if frame.from == self.peer {
            return true;
        }
        frame.from == *self.session.user() && frame.to.as_ref().is_none_or(|to| *to == self.peer)
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
