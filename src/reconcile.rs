//! Message reconciler — one ordered transcript from three write sources.
//!
//! DESIGN
//! ======
//! 1. `seed` loads the history fetch (all entries confirmed).
//! 2. `push_local` appends an optimistic pending entry.
//! 3. `apply_inbound` replaces the OLDEST pending entry with the same
//!    `(from, content)` in place, or appends when none matches.
//!
//! Order is array order. Entries are only ever appended, except for the
//! in-place pending → confirmed swap; nothing is resorted by timestamp, so
//! out-of-order delivery stays in arrival order.
//!
//! LIMITATIONS
//! ===========
//! Matching by `(from, content)` cannot tell two identical concurrent sends
//! apart; each confirmation consumes the oldest still-pending twin. With
//! [`MatchPolicy::CorrelationId`] a confirmation that echoes `clientId`
//! matches its exact entry, and un-tagged frames fall back to the heuristic.
//!
//! Feeding the same confirmation twice replaces once and then appends, since
//! no pending match remains for the second copy.

use tracing::debug;

use crate::frame::ChatFrame;
use crate::identity::LocalUserId;
use crate::message::Message;

/// How inbound confirmations are matched to pending entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPolicy {
    /// First pending entry with equal `from` and `content`.
    #[default]
    ContentHeuristic,
    /// Exact `clientId` echo first, then the content heuristic.
    CorrelationId,
}

/// What `apply_inbound` did to the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// A pending entry at `index` was confirmed in place.
    Confirmed { index: usize },
    /// A new entry was appended at `index`.
    Appended { index: usize },
}

impl Applied {
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Confirmed { index } | Self::Appended { index } => index,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    local: LocalUserId,
    policy: MatchPolicy,
    entries: Vec<Message>,
}

impl Reconciler {
    #[must_use]
    pub fn new(local: LocalUserId, policy: MatchPolicy) -> Self {
        Self { local, policy, entries: Vec::new() }
    }

    /// Replace the transcript with a history fetch result.
    pub fn seed(&mut self, history: Vec<Message>) {
        self.entries = history
            .into_iter()
            .map(|mut msg| {
                msg.pending = false;
                msg
            })
            .collect();
        debug!(count = self.entries.len(), "reconciler: seeded");
    }

    /// Append an optimistic entry for a local send and return it.
    pub fn push_local(&mut self, content: impl Into<String>) -> &Message {
        let index = self.entries.len();
        self.entries.push(Message::pending(self.local.clone(), content));
        &self.entries[index]
    }

    /// Merge one live chat frame into the transcript.
    pub fn apply_inbound(&mut self, frame: &ChatFrame) -> Applied {
        let Some(index) = self.find_pending(frame) else {
            let index = self.entries.len();
            self.entries.push(Message::from_frame(frame));
            return Applied::Appended { index };
        };

        let entry = &mut self.entries[index];
        entry.id = frame.id.clone();
        entry.from = frame.from.clone();
        entry.content = frame.content.clone();
        if frame.sent_at.is_some() {
            entry.sent_at = frame.sent_at.clone();
        }
        entry.pending = false;
        debug!(index, id = ?entry.id, "reconciler: confirmed pending entry");
        Applied::Confirmed { index }
    }

    #[must_use]
    pub fn transcript(&self) -> &[Message] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|m| m.pending).count()
    }

    fn find_pending(&self, frame: &ChatFrame) -> Option<usize> {
        if self.policy == MatchPolicy::CorrelationId {
            if let Some(client_id) = frame.client_id.as_deref() {
                let exact = self
                    .entries
                    .iter()
                    .position(|m| m.pending && m.local_key.as_deref() == Some(client_id));
                if exact.is_some() {
                    return exact;
                }
            }
        }

        self.entries
            .iter()
            .position(|m| m.pending && m.from == frame.from && m.content == frame.content)
    }
}

#[cfg(test)]
#[path = "reconcile_test.rs"]
mod tests;
