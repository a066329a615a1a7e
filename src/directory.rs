//! Conversation directory: the sidebar list of peers, polled over REST.
//!
//! DESIGN
//! ======
//! The current list lives in a `watch` channel so UI code can observe it.
//! `refresh` replaces it with the fetched list, after injecting the
//! administrator at the top when the server did not return them and
//! collapsing duplicate peers (first occurrence wins).
//!
//! A failed fetch keeps the previous list. If nothing was ever loaded the
//! list is just the administrator. An overlapping refresh does not fetch; it
//! returns the current list.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::api::ChatApi;
use crate::config::AdminPeer;
use crate::frame::text_value;
use crate::identity::{LocalUserId, PeerId, UserId};

/// One sidebar entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub peer_id: PeerId,
    /// Falls back to the peer id when the server sends no name.
    pub peer_name: String,
    pub last_message: String,
    pub last_at: String,
}

impl Conversation {
    /// The synthetic entry for the administrator, with empty previews.
    #[must_use]
    pub fn admin(admin: &AdminPeer) -> Self {
        Self {
            peer_id: UserId::new(&admin.id),
            peer_name: admin.name.clone(),
            last_message: String::new(),
            last_at: String::new(),
        }
    }

    /// Normalize one item, accepting both camelCase and snake_case fields.
    /// A blank field falls through to the next alias. `peer` is a name only.
    ///
    /// Returns `None` when no peer id can be found.
    #[must_use]
    pub fn from_value(item: &Value) -> Option<Self> {
        let data = item.as_object()?;
        let field = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| data.get(*name).and_then(text_value).filter(|v| !v.trim().is_empty()))
        };

        let peer_id = UserId::new(field(&["peerId", "peer_id"])?);
        if peer_id.is_empty() {
            return None;
        }
        let peer_name = field(&["peerName", "peer_name", "peer"]).unwrap_or_else(|| peer_id.to_string());

        Some(Self {
            peer_name,
            last_message: field(&["lastMessage", "last_message"]).unwrap_or_default(),
            last_at: field(&["lastAt", "last_at"]).unwrap_or_default(),
            peer_id,
        })
    }
}

/// Normalize a conversation-list response body.
#[must_use]
pub fn parse_conversations(body: &Value) -> Vec<Conversation> {
    let Some(items) = body.as_array() else {
        warn!("directory: response is not an array; treating as empty");
        return Vec::new();
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let conversation = Conversation::from_value(item);
            if conversation.is_none() {
                warn!(index, "directory: dropping item without peer id");
            }
            conversation
        })
        .collect()
}

/// Put the administrator first unless already listed, then drop repeated peers.
#[must_use]
pub fn with_admin(list: Vec<Conversation>, admin: &AdminPeer) -> Vec<Conversation> {
    let admin_entry = Conversation::admin(admin);
    let mut out = Vec::with_capacity(list.len() + 1);
    if !list.iter().any(|c| c.peer_id == admin_entry.peer_id) {
        out.push(admin_entry);
    }

    let mut seen: HashSet<PeerId> = out.iter().map(|c| c.peer_id.clone()).collect();
    for conversation in list {
        if seen.insert(conversation.peer_id.clone()) {
            out.push(conversation);
        } else {
            debug!(peer_id = %conversation.peer_id, "directory: duplicate peer collapsed");
        }
    }
    out
}

// =============================================================================
// DIRECTORY
// =============================================================================

pub struct ConversationDirectory {
    api: Arc<dyn ChatApi>,
    admin: AdminPeer,
    list: watch::Sender<Vec<Conversation>>,
    loaded: AtomicBool,
    in_flight: AtomicBool,
}

impl ConversationDirectory {
    /// A directory whose list starts as just the administrator.
    #[must_use]
    pub fn new(api: Arc<dyn ChatApi>, admin: AdminPeer) -> Self {
        let (list, _) = watch::channel(vec![Conversation::admin(&admin)]);
        Self {
            api,
            admin,
            list,
            loaded: AtomicBool::new(false),
            in_flight: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn current(&self) -> Vec<Conversation> {
        self.list.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<Conversation>> {
        self.list.subscribe()
    }

    /// `true` once any fetch has succeeded.
    #[must_use]
    pub fn loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Fetch the list for `local` and publish it.
    pub async fn refresh(&self, local: &LocalUserId) -> Vec<Conversation> {
        let Some(_guard) = InFlight::try_start(&self.in_flight) else {
            debug!(user_id = %local, "directory: refresh already in flight");
            return self.current();
        };

        match self.api.conversations(local).await {
            Ok(fetched) => {
                let list = with_admin(fetched, &self.admin);
                debug!(user_id = %local, count = list.len(), "directory: refreshed");
                self.loaded.store(true, Ordering::Release);
                self.list.send_replace(list.clone());
                list
            }
            Err(e) => {
                warn!(user_id = %local, error = %e, "directory: refresh failed; keeping previous list");
                self.current()
            }
        }
    }
}

/// Clears the in-flight flag on drop, including when the refresh future is
/// cancelled mid-fetch.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn try_start(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
            .then_some(Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// =============================================================================
// POLLER
// =============================================================================

/// Background task refreshing a directory on a fixed interval.
///
/// The first refresh runs immediately. Dropping the poller stops it.
pub struct DirectoryPoller {
    task: JoinHandle<()>,
}

impl DirectoryPoller {
    #[must_use]
    pub fn spawn(directory: Arc<ConversationDirectory>, local: LocalUserId, every: Duration) -> Self {
        info!(user_id = %local, ?every, "directory: poller started");
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                directory.refresh(&local).await;
            }
        });
        Self { task }
    }

    pub fn stop(self) {
        drop(self);
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for DirectoryPoller {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
#[path = "directory_test.rs"]
mod tests;
