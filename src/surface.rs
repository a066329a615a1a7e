//! The mounted chat surface.
//!
//! One surface per signed-in user: it owns the transport session, the
//! directory poller, and the currently open conversation. Without an
//! identity it is inert and reports "not available".
//!
//! Switching conversations keeps the session and replaces the controller.
//! Changing identity tears everything down and mounts again.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::api::ChatApi;
use crate::config::ChatConfig;
use crate::controller::ChatViewController;
use crate::directory::{Conversation, ConversationDirectory, DirectoryPoller};
use crate::identity::{Identity, PeerId};
use crate::transport::{Connector, SessionOptions, StatusLine, TransportSession};

pub struct ChatSurface {
    config: ChatConfig,
    connector: Arc<dyn Connector>,
    live: Option<Live>,
}

struct Live {
    identity: Identity,
    api: Arc<dyn ChatApi>,
    session: TransportSession,
    directory: Arc<ConversationDirectory>,
    poller: DirectoryPoller,
    conversation: Option<ChatViewController>,
}

impl ChatSurface {
    /// Mount the surface. With `None` the surface stays inert.
    #[must_use]
    pub fn mount(
        config: ChatConfig,
        connector: Arc<dyn Connector>,
        api: Arc<dyn ChatApi>,
        identity: Option<Identity>,
    ) -> Self {
        let mut surface = Self { config, connector, live: None };
        surface.live = identity.map(|identity| surface.start(identity, api));
        if surface.live.is_none() {
            info!("surface: no identity; chat not available");
        }
        surface
    }

    fn start(&self, identity: Identity, api: Arc<dyn ChatApi>) -> Live {
        let user = identity.user_id.clone();
        info!(user_id = %user, "surface: mounting");

        let session = TransportSession::open(
            user.clone(),
            Arc::clone(&self.connector),
            SessionOptions::from(&self.config),
        );
        let directory = Arc::new(ConversationDirectory::new(Arc::clone(&api), self.config.admin.clone()));
        let poller = DirectoryPoller::spawn(Arc::clone(&directory), user, self.config.poll_interval);

        Live { identity, api, session, directory, poller, conversation: None }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.live.is_some()
    }

    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.live.as_ref().map(|live| &live.identity)
    }

    #[must_use]
    pub fn session(&self) -> Option<&TransportSession> {
        self.live.as_ref().map(|live| &live.session)
    }

    #[must_use]
    pub fn status(&self) -> StatusLine {
        self.live
            .as_ref()
            .map_or(StatusLine::Unavailable, |live| live.session.status())
    }

    /// The sidebar list; empty when unavailable.
    #[must_use]
    pub fn conversations(&self) -> Vec<Conversation> {
        self.live
            .as_ref()
            .map(|live| live.directory.current())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn watch_conversations(&self) -> Option<watch::Receiver<Vec<Conversation>>> {
        self.live.as_ref().map(|live| live.directory.subscribe())
    }

    /// Open the conversation with `peer`, replacing any open one.
    pub async fn select_peer(&mut self, peer: PeerId) -> Option<&mut ChatViewController> {
        let live = self.live.as_mut()?;
        live.conversation = None;
        let controller = ChatViewController::open(live.session.clone(), live.api.as_ref(), peer).await;
        Some(live.conversation.insert(controller))
    }

    /// Close the open conversation; the session stays up.
    pub fn deselect(&mut self) {
        if let Some(live) = self.live.as_mut() {
            live.conversation = None;
        }
    }

    pub fn conversation(&self) -> Option<&ChatViewController> {
        self.live.as_ref()?.conversation.as_ref()
    }

    pub fn conversation_mut(&mut self) -> Option<&mut ChatViewController> {
        self.live.as_mut()?.conversation.as_mut()
    }

    /// Swap the signed-in user: close the old session and poller, then mount
    /// for the new identity (or go inert).
    pub async fn change_identity(&mut self, identity: Option<Identity>, api: Arc<dyn ChatApi>) {
        self.close().await;
        self.live = identity.map(|identity| self.start(identity, api));
    }

    /// Stop polling and close the session. The surface is inert afterwards.
    pub async fn close(&mut self) {
        let Some(live) = self.live.take() else {
            return;
        };
        info!(user_id = %live.identity.user_id, "surface: unmounting");
        drop(live.conversation);
        live.poller.stop();
        live.session.close().await;
    }
}

#[cfg(test)]
#[path = "surface_test.rs"]
mod tests;
