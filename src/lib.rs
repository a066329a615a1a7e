//! # marketplace-chat
//!
//! Real-time chat core for the service-marketplace dashboards.
//!
//! ARCHITECTURE
//! ============
//! - `transport` owns one WebSocket session per local user, with fixed-delay
//!   reconnection driven by a pure state machine.
//! - `reconcile` merges history, optimistic local sends, and the live stream
//!   into one transcript.
//! - `directory` keeps the sidebar conversation list, polled over REST.
//! - `controller` glues one open conversation to the shared session.
//! - `surface` is the mounted chat surface: identity, session, poller, and
//!   the active controller, torn down together.

pub mod api;
pub mod config;
pub mod controller;
pub mod directory;
pub mod frame;
pub mod identity;
pub mod message;
pub mod reconcile;
pub mod surface;
pub mod transport;

#[cfg(test)]
#[path = "helpers_test.rs"]
pub(crate) mod test_helpers;
