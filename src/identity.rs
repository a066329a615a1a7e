//! User identifiers and the explicit identity handed to the chat core.
//!
//! Identifiers are opaque strings. Surrounding whitespace is trimmed at
//! construction, so equality is string-exact on the trimmed value and never
//! numeric (`"007" != "7"`).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque user identifier shared by local users and peers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct UserId(String);

/// The user this client acts as.
pub type LocalUserId = UserId;

/// The other side of a conversation.
pub type PeerId = UserId;

impl UserId {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_owned())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for UserId {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for UserId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who is signed in. Passed explicitly into every component that needs it.
///
/// The bearer token authenticates REST calls only; the live channel carries
/// identity in its `userId` query parameter.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: LocalUserId,
    pub token: Option<String>,
}

impl Identity {
    /// Build an identity from raw session values.
    ///
    /// Returns `None` when the user id is missing or blank, which callers
    /// treat as "chat not available".
    #[must_use]
    pub fn resolve(user_id: Option<&str>, token: Option<String>) -> Option<Self> {
        let user_id = UserId::new(user_id?);
        if user_id.is_empty() {
            return None;
        }
        let token = token.filter(|t| !t.trim().is_empty());
        Some(Self { user_id, token })
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("user_id", &self.user_id)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;
