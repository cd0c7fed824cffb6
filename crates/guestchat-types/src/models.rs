use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One line of the shared chat history.
///
/// Messages are never edited or deleted. The canonical history is every
/// message ordered by `created_at`, ties broken by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// A guest session as seen by the presence tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEntry {
    pub session_id: String,
    pub display_name: String,
    pub last_seen_at: DateTime<Utc>,
}

/// Outcome of a heartbeat. Both variants are successes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeartbeatStatus {
    /// An existing entry was refreshed.
    Updated,
    /// No entry existed, so one was created from the heartbeat.
    Created,
}

/// Result of registering a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub session_id: String,
    pub display_name: String,
    /// `false` when the session was already known and its name was reused.
    pub created: bool,
}
