//! Row types as stored in SQLite, plus their conversion into the domain
//! models from `guestchat-types`.

use chrono::{DateTime, SecondsFormat, Utc};
use guestchat_types::models::{ChatMessage, PresenceEntry};

use crate::{Result, StoreError};

pub struct MessageRow {
    pub id: i64,
    pub username: String,
    pub message_text: String,
    pub timestamp: String,
}

pub struct ActiveUserRow {
    pub session_id: String,
    pub username: String,
    pub last_activity: String,
}

/// Fixed-width UTC text (`2024-05-01T12:00:00.000000Z`), so that comparing
/// the stored strings compares the instants.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(column: &'static str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| StoreError::CorruptRow {
            column,
            value: value.to_string(),
        })
}

impl TryFrom<MessageRow> for ChatMessage {
    type Error = StoreError;

    fn try_from(row: MessageRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            created_at: parse_timestamp("messages.timestamp", &row.timestamp)?,
            author: row.username,
            body: row.message_text,
        })
    }
}

impl TryFrom<ActiveUserRow> for PresenceEntry {
    type Error = StoreError;

    fn try_from(row: ActiveUserRow) -> Result<Self> {
        Ok(Self {
            last_seen_at: parse_timestamp("active_users.last_activity", &row.last_activity)?,
            session_id: row.session_id,
            display_name: row.username,
        })
    }
}
