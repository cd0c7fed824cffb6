//! HTTP request and response bodies.
//!
//! Field names follow the JSON the web client already speaks
//! (`username`, `message_text`, `timestamp`, ...), which is why they differ
//! from the domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ChatMessage, HeartbeatStatus, Registration};

// -- Messages --

/// Fields are optional so that a missing field is reported as a validation
/// error instead of a deserialization failure.
#[derive(Debug, Default, Deserialize)]
pub struct PostMessageRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub message_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: i64,
    pub username: String,
    pub message_text: String,
    pub timestamp: DateTime<Utc>,
}

impl From<ChatMessage> for MessageResponse {
    fn from(msg: ChatMessage) -> Self {
        Self {
            id: msg.id,
            username: msg.author,
            message_text: msg.body,
            timestamp: msg.created_at,
        }
    }
}

// -- Presence --

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub username: String,
    pub session_id: String,
}

impl From<Registration> for RegisterResponse {
    fn from(reg: Registration) -> Self {
        Self {
            username: reg.display_name,
            session_id: reg.session_id,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct HeartbeatRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatResponse {
    pub status: HeartbeatWireStatus,
}

/// Wire spelling of [`HeartbeatStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeartbeatWireStatus {
    Success,
    Created,
}

impl From<HeartbeatStatus> for HeartbeatResponse {
    fn from(status: HeartbeatStatus) -> Self {
        let status = match status {
            HeartbeatStatus::Updated => HeartbeatWireStatus::Success,
            HeartbeatStatus::Created => HeartbeatWireStatus::Created,
        };
        Self { status }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineCountResponse {
    pub online_count: u64,
}

// -- Errors --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}
