pub mod clock;
pub mod error;
pub mod message_log;
pub mod messages;
pub mod presence;
pub mod users;

use std::sync::Arc;

use axum::{
    Json, Router,
    response::IntoResponse,
    routing::{get, post},
};

use guestchat_db::Database;

use crate::clock::{Clock, SystemClock};
use crate::error::ChatError;
use crate::message_log::MessageLog;
use crate::presence::PresenceTracker;

/// State shared by all handlers. Both components hold the same store handle.
#[derive(Clone)]
pub struct AppState {
    pub presence: PresenceTracker,
    pub messages: MessageLog,
}

impl AppState {
    pub fn new(db: Arc<Database>) -> Self {
        Self::with_clock(db, Arc::new(SystemClock))
    }

    pub fn with_clock(db: Arc<Database>, clock: Arc<dyn Clock>) -> Self {
        Self {
            presence: PresenceTracker::new(db.clone()).with_clock(clock.clone()),
            messages: MessageLog::new(db).with_clock(clock),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/messages/",
            get(messages::list_messages).post(messages::post_message),
        )
        .route("/api/users/register/", post(users::register))
        .route("/api/users/heartbeat/", post(users::heartbeat))
        .route("/api/users/online/", get(users::online_count))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Runs a store-touching closure on the blocking pool.
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, ChatError>
where
    F: FnOnce() -> Result<T, ChatError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}
