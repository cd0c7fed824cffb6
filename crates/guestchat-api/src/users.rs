use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use guestchat_types::api::{
    HeartbeatRequest, HeartbeatResponse, OnlineCountResponse, RegisterRequest, RegisterResponse,
};

use crate::error::ChatError;
use crate::{AppState, blocking};

/// POST /api/users/register/: 201 with a fresh guest name, or 200 with the
/// name the session already has.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ChatError> {
    let Json(req) = payload.map_err(ChatError::malformed)?;
    let session_id = req.session_id.ok_or_else(|| ChatError::missing("session_id"))?;

    let presence = state.presence.clone();
    let registration = blocking(move || presence.register(&session_id)).await?;

    let status = if registration.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(RegisterResponse::from(registration))))
}

/// POST /api/users/heartbeat/
pub async fn heartbeat(
    State(state): State<AppState>,
    payload: Result<Json<HeartbeatRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ChatError> {
    let Json(req) = payload.map_err(ChatError::malformed)?;
    let session_id = req.session_id.ok_or_else(|| ChatError::missing("session_id"))?;
    let username = req.username.ok_or_else(|| ChatError::missing("username"))?;

    let presence = state.presence.clone();
    let status = blocking(move || presence.heartbeat(&session_id, &username)).await?;

    Ok(Json(HeartbeatResponse::from(status)))
}

/// GET /api/users/online/
pub async fn online_count(State(state): State<AppState>) -> Result<impl IntoResponse, ChatError> {
    let presence = state.presence.clone();
    let online_count = blocking(move || presence.online_count()).await?;

    Ok(Json(OnlineCountResponse { online_count }))
}
