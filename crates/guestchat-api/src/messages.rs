use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use guestchat_types::api::{MessageResponse, PostMessageRequest};

use crate::error::ChatError;
use crate::{AppState, blocking};

/// GET /api/messages/: full history, oldest first.
pub async fn list_messages(State(state): State<AppState>) -> Result<impl IntoResponse, ChatError> {
    let log = state.messages.clone();
    let messages = blocking(move || log.list_all()).await?;

    let body: Vec<MessageResponse> = messages.into_iter().map(MessageResponse::from).collect();
    Ok(Json(body))
}

/// POST /api/messages/: append one message.
pub async fn post_message(
    State(state): State<AppState>,
    payload: Result<Json<PostMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ChatError> {
    let Json(req) = payload.map_err(ChatError::malformed)?;
    let username = req.username.ok_or_else(|| ChatError::missing("username"))?;
    let message_text = req
        .message_text
        .ok_or_else(|| ChatError::missing("message_text"))?;

    let log = state.messages.clone();
    let message = blocking(move || log.append(&username, &message_text)).await?;

    Ok((StatusCode::CREATED, Json(MessageResponse::from(message))))
}
