use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use linkup_core::AppState;
use linkup_models::message::{Attachment, MediaKind, Message};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::AuthUser;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub text_message: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMediaMessageRequest {
    #[serde(default)]
    pub text_message: String,
    pub media_url: String,
    pub media_kind: String,
}

pub(crate) fn message_json(message: &Message) -> Value {
    json!({
        "id": message.id.to_string(),
        "thread_id": message.thread_id.to_string(),
        "sender_id": message.sender_id.to_string(),
        "recipient_id": message.recipient_id.to_string(),
        "body": message.body,
        "attachment": message.attachment.as_ref().map(|a| json!({
            "url": a.url,
            "kind": a.kind.as_str(),
        })),
        "read": message.read,
        "created_at": message.created_at.to_rfc3339(),
    })
}

pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(recipient_id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let recipient_id: i64 = recipient_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid recipient id".into()))?;

    let message = linkup_core::messaging::send_message(
        &state,
        auth.user_id,
        recipient_id,
        &body.text_message,
        None,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "new_message": message_json(&message) })),
    ))
}

pub async fn send_media_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(recipient_id): Path<String>,
    Json(body): Json<SendMediaMessageRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let recipient_id: i64 = recipient_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid recipient id".into()))?;

    let kind = MediaKind::parse(&body.media_kind)
        .ok_or_else(|| ApiError::BadRequest("media_kind must be image, video or file".into()))?;
    let attachment = Attachment {
        url: body.media_url,
        kind,
    };

    let message = linkup_core::messaging::send_media_message(
        &state,
        auth.user_id,
        recipient_id,
        &body.text_message,
        attachment,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "new_message": message_json(&message) })),
    ))
}

/// Full conversation with the other user; reading it marks the caller's
/// unread messages as read.
pub async fn get_conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(other_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let other_id: i64 = other_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid user id".into()))?;

    let messages = linkup_core::messaging::get_conversation(&state, auth.user_id, other_id).await?;
    let result: Vec<Value> = messages.iter().map(message_json).collect();

    Ok(Json(json!({ "success": true, "messages": result })))
}
