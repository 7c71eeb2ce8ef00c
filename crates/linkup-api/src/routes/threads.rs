use axum::{extract::State, Json};
use linkup_core::AppState;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::AuthUser;

/// The caller's conversation list, most recently active first.
pub async fn list_threads(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let threads = linkup_core::messaging::list_threads(&state, auth.user_id).await?;

    let result: Vec<Value> = threads
        .iter()
        .map(|t| {
            json!({
                "id": t.id.to_string(),
                "last_message_id": t.last_message_id.map(|id| id.to_string()),
                "last_activity_at": t.last_activity_at.to_rfc3339(),
                "recipient": {
                    "id": t.recipient.id.to_string(),
                    "username": t.recipient.username,
                    "avatar_url": t.recipient.avatar_url,
                }
            })
        })
        .collect();

    Ok(Json(json!(result)))
}
