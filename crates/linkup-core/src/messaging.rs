use chrono::Utc;
use linkup_models::message::{Attachment, Message};

use crate::error::CoreError;
use crate::AppState;

/// Send a message from `sender_id` to `recipient_id`, creating the thread
/// on first contact. The message is durably stored before any delivery is
/// attempted; a storage failure aborts the whole send and nothing is
/// pushed.
pub async fn send_message(
    state: &AppState,
    sender_id: i64,
    recipient_id: i64,
    body: &str,
    attachment: Option<Attachment>,
) -> Result<Message, CoreError> {
    if sender_id == recipient_id {
        return Err(CoreError::InvalidArgument(
            "cannot start a conversation with yourself".into(),
        ));
    }
    if body.is_empty() && attachment.is_none() {
        return Err(CoreError::InvalidArgument(
            "message needs a body or an attachment".into(),
        ));
    }
    linkup_util::validation::validate_message_body(body)
        .map_err(|e| CoreError::InvalidArgument(e.to_string()))?;
    if let Some(attachment) = &attachment {
        linkup_util::validation::validate_attachment_url(&attachment.url)
            .map_err(|e| CoreError::InvalidArgument(e.to_string()))?;
    }

    linkup_db::users::get_user_by_id(&state.db, recipient_id)
        .await?
        .ok_or(CoreError::NotFound)?;

    let thread = linkup_db::threads::find_or_create(
        &state.db,
        linkup_util::snowflake::generate(1),
        sender_id,
        recipient_id,
    )
    .await?;

    let message = linkup_db::messages::append(
        &state.db,
        linkup_util::snowflake::generate(1),
        thread.id,
        sender_id,
        recipient_id,
        body,
        attachment.as_ref(),
        Utc::now(),
        linkup_util::sequence::next(),
    )
    .await?
    .into_model();

    // Storage has committed; push is best-effort from here on.
    state.dispatcher.deliver_message(&message);

    Ok(message)
}

/// Attachment-required send variant.
pub async fn send_media_message(
    state: &AppState,
    sender_id: i64,
    recipient_id: i64,
    body: &str,
    attachment: Attachment,
) -> Result<Message, CoreError> {
    send_message(state, sender_id, recipient_id, body, Some(attachment)).await
}

/// All messages between the caller and `other_id`, oldest first. Reading a
/// conversation marks the caller's unread messages as read; messages the
/// caller sent are untouched. No thread yet means an empty conversation,
/// not an error.
pub async fn get_conversation(
    state: &AppState,
    caller_id: i64,
    other_id: i64,
) -> Result<Vec<Message>, CoreError> {
    if caller_id == other_id {
        return Err(CoreError::InvalidArgument(
            "cannot read a conversation with yourself".into(),
        ));
    }

    let Some(thread) = linkup_db::threads::find_between(&state.db, caller_id, other_id).await?
    else {
        return Ok(Vec::new());
    };

    let marked = linkup_db::messages::mark_read(&state.db, thread.id, caller_id).await?;
    if marked > 0 {
        tracing::debug!(thread_id = thread.id, caller_id, marked, "conversation read");
    }

    let rows = linkup_db::messages::list_for_thread(&state.db, thread.id).await?;
    Ok(rows.into_iter().map(|row| row.into_model()).collect())
}

/// Conversation list for the caller's inbox, most recently active first.
pub async fn list_threads(
    state: &AppState,
    caller_id: i64,
) -> Result<Vec<linkup_models::thread::ThreadSummary>, CoreError> {
    let rows = linkup_db::threads::list_for_user(&state.db, caller_id).await?;
    Ok(rows
        .into_iter()
        .map(|row| linkup_models::thread::ThreadSummary {
            id: row.id,
            recipient: linkup_models::user::UserSnapshot {
                id: row.recipient_id,
                username: row.recipient_username,
                avatar_url: row.recipient_avatar_url,
            },
            last_message_id: row.last_message_id,
            last_activity_at: row.last_activity_at,
        })
        .collect())
}
