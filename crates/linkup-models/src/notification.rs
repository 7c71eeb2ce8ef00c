use serde::{Deserialize, Serialize};

use crate::user::UserSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewMessage,
    Like,
    Dislike,
    Comment,
    Follow,
}

/// Ephemeral activity event fanned out to a recipient's live channels.
/// Never persisted; offline recipients simply miss it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub kind: NotificationKind,
    /// The user whose action produced this event.
    pub actor_id: i64,
    /// Actor display fields captured when the event was produced.
    pub actor: UserSnapshot,
    /// Post, thread, or user the event refers to.
    pub target_id: i64,
    pub message: String,
}
