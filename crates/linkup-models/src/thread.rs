use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::user::UserSnapshot;

/// The unique conversation between two users. Participants are stored as a
/// normalized pair (low id first) so lookup is order-independent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: i64,
    pub user_low: i64,
    pub user_high: i64,
    pub last_message_id: Option<i64>,
    pub last_activity_at: DateTime<Utc>,
}

impl Thread {
    /// The participant that is not `user_id`.
    pub fn other_participant(&self, user_id: i64) -> i64 {
        if self.user_low == user_id {
            self.user_high
        } else {
            self.user_low
        }
    }

    pub fn has_participant(&self, user_id: i64) -> bool {
        self.user_low == user_id || self.user_high == user_id
    }
}

/// Inbox entry: a thread paired with the other participant's display
/// snapshot, for conversation-list views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub id: i64,
    pub recipient: UserSnapshot,
    pub last_message_id: Option<i64>,
    pub last_activity_at: DateTime<Utc>,
}

/// Normalize an unordered participant pair to (low, high).
pub fn normalize_pair(a: i64, b: i64) -> (i64, i64) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}
