use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use linkup_models::message::Message;
use linkup_models::notification::NotificationEvent;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Per-connection push queue depth. A client that stops draining its socket
/// for this many events is treated as gone.
pub const PUSH_QUEUE_DEPTH: usize = 64;

/// One event queued for a live connection.
#[derive(Debug, Clone)]
pub enum Push {
    Message(Message),
    Notification(NotificationEvent),
}

/// Handle to one live connection of a user. Opaque to business logic;
/// the gateway owns the receiving half.
#[derive(Clone)]
pub struct Channel {
    id: Uuid,
    user_id: i64,
    sender: mpsc::Sender<Push>,
}

impl Channel {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    /// Bounded, non-blocking push attempt. Fails when the queue is full or
    /// the receiving side is gone.
    pub fn try_push(&self, push: Push) -> Result<(), mpsc::error::TrySendError<Push>> {
        self.sender.try_send(push)
    }
}

/// In-memory map from user id to that user's live connections. Ephemeral
/// process state: reset on restart, never authoritative for reachability
/// beyond best-effort fan-out. DashMap shards give per-user-bucket
/// linearizability for register/unregister racing deliveries.
#[derive(Default)]
pub struct PresenceRegistry {
    channels: DashMap<i64, Vec<Channel>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new channel for a user. Returns the handle (for the registry
    /// and dispatcher) and the receiving half (for the connection task).
    pub fn register(&self, user_id: i64) -> (Channel, mpsc::Receiver<Push>) {
        let (sender, receiver) = mpsc::channel(PUSH_QUEUE_DEPTH);
        let channel = Channel {
            id: Uuid::new_v4(),
            user_id,
            sender,
        };
        self.channels
            .entry(user_id)
            .or_default()
            .push(channel.clone());
        tracing::debug!(user_id, channel_id = %channel.id, "presence: channel registered");
        (channel, receiver)
    }

    /// Drop one channel. The user's entry is pruned when its last channel
    /// disconnects, so an empty set never lingers as a stale online marker.
    pub fn unregister(&self, user_id: i64, channel_id: Uuid) {
        let mut removed = false;
        if let Entry::Occupied(mut entry) = self.channels.entry(user_id) {
            let channels = entry.get_mut();
            let before = channels.len();
            channels.retain(|c| c.id != channel_id);
            removed = channels.len() < before;
            if channels.is_empty() {
                entry.remove();
            }
        }
        if removed {
            tracing::debug!(user_id, channel_id = %channel_id, "presence: channel unregistered");
        }
    }

    /// Snapshot of a user's live channels (possibly empty).
    pub fn channels_for(&self, user_id: i64) -> Vec<Channel> {
        self.channels
            .get(&user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// A user is online iff they hold at least one live channel.
    pub fn is_online(&self, user_id: i64) -> bool {
        self.channels
            .get(&user_id)
            .map(|entry| !entry.is_empty())
            .unwrap_or(false)
    }

    /// Number of users with at least one live channel.
    pub fn online_count(&self) -> usize {
        self.channels.len()
    }

    /// Drop all channels (process shutdown).
    pub fn clear(&self) {
        self.channels.clear();
    }
}
