use std::sync::Arc;

use linkup_models::message::Message;
use linkup_models::notification::NotificationEvent;

use crate::presence::{PresenceRegistry, Push};

/// Routes stored messages and activity events to the recipient's live
/// channels. Invoked only after storage has committed; delivery outcome is
/// never reported back to the sender.
#[derive(Clone)]
pub struct Dispatcher {
    presence: Arc<PresenceRegistry>,
}

impl Dispatcher {
    pub fn new(presence: Arc<PresenceRegistry>) -> Self {
        Self { presence }
    }

    /// Push a durably stored message to every live channel of its
    /// recipient. Offline recipient: silent no-op, the message stays
    /// retrievable from the log.
    pub fn deliver_message(&self, message: &Message) {
        self.push_to_user(message.recipient_id, Push::Message(message.clone()));
    }

    /// Push an activity event to every live channel of `recipient_id`.
    /// Events where the actor is the recipient are dropped.
    pub fn deliver_notification(&self, recipient_id: i64, event: NotificationEvent) {
        if event.actor_id == recipient_id {
            return;
        }
        self.push_to_user(recipient_id, Push::Notification(event));
    }

    fn push_to_user(&self, user_id: i64, push: Push) {
        let channels = self.presence.channels_for(user_id);
        for channel in channels {
            if channel.try_push(push.clone()).is_err() {
                // Queue full or receiver gone: the client is assumed
                // disconnected. Never a retry, never surfaced upstream.
                tracing::debug!(
                    user_id,
                    channel_id = %channel.id(),
                    "dispatch: channel push failed, unregistering"
                );
                self.presence.unregister(user_id, channel.id());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::PUSH_QUEUE_DEPTH;
    use chrono::Utc;
    use linkup_models::notification::{NotificationEvent, NotificationKind};
    use linkup_models::user::UserSnapshot;

    fn message(id: i64, sender: i64, recipient: i64, body: &str) -> Message {
        Message {
            id,
            thread_id: 1,
            sender_id: sender,
            recipient_id: recipient,
            body: body.to_string(),
            attachment: None,
            read: false,
            created_at: Utc::now(),
            seq: id,
        }
    }

    fn event(kind: NotificationKind, actor_id: i64, target_id: i64) -> NotificationEvent {
        NotificationEvent {
            kind,
            actor_id,
            actor: UserSnapshot {
                id: actor_id,
                username: "alice".to_string(),
                avatar_url: None,
            },
            target_id,
            message: "Your post was liked".to_string(),
        }
    }

    #[tokio::test]
    async fn fans_out_to_every_channel_in_append_order() {
        let presence = Arc::new(PresenceRegistry::new());
        let dispatcher = Dispatcher::new(presence.clone());

        let (_phone, mut phone_rx) = presence.register(2);
        let (_laptop, mut laptop_rx) = presence.register(2);

        dispatcher.deliver_message(&message(10, 1, 2, "first"));
        dispatcher.deliver_message(&message(11, 1, 2, "second"));

        for rx in [&mut phone_rx, &mut laptop_rx] {
            let Some(Push::Message(first)) = rx.recv().await else {
                panic!("expected first message push");
            };
            let Some(Push::Message(second)) = rx.recv().await else {
                panic!("expected second message push");
            };
            assert_eq!(first.body, "first");
            assert_eq!(second.body, "second");
        }
    }

    #[tokio::test]
    async fn offline_recipient_is_a_silent_no_op() {
        let presence = Arc::new(PresenceRegistry::new());
        let dispatcher = Dispatcher::new(presence.clone());

        dispatcher.deliver_message(&message(10, 1, 2, "into the void"));
        assert!(!presence.is_online(2));
    }

    #[tokio::test]
    async fn dead_channel_is_unregistered_on_push_failure() {
        let presence = Arc::new(PresenceRegistry::new());
        let dispatcher = Dispatcher::new(presence.clone());

        let (_channel, receiver) = presence.register(2);
        drop(receiver);

        dispatcher.deliver_message(&message(10, 1, 2, "hi"));
        assert!(!presence.is_online(2));
    }

    #[tokio::test]
    async fn stalled_channel_is_dropped_once_its_queue_fills() {
        let presence = Arc::new(PresenceRegistry::new());
        let dispatcher = Dispatcher::new(presence.clone());

        let (_channel, _receiver) = presence.register(2);
        for i in 0..(PUSH_QUEUE_DEPTH as i64 + 1) {
            dispatcher.deliver_message(&message(i, 1, 2, "flood"));
        }
        assert!(!presence.is_online(2));
    }

    #[tokio::test]
    async fn self_notification_is_suppressed() {
        let presence = Arc::new(PresenceRegistry::new());
        let dispatcher = Dispatcher::new(presence.clone());

        let (_channel, mut rx) = presence.register(1);
        dispatcher.deliver_notification(1, event(NotificationKind::Like, 1, 55));

        assert!(rx.try_recv().is_err(), "own action must not notify the actor");
    }

    #[tokio::test]
    async fn notification_reaches_the_target_owner() {
        let presence = Arc::new(PresenceRegistry::new());
        let dispatcher = Dispatcher::new(presence.clone());

        let (_channel, mut rx) = presence.register(2);
        dispatcher.deliver_notification(2, event(NotificationKind::NewMessage, 1, 99));

        let Some(Push::Notification(received)) = rx.recv().await else {
            panic!("expected notification push");
        };
        assert_eq!(received.kind, NotificationKind::NewMessage);
        assert_eq!(received.target_id, 99);
    }
}
