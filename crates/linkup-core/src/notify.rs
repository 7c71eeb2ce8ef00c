use linkup_models::notification::{NotificationEvent, NotificationKind};

use crate::error::CoreError;
use crate::AppState;

/// Build and fan out an activity event to `recipient_id`. The actor's
/// display fields are captured now; later profile edits do not rewrite
/// delivered notifications. Acting on your own content notifies no one.
pub async fn notify(
    state: &AppState,
    kind: NotificationKind,
    actor_id: i64,
    recipient_id: i64,
    target_id: i64,
    message: &str,
) -> Result<(), CoreError> {
    if actor_id == recipient_id {
        return Ok(());
    }

    let actor = linkup_db::users::get_user_snapshot(&state.db, actor_id)
        .await?
        .ok_or(CoreError::NotFound)?;

    state.dispatcher.deliver_notification(
        recipient_id,
        NotificationEvent {
            kind,
            actor_id,
            actor,
            target_id,
            message: message.to_string(),
        },
    );
    Ok(())
}

pub async fn notify_like(
    state: &AppState,
    actor_id: i64,
    post_owner_id: i64,
    post_id: i64,
) -> Result<(), CoreError> {
    notify(
        state,
        NotificationKind::Like,
        actor_id,
        post_owner_id,
        post_id,
        "Your post was liked",
    )
    .await
}

pub async fn notify_dislike(
    state: &AppState,
    actor_id: i64,
    post_owner_id: i64,
    post_id: i64,
) -> Result<(), CoreError> {
    notify(
        state,
        NotificationKind::Dislike,
        actor_id,
        post_owner_id,
        post_id,
        "Your post was unliked",
    )
    .await
}

pub async fn notify_comment(
    state: &AppState,
    actor_id: i64,
    post_owner_id: i64,
    post_id: i64,
) -> Result<(), CoreError> {
    notify(
        state,
        NotificationKind::Comment,
        actor_id,
        post_owner_id,
        post_id,
        "Someone commented on your post",
    )
    .await
}

pub async fn notify_follow(
    state: &AppState,
    actor_id: i64,
    followed_id: i64,
) -> Result<(), CoreError> {
    notify(
        state,
        NotificationKind::Follow,
        actor_id,
        followed_id,
        followed_id,
        "You have a new follower",
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::Push;
    use crate::{AppConfig, AppState};

    async fn test_state() -> AppState {
        let db = linkup_db::create_pool("sqlite::memory:", 1)
            .await
            .expect("pool");
        linkup_db::run_migrations(&db).await.expect("migrations");
        linkup_db::users::create_user(&db, 1, "alice", Some("https://cdn.example.com/a.png"))
            .await
            .expect("alice");
        linkup_db::users::create_user(&db, 2, "bob", None)
            .await
            .expect("bob");

        AppState::new(
            db,
            AppConfig {
                jwt_secret: "test-secret".to_string(),
                jwt_expiry_seconds: 3600,
                database_url: "sqlite::memory:".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn like_event_carries_actor_snapshot() {
        let state = test_state().await;
        let (_channel, mut rx) = state.presence.register(2);

        notify_like(&state, 1, 2, 500).await.expect("notify");

        let Some(Push::Notification(event)) = rx.recv().await else {
            panic!("expected notification");
        };
        assert_eq!(event.kind, NotificationKind::Like);
        assert_eq!(event.actor.username, "alice");
        assert_eq!(
            event.actor.avatar_url.as_deref(),
            Some("https://cdn.example.com/a.png")
        );
        assert_eq!(event.target_id, 500);
        assert_eq!(event.message, "Your post was liked");
    }

    #[tokio::test]
    async fn liking_your_own_post_notifies_no_one() {
        let state = test_state().await;
        let (_channel, mut rx) = state.presence.register(1);

        notify_like(&state, 1, 1, 500).await.expect("notify");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn follow_event_targets_the_followed_user() {
        let state = test_state().await;
        let (_channel, mut rx) = state.presence.register(2);

        notify_follow(&state, 1, 2).await.expect("notify");

        let Some(Push::Notification(event)) = rx.recv().await else {
            panic!("expected notification");
        };
        assert_eq!(event.kind, NotificationKind::Follow);
        assert_eq!(event.target_id, 2);
    }

    #[tokio::test]
    async fn offline_owner_misses_the_event_without_error() {
        let state = test_state().await;
        notify_comment(&state, 1, 2, 500).await.expect("notify");
    }
}
