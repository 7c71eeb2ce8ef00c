use crate::{bool_from_any_row, datetime_from_db_text, datetime_to_db_text, DbError, DbPool};
use chrono::{DateTime, Utc};
use linkup_models::message::{Attachment, MediaKind, Message};
use sqlx::Row;

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: i64,
    pub thread_id: i64,
    pub sender_id: i64,
    pub recipient_id: i64,
    pub body: String,
    pub attachment_url: Option<String>,
    pub attachment_kind: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub seq: i64,
}

impl<'r> sqlx::FromRow<'r, sqlx::any::AnyRow> for MessageRow {
    fn from_row(row: &'r sqlx::any::AnyRow) -> Result<Self, sqlx::Error> {
        let created_at_raw: String = row.try_get("created_at")?;
        Ok(Self {
            id: row.try_get("id")?,
            thread_id: row.try_get("thread_id")?,
            sender_id: row.try_get("sender_id")?,
            recipient_id: row.try_get("recipient_id")?,
            body: row.try_get("body")?,
            attachment_url: row.try_get("attachment_url")?,
            attachment_kind: row.try_get("attachment_kind")?,
            read: bool_from_any_row(row, "read")?,
            created_at: datetime_from_db_text(&created_at_raw)?,
            seq: row.try_get("seq")?,
        })
    }
}

impl MessageRow {
    pub fn into_model(self) -> Message {
        let attachment = match (self.attachment_url, self.attachment_kind) {
            (Some(url), Some(kind)) => MediaKind::parse(&kind).map(|kind| Attachment { url, kind }),
            _ => None,
        };
        Message {
            id: self.id,
            thread_id: self.thread_id,
            sender_id: self.sender_id,
            recipient_id: self.recipient_id,
            body: self.body,
            attachment,
            read: self.read,
            created_at: self.created_at,
            seq: self.seq,
        }
    }
}

const MESSAGE_COLUMNS: &str =
    "id, thread_id, sender_id, recipient_id, body, attachment_url, attachment_kind, read, created_at, seq";

/// Append a message and bump the owning thread's last-activity marker in a
/// single transaction. Either both rows change or neither does; a message
/// never exists unlinked from its thread.
#[allow(clippy::too_many_arguments)]
pub async fn append(
    pool: &DbPool,
    id: i64,
    thread_id: i64,
    sender_id: i64,
    recipient_id: i64,
    body: &str,
    attachment: Option<&Attachment>,
    created_at: DateTime<Utc>,
    seq: i64,
) -> Result<MessageRow, DbError> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, MessageRow>(&format!(
        "INSERT INTO messages (id, thread_id, sender_id, recipient_id, body, attachment_url, attachment_kind, created_at, seq)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING {MESSAGE_COLUMNS}"
    ))
    .bind(id)
    .bind(thread_id)
    .bind(sender_id)
    .bind(recipient_id)
    .bind(body)
    .bind(attachment.map(|a| a.url.as_str()))
    .bind(attachment.map(|a| a.kind.as_str()))
    .bind(datetime_to_db_text(created_at))
    .bind(seq)
    .fetch_one(&mut *tx)
    .await?;

    let updated = sqlx::query(
        "UPDATE threads SET last_message_id = $1, last_activity_at = $2 WHERE id = $3",
    )
    .bind(row.id)
    .bind(datetime_to_db_text(created_at))
    .bind(thread_id)
    .execute(&mut *tx)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    tx.commit().await?;
    Ok(row)
}

pub async fn get_message(pool: &DbPool, id: i64) -> Result<Option<MessageRow>, DbError> {
    let row = sqlx::query_as::<_, MessageRow>(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// All messages in a thread, ordered by (created_at, seq) ascending. The
/// sequence is the only tie-break when timestamps collide.
pub async fn list_for_thread(pool: &DbPool, thread_id: i64) -> Result<Vec<MessageRow>, DbError> {
    let rows = sqlx::query_as::<_, MessageRow>(&format!(
        "SELECT {MESSAGE_COLUMNS}
         FROM messages
         WHERE thread_id = $1
         ORDER BY created_at ASC, seq ASC"
    ))
    .bind(thread_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Flip every unread message addressed to `reader_id` in one batch.
/// Idempotent; never touches messages the reader sent.
pub async fn mark_read(pool: &DbPool, thread_id: i64, reader_id: i64) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE messages SET read = 1
         WHERE thread_id = $1 AND recipient_id = $2 AND read = 0",
    )
    .bind(thread_id)
    .bind(reader_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations, threads, users};

    async fn seeded_thread() -> (DbPool, threads::ThreadRow) {
        let pool = create_pool("sqlite::memory:", 1).await.expect("pool");
        run_migrations(&pool).await.expect("migrations");
        users::create_user(&pool, 1, "alice", None)
            .await
            .expect("alice");
        users::create_user(&pool, 2, "bob", None).await.expect("bob");
        let thread = threads::find_or_create(&pool, 10, 1, 2)
            .await
            .expect("thread");
        (pool, thread)
    }

    #[tokio::test]
    async fn append_links_message_and_bumps_thread() {
        let (pool, thread) = seeded_thread().await;

        let now = Utc::now();
        let msg = append(&pool, 1000, thread.id, 1, 2, "hi", None, now, 1)
            .await
            .expect("append");
        assert_eq!(msg.thread_id, thread.id);
        assert!(!msg.read);

        let reloaded = threads::get_thread(&pool, thread.id)
            .await
            .expect("get")
            .expect("exists");
        assert_eq!(reloaded.last_message_id, Some(1000));
    }

    #[tokio::test]
    async fn append_to_missing_thread_stores_nothing() {
        let (pool, _thread) = seeded_thread().await;

        append(&pool, 1001, 9999, 1, 2, "orphan", None, Utc::now(), 2)
            .await
            .expect_err("missing thread");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE id = 1001")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(count, 0, "rolled-back append must not leave a message row");
    }

    #[tokio::test]
    async fn listing_orders_by_timestamp_then_sequence() {
        let (pool, thread) = seeded_thread().await;

        // Same second-granularity timestamp; the sequence breaks the tie.
        let ts = Utc::now();
        append(&pool, 1, thread.id, 1, 2, "first", None, ts, 7)
            .await
            .expect("append");
        append(&pool, 2, thread.id, 2, 1, "second", None, ts, 8)
            .await
            .expect("append");
        append(
            &pool,
            3,
            thread.id,
            1,
            2,
            "earlier",
            None,
            ts - chrono::Duration::seconds(5),
            9,
        )
        .await
        .expect("append");

        let listed = list_for_thread(&pool, thread.id).await.expect("list");
        let bodies: Vec<&str> = listed.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["earlier", "first", "second"]);

        // Stable across repeated reads.
        let again = list_for_thread(&pool, thread.id).await.expect("list");
        let ids: Vec<i64> = again.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn mark_read_is_batch_idempotent_and_skips_own_messages() {
        let (pool, thread) = seeded_thread().await;

        let ts = Utc::now();
        append(&pool, 1, thread.id, 1, 2, "to bob", None, ts, 1)
            .await
            .expect("append");
        append(&pool, 2, thread.id, 1, 2, "also to bob", None, ts, 2)
            .await
            .expect("append");
        append(&pool, 3, thread.id, 2, 1, "from bob", None, ts, 3)
            .await
            .expect("append");

        let marked = mark_read(&pool, thread.id, 2).await.expect("mark");
        assert_eq!(marked, 2);

        let again = mark_read(&pool, thread.id, 2).await.expect("mark again");
        assert_eq!(again, 0);

        // Bob's own message stays unread until alice reads it.
        let bobs = get_message(&pool, 3).await.expect("get").expect("exists");
        assert!(!bobs.read);
    }

    #[tokio::test]
    async fn attachment_fields_round_trip() {
        let (pool, thread) = seeded_thread().await;

        let attachment = Attachment {
            url: "https://cdn.example.com/cat.png".to_string(),
            kind: MediaKind::Image,
        };
        append(
            &pool,
            1,
            thread.id,
            1,
            2,
            "",
            Some(&attachment),
            Utc::now(),
            1,
        )
        .await
        .expect("append");

        let msg = get_message(&pool, 1)
            .await
            .expect("get")
            .expect("exists")
            .into_model();
        assert_eq!(msg.attachment, Some(attachment));
        assert!(msg.body.is_empty());
    }
}
