use crate::{datetime_from_db_text, DbError, DbPool};
use chrono::{DateTime, Utc};
use linkup_models::thread::{normalize_pair, Thread};
use sqlx::Row;

#[derive(Debug, Clone)]
pub struct ThreadRow {
    pub id: i64,
    pub user_low: i64,
    pub user_high: i64,
    pub last_message_id: Option<i64>,
    pub last_activity_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::any::AnyRow> for ThreadRow {
    fn from_row(row: &'r sqlx::any::AnyRow) -> Result<Self, sqlx::Error> {
        let last_activity_raw: String = row.try_get("last_activity_at")?;
        Ok(Self {
            id: row.try_get("id")?,
            user_low: row.try_get("user_low")?,
            user_high: row.try_get("user_high")?,
            last_message_id: row.try_get("last_message_id")?,
            last_activity_at: datetime_from_db_text(&last_activity_raw)?,
        })
    }
}

impl ThreadRow {
    pub fn into_model(self) -> Thread {
        Thread {
            id: self.id,
            user_low: self.user_low,
            user_high: self.user_high,
            last_message_id: self.last_message_id,
            last_activity_at: self.last_activity_at,
        }
    }
}

/// Inbox row: thread plus the other participant's display fields.
#[derive(Debug, Clone)]
pub struct ThreadWithRecipientRow {
    pub id: i64,
    pub last_message_id: Option<i64>,
    pub last_activity_at: DateTime<Utc>,
    pub recipient_id: i64,
    pub recipient_username: String,
    pub recipient_avatar_url: Option<String>,
}

impl<'r> sqlx::FromRow<'r, sqlx::any::AnyRow> for ThreadWithRecipientRow {
    fn from_row(row: &'r sqlx::any::AnyRow) -> Result<Self, sqlx::Error> {
        let last_activity_raw: String = row.try_get("last_activity_at")?;
        Ok(Self {
            id: row.try_get("id")?,
            last_message_id: row.try_get("last_message_id")?,
            last_activity_at: datetime_from_db_text(&last_activity_raw)?,
            recipient_id: row.try_get("recipient_id")?,
            recipient_username: row.try_get("recipient_username")?,
            recipient_avatar_url: row.try_get("recipient_avatar_url")?,
        })
    }
}

pub async fn find_between(
    pool: &DbPool,
    user_a: i64,
    user_b: i64,
) -> Result<Option<ThreadRow>, DbError> {
    let (low, high) = normalize_pair(user_a, user_b);
    let row = sqlx::query_as::<_, ThreadRow>(
        "SELECT id, user_low, user_high, last_message_id, last_activity_at
         FROM threads
         WHERE user_low = $1 AND user_high = $2",
    )
    .bind(low)
    .bind(high)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn get_thread(pool: &DbPool, id: i64) -> Result<Option<ThreadRow>, DbError> {
    let row = sqlx::query_as::<_, ThreadRow>(
        "SELECT id, user_low, user_high, last_message_id, last_activity_at
         FROM threads
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Look up the thread for an unordered pair, creating it if missing.
/// Concurrent first-contact creators race on the unique pair index; the
/// loser's insert fails with a unique violation and is retried as a lookup.
pub async fn find_or_create(
    pool: &DbPool,
    new_thread_id: i64,
    user_a: i64,
    user_b: i64,
) -> Result<ThreadRow, DbError> {
    if let Some(existing) = find_between(pool, user_a, user_b).await? {
        return Ok(existing);
    }

    let (low, high) = normalize_pair(user_a, user_b);
    match sqlx::query_as::<_, ThreadRow>(
        "INSERT INTO threads (id, user_low, user_high)
         VALUES ($1, $2, $3)
         RETURNING id, user_low, user_high, last_message_id, last_activity_at",
    )
    .bind(new_thread_id)
    .bind(low)
    .bind(high)
    .fetch_one(pool)
    .await
    {
        Ok(row) => Ok(row),
        Err(err) if is_pair_unique_violation(&err) => {
            find_between(pool, user_a, user_b)
                .await?
                .ok_or(DbError::Sqlx(err))
        }
        Err(err) => Err(DbError::Sqlx(err)),
    }
}

fn is_pair_unique_violation(err: &sqlx::Error) -> bool {
    let sqlx::Error::Database(db_err) = err else {
        return false;
    };

    let code_binding = db_err.code();
    let code = code_binding.as_deref().unwrap_or_default();
    if code == "23505" || code == "2067" || code == "1555" {
        return true;
    }

    let message = db_err.message().to_ascii_lowercase();
    message.contains("idx_threads_pair_unique")
}

/// All threads a user participates in, most recently active first.
pub async fn list_for_user(
    pool: &DbPool,
    user_id: i64,
) -> Result<Vec<ThreadWithRecipientRow>, DbError> {
    let rows = sqlx::query_as::<_, ThreadWithRecipientRow>(
        "SELECT t.id, t.last_message_id, t.last_activity_at,
                u.id AS recipient_id,
                u.username AS recipient_username,
                u.avatar_url AS recipient_avatar_url
         FROM threads t
         INNER JOIN users u
                 ON u.id = CASE WHEN t.user_low = $1 THEN t.user_high ELSE t.user_low END
         WHERE t.user_low = $1 OR t.user_high = $1
         ORDER BY CASE WHEN t.last_message_id IS NULL THEN 1 ELSE 0 END,
                  t.last_activity_at DESC, t.id DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations, users};

    async fn test_pool() -> DbPool {
        let pool = create_pool("sqlite::memory:", 1).await.expect("pool");
        run_migrations(&pool).await.expect("migrations");
        users::create_user(&pool, 1, "alice", None)
            .await
            .expect("alice");
        users::create_user(&pool, 2, "bob", Some("https://cdn.example.com/bob.png"))
            .await
            .expect("bob");
        pool
    }

    #[tokio::test]
    async fn find_or_create_is_order_independent() {
        let pool = test_pool().await;

        let forward = find_or_create(&pool, 100, 1, 2).await.expect("create");
        let reverse = find_or_create(&pool, 101, 2, 1).await.expect("lookup");

        assert_eq!(forward.id, reverse.id);
        assert_eq!(forward.user_low, 1);
        assert_eq!(forward.user_high, 2);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM threads")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn concurrent_first_contact_converges_to_one_thread() {
        let pool = test_pool().await;

        let a = {
            let pool = pool.clone();
            tokio::spawn(async move { find_or_create(&pool, 200, 1, 2).await })
        };
        let b = {
            let pool = pool.clone();
            tokio::spawn(async move { find_or_create(&pool, 201, 2, 1).await })
        };

        let thread_a = a.await.expect("join").expect("find_or_create a");
        let thread_b = b.await.expect("join").expect("find_or_create b");
        assert_eq!(thread_a.id, thread_b.id);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM threads")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn duplicate_insert_is_retried_as_lookup() {
        let pool = test_pool().await;

        let first = find_or_create(&pool, 300, 1, 2).await.expect("first");

        // Force the insert path even though the thread exists.
        let err = sqlx::query("INSERT INTO threads (id, user_low, user_high) VALUES (301, 1, 2)")
            .execute(&pool)
            .await
            .expect_err("unique violation");
        assert!(is_pair_unique_violation(&err));

        let second = find_or_create(&pool, 302, 2, 1).await.expect("second");
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn inbox_lists_other_participant_snapshot() {
        let pool = test_pool().await;
        find_or_create(&pool, 400, 1, 2).await.expect("thread");

        let inbox = list_for_user(&pool, 1).await.expect("inbox");
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].recipient_id, 2);
        assert_eq!(inbox[0].recipient_username, "bob");

        let inbox_bob = list_for_user(&pool, 2).await.expect("inbox bob");
        assert_eq!(inbox_bob[0].recipient_username, "alice");
    }
}
