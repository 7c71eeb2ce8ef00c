use crate::{datetime_from_db_text, DbError, DbPool};
use chrono::{DateTime, Utc};
use linkup_models::user::UserSnapshot;
use sqlx::Row;

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::any::AnyRow> for UserRow {
    fn from_row(row: &'r sqlx::any::AnyRow) -> Result<Self, sqlx::Error> {
        let created_at_raw: String = row.try_get("created_at")?;
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            avatar_url: row.try_get("avatar_url")?,
            created_at: datetime_from_db_text(&created_at_raw)?,
        })
    }
}

impl UserRow {
    pub fn snapshot(&self) -> UserSnapshot {
        UserSnapshot {
            id: self.id,
            username: self.username.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

pub async fn create_user(
    pool: &DbPool,
    id: i64,
    username: &str,
    avatar_url: Option<&str>,
) -> Result<UserRow, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (id, username, avatar_url)
         VALUES ($1, $2, $3)
         RETURNING id, username, avatar_url, created_at",
    )
    .bind(id)
    .bind(username)
    .bind(avatar_url)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn get_user_by_id(pool: &DbPool, id: i64) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, avatar_url, created_at FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Display fields for notification payloads, captured at call time.
pub async fn get_user_snapshot(pool: &DbPool, id: i64) -> Result<Option<UserSnapshot>, DbError> {
    Ok(get_user_by_id(pool, id).await?.map(|row| row.snapshot()))
}
