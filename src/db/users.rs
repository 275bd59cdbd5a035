//! Users repository for authentication

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::sqlite_helpers::{decode_err, now_iso8601, str_to_datetime, str_to_uuid, uuid_to_str};

const USER_SELECT: &str =
    "SELECT id, username, password_hash, favorite_genre, created_at, updated_at FROM users";

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub favorite_genre: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl sqlx::FromRow<'_, sqlx::sqlite::SqliteRow> for UserRecord {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> sqlx::Result<Self> {
        use sqlx::Row;

        let id_str: String = row.try_get("id")?;
        let created_str: String = row.try_get("created_at")?;
        let updated_str: String = row.try_get("updated_at")?;

        Ok(Self {
            id: str_to_uuid(&id_str).map_err(decode_err)?,
            username: row.try_get("username")?,
            password_hash: row.try_get("password_hash")?,
            favorite_genre: row.try_get("favorite_genre")?,
            created_at: str_to_datetime(&created_str).map_err(decode_err)?,
            updated_at: str_to_datetime(&updated_str).map_err(decode_err)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub password_hash: String,
    pub favorite_genre: String,
}

#[derive(Debug, Clone)]
pub enum UserFilter {
    Id(Uuid),
    Username(String),
}

pub struct UsersRepository {
    pool: SqlitePool,
}

impl UsersRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_one(&self, filter: &UserFilter) -> Result<Option<UserRecord>> {
        let (column, value) = match filter {
            UserFilter::Id(id) => ("id", uuid_to_str(*id)),
            UserFilter::Username(username) => ("username", username.clone()),
        };
        let sql = format!("{USER_SELECT} WHERE {column} = ?");

        let row = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Create a user unless the username is taken.
    /// Returns the stored row and whether this call created it.
    pub async fn insert_if_absent(&self, user: CreateUser) -> Result<(UserRecord, bool)> {
        let now = now_iso8601();

        let result = sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash, favorite_genre, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(username) DO NOTHING
            "#,
        )
        .bind(uuid_to_str(Uuid::new_v4()))
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.favorite_genre)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let created = result.rows_affected() == 1;
        let record = self
            .find_one(&UserFilter::Username(user.username.clone()))
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to create user"))?;

        Ok((record, created))
    }
}
