//! Author database repository
//!
//! An author's book list lives in `author_books`, one row per link, ordered by
//! insertion. Links are unique per `(author_id, book_id)`.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use super::sqlite_helpers::{
    decode_err, json_to_vec, now_iso8601, str_to_datetime, str_to_uuid, uuid_to_str,
};
use super::store::ScanRange;

const AUTHOR_SELECT: &str = r#"
    SELECT a.seq, a.id, a.name, a.born, a.created_at, a.updated_at,
        (SELECT json_group_array(book_id) FROM
            (SELECT book_id FROM author_books WHERE author_id = a.id ORDER BY entry)
        ) AS book_ids
    FROM authors a"#;

/// Author record from database
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorRecord {
    pub seq: i64,
    pub id: Uuid,
    pub name: String,
    pub born: Option<i32>,
    /// Owned books in the order they were linked
    pub book_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl sqlx::FromRow<'_, sqlx::sqlite::SqliteRow> for AuthorRecord {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> sqlx::Result<Self> {
        use sqlx::Row;

        let id_str: String = row.try_get("id")?;
        let created_str: String = row.try_get("created_at")?;
        let updated_str: String = row.try_get("updated_at")?;
        let book_ids_json: Option<String> = row.try_get("book_ids")?;

        let book_ids = json_to_vec::<String>(book_ids_json.as_deref().unwrap_or("[]"))
            .iter()
            .map(|s| str_to_uuid(s))
            .collect::<Result<Vec<_>>>()
            .map_err(decode_err)?;

        Ok(Self {
            seq: row.try_get("seq")?,
            id: str_to_uuid(&id_str).map_err(decode_err)?,
            name: row.try_get("name")?,
            born: row.try_get("born")?,
            book_ids,
            created_at: str_to_datetime(&created_str).map_err(decode_err)?,
            updated_at: str_to_datetime(&updated_str).map_err(decode_err)?,
        })
    }
}

/// Input for creating a new author
#[derive(Debug, Clone)]
pub struct CreateAuthor {
    pub name: String,
    pub born: Option<i32>,
}

impl CreateAuthor {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            born: None,
        }
    }
}

/// Fields of an author that can be edited
#[derive(Debug, Clone, Default)]
pub struct UpdateAuthor {
    pub born: Option<i32>,
}

#[derive(Debug, Clone)]
pub enum AuthorFilter {
    Id(Uuid),
    Name(String),
}

/// Repository for author rows and their book links
pub struct AuthorRepository {
    pool: SqlitePool,
}

impl AuthorRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_one(&self, filter: &AuthorFilter) -> Result<Option<AuthorRecord>> {
        let mut qb = QueryBuilder::<Sqlite>::new(AUTHOR_SELECT);
        match filter {
            AuthorFilter::Id(id) => qb.push(" WHERE a.id = ").push_bind(uuid_to_str(*id)),
            AuthorFilter::Name(name) => qb.push(" WHERE a.name = ").push_bind(name.as_str()),
        };

        let row = qb
            .build_query_as::<AuthorRecord>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Authors with any of `ids`, in one query
    pub async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<AuthorRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new(AUTHOR_SELECT);
        qb.push(" WHERE a.id IN (");
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(uuid_to_str(*id));
        }
        separated.push_unseparated(")");

        let rows = qb
            .build_query_as::<AuthorRecord>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Authors in ascending `seq` order, restricted to `range`
    pub async fn find(&self, range: ScanRange) -> Result<Vec<AuthorRecord>> {
        let mut qb = QueryBuilder::<Sqlite>::new(AUTHOR_SELECT);
        qb.push(" WHERE 1=1");
        range.push_sql(&mut qb);

        let rows = qb
            .build_query_as::<AuthorRecord>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM authors")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Atomic find-or-create keyed on the unique author name.
    /// Returns the stored row and whether this call created it.
    pub async fn insert_if_absent(&self, author: CreateAuthor) -> Result<(AuthorRecord, bool)> {
        let now = now_iso8601();

        let result = sqlx::query(
            r#"
            INSERT INTO authors (id, name, born, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(name) DO NOTHING
            "#,
        )
        .bind(uuid_to_str(Uuid::new_v4()))
        .bind(&author.name)
        .bind(author.born)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let created = result.rows_affected() == 1;
        let record = self
            .find_one(&AuthorFilter::Name(author.name.clone()))
            .await?
            .ok_or_else(|| anyhow::anyhow!("Author '{}' vanished after insert", author.name))?;

        Ok((record, created))
    }

    /// Apply an edit; returns `None` when no author has this id
    pub async fn update(&self, id: Uuid, update: UpdateAuthor) -> Result<Option<AuthorRecord>> {
        let result = sqlx::query("UPDATE authors SET born = ?, updated_at = ? WHERE id = ?")
            .bind(update.born)
            .bind(now_iso8601())
            .bind(uuid_to_str(id))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_one(&AuthorFilter::Id(id)).await
    }

    /// Append `book_id` to the author's list unless it is already there.
    ///
    /// The link is only written when the book references this author, so the
    /// list can never hold a foreign book. Returns whether a link was added.
    pub async fn push_book_if_absent(&self, author_id: Uuid, book_id: Uuid) -> Result<bool> {
        let author_id = uuid_to_str(author_id);
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO author_books (author_id, book_id)
            SELECT ?, id FROM books WHERE id = ? AND author_id = ?
            "#,
        )
        .bind(&author_id)
        .bind(uuid_to_str(book_id))
        .bind(&author_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
