//! Book database repository

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use super::sqlite_helpers::{
    decode_err, json_array_contains_sql, json_to_vec, now_iso8601, str_to_datetime, str_to_uuid,
    uuid_to_str, vec_to_json,
};
use super::store::ScanRange;

const BOOK_COLUMNS: &str =
    "seq, id, title, published, author_name, author_id, genres, created_at, updated_at";

/// Book record from database
#[derive(Debug, Clone, PartialEq)]
pub struct BookRecord {
    /// Store-assigned insert sequence; the sort and resume key
    pub seq: i64,
    pub id: Uuid,
    pub title: String,
    pub published: i32,
    pub author_name: String,
    pub author_id: Option<Uuid>,
    pub genres: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl sqlx::FromRow<'_, sqlx::sqlite::SqliteRow> for BookRecord {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> sqlx::Result<Self> {
        use sqlx::Row;

        let id_str: String = row.try_get("id")?;
        let author_id_str: Option<String> = row.try_get("author_id")?;
        let created_str: String = row.try_get("created_at")?;
        let updated_str: String = row.try_get("updated_at")?;

        // JSON array stored as TEXT
        let genres_json: String = row.try_get("genres")?;

        Ok(Self {
            seq: row.try_get("seq")?,
            id: str_to_uuid(&id_str).map_err(decode_err)?,
            title: row.try_get("title")?,
            published: row.try_get("published")?,
            author_name: row.try_get("author_name")?,
            author_id: author_id_str
                .map(|s| str_to_uuid(&s))
                .transpose()
                .map_err(decode_err)?,
            genres: json_to_vec(&genres_json),
            created_at: str_to_datetime(&created_str).map_err(decode_err)?,
            updated_at: str_to_datetime(&updated_str).map_err(decode_err)?,
        })
    }
}

/// Input for creating a new book
#[derive(Debug, Clone)]
pub struct CreateBook {
    pub title: String,
    pub published: i32,
    pub author_name: String,
    pub author_id: Option<Uuid>,
    pub genres: Vec<String>,
}

/// Conjunctive filter over books. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    pub id: Option<Uuid>,
    pub ids: Option<Vec<Uuid>>,
    pub title: Option<String>,
    pub author_name: Option<String>,
    pub genre: Option<String>,
}

impl BookFilter {
    pub fn by_title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn by_title_and_author(title: impl Into<String>, author_name: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            author_name: Some(author_name.into()),
            ..Default::default()
        }
    }

    pub fn by_ids(ids: Vec<Uuid>) -> Self {
        Self {
            ids: Some(ids),
            ..Default::default()
        }
    }

    fn push_where<'a>(&'a self, qb: &mut QueryBuilder<'a, Sqlite>) {
        qb.push(" WHERE 1=1");
        if let Some(id) = self.id {
            qb.push(" AND id = ").push_bind(uuid_to_str(id));
        }
        if let Some(ids) = &self.ids {
            if ids.is_empty() {
                qb.push(" AND 1=0");
            } else {
                qb.push(" AND id IN (");
                let mut separated = qb.separated(", ");
                for id in ids {
                    separated.push_bind(uuid_to_str(*id));
                }
                separated.push_unseparated(")");
            }
        }
        if let Some(title) = &self.title {
            qb.push(" AND title = ").push_bind(title.as_str());
        }
        if let Some(author_name) = &self.author_name {
            qb.push(" AND author_name = ").push_bind(author_name.as_str());
        }
        if let Some(genre) = &self.genre {
            qb.push(" AND ")
                .push(json_array_contains_sql("books.genres"))
                .push_bind(genre.as_str())
                .push(")");
        }
    }
}

/// Repository for book rows
pub struct BookRepository {
    pool: SqlitePool,
}

impl BookRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// First book matching the filter, in insert order
    pub async fn find_one(&self, filter: &BookFilter) -> Result<Option<BookRecord>> {
        let mut rows = self.find(filter, ScanRange::first(1)).await?;
        Ok(if rows.is_empty() { None } else { Some(rows.remove(0)) })
    }

    /// Books matching the filter in ascending `seq` order, restricted to `range`
    pub async fn find(&self, filter: &BookFilter, range: ScanRange) -> Result<Vec<BookRecord>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {BOOK_COLUMNS} FROM books"));
        filter.push_where(&mut qb);
        range.push_sql(&mut qb);

        let rows = qb
            .build_query_as::<BookRecord>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn count(&self, filter: &BookFilter) -> Result<i64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM books");
        filter.push_where(&mut qb);

        let (count,): (i64,) = qb.build_query_as().fetch_one(&self.pool).await?;
        Ok(count)
    }

    /// Insert unless a book with the same `(title, author_name)` exists.
    /// Returns the stored row and whether this call created it.
    pub async fn insert_if_absent(&self, book: CreateBook) -> Result<(BookRecord, bool)> {
        let now = now_iso8601();

        let result = sqlx::query(
            r#"
            INSERT INTO books (id, title, published, author_name, author_id, genres, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(title, author_name) DO NOTHING
            "#,
        )
        .bind(uuid_to_str(Uuid::new_v4()))
        .bind(&book.title)
        .bind(book.published)
        .bind(&book.author_name)
        .bind(book.author_id.map(uuid_to_str))
        .bind(vec_to_json(&book.genres))
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let created = result.rows_affected() == 1;
        let record = self
            .find_one(&BookFilter::by_title_and_author(&book.title, &book.author_name))
            .await?
            .ok_or_else(|| anyhow::anyhow!("Book '{}' vanished after insert", book.title))?;

        Ok((record, created))
    }
}
