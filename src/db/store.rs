//! Entity store abstraction consumed by the catalog and auth services
//!
//! Every mutation is a single atomic statement (conditional insert, keyed
//! update, push-if-absent) so concurrent callers never lose updates.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

use super::Database;
use super::authors::{AuthorFilter, AuthorRecord, CreateAuthor, UpdateAuthor};
use super::books::{BookFilter, BookRecord, CreateBook};
use super::users::{CreateUser, UserFilter, UserRecord};

/// Window of an ascending-`seq` scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanRange {
    /// Only rows with `seq` strictly greater than this
    pub after_seq: Option<i64>,
    pub offset: i64,
    /// `None` scans to the end
    pub limit: Option<i64>,
}

impl ScanRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn first(limit: i64) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Append the `seq` bound, ordering and limits. Expects an open `WHERE` clause.
    pub(crate) fn push_sql(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        if let Some(after) = self.after_seq {
            qb.push(" AND seq > ").push_bind(after);
        }
        qb.push(" ORDER BY seq ASC");
        match self.limit {
            Some(limit) => {
                qb.push(" LIMIT ").push_bind(limit);
                qb.push(" OFFSET ").push_bind(self.offset);
            }
            None if self.offset > 0 => {
                qb.push(" LIMIT -1 OFFSET ").push_bind(self.offset);
            }
            None => {}
        }
    }
}

#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn find_book(&self, filter: &BookFilter) -> Result<Option<BookRecord>>;

    async fn find_books(&self, filter: &BookFilter, range: ScanRange) -> Result<Vec<BookRecord>>;

    async fn count_books(&self, filter: &BookFilter) -> Result<i64>;

    /// Conditional insert keyed on `(title, author_name)`
    async fn insert_book_if_absent(&self, book: CreateBook) -> Result<(BookRecord, bool)>;

    async fn find_author(&self, filter: &AuthorFilter) -> Result<Option<AuthorRecord>>;

    async fn find_authors(&self, range: ScanRange) -> Result<Vec<AuthorRecord>>;

    async fn find_authors_by_ids(&self, ids: &[Uuid]) -> Result<Vec<AuthorRecord>>;

    async fn count_authors(&self) -> Result<i64>;

    /// Conditional insert keyed on the author name
    async fn insert_author_if_absent(&self, author: CreateAuthor) -> Result<(AuthorRecord, bool)>;

    async fn update_author(&self, id: Uuid, update: UpdateAuthor) -> Result<Option<AuthorRecord>>;

    /// Idempotent append to an author's book list
    async fn push_author_book_if_absent(&self, author_id: Uuid, book_id: Uuid) -> Result<bool>;

    async fn find_user(&self, filter: &UserFilter) -> Result<Option<UserRecord>>;

    /// Conditional insert keyed on the username
    async fn insert_user_if_absent(&self, user: CreateUser) -> Result<(UserRecord, bool)>;
}

#[async_trait]
impl EntityStore for Database {
    async fn find_book(&self, filter: &BookFilter) -> Result<Option<BookRecord>> {
        self.books().find_one(filter).await
    }

    async fn find_books(&self, filter: &BookFilter, range: ScanRange) -> Result<Vec<BookRecord>> {
        self.books().find(filter, range).await
    }

    async fn count_books(&self, filter: &BookFilter) -> Result<i64> {
        self.books().count(filter).await
    }

    async fn insert_book_if_absent(&self, book: CreateBook) -> Result<(BookRecord, bool)> {
        self.books().insert_if_absent(book).await
    }

    async fn find_author(&self, filter: &AuthorFilter) -> Result<Option<AuthorRecord>> {
        self.authors().find_one(filter).await
    }

    async fn find_authors(&self, range: ScanRange) -> Result<Vec<AuthorRecord>> {
        self.authors().find(range).await
    }

    async fn find_authors_by_ids(&self, ids: &[Uuid]) -> Result<Vec<AuthorRecord>> {
        self.authors().find_by_ids(ids).await
    }

    async fn count_authors(&self) -> Result<i64> {
        self.authors().count().await
    }

    async fn insert_author_if_absent(&self, author: CreateAuthor) -> Result<(AuthorRecord, bool)> {
        self.authors().insert_if_absent(author).await
    }

    async fn update_author(&self, id: Uuid, update: UpdateAuthor) -> Result<Option<AuthorRecord>> {
        self.authors().update(id, update).await
    }

    async fn push_author_book_if_absent(&self, author_id: Uuid, book_id: Uuid) -> Result<bool> {
        self.authors().push_book_if_absent(author_id, book_id).await
    }

    async fn find_user(&self, filter: &UserFilter) -> Result<Option<UserRecord>> {
        self.users().find_one(filter).await
    }

    async fn insert_user_if_absent(&self, user: CreateUser) -> Result<(UserRecord, bool)> {
        self.users().insert_if_absent(user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> Database {
        Database::connect_in_memory().await.unwrap()
    }

    fn dune(author_id: Option<Uuid>) -> CreateBook {
        CreateBook {
            title: "Dune".to_string(),
            published: 1965,
            author_name: "Frank Herbert".to_string(),
            author_id,
            genres: vec!["scifi".to_string()],
        }
    }

    #[tokio::test]
    async fn test_insert_author_if_absent_is_keyed_on_name() {
        let db = store().await;

        let (first, created) = db
            .insert_author_if_absent(CreateAuthor::named("Frank Herbert"))
            .await
            .unwrap();
        assert!(created);

        let (second, created) = db
            .insert_author_if_absent(CreateAuthor::named("Frank Herbert"))
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);
        assert_eq!(db.count_authors().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_book_if_absent_is_keyed_on_title_and_author() {
        let db = store().await;

        let (book, created) = db.insert_book_if_absent(dune(None)).await.unwrap();
        assert!(created);
        assert_eq!(book.genres, vec!["scifi".to_string()]);

        let (again, created) = db.insert_book_if_absent(dune(None)).await.unwrap();
        assert!(!created);
        assert_eq!(book.id, again.id);

        let mut other_author = dune(None);
        other_author.author_name = "Someone Else".to_string();
        let (_, created) = db.insert_book_if_absent(other_author).await.unwrap();
        assert!(created);
        assert_eq!(db.count_books(&BookFilter::default()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_find_authors_by_ids() {
        let db = store().await;
        let mut ids = Vec::new();
        for name in ["Frank Herbert", "Isaac Asimov", "Dan Simmons"] {
            let (author, _) = db
                .insert_author_if_absent(CreateAuthor::named(name))
                .await
                .unwrap();
            ids.push(author.id);
        }

        let found = db.find_authors_by_ids(&[ids[2], ids[0]]).await.unwrap();
        let mut names: Vec<_> = found.into_iter().map(|a| a.name).collect();
        names.sort();
        assert_eq!(names, vec!["Dan Simmons", "Frank Herbert"]);

        assert!(db.find_authors_by_ids(&[]).await.unwrap().is_empty());
        assert!(db.find_authors_by_ids(&[Uuid::new_v4()]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_push_if_absent_is_idempotent() {
        let db = store().await;
        let (author, _) = db
            .insert_author_if_absent(CreateAuthor::named("Frank Herbert"))
            .await
            .unwrap();
        let (book, _) = db.insert_book_if_absent(dune(Some(author.id))).await.unwrap();

        assert!(db.push_author_book_if_absent(author.id, book.id).await.unwrap());
        assert!(!db.push_author_book_if_absent(author.id, book.id).await.unwrap());

        let author = db
            .find_author(&AuthorFilter::Id(author.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(author.book_ids, vec![book.id]);
    }

    #[tokio::test]
    async fn test_push_rejects_book_of_another_author() {
        let db = store().await;
        let (author, _) = db
            .insert_author_if_absent(CreateAuthor::named("Frank Herbert"))
            .await
            .unwrap();
        let (book, _) = db.insert_book_if_absent(dune(None)).await.unwrap();

        assert!(!db.push_author_book_if_absent(author.id, book.id).await.unwrap());
        let author = db
            .find_author(&AuthorFilter::Name("Frank Herbert".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert!(author.book_ids.is_empty());
    }

    #[tokio::test]
    async fn test_scan_range_orders_by_seq() {
        let db = store().await;
        for name in ["Alpha Author", "Bravo Author", "Charlie Author", "Delta Author"] {
            db.insert_author_if_absent(CreateAuthor::named(name))
                .await
                .unwrap();
        }

        let all = db.find_authors(ScanRange::all()).await.unwrap();
        assert_eq!(all.len(), 4);
        assert!(all.windows(2).all(|w| w[0].seq < w[1].seq));

        let after = db
            .find_authors(ScanRange {
                after_seq: Some(all[1].seq),
                offset: 0,
                limit: Some(10),
            })
            .await
            .unwrap();
        let names: Vec<_> = after.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Charlie Author", "Delta Author"]);

        let skipped = db
            .find_authors(ScanRange {
                after_seq: None,
                offset: 3,
                limit: None,
            })
            .await
            .unwrap();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].name, "Delta Author");
    }

    #[tokio::test]
    async fn test_book_filters() {
        let db = store().await;
        let mut fantasy = dune(None);
        fantasy.title = "The Hobbit".to_string();
        fantasy.author_name = "J. R. R. Tolkien".to_string();
        fantasy.genres = vec!["fantasy".to_string(), "classic".to_string()];
        let (hobbit, _) = db.insert_book_if_absent(fantasy).await.unwrap();
        let (dune, _) = db.insert_book_if_absent(dune(None)).await.unwrap();

        let classics = db
            .find_books(
                &BookFilter {
                    genre: Some("classic".to_string()),
                    ..Default::default()
                },
                ScanRange::all(),
            )
            .await
            .unwrap();
        assert_eq!(classics, vec![hobbit.clone()]);

        let by_ids = db
            .find_books(&BookFilter::by_ids(vec![dune.id, hobbit.id]), ScanRange::all())
            .await
            .unwrap();
        assert_eq!(by_ids.len(), 2);

        let none = db
            .find_books(&BookFilter::by_ids(vec![]), ScanRange::all())
            .await
            .unwrap();
        assert!(none.is_empty());

        let found = db.find_book(&BookFilter::by_title("Dune")).await.unwrap();
        assert_eq!(found.map(|b| b.id), Some(dune.id));
    }

    #[tokio::test]
    async fn test_update_author() {
        let db = store().await;
        let (author, _) = db
            .insert_author_if_absent(CreateAuthor::named("Frank Herbert"))
            .await
            .unwrap();

        let updated = db
            .update_author(author.id, UpdateAuthor { born: Some(1920) })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.born, Some(1920));

        let missing = db
            .update_author(Uuid::new_v4(), UpdateAuthor { born: Some(1) })
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
