//! Catalog operations over books and authors
//!
//! `add_book` keeps three guards in place so concurrent and retried calls stay
//! consistent without a transaction:
//! - authors are found-or-created by unique name in one statement
//! - books are inserted only if `(title, author_name)` is free
//! - the author's book list is appended with push-if-absent
//!
//! Whichever call adds the link reports the book as added and publishes the
//! event; every other call for the same pair gets a duplicate error.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::db::{
    AuthorFilter, AuthorRecord, BookFilter, BookRecord, CreateAuthor, CreateBook, EntityStore,
    ScanRange, UpdateAuthor,
};

use super::auth::Actor;
use super::error::{CatalogError, CatalogResult};
use super::events::{CatalogEvent, NotificationEmitter};
use super::pagination::{MAX_PAGE_SIZE, Page, paginate, paginate_offset};

const MIN_TITLE_LEN: usize = 2;
const DUPLICATE_BOOK: &str = "Sorry! book already exists";

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Largest `limit` accepted by paginated reads
    pub max_page_size: i64,
    /// Fixed page size of `search_books`
    pub search_page_size: i64,
    pub min_author_name_len: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_page_size: MAX_PAGE_SIZE,
            search_page_size: 25,
            min_author_name_len: 4,
        }
    }
}

/// Arguments of `add_book`
#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub published: i32,
    pub author: String,
    pub genres: Vec<String>,
}

pub struct CatalogService {
    store: Arc<dyn EntityStore>,
    events: Arc<dyn NotificationEmitter>,
    config: CatalogConfig,
}

impl CatalogService {
    pub fn new(
        store: Arc<dyn EntityStore>,
        events: Arc<dyn NotificationEmitter>,
        config: CatalogConfig,
    ) -> Self {
        Self {
            store,
            events,
            config,
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Add a book, creating its author on first use.
    ///
    /// A book left unlinked by an earlier failed attempt is linked and
    /// returned instead of being rejected as a duplicate.
    pub async fn add_book(
        &self,
        input: NewBook,
        actor: Option<&Actor>,
    ) -> CatalogResult<BookRecord> {
        let actor = actor.ok_or(CatalogError::Unauthenticated)?;
        self.validate_new_book(&input)?;

        let existing = self
            .store
            .find_book(&BookFilter::by_title_and_author(&input.title, &input.author))
            .await?;
        if let Some(book) = existing {
            return self.resume_link(book).await;
        }

        let (author, author_created) = self
            .store
            .insert_author_if_absent(CreateAuthor::named(&input.author))
            .await?;
        if author_created {
            tracing::info!(author_id = %author.id, name = %author.name, "Author created");
        }

        let (book, book_created) = self
            .store
            .insert_book_if_absent(CreateBook {
                title: input.title.clone(),
                published: input.published,
                author_name: input.author.clone(),
                author_id: Some(author.id),
                genres: input.genres.clone(),
            })
            .await
            .map_err(|e| {
                if author_created {
                    commit_failed(&input.title, &input.author, Some(author.id), None, e)
                } else {
                    CatalogError::Store(e)
                }
            })?;

        if !book_created {
            // Another writer inserted the same pair since the duplicate check
            tracing::debug!(title = %input.title, author = %input.author, "Lost insert race");
            return Err(CatalogError::validation(DUPLICATE_BOOK));
        }

        let pushed = self
            .store
            .push_author_book_if_absent(author.id, book.id)
            .await
            .map_err(|e| {
                commit_failed(&book.title, &book.author_name, Some(author.id), Some(book.id), e)
            })?;
        if !pushed {
            // A concurrent retry saw the unlinked book and linked it; that call reports it
            return Err(CatalogError::validation(DUPLICATE_BOOK));
        }

        tracing::info!(
            book_id = %book.id,
            author_id = %author.id,
            title = %book.title,
            user = %actor.username,
            "Book added"
        );
        self.events.publish(CatalogEvent::BookAdded(book.clone()));
        Ok(book)
    }

    /// Set an author's birth year. Unknown names give `Ok(None)`.
    pub async fn edit_author(
        &self,
        name: &str,
        born: i32,
        actor: Option<&Actor>,
    ) -> CatalogResult<Option<AuthorRecord>> {
        let actor = actor.ok_or(CatalogError::Unauthenticated)?;

        let Some(author) = self
            .store
            .find_author(&AuthorFilter::Name(name.to_string()))
            .await?
        else {
            return Ok(None);
        };

        let updated = self
            .store
            .update_author(author.id, UpdateAuthor { born: Some(born) })
            .await?;
        if let Some(updated) = &updated {
            tracing::info!(
                author_id = %updated.id,
                born = ?updated.born,
                user = %actor.username,
                "Author edited"
            );
        }
        Ok(updated)
    }

    fn validate_new_book(&self, input: &NewBook) -> CatalogResult<()> {
        if input.title.trim().chars().count() < MIN_TITLE_LEN {
            return Err(CatalogError::validation(format!(
                "Title must be at least {MIN_TITLE_LEN} characters"
            )));
        }
        let min = self.config.min_author_name_len;
        if input.author.trim().chars().count() < min {
            return Err(CatalogError::validation(format!(
                "Author name must be at least {min} characters"
            )));
        }
        if input.genres.is_empty() {
            return Err(CatalogError::validation("One or more genre is required!"));
        }
        if input.genres.iter().any(|g| g.trim().is_empty()) {
            return Err(CatalogError::validation("Genres must not be blank"));
        }
        Ok(())
    }

    /// Handle a create request for a pair that is already stored.
    ///
    /// A fully linked book is a duplicate. A book its author does not list yet
    /// is the remains of a failed attempt: link it and report it as added.
    async fn resume_link(&self, book: BookRecord) -> CatalogResult<BookRecord> {
        let Some(author_id) = book.author_id else {
            return Err(CatalogError::validation(DUPLICATE_BOOK));
        };

        let linked = self
            .store
            .find_author(&AuthorFilter::Id(author_id))
            .await?
            .is_some_and(|author| author.book_ids.contains(&book.id));
        if linked {
            return Err(CatalogError::validation(DUPLICATE_BOOK));
        }

        let pushed = self
            .store
            .push_author_book_if_absent(author_id, book.id)
            .await
            .map_err(|e| {
                commit_failed(&book.title, &book.author_name, Some(author_id), Some(book.id), e)
            })?;
        if !pushed {
            // A concurrent retry linked it first
            return Err(CatalogError::validation(DUPLICATE_BOOK));
        }

        tracing::info!(book_id = %book.id, author_id = %author_id, "Resumed unlinked book");
        self.events.publish(CatalogEvent::BookAdded(book.clone()));
        Ok(book)
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    pub async fn book_count(&self) -> CatalogResult<i64> {
        Ok(self.store.count_books(&BookFilter::default()).await?)
    }

    pub async fn authors_count(&self) -> CatalogResult<i64> {
        Ok(self.store.count_authors().await?)
    }

    pub async fn book_by_title(&self, title: &str) -> CatalogResult<Option<BookRecord>> {
        Ok(self.store.find_book(&BookFilter::by_title(title)).await?)
    }

    /// Offset page of all books in insert order
    pub async fn books_page(&self, page: i64, limit: i64) -> CatalogResult<Page<BookRecord>> {
        let store = &self.store;
        paginate_offset(page, limit, self.config.max_page_size, |range| async move {
            store.find_books(&BookFilter::default(), range).await
        })
        .await
    }

    /// Ids that do not parse are lookup misses
    pub async fn author_by_id(&self, id: &str) -> CatalogResult<Option<AuthorRecord>> {
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(None);
        };
        Ok(self.store.find_author(&AuthorFilter::Id(id)).await?)
    }

    /// Cursor page of authors in insert order
    pub async fn authors_page(
        &self,
        cursor: Option<&str>,
        limit: i64,
    ) -> CatalogResult<Page<AuthorRecord>> {
        let store = &self.store;
        paginate(cursor, limit, self.config.max_page_size, |range| async move {
            store.find_authors(range).await
        })
        .await
    }

    /// Books by exact author name and/or genre.
    ///
    /// `None` when no filter is given or nothing matches after `cursor`.
    pub async fn search_books(
        &self,
        author: Option<&str>,
        genre: Option<&str>,
        cursor: Option<&str>,
    ) -> CatalogResult<Option<Page<BookRecord>>> {
        if author.is_none() && genre.is_none() {
            return Ok(None);
        }
        let filter = BookFilter {
            author_name: author.map(str::to_string),
            genre: genre.map(str::to_string),
            ..Default::default()
        };

        let store = &self.store;
        let filter = &filter;
        let size = self.config.search_page_size;
        let page = paginate(cursor, size, size, |range| async move {
            store.find_books(filter, range).await
        })
        .await?;

        Ok((!page.is_empty()).then_some(page))
    }

    /// Authors keyed by id; ids with no author are absent from the map
    pub async fn authors_by_ids(
        &self,
        ids: &[Uuid],
    ) -> CatalogResult<HashMap<Uuid, AuthorRecord>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = self.store.find_authors_by_ids(ids).await?;
        Ok(rows.into_iter().map(|a| (a.id, a)).collect())
    }

    /// Books keyed by id; ids with no book are absent from the map
    pub async fn books_by_ids(&self, ids: &[Uuid]) -> CatalogResult<HashMap<Uuid, BookRecord>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = self
            .store
            .find_books(&BookFilter::by_ids(ids.to_vec()), ScanRange::all())
            .await?;
        Ok(rows.into_iter().map(|b| (b.id, b)).collect())
    }
}

/// Log a partially applied `add_book` with the keys needed to retry it
fn commit_failed(
    title: &str,
    author_name: &str,
    author_id: Option<Uuid>,
    book_id: Option<Uuid>,
    source: anyhow::Error,
) -> CatalogError {
    tracing::error!(
        title,
        author_name,
        author_id = ?author_id,
        book_id = ?book_id,
        error = %source,
        "Book only partially committed; retry the same addBook"
    );
    CatalogError::Commit {
        entity: "book",
        source,
    }
}
