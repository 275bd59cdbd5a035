//! GraphQL type definitions
//!
//! These types wrap the store records. Relations resolve through the batching
//! loaders in `loaders.rs`.

use async_graphql::dataloader::DataLoader;
use async_graphql::{Context, ErrorExtensions, ID, Object, Result, SimpleObject};

use crate::db::{AuthorRecord, BookRecord, UserRecord};
use crate::services::Page;

use super::loaders::{AuthorLoader, BookLoader};

/// A book in the catalog
#[derive(Debug, Clone)]
pub struct Book(pub BookRecord);

#[Object]
impl Book {
    async fn id(&self) -> ID {
        ID(self.0.id.to_string())
    }

    async fn title(&self) -> &str {
        &self.0.title
    }

    async fn published(&self) -> i32 {
        self.0.published
    }

    /// Author name as given when the book was added
    async fn author_name(&self) -> &str {
        &self.0.author_name
    }

    /// The linked author record (empty when the book has none)
    async fn author(&self, ctx: &Context<'_>) -> Result<Vec<Author>> {
        let Some(author_id) = self.0.author_id else {
            return Ok(Vec::new());
        };
        let loader = ctx.data_unchecked::<DataLoader<AuthorLoader>>();
        let author = loader.load_one(author_id).await.map_err(|e| e.as_ref().extend())?;
        Ok(author.into_iter().map(Author).collect())
    }

    async fn genres(&self) -> &[String] {
        &self.0.genres
    }
}

impl From<BookRecord> for Book {
    fn from(record: BookRecord) -> Self {
        Self(record)
    }
}

/// An author and the books linked to them
#[derive(Debug, Clone)]
pub struct Author(pub AuthorRecord);

#[Object]
impl Author {
    async fn id(&self) -> ID {
        ID(self.0.id.to_string())
    }

    async fn name(&self) -> &str {
        &self.0.name
    }

    async fn born(&self) -> Option<i32> {
        self.0.born
    }

    async fn book_count(&self) -> i32 {
        i32::try_from(self.0.book_ids.len()).unwrap_or(i32::MAX)
    }

    /// Books in the order they were linked
    async fn books(&self, ctx: &Context<'_>) -> Result<Vec<Book>> {
        let loader = ctx.data_unchecked::<DataLoader<BookLoader>>();
        let mut by_id = loader
            .load_many(self.0.book_ids.iter().copied())
            .await
            .map_err(|e| e.as_ref().extend())?;
        Ok(self
            .0
            .book_ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .map(Book)
            .collect())
    }
}

impl From<AuthorRecord> for Author {
    fn from(record: AuthorRecord) -> Self {
        Self(record)
    }
}

/// Cursor page of authors
#[derive(SimpleObject)]
pub struct Authors {
    /// Pass back as `cursor` to fetch the next page; null for an empty page
    pub cursor: Option<String>,
    pub has_more_pages: bool,
    pub author: Vec<Author>,
}

impl From<Page<AuthorRecord>> for Authors {
    fn from(page: Page<AuthorRecord>) -> Self {
        Self {
            cursor: page.cursor,
            has_more_pages: page.has_more_pages,
            author: page.items.into_iter().map(Author).collect(),
        }
    }
}

/// Offset page of books
#[derive(SimpleObject)]
pub struct Books {
    pub has_more_pages: bool,
    pub books: Vec<Book>,
}

impl From<Page<BookRecord>> for Books {
    fn from(page: Page<BookRecord>) -> Self {
        Self {
            has_more_pages: page.has_more_pages,
            books: page.items.into_iter().map(Book).collect(),
        }
    }
}

/// Cursor page of search results
#[derive(SimpleObject)]
pub struct BooksSearch {
    pub cursor: Option<String>,
    pub has_more_pages: bool,
    pub book: Vec<Book>,
}

impl From<Page<BookRecord>> for BooksSearch {
    fn from(page: Page<BookRecord>) -> Self {
        Self {
            cursor: page.cursor,
            has_more_pages: page.has_more_pages,
            book: page.items.into_iter().map(Book).collect(),
        }
    }
}

#[derive(SimpleObject)]
pub struct User {
    pub id: ID,
    pub username: String,
    pub favorite_genre: String,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: ID(record.id.to_string()),
            username: record.username,
            favorite_genre: record.favorite_genre,
        }
    }
}

/// Access token returned by `login`
#[derive(SimpleObject)]
pub struct Token {
    pub value: String,
}
