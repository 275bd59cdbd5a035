//! DataLoaders for the `Book.author` and `Author.books` relations
//!
//! Each relation field calls `load_one`/`load_many`; the loader collects the
//! keys requested in the same tick and fetches them with a single
//! `WHERE id IN (...)` query.

use std::collections::HashMap;
use std::sync::Arc;

use async_graphql::dataloader::{DataLoader, Loader};
use uuid::Uuid;

use crate::db::{AuthorRecord, BookRecord};
use crate::services::{CatalogError, CatalogService};

/// Batch loads authors by id
pub struct AuthorLoader {
    catalog: Arc<CatalogService>,
}

impl AuthorLoader {
    pub fn new(catalog: Arc<CatalogService>) -> Self {
        Self { catalog }
    }
}

impl Loader<Uuid> for AuthorLoader {
    type Value = AuthorRecord;
    type Error = Arc<CatalogError>;

    async fn load(&self, keys: &[Uuid]) -> Result<HashMap<Uuid, Self::Value>, Self::Error> {
        tracing::debug!(count = keys.len(), "Batch loading authors");
        self.catalog.authors_by_ids(keys).await.map_err(Arc::new)
    }
}

/// Batch loads books by id
pub struct BookLoader {
    catalog: Arc<CatalogService>,
}

impl BookLoader {
    pub fn new(catalog: Arc<CatalogService>) -> Self {
        Self { catalog }
    }
}

impl Loader<Uuid> for BookLoader {
    type Value = BookRecord;
    type Error = Arc<CatalogError>;

    async fn load(&self, keys: &[Uuid]) -> Result<HashMap<Uuid, Self::Value>, Self::Error> {
        tracing::debug!(count = keys.len(), "Batch loading books");
        self.catalog.books_by_ids(keys).await.map_err(Arc::new)
    }
}

pub fn author_loader(catalog: Arc<CatalogService>) -> DataLoader<AuthorLoader> {
    DataLoader::new(AuthorLoader::new(catalog), tokio::spawn)
}

pub fn book_loader(catalog: Arc<CatalogService>) -> DataLoader<BookLoader> {
    DataLoader::new(BookLoader::new(catalog), tokio::spawn)
}
