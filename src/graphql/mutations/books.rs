use crate::services::NewBook;

use super::prelude::*;

#[derive(Default)]
pub struct BookMutations;

#[Object]
impl BookMutations {
    /// Add a book, creating its author if needed. Requires authentication.
    async fn add_book(
        &self,
        ctx: &Context<'_>,
        title: String,
        published: i32,
        author: String,
        genres: Vec<String>,
    ) -> Result<Book> {
        let catalog = ctx.data_unchecked::<Arc<CatalogService>>();
        let input = NewBook {
            title,
            published,
            author,
            genres,
        };
        let book = catalog.add_book(input, ctx.actor()).await.into_gql()?;
        Ok(Book(book))
    }
}
