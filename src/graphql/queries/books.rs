use super::prelude::*;

#[derive(Default)]
pub struct BookQueries;

#[Object]
impl BookQueries {
    /// Total number of books
    async fn book_count(&self, ctx: &Context<'_>) -> Result<i64> {
        let catalog = ctx.data_unchecked::<Arc<CatalogService>>();
        catalog.book_count().await.into_gql()
    }

    /// First book with this title
    async fn book(&self, ctx: &Context<'_>, title: String) -> Result<Option<Book>> {
        let catalog = ctx.data_unchecked::<Arc<CatalogService>>();
        let book = catalog.book_by_title(&title).await.into_gql()?;
        Ok(book.map(Book))
    }

    /// Books in insert order, `limit` per zero-based `page`.
    ///
    /// Rows inserted while paging shift later pages; use `booksSearch` or
    /// `authors` cursors for stable walks.
    async fn books(&self, ctx: &Context<'_>, page: i32, limit: i32) -> Result<Option<Books>> {
        let catalog = ctx.data_unchecked::<Arc<CatalogService>>();
        let page = catalog
            .books_page(i64::from(page), i64::from(limit))
            .await
            .into_gql()?;
        Ok(Some(page.into()))
    }

    /// Books by author name and/or genre. Null when no filter is given or nothing matches.
    async fn books_search(
        &self,
        ctx: &Context<'_>,
        author: Option<String>,
        genre: Option<String>,
        cursor: Option<String>,
    ) -> Result<Option<BooksSearch>> {
        let catalog = ctx.data_unchecked::<Arc<CatalogService>>();
        let page = catalog
            .search_books(author.as_deref(), genre.as_deref(), cursor.as_deref())
            .await
            .into_gql()?;
        Ok(page.map(BooksSearch::from))
    }
}
