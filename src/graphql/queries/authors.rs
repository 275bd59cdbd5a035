use super::prelude::*;

#[derive(Default)]
pub struct AuthorQueries;

#[Object]
impl AuthorQueries {
    /// Total number of authors
    async fn authors_count(&self, ctx: &Context<'_>) -> Result<i64> {
        let catalog = ctx.data_unchecked::<Arc<CatalogService>>();
        catalog.authors_count().await.into_gql()
    }

    async fn author(&self, ctx: &Context<'_>, id: String) -> Result<Option<Author>> {
        let catalog = ctx.data_unchecked::<Arc<CatalogService>>();
        let author = catalog.author_by_id(&id).await.into_gql()?;
        Ok(author.map(Author))
    }

    /// Authors in insert order. Pass the returned `cursor` to continue.
    async fn authors(
        &self,
        ctx: &Context<'_>,
        cursor: Option<String>,
        limit: i32,
    ) -> Result<Option<Authors>> {
        let catalog = ctx.data_unchecked::<Arc<CatalogService>>();
        let page = catalog
            .authors_page(cursor.as_deref(), i64::from(limit))
            .await
            .into_gql()?;
        Ok(Some(page.into()))
    }
}
