use super::prelude::*;

#[derive(Default)]
pub struct AuthorMutations;

#[Object]
impl AuthorMutations {
    /// Set an author's birth year. Null when no author has this name.
    async fn edit_author(
        &self,
        ctx: &Context<'_>,
        name: String,
        born: i32,
    ) -> Result<Option<Author>> {
        let catalog = ctx.data_unchecked::<Arc<CatalogService>>();
        let author = catalog
            .edit_author(&name, born, ctx.actor())
            .await
            .into_gql()?;
        Ok(author.map(Author))
    }
}
