//! GraphQL authentication mutations
//!
//! Neither mutation requires authentication.

use super::prelude::*;

#[derive(Default)]
pub struct AuthMutations;

#[Object]
impl AuthMutations {
    /// Register a new user
    async fn create_user(
        &self,
        ctx: &Context<'_>,
        username: String,
        password: String,
        favorite_genre: String,
    ) -> Result<User> {
        let auth = ctx.data_unchecked::<Arc<AuthService>>();
        let user = auth
            .create_user(&username, &password, &favorite_genre)
            .await
            .into_gql()?;
        Ok(user.into())
    }

    /// Exchange credentials for an access token, sent back as `Authorization: Bearer <value>`
    async fn login(&self, ctx: &Context<'_>, username: String, password: String) -> Result<Token> {
        let auth = ctx.data_unchecked::<Arc<AuthService>>();
        let value = auth.login(&username, &password).await.into_gql()?;
        Ok(Token { value })
    }
}
