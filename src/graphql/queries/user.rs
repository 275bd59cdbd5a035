use super::prelude::*;

#[derive(Default)]
pub struct UserQueries;

#[Object]
impl UserQueries {
    /// The user the request's token belongs to, null when unauthenticated
    async fn me(&self, ctx: &Context<'_>) -> Result<Option<User>> {
        let Some(actor) = ctx.actor() else {
            return Ok(None);
        };
        let auth = ctx.data_unchecked::<Arc<AuthService>>();
        let user = auth.find_user(actor.user_id).await.into_gql()?;
        Ok(user.map(User::from))
    }
}
