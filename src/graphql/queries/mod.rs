pub mod authors;
pub mod books;
pub mod user;

pub use authors::AuthorQueries;
pub use books::BookQueries;
pub use user::UserQueries;

pub(crate) mod prelude {
    pub(crate) use std::sync::Arc;

    pub(crate) use async_graphql::{Context, Object, Result};

    pub(crate) use crate::graphql::auth::{AuthExt, IntoGqlResult};
    pub(crate) use crate::graphql::types::*;
    pub(crate) use crate::services::{AuthService, CatalogService};
}
