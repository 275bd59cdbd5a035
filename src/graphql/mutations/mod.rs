pub mod auth;
pub mod authors;
pub mod books;

pub use auth::AuthMutations;
pub use authors::AuthorMutations;
pub use books::BookMutations;

pub(crate) mod prelude {
    pub(crate) use std::sync::Arc;

    pub(crate) use async_graphql::{Context, Object, Result};

    pub(crate) use crate::graphql::auth::{AuthExt, IntoGqlResult};
    pub(crate) use crate::graphql::types::*;
    pub(crate) use crate::services::{AuthService, CatalogService};
}
