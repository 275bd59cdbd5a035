//! GraphQL authentication context
//!
//! The transport resolves the bearer token before execution and inserts the
//! resulting [`Actor`] into the request data. Resolvers read it back through
//! [`AuthExt`]; protected operations reject a missing actor in the service layer.

use async_graphql::{Context, ErrorExtensions, Result};

use crate::services::{Actor, CatalogError};

/// Extension trait to get the acting user from GraphQL context
pub trait AuthExt {
    /// Get the acting user if the request carried a valid token
    fn actor(&self) -> Option<&Actor>;
}

impl<'a> AuthExt for Context<'a> {
    fn actor(&self) -> Option<&Actor> {
        self.data_opt::<Actor>()
    }
}

/// Convert service errors into GraphQL errors carrying a `code` extension
pub trait IntoGqlResult<T> {
    fn into_gql(self) -> Result<T>;
}

impl<T> IntoGqlResult<T> for std::result::Result<T, CatalogError> {
    fn into_gql(self) -> Result<T> {
        self.map_err(|e| e.extend())
    }
}
