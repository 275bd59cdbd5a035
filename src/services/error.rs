//! Error taxonomy for catalog and auth operations

use async_graphql::ErrorExtensions;
use thiserror::Error;

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// Malformed or duplicate input the caller can correct
    #[error("{0}")]
    Validation(String),

    /// A protected mutation was called without a resolved user
    #[error("You are not authorized to perform this task")]
    Unauthenticated,

    /// A pagination token that `encode_cursor` did not produce
    #[error("Malformed pagination cursor")]
    MalformedCursor,

    /// A store write failed after earlier writes of the same operation had landed
    #[error("Unable to add {entity}")]
    Commit {
        entity: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Internal server error")]
    Store(#[from] anyhow::Error),
}

impl CatalogError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Machine-readable kind, exposed as the `code` error extension
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "BAD_USER_INPUT",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::MalformedCursor => "MALFORMED_CURSOR",
            Self::Commit { .. } => "COMMIT_FAILED",
            Self::Store(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl ErrorExtensions for CatalogError {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.to_string()).extend_with(|_, e| e.set("code", self.code()))
    }
}
