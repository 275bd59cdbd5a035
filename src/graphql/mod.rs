//! GraphQL API with subscriptions for real-time updates
//!
//! This module provides a GraphQL API using async-graphql with support for
//! queries, mutations, and subscriptions over WebSocket.
//!
//! Resolvers live in `queries/` and `mutations/`, one `#[derive(Default)]`
//! struct per domain, combined with `#[derive(MergedObject)]` in `schema.rs`.

pub mod auth;
pub mod loaders;
pub mod mutations;
pub mod queries;
mod schema;
mod subscriptions;
pub mod types;

pub use schema::{
    CatalogSchema, MUTATION_OPERATIONS, QUERY_OPERATIONS, SUBSCRIPTION_OPERATIONS, build_schema,
    verify_operations,
};
