//! Book and author catalog service
//!
//! All operations are exposed via GraphQL at /graphql, with subscriptions
//! at /graphql/ws.

pub mod app;
pub mod config;
pub mod db;
pub mod graphql;
pub mod services;
