//! GraphQL schema definition with queries, mutations, and subscriptions
//!
//! Root objects are merged from per-domain resolver structs. The operation
//! names clients rely on are listed below and checked against the built schema
//! at startup, so a resolver that goes missing fails the boot instead of the
//! first request.

use std::sync::Arc;

use anyhow::{Context as _, Result, bail};
use async_graphql::{MergedObject, Schema};

use crate::services::{AuthService, BroadcastEmitter, CatalogService};

use super::loaders::{author_loader, book_loader};
use super::mutations::{AuthMutations, AuthorMutations, BookMutations};
use super::queries::{AuthorQueries, BookQueries, UserQueries};
use super::subscriptions::SubscriptionRoot;

pub const QUERY_OPERATIONS: &[&str] = &[
    "bookCount",
    "authorsCount",
    "book",
    "books",
    "author",
    "authors",
    "booksSearch",
    "me",
];

pub const MUTATION_OPERATIONS: &[&str] = &["createUser", "login", "addBook", "editAuthor"];

pub const SUBSCRIPTION_OPERATIONS: &[&str] = &["bookAdded"];

const INTROSPECT_OPERATIONS: &str = r#"
    {
      __schema {
        queryType { fields { name } }
        mutationType { fields { name } }
        subscriptionType { fields { name } }
      }
    }
"#;

#[derive(MergedObject, Default)]
pub struct QueryRoot(BookQueries, AuthorQueries, UserQueries);

#[derive(MergedObject, Default)]
pub struct MutationRoot(AuthMutations, BookMutations, AuthorMutations);

/// The GraphQL schema type
pub type CatalogSchema = Schema<QueryRoot, MutationRoot, SubscriptionRoot>;

/// Build the GraphQL schema with all resolvers
pub fn build_schema(
    catalog: Arc<CatalogService>,
    auth: Arc<AuthService>,
    events: Arc<BroadcastEmitter>,
) -> CatalogSchema {
    Schema::build(
        QueryRoot::default(),
        MutationRoot::default(),
        SubscriptionRoot,
    )
    .data(author_loader(catalog.clone()))
    .data(book_loader(catalog.clone()))
    .data(catalog)
    .data(auth)
    .data(events)
    .finish()
}

/// Check that every declared operation has a resolver in `schema`
pub async fn verify_operations(schema: &CatalogSchema) -> Result<()> {
    let response = schema.execute(INTROSPECT_OPERATIONS).await;
    if let Some(error) = response.errors.first() {
        bail!("Schema introspection failed: {}", error.message);
    }
    let data = response
        .data
        .into_json()
        .context("Introspection result is not JSON")?;

    let roots = [
        ("queryType", QUERY_OPERATIONS),
        ("mutationType", MUTATION_OPERATIONS),
        ("subscriptionType", SUBSCRIPTION_OPERATIONS),
    ];

    let mut missing = Vec::new();
    for (root, declared) in roots {
        let found = field_names(&data["__schema"][root]);
        missing.extend(missing_operations(declared, &found));
    }

    if !missing.is_empty() {
        bail!("Schema is missing operations: {}", missing.join(", "));
    }

    tracing::debug!(
        queries = QUERY_OPERATIONS.len(),
        mutations = MUTATION_OPERATIONS.len(),
        subscriptions = SUBSCRIPTION_OPERATIONS.len(),
        "GraphQL operations verified"
    );
    Ok(())
}

fn field_names(root: &serde_json::Value) -> Vec<String> {
    root["fields"]
        .as_array()
        .map(|fields| {
            fields
                .iter()
                .filter_map(|f| f["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn missing_operations<'a>(declared: &[&'a str], found: &[String]) -> Vec<&'a str> {
    declared
        .iter()
        .copied()
        .filter(|name| !found.iter().any(|f| f == name))
        .collect()
}
