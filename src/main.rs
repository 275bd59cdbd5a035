//! Catalog service entry point

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use catalog::app::{AppState, build_app};
use catalog::config::Config;
use catalog::db::{Database, EntityStore};
use catalog::graphql::{build_schema, verify_operations};
use catalog::services::{AuthService, BroadcastEmitter, CatalogService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "catalog=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!("Starting catalog service");

    let config = Arc::new(Config::from_env()?);
    tracing::info!("Configuration loaded");

    let db = Database::connect(&config.database_url, config.database_max_connections).await?;
    tracing::info!(url = %config.database_url, "Database connected");

    let store: Arc<dyn EntityStore> = Arc::new(db);
    let events = Arc::new(BroadcastEmitter::new(config.event_channel_capacity));
    let catalog = Arc::new(CatalogService::new(
        store.clone(),
        events.clone(),
        config.catalog(),
    ));
    let auth = Arc::new(AuthService::new(store, config.auth()));

    let schema = build_schema(catalog, auth.clone(), events);
    verify_operations(&schema).await?;
    tracing::info!("GraphQL schema built");

    let state = AppState {
        config: config.clone(),
        schema,
        auth,
    };
    let app = build_app(state)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);
    tracing::info!("GraphQL playground: http://localhost:{}/graphql", config.port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
