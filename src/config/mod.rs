//! Application configuration management

use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};
use rand::Rng;
use rand::distributions::Alphanumeric;

use crate::services::{AuthConfig, CatalogConfig};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// SQLite database URL
    pub database_url: String,

    /// Maximum pooled database connections
    pub database_max_connections: u32,

    /// JWT secret for token signing and verification
    pub jwt_secret: String,

    /// Access token lifetime in seconds
    pub token_lifetime_secs: i64,

    /// Bcrypt cost factor for new password hashes
    pub bcrypt_cost: u32,

    /// Origin allowed by CORS
    pub cors_origin: String,

    /// Largest accepted page `limit`
    pub max_page_size: i64,

    /// Page size of `booksSearch`
    pub search_page_size: i64,

    /// Buffered events per subscriber before it starts lagging
    pub event_channel_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = match lookup("JWT_SECRET") {
            Some(secret) if !secret.trim().is_empty() => secret.trim().to_string(),
            _ => {
                tracing::warn!(
                    "JWT_SECRET not set; using a random secret, tokens will not survive a restart"
                );
                random_secret()
            }
        };

        // SALT_ROUNDS is accepted for existing deployments
        let bcrypt_cost = match lookup("BCRYPT_COST").or_else(|| lookup("SALT_ROUNDS")) {
            Some(v) => v.trim().parse().context("Invalid BCRYPT_COST")?,
            None => bcrypt::DEFAULT_COST,
        };

        Ok(Self {
            port: parse_or(&lookup, "PORT", 4000)?,

            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "sqlite:./data/catalog.db".to_string()),

            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,

            jwt_secret,

            token_lifetime_secs: parse_or(&lookup, "TOKEN_LIFETIME_SECS", 7 * 24 * 60 * 60)?,

            bcrypt_cost,

            cors_origin: lookup("CORS_ORIGIN")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),

            max_page_size: parse_or(&lookup, "MAX_PAGE_SIZE", 100)?,

            search_page_size: parse_or(&lookup, "SEARCH_PAGE_SIZE", 25)?,

            event_channel_capacity: parse_or(&lookup, "EVENT_CHANNEL_CAPACITY", 256)?,
        })
    }

    pub fn auth(&self) -> AuthConfig {
        AuthConfig {
            jwt_secret: self.jwt_secret.clone(),
            token_lifetime_secs: self.token_lifetime_secs,
            bcrypt_cost: self.bcrypt_cost,
        }
    }

    pub fn catalog(&self) -> CatalogConfig {
        CatalogConfig {
            max_page_size: self.max_page_size,
            search_page_size: self.search_page_size,
            ..CatalogConfig::default()
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}: '{}'", key, value)),
        None => Ok(default),
    }
}

fn random_secret() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect();
    format!("dev-secret-{}", suffix)
}
