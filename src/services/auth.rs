//! Authentication service for user management and JWT handling
//!
//! Provides:
//! - User creation with bcrypt password hashing
//! - Login issuing HS256 access tokens
//! - Resolving a bearer token to the acting user

use std::sync::Arc;

use anyhow::{Context, anyhow};
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{CreateUser, EntityStore, UserFilter, UserRecord};

use super::error::{CatalogError, CatalogResult};

const MIN_USERNAME_LEN: usize = 5;
const MIN_PASSWORD_LEN: usize = 6;
const MIN_FAVORITE_GENRE_LEN: usize = 5;

/// Claims carried by access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// User ID (subject)
    pub sub: String,
    pub username: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
}

/// The authenticated principal of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub username: String,
}

impl From<&UserRecord> for Actor {
    fn from(user: &UserRecord) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
        }
    }
}

/// Auth service configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// JWT signing secret
    pub jwt_secret: String,
    /// Access token lifetime in seconds (default: 7 days)
    pub token_lifetime_secs: i64,
    /// Bcrypt cost factor
    pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_lifetime_secs: 7 * 24 * 60 * 60,
            bcrypt_cost: DEFAULT_COST,
        }
    }
}

pub struct AuthService {
    store: Arc<dyn EntityStore>,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(store: Arc<dyn EntityStore>, config: AuthConfig) -> Self {
        Self { store, config }
    }

    /// Register a user. Usernames are unique.
    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        favorite_genre: &str,
    ) -> CatalogResult<UserRecord> {
        if username.chars().count() < MIN_USERNAME_LEN {
            return Err(CatalogError::validation(format!(
                "Username must be at least {MIN_USERNAME_LEN} characters"
            )));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(CatalogError::validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if favorite_genre.chars().count() < MIN_FAVORITE_GENRE_LEN {
            return Err(CatalogError::validation(format!(
                "Favorite genre must be at least {MIN_FAVORITE_GENRE_LEN} characters"
            )));
        }

        let taken = || CatalogError::validation(format!("username {username} already exists"));

        if self
            .store
            .find_user(&UserFilter::Username(username.to_string()))
            .await?
            .is_some()
        {
            return Err(taken());
        }

        let password_hash = self.hash_password(password).await?;
        let (user, created) = self
            .store
            .insert_user_if_absent(CreateUser {
                username: username.to_string(),
                password_hash,
                favorite_genre: favorite_genre.to_string(),
            })
            .await?;

        if !created {
            return Err(taken());
        }

        tracing::info!(user_id = %user.id, username = %user.username, "User created");
        Ok(user)
    }

    /// Check credentials and issue an access token
    pub async fn login(&self, username: &str, password: &str) -> CatalogResult<String> {
        let invalid = || CatalogError::validation("Invalid username or password");

        let user = self
            .store
            .find_user(&UserFilter::Username(username.to_string()))
            .await?
            .ok_or_else(invalid)?;

        if !self.verify_password(password, &user.password_hash).await? {
            tracing::debug!(username, "Login rejected");
            return Err(invalid());
        }

        let token = self.issue_token(&user)?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok(token)
    }

    /// Resolve a bearer token to its user.
    ///
    /// Invalid or expired tokens, and tokens of users that no longer exist,
    /// resolve to `None` and the request continues unauthenticated.
    pub async fn resolve_actor(&self, token: &str) -> Option<Actor> {
        let claims = match self.decode_token(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring invalid access token");
                return None;
            }
        };
        let user_id = Uuid::parse_str(&claims.sub).ok()?;

        match self.store.find_user(&UserFilter::Id(user_id)).await {
            Ok(user) => user.as_ref().map(Actor::from),
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to load token user");
                None
            }
        }
    }

    pub async fn find_user(&self, id: Uuid) -> CatalogResult<Option<UserRecord>> {
        Ok(self.store.find_user(&UserFilter::Id(id)).await?)
    }

    /// Hash a password with bcrypt on the blocking pool
    async fn hash_password(&self, password: &str) -> anyhow::Result<String> {
        let password = password.to_string();
        let cost = self.config.bcrypt_cost;
        tokio::task::spawn_blocking(move || hash(password, cost))
            .await
            .context("Password hashing task failed")?
            .map_err(|e| anyhow!("Failed to hash password: {}", e))
    }

    /// Verify a password against a hash on the blocking pool
    async fn verify_password(&self, password: &str, password_hash: &str) -> anyhow::Result<bool> {
        let password = password.to_string();
        let password_hash = password_hash.to_string();
        tokio::task::spawn_blocking(move || verify(password, &password_hash))
            .await
            .context("Password verification task failed")?
            .map_err(|e| anyhow!("Failed to verify password: {}", e))
    }

    fn issue_token(&self, user: &UserRecord) -> anyhow::Result<String> {
        let now = Utc::now();
        let claims = AccessTokenClaims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.config.token_lifetime_secs)).timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| anyhow!("Failed to create access token: {}", e))
    }

    fn decode_token(&self, token: &str) -> anyhow::Result<AccessTokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let token_data = decode::<AccessTokenClaims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| anyhow!("Invalid access token: {}", e))?;

        Ok(token_data.claims)
    }
}
