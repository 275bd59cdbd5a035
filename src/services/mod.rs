//! Catalog, auth and notification services

pub mod auth;
pub mod catalog;
pub mod cursor;
pub mod error;
pub mod events;
pub mod pagination;

pub use auth::{Actor, AuthConfig, AuthService};
pub use catalog::{CatalogConfig, CatalogService, NewBook};
pub use cursor::{decode_cursor, encode_cursor};
pub use error::{CatalogError, CatalogResult};
pub use events::{BroadcastEmitter, CatalogEvent, NotificationEmitter};
pub use pagination::{MAX_PAGE_SIZE, Page, Sequenced};
