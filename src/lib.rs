//! # GreenLake token library
//!
//! Acquires OAuth2 client-credentials tokens for HPE GreenLake APIs,
//! caches them until shortly before they expire, and hands out ready-to-use
//! authorization headers to the HTTP clients that need them.
//!
//! Modules:
//! - `sources`: the OAuth2 client-credentials exchange, with 429 backoff
//! - `cache`: the token value and the lazily refreshing token cache
//! - `client`: an API client that authenticates through the cache
//! - `config`: YAML service configuration, defaults and validation
//! - `server`: local HTTP surface serving the cached token and metrics

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod helpers;
pub mod observability;
pub mod resilience;
pub mod server;
pub mod sources;
pub mod utils;

#[cfg(test)]
pub mod tests;

pub use crate::cache::token::Token;
pub use crate::cache::token_cache::TokenCache;
pub use crate::client::api::ApiClient;
pub use crate::config::credentials::{CredentialsConfig, ServiceConfig};
pub use crate::error::{ClientError, TokenError};
pub use crate::resilience::retry::RetryPolicy;
pub use crate::sources::oauth2::OAuth2Provider;
pub use crate::sources::TokenSource;
