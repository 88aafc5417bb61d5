//! Token sources: where the cache gets fresh tokens from.

use async_trait::async_trait;

use crate::cache::token::Token;
use crate::error::TokenError;

pub mod oauth2;

/// Performs one token acquisition. Implementations do not cache.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn get_token(&self) -> Result<Token, TokenError>;
}
