use serde::Serialize;

use crate::utils::constants::TOKEN_TYPE_BEARER;

/// Bearer credential returned by a token exchange.
///
/// `expires_at` is derived from `created_at + expires_in` once, here, and is
/// never recomputed. A token without `expires_in` never expires by time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    access_token: String,
    token_type: String,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    scope: Option<String>,
    created_at: i64, // UNIX TIMESTAMP
}

impl Token {
    pub fn new(
        access_token: String,
        token_type: String,
        expires_in: Option<i64>,
        scope: Option<String>,
        created_at: i64,
    ) -> Self {
        Self {
            access_token,
            token_type,
            expires_in,
            expires_at: expires_in.map(|seconds| created_at.saturating_add(seconds)),
            scope,
            created_at,
        }
    }

    /// Wraps an injected token string. It has no expiry and is always fresh.
    pub fn literal(access_token: String, created_at: i64) -> Self {
        Self::new(access_token, TOKEN_TYPE_BEARER.to_owned(), None, None, created_at)
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    pub fn expires_in(&self) -> Option<i64> {
        self.expires_in
    }

    pub fn expires_at(&self) -> Option<i64> {
        self.expires_at
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    /// Seconds left until `expires_at`, negative once expired.
    pub fn time_until_expiry(&self, now: i64) -> Option<i64> {
        self.expires_at.map(|expires_at| expires_at.saturating_sub(now))
    }

    /// False once the token is within `buffer_seconds` of its expiry.
    pub fn is_fresh(&self, now: i64, buffer_seconds: i64) -> bool {
        self.time_until_expiry(now)
            .map(|remaining| remaining > buffer_seconds)
            .unwrap_or(true)
    }

    /// Value for the `Authorization` header.
    pub fn authorization(&self) -> String {
        format!("{} {}", TOKEN_TYPE_BEARER, self.access_token)
    }
}
