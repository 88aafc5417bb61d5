//! Shared constants and invariants

/// Tokens are refreshed this many seconds before they actually expire.
pub const DEFAULT_BUFFER_SECONDS: u64 = 300;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

// Retry policy defaults for the token exchange
pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_INITIAL_BACKOFF_SECONDS: f64 = 1.0;
pub const DEFAULT_MAX_BACKOFF_SECONDS: f64 = 60.0;
/// Largest backoff delay a config may ask for (one day).
pub const MAX_BACKOFF_SECONDS_LIMIT: f64 = 86_400.0;

pub const GRANT_TYPE_CLIENT_CREDENTIALS: &str = "client_credentials";
pub const TOKEN_TYPE_BEARER: &str = "Bearer";

pub const DEFAULT_TOKEN_ISSUER: &str = "https://sso.common.cloud.hpe.com/as/token.oauth2";
pub const DEFAULT_API_BASE_URL: &str = "https://global.api.greenlake.hpe.com";
