use std::fmt;
use std::sync::Arc;

use http::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::cache::token::Token;
use crate::config::credentials::{CredentialsConfig, ServiceConfig};
use crate::error::TokenError;
use crate::helpers::time::{Clock, SystemClock};
use crate::observability::metrics::get_metrics;
use crate::sources::oauth2::OAuth2Provider;
use crate::sources::TokenSource;
use crate::utils::constants::DEFAULT_BUFFER_SECONDS;

static HIT_MSG: &str = "hit";
static MISS_MSG: &str = "miss";

/// Holds the current bearer token and refreshes it on demand.
///
/// Nothing is fetched at construction. The first caller that needs headers
/// triggers the exchange; later callers reuse the token until it is within
/// `buffer_seconds` of expiring. Refreshes are serialized per cache, and a
/// caller that waited on another one's refresh reuses its result.
pub struct TokenCache {
    source: Arc<dyn TokenSource>,
    clock: Arc<dyn Clock>,
    buffer_seconds: i64,
    injected: bool,
    current: RwLock<Option<Arc<Token>>>,
    refresh_lock: Mutex<()>,
}

impl TokenCache {
    /// Cache backed by an [`OAuth2Provider`] with the default retry policy.
    pub fn new(credentials: &CredentialsConfig) -> Self {
        let cache = Self::with_source(Arc::new(OAuth2Provider::new(credentials)));
        match credentials.initial_token.as_deref() {
            Some(token) => cache.with_initial_token(token),
            None => cache,
        }
    }

    /// Cache configured from the full service config: retry policy and buffer included.
    pub fn from_settings(config: &ServiceConfig) -> Self {
        let provider = OAuth2Provider::new(&config.credentials)
            .with_retry_policy(config.settings.retry.clone());
        let cache = Self::with_source(Arc::new(provider))
            .with_buffer_seconds(config.settings.buffer_seconds);
        match config.credentials.initial_token.as_deref() {
            Some(token) => cache.with_initial_token(token),
            None => cache,
        }
    }

    pub fn with_source(source: Arc<dyn TokenSource>) -> Self {
        Self {
            source,
            clock: Arc::new(SystemClock),
            buffer_seconds: DEFAULT_BUFFER_SECONDS as i64,
            injected: false,
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_buffer_seconds(mut self, buffer_seconds: u64) -> Self {
        self.buffer_seconds = i64::try_from(buffer_seconds).unwrap_or(i64::MAX);
        self
    }

    /// Seeds the cache with a pre-issued token that never expires.
    /// Blank values are ignored and the cache stays lazy.
    pub fn with_initial_token(mut self, token: &str) -> Self {
        if OAuth2Provider::validate_token(Some(token)) {
            debug!("token cache seeded with a pre-issued token");
            let literal = Token::literal(token.to_owned(), self.clock.now());
            *self.current.get_mut() = Some(Arc::new(literal));
            self.injected = true;
        } else {
            warn!("ignoring blank initial token, tokens will be fetched on demand");
        }
        self
    }

    /// `Authorization: Bearer <token>`, fetching a token first when needed.
    pub async fn get_auth_headers(&self) -> Result<HeaderMap, TokenError> {
        let token = self.token().await?;
        let mut value = HeaderValue::from_str(&token.authorization())?;
        value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }

    /// Current fresh token, fetching one when absent or stale.
    pub async fn token(&self) -> Result<Arc<Token>, TokenError> {
        let metrics = get_metrics().await;
        if let Some(token) = self.fresh_token().await {
            metrics.token_cache_lookups.with_label_values(&[HIT_MSG]).inc();
            return Ok(token);
        }

        let _refresh = self.refresh_lock.lock().await;
        // another caller may have refreshed while this one waited
        if let Some(token) = self.fresh_token().await {
            metrics.token_cache_lookups.with_label_values(&[HIT_MSG]).inc();
            return Ok(token);
        }
        metrics.token_cache_lookups.with_label_values(&[MISS_MSG]).inc();
        debug!("cached token is missing or stale, fetching a new one");
        self.fetch_and_store().await
    }

    /// Whether the cached token is present and outside the refresh buffer. Never fetches.
    pub async fn is_token_valid(&self) -> bool {
        self.fresh_token().await.is_some()
    }

    /// Replaces the cached token regardless of its freshness.
    pub async fn refresh_token(&self) -> Result<(), TokenError> {
        let _refresh = self.refresh_lock.lock().await;
        info!("forcing token refresh");
        self.fetch_and_store().await.map(|_| ())
    }

    /// The cached token as is, stale or not.
    pub async fn cached_token(&self) -> Option<Arc<Token>> {
        self.current.read().await.clone()
    }

    pub fn buffer_seconds(&self) -> i64 {
        self.buffer_seconds
    }

    /// True when seeded with a pre-issued token; such caches never exchange credentials on their own.
    pub fn has_injected_token(&self) -> bool {
        self.injected
    }

    async fn fresh_token(&self) -> Option<Arc<Token>> {
        let now = self.clock.now();
        let current = self.current.read().await;
        current
            .as_ref()
            .filter(|token| token.is_fresh(now, self.buffer_seconds))
            .cloned()
    }

    // Callers hold `refresh_lock`. On error the previous token stays in place.
    async fn fetch_and_store(&self) -> Result<Arc<Token>, TokenError> {
        let token = Arc::new(self.source.get_token().await?);
        *self.current.write().await = Some(token.clone());
        get_metrics()
            .await
            .token_expiry_unix
            .set(token.expires_at().unwrap_or(0));
        Ok(token)
    }
}

impl fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCache")
            .field("clock", &self.clock)
            .field("buffer_seconds", &self.buffer_seconds)
            .field("injected", &self.injected)
            .finish_non_exhaustive()
    }
}
