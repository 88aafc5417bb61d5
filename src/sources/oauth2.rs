use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::cache::token::Token;
use crate::config::credentials::CredentialsConfig;
use crate::error::TokenError;
use crate::helpers::time::{get_instant, Clock, SystemClock};
use crate::observability::metrics::get_metrics;
use crate::resilience::retry::{RetryPolicy, Sleeper, TokioSleeper};
use crate::sources::TokenSource;
use crate::utils::constants::{
    DEFAULT_HTTP_TIMEOUT_SECS, GRANT_TYPE_CLIENT_CREDENTIALS, TOKEN_TYPE_BEARER,
};

static SUCCESS_MSG: &str = "success";
static ERROR_MSG: &str = "error";
static TRANSPORT_MSG: &str = "transport_error";

/// Success body of the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    expires_in: Option<i64>,
    scope: Option<String>,
}

fn default_token_type() -> String {
    TOKEN_TYPE_BEARER.to_owned()
}

/// OAuth2 `client_credentials` exchange against a token endpoint.
///
/// Every call performs a fresh exchange over a fresh HTTP client. HTTP 429 is
/// retried with exponential backoff; any other failure is returned at once.
#[derive(Clone)]
pub struct OAuth2Provider {
    client_id: String,
    client_secret: String,
    token_url: String,
    workspace_id: Option<String>,
    retry: RetryPolicy,
    timeout: Duration,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
}

impl OAuth2Provider {
    pub fn new(credentials: &CredentialsConfig) -> Self {
        Self {
            client_id: credentials.client_id.to_owned(),
            client_secret: credentials.client_secret.to_owned(),
            token_url: credentials.token_issuer.to_owned(),
            workspace_id: credentials.workspace_id.to_owned(),
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            clock: Arc::new(SystemClock),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    pub fn workspace_id(&self) -> Option<&str> {
        self.workspace_id.as_deref()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Basic well-formedness guard: rejects missing, empty and whitespace-only tokens.
    pub fn validate_token(token: Option<&str>) -> bool {
        token.map(|t| !t.trim().is_empty()).unwrap_or(false)
    }

    /// Exchanges the client credentials for a token.
    pub async fn get_token(&self) -> Result<Token, TokenError> {
        let metrics = get_metrics().await;
        let start = get_instant();
        debug!(
            token_url = %self.token_url,
            workspace_id = ?self.workspace_id,
            "requesting client credentials token"
        );

        let result = self
            .retry
            .run_with_retry(
                self.sleeper.as_ref(),
                |attempt| self.exchange(attempt),
                TokenError::is_rate_limited,
            )
            .await;

        match &result {
            Ok(token) => {
                metrics
                    .token_fetch_duration
                    .with_label_values(&[SUCCESS_MSG])
                    .observe(start.elapsed().as_secs_f64());
                info!(
                    token_type = token.token_type(),
                    expires_in = ?token.expires_in(),
                    "obtained client credentials token"
                );
            }
            Err(e) => {
                metrics
                    .token_fetch_duration
                    .with_label_values(&[ERROR_MSG])
                    .observe(start.elapsed().as_secs_f64());
                metrics.token_fetch_failures.with_label_values(&[e.reason()]).inc();
                warn!("client credentials exchange with {} failed: {}", self.token_url, e);
            }
        }
        result
    }

    /// A single POST to the token endpoint.
    async fn exchange(&self, attempt: u32) -> Result<Token, TokenError> {
        let metrics = get_metrics().await;
        let client = Client::builder().timeout(self.timeout).build()?;
        let form = [
            ("grant_type", GRANT_TYPE_CLIENT_CREDENTIALS),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let response = client
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .inspect_err(|_| {
                metrics.token_fetch_attempts.with_label_values(&[TRANSPORT_MSG]).inc();
            })?;

        let status = response.status();
        metrics.token_fetch_attempts.with_label_values(&[status.as_str()]).inc();
        debug!(attempt, status = %status, "token endpoint responded");

        if !status.is_success() {
            // the body is diagnostics only, an unreadable one must not hide the status
            let body = response.text().await.unwrap_or_default();
            let err = TokenError::from_status(status, body);
            if err.is_rate_limited() {
                metrics.token_rate_limited.inc();
            }
            return Err(err);
        }

        let body = response.text().await?;
        let parsed: TokenResponse = serde_json::from_str(&body)?;
        Ok(Token::new(
            parsed.access_token,
            parsed.token_type,
            parsed.expires_in,
            parsed.scope,
            self.clock.now(),
        ))
    }
}

#[async_trait]
impl TokenSource for OAuth2Provider {
    async fn get_token(&self) -> Result<Token, TokenError> {
        OAuth2Provider::get_token(self).await
    }
}

impl fmt::Debug for OAuth2Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Provider")
            .field("client_id", &self.client_id)
            .field("token_url", &self.token_url)
            .field("workspace_id", &self.workspace_id)
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
