use std::sync::Arc;
use std::time::Duration;

use http::{Method, StatusCode};
use reqwest::{Client, Response, Url};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::token_cache::TokenCache;
use crate::error::ClientError;
use crate::observability::metrics::get_metrics;
use crate::utils::constants::DEFAULT_HTTP_TIMEOUT_SECS;

/// JSON client for a GreenLake API base URL that authenticates every request
/// with headers from a shared [`TokenCache`].
///
/// A 401 response forces a token refresh and the request is sent once more,
/// unless the cache holds a pre-issued token; then the 401 is returned as is.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    tokens: Arc<TokenCache>,
}

impl ApiClient {
    pub fn new(base_url: &str, tokens: Arc<TokenCache>) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        // joined paths must land below the base path, not replace its last segment
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, base_url, tokens })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn tokens(&self) -> &Arc<TokenCache> {
        &self.tokens
    }

    pub async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value, ClientError> {
        self.request(Method::GET, path, query, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, ClientError> {
        self.request(Method::POST, path, &[], Some(body)).await
    }

    /// Sends an authorized request and parses the JSON response. An empty body yields `Value::Null`.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value, ClientError> {
        let url = self.url(path)?;
        let mut response = self.send_once(&method, &url, query, body).await?;

        if response.status() == StatusCode::UNAUTHORIZED && !self.tokens.has_injected_token() {
            warn!(%url, "request unauthorized, refreshing token and retrying once");
            self.tokens.refresh_token().await?;
            response = self.send_once(&method, &url, query, body).await?;
        }

        let status = response.status();
        get_metrics()
            .await
            .api_requests
            .with_label_values(&[method.as_str(), status.as_str()])
            .inc();
        debug!(%method, %url, %status, "api request completed");

        let text = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status { status, body: text });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", path, e)))
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &Url,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Response, ClientError> {
        let headers = self.tokens.get_auth_headers().await?;
        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .headers(headers)
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }
}
