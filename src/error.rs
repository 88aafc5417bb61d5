//! Error types for token acquisition and authorized requests.

use http::header::InvalidHeaderValue;
use http::StatusCode;
use thiserror::Error;

/// Failure of a token exchange or of turning a token into headers.
#[derive(Debug, Error)]
pub enum TokenError {
    /// HTTP 429 that outlived the retry budget.
    #[error("token endpoint kept rate limiting the request: {body}")]
    RateLimited { body: String },

    /// 4xx other than 429, e.g. invalid client credentials.
    #[error("token request rejected with status {status}: {body}")]
    AuthRejected { status: StatusCode, body: String },

    #[error("token endpoint failed with status {status}: {body}")]
    ServerError { status: StatusCode, body: String },

    /// Connection refused, DNS failure, timeout or body read failure.
    #[error("token request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed token response: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    #[error("token cannot be used as a header value")]
    InvalidHeader(#[from] InvalidHeaderValue),
}

impl TokenError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TokenError::RateLimited { .. } => Some(StatusCode::TOO_MANY_REQUESTS),
            TokenError::AuthRejected { status, .. } | TokenError::ServerError { status, .. } => {
                Some(*status)
            }
            TokenError::Transport(err) => err.status(),
            TokenError::MalformedResponse(_) | TokenError::InvalidHeader(_) => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, TokenError::RateLimited { .. })
    }

    /// Short label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            TokenError::RateLimited { .. } => "rate_limited",
            TokenError::AuthRejected { .. } => "auth_rejected",
            TokenError::ServerError { .. } => "server_error",
            TokenError::Transport(_) => "transport",
            TokenError::MalformedResponse(_) => "malformed_response",
            TokenError::InvalidHeader(_) => "invalid_header",
        }
    }

    /// Maps a non-success exchange status to its error.
    pub(crate) fn from_status(status: StatusCode, body: String) -> Self {
        if status == StatusCode::TOO_MANY_REQUESTS {
            TokenError::RateLimited { body }
        } else if status.is_server_error() {
            TokenError::ServerError { status, body }
        } else {
            TokenError::AuthRejected { status, body }
        }
    }
}

/// Failure of a request made through [`crate::client::api::ApiClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("authentication failed: {0}")]
    Auth(#[from] TokenError),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("malformed response body: {0}")]
    MalformedResponse(#[from] serde_json::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Auth(err) => err.status(),
            ClientError::Transport(err) => err.status(),
            ClientError::InvalidUrl(_) | ClientError::MalformedResponse(_) => None,
        }
    }
}
