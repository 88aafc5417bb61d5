use serde::Deserialize;
use std::fmt;

use crate::config::settings::SettingsConfig;
use crate::utils::constants::{DEFAULT_API_BASE_URL, DEFAULT_TOKEN_ISSUER};

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// ================================
/// OAuth2 client credentials
/// ================================
#[derive(Deserialize, Clone, Default)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    pub workspace_id: Option<String>,
    /// token endpoint URL
    #[serde(default = "default_token_issuer")]
    pub token_issuer: String,
    /// pre-issued token; when set the OAuth2 exchange is skipped entirely
    pub initial_token: Option<String>,
}

impl CredentialsConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>, token_issuer: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            workspace_id: None,
            token_issuer: token_issuer.into(),
            initial_token: None,
        }
    }

    pub fn with_workspace_id(mut self, workspace_id: impl Into<String>) -> Self {
        self.workspace_id = Some(workspace_id.into());
        self
    }

    pub fn with_initial_token(mut self, token: impl Into<String>) -> Self {
        self.initial_token = Some(token.into());
        self
    }
}

// Keeps the secret and the injected token out of logs.
impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("workspace_id", &self.workspace_id)
            .field("token_issuer", &self.token_issuer)
            .field("initial_token", &self.initial_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// ================================
/// GreenLake API
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { base_url: default_api_base_url() }
    }
}

fn default_token_issuer() -> String {
    DEFAULT_TOKEN_ISSUER.to_owned()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_owned()
}
