use std::path::Path;

use anyhow::{anyhow, Context, Result};
use regex::{Captures, Regex};
use tracing::{debug, error};

use crate::config::credentials::ServiceConfig;
use crate::config::settings::LoggingConfig;
use crate::config::validator;

/// Load and validate config from YAML file
pub async fn file_to_config(path: &Path) -> Result<ServiceConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read config file {}", path.display()))?;

    parse_config(expand_env_vars(&content)?).await
}

/// Parse YAML, fill defaults and validate. All validation issues are reported together.
pub async fn parse_config(content: String) -> Result<ServiceConfig> {
    let service_config: ServiceConfig = serde_yaml::from_str(&content)
        .inspect_err(|e| error!("parse config error: {}", e))?;

    let service_config = apply_defaults(service_config);
    debug!("validation config ...");
    validator::validate_service_config(&service_config)
        .map_err(|errors| anyhow!("config is not valid:\n  - {}", errors.join("\n  - ")))?;

    Ok(service_config)
}

/// Replaces `${VAR}` and `${VAR:default}` with environment values.
/// A variable that is unset and has no default becomes an empty string.
pub fn expand_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{(\w+)(?::([^\}]*))?\}")?;
    Ok(re
        .replace_all(input, |caps: &Captures| {
            let var = &caps[1];
            let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            std::env::var(var).unwrap_or_else(|_| default.to_string())
        })
        .to_string())
}

fn apply_defaults(mut config: ServiceConfig) -> ServiceConfig {
    if config.settings.logging.is_none() {
        config.settings.logging = Some(LoggingConfig::default());
    }
    // env expansion leaves empty strings behind for unset optional values
    config.credentials.workspace_id = non_blank(config.credentials.workspace_id.take());
    config.credentials.initial_token = non_blank(config.credentials.initial_token.take());
    config.credentials.client_id = config.credentials.client_id.trim().to_owned();
    config.credentials.token_issuer = config.credentials.token_issuer.trim().to_owned();
    config
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
