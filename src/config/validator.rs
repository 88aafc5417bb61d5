//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Validates:
//!   * credentials present unless a pre-issued token is configured
//!   * token issuer and API base URLs
//!   * retry/backoff invariants
//!   * metrics path

use reqwest::Url;
use tracing::{error, info};

use crate::config::credentials::{ApiConfig, CredentialsConfig, ServiceConfig};
use crate::config::settings::{MetricsConfig, SettingsConfig};
use crate::utils::constants::MAX_BACKOFF_SECONDS_LIMIT;

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_credentials(&cfg.credentials, &mut errors);
    validate_settings(&cfg.settings, &mut errors);
    validate_api(&cfg.api, &mut errors);

    if errors.is_empty() {
        info!("config validation passed");
        Ok(())
    } else {
        for e in &errors {
            error!("config validation: {}", e);
        }
        Err(errors)
    }
}

fn validate_credentials(credentials: &CredentialsConfig, errors: &mut Vec<String>) {
    // a pre-issued token bypasses the exchange, so the client credentials are optional then
    if credentials.initial_token.is_some() {
        return;
    }
    if credentials.client_id.trim().is_empty() {
        errors.push("credentials.client_id is required when no initial_token is set".to_string());
    }
    if credentials.client_secret.trim().is_empty() {
        errors.push(
            "credentials.client_secret is required when no initial_token is set".to_string(),
        );
    }
    validate_http_url("credentials.token_issuer", &credentials.token_issuer, errors);
}

fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    let retry = &settings.retry;
    for (field, value) in [
        ("initial_backoff_seconds", retry.initial_backoff_seconds),
        ("max_backoff_seconds", retry.max_backoff_seconds),
    ] {
        if !value.is_finite() || value > MAX_BACKOFF_SECONDS_LIMIT {
            errors.push(format!(
                "settings.retry.{} must be a finite number of seconds <= {}, got {}",
                field, MAX_BACKOFF_SECONDS_LIMIT, value
            ));
        }
    }
    if !(retry.initial_backoff_seconds > 0.0) {
        errors.push(format!(
            "settings.retry.initial_backoff_seconds must be > 0, got {}",
            retry.initial_backoff_seconds
        ));
    }
    if !(retry.max_backoff_seconds > 0.0) {
        errors.push(format!(
            "settings.retry.max_backoff_seconds must be > 0, got {}",
            retry.max_backoff_seconds
        ));
    }
    if retry.max_backoff_seconds < retry.initial_backoff_seconds {
        errors.push(format!(
            "settings.retry.max_backoff_seconds ({}) must be >= initial_backoff_seconds ({})",
            retry.max_backoff_seconds, retry.initial_backoff_seconds
        ));
    }
    validate_metrics(&settings.metrics, errors);
}

fn validate_metrics(metrics: &MetricsConfig, errors: &mut Vec<String>) {
    if !metrics.path.starts_with('/') {
        errors.push(format!(
            "settings.metrics.path '{}' must start with '/'",
            metrics.path
        ));
    }
}

fn validate_api(api: &ApiConfig, errors: &mut Vec<String>) {
    validate_http_url("api.base_url", &api.base_url, errors);
}

fn validate_http_url(field: &str, value: &str, errors: &mut Vec<String>) {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
        Ok(url) => errors.push(format!(
            "{} '{}' must be an absolute http(s) URL, got scheme '{}'",
            field,
            value,
            url.scheme()
        )),
        Err(e) => errors.push(format!("{} '{}' is not a valid URL: {}", field, value, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::parse_config;

    #[tokio::test]
    async fn invalid_config_reports_all_errors() {
        let invalid_yaml = r#"
settings:
  retry:
    initial_backoff_seconds: 10.0
    max_backoff_seconds: 0
  metrics:
    path: metrics
credentials:
  client_id: ""
  token_issuer: "ftp://issuer/token"
api:
  base_url: "not a url"
"#;
        let err = parse_config(invalid_yaml.to_string()).await.unwrap_err();
        let message = err.to_string();

        assert!(message.contains("config is not valid"));
        assert!(message.contains("client_id is required"), "{message}");
        assert!(message.contains("client_secret is required"), "{message}");
        assert!(message.contains("credentials.token_issuer"), "{message}");
        assert!(message.contains("max_backoff_seconds must be > 0"), "{message}");
        assert!(message.contains("must be >= initial_backoff_seconds"), "{message}");
        assert!(message.contains("settings.metrics.path"), "{message}");
        assert!(message.contains("api.base_url"), "{message}");
    }

    #[test]
    fn default_like_config_is_valid() {
        let cfg = ServiceConfig {
            settings: SettingsConfig::default(),
            credentials: CredentialsConfig::new("id", "secret", "https://issuer/as/token.oauth2"),
            api: ApiConfig::default(),
        };
        assert!(validate_service_config(&cfg).is_ok());
    }

    #[test]
    fn non_finite_or_huge_backoff_is_rejected() {
        let mut cfg = ServiceConfig {
            settings: SettingsConfig::default(),
            credentials: CredentialsConfig::new("id", "secret", "https://issuer/as/token.oauth2"),
            api: ApiConfig::default(),
        };
        cfg.settings.retry.initial_backoff_seconds = 1e20;
        cfg.settings.retry.max_backoff_seconds = f64::INFINITY;

        let errors = validate_service_config(&cfg).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("settings.retry.initial_backoff_seconds must be a finite")));
        assert!(errors.iter().any(|e| e.contains("settings.retry.max_backoff_seconds must be a finite")));

        cfg.settings.retry.initial_backoff_seconds = f64::NAN;
        cfg.settings.retry.max_backoff_seconds = 60.0;
        let errors = validate_service_config(&cfg).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("initial_backoff_seconds must be a finite")));
    }
}
