#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use anyhow::Result;
    use http::header::AUTHORIZATION;
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;
    use serde_json::json;
    use serial_test::serial;

    use crate::cache::token_cache::TokenCache;
    use crate::client::api::ApiClient;
    use crate::config::credentials::CredentialsConfig;
    use crate::config::loader;

    const TOKEN_PATH: &str = "/as/token.oauth2";

    #[tokio::test]
    async fn repeated_header_requests_hit_the_issuer_once() -> Result<()> {
        let issuer = MockServer::start_async().await;
        let mock = issuer
            .mock_async(|when, then| {
                when.method(POST)
                    .path(TOKEN_PATH)
                    .header("content-type", "application/x-www-form-urlencoded");
                then.status(200)
                    .header("Content-Type", "application/json")
                    .json_body(json!({
                        "access_token": "glp-abc-123",
                        "token_type": "Bearer",
                        "expires_in": 7200
                    }));
            })
            .await;

        let credentials = CredentialsConfig::new("client", "secret", issuer.url(TOKEN_PATH));
        let cache = TokenCache::new(&credentials);

        for _ in 0..3 {
            let headers = cache.get_auth_headers().await?;
            assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer glp-abc-123");
        }
        assert!(cache.is_token_valid().await);

        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn yaml_config_drives_token_and_api_calls() -> Result<()> {
        let issuer = MockServer::start_async().await;
        let token_mock = issuer
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH);
                then.status(200)
                    .header("Content-Type", "application/json")
                    .json_body(json!({"access_token": "from-yaml", "expires_in": 3600}));
            })
            .await;

        let api = MockServer::start_async().await;
        let api_mock = api
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/devices/v1/devices")
                    .header("authorization", "Bearer from-yaml");
                then.status(200)
                    .header("Content-Type", "application/json")
                    .json_body(json!({"count": 0, "items": []}));
            })
            .await;

        std::env::set_var("GLP_TEST_ISSUER", issuer.url(TOKEN_PATH));
        let mut file = tempfile::NamedTempFile::new()?;
        write!(
            file,
            r#"
settings:
  buffer_seconds: 120
  retry:
    max_retries: 2
credentials:
  client_id: yaml-client
  client_secret: ${{GLP_TEST_SECRET_UNSET:fallback-secret}}
  token_issuer: ${{GLP_TEST_ISSUER}}
api:
  base_url: {}
"#,
            api.base_url()
        )?;

        let config = loader::file_to_config(file.path()).await?;
        assert_eq!(config.credentials.client_secret, "fallback-secret");
        assert_eq!(config.settings.retry.max_retries, 2);

        let tokens = Arc::new(TokenCache::from_settings(&config));
        assert_eq!(tokens.buffer_seconds(), 120);

        let client = ApiClient::new(&config.api.base_url, tokens)?;
        let devices = client.get("/devices/v1/devices", &[]).await?;
        assert_eq!(devices["count"], 0);

        token_mock.assert_async().await;
        api_mock.assert_async().await;
        std::env::remove_var("GLP_TEST_ISSUER");
        Ok(())
    }
}
