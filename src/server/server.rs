use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tracing::info;

use crate::cache::token_cache::TokenCache;
use crate::config::settings::SettingsConfig;
use crate::observability::metrics::{get_metrics, Metrics};
use crate::observability::routes::MetricsState;
use crate::server::token_routes;

#[derive(Clone)]
pub struct AppState {
    pub metrics_state: MetricsState,
    pub tokens: Arc<TokenCache>,
}

impl AppState {
    pub fn new(metrics: &Metrics, tokens: Arc<TokenCache>) -> Self {
        Self {
            metrics_state: MetricsState::new(metrics.registry.clone()),
            tokens,
        }
    }
}

/// Token, header, health and (when enabled) metrics routes.
pub fn router(settings_config: &SettingsConfig, state: AppState) -> Router {
    Router::new()
        .merge(state.metrics_state.router(&settings_config.metrics))
        .merge(token_routes::router())
        .with_state(state)
}

/// Serve the local HTTP surface until `shutdown` resolves.
pub async fn start<F>(
    settings_config: &SettingsConfig,
    tokens: Arc<TokenCache>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics = get_metrics().await;
    let app = router(settings_config, AppState::new(metrics, tokens));

    let bind_addr = format!("{}:{}", settings_config.server.host, settings_config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("serving tokens on {}", bind_addr);

    metrics.up.set(1);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("http server failed");
    metrics.up.set(0);
    served
}
