use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the process-wide metrics.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("Initializing Metrics ...");
            Metrics::new()
        })
        .await
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Token exchange metrics
    pub token_fetch_attempts: IntCounterVec,
    pub token_fetch_failures: IntCounterVec,
    pub token_fetch_duration: HistogramVec,
    pub token_rate_limited: IntCounter,

    // Cache metrics
    pub token_cache_lookups: IntCounterVec,
    pub token_expiry_unix: IntGauge,

    // Authorized client metrics
    pub api_requests: IntCounterVec,

    pub up: IntGauge,
}

impl Metrics {
    // Metric names and label sets are static, so construction only fails on a programming error.
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("glpauth".into()), None)
            .expect("metrics registry prefix is valid");

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Token exchange
            token_fetch_attempts: IntCounterVec::new(Opts::new("token_fetch_attempts_total", "Token endpoint POST attempts by response status"), &["status"]).expect("token_fetch_attempts_total"),
            token_fetch_failures: IntCounterVec::new(Opts::new("token_fetch_failures_total", "Failed token exchanges by reason"), &["reason"]).expect("token_fetch_failures_total"),
            token_fetch_duration: HistogramVec::new(HistogramOpts::new("token_fetch_duration_seconds", "Token exchange duration seconds, retries included").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 30.0]), &["outcome"]).expect("token_fetch_duration_seconds"),
            token_rate_limited: IntCounter::new("token_rate_limited_responses_total", "HTTP 429 responses from the token endpoint").expect("token_rate_limited_responses_total"),

            // Cache
            token_cache_lookups: IntCounterVec::new(Opts::new("token_cache_lookups_total", "Token cache lookups by result"), &["result"]).expect("token_cache_lookups_total"),
            token_expiry_unix: IntGauge::new("token_expiry_unix_seconds", "Expiry timestamp of the cached token, 0 when it never expires").expect("token_expiry_unix_seconds"),

            // Client
            api_requests: IntCounterVec::new(Opts::new("api_requests_total", "Authorized API requests by method and status"), &["method", "status"]).expect("api_requests_total"),

            up: IntGauge::new("up", "1 if service is healthy").expect("up"),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(metrics.token_fetch_attempts.clone()),
            Box::new(metrics.token_fetch_failures.clone()),
            Box::new(metrics.token_fetch_duration.clone()),
            Box::new(metrics.token_rate_limited.clone()),
            Box::new(metrics.token_cache_lookups.clone()),
            Box::new(metrics.token_expiry_unix.clone()),
            Box::new(metrics.api_requests.clone()),
            Box::new(metrics.up.clone()),
        ];
        for collector in collectors {
            reg.register(collector).expect("metric names are unique");
        }

        metrics
    }
}
