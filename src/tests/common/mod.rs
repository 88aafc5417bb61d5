// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Form;
use reqwest::Client;

use crate::cache::token::Token;
use crate::error::TokenError;
use crate::helpers::time::Clock;
use crate::resilience::retry::Sleeper;
use crate::sources::TokenSource;

pub const TOKEN_PATH: &str = "/as/token.oauth2";
pub const START_UNIX_TS: i64 = 1_700_000_000;

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_unix_ts: i64) -> Self {
        Self { now: AtomicI64::new(start_unix_ts) }
    }

    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }

    pub fn set(&self, unix_ts: i64) {
        self.now.store(unix_ts, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Records requested backoff delays instead of sleeping.
#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, delay: Duration) {
        self.delays.lock().unwrap().push(delay);
    }
}

pub fn secs(values: &[f64]) -> Vec<Duration> {
    values.iter().map(|v| Duration::from_secs_f64(*v)).collect()
}

/// In-process token source issuing `tok1`, `tok2`, ... and counting calls.
pub struct CountingSource {
    calls: AtomicUsize,
    clock: Arc<ManualClock>,
    expires_in: Option<i64>,
    delay: Duration,
    failing: AtomicBool,
}

impl CountingSource {
    pub fn new(clock: Arc<ManualClock>, expires_in: Option<i64>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            clock,
            expires_in,
            delay: Duration::ZERO,
            failing: AtomicBool::new(false),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl TokenSource for CountingSource {
    async fn get_token(&self) -> Result<Token, TokenError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(TokenError::AuthRejected {
                status: StatusCode::UNAUTHORIZED,
                body: "invalid_client".to_owned(),
            });
        }
        Ok(Token::new(
            format!("tok{}", n),
            "Bearer".to_owned(),
            self.expires_in,
            None,
            self.clock.now(),
        ))
    }
}

/// What the fake token endpoint saw on its last request.
#[derive(Debug, Clone, Default)]
pub struct SeenRequest {
    pub content_type: Option<String>,
    pub form: HashMap<String, String>,
}

/// Fake OAuth2 token endpoint answering from a script of (status, body).
/// Requests past the end of the script get the last entry.
#[derive(Clone)]
pub struct TokenEndpoint {
    hits: Arc<AtomicUsize>,
    script: Arc<Vec<(StatusCode, String)>>,
    last_request: Arc<Mutex<Option<SeenRequest>>>,
}

impl TokenEndpoint {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<SeenRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

async fn issue_token(
    State(endpoint): State<TokenEndpoint>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> (StatusCode, String) {
    let n = endpoint.hits.fetch_add(1, Ordering::SeqCst);
    *endpoint.last_request.lock().unwrap() = Some(SeenRequest {
        content_type: headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
        form,
    });
    let index = n.min(endpoint.script.len() - 1);
    endpoint.script[index].clone()
}

/// Returns (handle, token url, endpoint handle).
pub async fn spawn_token_endpoint(script: Vec<(StatusCode, String)>) -> (JoinHandle<()>, String, TokenEndpoint) {
    assert!(!script.is_empty(), "script needs at least one response");
    let endpoint = TokenEndpoint {
        hits: Arc::new(AtomicUsize::new(0)),
        script: Arc::new(script),
        last_request: Arc::new(Mutex::new(None)),
    };
    let router = Router::new()
        .route(TOKEN_PATH, post(issue_token))
        .with_state(endpoint.clone());
    let (handle, addr) = spawn_axum(router).await;
    (handle, format!("http://{}{}", addr, TOKEN_PATH), endpoint)
}

pub fn ok_token(access_token: &str, expires_in: i64) -> (StatusCode, String) {
    (
        StatusCode::OK,
        json!({"access_token": access_token, "token_type": "Bearer", "expires_in": expires_in}).to_string(),
    )
}

pub fn rate_limited() -> (StatusCode, String) {
    (StatusCode::TOO_MANY_REQUESTS, "slow down".to_owned())
}
