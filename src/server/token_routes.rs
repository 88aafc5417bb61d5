use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::server::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/token", get(get_token))
        .route("/headers", get(get_headers))
        .route("/healthz", get(healthz))
}

/// Serves the cached token, fetching a fresh one first when needed.
async fn get_token(State(state): State<AppState>) -> Response {
    match state.tokens.token().await {
        Ok(token) => Json(json!({
            "access_token": token.access_token(),
            "token_type": token.token_type(),
            "expires_at": token.expires_at(),
        }))
        .into_response(),
        Err(e) => {
            warn!("serving /token failed: {}", e);
            (StatusCode::BAD_GATEWAY, format!("Error: {}", e)).into_response()
        }
    }
}

async fn get_headers(State(state): State<AppState>) -> Response {
    match state.tokens.get_auth_headers().await {
        Ok(headers) => {
            let mut body = Map::new();
            for (name, value) in headers.iter() {
                if let Ok(value) = value.to_str() {
                    body.insert(canonical_header_name(name.as_str()), Value::String(value.to_owned()));
                }
            }
            Json(Value::Object(body)).into_response()
        }
        Err(e) => {
            warn!("serving /headers failed: {}", e);
            (StatusCode::BAD_GATEWAY, format!("Error: {}", e)).into_response()
        }
    }
}

async fn healthz() -> &'static str {
    "ok"
}

// `authorization` -> `Authorization`
fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::canonical_header_name;

    #[test]
    fn header_names_are_title_cased() {
        assert_eq!(canonical_header_name("authorization"), "Authorization");
        assert_eq!(canonical_header_name("x-workspace-id"), "X-Workspace-Id");
    }
}
