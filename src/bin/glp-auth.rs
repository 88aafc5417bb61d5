use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use glp_auth::cache::token_cache::TokenCache;
use glp_auth::client::api::ApiClient;
use glp_auth::config::loader;
use glp_auth::server;
use glp_auth::utils::logging::{self, LogLevel};
use http::Method;
use serde_json::{json, Value};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "glp-auth.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the current token as JSON
    Token {
        /// Print the access token unmasked
        #[arg(long)]
        reveal: bool,
    },
    /// Send an authorized request to the configured API and print the JSON response
    Request {
        /// Path relative to api.base_url, e.g. /workspaces/v1/workspaces
        path: String,
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,
        /// Query parameter as key=value, repeatable
        #[arg(short, long = "query")]
        query: Vec<String>,
        /// JSON request body
        #[arg(short, long)]
        data: Option<String>,
    },
    /// Serve the cached token and metrics over HTTP until Ctrl-C
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config, start logging
    // -------------------------------

    let args = Args::parse();
    let service_config = loader::file_to_config(Path::new(&args.config)).await?;
    logging::run(&service_config, args.log_level);

    // -------------------------------
    // 2. Token cache; nothing is fetched until first use
    // -------------------------------

    let tokens = Arc::new(TokenCache::from_settings(&service_config));

    match args.command {
        Command::Token { reveal } => {
            let token = tokens.token().await?;
            let access_token = if reveal {
                token.access_token().to_owned()
            } else {
                mask(token.access_token())
            };
            print_json(&json!({
                "access_token": access_token,
                "token_type": token.token_type(),
                "expires_in": token.expires_in(),
                "expires_at": token.expires_at(),
                "scope": token.scope(),
            }))
        }
        Command::Request { path, method, query, data } => {
            let method = Method::from_bytes(method.to_uppercase().as_bytes())
                .with_context(|| format!("invalid HTTP method '{}'", method))?;
            let query = parse_query(&query)?;
            let body: Option<Value> = data
                .as_deref()
                .map(serde_json::from_str)
                .transpose()
                .context("--data must be valid JSON")?;

            let api = ApiClient::new(&service_config.api.base_url, tokens)?;
            let response = api.request(method, &path, &query, body.as_ref()).await?;
            print_json(&response)
        }
        Command::Serve => {
            info!("Service starting...");
            server::server::start(&service_config.settings, tokens, shutdown_signal()).await
        }
    }
}

fn parse_query(pairs: &[String]) -> Result<Vec<(String, String)>> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .ok_or_else(|| anyhow!("query parameter '{}' must look like key=value", pair))
        })
        .collect()
}

fn mask(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    if token.chars().count() > 8 {
        format!("{}***", visible)
    } else {
        "***".to_owned()
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // no signal handler available, run until killed
        std::future::pending::<()>().await;
    }
    info!("shutting down gracefully");
}
