//! Supabase Proxy Lambda - Forwards calendar requests to the upstream REST API.
//!
//! Endpoints:
//! - OPTIONS {prefix}/* - CORS preflight, answered locally
//! - GET/POST/PUT/PATCH/DELETE {prefix}/* - forwarded to /rest/v1/*

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use shared::{Config, Proxy};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Application state
struct AppState {
    /// Kept as a Result so a misconfigured function still answers with a 500
    proxy: shared::Result<Proxy>,
}

impl AppState {
    fn new() -> Self {
        let proxy = Config::from_env().map(|config| {
            info!(
                upstream = %config.upstream_url,
                prefixes = ?config.path_prefixes,
                "Proxy configured"
            );
            Proxy::new(reqwest::Client::new(), config)
        });

        if let Err(e) = &proxy {
            error!(error = %e, "Proxy configuration incomplete");
        }

        Self { proxy }
    }
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    shared::proxy::handle(state.proxy.as_ref(), event).await
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new());

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}
