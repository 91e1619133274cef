//! Proxy Debug Lambda - Reports how a request would be proxied.
//!
//! Logs the inbound request and returns the computed upstream target. With
//! `DEBUG_REPLAY=true` or `?replay=true` the request is also sent upstream and
//! the answer included in the report. Credentials are never echoed.

use lambda_http::http::header::{self, HeaderValue};
use lambda_http::http::Method;
use lambda_http::{run, service_fn, Body, Error, Request, RequestExt, Response};
use serde::Serialize;
use shared::http::{apply_cors, json_response, preflight_response};
use shared::proxy::redact;
use shared::{ApiResponse, Config, Proxy};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Serialize)]
struct DebugReport {
    method: String,
    path: String,
    query: Option<String>,
    headers: BTreeMap<String, String>,
    config: Option<ConfigSummary>,
    config_error: Option<String>,
    upstream: Option<UpstreamPreview>,
    replay: Option<ReplayResult>,
}

#[derive(Debug, Serialize)]
struct ConfigSummary {
    upstream_url: String,
    proxy_base_url: Option<String>,
    path_prefixes: Vec<String>,
    default_collection: String,
    api_key_set: bool,
}

#[derive(Debug, Serialize)]
struct UpstreamPreview {
    request_id: String,
    method: String,
    path: String,
    url: String,
    headers: BTreeMap<String, String>,
    body_bytes: usize,
}

#[derive(Debug, Serialize)]
struct ReplayResult {
    status: Option<u16>,
    headers: BTreeMap<String, String>,
    body: Option<String>,
    error: Option<String>,
}

/// Application state
struct AppState {
    proxy: shared::Result<Proxy>,
    replay_by_default: bool,
}

impl AppState {
    fn new() -> Self {
        let replay_by_default = std::env::var("DEBUG_REPLAY")
            .map(|v| is_truthy(&v))
            .unwrap_or(false);

        Self {
            proxy: Config::from_env().map(|config| Proxy::new(reqwest::Client::new(), config)),
            replay_by_default,
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

fn summarize(config: &Config) -> ConfigSummary {
    ConfigSummary {
        upstream_url: config.upstream_url.clone(),
        proxy_base_url: config.proxy_base_url.clone(),
        path_prefixes: config.path_prefixes.clone(),
        default_collection: config.default_collection.clone(),
        api_key_set: !config.api_key.is_empty(),
    }
}

async fn replay(proxy: &Proxy, plan: shared::ForwardPlan) -> ReplayResult {
    match proxy.send(plan).await {
        Ok(response) => ReplayResult {
            status: Some(response.status().as_u16()),
            headers: redact(response.headers()),
            body: Some(String::from_utf8_lossy(response.body().as_ref()).to_string()),
            error: None,
        },
        Err(e) => ReplayResult {
            status: None,
            headers: BTreeMap::new(),
            body: None,
            error: Some(e.to_string()),
        },
    }
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let origin: Option<HeaderValue> = event.headers().get(header::ORIGIN).cloned();

    if event.method() == Method::OPTIONS {
        return preflight_response(origin.as_ref());
    }

    let wants_replay = event
        .query_string_parameters_ref()
        .and_then(|params| params.first("replay"))
        .map(is_truthy)
        .unwrap_or(state.replay_by_default);

    let mut report = DebugReport {
        method: event.method().to_string(),
        path: event.uri().path().to_string(),
        query: event.uri().query().map(str::to_string),
        headers: redact(event.headers()),
        config: None,
        config_error: None,
        upstream: None,
        replay: None,
    };

    info!(
        method = %report.method,
        path = %report.path,
        query = ?report.query,
        headers = ?report.headers,
        "Debug request received"
    );

    match &state.proxy {
        Err(e) => {
            warn!(error = %e, "Proxy configuration incomplete");
            report.config_error = Some(e.to_string());
        }
        Ok(proxy) => {
            report.config = Some(summarize(proxy.config()));
            match proxy.plan(&event) {
                Ok(plan) => {
                    report.upstream = Some(UpstreamPreview {
                        request_id: plan.request_id.clone(),
                        method: plan.method.to_string(),
                        path: plan.path.clone(),
                        url: plan.url.clone(),
                        headers: plan.redacted_headers(),
                        body_bytes: plan.body.as_ref().map_or(0, Vec::len),
                    });
                    if wants_replay {
                        let result = replay(proxy, plan).await;
                        info!(status = ?result.status, error = ?result.error, "Replayed request");
                        report.replay = Some(result);
                    }
                }
                Err(e) => report.config_error = Some(e.to_string()),
            }
        }
    }

    let mut response = json_response(200, &ApiResponse::success(report))?;
    apply_cors(response.headers_mut(), origin.as_ref());
    Ok(response)
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
