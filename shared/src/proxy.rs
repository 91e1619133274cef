//! Pass-through proxy to the upstream store.
//!
//! A request is turned into a [`ForwardPlan`] (target URL, merged headers,
//! body) which is then sent with a shared `reqwest::Client`. The upstream
//! status and body come back untouched; only `content-*` headers are relayed.

use std::collections::BTreeMap;
use std::time::Instant;

use lambda_http::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use lambda_http::http::Method;
use lambda_http::{Body, Request, Response};
use tracing::{error, info};
use uuid::Uuid;

use crate::http::{apply_cors, error_response, preflight_response};
use crate::rewrite::{upstream_path, upstream_url};
use crate::{Config, Error, Result};

/// Header carrying the upstream store's API key.
pub const APIKEY_HEADER: &str = "apikey";

/// Header used to correlate proxy and upstream logs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const REDACTED: &str = "[redacted]";

/// Headers the HTTP client manages itself and must not be copied.
fn is_connection_header(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "host" | "content-length" | "connection" | "accept-encoding" | "transfer-encoding"
    )
}

/// Everything needed to issue the upstream request.
#[derive(Debug, Clone)]
pub struct ForwardPlan {
    pub request_id: String,
    pub method: Method,
    pub path: String,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl ForwardPlan {
    /// Headers with credentials masked, for logs and diagnostics.
    pub fn redacted_headers(&self) -> BTreeMap<String, String> {
        redact(&self.headers)
    }
}

/// Render a header map with `authorization` and `apikey` masked.
pub fn redact(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if *name == header::AUTHORIZATION || name.as_str() == APIKEY_HEADER {
                REDACTED.to_string()
            } else {
                value.to_str().unwrap_or("<binary>").to_string()
            };
            (name.as_str().to_string(), shown)
        })
        .collect()
}

/// Forwards requests to the configured upstream store.
#[derive(Debug, Clone)]
pub struct Proxy {
    client: reqwest::Client,
    config: Config,
}

impl Proxy {
    /// Create a new proxy around a shared HTTP client.
    pub fn new(client: reqwest::Client, config: Config) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Work out where and how a request would be forwarded, without sending it.
    pub fn plan(&self, event: &Request) -> Result<ForwardPlan> {
        let path = upstream_path(
            event.uri().path(),
            &self.config.path_prefixes,
            &self.config.default_collection,
        );
        let url = upstream_url(&self.config.upstream_url, &path, event.uri().query());

        let mut headers = HeaderMap::new();
        for (name, value) in event.headers() {
            if !is_connection_header(name) {
                headers.append(name.clone(), value.clone());
            }
        }

        if !headers.contains_key(APIKEY_HEADER) || !headers.contains_key(header::AUTHORIZATION) {
            let key = HeaderValue::from_str(&self.config.api_key)
                .map_err(|_| Error::Config("SUPABASE_ANON_KEY is not a valid header value".to_string()))?;
            let bearer = HeaderValue::from_str(&format!("Bearer {}", self.config.api_key))
                .map_err(|_| Error::Config("SUPABASE_ANON_KEY is not a valid header value".to_string()))?;
            headers.entry(APIKEY_HEADER).or_insert(key);
            headers.entry(header::AUTHORIZATION).or_insert(bearer);
        }

        headers
            .entry(header::CONTENT_TYPE)
            .or_insert(HeaderValue::from_static("application/json"));

        let request_id = match headers.get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok()) {
            Some(id) => id.to_string(),
            None => {
                let id = Uuid::new_v4().to_string();
                let value = HeaderValue::from_str(&id)
                    .map_err(|e| Error::Internal(format!("Invalid request id: {}", e)))?;
                headers.insert(REQUEST_ID_HEADER, value);
                id
            }
        };

        let method = event.method().clone();
        let body = if method == Method::GET || method == Method::HEAD {
            None
        } else {
            encode_body(event.body())
        };

        Ok(ForwardPlan {
            request_id,
            method,
            path,
            url,
            headers,
            body,
        })
    }

    /// Send a planned request and relay the upstream answer.
    pub async fn send(&self, plan: ForwardPlan) -> Result<Response<Body>> {
        let start = Instant::now();
        info!(
            request_id = %plan.request_id,
            method = %plan.method,
            path = %plan.path,
            "Forwarding request upstream"
        );

        let mut request = self
            .client
            .request(plan.method, &plan.url)
            .headers(plan.headers);
        if let Some(body) = plan.body {
            request = request.body(body);
        }

        let upstream = request.send().await?;
        let status = upstream.status();

        let mut headers = HeaderMap::new();
        for (name, value) in upstream.headers() {
            if name.as_str().starts_with("content-") {
                headers.append(name.clone(), value.clone());
            }
        }

        let bytes = upstream.bytes().await?;

        info!(
            request_id = %plan.request_id,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Upstream responded"
        );

        let body = relay_body(bytes.to_vec());
        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }

    /// Plan and send in one step.
    pub async fn forward(&self, event: &Request) -> Result<Response<Body>> {
        let plan = self.plan(event)?;
        self.send(plan).await
    }
}

/// Upstream bytes as a Lambda body; text when it is valid UTF-8.
fn relay_body(bytes: Vec<u8>) -> Body {
    if bytes.is_empty() {
        return Body::Empty;
    }
    match String::from_utf8(bytes) {
        Ok(text) => Body::Text(text),
        Err(e) => Body::Binary(e.into_bytes()),
    }
}

/// JSON bodies are re-serialised compactly; anything else goes through raw.
fn encode_body(body: &Body) -> Option<Vec<u8>> {
    let bytes = body.as_ref();
    if bytes.is_empty() {
        return None;
    }
    match serde_json::from_slice::<serde_json::Value>(bytes) {
        Ok(value) => serde_json::to_vec(&value).ok(),
        Err(_) => Some(bytes.to_vec()),
    }
}

/// Proxy entry point shared by the Lambda binaries.
///
/// Preflight requests are answered before configuration is consulted, so
/// OPTIONS works even when the function is misconfigured. Every answer
/// carries CORS headers.
pub async fn handle(
    proxy: std::result::Result<&Proxy, &Error>,
    event: Request,
) -> std::result::Result<Response<Body>, lambda_http::Error> {
    let origin = event.headers().get(header::ORIGIN).cloned();

    if event.method() == Method::OPTIONS {
        return preflight_response(origin.as_ref());
    }

    let mut response = match proxy {
        Err(e) => {
            error!(error = %e, "Proxy is not configured");
            error_response(500, e.to_string())?
        }
        Ok(proxy) => match proxy.forward(&event).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, path = %event.uri().path(), "Proxy request failed");
                error_response(500, format!("Proxy request failed: {}", e))?
            }
        },
    };

    apply_cors(response.headers_mut(), origin.as_ref());
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proxy() -> Proxy {
        let config = Config::from_lookup(|key| match key {
            "SUPABASE_URL" => Some("https://abc.supabase.co".to_string()),
            "SUPABASE_ANON_KEY" => Some("anon-key".to_string()),
            _ => None,
        })
        .unwrap();
        Proxy::new(reqwest::Client::new(), config)
    }

    fn request(method: Method, uri: &str) -> lambda_http::http::request::Builder {
        lambda_http::http::Request::builder().method(method).uri(uri)
    }

    #[test]
    fn test_plan_rewrites_path_and_keeps_query() {
        let event = request(
            Method::GET,
            "https://calendar.example.com/.netlify/functions/supabase-proxy/tasks?select=*&order=day.asc",
        )
        .body(Body::Empty)
        .unwrap();

        let plan = proxy().plan(&event).unwrap();
        assert_eq!(plan.path, "/rest/v1/tasks");
        assert_eq!(
            plan.url,
            "https://abc.supabase.co/rest/v1/tasks?select=*&order=day.asc"
        );
        assert!(plan.body.is_none());
    }

    #[test]
    fn test_plan_fills_missing_credentials() {
        let event = request(Method::GET, "https://x.test/api/tasks")
            .body(Body::Empty)
            .unwrap();

        let plan = proxy().plan(&event).unwrap();
        assert_eq!(plan.headers[APIKEY_HEADER], "anon-key");
        assert_eq!(plan.headers[header::AUTHORIZATION], "Bearer anon-key");
        assert_eq!(plan.headers[header::CONTENT_TYPE], "application/json");
        assert!(plan.headers.contains_key(REQUEST_ID_HEADER));
    }

    #[test]
    fn test_plan_passes_caller_credentials_verbatim() {
        let event = request(Method::POST, "https://x.test/api/tasks")
            .header("apikey", "caller-key")
            .header("authorization", "Bearer user-jwt")
            .header("content-type", "application/json; charset=utf-8")
            .header("prefer", "return=representation")
            .header("host", "x.test")
            .header("x-request-id", "req-1")
            .body(Body::from(r#"{ "title": "Launch" }"#))
            .unwrap();

        let plan = proxy().plan(&event).unwrap();
        assert_eq!(plan.headers[APIKEY_HEADER], "caller-key");
        assert_eq!(plan.headers[header::AUTHORIZATION], "Bearer user-jwt");
        assert_eq!(plan.headers[header::CONTENT_TYPE], "application/json; charset=utf-8");
        assert_eq!(plan.headers["prefer"], "return=representation");
        assert!(!plan.headers.contains_key(header::HOST));
        assert_eq!(plan.request_id, "req-1");
        assert_eq!(plan.body.as_deref(), Some(br#"{"title":"Launch"}"#.as_slice()));
    }

    #[test]
    fn test_relay_body_keeps_bytes() {
        assert!(matches!(relay_body(Vec::new()), Body::Empty));
        assert!(matches!(relay_body(b"[]".to_vec()), Body::Text(ref t) if t == "[]"));
        let raw = vec![0x89, b'P', b'N', b'G', 0xff, 0x00];
        assert!(matches!(relay_body(raw.clone()), Body::Binary(ref b) if *b == raw));
    }

    #[test]
    fn test_plan_drops_body_on_get() {
        let event = request(Method::GET, "https://x.test/api/tasks")
            .body(Body::from("{}"))
            .unwrap();
        assert!(proxy().plan(&event).unwrap().body.is_none());
    }

    #[test]
    fn test_non_json_body_is_forwarded_raw() {
        let event = request(Method::POST, "https://x.test/api/tasks")
            .body(Body::from("title=Launch"))
            .unwrap();
        assert_eq!(
            proxy().plan(&event).unwrap().body.as_deref(),
            Some(b"title=Launch".as_slice())
        );
    }

    #[test]
    fn test_redacts_credentials() {
        let event = request(Method::GET, "https://x.test/api/tasks")
            .header("accept", "application/json")
            .body(Body::Empty)
            .unwrap();
        let shown = proxy().plan(&event).unwrap().redacted_headers();
        assert_eq!(shown["apikey"], REDACTED);
        assert_eq!(shown["authorization"], REDACTED);
        assert_eq!(shown["accept"], "application/json");
    }

    #[tokio::test]
    async fn test_options_never_forwards() {
        let event = request(Method::OPTIONS, "https://x.test/api/tasks")
            .header("origin", "https://calendar.example.com")
            .body(Body::Empty)
            .unwrap();

        let missing = Error::Config("SUPABASE_URL not set".to_string());
        let response = handle(Err(&missing), event).await.unwrap();
        assert_eq!(response.status(), 200);
        assert!(response.body().as_ref().is_empty());
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://calendar.example.com"
        );
    }

    #[tokio::test]
    async fn test_missing_config_is_500_with_cors() {
        let event = request(Method::GET, "https://x.test/api/tasks")
            .body(Body::Empty)
            .unwrap();

        let missing = Error::Config("SUPABASE_ANON_KEY not set".to_string());
        let response = handle(Err(&missing), event).await.unwrap();
        assert_eq!(response.status(), 500);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let body: serde_json::Value = serde_json::from_slice(response.body().as_ref()).unwrap();
        assert_eq!(body["error"], "Configuration error: SUPABASE_ANON_KEY not set");
    }
}
