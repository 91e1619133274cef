//! Configuration management for the proxy functions.

use std::env;

use crate::{Error, Result};

/// REST root every upstream path is namespaced under.
pub const REST_ROOT: &str = "/rest/v1";

const DEFAULT_PREFIXES: &str = "/.netlify/functions/supabase-proxy,/api";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the upstream store, without trailing slash
    pub upstream_url: String,
    /// API key forwarded when the caller does not bring its own
    pub api_key: String,
    /// Public base URL of the proxy, if deployed behind one
    pub proxy_base_url: Option<String>,
    /// Inbound path prefixes stripped before rewriting
    pub path_prefixes: Vec<String>,
    /// Collection used when the inbound path has no remainder
    pub default_collection: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let upstream_url = get("SUPABASE_URL")
            .ok_or_else(|| Error::Config("SUPABASE_URL not set".to_string()))?
            .trim_end_matches('/')
            .to_string();
        let api_key = get("SUPABASE_ANON_KEY")
            .ok_or_else(|| Error::Config("SUPABASE_ANON_KEY not set".to_string()))?;

        if !upstream_url.starts_with("http://") && !upstream_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "SUPABASE_URL must be an http(s) URL, got {}",
                upstream_url
            )));
        }

        let path_prefixes = get("PROXY_PATH_PREFIXES")
            .unwrap_or_else(|| DEFAULT_PREFIXES.to_string())
            .split(',')
            .map(|p| p.trim().trim_end_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .collect();

        Ok(Self {
            upstream_url,
            api_key,
            proxy_base_url: get("PROXY_BASE_URL").map(|u| u.trim_end_matches('/').to_string()),
            path_prefixes,
            default_collection: get("DEFAULT_COLLECTION")
                .map(|c| c.trim_matches('/').to_string())
                .unwrap_or_else(|| "tasks".to_string()),
        })
    }

    /// Base URL a client wrapper should talk to: the proxy when one is
    /// configured, the upstream store otherwise.
    pub fn client_base_url(&self) -> &str {
        self.proxy_base_url.as_deref().unwrap_or(&self.upstream_url)
    }
}
