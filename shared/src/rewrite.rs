//! Inbound path to upstream REST path rewriting.
//!
//! The proxy is mounted under one or more prefixes (the function path, an
//! `/api` redirect). Whatever follows the prefix names a collection on the
//! upstream store, which lives under [`REST_ROOT`].

use crate::config::REST_ROOT;

/// Strip `prefix` from `path` only when it ends on a segment boundary.
fn strip_segment_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

/// Compute the upstream path for an inbound request path.
///
/// The first matching prefix is removed, any `/rest/v1` segments the caller
/// already added are dropped, an empty remainder falls back to
/// `default_collection`, and the result is namespaced under the REST root.
pub fn upstream_path<S: AsRef<str>>(inbound: &str, prefixes: &[S], default_collection: &str) -> String {
    let root = REST_ROOT.trim_start_matches('/');
    let mut rest = prefixes
        .iter()
        .map(|p| p.as_ref())
        .filter(|p| !p.is_empty())
        .find_map(|p| strip_segment_prefix(inbound, p))
        .unwrap_or(inbound)
        .trim_start_matches('/');

    while let Some(stripped) = strip_segment_prefix(rest, root) {
        rest = stripped.trim_start_matches('/');
    }

    if rest.is_empty() {
        rest = default_collection.trim_matches('/');
    }

    format!("{}/{}", REST_ROOT, rest)
}

/// Join the upstream base URL, rewritten path and untouched query string.
pub fn upstream_url(base_url: &str, path: &str, query: Option<&str>) -> String {
    let base = base_url.trim_end_matches('/');
    match query.filter(|q| !q.is_empty()) {
        Some(q) => format!("{}{}?{}", base, path, q),
        None => format!("{}{}", base, path),
    }
}
