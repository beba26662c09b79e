use crate::handler::{BoxHandler, Handler};
use http::StatusCode;
use keel_core::{Request, Response};
use serde_json::Value;

/// Environ key holding the path prefix consumed by url maps.
pub const SCRIPT_NAME: &str = "keel.script_name";

/// Composite app dispatching on the longest matching path prefix.
///
/// The matched prefix is moved from the request path into
/// `keel.script_name` before the mounted handler runs. Prefixes match on
/// segment boundaries only: `/v3` matches `/v3` and `/v3/users`, not `/v30`.
#[derive(Default)]
pub struct UrlMap {
    /// Sorted longest prefix first.
    mounts: Vec<(String, BoxHandler)>,
}

impl UrlMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount `handler` under `prefix`. A later mount of the same prefix
    /// replaces the earlier one.
    pub fn mount(mut self, prefix: &str, handler: BoxHandler) -> Self {
        let prefix = normalize_prefix(prefix);
        self.mounts.retain(|(p, _)| *p != prefix);
        self.mounts.push((prefix, handler));
        self.mounts.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        self
    }

    /// Mounted prefixes, longest first.
    pub fn prefixes(&self) -> Vec<&str> {
        self.mounts.iter().map(|(p, _)| p.as_str()).collect()
    }

    fn find(&self, path: &str) -> Option<(&str, &BoxHandler)> {
        self.mounts
            .iter()
            .find(|(prefix, _)| {
                prefix.is_empty()
                    || path == prefix
                    || (path.starts_with(prefix.as_str())
                        && path.as_bytes().get(prefix.len()) == Some(&b'/'))
            })
            .map(|(p, h)| (p.as_str(), h))
    }
}

/// `/` mounts as the empty prefix; trailing slashes are dropped.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

impl Handler for UrlMap {
    fn call(&self, req: &mut Request) -> Response {
        let Some((prefix, handler)) = self.find(&req.path) else {
            return Response::error(StatusCode::NOT_FOUND, format!("no app mounted for {}", req.path));
        };

        if !prefix.is_empty() {
            let rest = req.path[prefix.len()..].to_string();
            let script_name = match req.var(SCRIPT_NAME).and_then(Value::as_str) {
                Some(existing) => format!("{existing}{prefix}"),
                None => prefix.to_string(),
            };
            req.set_var(SCRIPT_NAME, Value::String(script_name));
            req.set_path(if rest.is_empty() { "/".to_string() } else { rest });
        }
        handler.call(req)
    }
}
