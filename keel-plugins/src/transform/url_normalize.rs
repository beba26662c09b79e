use keel_core::{Request, Response};
use keel_plugin::{BoxHandler, FilterFactory, Handler, PluginConfig};
use std::sync::Arc;

/// Drops a single trailing `/` so `/v3/users/` and `/v3/users` dispatch
/// alike. An empty path becomes `/`.
pub struct NormalizingFactory;

pub fn factory(_config: &PluginConfig) -> anyhow::Result<Box<dyn FilterFactory>> {
    Ok(Box::new(NormalizingFactory))
}

impl FilterFactory for NormalizingFactory {
    fn wrap(&self, next: BoxHandler) -> anyhow::Result<BoxHandler> {
        Ok(Arc::new(NormalizingMiddleware { next }))
    }
}

struct NormalizingMiddleware {
    next: BoxHandler,
}

pub fn normalize(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else if path.len() > 1 && path.ends_with('/') {
        &path[..path.len() - 1]
    } else {
        path
    }
}

impl Handler for NormalizingMiddleware {
    fn call(&self, req: &mut Request) -> Response {
        let normalized = normalize(&req.path);
        if normalized != req.path {
            let normalized = normalized.to_string();
            tracing::trace!(from = %req.path, to = %normalized, "Normalized path");
            req.set_path(normalized);
        }
        self.next.call(req)
    }
}
