//! Request-id middleware.
//!
//! Tags every request with a fresh `req-<uuid4>` id, stored in the environ
//! under `keel.request_id` and echoed back in a response header.
//!
//! ```yaml
//! filters:
//!   request_id:
//!     header: x-openstack-request-id
//! ```

use crate::environ::REQUEST_ID;
use keel_core::{Request, Response};
use keel_plugin::{BoxHandler, FilterFactory, Handler, PluginConfig};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

// ─────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Clone)]
struct RequestIdConfig {
    /// Response header carrying the id.
    #[serde(default = "default_header")]
    header: String,
}

fn default_header() -> String {
    "x-openstack-request-id".into()
}

// ─────────────────────────────────────────────────────────────
// Factory
// ─────────────────────────────────────────────────────────────

pub struct RequestIdFactory {
    header: Arc<str>,
}

pub fn factory(config: &PluginConfig) -> anyhow::Result<Box<dyn FilterFactory>> {
    let cfg: RequestIdConfig = config
        .deserialize()
        .map_err(|e| anyhow::anyhow!("request_id config error: {e}"))?;
    http::HeaderName::from_bytes(cfg.header.as_bytes())
        .map_err(|_| anyhow::anyhow!("request_id config error: invalid header '{}'", cfg.header))?;
    Ok(Box::new(RequestIdFactory {
        header: Arc::from(cfg.header),
    }))
}

impl FilterFactory for RequestIdFactory {
    fn wrap(&self, next: BoxHandler) -> anyhow::Result<BoxHandler> {
        Ok(Arc::new(RequestIdMiddleware {
            header: self.header.clone(),
            next,
        }))
    }
}

// ─────────────────────────────────────────────────────────────
// Middleware
// ─────────────────────────────────────────────────────────────

struct RequestIdMiddleware {
    header: Arc<str>,
    next: BoxHandler,
}

pub fn generate() -> String {
    format!("req-{}", uuid::Uuid::new_v4())
}

impl Handler for RequestIdMiddleware {
    fn call(&self, req: &mut Request) -> Response {
        let id = generate();
        req.set_var(REQUEST_ID, Value::String(id.clone()));
        let span = tracing::debug_span!("request", request_id = %id);
        let _guard = span.enter();
        self.next.call(req).with_header(&self.header, &id)
    }
}
