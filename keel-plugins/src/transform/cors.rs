//! CORS middleware.
//!
//! Registered as a direct filter: the constructor receives the conf and the
//! next handler together and returns the wrapped handler.
//!
//! ```yaml
//! filters:
//!   cors:
//!     use: cors_extension
//!     allowed_origin: ["https://dashboard.example.com"]
//!     allow_credentials: true
//!     expose_headers: [x-auth-token, x-openstack-request-id, x-subject-token]
//!     max_age: 3600
//!     allow_headers: [x-auth-token, x-subject-token, content-type]
//! ```

use http::Method;
use keel_core::{Request, Response};
use keel_plugin::{BoxHandler, Handler, PluginConfig};
use std::sync::Arc;

/// Request headers a preflight may always ask for.
const SIMPLE_HEADERS: &[&str] = &[
    "accept",
    "accept-language",
    "content-type",
    "cache-control",
    "content-language",
    "expires",
    "last-modified",
    "pragma",
];

// ─────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
struct CorsConfig {
    allowed_origin: Vec<String>,
    allow_credentials: bool,
    expose_headers: Vec<String>,
    max_age: Option<u64>,
    allow_methods: Vec<String>,
    allow_headers: Vec<String>,
}

fn default_allow_methods() -> Vec<String> {
    ["GET", "PUT", "POST", "DELETE", "PATCH"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl CorsConfig {
    fn from_config(config: &PluginConfig) -> anyhow::Result<Self> {
        let max_age = match config.get("max_age") {
            None => None,
            Some(raw) => Some(config.get_u64("max_age").ok_or_else(|| {
                anyhow::anyhow!("cors config error: max_age must be a non-negative integer, got {raw}")
            })?),
        };
        let lower = |list: Vec<String>| -> Vec<String> {
            list.into_iter().map(|h| h.to_ascii_lowercase()).collect()
        };
        Ok(Self {
            allowed_origin: config.get_str_list("allowed_origin").unwrap_or_default(),
            allow_credentials: config.get_bool("allow_credentials").unwrap_or(true),
            expose_headers: config.get_str_list("expose_headers").unwrap_or_default(),
            max_age,
            allow_methods: config
                .get_str_list("allow_methods")
                .map(|m| m.into_iter().map(|m| m.to_ascii_uppercase()).collect())
                .unwrap_or_else(default_allow_methods),
            allow_headers: lower(config.get_str_list("allow_headers").unwrap_or_default()),
        })
    }

    fn resolve_origin(&self, origin: &str) -> bool {
        self.allowed_origin.iter().any(|o| o == "*" || o == origin)
    }
}

// ─────────────────────────────────────────────────────────────
// Filter
// ─────────────────────────────────────────────────────────────

/// Direct-filter constructor for `cors_extension`.
pub fn filter_factory(config: &PluginConfig, next: BoxHandler) -> anyhow::Result<BoxHandler> {
    let cfg = CorsConfig::from_config(config)?;
    if cfg.allowed_origin.is_empty() {
        tracing::warn!("cors_extension configured without allowed_origin; CORS headers will never be sent");
    }
    Ok(Arc::new(CorsMiddleware { cfg, next }))
}

struct CorsMiddleware {
    cfg: CorsConfig,
    next: BoxHandler,
}

impl CorsMiddleware {
    /// Answer an OPTIONS request. CORS headers are added only for a valid
    /// preflight from an allowed origin.
    fn preflight(&self, req: &Request, origin: &str) -> Response {
        let mut resp = Response::ok();
        if !self.cfg.resolve_origin(origin) {
            tracing::debug!(%origin, "CORS preflight from disallowed origin");
            return resp;
        }
        let Some(method) = req.header("access-control-request-method") else {
            return resp;
        };
        if !self.cfg.allow_methods.iter().any(|m| m == method) {
            tracing::debug!(%origin, %method, "CORS preflight for disallowed method");
            return resp;
        }
        let requested: Vec<String> = req
            .header("access-control-request-headers")
            .map(|h| {
                h.split(',')
                    .map(|h| h.trim().to_ascii_lowercase())
                    .filter(|h| !h.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let permitted = |h: &String| {
            SIMPLE_HEADERS.contains(&h.as_str()) || self.cfg.allow_headers.contains(h)
        };
        if !requested.iter().all(permitted) {
            tracing::debug!(%origin, headers = ?requested, "CORS preflight for disallowed headers");
            return resp;
        }

        resp.set_header("access-control-allow-origin", origin);
        if self.cfg.allow_credentials {
            resp.set_header("access-control-allow-credentials", "true");
        }
        if let Some(max_age) = self.cfg.max_age {
            resp.set_header("access-control-max-age", &max_age.to_string());
        }
        resp.set_header("access-control-allow-methods", method);
        if !requested.is_empty() {
            resp.set_header("access-control-allow-headers", &requested.join(","));
        }
        resp.set_header("vary", "Origin");
        resp
    }

    /// Decorate a simple (non-preflight) response.
    fn decorate(&self, resp: &mut Response, origin: &str) {
        if !self.cfg.resolve_origin(origin) {
            return;
        }
        resp.set_header("access-control-allow-origin", origin);
        if self.cfg.allow_credentials {
            resp.set_header("access-control-allow-credentials", "true");
        }
        if !self.cfg.expose_headers.is_empty() {
            resp.set_header(
                "access-control-expose-headers",
                &self.cfg.expose_headers.join(","),
            );
        }
        resp.set_header("vary", "Origin");
    }
}

impl Handler for CorsMiddleware {
    fn call(&self, req: &mut Request) -> Response {
        let Some(origin) = req.header("origin").map(str::to_string) else {
            return self.next.call(req); // not a CORS request
        };
        if req.method == Method::OPTIONS {
            return self.preflight(req, &origin);
        }
        let mut resp = self.next.call(req);
        self.decorate(&mut resp, &origin);
        resp
    }
}
