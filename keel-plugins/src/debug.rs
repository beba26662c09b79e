use crate::environ::{AUTH_TOKEN_HEADER, SUBJECT_TOKEN_HEADER};
use keel_core::{Request, Response};
use keel_plugin::{BoxHandler, FilterFactory, Handler, PluginConfig};
use serde_json::{Map, Value};
use std::sync::Arc;

const MASK: &str = "***";

/// Keys whose values never reach the log.
const SECRET_KEYS: &[&str] = &[
    "adminpass",
    "admin_pass",
    "admin_password",
    "auth_password",
    "auth_token",
    "new_pass",
    "password",
    "secret",
    "token",
];

/// Logs each request and response at debug level, with credentials masked.
///
/// Does nothing unless debug logging is enabled for this module.
pub struct DebugFactory;

pub fn factory(_config: &PluginConfig) -> anyhow::Result<Box<dyn FilterFactory>> {
    Ok(Box::new(DebugFactory))
}

impl FilterFactory for DebugFactory {
    fn wrap(&self, next: BoxHandler) -> anyhow::Result<BoxHandler> {
        Ok(Arc::new(DebugMiddleware { next }))
    }
}

struct DebugMiddleware {
    next: BoxHandler,
}

fn is_secret(key: &str) -> bool {
    SECRET_KEYS.contains(&key.to_ascii_lowercase().as_str())
}

/// Copy of `value` with every secret-named entry replaced, at any depth.
pub fn mask(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let v = if is_secret(k) { Value::String(MASK.into()) } else { mask(v) };
                    (k.clone(), v)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(mask).collect()),
        other => other.clone(),
    }
}

fn masked_headers(headers: &http::HeaderMap) -> Map<String, Value> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if name == AUTH_TOKEN_HEADER || name == SUBJECT_TOKEN_HEADER {
                MASK.to_string()
            } else {
                String::from_utf8_lossy(value.as_bytes()).into_owned()
            };
            (name.as_str().to_string(), Value::String(value))
        })
        .collect()
}

fn masked_body(body: &[u8]) -> String {
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => mask(&value).to_string(),
        Err(_) => String::from_utf8_lossy(body).into_owned(),
    }
}

impl Handler for DebugMiddleware {
    fn call(&self, req: &mut Request) -> Response {
        if !tracing::enabled!(tracing::Level::DEBUG) {
            return self.next.call(req);
        }
        let environ: Map<String, Value> = req
            .environ
            .iter()
            .map(|(k, v)| (k.clone(), mask(v)))
            .collect();
        tracing::debug!(
            method = %req.method,
            uri = %req.uri,
            headers = %serde_json::Value::Object(masked_headers(&req.headers)),
            environ = %serde_json::Value::Object(environ),
            body = %masked_body(&req.body),
            "Request"
        );

        let resp = self.next.call(req);
        tracing::debug!(
            status = resp.status.as_u16(),
            headers = %serde_json::Value::Object(masked_headers(&resp.headers)),
            "Response"
        );
        resp
    }
}
