//! Terminal apps the binary can put at the end of a pipeline.

use http::StatusCode;
use keel_core::{Request, Response};
use keel_plugin::deploy::AppTable;
use keel_plugin::handler_fn;
use serde_json::{Map, Value, json};

/// Every app a pipeline's `app` may name.
pub fn table() -> AppTable {
    let mut apps = AppTable::new();
    apps.insert("version".into(), handler_fn(version));
    apps.insert("echo".into(), handler_fn(echo));
    apps
}

/// Names of the available apps, sorted.
pub fn names() -> Vec<String> {
    let mut names: Vec<String> = table().into_keys().collect();
    names.sort_unstable();
    names
}

fn version(_req: &mut Request) -> Response {
    Response::json(
        StatusCode::OK,
        &json!({
            "version": {
                "id": "v3",
                "status": "stable",
                "name": "keel",
                "release": env!("CARGO_PKG_VERSION"),
            }
        }),
    )
}

/// Reflects the request as the pipeline delivered it.
fn echo(req: &mut Request) -> Response {
    let environ: Map<String, Value> = req
        .environ
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let headers: Map<String, Value> = req
        .headers
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_string(),
                Value::String(String::from_utf8_lossy(v.as_bytes()).into_owned()),
            )
        })
        .collect();
    Response::json(
        StatusCode::OK,
        &json!({
            "method": req.method.as_str(),
            "path": req.path,
            "query": req.query,
            "headers": headers,
            "environ": environ,
            "body": String::from_utf8_lossy(&req.body),
        }),
    )
}
