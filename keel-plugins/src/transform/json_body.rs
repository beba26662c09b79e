use crate::environ::PARAMS;
use keel_core::{KeelError, Request, Response};
use keel_plugin::{BoxHandler, FilterFactory, Handler, PluginConfig};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Parses JSON request bodies into `keel.params`.
///
/// Empty bodies pass untouched. Anything else must be a JSON object sent as
/// `application/json` (or without a content type); otherwise the request
/// is answered with 400.
pub struct JsonBodyFactory;

pub fn factory(_config: &PluginConfig) -> anyhow::Result<Box<dyn FilterFactory>> {
    Ok(Box::new(JsonBodyFactory))
}

impl FilterFactory for JsonBodyFactory {
    fn wrap(&self, next: BoxHandler) -> anyhow::Result<BoxHandler> {
        Ok(Arc::new(JsonBodyMiddleware { next }))
    }
}

struct JsonBodyMiddleware {
    next: BoxHandler,
}

/// Keys that never reach handlers as parameters.
fn is_reserved(key: &str) -> bool {
    key == "self" || key == "context" || key.starts_with('_')
}

pub fn parse(req: &Request) -> Result<Option<Map<String, Value>>, KeelError> {
    if req.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    match req.content_type().as_deref() {
        None | Some("") | Some("application/json") => {}
        Some(_) => {
            return Err(KeelError::BadRequest(
                "Expecting to find application/json in Content-Type header".into(),
            ));
        }
    }
    let value: Value = serde_json::from_slice(&req.body)
        .map_err(|e| KeelError::BadRequest(format!("Cannot parse JSON body: {e}")))?;
    let Value::Object(object) = value else {
        return Err(KeelError::BadRequest("JSON body must be an object".into()));
    };
    Ok(Some(
        object.into_iter().filter(|(k, _)| !is_reserved(k)).collect(),
    ))
}

impl Handler for JsonBodyMiddleware {
    fn call(&self, req: &mut Request) -> Response {
        match parse(req) {
            Ok(Some(params)) => req.set_var(PARAMS, Value::Object(params)),
            Ok(None) => {}
            Err(e) => {
                tracing::debug!(error = %e, "Rejected request body");
                return Response::from(&e);
            }
        }
        self.next.call(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{body_json, wrap};
    use http::StatusCode;
    use serde_json::json;

    fn call(req: &mut Request) -> Response {
        wrap(factory, json!({})).call(req)
    }

    #[test]
    fn object_body_becomes_params() {
        let mut req = Request::post("/", r#"{"user": {"name": "a"}, "_hidden": 1, "self": 2, "context": 3}"#)
            .with_header("content-type", "application/json; charset=utf-8");
        let resp = call(&mut req);
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(
            body_json(&resp)["environ"]["keel.params"],
            json!({ "user": { "name": "a" } })
        );
    }

    #[test]
    fn missing_content_type_is_accepted() {
        let resp = call(&mut Request::post("/", r#"{"a": 1}"#));
        assert_eq!(body_json(&resp)["environ"]["keel.params"], json!({ "a": 1 }));
    }

    #[test]
    fn empty_body_is_skipped() {
        let mut req = Request::post("/", "  ").with_header("content-type", "text/plain");
        let resp = call(&mut req);
        assert_eq!(resp.status, StatusCode::OK);
        assert!(body_json(&resp)["environ"].get("keel.params").is_none());
    }

    #[test]
    fn wrong_content_type_is_rejected() {
        let mut req = Request::post("/", "a=1").with_header("content-type", "application/x-www-form-urlencoded");
        let resp = call(&mut req);
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert!(resp.text().contains("Expecting to find application/json"));
    }

    #[test]
    fn malformed_json_is_rejected() {
        let resp = call(&mut Request::post("/", "{not json"));
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn non_object_is_rejected() {
        let resp = call(&mut Request::post("/", "[1, 2]"));
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert!(resp.text().contains("must be an object"));
    }
}
