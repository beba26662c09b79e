use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use http::{Method, StatusCode};
use serde_json::{Value, json};
use std::collections::HashMap;

/// Mutable request passed down a dispatch chain.
///
/// `environ` is the shared key-value store middleware use to hand data to
/// the handlers after them (request ids, parsed params, auth context).
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub uri: String,
    pub path: String,
    pub query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub environ: HashMap<String, Value>,
}

impl Request {
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let (path, query) = split_uri(&uri);
        Self {
            method,
            path,
            query,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            environ: HashMap::new(),
        }
    }

    pub fn get(uri: impl Into<String>) -> Self {
        Self::new(Method::GET, uri)
    }

    pub fn post(uri: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self::new(Method::POST, uri).with_body(body)
    }

    /// Add a header. Invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Get a request header as text (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Set a request header, replacing any previous value.
    pub fn set_header(&mut self, name: &str, value: &str) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
    }

    /// Declared `content-length`, if present and numeric.
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    }

    /// Media type of the body without parameters, lowercased.
    pub fn content_type(&self) -> Option<String> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
    }

    /// Rewrite the path, keeping the query string.
    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
        self.uri = if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query)
        };
    }

    pub fn set_var(&mut self, key: impl Into<String>, value: Value) {
        self.environ.insert(key.into(), value);
    }

    pub fn var(&self, key: &str) -> Option<&Value> {
        self.environ.get(key)
    }

    /// Update an object-valued environ entry in place. A missing or
    /// non-object entry starts out as an empty object.
    pub fn update_var_object(
        &mut self,
        key: &str,
        f: impl FnOnce(&mut serde_json::Map<String, Value>),
    ) {
        let mut map = match self.environ.remove(key) {
            Some(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        f(&mut map);
        self.environ.insert(key.to_string(), Value::Object(map));
    }
}

fn split_uri(uri: &str) -> (String, String) {
    match uri.find('?') {
        Some(pos) => (uri[..pos].to_string(), uri[pos + 1..].to_string()),
        None => (uri.to_string(), String::new()),
    }
}

/// Response produced by a terminal app or a short-circuiting middleware.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(StatusCode::OK)
    }

    /// JSON response with the given status.
    pub fn json(status: StatusCode, value: &Value) -> Self {
        let mut resp = Self::new(status);
        resp.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        resp.body = Bytes::from(value.to_string());
        resp
    }

    /// JSON error body: `{"error": "...", "status": N}`.
    pub fn error(status: StatusCode, message: impl AsRef<str>) -> Self {
        Self::json(
            status,
            &json!({ "error": message.as_ref(), "status": status.as_u16() }),
        )
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.set_header(name, value);
        self
    }

    /// Set a response header, replacing any previous value. Invalid names
    /// or values are ignored.
    pub fn set_header(&mut self, name: &str, value: &str) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Body as UTF-8 text, lossy.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl From<&crate::KeelError> for Response {
    fn from(err: &crate::KeelError) -> Self {
        Response::error(err.status_code(), err.to_string())
    }
}
