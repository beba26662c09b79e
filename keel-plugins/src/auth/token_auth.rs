use crate::environ::{AUTH_TOKEN_HEADER, CONTEXT, SUBJECT_TOKEN_HEADER};
use keel_core::{Request, Response};
use keel_plugin::{BoxHandler, FilterFactory, Handler, PluginConfig};
use serde_json::Value;
use std::sync::Arc;

/// Exposes the caller's tokens to later handlers.
///
/// Copies `x-auth-token` into `keel.context.token_id` (null when absent)
/// and `x-subject-token`, when sent, into `keel.context.subject_token_id`.
/// Validation is left to whoever consumes the context.
pub struct TokenAuthFactory;

pub fn factory(_config: &PluginConfig) -> anyhow::Result<Box<dyn FilterFactory>> {
    Ok(Box::new(TokenAuthFactory))
}

impl FilterFactory for TokenAuthFactory {
    fn wrap(&self, next: BoxHandler) -> anyhow::Result<BoxHandler> {
        Ok(Arc::new(TokenAuthMiddleware { next }))
    }
}

struct TokenAuthMiddleware {
    next: BoxHandler,
}

impl Handler for TokenAuthMiddleware {
    fn call(&self, req: &mut Request) -> Response {
        let token = req
            .header(AUTH_TOKEN_HEADER)
            .map_or(Value::Null, |t| Value::String(t.to_string()));
        let subject = req.header(SUBJECT_TOKEN_HEADER).map(str::to_string);

        req.update_var_object(CONTEXT, |ctx| {
            ctx.insert("token_id".into(), token);
            if let Some(subject) = subject {
                ctx.insert("subject_token_id".into(), Value::String(subject));
            }
        });
        self.next.call(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{body_json, wrap};
    use serde_json::json;

    #[test]
    fn copies_both_tokens() {
        let handler = wrap(factory, json!({}));
        let mut req = Request::get("/v3/auth/tokens")
            .with_header("X-Auth-Token", "abc")
            .with_header("X-Subject-Token", "def");
        let body = body_json(&handler.call(&mut req));
        assert_eq!(
            body["environ"]["keel.context"],
            json!({ "token_id": "abc", "subject_token_id": "def" })
        );
    }

    #[test]
    fn missing_token_is_null() {
        let handler = wrap(factory, json!({}));
        let body = body_json(&handler.call(&mut Request::get("/")));
        assert_eq!(body["environ"]["keel.context"], json!({ "token_id": null }));
    }

    #[test]
    fn keeps_existing_context_entries() {
        let handler = wrap(factory, json!({}));
        let mut req = Request::get("/").with_header("x-auth-token", "abc");
        req.set_var(CONTEXT, json!({ "is_admin": true }));
        handler.call(&mut req);
        assert_eq!(req.var(CONTEXT), Some(&json!({ "is_admin": true, "token_id": "abc" })));
    }
}
