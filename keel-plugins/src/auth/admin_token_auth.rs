use crate::environ::{AUTH_TOKEN_HEADER, CONTEXT};
use keel_core::{Request, Response};
use keel_plugin::{BoxHandler, FilterFactory, Handler, PluginConfig};
use serde_json::Value;
use std::sync::Arc;

/// Flags requests carrying the shared admin token.
///
/// Sets `keel.context.is_admin` on every request. Without an
/// `admin_token` in conf nothing is ever admin.
pub struct AdminTokenAuthFactory {
    admin_token: Option<Arc<str>>,
}

pub fn factory(config: &PluginConfig) -> anyhow::Result<Box<dyn FilterFactory>> {
    let admin_token = config
        .get_str("admin_token")
        .filter(|t| !t.is_empty())
        .map(Arc::from);
    if admin_token.is_none() {
        tracing::warn!("admin_token_auth configured without admin_token; no request will be admin");
    }
    Ok(Box::new(AdminTokenAuthFactory { admin_token }))
}

impl FilterFactory for AdminTokenAuthFactory {
    fn wrap(&self, next: BoxHandler) -> anyhow::Result<BoxHandler> {
        Ok(Arc::new(AdminTokenAuthMiddleware {
            admin_token: self.admin_token.clone(),
            next,
        }))
    }
}

struct AdminTokenAuthMiddleware {
    admin_token: Option<Arc<str>>,
    next: BoxHandler,
}

impl Handler for AdminTokenAuthMiddleware {
    fn call(&self, req: &mut Request) -> Response {
        let is_admin = match (&self.admin_token, req.header(AUTH_TOKEN_HEADER)) {
            (Some(admin), Some(token)) => admin.as_ref() == token,
            _ => false,
        };
        req.update_var_object(CONTEXT, |ctx| {
            ctx.insert("is_admin".into(), Value::Bool(is_admin));
        });
        self.next.call(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{body_json, wrap};
    use serde_json::json;

    fn is_admin(handler: &BoxHandler, token: Option<&str>) -> Value {
        let mut req = Request::get("/");
        if let Some(token) = token {
            req.set_header("x-auth-token", token);
        }
        body_json(&handler.call(&mut req))["environ"]["keel.context"]["is_admin"].clone()
    }

    #[test]
    fn matching_token_is_admin() {
        let handler = wrap(factory, json!({ "admin_token": "ADMIN" }));
        assert_eq!(is_admin(&handler, Some("ADMIN")), json!(true));
    }

    #[test]
    fn other_or_missing_token_is_not_admin() {
        let handler = wrap(factory, json!({ "admin_token": "ADMIN" }));
        assert_eq!(is_admin(&handler, Some("user-token")), json!(false));
        assert_eq!(is_admin(&handler, None), json!(false));
    }

    #[test]
    fn unconfigured_admin_token_never_matches() {
        let handler = wrap(factory, json!({}));
        assert_eq!(is_admin(&handler, Some("")), json!(false));
        assert_eq!(is_admin(&handler, Some("ADMIN")), json!(false));
    }
}
