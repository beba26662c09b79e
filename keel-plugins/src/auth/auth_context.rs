use crate::environ::{AUTH_CONTEXT, AUTH_TOKEN_HEADER, CONTEXT};
use keel_core::{Request, Response};
use keel_plugin::{BoxHandler, FilterFactory, Handler, PluginConfig};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Builds `keel.auth_context` from what the token middleware collected.
///
/// Runs after `token_auth` / `admin_token_auth`. Requests without a token,
/// or carrying the admin token configured here, get an empty auth context,
/// so with a shared global `admin_token` they never reach `is_admin`. The
/// flag is copied from `keel.context` and is only true when
/// `admin_token_auth` matched a token this filter does not know as admin.
/// An auth context set by an earlier handler is left alone.
pub struct AuthContextFactory {
    admin_token: Option<Arc<str>>,
}

pub fn factory(config: &PluginConfig) -> anyhow::Result<Box<dyn FilterFactory>> {
    let admin_token = config
        .get_str("admin_token")
        .filter(|t| !t.is_empty())
        .map(Arc::from);
    Ok(Box::new(AuthContextFactory { admin_token }))
}

impl FilterFactory for AuthContextFactory {
    fn wrap(&self, next: BoxHandler) -> anyhow::Result<BoxHandler> {
        Ok(Arc::new(AuthContextMiddleware {
            admin_token: self.admin_token.clone(),
            next,
        }))
    }
}

struct AuthContextMiddleware {
    admin_token: Option<Arc<str>>,
    next: BoxHandler,
}

impl AuthContextMiddleware {
    fn build(&self, req: &Request) -> Map<String, Value> {
        let context = req.var(CONTEXT).and_then(Value::as_object);
        let token = context
            .and_then(|ctx| ctx.get("token_id"))
            .and_then(Value::as_str)
            .or_else(|| req.header(AUTH_TOKEN_HEADER))
            .filter(|t| !t.is_empty());

        let mut auth = Map::new();
        let Some(token) = token else {
            tracing::debug!("No token in request; empty auth context");
            return auth;
        };
        if self.admin_token.as_deref() == Some(token) {
            tracing::debug!("Admin token in request; empty auth context");
            return auth;
        }

        let is_admin = context
            .and_then(|ctx| ctx.get("is_admin"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        auth.insert("token_id".into(), Value::String(token.to_string()));
        auth.insert("is_admin".into(), Value::Bool(is_admin));
        if let Some(subject) = context.and_then(|ctx| ctx.get("subject_token_id")) {
            auth.insert("subject_token_id".into(), subject.clone());
        }
        auth
    }
}

impl Handler for AuthContextMiddleware {
    fn call(&self, req: &mut Request) -> Response {
        if req.var(AUTH_CONTEXT).is_some() {
            tracing::warn!("Auth context already set; leaving it untouched");
        } else {
            let auth = self.build(req);
            req.set_var(AUTH_CONTEXT, Value::Object(auth));
        }
        self.next.call(req)
    }
}
