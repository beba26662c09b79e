use keel_core::{KeelError, Request, Response};
use keel_plugin::{BoxHandler, FilterFactory, Handler, PluginConfig};
use std::sync::Arc;

/// Default cap on request bodies, in bytes.
pub const DEFAULT_MAX_REQUEST_BODY_SIZE: u64 = 114_688;

/// Rejects requests whose body exceeds `max_request_body_size` with 413.
///
/// Both the declared `content-length` and the actual body are checked.
pub struct SizeLimitFactory {
    max: u64,
}

pub fn factory(config: &PluginConfig) -> anyhow::Result<Box<dyn FilterFactory>> {
    let max = match config.get("max_request_body_size") {
        None => DEFAULT_MAX_REQUEST_BODY_SIZE,
        Some(raw) => config.get_u64("max_request_body_size").ok_or_else(|| {
            anyhow::anyhow!("sizelimit config error: max_request_body_size must be a non-negative integer, got {raw}")
        })?,
    };
    Ok(Box::new(SizeLimitFactory { max }))
}

impl FilterFactory for SizeLimitFactory {
    fn wrap(&self, next: BoxHandler) -> anyhow::Result<BoxHandler> {
        Ok(Arc::new(SizeLimitMiddleware { max: self.max, next }))
    }
}

struct SizeLimitMiddleware {
    max: u64,
    next: BoxHandler,
}

impl Handler for SizeLimitMiddleware {
    fn call(&self, req: &mut Request) -> Response {
        let declared = req.content_length().unwrap_or(0);
        let actual = req.body.len() as u64;
        if declared > self.max || actual > self.max {
            tracing::warn!(declared, actual, max = self.max, "Request body too large");
            return Response::from(&KeelError::PayloadTooLarge(format!(
                "limit is {} bytes",
                self.max
            )));
        }
        self.next.call(req)
    }
}
