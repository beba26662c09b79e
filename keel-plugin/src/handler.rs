use keel_core::{Request, Response};
use std::sync::Arc;

/// Anything that turns a request into a response: terminal apps and every
/// middleware in a chain.
///
/// Middleware hold their `next` handler and decide whether to call it.
pub trait Handler: Send + Sync {
    fn call(&self, req: &mut Request) -> Response;
}

/// Shared, type-erased handler. Chains are built out of these.
pub type BoxHandler = Arc<dyn Handler>;

/// Handler backed by a closure.
pub struct HandlerFn<F> {
    f: F,
}

impl<F> Handler for HandlerFn<F>
where
    F: Fn(&mut Request) -> Response + Send + Sync,
{
    fn call(&self, req: &mut Request) -> Response {
        (self.f)(req)
    }
}

/// Wrap a closure as a [`BoxHandler`].
pub fn handler_fn<F>(f: F) -> BoxHandler
where
    F: Fn(&mut Request) -> Response + Send + Sync + 'static,
{
    Arc::new(HandlerFn { f })
}
