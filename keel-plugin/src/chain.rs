use crate::handler::{BoxHandler, Handler};
use keel_core::{Request, Response};
use std::sync::Arc;

/// A built pipeline: the outermost middleware, which transitively wraps
/// every other filter down to the terminal app.
///
/// Owned by the deployment that built it. Calls take `&self`, so one chain
/// serves concurrent requests; any per-request state lives in the request.
#[derive(Clone)]
pub struct DispatchChain {
    name: String,
    filters: Vec<String>,
    entry: BoxHandler,
}

impl DispatchChain {
    pub(crate) fn new(name: String, filters: Vec<String>, entry: BoxHandler) -> Self {
        Self { name, filters, entry }
    }

    /// Run one request through the chain.
    #[inline]
    pub fn call(&self, req: &mut Request) -> Response {
        self.entry.call(req)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Filter names in request order.
    pub fn filters(&self) -> &[String] {
        &self.filters
    }

    /// Number of filters in front of the app.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// The outermost handler.
    pub fn entry(&self) -> BoxHandler {
        Arc::clone(&self.entry)
    }
}

impl Handler for DispatchChain {
    fn call(&self, req: &mut Request) -> Response {
        self.entry.call(req)
    }
}

impl std::fmt::Debug for DispatchChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchChain")
            .field("name", &self.name)
            .field("filters", &self.filters)
            .finish_non_exhaustive()
    }
}
