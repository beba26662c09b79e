use crate::config::PluginConfig;
use crate::descriptor::{Constructor, PluginDescriptor};
use crate::error::{PluginError, Stage};
use crate::handler::BoxHandler;

/// Turn a descriptor into a live middleware wrapped around `next`.
///
/// Standard factories are called once with `config`, and the factory they
/// return once with `next`. Direct filters are called once with both.
pub fn instantiate(
    descriptor: &PluginDescriptor,
    config: &PluginConfig,
    next: BoxHandler,
) -> Result<BoxHandler, PluginError> {
    match descriptor.constructor() {
        Constructor::StandardFactory(construct) => {
            let factory = construct(config)
                .map_err(|e| construction_error(descriptor, Stage::Factory, e))?;
            factory
                .wrap(next)
                .map_err(|e| construction_error(descriptor, Stage::Filter, e))
        }
        Constructor::DirectFilter(construct) => construct(config, next)
            .map_err(|e| construction_error(descriptor, Stage::Filter, e)),
    }
}

fn construction_error(descriptor: &PluginDescriptor, stage: Stage, err: anyhow::Error) -> PluginError {
    tracing::error!(
        plugin = %descriptor.name(),
        target = %descriptor.target(),
        stage = %stage,
        error = %err,
        "Plugin construction failed"
    );
    PluginError::Construction {
        name: descriptor.name().to_string(),
        stage,
        source: err.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::factory_fn;
    use crate::handler::handler_fn;
    use keel_core::{Request, Response};
    use serde_json::json;
    use std::sync::Arc;

    fn terminal() -> BoxHandler {
        handler_fn(|_| Response::ok())
    }

    /// Middleware that stamps a response header before returning.
    fn stamping(next: BoxHandler, value: String) -> BoxHandler {
        handler_fn(move |req| {
            let mut resp = next.call(req);
            resp.set_header("x-stamp", &value);
            resp
        })
    }

    #[test]
    fn standard_factory_sees_config_then_next() {
        let d = PluginDescriptor::factory("stamp", "t", |cfg| {
            let value = cfg.get_str("value").unwrap_or("none").to_string();
            Ok(factory_fn(move |next| Ok(stamping(next, value.clone()))))
        });
        let cfg = PluginConfig::from_value(json!({ "value": "abc" }));
        let handler = instantiate(&d, &cfg, terminal()).unwrap();
        let resp = handler.call(&mut Request::get("/"));
        assert_eq!(resp.header("x-stamp"), Some("abc"));
    }

    #[test]
    fn direct_filter_sees_config_and_next() {
        let d = PluginDescriptor::filter("stamp", "t", |cfg, next| {
            Ok(stamping(next, cfg.get_str("value").unwrap_or("none").to_string()))
        });
        let cfg = PluginConfig::from_value(json!({ "value": "xyz" }));
        let handler = instantiate(&d, &cfg, terminal()).unwrap();
        let resp = handler.call(&mut Request::get("/"));
        assert_eq!(resp.header("x-stamp"), Some("xyz"));
    }

    #[test]
    fn factory_stage_failure_is_reported() {
        let d = PluginDescriptor::factory("broken", "t", |_| anyhow::bail!("missing option"));
        let err = match instantiate(&d, &PluginConfig::default(), terminal()) {
            Err(e) => e,
            Ok(_) => panic!("expected construction error"),
        };
        match err {
            PluginError::Construction { name, stage, source } => {
                assert_eq!(name, "broken");
                assert_eq!(stage, Stage::Factory);
                assert_eq!(source.to_string(), "missing option");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn wrap_stage_failure_is_filter_stage() {
        let d = PluginDescriptor::factory("broken", "t", |_| {
            Ok(factory_fn(|_| anyhow::bail!("cannot wrap")))
        });
        let err = instantiate(&d, &PluginConfig::default(), terminal()).err().unwrap();
        assert!(matches!(err, PluginError::Construction { stage: Stage::Filter, .. }));
    }

    #[test]
    fn direct_filter_failure_is_filter_stage() {
        let d = PluginDescriptor::filter("broken", "t", |_, _| anyhow::bail!("nope"));
        let err = instantiate(&d, &PluginConfig::default(), terminal()).err().unwrap();
        assert!(matches!(err, PluginError::Construction { stage: Stage::Filter, .. }));
    }

    #[test]
    fn failed_construction_drops_next() {
        let next = terminal();
        let d = PluginDescriptor::filter("broken", "t", |_, _| anyhow::bail!("nope"));
        let _ = instantiate(&d, &PluginConfig::default(), Arc::clone(&next));
        assert_eq!(Arc::strong_count(&next), 1);
    }
}
