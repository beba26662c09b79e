use crate::config::PluginConfig;
use crate::handler::BoxHandler;
use std::fmt;
use std::sync::Arc;

/// Second stage of a standard factory: applied once per next handler.
pub trait FilterFactory: Send + Sync {
    fn wrap(&self, next: BoxHandler) -> anyhow::Result<BoxHandler>;
}

/// Filter factory backed by a closure.
pub struct FactoryFn<F> {
    f: F,
}

impl<F> FilterFactory for FactoryFn<F>
where
    F: Fn(BoxHandler) -> anyhow::Result<BoxHandler> + Send + Sync,
{
    fn wrap(&self, next: BoxHandler) -> anyhow::Result<BoxHandler> {
        (self.f)(next)
    }
}

/// Wrap a closure as a boxed [`FilterFactory`].
pub fn factory_fn<F>(f: F) -> Box<dyn FilterFactory>
where
    F: Fn(BoxHandler) -> anyhow::Result<BoxHandler> + Send + Sync + 'static,
{
    Box::new(FactoryFn { f })
}

pub type FactoryConstructor =
    Arc<dyn Fn(&PluginConfig) -> anyhow::Result<Box<dyn FilterFactory>> + Send + Sync>;

pub type FilterConstructor =
    Arc<dyn Fn(&PluginConfig, BoxHandler) -> anyhow::Result<BoxHandler> + Send + Sync>;

/// How a plugin is turned into a live middleware.
#[derive(Clone)]
pub enum Constructor {
    /// Called with config, returns a factory which is then applied to the
    /// next handler.
    StandardFactory(FactoryConstructor),
    /// Called with config and next handler together.
    DirectFilter(FilterConstructor),
}

impl Constructor {
    pub fn mode(&self) -> ConstructionMode {
        match self {
            Constructor::StandardFactory(_) => ConstructionMode::StandardFactory,
            Constructor::DirectFilter(_) => ConstructionMode::DirectFilter,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstructionMode {
    StandardFactory,
    DirectFilter,
}

impl ConstructionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstructionMode::StandardFactory => "standard_factory",
            ConstructionMode::DirectFilter => "direct_filter",
        }
    }
}

impl fmt::Display for ConstructionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable registry entry: plugin name, the path of its constructor and
/// the constructor itself.
///
/// Two descriptors are equal when name, target and mode agree; the
/// constructor closure is identified by its target.
#[derive(Clone)]
pub struct PluginDescriptor {
    name: String,
    target: String,
    constructor: Constructor,
}

impl PluginDescriptor {
    pub fn new(name: impl Into<String>, target: impl Into<String>, constructor: Constructor) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            constructor,
        }
    }

    /// Two-stage descriptor.
    pub fn factory<F>(name: impl Into<String>, target: impl Into<String>, f: F) -> Self
    where
        F: Fn(&PluginConfig) -> anyhow::Result<Box<dyn FilterFactory>> + Send + Sync + 'static,
    {
        Self::new(name, target, Constructor::StandardFactory(Arc::new(f)))
    }

    /// One-stage descriptor.
    pub fn filter<F>(name: impl Into<String>, target: impl Into<String>, f: F) -> Self
    where
        F: Fn(&PluginConfig, BoxHandler) -> anyhow::Result<BoxHandler> + Send + Sync + 'static,
    {
        Self::new(name, target, Constructor::DirectFilter(Arc::new(f)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn mode(&self) -> ConstructionMode {
        self.constructor.mode()
    }

    pub fn constructor(&self) -> &Constructor {
        &self.constructor
    }
}

impl PartialEq for PluginDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.target == other.target && self.mode() == other.mode()
    }
}

impl Eq for PluginDescriptor {}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("name", &self.name)
            .field("target", &self.target)
            .field("mode", &self.mode())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passthrough_factory(_: &PluginConfig) -> anyhow::Result<Box<dyn FilterFactory>> {
        Ok(factory_fn(Ok))
    }

    #[test]
    fn factory_descriptor_mode() {
        let d = PluginDescriptor::factory("json_body", "mod::JsonBody::factory", passthrough_factory);
        assert_eq!(d.name(), "json_body");
        assert_eq!(d.target(), "mod::JsonBody::factory");
        assert_eq!(d.mode(), ConstructionMode::StandardFactory);
    }

    #[test]
    fn filter_descriptor_mode() {
        let d = PluginDescriptor::filter("cors", "mod::cors::filter_factory", |_, next| Ok(next));
        assert_eq!(d.mode(), ConstructionMode::DirectFilter);
        assert!(matches!(d.constructor(), Constructor::DirectFilter(_)));
    }

    #[test]
    fn equality_ignores_closure_identity() {
        let a = PluginDescriptor::factory("x", "t", passthrough_factory);
        let b = PluginDescriptor::factory("x", "t", |_| Ok(factory_fn(Ok)));
        assert_eq!(a, b);
    }

    #[test]
    fn equality_compares_target_and_mode() {
        let a = PluginDescriptor::factory("x", "t", passthrough_factory);
        let other_target = PluginDescriptor::factory("x", "t2", passthrough_factory);
        let other_mode = PluginDescriptor::filter("x", "t", |_, next| Ok(next));
        assert_ne!(a, other_target);
        assert_ne!(a, other_mode);
    }

    #[test]
    fn debug_shows_mode() {
        let d = PluginDescriptor::filter("cors", "t", |_, next| Ok(next));
        let text = format!("{d:?}");
        assert!(text.contains("DirectFilter"));
        assert!(text.contains("cors"));
    }

    #[test]
    fn mode_display() {
        assert_eq!(ConstructionMode::StandardFactory.to_string(), "standard_factory");
        assert_eq!(ConstructionMode::DirectFilter.to_string(), "direct_filter");
    }
}
