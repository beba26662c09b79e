use crate::descriptor::PluginDescriptor;
use crate::error::PluginError;
use keel_core::config::DEFAULT_NAMESPACE;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::Arc;

/// Plugin catalog: name → descriptor within one namespace.
///
/// Built once at startup, immutable thereafter. Workers receive a shared
/// `Arc<PluginRegistry>`; registration needs `&mut`, so a shared registry
/// can't change under them.
pub struct PluginRegistry {
    namespace: String,
    plugins: HashMap<String, PluginDescriptor>,
}

static GLOBAL: OnceCell<Arc<PluginRegistry>> = OnceCell::new();

impl PluginRegistry {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            plugins: HashMap::new(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Register a plugin descriptor.
    ///
    /// Re-registering an equal descriptor is a no-op; a different
    /// descriptor under a taken name is rejected.
    pub fn register(&mut self, descriptor: PluginDescriptor) -> Result<(), PluginError> {
        if let Some(existing) = self.plugins.get(descriptor.name()) {
            if *existing == descriptor {
                return Ok(());
            }
            return Err(PluginError::DuplicateName {
                name: descriptor.name().to_string(),
            });
        }
        tracing::debug!(
            namespace = %self.namespace,
            plugin = %descriptor.name(),
            target = %descriptor.target(),
            mode = %descriptor.mode(),
            "Registered plugin"
        );
        self.plugins.insert(descriptor.name().to_string(), descriptor);
        Ok(())
    }

    /// Register every descriptor, stopping at the first conflict.
    pub fn extend<I>(&mut self, descriptors: I) -> Result<(), PluginError>
    where
        I: IntoIterator<Item = PluginDescriptor>,
    {
        for descriptor in descriptors {
            self.register(descriptor)?;
        }
        Ok(())
    }

    /// Look up a plugin by name.
    pub fn resolve(&self, name: &str) -> Result<&PluginDescriptor, PluginError> {
        self.plugins.get(name).ok_or_else(|| PluginError::UnknownPlugin {
            namespace: self.namespace.clone(),
            name: name.to_string(),
        })
    }

    pub fn get(&self, name: &str) -> Option<&PluginDescriptor> {
        self.plugins.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// All entries, in no particular order. For introspection only.
    pub fn all(&self) -> impl Iterator<Item = (&str, &PluginDescriptor)> {
        self.plugins.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Registered plugin names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.plugins.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered plugins.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

/// Install the process-wide registry. Succeeds once per process.
pub fn install_global(registry: PluginRegistry) -> Result<Arc<PluginRegistry>, PluginError> {
    let shared = Arc::new(registry);
    GLOBAL
        .set(Arc::clone(&shared))
        .map_err(|_| PluginError::GlobalAlreadyInstalled)?;
    tracing::info!(
        namespace = %shared.namespace(),
        plugins = shared.len(),
        "Installed global plugin registry"
    );
    Ok(shared)
}

/// The process-wide registry, if one has been installed.
pub fn global() -> Option<Arc<PluginRegistry>> {
    GLOBAL.get().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::factory_fn;

    fn mock(name: &str) -> PluginDescriptor {
        PluginDescriptor::factory(name, format!("mock::{name}::factory"), |_| {
            Ok(factory_fn(Ok))
        })
    }

    #[test]
    fn test_empty_registry() {
        let reg = PluginRegistry::default();
        assert!(reg.is_empty());
        assert_eq!(reg.len(), 0);
        assert_eq!(reg.namespace(), "keel.filter_factory");
        assert!(reg.get("nonexistent").is_none());
    }

    #[test]
    fn test_register_and_resolve() {
        let mut reg = PluginRegistry::default();
        reg.register(mock("token_auth")).unwrap();
        assert_eq!(reg.len(), 1);
        assert!(reg.contains("token_auth"));
        let d = reg.resolve("token_auth").unwrap();
        assert_eq!(d, &mock("token_auth"));
        assert_eq!(d.target(), "mock::token_auth::factory");
    }

    #[test]
    fn test_resolve_unknown_fails() {
        let reg = PluginRegistry::new("custom.ns");
        match reg.resolve("ghost") {
            Err(PluginError::UnknownPlugin { namespace, name }) => {
                assert_eq!(namespace, "custom.ns");
                assert_eq!(name, "ghost");
            }
            other => panic!("expected UnknownPlugin, got {other:?}"),
        }
    }

    #[test]
    fn test_register_multiple() {
        let mut reg = PluginRegistry::default();
        for name in ["token_auth", "json_body", "sizelimit", "request_id", "debug"] {
            reg.register(mock(name)).unwrap();
        }
        assert_eq!(reg.len(), 5);
        assert_eq!(
            reg.names(),
            vec!["debug", "json_body", "request_id", "sizelimit", "token_auth"]
        );
        assert_eq!(reg.all().count(), 5);
    }

    #[test]
    fn test_reregister_identical_is_idempotent() {
        let mut reg = PluginRegistry::default();
        reg.register(mock("debug")).unwrap();
        reg.register(mock("debug")).unwrap();
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_register_conflict_rejected() {
        let mut reg = PluginRegistry::default();
        reg.register(mock("debug")).unwrap();
        let other = PluginDescriptor::filter("debug", "elsewhere::debug", |_, next| Ok(next));
        let err = reg.register(other).unwrap_err();
        assert!(matches!(err, PluginError::DuplicateName { ref name } if name == "debug"));
        // Original entry is untouched
        assert_eq!(reg.resolve("debug").unwrap().target(), "mock::debug::factory");
    }

    #[test]
    fn test_extend_stops_at_conflict() {
        let mut reg = PluginRegistry::default();
        let conflicting = PluginDescriptor::filter("a", "other", |_, next| Ok(next));
        let result = reg.extend(vec![mock("a"), conflicting, mock("b")]);
        assert!(result.is_err());
        assert!(reg.contains("a"));
        assert!(!reg.contains("b"));
    }
}
