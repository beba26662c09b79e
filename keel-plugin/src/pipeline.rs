use crate::chain::DispatchChain;
use crate::config::PluginConfig;
use crate::error::PluginError;
use crate::factory::instantiate;
use crate::handler::BoxHandler;
use crate::registry::PluginRegistry;
use keel_core::config::{KeelConfig, PipelineSection};

/// Ordered filter names in front of one terminal app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSpec {
    pub name: String,
    /// Request order: first entry sees the request first.
    pub filters: Vec<String>,
    pub app: String,
}

impl PipelineSpec {
    pub fn new<I, S>(name: impl Into<String>, filters: I, app: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            filters: filters.into_iter().map(Into::into).collect(),
            app: app.into(),
        }
    }

    pub fn from_config(name: &str, section: &PipelineSection) -> Self {
        Self::new(name, section.filters.iter().cloned(), section.app.clone())
    }
}

/// Build a dispatch chain for `spec` around `terminal`.
///
/// Every entry is resolved before anything is constructed, so an unknown
/// name fails without running a constructor. Filters are then built from
/// the last entry backwards: each one receives the fully built remainder of
/// the chain as its next handler, and the first entry ends up outermost.
/// Any failure aborts the whole build.
pub fn build(
    spec: &PipelineSpec,
    registry: &PluginRegistry,
    config: &KeelConfig,
    terminal: BoxHandler,
) -> Result<DispatchChain, PluginError> {
    let resolved = spec
        .filters
        .iter()
        .map(|entry| -> Result<_, PluginError> {
            let (plugin, local) = config.filter(entry);
            let descriptor = registry.resolve(&plugin).inspect_err(|e| {
                tracing::error!(pipeline = %spec.name, entry = %entry, error = %e, "Unresolved filter");
            })?;
            Ok((descriptor, PluginConfig::new(&config.global, &local)))
        })
        .collect::<Result<Vec<_>, PluginError>>()?;

    let mut next = terminal;
    for (descriptor, plugin_config) in resolved.into_iter().rev() {
        next = instantiate(descriptor, &plugin_config, next)?;
    }

    tracing::info!(
        pipeline = %spec.name,
        filters = ?spec.filters,
        app = %spec.app,
        "Built pipeline"
    );
    Ok(DispatchChain::new(spec.name.clone(), spec.filters.clone(), next))
}
