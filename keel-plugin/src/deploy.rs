use crate::chain::DispatchChain;
use crate::error::PluginError;
use crate::handler::BoxHandler;
use crate::pipeline::{self, PipelineSpec};
use crate::registry::PluginRegistry;
use crate::urlmap::UrlMap;
use keel_core::KeelConfig;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Terminal apps supplied by the hosting server, by name.
pub type AppTable = HashMap<String, BoxHandler>;

/// Every pipeline and url map of one configuration, built.
pub struct Deployment {
    pipelines: BTreeMap<String, DispatchChain>,
    urlmaps: BTreeMap<String, BoxHandler>,
}

impl Deployment {
    /// Build all pipelines, then the url maps that mount them.
    ///
    /// The first error aborts the deployment; nothing partially built is
    /// returned.
    pub fn build(
        config: &KeelConfig,
        registry: &PluginRegistry,
        apps: &AppTable,
    ) -> Result<Self, PluginError> {
        let mut pipelines = BTreeMap::new();
        for (name, section) in &config.pipelines {
            let spec = PipelineSpec::from_config(name, section);
            let terminal = apps.get(&spec.app).cloned().ok_or_else(|| PluginError::UnknownApp {
                pipeline: spec.name.clone(),
                app: spec.app.clone(),
            })?;
            let chain = pipeline::build(&spec, registry, config, terminal)?;
            pipelines.insert(name.clone(), chain);
        }

        let mut urlmaps = BTreeMap::new();
        for (name, mounts) in &config.urlmaps {
            let mut map = UrlMap::new();
            for (prefix, target) in mounts {
                let chain = pipelines.get(target).ok_or_else(|| PluginError::UnknownPipeline {
                    urlmap: name.clone(),
                    pipeline: target.clone(),
                })?;
                map = map.mount(prefix, chain.entry());
            }
            tracing::info!(urlmap = %name, prefixes = ?map.prefixes(), "Built urlmap");
            urlmaps.insert(name.clone(), Arc::new(map) as BoxHandler);
        }

        Ok(Self { pipelines, urlmaps })
    }

    pub fn pipeline(&self, name: &str) -> Option<&DispatchChain> {
        self.pipelines.get(name)
    }

    /// Entry handler for a pipeline or url map.
    pub fn handler(&self, name: &str) -> Option<BoxHandler> {
        self.pipelines
            .get(name)
            .map(DispatchChain::entry)
            .or_else(|| self.urlmaps.get(name).cloned())
    }

    pub fn pipelines(&self) -> impl Iterator<Item = &DispatchChain> {
        self.pipelines.values()
    }

    /// Pipeline and url map names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .pipelines
            .keys()
            .chain(self.urlmaps.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }
}
